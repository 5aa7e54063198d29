//! services/api/src/lib.rs
//!
//! The HTTP service of the interview platform: adapters for the core ports,
//! configuration, the error envelope and the axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
