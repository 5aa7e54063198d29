pub mod admin;
pub mod answers;
pub mod candidate;
pub mod company;
pub mod dto;
pub mod middleware;
pub mod practice;
pub mod rest;
pub mod router;
pub mod state;

// Re-export what the binaries need to build the web server.
pub use middleware::require_actor;
pub use router::build_router;
pub use state::AppState;
