mod common;

mod company;
mod scoring;
