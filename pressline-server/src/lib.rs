//! Library surface of the Pressline server binary.
//!
//! Split out of `main.rs` so endpoint tests can assemble the router with
//! in-memory stores and scripted board fakes.

pub mod db;
pub mod errors;
pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
pub use infra::config::Config;
