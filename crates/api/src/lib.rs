//! Verification token HTTP service library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! confirmation pages) so integration tests and the binary entrypoint can
//! both access them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod pages;
pub mod routes;
pub mod state;
