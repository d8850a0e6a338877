//! Clipmill Lab server library.
//!
//! An ephemeral localhost HTTP service for blind A/B comparison of two
//! generated runs. Exposes the building blocks (config, state, error
//! handling, routes, lifecycle) so integration tests and the binary
//! entrypoint can both access them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod idempotency;
pub mod lifecycle;
pub mod routes;
pub mod state;
pub mod store;
