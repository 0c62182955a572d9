//! Library exports for guilddash, shared between the binary and tests.

pub mod config;
pub mod models;
pub mod provider;
pub mod routes;
pub mod sessions;
pub mod startup;
pub mod state;
pub mod store;
pub mod utils;
