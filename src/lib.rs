// Library exports for Driftpost
// This allows integration tests and the binary to share one module tree

pub mod auth;
pub mod blog;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod graphql;
pub mod pagination;
pub mod routes;
pub mod seed;
pub mod state;
pub mod validation;
