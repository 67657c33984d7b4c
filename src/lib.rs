#![doc = "The `taskvault` library crate."]
#![doc = ""]
#![doc = "This crate contains the core business logic for the TaskVault backend:"]
#![doc = "the credential store and profile validation, the per-device session"]
#![doc = "issue/validate/revoke machinery, owner-scoped task querying, avatar"]
#![doc = "normalization, routing configuration, and error handling. It is used by"]
#![doc = "the main binary (`main.rs`) to construct and run the application."]

pub mod auth;
pub mod avatar;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;

// Re-export key types for easier use of the library crate.
pub use crate::config::Config;
pub use crate::error::AppError;
