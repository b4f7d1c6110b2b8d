//! Discovery API for GeistConnector resources
//!
//! Lists connectors from one namespace with secrets redacted, and reports
//! API server connectivity. Every `/v1` route requires a bearer token.

#![deny(missing_docs)]

pub mod auth;
pub mod config;
pub mod error;
pub mod kube_client;
pub mod server;

pub use error::{Error, Result};
