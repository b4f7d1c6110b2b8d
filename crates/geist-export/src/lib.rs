//! Export path of the Geist connector
//!
//! Loads the connector configuration the operator mounts into the pod,
//! derives broker client options from it, and keeps a single publisher
//! connection alive under an [`ExportSupervisor`](supervisor::ExportSupervisor).
//! The broker client library itself sits behind the traits in [`broker`].

#![deny(missing_docs)]

pub mod broker;
pub mod config;
pub mod error;
pub mod options;
pub mod supervisor;

pub use error::{ExportError, Result};
