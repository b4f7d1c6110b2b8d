//! Common types for Geist: the connector CRD, redaction, errors, and telemetry

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod redact;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Namespace the discovery API lists connectors from by default
pub const DEFAULT_CONNECTOR_NAMESPACE: &str = "geist";

/// Field manager name used for server-side apply
pub const FIELD_MANAGER: &str = "geist-operator";
