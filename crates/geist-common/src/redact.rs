//! Redaction of connector resources before they leave the cluster
//!
//! The discovery API hands connectors to callers outside the trust boundary.
//! Annotations and managed fields are dropped, and inline secrets are
//! replaced with [`REDACTION_MARKER`]. Empty values stay empty so callers can
//! tell "not set" from "set but hidden".

use crate::crd::GeistConnector;

/// Replacement for any redacted value
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Redact a connector in place
pub fn redact_connector(connector: &mut GeistConnector) {
    connector.metadata.annotations = None;
    connector.metadata.managed_fields = None;

    let connection = &mut connector.spec.connector_spec.opcua.connection;
    mask(&mut connection.authentication.credentials.password);
    mask(&mut connection.certificate.certificate);
    mask(&mut connection.certificate.private_key);
}

fn mask(value: &mut String) {
    if !value.is_empty() {
        *value = REDACTION_MARKER.to_string();
    }
}
