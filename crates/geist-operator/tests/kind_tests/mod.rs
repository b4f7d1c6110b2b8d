//! Integration tests for the Geist operator
//!
//! - `connector_lifecycle`: a connector is reconciled against a real API
//!   server, and deleting it lets the garbage collector remove its children

mod connector_lifecycle;
mod helpers;
