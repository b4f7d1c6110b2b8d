//! GeistConnector operator
//!
//! Turns each GeistConnector into a ConfigMap, an optional certificate
//! Secret, and a Deployment, all owned by the connector so deleting it
//! cascades through the garbage collector.

#![deny(missing_docs)]

pub mod builders;
pub mod controller;
pub mod ownership;
pub mod runner;

pub use geist_common::{Error, Result};
