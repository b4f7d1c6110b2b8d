//! Supporting types for the GeistConnector CRD

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// OPC UA message security mode
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum SecurityMode {
    /// No signing or encryption
    #[default]
    None,
    /// Messages are signed
    Sign,
    /// Messages are signed and encrypted
    SignAndEncrypt,
}

impl std::fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Sign => write!(f, "Sign"),
            Self::SignAndEncrypt => write!(f, "SignAndEncrypt"),
        }
    }
}

/// OPC UA security policy
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum SecurityPolicy {
    /// No security policy
    #[default]
    None,
    /// Basic256 (deprecated by the OPC foundation, still common on PLCs)
    Basic256,
    /// Basic256Sha256
    Basic256Sha256,
    /// Aes256-Sha256-RsaPss
    Aes256Sha256RsaPss,
    /// Aes128-Sha256-RsaOaep
    Aes128Sha256RsaOaep,
}

impl std::fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Basic256 => write!(f, "Basic256"),
            Self::Basic256Sha256 => write!(f, "Basic256Sha256"),
            Self::Aes256Sha256RsaPss => write!(f, "Aes256Sha256RsaPss"),
            Self::Aes128Sha256RsaOaep => write!(f, "Aes128Sha256RsaOaep"),
        }
    }
}

/// How the connector authenticates against the OPC UA server
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum AuthenticationType {
    /// Anonymous session
    #[default]
    None,
    /// Username and password identity token
    #[serde(rename = "User&Password")]
    UserPassword,
    /// X.509 identity token
    Certificate,
}

impl std::fmt::Display for AuthenticationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::UserPassword => write!(f, "User&Password"),
            Self::Certificate => write!(f, "Certificate"),
        }
    }
}

/// SASL mechanism for the downstream broker
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum SaslType {
    /// SASL/PLAIN
    #[serde(rename = "plain")]
    Plain,
    /// SCRAM-SHA-256
    #[serde(rename = "scram-sha-256")]
    ScramSha256,
    /// SCRAM-SHA-512
    #[serde(rename = "scram-sha-512")]
    ScramSha512,
}

impl std::str::FromStr for SaslType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Self::Plain),
            "scram-sha-256" => Ok(Self::ScramSha256),
            "scram-sha-512" => Ok(Self::ScramSha512),
            _ => Err(crate::Error::validation(format!(
                "invalid sasl type: {s}, expected one of: plain, scram-sha-256, scram-sha-512"
            ))),
        }
    }
}

impl std::fmt::Display for SaslType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::ScramSha256 => write!(f, "scram-sha-256"),
            Self::ScramSha512 => write!(f, "scram-sha-512"),
        }
    }
}

/// Where the connector's OPC UA client certificate comes from
///
/// Derived once from the certificate block and threaded through both the
/// secret step and the workload builder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CertificateSource {
    /// The connector generates its own certificate at startup
    AutoCreated,
    /// A certificate is provisioned by something outside the operator
    External,
    /// Certificate and key are inlined in the spec and shipped in a Secret
    SelfManaged,
}

impl CertificateSource {
    /// Returns true if the operator has to create and mount a Secret
    pub fn needs_secret(&self) -> bool {
        matches!(self, Self::SelfManaged)
    }
}

impl std::fmt::Display for CertificateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AutoCreated => write!(f, "auto-created"),
            Self::External => write!(f, "external"),
            Self::SelfManaged => write!(f, "self-managed"),
        }
    }
}

/// Condition status following Kubernetes conventions
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

/// Kubernetes-style condition for status reporting
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Condition {
    /// Type of condition (e.g., Ready)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    pub reason: String,

    /// Human-readable message
    pub message: String,

    /// Last time the condition transitioned
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: DateTime<Utc>,
}
