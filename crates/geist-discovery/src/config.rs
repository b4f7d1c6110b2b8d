//! Environment-driven configuration
//!
//! Every setting can come from a flag or its environment variable. A `.env`
//! file in the working directory is loaded first by the binary.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};

use geist_common::DEFAULT_CONNECTOR_NAMESPACE;

use crate::auth::JWKS_MIN_REFRESH;
use crate::error::{Error, Result};

/// How bearer tokens are verified
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum VerificationType {
    /// Against a public key or shared secret from `PUBLIC_KEY`
    #[default]
    #[value(name = "LOCAL")]
    Local,
    /// Against a key set fetched from `JWKS_URL`
    #[value(name = "JWKS")]
    Jwks,
}

/// Discovery API configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "geist-discovery", version, about, long_about = None)]
pub struct DiscoveryConfig {
    /// Host name or IP address to bind
    #[arg(long, env = "HTTP_HOST", default_value = "0.0.0.0")]
    pub http_host: String,

    /// Port to bind
    #[arg(long, env = "HTTP_PORT", default_value_t = 8080)]
    pub http_port: u16,

    /// Use ~/.kube/config instead of the in-cluster service account
    #[arg(long, env = "DEBUG", default_value = "false", action = ArgAction::Set, value_parser = parse_debug_flag)]
    pub debug: bool,

    /// Namespace connectors are listed from
    #[arg(long, env = "NAMESPACE", default_value = DEFAULT_CONNECTOR_NAMESPACE)]
    pub namespace: String,

    /// Token verification mode
    #[arg(long, env = "VERIFICATION_TYPE", value_enum, default_value_t = VerificationType::Local, ignore_case = true)]
    pub verification_type: VerificationType,

    /// JWT algorithm for LOCAL mode (e.g., RS256, ES256, HS256)
    #[arg(long, env = "JWT_ENCRYPTION", default_value = "RS256")]
    pub jwt_encryption: String,

    /// LOCAL mode key: base64 DER public key for RS*/ES*, raw secret for HS*
    #[arg(long, env = "PUBLIC_KEY", hide_env_values = true)]
    pub public_key: Option<String>,

    /// Key set URL for JWKS mode
    #[arg(long, env = "JWKS_URL")]
    pub jwks_url: Option<String>,

    /// Minimum seconds between key set refreshes
    #[arg(long, env = "JWKS_REFRESH_SECS", default_value_t = JWKS_MIN_REFRESH.as_secs())]
    pub jwks_refresh_secs: u64,
}

impl DiscoveryConfig {
    /// Socket address to bind, resolving `http_host` when it is a name
    pub async fn bind_addr(&self) -> Result<SocketAddr> {
        let host = self.http_host.trim();
        if host.is_empty() {
            return Err(Error::Config("HTTP_HOST is empty".into()));
        }

        tokio::net::lookup_host((host, self.http_port))
            .await
            .map_err(|e| Error::Config(format!("cannot resolve HTTP_HOST {host}: {e}")))?
            .next()
            .ok_or_else(|| Error::Config(format!("HTTP_HOST {host} resolved to no address")))
    }

    /// Key set refresh interval, never shorter than [`JWKS_MIN_REFRESH`]
    pub fn jwks_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.jwks_refresh_secs).max(JWKS_MIN_REFRESH)
    }
}

/// `DEBUG` is on for `true` or `TRUE`, off for anything else
fn parse_debug_flag(value: &str) -> std::result::Result<bool, std::convert::Infallible> {
    Ok(matches!(value, "true" | "TRUE"))
}
