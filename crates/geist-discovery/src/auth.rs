//! Bearer token verification
//!
//! Tokens are checked either against key material from the environment or
//! against a remote JWKS document. Local key material is typed by the
//! algorithm family: `RS*` and `ES*` take a base64 DER SubjectPublicKeyInfo
//! whose key type must match, `HS*` takes the raw shared secret.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::{DiscoveryConfig, VerificationType};
use crate::error::{Error, Result};

/// Minimum interval between key set refreshes
pub const JWKS_MIN_REFRESH: Duration = Duration::from_secs(15 * 60);

/// Claims of an accepted token
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Subject
    pub sub: Option<String>,
    /// Issuer
    pub iss: Option<String>,
    /// Everything else
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Key family implied by a JWT algorithm
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KeyFamily {
    Rsa,
    Ec,
    Hmac,
}

fn key_family(algorithm: Algorithm) -> Result<KeyFamily> {
    match algorithm {
        Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => Ok(KeyFamily::Rsa),
        Algorithm::ES256 | Algorithm::ES384 => Ok(KeyFamily::Ec),
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(KeyFamily::Hmac),
        other => Err(Error::Config(format!(
            "unsupported algorithm family: {other:?}"
        ))),
    }
}

/// Verifies bearer tokens
pub enum TokenVerifier {
    /// RSA or ECDSA public key from the environment
    LocalAsymmetric {
        /// Accepted algorithm
        algorithm: Algorithm,
        /// Public key
        key: DecodingKey,
    },
    /// HMAC shared secret from the environment
    LocalSymmetric {
        /// Accepted algorithm
        algorithm: Algorithm,
        /// Shared secret
        key: DecodingKey,
    },
    /// Keys fetched from a JWKS endpoint
    RemoteKeySet(JwksCache),
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LocalAsymmetric { algorithm, .. } => {
                write!(f, "LocalAsymmetric({algorithm:?})")
            }
            Self::LocalSymmetric { algorithm, .. } => write!(f, "LocalSymmetric({algorithm:?})"),
            Self::RemoteKeySet(cache) => write!(f, "RemoteKeySet({})", cache.url()),
        }
    }
}

impl TokenVerifier {
    /// Build a verifier from the discovery configuration
    ///
    /// In JWKS mode the key set is fetched once here and startup fails if
    /// that fetch fails.
    pub async fn from_config(config: &DiscoveryConfig) -> Result<Self> {
        match config.verification_type {
            VerificationType::Local => {
                let key = config
                    .public_key
                    .as_deref()
                    .ok_or_else(|| Error::Config("PUBLIC_KEY is required in LOCAL mode".into()))?;
                Self::local(&config.jwt_encryption, key)
            }
            VerificationType::Jwks => {
                let url = config
                    .jwks_url
                    .as_deref()
                    .ok_or_else(|| Error::Config("JWKS_URL is required in JWKS mode".into()))?;
                Self::remote(url, config.jwks_refresh_interval()).await
            }
        }
    }

    /// Verifier for key material supplied in the environment
    pub fn local(algorithm: &str, key_material: &str) -> Result<Self> {
        let algorithm = Algorithm::from_str(algorithm)
            .map_err(|_| Error::Config(format!("unsupported algorithm family: {algorithm}")))?;

        match key_family(algorithm)? {
            KeyFamily::Hmac => Ok(Self::LocalSymmetric {
                algorithm,
                key: DecodingKey::from_secret(key_material.as_bytes()),
            }),
            family => {
                let der = STANDARD
                    .decode(key_material.trim())
                    .map_err(|e| Error::Config(format!("failed to decode base64 public key: {e}")))?;
                let pem = spki_pem(&der);
                let key = match family {
                    KeyFamily::Rsa => DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
                        Error::Config(format!("public key is not an RSA key for {algorithm:?}: {e}"))
                    })?,
                    _ => DecodingKey::from_ec_pem(pem.as_bytes()).map_err(|e| {
                        Error::Config(format!("public key is not an ECDSA key for {algorithm:?}: {e}"))
                    })?,
                };
                Ok(Self::LocalAsymmetric { algorithm, key })
            }
        }
    }

    /// Verifier backed by a remote key set
    pub async fn remote(url: &str, refresh_interval: Duration) -> Result<Self> {
        Ok(Self::RemoteKeySet(
            JwksCache::fetch(url, refresh_interval).await?,
        ))
    }

    /// Verify a token's signature and time claims
    pub async fn verify(&self, token: &str) -> Result<TokenClaims> {
        let (key, algorithm) = match self {
            Self::LocalAsymmetric { algorithm, key } | Self::LocalSymmetric { algorithm, key } => {
                (key.clone(), *algorithm)
            }
            Self::RemoteKeySet(cache) => {
                let header = decode_header(token)?;
                let key = cache.decoding_key(header.kid.as_deref()).await?;
                (key, header.alg)
            }
        };

        let claims = decode::<TokenClaims>(token, &key, &validation(algorithm))?.claims;
        debug!(sub = ?claims.sub, "token accepted");
        Ok(claims)
    }
}

/// Signature plus `exp`/`nbf` when present. No claim is mandatory and the
/// audience is not checked.
fn validation(algorithm: Algorithm) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.required_spec_claims.clear();
    validation.validate_aud = false;
    validation.validate_nbf = true;
    validation
}

/// Wrap DER SubjectPublicKeyInfo bytes as PEM
fn spki_pem(der: &[u8]) -> String {
    let encoded = STANDARD.encode(der);
    let mut pem = String::from("-----BEGIN PUBLIC KEY-----\n");
    for line in encoded.as_bytes().chunks(64) {
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str("-----END PUBLIC KEY-----\n");
    pem
}

struct CachedKeySet {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Remote key set, refreshed lazily
///
/// A refresh happens on lookup once the cached set is older than the
/// refresh interval. If the refresh fails the previous set keeps serving.
pub struct JwksCache {
    url: String,
    refresh_interval: Duration,
    http_client: reqwest::Client,
    state: RwLock<CachedKeySet>,
}

impl JwksCache {
    /// Fetch the key set for the first time
    pub async fn fetch(url: &str, refresh_interval: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        let keys = download(&http_client, url).await?;
        info!(url = %url, key_count = keys.keys.len(), "Fetched JWKS");

        Ok(Self {
            url: url.to_string(),
            refresh_interval,
            http_client,
            state: RwLock::new(CachedKeySet {
                keys,
                fetched_at: Instant::now(),
            }),
        })
    }

    /// Key set URL
    fn url(&self) -> &str {
        &self.url
    }

    /// Look up a key by `kid`, or the first key when the token has none
    pub async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey> {
        self.refresh_if_stale().await;

        let state = self.state.read().await;
        let jwk = match kid {
            Some(kid) => state.keys.find(kid),
            None => state.keys.keys.first(),
        }
        .ok_or_else(|| Error::Unauthorized(format!("no matching key in JWKS for kid {kid:?}")))?;

        DecodingKey::from_jwk(jwk).map_err(Error::from)
    }

    async fn refresh_if_stale(&self) {
        let stale = self.state.read().await.fetched_at.elapsed() > self.refresh_interval;
        if !stale {
            return;
        }

        match download(&self.http_client, &self.url).await {
            Ok(keys) => {
                debug!(url = %self.url, key_count = keys.keys.len(), "Refreshed JWKS");
                let mut state = self.state.write().await;
                state.keys = keys;
                state.fetched_at = Instant::now();
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "JWKS refresh failed, keeping cached keys");
            }
        }
    }

    #[cfg(test)]
    fn set_refresh_interval(&mut self, interval: Duration) {
        self.refresh_interval = interval;
    }
}

async fn download(client: &reqwest::Client, url: &str) -> Result<JwkSet> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.json::<JwkSet>().await?)
}

/// Extract Bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
