//! Broker client options derived from the connector configuration

use std::fmt;

use geist_common::crd::{RedpandaConfig, SaslType};

use crate::error::{ExportError, Result};

/// How the broker's TLS certificate is checked
///
/// Connections are always TLS.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TlsMode {
    /// Verify the broker certificate chain
    Verify,
    /// Accept any broker certificate
    InsecureSkipVerify,
}

/// SASL mechanism plus credentials
#[derive(Clone, PartialEq, Eq)]
pub struct SaslCredentials {
    /// Mechanism
    pub mechanism: SaslType,
    /// Username
    pub user: String,
    /// Password
    pub password: String,
}

impl fmt::Debug for SaslCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaslCredentials")
            .field("mechanism", &self.mechanism)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Everything a broker client needs to connect and produce
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerOptions {
    /// Seed brokers (host:port)
    pub seed_brokers: Vec<String>,
    /// Topic records are produced to
    pub topic: String,
    /// TLS verification
    pub tls: TlsMode,
    /// SASL authentication, none without an `auth` block or with an empty
    /// mechanism
    pub sasl: Option<SaslCredentials>,
}

impl BrokerOptions {
    /// Derive options from the `redpanda` section
    pub fn from_config(config: &RedpandaConfig) -> Result<Self> {
        let seed_brokers: Vec<String> = config
            .brokers
            .iter()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        if seed_brokers.is_empty() {
            return Err(ExportError::InvalidOptions(
                "at least one seed broker is required".into(),
            ));
        }

        let tls = if config.tls.insecure_skip_verify {
            TlsMode::InsecureSkipVerify
        } else {
            TlsMode::Verify
        };

        let sasl = config.auth.as_ref().and_then(|auth| {
            auth.sasl.type_.map(|mechanism| SaslCredentials {
                mechanism,
                user: auth.sasl.user.clone(),
                password: auth.sasl.password.clone(),
            })
        });

        Ok(Self {
            seed_brokers,
            topic: config.topic.clone(),
            tls,
            sasl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geist_common::crd::{RedpandaAuthConfig, RedpandaTlsConfig, SaslConfig};
    use rstest::rstest;

    fn redpanda(brokers: &[&str]) -> RedpandaConfig {
        RedpandaConfig {
            brokers: brokers.iter().map(|b| b.to_string()).collect(),
            topic: "telemetry".to_string(),
            auth: None,
            tls: RedpandaTlsConfig::default(),
        }
    }

    #[test]
    fn plain_config_verifies_tls_without_sasl() {
        let options = BrokerOptions::from_config(&redpanda(&["rp-0:9092"])).unwrap();
        assert_eq!(options.seed_brokers, vec!["rp-0:9092"]);
        assert_eq!(options.topic, "telemetry");
        assert_eq!(options.tls, TlsMode::Verify);
        assert!(options.sasl.is_none());
    }

    #[test]
    fn insecure_skip_verify_is_honored() {
        let mut config = redpanda(&["rp-0:9092"]);
        config.tls.insecure_skip_verify = true;
        let options = BrokerOptions::from_config(&config).unwrap();
        assert_eq!(options.tls, TlsMode::InsecureSkipVerify);
    }

    #[rstest]
    #[case::plain(SaslType::Plain)]
    #[case::scram_256(SaslType::ScramSha256)]
    #[case::scram_512(SaslType::ScramSha512)]
    fn sasl_mechanism_is_carried(#[case] mechanism: SaslType) {
        let mut config = redpanda(&["rp-0:9092"]);
        config.auth = Some(RedpandaAuthConfig {
            sasl: SaslConfig {
                type_: Some(mechanism),
                user: "exporter".to_string(),
                password: "secret".to_string(),
            },
        });

        let sasl = BrokerOptions::from_config(&config).unwrap().sasl.unwrap();
        assert_eq!(sasl.mechanism, mechanism);
        assert_eq!(sasl.user, "exporter");
        assert_eq!(sasl.password, "secret");
    }

    #[test]
    fn empty_mechanism_disables_sasl() {
        let mut config = redpanda(&["rp-0:9092"]);
        config.auth = Some(RedpandaAuthConfig {
            sasl: SaslConfig {
                type_: None,
                user: String::new(),
                password: String::new(),
            },
        });
        assert!(BrokerOptions::from_config(&config).unwrap().sasl.is_none());
    }

    #[test]
    fn password_is_hidden_from_debug_output() {
        let sasl = SaslCredentials {
            mechanism: SaslType::Plain,
            user: "exporter".to_string(),
            password: "secret".to_string(),
        };
        assert!(!format!("{sasl:?}").contains("secret"));
    }

    #[rstest]
    #[case::none(&[])]
    #[case::blank(&["", "  "])]
    fn seed_broker_is_required(#[case] brokers: &[&str]) {
        assert!(matches!(
            BrokerOptions::from_config(&redpanda(brokers)),
            Err(ExportError::InvalidOptions(_))
        ));
    }
}
