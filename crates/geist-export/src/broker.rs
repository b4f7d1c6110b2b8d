//! Broker client seam
//!
//! The concrete Kafka-protocol client lives behind these traits. The
//! supervisor only needs to connect, ping and produce.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::options::BrokerOptions;

/// One sampled value from a monitored node
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Payload {
    /// Node id the value was read from; also the record key
    pub id: String,
    /// Sampled value
    pub value: serde_json::Value,
    /// Source timestamp
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
}

/// A record ready to be produced
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Destination topic
    pub topic: String,
    /// Partitioning key
    pub key: Vec<u8>,
    /// Encoded payload
    pub value: Vec<u8>,
    /// Record timestamp
    pub timestamp: DateTime<Utc>,
}

impl Record {
    /// Encode a payload as JSON keyed by its id
    pub fn from_payload(topic: &str, payload: &Payload) -> Result<Self> {
        Ok(Self {
            topic: topic.to_string(),
            key: payload.id.as_bytes().to_vec(),
            value: serde_json::to_vec(payload)?,
            timestamp: payload.timestamp,
        })
    }
}

/// Opens broker connections
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Create a client for the given options
    async fn connect(&self, options: &BrokerOptions) -> Result<Arc<dyn BrokerClient>>;
}

/// A live broker connection
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Round-trip to the cluster
    async fn ping(&self) -> Result<()>;

    /// Produce one record and wait for the acknowledgement
    async fn produce(&self, record: Record) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn record_is_keyed_by_node_id() {
        let payload = Payload {
            id: "ns=2;s=Temperature".to_string(),
            value: serde_json::json!(21.5),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };

        let record = Record::from_payload("telemetry", &payload).unwrap();

        assert_eq!(record.topic, "telemetry");
        assert_eq!(record.key, b"ns=2;s=Temperature");
        assert_eq!(record.timestamp, payload.timestamp);
        let body: serde_json::Value = serde_json::from_slice(&record.value).unwrap();
        assert_eq!(body["id"], "ns=2;s=Temperature");
        assert_eq!(body["value"], 21.5);
        assert_eq!(body["ts"], "2024-05-01T12:00:00Z");
    }
}
