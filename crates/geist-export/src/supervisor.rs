//! Supervised publisher connection
//!
//! [`ExportSupervisor`] owns the broker connection. It pings the broker on a
//! fixed interval and swaps in a fresh connection when the ping fails.
//! Publishers hold a [`PublisherHandle`] and always produce through whatever
//! connection is current.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broker::{BrokerClient, BrokerConnector, Payload, Record};
use crate::error::{ExportError, Result};
use crate::options::BrokerOptions;

/// Time between connection checks
pub const PING_INTERVAL: Duration = Duration::from_secs(60);

/// Deadline for a single ping
pub const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for a single produce
pub const PRODUCE_TIMEOUT: Duration = Duration::from_secs(10);

type SharedClient = Arc<dyn BrokerClient>;

async fn with_timeout<T>(
    operation: &'static str,
    after: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| ExportError::Timeout { operation, after })?
}

/// Owns the broker connection and keeps it alive
pub struct ExportSupervisor {
    connector: Arc<dyn BrokerConnector>,
    options: BrokerOptions,
    current: watch::Sender<SharedClient>,
    ping_interval: Duration,
}

impl ExportSupervisor {
    /// Connect and ping once. Fails if the broker is unreachable at startup.
    pub async fn start(connector: Arc<dyn BrokerConnector>, options: BrokerOptions) -> Result<Self> {
        let client = open(connector.as_ref(), &options).await?;
        info!(
            brokers = ?options.seed_brokers,
            topic = %options.topic,
            "connected to broker"
        );

        let (current, _) = watch::channel(client);
        Ok(Self {
            connector,
            options,
            current,
            ping_interval: PING_INTERVAL,
        })
    }

    /// Override the check interval
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Handle for publishers
    pub fn handle(&self) -> PublisherHandle {
        PublisherHandle {
            topic: self.options.topic.clone(),
            current: self.current.subscribe(),
        }
    }

    /// Check the connection every interval until cancelled
    ///
    /// Failures are logged and retried on the next tick, never returned.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("export supervisor stopped");
                    return;
                }
                _ = tokio::time::sleep(self.ping_interval) => {}
            }
            self.check().await;
        }
    }

    async fn check(&self) {
        let client = self.current.borrow().clone();
        let Err(e) = with_timeout("ping", PING_TIMEOUT, client.ping()).await else {
            debug!("broker ping ok");
            return;
        };

        warn!(error = %e, "unable to ping broker, reconnecting");
        match open(self.connector.as_ref(), &self.options).await {
            Ok(fresh) => {
                self.current.send_replace(fresh);
                info!("reconnected to broker");
            }
            Err(e) => warn!(error = %e, "reconnect failed, keeping previous connection"),
        }
    }
}

async fn open(connector: &dyn BrokerConnector, options: &BrokerOptions) -> Result<SharedClient> {
    let client = connector.connect(options).await?;
    with_timeout("ping", PING_TIMEOUT, client.ping()).await?;
    Ok(client)
}

/// Cloneable producer bound to the supervisor's current connection
#[derive(Clone)]
pub struct PublisherHandle {
    topic: String,
    current: watch::Receiver<SharedClient>,
}

impl PublisherHandle {
    /// Topic records are produced to
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Produce one payload as JSON keyed by its id
    pub async fn publish(&self, payload: &Payload) -> Result<()> {
        let record = Record::from_payload(&self.topic, payload)?;
        let client = self.current.borrow().clone();
        with_timeout("produce", PRODUCE_TIMEOUT, client.produce(record)).await
    }
}
