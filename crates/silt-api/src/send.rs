//! Signed-envelope distribution to peer channels.
//!
//! The send path signs an envelope with the node key and pushes it to every
//! configured peer channel in parallel. Each attempt runs under a fixed
//! timeout; the aggregate waits for all attempts and then reports the first
//! error, if any.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;

use silt_core::constants::SEND_CHANNEL_TIMEOUT_SECS;
use silt_core::error::SiltError;
use silt_core::operation::Envelope;

/// One peer endpoint that accepts signed envelopes.
#[async_trait]
pub trait PeerChannel: Send + Sync {
    /// Endpoint identifier, for logs and error messages.
    fn endpoint(&self) -> &str;

    /// Deliver one envelope.
    async fn send_envelope(&self, envelope: &Envelope) -> Result<(), SiltError>;
}

/// HTTP peer channel posting JSON envelopes.
pub struct HttpChannel {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpChannel {
    /// Create a channel for the given URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PeerChannel for HttpChannel {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_envelope(&self, envelope: &Envelope) -> Result<(), SiltError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(envelope)
            .send()
            .await
            .map_err(|e| SiltError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SiltError::Network(format!(
                "peer {} returned {}",
                self.endpoint,
                response.status()
            )));
        }
        Ok(())
    }
}

/// Distribute one signed envelope to every channel in parallel.
///
/// Each delivery runs under a [`SEND_CHANNEL_TIMEOUT_SECS`] timeout. All
/// deliveries are awaited before the first error, if any, is returned.
pub async fn distribute(
    channels: &[Arc<dyn PeerChannel>],
    envelope: &Envelope,
) -> Result<(), SiltError> {
    let mut set = JoinSet::new();
    for channel in channels {
        let channel = Arc::clone(channel);
        let envelope = envelope.clone();
        set.spawn(async move {
            let timeout = Duration::from_secs(SEND_CHANNEL_TIMEOUT_SECS);
            match tokio::time::timeout(timeout, channel.send_envelope(&envelope)).await {
                Ok(result) => result,
                Err(_) => Err(SiltError::Network(format!(
                    "peer {} timed out",
                    channel.endpoint()
                ))),
            }
        });
    }

    let mut first_error = None;
    while let Some(joined) = set.join_next().await {
        let result = match joined {
            Ok(result) => result,
            Err(e) => Err(SiltError::Network(e.to_string())),
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "envelope delivery failed");
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
