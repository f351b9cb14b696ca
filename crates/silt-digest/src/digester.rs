//! Single-writer ingestion pipeline.
//!
//! The digester owns the only path that commits block sessions. Producers
//! hand it batches of finalized blocks — possibly out of height order — via
//! [`Digester::digest`]; a bounded queue applies back-pressure instead of
//! dropping. One consumer task digests blocks strictly one at a time,
//! retrying each block under a [`RetryPolicy`] and reporting every attempt
//! outcome on an optional error channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use silt_core::constants::{DIGEST_QUEUE_CAPACITY, DIGEST_RETRY_DELAY_MS};
use silt_core::error::SiltError;
use silt_core::types::{Block, Height};

use crate::session::digest_block;
use crate::store::DigestStore;

/// Outcome of one digestion attempt, reported per attempt.
#[derive(Clone, Debug)]
pub struct DigestReport {
    /// Height of the block the attempt was for.
    pub height: Height,
    /// The attempt's error, or `None` on success.
    pub error: Option<SiltError>,
}

/// Retry policy for a failing block.
///
/// The default retries forever with a one-second delay, which blocks all
/// later queued blocks until the failing one succeeds — ordering is
/// preferred over progress.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Maximum attempts per block; `None` retries without bound.
    pub max_attempts: Option<u32>,
    /// Delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            delay: Duration::from_millis(DIGEST_RETRY_DELAY_MS),
        }
    }
}

/// Handle to the running ingestion task.
pub struct Digester {
    block_tx: mpsc::Sender<Block>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Digester {
    /// Spawn the consumer task against a writable store.
    ///
    /// Every attempt outcome (success or failure) is sent to `report_tx`
    /// when one is configured; sends never block the consumer.
    pub fn start(
        store: Arc<DigestStore>,
        policy: RetryPolicy,
        report_tx: Option<mpsc::UnboundedSender<DigestReport>>,
    ) -> Self {
        let (block_tx, block_rx) = mpsc::channel(DIGEST_QUEUE_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_loop(store, policy, block_rx, shutdown_rx, report_tx));

        Self {
            block_tx,
            shutdown_tx,
            handle,
        }
    }

    /// Enqueue finalized blocks for ingestion, sorted ascending by height.
    ///
    /// Blocks the caller once the internal queue is full; blocks are never
    /// dropped. Fails only when the consumer task has stopped.
    pub async fn digest(&self, mut blocks: Vec<Block>) -> Result<(), SiltError> {
        blocks.sort_by_key(|b| b.height());
        for block in blocks {
            tracing::debug!(height = %block.height(), "enqueue block for digestion");
            self.block_tx
                .send(block)
                .await
                .map_err(|_| SiltError::Storage("digester stopped".into()))?;
        }
        Ok(())
    }

    /// Signal shutdown and wait for the consumer task to finish. The task
    /// completes or abandons the in-flight block but never interrupts a
    /// commit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        drop(self.block_tx);
        let _ = self.handle.await;
    }
}

async fn run_loop(
    store: Arc<DigestStore>,
    policy: RetryPolicy,
    mut block_rx: mpsc::Receiver<Block>,
    mut shutdown_rx: watch::Receiver<bool>,
    report_tx: Option<mpsc::UnboundedSender<DigestReport>>,
) {
    loop {
        let block = tokio::select! {
            _ = shutdown_rx.changed() => {
                tracing::debug!("digester stopped");
                break;
            }
            next = block_rx.recv() => match next {
                Some(block) => block,
                None => {
                    tracing::debug!("block channel closed, digester stopped");
                    break;
                }
            },
        };

        let height = block.height();
        match digest_with_retry(&store, &policy, block, &mut shutdown_rx, &report_tx).await {
            Ok(()) => {
                tracing::info!(height = %height, "block digested");
            }
            Err(e) => {
                tracing::error!(height = %height, error = %e, "failed to digest block");
            }
        }
    }
}

/// Digest one block under the retry policy.
///
/// Each attempt's outcome is reported; between failed attempts the loop
/// sleeps for the configured delay unless shutdown is signalled, in which
/// case the block is abandoned.
async fn digest_with_retry(
    store: &Arc<DigestStore>,
    policy: &RetryPolicy,
    block: Block,
    shutdown_rx: &mut watch::Receiver<bool>,
    report_tx: &Option<mpsc::UnboundedSender<DigestReport>>,
) -> Result<(), SiltError> {
    let height = block.height();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let result = digest_block(store, block.clone());
        report(report_tx, height, result.as_ref().err().cloned());

        let err = match result {
            Ok(_) => return Ok(()),
            Err(e) => e,
        };

        tracing::warn!(
            height = %height,
            attempt,
            error = %err,
            "digestion attempt failed"
        );

        if let Some(max) = policy.max_attempts {
            if attempt >= max {
                return Err(err);
            }
        }

        tokio::select! {
            _ = shutdown_rx.changed() => {
                tracing::debug!(height = %height, "abandoning block on shutdown");
                return Err(err);
            }
            _ = tokio::time::sleep(policy.delay) => {}
        }
    }
}

fn report(
    report_tx: &Option<mpsc::UnboundedSender<DigestReport>>,
    height: Height,
    error: Option<SiltError>,
) {
    if let Some(tx) = report_tx {
        // Fire and forget; a closed or slow receiver never stalls ingestion.
        let _ = tx.send(DigestReport { height, error });
    }
}
