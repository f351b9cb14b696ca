//! One block's worth of derived-store upserts.
//!
//! A session is built fully in memory by [`BlockSession::prepare`] and
//! applied in one atomic batch by [`BlockSession::commit`]. A failure in
//! either phase leaves the store untouched; the last-digested-height marker
//! is advanced by the caller only after a successful commit.

use std::sync::Arc;

use silt_core::error::SiltError;
use silt_core::state::StateUpdate;
use silt_core::types::{Block, Height};

use crate::store::{DigestStore, Upsert};
use crate::values::OperationValue;

/// Ingestion unit for one finalized block.
pub struct BlockSession {
    store: Arc<DigestStore>,
    block: Block,
    upserts: Vec<Upsert>,
    prepared: bool,
}

impl BlockSession {
    /// Create a session against a writable store.
    pub fn new(store: Arc<DigestStore>, block: Block) -> Result<Self, SiltError> {
        if store.readonly() {
            return Err(SiltError::Readonly);
        }
        Ok(Self {
            store,
            block,
            upserts: Vec::new(),
            prepared: false,
        })
    }

    /// Height of the block this session ingests.
    pub fn height(&self) -> Height {
        self.block.height()
    }

    /// Derive every upsert for this block without touching storage:
    /// the block's state updates, plus one operation record per confirmed
    /// operation with sequential index assignment in block order and
    /// per-address fan-out.
    pub fn prepare(&mut self) -> Result<(), SiltError> {
        let mut upserts =
            Vec::with_capacity(self.block.states.len() + self.block.operations.len());

        for state in &self.block.states {
            upserts.push(match state {
                StateUpdate::Account(s) => Upsert::Account(s.clone()),
                StateUpdate::Balance(s) => Upsert::Balance(s.clone()),
                StateUpdate::Document(s) => Upsert::Document(s.clone()),
                StateUpdate::FileData(s) => Upsert::FileData(s.clone()),
            });
        }

        let height = self.block.height();
        let confirmed_at = self.block.manifest.confirmed_at;
        for (index, op) in self.block.operations.iter().enumerate() {
            upserts.push(Upsert::Operation(OperationValue {
                addresses: op.body.addresses(),
                op: op.clone(),
                height,
                confirmed_at,
                index: index as u64,
            }));
        }

        self.upserts = upserts;
        self.prepared = true;
        Ok(())
    }

    /// Apply the prepared upserts as one atomic batch.
    pub fn commit(&mut self) -> Result<(), SiltError> {
        if !self.prepared {
            return Err(SiltError::Storage("session committed before prepare".into()));
        }
        self.store.apply_upserts(&self.upserts)
    }
}

/// Digest one block: prepare, commit, then advance the marker.
///
/// The marker moves only after a fully successful commit, so a failure here
/// never leaves the marker ahead of what was written.
pub fn digest_block(store: &Arc<DigestStore>, block: Block) -> Result<Height, SiltError> {
    let height = block.height();
    let mut session = BlockSession::new(Arc::clone(store), block)?;
    session.prepare()?;
    session.commit()?;
    store.set_last_block(height)?;
    Ok(height)
}
