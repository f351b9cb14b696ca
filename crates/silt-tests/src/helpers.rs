//! Block and state fixtures shared across the end-to-end tests.

use std::sync::Arc;

use silt_core::address::Address;
use silt_core::amount::{Amount, CurrencyId};
use silt_core::operation::{Operation, OperationBody};
use silt_core::state::{AccountState, BalanceState, StateUpdate};
use silt_core::types::{Block, Hash256, Height, Manifest};
use silt_digest::{ArchiveStore, DigestStore};

/// A validated address fixture.
pub fn addr(s: &str) -> Address {
    Address::new(s).expect("fixture address must be valid")
}

/// A validated currency id fixture.
pub fn cid(s: &str) -> CurrencyId {
    CurrencyId::new(s).expect("fixture currency must be valid")
}

/// A manifest with a deterministic hash.
pub fn manifest(height: i64) -> Manifest {
    let mut m = Manifest {
        height: Height(height),
        hash: Hash256::ZERO,
        previous_hash: Hash256::ZERO,
        operations_hash: Hash256::ZERO,
        states_hash: Hash256::ZERO,
        confirmed_at: 1_700_000_000 + height,
    };
    m.hash = m.digest();
    m
}

/// A finalized block fixture.
pub fn block(height: i64, operations: Vec<Operation>, states: Vec<StateUpdate>) -> Block {
    Block {
        manifest: manifest(height),
        operations,
        states,
    }
}

/// An applied transfer between two addresses.
pub fn transfer(fact_seed: u8, sender: &Address, receiver: &Address) -> Operation {
    Operation {
        fact_hash: Hash256([fact_seed; 32]),
        body: OperationBody::Transfer {
            sender: sender.clone(),
            receiver: receiver.clone(),
            amounts: vec![Amount::new(cid("SLT"), 1)],
        },
        in_state: true,
        reason: None,
    }
}

/// An account record at a height.
pub fn account_state(address: &Address, height: i64) -> StateUpdate {
    StateUpdate::Account(AccountState {
        address: address.clone(),
        public_key: "00".repeat(32),
        height: Height(height),
        previous_height: Height::NIL,
    })
}

/// A balance record for one currency at a height.
pub fn balance_state(
    address: &Address,
    currency: &str,
    value: u128,
    height: i64,
    previous: i64,
) -> StateUpdate {
    StateUpdate::Balance(BalanceState {
        address: address.clone(),
        amount: Amount::new(cid(currency), value),
        height: Height(height),
        previous_height: Height(previous),
    })
}

/// A fresh archive plus derived store in a temp dir.
pub fn temp_stores() -> (Arc<ArchiveStore>, Arc<DigestStore>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let archive = Arc::new(ArchiveStore::open(dir.path().join("archive")).expect("archive"));
    let primary: Arc<dyn silt_digest::PrimaryLedger> = Arc::clone(&archive);
    let store = DigestStore::open(dir.path().join("digest"), primary).expect("digest store");
    store.initialize().expect("initialize");
    (archive, Arc::new(store), dir)
}
