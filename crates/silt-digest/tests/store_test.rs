//! Integration tests for the derived store, block sessions, and digester.

use std::sync::Arc;

use silt_core::address::Address;
use silt_core::amount::{Amount, CurrencyId};
use silt_core::error::SiltError;
use silt_core::operation::{Operation, OperationBody};
use silt_core::state::{AccountState, BalanceState, DocumentState, FileDataState, StateUpdate};
use silt_core::types::{Block, Hash256, Height, Manifest};
use silt_digest::{
    ArchiveStore, BlockSession, DigestReport, DigestStore, Digester, OperationsFilter,
    RetryPolicy, digest_block,
};

// ------------------------------------------------------------------
// Helpers
// ------------------------------------------------------------------

fn addr(s: &str) -> Address {
    Address::new(s).unwrap()
}

fn cid(s: &str) -> CurrencyId {
    CurrencyId::new(s).unwrap()
}

fn manifest(height: i64) -> Manifest {
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

fn block(height: i64, operations: Vec<Operation>, states: Vec<StateUpdate>) -> Block {
    Block {
        manifest: manifest(height),
        operations,
        states,
    }
}

fn transfer(fact_seed: u8, sender: &Address, receiver: &Address) -> Operation {
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

fn account_state(address: &Address, height: i64) -> StateUpdate {
    StateUpdate::Account(AccountState {
        address: address.clone(),
        public_key: "00".repeat(32),
        height: Height(height),
        previous_height: Height::NIL,
    })
}

fn balance_state(
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

/// Derived store over a fresh archive in a temp dir.
fn temp_store() -> (Arc<DigestStore>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let archive = Arc::new(ArchiveStore::open(dir.path().join("archive")).unwrap());
    let store = DigestStore::open(dir.path().join("digest"), archive).unwrap();
    store.initialize().unwrap();
    (Arc::new(store), dir)
}

// ------------------------------------------------------------------
// Marker
// ------------------------------------------------------------------

#[test]
fn fresh_store_has_nil_marker() {
    let (store, _dir) = temp_store();
    assert_eq!(store.last_block(), Height::NIL);
}

#[test]
fn set_last_block_is_monotone() {
    let (store, _dir) = temp_store();
    store.set_last_block(Height(5)).unwrap();
    assert_eq!(store.last_block(), Height(5));

    // Lower or equal heights are a no-op.
    store.set_last_block(Height(3)).unwrap();
    assert_eq!(store.last_block(), Height(5));
    store.set_last_block(Height(5)).unwrap();
    assert_eq!(store.last_block(), Height(5));

    store.set_last_block(Height(6)).unwrap();
    assert_eq!(store.last_block(), Height(6));
}

#[test]
fn marker_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let archive = Arc::new(ArchiveStore::open(dir.path().join("archive")).unwrap());
    {
        let store = DigestStore::open(dir.path().join("digest"), Arc::clone(&archive)).unwrap();
        store.initialize().unwrap();
        store.set_last_block(Height(9)).unwrap();
    }
    let store = DigestStore::open(dir.path().join("digest"), archive).unwrap();
    store.initialize().unwrap();
    assert_eq!(store.last_block(), Height(9));
}

// ------------------------------------------------------------------
// Block sessions
// ------------------------------------------------------------------

#[test]
fn session_commit_requires_prepare() {
    let (store, _dir) = temp_store();
    let mut session = BlockSession::new(Arc::clone(&store), block(0, vec![], vec![])).unwrap();
    assert!(session.commit().is_err());
    session.prepare().unwrap();
    session.commit().unwrap();
}

#[test]
fn digest_block_advances_marker() {
    let (store, _dir) = temp_store();
    let alice = addr("alice");
    let b = block(
        0,
        vec![transfer(1, &alice, &addr("bob"))],
        vec![
            account_state(&alice, 0),
            balance_state(&alice, "SLT", 100, 0, -1),
        ],
    );
    let h = digest_block(&store, b).unwrap();
    assert_eq!(h, Height(0));
    assert_eq!(store.last_block(), Height(0));
}

#[test]
fn idempotent_redigestion() {
    let (store, _dir) = temp_store();
    let alice = addr("alice");
    let b = block(
        0,
        vec![transfer(1, &alice, &addr("bob"))],
        vec![
            account_state(&alice, 0),
            balance_state(&alice, "SLT", 100, 0, -1),
        ],
    );

    digest_block(&store, b.clone()).unwrap();
    let first = store.account(&alice).unwrap().unwrap();

    // Digesting the same block again (forced retry) changes nothing.
    digest_block(&store, b).unwrap();
    let second = store.account(&alice).unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(store.last_block(), Height(0));
}

// ------------------------------------------------------------------
// Account / balance join
// ------------------------------------------------------------------

#[test]
fn account_not_found_without_record() {
    let (store, _dir) = temp_store();
    assert!(store.account(&addr("ghost")).unwrap().is_none());
}

#[test]
fn account_joins_latest_balance_per_currency() {
    let (store, _dir) = temp_store();
    let alice = addr("alice");

    digest_block(
        &store,
        block(
            0,
            vec![],
            vec![
                account_state(&alice, 0),
                balance_state(&alice, "SLT", 100, 0, -1),
                balance_state(&alice, "USD", 7, 0, -1),
            ],
        ),
    )
    .unwrap();
    digest_block(
        &store,
        block(1, vec![], vec![balance_state(&alice, "SLT", 90, 1, 0)]),
    )
    .unwrap();
    digest_block(
        &store,
        block(2, vec![], vec![balance_state(&alice, "SLT", 80, 2, 1)]),
    )
    .unwrap();

    let va = store.account(&alice).unwrap().unwrap();
    assert_eq!(va.address, alice);
    // One entry per currency, sorted by currency id.
    assert_eq!(
        va.balances,
        vec![Amount::new(cid("SLT"), 80), Amount::new(cid("USD"), 7)]
    );
    // Height comes from the newest contributing record, previous height
    // from that record's link.
    assert_eq!(va.height, Height(2));
    assert_eq!(va.previous_height, Height(1));
}

#[test]
fn account_without_balances_uses_account_record_heights() {
    let (store, _dir) = temp_store();
    let carol = addr("carol");
    digest_block(&store, block(3, vec![], vec![account_state(&carol, 3)])).unwrap();

    let va = store.account(&carol).unwrap().unwrap();
    assert!(va.balances.is_empty());
    assert_eq!(va.height, Height(3));
    assert_eq!(va.previous_height, Height::NIL);
}

// ------------------------------------------------------------------
// Document / filedata join
// ------------------------------------------------------------------

#[test]
fn document_joins_latest_filedata() {
    let (store, _dir) = temp_store();
    let owner = addr("owner1");

    digest_block(
        &store,
        block(
            0,
            vec![],
            vec![StateUpdate::Document(DocumentState {
                address: owner.clone(),
                document_id: 1,
                file_hash: "abcd".into(),
                height: Height(0),
                previous_height: Height::NIL,
            })],
        ),
    )
    .unwrap();
    digest_block(
        &store,
        block(
            1,
            vec![],
            vec![StateUpdate::FileData(FileDataState {
                address: owner.clone(),
                file_hash: "abcd".into(),
                signer: addr("signer1"),
                height: Height(1),
                previous_height: Height(0),
            })],
        ),
    )
    .unwrap();

    let dv = store.document(&owner).unwrap().unwrap();
    assert_eq!(dv.document.document_id, 1);
    assert_eq!(dv.filedata.as_ref().unwrap().signer, addr("signer1"));
    assert_eq!(dv.height, Height(1));
    assert_eq!(dv.previous_height, Height(0));

    assert!(store.document(&addr("nobody")).unwrap().is_none());
}

// ------------------------------------------------------------------
// Operation scans
// ------------------------------------------------------------------

/// Ten operations for `alice` across heights 0..=2 round-robin, with
/// per-block index assignment.
fn seed_operations(store: &Arc<DigestStore>) -> Address {
    let alice = addr("alice");
    let bob = addr("bob");
    let mut per_height: Vec<Vec<Operation>> = vec![vec![], vec![], vec![]];
    for i in 0..10u8 {
        per_height[(i % 3) as usize].push(transfer(i + 1, &alice, &bob));
    }
    for (h, ops) in per_height.into_iter().enumerate() {
        digest_block(store, block(h as i64, ops, vec![])).unwrap();
    }
    alice
}

#[test]
fn operations_by_address_orders_by_height_then_index() {
    let (store, _dir) = temp_store();
    let alice = seed_operations(&store);

    let mut seen = Vec::new();
    store
        .operations_by_address(&alice, true, false, None, 0, |fact, va| {
            let va = va.unwrap();
            assert_eq!(va.op.fact_hash, fact);
            seen.push(va.cursor());
            Ok(true)
        })
        .unwrap();

    let mut expected = seen.clone();
    expected.sort();
    assert_eq!(seen, expected, "forward scan must be (height, index) sorted");
    assert_eq!(seen.len(), 10);

    // Reverse scan is the exact mirror.
    let mut rev = Vec::new();
    store
        .operations_by_address(&alice, true, true, None, 0, |_, va| {
            rev.push(va.unwrap().cursor());
            Ok(true)
        })
        .unwrap();
    let mut forward_again = rev.clone();
    forward_again.reverse();
    assert_eq!(forward_again, seen);
}

#[test]
fn operations_by_address_paginates_without_gaps() {
    let (store, _dir) = temp_store();
    let alice = seed_operations(&store);

    // First page of three.
    let mut page1 = Vec::new();
    store
        .operations_by_address(&alice, true, false, None, 3, |_, va| {
            page1.push(va.unwrap().cursor());
            Ok(true)
        })
        .unwrap();
    assert_eq!(page1.len(), 3);

    // Second page resumes strictly after the last cursor.
    let mut page2 = Vec::new();
    store
        .operations_by_address(&alice, true, false, Some(page1[2]), 3, |_, va| {
            page2.push(va.unwrap().cursor());
            Ok(true)
        })
        .unwrap();
    assert_eq!(page2.len(), 3);
    assert!(page1.last().unwrap() < page2.first().unwrap());

    // Walking every page yields all ten without duplicates.
    let mut all = page1.clone();
    let mut cursor = *page1.last().unwrap();
    loop {
        let mut page = Vec::new();
        store
            .operations_by_address(&alice, true, false, Some(cursor), 3, |_, va| {
                page.push(va.unwrap().cursor());
                Ok(true)
            })
            .unwrap();
        if page.is_empty() {
            break;
        }
        cursor = *page.last().unwrap();
        all.extend_from_slice(&page);
        if page.len() < 3 {
            break;
        }
    }
    assert_eq!(all.len(), 10);
    let mut dedup = all.clone();
    dedup.dedup();
    assert_eq!(dedup.len(), 10, "no duplicates across pages");
}

#[test]
fn operations_by_address_load_false_returns_hashes_only() {
    let (store, _dir) = temp_store();
    let alice = seed_operations(&store);

    let mut hashes = Vec::new();
    store
        .operations_by_address(&alice, false, false, None, 0, |fact, va| {
            assert!(va.is_none());
            hashes.push(fact);
            Ok(true)
        })
        .unwrap();
    assert_eq!(hashes.len(), 10);
}

#[test]
fn operations_callback_can_stop_early() {
    let (store, _dir) = temp_store();
    let alice = seed_operations(&store);

    let mut n = 0;
    store
        .operations_by_address(&alice, false, false, None, 0, |_, _| {
            n += 1;
            Ok(n < 4)
        })
        .unwrap();
    assert_eq!(n, 4);
}

#[test]
fn operations_fan_out_to_every_participant() {
    let (store, _dir) = temp_store();
    let alice = addr("alice");
    let bob = addr("bob");
    digest_block(&store, block(0, vec![transfer(1, &alice, &bob)], vec![])).unwrap();

    for party in [&alice, &bob] {
        let mut n = 0;
        store
            .operations_by_address(party, false, false, None, 0, |_, _| {
                n += 1;
                Ok(true)
            })
            .unwrap();
        assert_eq!(n, 1, "operation must appear under {party}");
    }
}

#[test]
fn global_operations_filterable_by_height() {
    let (store, _dir) = temp_store();
    seed_operations(&store);

    let mut all = Vec::new();
    store
        .operations(OperationsFilter::All { offset: None }, true, false, 0, |_, va| {
            all.push(va.unwrap().cursor());
            Ok(true)
        })
        .unwrap();
    assert_eq!(all.len(), 10);

    let mut at_one = Vec::new();
    store
        .operations(OperationsFilter::ByHeight(Height(1)), true, false, 0, |_, va| {
            at_one.push(va.unwrap().cursor());
            Ok(true)
        })
        .unwrap();
    assert_eq!(at_one.len(), 3);
    assert!(at_one.iter().all(|(h, _)| *h == Height(1)));
}

#[test]
fn operation_lookup_by_fact_hash() {
    let (store, _dir) = temp_store();
    seed_operations(&store);

    let fact = Hash256([4; 32]);
    let va = store.operation(&fact).unwrap().unwrap();
    assert_eq!(va.op.fact_hash, fact);
    assert!(store.operation_exists(&fact).unwrap());

    assert!(store.operation(&Hash256([0xEE; 32])).unwrap().is_none());
    assert!(!store.operation_exists(&Hash256([0xEE; 32])).unwrap());
}

// ------------------------------------------------------------------
// Rollback
// ------------------------------------------------------------------

#[test]
fn clean_by_height_removes_records_and_rewinds_marker() {
    let (store, _dir) = temp_store();
    let alice = seed_operations(&store);
    digest_block(
        &store,
        block(3, vec![], vec![balance_state(&alice, "SLT", 50, 3, 2)]),
    )
    .unwrap();
    assert_eq!(store.last_block(), Height(3));

    store.clean_by_height(Height(2)).unwrap();
    assert_eq!(store.last_block(), Height(1));

    // Only operations below the rollback height remain.
    let mut seen = Vec::new();
    store
        .operations_by_address(&alice, true, false, None, 0, |_, va| {
            seen.push(va.unwrap().cursor());
            Ok(true)
        })
        .unwrap();
    assert!(seen.iter().all(|(h, _)| *h < Height(2)));
    assert_eq!(seen.len(), 7);

    // Fact index entries above the height are gone too.
    assert!(!store.operation_exists(&Hash256([3; 32])).unwrap());
}

#[test]
fn clean_at_genesis_drops_everything() {
    let (store, _dir) = temp_store();
    let alice = seed_operations(&store);

    store.clean_by_height(Height(0)).unwrap();
    assert_eq!(store.last_block(), Height::NIL);

    let mut n = 0;
    store
        .operations_by_address(&alice, false, false, None, 0, |_, _| {
            n += 1;
            Ok(true)
        })
        .unwrap();
    assert_eq!(n, 0);
}

#[test]
fn initialize_rolls_back_above_marker() {
    let dir = tempfile::tempdir().unwrap();
    let archive = Arc::new(ArchiveStore::open(dir.path().join("archive")).unwrap());
    let alice = addr("alice");
    {
        let store =
            Arc::new(DigestStore::open(dir.path().join("digest"), Arc::clone(&archive)).unwrap());
        store.initialize().unwrap();
        digest_block(&store, block(0, vec![transfer(1, &alice, &addr("bob"))], vec![])).unwrap();

        // Simulate a crash mid-ingestion: records written for height 1 but
        // the marker still points at 0.
        let mut session =
            BlockSession::new(Arc::clone(&store), block(1, vec![transfer(2, &alice, &addr("bob"))], vec![]))
                .unwrap();
        session.prepare().unwrap();
        session.commit().unwrap();
    }

    let store = DigestStore::open(dir.path().join("digest"), archive).unwrap();
    store.initialize().unwrap();
    assert_eq!(store.last_block(), Height(0));

    // The orphaned height-1 records were rolled back on initialize.
    let mut seen = Vec::new();
    store
        .operations_by_address(&alice, false, false, None, 0, |fact, _| {
            seen.push(fact);
            Ok(true)
        })
        .unwrap();
    assert_eq!(seen, vec![Hash256([1; 32])]);
}

// ------------------------------------------------------------------
// Read-only mode
// ------------------------------------------------------------------

#[test]
fn readonly_store_rejects_mutations() {
    let dir = tempfile::tempdir().unwrap();
    let archive = Arc::new(ArchiveStore::open(dir.path().join("archive")).unwrap());
    let store =
        Arc::new(DigestStore::open_readonly(dir.path().join("digest"), archive).unwrap());
    store.initialize().unwrap();

    assert!(matches!(
        store.set_last_block(Height(1)),
        Err(SiltError::Readonly)
    ));
    assert!(matches!(store.clean(), Err(SiltError::Readonly)));
    assert!(matches!(
        store.clean_by_height(Height(5)),
        Err(SiltError::Readonly)
    ));
    assert!(matches!(
        BlockSession::new(Arc::clone(&store), block(0, vec![], vec![])),
        Err(SiltError::Readonly)
    ));

    // Queries still work.
    assert!(store.account(&addr("alice")).unwrap().is_none());
}

// ------------------------------------------------------------------
// Digester
// ------------------------------------------------------------------

#[tokio::test]
async fn digester_processes_blocks_in_height_order() {
    let (store, _dir) = temp_store();
    let (report_tx, mut report_rx) = tokio::sync::mpsc::unbounded_channel::<DigestReport>();
    let digester = Digester::start(Arc::clone(&store), RetryPolicy::default(), Some(report_tx));

    let alice = addr("alice");
    // Enqueue out of order; the digester sorts ascending.
    let blocks = vec![
        block(2, vec![transfer(3, &alice, &addr("bob"))], vec![]),
        block(0, vec![transfer(1, &alice, &addr("bob"))], vec![]),
        block(1, vec![transfer(2, &alice, &addr("bob"))], vec![]),
    ];
    digester.digest(blocks).await.unwrap();

    let mut reported = Vec::new();
    for _ in 0..3 {
        let report = report_rx.recv().await.unwrap();
        assert!(report.error.is_none());
        reported.push(report.height);
    }
    assert_eq!(reported, vec![Height(0), Height(1), Height(2)]);

    digester.shutdown().await;
    assert_eq!(store.last_block(), Height(2));
}

#[tokio::test]
async fn digester_reports_each_failed_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let archive = Arc::new(ArchiveStore::open(dir.path().join("archive")).unwrap());
    let store =
        Arc::new(DigestStore::open_readonly(dir.path().join("digest"), archive).unwrap());

    let (report_tx, mut report_rx) = tokio::sync::mpsc::unbounded_channel::<DigestReport>();
    let policy = RetryPolicy {
        max_attempts: Some(2),
        delay: std::time::Duration::from_millis(10),
    };
    let digester = Digester::start(Arc::clone(&store), policy, Some(report_tx));

    digester.digest(vec![block(0, vec![], vec![])]).await.unwrap();

    // Two attempts, two failure reports carrying the height.
    for _ in 0..2 {
        let report = report_rx.recv().await.unwrap();
        assert_eq!(report.height, Height(0));
        assert!(matches!(report.error, Some(SiltError::Readonly)));
    }

    digester.shutdown().await;
}

#[tokio::test]
async fn digester_shutdown_after_commit_is_clean() {
    let (store, _dir) = temp_store();
    let digester = Digester::start(Arc::clone(&store), RetryPolicy::default(), None);

    let alice = addr("alice");
    digester
        .digest(vec![block(0, vec![transfer(1, &alice, &addr("bob"))], vec![])])
        .await
        .unwrap();

    // Wait for the block to be committed before shutting down.
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while store.last_block() != Height(0) {
        assert!(std::time::Instant::now() < deadline, "block never digested");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    digester.shutdown().await;
}
