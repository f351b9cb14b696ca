//! RocksDB-backed derived store.
//!
//! Holds the five derived collections (accounts, balances, documents,
//! operations, filedata) plus the last-digested-height marker, with two
//! secondary indexes for operation lookups. All mutations go through atomic
//! [`WriteBatch`]es; block sessions are the only writers.
//!
//! Record keys embed a fixed-width BLAKE3 address prefix and big-endian
//! heights so that lexicographic key order equals `(address, height)` order
//! and keyset pagination is a plain seek.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};

use silt_core::address::Address;
use silt_core::amount::{Amount, CurrencyDesign, CurrencyId};
use silt_core::error::SiltError;
use silt_core::state::{AccountState, BalanceState, DocumentState, FileDataState};
use silt_core::types::{Hash256, Height, Manifest};

use crate::primary::{clamp_limit, height_key, PrimaryLedger};
use crate::values::{AccountValue, DocumentValue, OperationValue};

// --- Column family names ---

const CF_ACCOUNTS: &str = "accounts";
const CF_BALANCES: &str = "balances";
const CF_DOCUMENTS: &str = "documents";
const CF_OPERATIONS: &str = "operations";
const CF_FILEDATA: &str = "filedata";
const CF_OP_BY_FACT: &str = "op_by_fact";
const CF_OP_BY_ADDRESS: &str = "op_by_address";
const CF_METADATA: &str = "metadata";

/// All column family names.
const ALL_CFS: &[&str] = &[
    CF_ACCOUNTS,
    CF_BALANCES,
    CF_DOCUMENTS,
    CF_OPERATIONS,
    CF_FILEDATA,
    CF_OP_BY_FACT,
    CF_OP_BY_ADDRESS,
    CF_METADATA,
];

/// Address-prefixed collections and the byte offset of the height in their
/// keys. Used by the rollback scan.
const HEIGHT_SUFFIXED_CFS: &[(&str, usize)] = &[
    (CF_ACCOUNTS, 32),
    (CF_DOCUMENTS, 32),
    (CF_FILEDATA, 32),
    (CF_BALANCES, 40),
    (CF_OP_BY_ADDRESS, 32),
];

// --- Metadata keys ---

const META_LAST_BLOCK: &[u8] = b"digest_last_block";

/// Inclusive lower / exclusive upper bounds spanning every key this store
/// writes.
const RANGE_START: [u8; 0] = [];
const RANGE_END: [u8; 49] = [0xFF; 49];

/// One prepared upsert from a block session.
pub(crate) enum Upsert {
    Account(AccountState),
    Balance(BalanceState),
    Document(DocumentState),
    FileData(FileDataState),
    Operation(OperationValue),
}

/// Filter for [`DigestStore::operations`].
///
/// A closed set of supported scans; nothing dispatches on open-ended query
/// shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationsFilter {
    /// Every operation, optionally strictly after/before a cursor.
    All { offset: Option<(Height, u64)> },
    /// Operations confirmed at exactly one height.
    ByHeight(Height),
}

/// RocksDB-backed derived store over the primary ledger.
///
/// A read-only instance answers queries but fails every mutating call with
/// [`SiltError::Readonly`].
pub struct DigestStore {
    db: DB,
    primary: Arc<dyn PrimaryLedger>,
    readonly: bool,
    last_block: Mutex<Height>,
}

impl DigestStore {
    /// Open or create the derived store at the given path.
    pub fn open(
        path: impl AsRef<Path>,
        primary: Arc<dyn PrimaryLedger>,
    ) -> Result<Self, SiltError> {
        Self::open_inner(path, primary, false)
    }

    /// Open the derived store in read-only mode: queries work, mutations
    /// fail locally and are never retried.
    pub fn open_readonly(
        path: impl AsRef<Path>,
        primary: Arc<dyn PrimaryLedger>,
    ) -> Result<Self, SiltError> {
        Self::open_inner(path, primary, true)
    }

    fn open_inner(
        path: impl AsRef<Path>,
        primary: Arc<dyn PrimaryLedger>,
        readonly: bool,
    ) -> Result<Self, SiltError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cf_descriptors)
            .map_err(|e| SiltError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            primary,
            readonly,
            last_block: Mutex::new(Height::NIL),
        })
    }

    /// Load the last-digested-height marker and recover from an interrupted
    /// ingestion: unless read-only, every record above the marker is rolled
    /// back before the store serves anything.
    pub fn initialize(&self) -> Result<(), SiltError> {
        match self.load_last_block()? {
            None => {
                *self.last_block.lock() = Height::NIL;
                tracing::debug!("last digested height not found");
            }
            Some(h) => {
                *self.last_block.lock() = h;
                if !self.readonly {
                    self.clean_by_height(h.next())?;
                }
                tracing::debug!(height = %h, "loaded last digested height");
            }
        }
        Ok(())
    }

    /// Whether this instance is read-only.
    pub fn readonly(&self) -> bool {
        self.readonly
    }

    /// The primary ledger handle this store reads canonical content from.
    pub fn primary(&self) -> &Arc<dyn PrimaryLedger> {
        &self.primary
    }

    // --- Last-digested-height marker ---

    /// Current last-digested-height marker.
    pub fn last_block(&self) -> Height {
        *self.last_block.lock()
    }

    /// Advance the marker to `height`. A no-op when `height` does not exceed
    /// the current marker; the marker never moves backward except through
    /// [`clean_by_height`](Self::clean_by_height).
    pub fn set_last_block(&self, height: Height) -> Result<(), SiltError> {
        if self.readonly {
            return Err(SiltError::Readonly);
        }
        let mut guard = self.last_block.lock();
        if height <= *guard {
            return Ok(());
        }
        self.persist_last_block(height)?;
        *guard = height;
        tracing::debug!(height = %height, "set last digested height");
        Ok(())
    }

    fn persist_last_block(&self, height: Height) -> Result<(), SiltError> {
        let cf = self.cf_handle(CF_METADATA)?;
        self.db
            .put_cf(cf, META_LAST_BLOCK, height.0.to_le_bytes())
            .map_err(|e| SiltError::Storage(e.to_string()))
    }

    fn load_last_block(&self) -> Result<Option<Height>, SiltError> {
        let cf = self.cf_handle(CF_METADATA)?;
        match self
            .db
            .get_cf(cf, META_LAST_BLOCK)
            .map_err(|e| SiltError::Storage(e.to_string()))?
        {
            Some(bytes) if bytes.len() == 8 => {
                let raw = i64::from_le_bytes(bytes[..8].try_into().unwrap_or([0; 8]));
                Ok(Some(Height(raw)))
            }
            Some(_) => Err(SiltError::Storage("invalid last block length".into())),
            None => Ok(None),
        }
    }

    // --- Rollback ---

    /// Drop every derived record and reset the marker to nil.
    pub fn clean(&self) -> Result<(), SiltError> {
        if self.readonly {
            return Err(SiltError::Readonly);
        }
        let mut batch = WriteBatch::default();
        for name in ALL_CFS {
            if *name == CF_METADATA {
                continue;
            }
            let cf = self.cf_handle(name)?;
            batch.delete_range_cf(cf, RANGE_START.as_slice(), RANGE_END.as_slice());
            tracing::debug!(collection = name, "drop collection");
        }
        let cf_meta = self.cf_handle(CF_METADATA)?;
        batch.put_cf(cf_meta, META_LAST_BLOCK, Height::NIL.0.to_le_bytes());
        self.db
            .write(batch)
            .map_err(|e| SiltError::Storage(e.to_string()))?;
        *self.last_block.lock() = Height::NIL;
        tracing::debug!("clean digest store");
        Ok(())
    }

    /// Remove every derived record with height ≥ `height` across all
    /// collections in one atomic batch, then set the marker to `height - 1`.
    ///
    /// Used for re-digestion and crash recovery.
    pub fn clean_by_height(&self, height: Height) -> Result<(), SiltError> {
        if self.readonly {
            return Err(SiltError::Readonly);
        }
        if height <= Height::GENESIS {
            return self.clean();
        }

        let mut batch = WriteBatch::default();

        // Operations order by height first, so the primary collection is a
        // single range; the fact index has to be walked record by record.
        let cf_ops = self.cf_handle(CF_OPERATIONS)?;
        let cf_fact = self.cf_handle(CF_OP_BY_FACT)?;
        let start = op_key(height, 0);
        for item in self
            .db
            .iterator_cf(cf_ops, IteratorMode::From(&start, Direction::Forward))
        {
            let (key, value) = item.map_err(|e| SiltError::Storage(e.to_string()))?;
            let va = decode_operation(&value)?;
            batch.delete_cf(cf_fact, va.op.fact_hash.as_bytes());
            batch.delete_cf(cf_ops, &key);
        }

        for (name, height_at) in HEIGHT_SUFFIXED_CFS {
            let cf = self.cf_handle(name)?;
            let mut removed = 0u64;
            for item in self.db.iterator_cf(cf, IteratorMode::Start) {
                let (key, _) = item.map_err(|e| SiltError::Storage(e.to_string()))?;
                if key.len() < height_at + 8 {
                    continue;
                }
                let h = u64::from_be_bytes(
                    key[*height_at..height_at + 8].try_into().unwrap_or([0; 8]),
                ) as i64;
                if h >= height.0 {
                    batch.delete_cf(cf, &key);
                    removed += 1;
                }
            }
            tracing::debug!(collection = name, removed, "clean collection by height");
        }

        let cf_meta = self.cf_handle(CF_METADATA)?;
        batch.put_cf(cf_meta, META_LAST_BLOCK, height.prev().0.to_le_bytes());
        self.db
            .write(batch)
            .map_err(|e| SiltError::Storage(e.to_string()))?;
        *self.last_block.lock() = height.prev();
        Ok(())
    }

    // --- Session commit ---

    /// Apply one block session's upserts as a single atomic batch.
    pub(crate) fn apply_upserts(&self, upserts: &[Upsert]) -> Result<(), SiltError> {
        if self.readonly {
            return Err(SiltError::Readonly);
        }

        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        let cf_balances = self.cf_handle(CF_BALANCES)?;
        let cf_documents = self.cf_handle(CF_DOCUMENTS)?;
        let cf_filedata = self.cf_handle(CF_FILEDATA)?;
        let cf_ops = self.cf_handle(CF_OPERATIONS)?;
        let cf_fact = self.cf_handle(CF_OP_BY_FACT)?;
        let cf_op_addr = self.cf_handle(CF_OP_BY_ADDRESS)?;

        let mut batch = WriteBatch::default();
        for up in upserts {
            match up {
                Upsert::Account(s) => {
                    let key = addr_height_key(&s.address.key_prefix(), s.height);
                    batch.put_cf(cf_accounts, key, encode(s)?);
                }
                Upsert::Balance(s) => {
                    let key = balance_key(
                        &s.address.key_prefix(),
                        &s.amount.currency,
                        s.height,
                    );
                    batch.put_cf(cf_balances, key, encode(s)?);
                }
                Upsert::Document(s) => {
                    let key = addr_height_key(&s.address.key_prefix(), s.height);
                    batch.put_cf(cf_documents, key, encode(s)?);
                }
                Upsert::FileData(s) => {
                    let key = addr_height_key(&s.address.key_prefix(), s.height);
                    batch.put_cf(cf_filedata, key, encode(s)?);
                }
                Upsert::Operation(va) => {
                    let key = op_key(va.height, va.index);
                    batch.put_cf(cf_ops, key, encode(va)?);
                    batch.put_cf(cf_fact, va.op.fact_hash.as_bytes(), key);
                    for address in &va.addresses {
                        let akey = op_addr_key(&address.key_prefix(), va.height, va.index);
                        batch.put_cf(cf_op_addr, akey, va.op.fact_hash.as_bytes());
                    }
                }
            }
        }

        self.db
            .write(batch)
            .map_err(|e| SiltError::Storage(e.to_string()))
    }

    // --- Point queries ---

    /// Latest account record for `address`, joined with the most recent
    /// balance per currency. `None` when no account record exists.
    pub fn account(&self, address: &Address) -> Result<Option<AccountValue>, SiltError> {
        let prefix = address.key_prefix();
        let state: AccountState = match self.newest_under(CF_ACCOUNTS, &prefix, 40)? {
            Some(s) => s,
            None => return Ok(None),
        };

        let (balances, height, previous_height) = self.latest_balances(&prefix)?;
        if height.is_nil() {
            // No balance record yet; fall back to the account record's link.
            return Ok(Some(AccountValue {
                address: state.address,
                public_key: state.public_key,
                balances,
                height: state.height,
                previous_height: state.previous_height,
            }));
        }

        Ok(Some(AccountValue {
            address: state.address,
            public_key: state.public_key,
            balances,
            height,
            previous_height,
        }))
    }

    /// Most recent balance per currency, plus the height and previous height
    /// of the newest contributing record.
    fn latest_balances(
        &self,
        prefix: &[u8; 32],
    ) -> Result<(Vec<Amount>, Height, Height), SiltError> {
        let cf = self.cf_handle(CF_BALANCES)?;
        let mut upper = [0xFFu8; 48];
        upper[..32].copy_from_slice(prefix);

        let mut newest: Vec<BalanceState> = Vec::new();
        let mut height = Height::NIL;
        let mut previous_height = Height::NIL;

        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(&upper, Direction::Reverse))
        {
            let (key, value) = item.map_err(|e| SiltError::Storage(e.to_string()))?;
            if key.len() != 48 || key[..32] != *prefix {
                break;
            }
            let (state, _): (BalanceState, _) =
                bincode::decode_from_slice(&value, bincode::config::standard())
                    .map_err(|e| SiltError::Storage(e.to_string()))?;
            // Reverse order within a currency group puts the newest record
            // first; later records for the same currency are history.
            if newest
                .iter()
                .any(|s| s.amount.currency == state.amount.currency)
            {
                continue;
            }
            if state.height > height {
                height = state.height;
                previous_height = state.previous_height;
            }
            newest.push(state);
        }

        newest.sort_by(|a, b| a.amount.currency.cmp(&b.amount.currency));
        let balances = newest.into_iter().map(|s| s.amount).collect();
        Ok((balances, height, previous_height))
    }

    /// Latest document record for `address`, joined with the most recent
    /// filedata record. `None` when no document record exists.
    pub fn document(&self, address: &Address) -> Result<Option<DocumentValue>, SiltError> {
        let prefix = address.key_prefix();
        let document: DocumentState = match self.newest_under(CF_DOCUMENTS, &prefix, 40)? {
            Some(s) => s,
            None => return Ok(None),
        };
        let filedata: Option<FileDataState> = self.newest_under(CF_FILEDATA, &prefix, 40)?;

        let (height, previous_height) = match &filedata {
            Some(fd) => (fd.height, fd.previous_height),
            None => (document.height, document.previous_height),
        };
        Ok(Some(DocumentValue {
            document,
            filedata,
            height,
            previous_height,
        }))
    }

    /// Operation by fact hash.
    pub fn operation(&self, fact_hash: &Hash256) -> Result<Option<OperationValue>, SiltError> {
        let cf_fact = self.cf_handle(CF_OP_BY_FACT)?;
        let key = match self
            .db
            .get_cf(cf_fact, fact_hash.as_bytes())
            .map_err(|e| SiltError::Storage(e.to_string()))?
        {
            Some(key) if key.len() == 16 => key,
            _ => return Ok(None),
        };
        let cf_ops = self.cf_handle(CF_OPERATIONS)?;
        match self
            .db
            .get_cf(cf_ops, &key)
            .map_err(|e| SiltError::Storage(e.to_string()))?
        {
            Some(bytes) => Ok(Some(decode_operation(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Cheap existence check by fact hash, without loading the record.
    pub fn operation_exists(&self, fact_hash: &Hash256) -> Result<bool, SiltError> {
        let cf = self.cf_handle(CF_OP_BY_FACT)?;
        self.db
            .get_cf(cf, fact_hash.as_bytes())
            .map(|v| v.is_some())
            .map_err(|e| SiltError::Storage(e.to_string()))
    }

    // --- Range scans ---

    /// Scan operations related to `address`, ordered by `(height, index)`
    /// ascending (descending when `reverse`), strictly after/before the
    /// offset cursor. With `load == false` the callback receives only the
    /// fact hash. The callback stops the scan by returning `false`.
    /// `limit` is capped at the hard page size; zero means "up to the cap".
    pub fn operations_by_address(
        &self,
        address: &Address,
        load: bool,
        reverse: bool,
        offset: Option<(Height, u64)>,
        limit: u64,
        mut f: impl FnMut(Hash256, Option<OperationValue>) -> Result<bool, SiltError>,
    ) -> Result<(), SiltError> {
        let prefix = address.key_prefix();
        let cf = self.cf_handle(CF_OP_BY_ADDRESS)?;

        let start: [u8; 48] = if reverse {
            match offset {
                None => {
                    let mut upper = [0xFFu8; 48];
                    upper[..32].copy_from_slice(&prefix);
                    upper
                }
                Some((h, i)) => match cursor_predecessor(h, i) {
                    Some((ph, pi)) => op_addr_key(&prefix, ph, pi),
                    None => return Ok(()),
                },
            }
        } else {
            match offset {
                None => {
                    let mut lower = [0u8; 48];
                    lower[..32].copy_from_slice(&prefix);
                    lower
                }
                Some((h, i)) => {
                    let (sh, si) = cursor_successor(h, i);
                    op_addr_key(&prefix, sh, si)
                }
            }
        };

        let direction = if reverse {
            Direction::Reverse
        } else {
            Direction::Forward
        };

        let cap = clamp_limit(limit);
        let mut n = 0u64;
        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(&start, direction))
        {
            if n >= cap {
                break;
            }
            let (key, value) = item.map_err(|e| SiltError::Storage(e.to_string()))?;
            if key.len() != 48 || key[..32] != prefix {
                break;
            }
            let fact_hash = hash_from_slice(&value)?;
            let keep = if load {
                let record_key: [u8; 16] = key[32..48].try_into().unwrap_or([0; 16]);
                let va = self.load_operation_record(&record_key)?;
                f(fact_hash, Some(va))?
            } else {
                f(fact_hash, None)?
            };
            if !keep {
                break;
            }
            n += 1;
        }
        Ok(())
    }

    /// Scan operations with an explicit [`OperationsFilter`], same ordering
    /// and cursor semantics as [`operations_by_address`](Self::operations_by_address).
    pub fn operations(
        &self,
        filter: OperationsFilter,
        load: bool,
        reverse: bool,
        limit: u64,
        mut f: impl FnMut(Hash256, Option<OperationValue>) -> Result<bool, SiltError>,
    ) -> Result<(), SiltError> {
        let cf = self.cf_handle(CF_OPERATIONS)?;

        let mode_key: Option<[u8; 16]> = match (filter, reverse) {
            (OperationsFilter::All { offset: None }, _) => None,
            (OperationsFilter::All { offset: Some((h, i)) }, false) => {
                let (sh, si) = cursor_successor(h, i);
                Some(op_key(sh, si))
            }
            (OperationsFilter::All { offset: Some((h, i)) }, true) => {
                match cursor_predecessor(h, i) {
                    Some((ph, pi)) => Some(op_key(ph, pi)),
                    None => return Ok(()),
                }
            }
            (OperationsFilter::ByHeight(h), false) => Some(op_key(h, 0)),
            (OperationsFilter::ByHeight(h), true) => Some(op_key(h, u64::MAX)),
        };

        let mode = match (&mode_key, reverse) {
            (None, false) => IteratorMode::Start,
            (None, true) => IteratorMode::End,
            (Some(key), false) => IteratorMode::From(key, Direction::Forward),
            (Some(key), true) => IteratorMode::From(key, Direction::Reverse),
        };

        let height_prefix = match filter {
            OperationsFilter::ByHeight(h) => Some(height_key(h)),
            OperationsFilter::All { .. } => None,
        };

        let cap = clamp_limit(limit);
        let mut n = 0u64;
        for item in self.db.iterator_cf(cf, mode) {
            if n >= cap {
                break;
            }
            let (key, value) = item.map_err(|e| SiltError::Storage(e.to_string()))?;
            if let Some(hp) = &height_prefix {
                if key.len() != 16 || &key[..8] != hp {
                    break;
                }
            }
            let va = decode_operation(&value)?;
            let fact_hash = va.op.fact_hash;
            let keep = if load {
                f(fact_hash, Some(va))?
            } else {
                f(fact_hash, None)?
            };
            if !keep {
                break;
            }
            n += 1;
        }
        Ok(())
    }

    // --- Delegation to the primary ledger ---

    /// Manifest at a height, from the primary ledger.
    pub fn manifest_by_height(&self, height: Height) -> Result<Option<Manifest>, SiltError> {
        self.primary.manifest_by_height(height)
    }

    /// Manifest by block hash, from the primary ledger.
    pub fn manifest(&self, hash: &Hash256) -> Result<Option<Manifest>, SiltError> {
        self.primary.manifest(hash)
    }

    /// Paginated manifest scan, from the primary ledger.
    pub fn manifests(
        &self,
        load: bool,
        reverse: bool,
        offset: Option<Height>,
        limit: u64,
        f: &mut dyn FnMut(Height, Hash256, Option<Manifest>) -> Result<bool, SiltError>,
    ) -> Result<(), SiltError> {
        self.primary.manifests(load, reverse, offset, clamp_limit(limit), f)
    }

    /// Registered currency designs, from the primary ledger.
    pub fn currencies(&self) -> Result<Vec<CurrencyDesign>, SiltError> {
        self.primary.currencies()
    }

    /// One currency design, from the primary ledger.
    pub fn currency(&self, id: &CurrencyId) -> Result<Option<CurrencyDesign>, SiltError> {
        self.primary.currency(id)
    }

    // --- Internal helpers ---

    fn cf_handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily, SiltError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| SiltError::Storage(format!("missing column family: {name}")))
    }

    /// Newest record under a 32-byte address prefix in a CF whose keys are
    /// `prefix || height` of `key_len` bytes total.
    fn newest_under<T: bincode::Decode<()>>(
        &self,
        cf_name: &str,
        prefix: &[u8; 32],
        key_len: usize,
    ) -> Result<Option<T>, SiltError> {
        let cf = self.cf_handle(cf_name)?;
        let mut upper = vec![0xFFu8; key_len];
        upper[..32].copy_from_slice(prefix);

        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(&upper, Direction::Reverse))
        {
            let (key, value) = item.map_err(|e| SiltError::Storage(e.to_string()))?;
            if key.len() != key_len || key[..32] != *prefix {
                return Ok(None);
            }
            let (state, _): (T, _) =
                bincode::decode_from_slice(&value, bincode::config::standard())
                    .map_err(|e| SiltError::Storage(e.to_string()))?;
            return Ok(Some(state));
        }
        Ok(None)
    }

    fn load_operation_record(&self, key: &[u8; 16]) -> Result<OperationValue, SiltError> {
        let cf = self.cf_handle(CF_OPERATIONS)?;
        match self
            .db
            .get_cf(cf, key)
            .map_err(|e| SiltError::Storage(e.to_string()))?
        {
            Some(bytes) => decode_operation(&bytes),
            None => Err(SiltError::Storage(
                "operation index entry without record".into(),
            )),
        }
    }
}

// --- Key encoding ---

/// `prefix || height`, 40 bytes.
fn addr_height_key(prefix: &[u8; 32], height: Height) -> [u8; 40] {
    let mut key = [0u8; 40];
    key[..32].copy_from_slice(prefix);
    key[32..40].copy_from_slice(&height_key(height));
    key
}

/// `prefix || currency tag || height`, 48 bytes. The currency tag is a
/// fixed 8-byte BLAKE3 prefix so currencies group contiguously.
fn balance_key(prefix: &[u8; 32], currency: &CurrencyId, height: Height) -> [u8; 48] {
    let mut key = [0u8; 48];
    key[..32].copy_from_slice(prefix);
    key[32..40].copy_from_slice(&currency_tag(currency));
    key[40..48].copy_from_slice(&height_key(height));
    key
}

/// `height || index`, 16 bytes; lexicographic order equals cursor order.
fn op_key(height: Height, index: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&height_key(height));
    key[8..16].copy_from_slice(&index.to_be_bytes());
    key
}

/// `prefix || height || index`, 48 bytes.
fn op_addr_key(prefix: &[u8; 32], height: Height, index: u64) -> [u8; 48] {
    let mut key = [0u8; 48];
    key[..32].copy_from_slice(prefix);
    key[32..48].copy_from_slice(&op_key(height, index));
    key
}

fn currency_tag(currency: &CurrencyId) -> [u8; 8] {
    let hash = blake3::hash(currency.as_str().as_bytes());
    hash.as_bytes()[..8].try_into().unwrap_or([0; 8])
}

/// First cursor strictly after `(height, index)` in ascending order.
fn cursor_successor(height: Height, index: u64) -> (Height, u64) {
    if index < u64::MAX {
        (height, index + 1)
    } else {
        (Height(height.0.saturating_add(1)), 0)
    }
}

/// Last cursor strictly before `(height, index)`, or `None` at the origin.
fn cursor_predecessor(height: Height, index: u64) -> Option<(Height, u64)> {
    if index > 0 {
        Some((height, index - 1))
    } else if height.0 > 0 {
        Some((Height(height.0 - 1), u64::MAX))
    } else {
        None
    }
}

fn encode<T: bincode::Encode>(value: &T) -> Result<Vec<u8>, SiltError> {
    bincode::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| SiltError::Storage(e.to_string()))
}

fn decode_operation(bytes: &[u8]) -> Result<OperationValue, SiltError> {
    let (va, _): (OperationValue, _) =
        bincode::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| SiltError::Storage(e.to_string()))?;
    Ok(va)
}

fn hash_from_slice(bytes: &[u8]) -> Result<Hash256, SiltError> {
    let raw: [u8; 32] = bytes
        .try_into()
        .map_err(|_| SiltError::Storage("invalid fact hash length".into()))?;
    Ok(Hash256(raw))
}
