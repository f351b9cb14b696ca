//! Read access to the primary ledger store.
//!
//! The consensus engine owns the primary store; the index only reads
//! canonical content from it — manifests, currency designs, and full blocks
//! for catch-up digestion. [`ArchiveStore`] is the RocksDB-backed
//! implementation; its write methods exist for the engine side and for test
//! fixtures, never for the index.

use std::path::Path;

use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};

use silt_core::amount::{CurrencyDesign, CurrencyId};
use silt_core::constants::MAX_PAGE_SIZE;
use silt_core::error::SiltError;
use silt_core::types::{Block, Hash256, Height, Manifest};

/// Read-only view of the primary ledger store.
pub trait PrimaryLedger: Send + Sync {
    /// Height of the newest finalized block, or nil if empty.
    fn tip_height(&self) -> Result<Height, SiltError>;

    /// Manifest at a height.
    fn manifest_by_height(&self, height: Height) -> Result<Option<Manifest>, SiltError>;

    /// Manifest by block hash.
    fn manifest(&self, hash: &Hash256) -> Result<Option<Manifest>, SiltError>;

    /// Full finalized block at a height, for catch-up digestion.
    fn block_by_height(&self, height: Height) -> Result<Option<Block>, SiltError>;

    /// All registered currency designs.
    fn currencies(&self) -> Result<Vec<CurrencyDesign>, SiltError>;

    /// One currency design.
    fn currency(&self, id: &CurrencyId) -> Result<Option<CurrencyDesign>, SiltError>;

    /// Scan manifests ordered by height, strictly after (forward) or before
    /// (reverse) `offset`. When `load` is false the callback receives only
    /// height and hash. The callback stops the scan by returning `false`.
    /// `limit` is capped at [`MAX_PAGE_SIZE`]; zero means "up to the cap".
    fn manifests(
        &self,
        load: bool,
        reverse: bool,
        offset: Option<Height>,
        limit: u64,
        f: &mut dyn FnMut(Height, Hash256, Option<Manifest>) -> Result<bool, SiltError>,
    ) -> Result<(), SiltError>;
}

const CF_BLOCKS: &str = "blocks";
const CF_MANIFESTS: &str = "manifests";
const CF_HASH_INDEX: &str = "hash_index";
const CF_CURRENCIES: &str = "currencies";
const CF_METADATA: &str = "metadata";

const ALL_CFS: &[&str] = &[
    CF_BLOCKS,
    CF_MANIFESTS,
    CF_HASH_INDEX,
    CF_CURRENCIES,
    CF_METADATA,
];

const META_TIP_HEIGHT: &[u8] = b"tip_height";

/// RocksDB-backed primary ledger archive.
pub struct ArchiveStore {
    db: DB,
}

impl ArchiveStore {
    /// Open or create the archive at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SiltError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cf_descriptors)
            .map_err(|e| SiltError::Storage(e.to_string()))?;

        Ok(Self { db })
    }

    /// Store a finalized block: full block, manifest, hash index, and tip.
    ///
    /// Engine-side/test-fixture method; the index never calls it.
    pub fn put_block(&self, block: &Block) -> Result<(), SiltError> {
        let height = block.height();
        if height.is_nil() {
            return Err(SiltError::Storage("cannot store a nil-height block".into()));
        }

        let cf_blocks = self.cf_handle(CF_BLOCKS)?;
        let cf_manifests = self.cf_handle(CF_MANIFESTS)?;
        let cf_hash = self.cf_handle(CF_HASH_INDEX)?;
        let cf_meta = self.cf_handle(CF_METADATA)?;

        let block_bytes = bincode::encode_to_vec(block, bincode::config::standard())
            .map_err(|e| SiltError::Storage(e.to_string()))?;
        let manifest_bytes =
            bincode::encode_to_vec(&block.manifest, bincode::config::standard())
                .map_err(|e| SiltError::Storage(e.to_string()))?;

        let key = height_key(height);
        let mut batch = WriteBatch::default();
        batch.put_cf(cf_blocks, key, &block_bytes);
        batch.put_cf(cf_manifests, key, &manifest_bytes);
        batch.put_cf(cf_hash, block.hash().as_bytes(), key);

        let tip = self.tip_height()?;
        if height > tip {
            batch.put_cf(cf_meta, META_TIP_HEIGHT, height.0.to_le_bytes());
        }

        self.db
            .write(batch)
            .map_err(|e| SiltError::Storage(e.to_string()))
    }

    /// Register a currency design. Engine-side/test-fixture method.
    pub fn put_currency(&self, design: &CurrencyDesign) -> Result<(), SiltError> {
        let cf = self.cf_handle(CF_CURRENCIES)?;
        let bytes = bincode::encode_to_vec(design, bincode::config::standard())
            .map_err(|e| SiltError::Storage(e.to_string()))?;
        self.db
            .put_cf(cf, design.currency.as_str().as_bytes(), &bytes)
            .map_err(|e| SiltError::Storage(e.to_string()))
    }

    fn cf_handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily, SiltError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| SiltError::Storage(format!("missing column family: {name}")))
    }

    fn decode_manifest(bytes: &[u8]) -> Result<Manifest, SiltError> {
        let (m, _): (Manifest, _) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| SiltError::Storage(e.to_string()))?;
        Ok(m)
    }
}

impl PrimaryLedger for ArchiveStore {
    fn tip_height(&self) -> Result<Height, SiltError> {
        let cf = self.cf_handle(CF_METADATA)?;
        match self
            .db
            .get_cf(cf, META_TIP_HEIGHT)
            .map_err(|e| SiltError::Storage(e.to_string()))?
        {
            Some(bytes) if bytes.len() == 8 => {
                let raw = i64::from_le_bytes(bytes[..8].try_into().unwrap_or([0; 8]));
                Ok(Height(raw))
            }
            Some(_) => Err(SiltError::Storage("invalid tip height length".into())),
            None => Ok(Height::NIL),
        }
    }

    fn manifest_by_height(&self, height: Height) -> Result<Option<Manifest>, SiltError> {
        if height.is_nil() {
            return Ok(None);
        }
        let cf = self.cf_handle(CF_MANIFESTS)?;
        match self
            .db
            .get_cf(cf, height_key(height))
            .map_err(|e| SiltError::Storage(e.to_string()))?
        {
            Some(bytes) => Ok(Some(Self::decode_manifest(&bytes)?)),
            None => Ok(None),
        }
    }

    fn manifest(&self, hash: &Hash256) -> Result<Option<Manifest>, SiltError> {
        let cf = self.cf_handle(CF_HASH_INDEX)?;
        let key = match self
            .db
            .get_cf(cf, hash.as_bytes())
            .map_err(|e| SiltError::Storage(e.to_string()))?
        {
            Some(key) if key.len() == 8 => key,
            _ => return Ok(None),
        };
        let cf_manifests = self.cf_handle(CF_MANIFESTS)?;
        match self
            .db
            .get_cf(cf_manifests, &key)
            .map_err(|e| SiltError::Storage(e.to_string()))?
        {
            Some(bytes) => Ok(Some(Self::decode_manifest(&bytes)?)),
            None => Ok(None),
        }
    }

    fn block_by_height(&self, height: Height) -> Result<Option<Block>, SiltError> {
        if height.is_nil() {
            return Ok(None);
        }
        let cf = self.cf_handle(CF_BLOCKS)?;
        match self
            .db
            .get_cf(cf, height_key(height))
            .map_err(|e| SiltError::Storage(e.to_string()))?
        {
            Some(bytes) => {
                let (block, _): (Block, _) =
                    bincode::decode_from_slice(&bytes, bincode::config::standard())
                        .map_err(|e| SiltError::Storage(e.to_string()))?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    fn currencies(&self) -> Result<Vec<CurrencyDesign>, SiltError> {
        let cf = self.cf_handle(CF_CURRENCIES)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| SiltError::Storage(e.to_string()))?;
            let (design, _): (CurrencyDesign, _) =
                bincode::decode_from_slice(&value, bincode::config::standard())
                    .map_err(|e| SiltError::Storage(e.to_string()))?;
            out.push(design);
        }
        Ok(out)
    }

    fn currency(&self, id: &CurrencyId) -> Result<Option<CurrencyDesign>, SiltError> {
        let cf = self.cf_handle(CF_CURRENCIES)?;
        match self
            .db
            .get_cf(cf, id.as_str().as_bytes())
            .map_err(|e| SiltError::Storage(e.to_string()))?
        {
            Some(bytes) => {
                let (design, _): (CurrencyDesign, _) =
                    bincode::decode_from_slice(&bytes, bincode::config::standard())
                        .map_err(|e| SiltError::Storage(e.to_string()))?;
                Ok(Some(design))
            }
            None => Ok(None),
        }
    }

    fn manifests(
        &self,
        load: bool,
        reverse: bool,
        offset: Option<Height>,
        limit: u64,
        f: &mut dyn FnMut(Height, Hash256, Option<Manifest>) -> Result<bool, SiltError>,
    ) -> Result<(), SiltError> {
        let cf = self.cf_handle(CF_MANIFESTS)?;

        // Strictly-after (forward) / strictly-before (reverse) start key.
        let start: Option<[u8; 8]> = match (offset, reverse) {
            (None, _) => None,
            (Some(h), false) => Some(height_key(h.next())),
            (Some(h), true) => {
                if h <= Height::GENESIS {
                    return Ok(());
                }
                Some(height_key(h.prev()))
            }
        };

        let mode = match (&start, reverse) {
            (None, false) => IteratorMode::Start,
            (None, true) => IteratorMode::End,
            (Some(key), false) => IteratorMode::From(key, Direction::Forward),
            (Some(key), true) => IteratorMode::From(key, Direction::Reverse),
        };

        let cap = clamp_limit(limit);
        let mut n = 0u64;
        for item in self.db.iterator_cf(cf, mode) {
            if n >= cap {
                break;
            }
            let (_, value) = item.map_err(|e| SiltError::Storage(e.to_string()))?;
            let manifest = Self::decode_manifest(&value)?;
            let height = manifest.height;
            let hash = manifest.hash;
            let keep = if load {
                f(height, hash, Some(manifest))?
            } else {
                f(height, hash, None)?
            };
            if !keep {
                break;
            }
            n += 1;
        }
        Ok(())
    }
}

/// Big-endian height key; byte order matches numeric order for all
/// non-negative heights.
pub(crate) fn height_key(height: Height) -> [u8; 8] {
    (height.0 as u64).to_be_bytes()
}

/// Clamp a requested limit to the hard page-size cap; zero means "the cap".
pub(crate) fn clamp_limit(limit: u64) -> u64 {
    if limit == 0 {
        MAX_PAGE_SIZE
    } else {
        limit.min(MAX_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silt_core::types::Manifest;

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

    fn block(height: i64) -> Block {
        Block {
            manifest: manifest(height),
            operations: vec![],
            states: vec![],
        }
    }

    fn temp_archive() -> (ArchiveStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::open(dir.path().join("archive")).unwrap();
        (store, dir)
    }

    #[test]
    fn empty_archive_has_nil_tip() {
        let (store, _dir) = temp_archive();
        assert_eq!(store.tip_height().unwrap(), Height::NIL);
        assert!(store.manifest_by_height(Height(0)).unwrap().is_none());
    }

    #[test]
    fn put_block_advances_tip_and_indexes_hash() {
        let (store, _dir) = temp_archive();
        let b = block(0);
        store.put_block(&b).unwrap();

        assert_eq!(store.tip_height().unwrap(), Height(0));
        let by_height = store.manifest_by_height(Height(0)).unwrap().unwrap();
        assert_eq!(by_height, b.manifest);
        let by_hash = store.manifest(&b.hash()).unwrap().unwrap();
        assert_eq!(by_hash, b.manifest);
        assert_eq!(store.block_by_height(Height(0)).unwrap().unwrap(), b);
    }

    #[test]
    fn manifests_scan_forward_and_reverse() {
        let (store, _dir) = temp_archive();
        for h in 0..5 {
            store.put_block(&block(h)).unwrap();
        }

        let mut seen = Vec::new();
        store
            .manifests(false, false, None, 0, &mut |h, _, m| {
                assert!(m.is_none());
                seen.push(h.0);
                Ok(true)
            })
            .unwrap();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);

        let mut seen = Vec::new();
        store
            .manifests(true, true, None, 0, &mut |h, _, m| {
                assert!(m.is_some());
                seen.push(h.0);
                Ok(true)
            })
            .unwrap();
        assert_eq!(seen, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn manifests_offset_is_strict() {
        let (store, _dir) = temp_archive();
        for h in 0..5 {
            store.put_block(&block(h)).unwrap();
        }

        let mut seen = Vec::new();
        store
            .manifests(false, false, Some(Height(2)), 0, &mut |h, _, _| {
                seen.push(h.0);
                Ok(true)
            })
            .unwrap();
        assert_eq!(seen, vec![3, 4]);

        let mut seen = Vec::new();
        store
            .manifests(false, true, Some(Height(2)), 0, &mut |h, _, _| {
                seen.push(h.0);
                Ok(true)
            })
            .unwrap();
        assert_eq!(seen, vec![1, 0]);

        // Reverse from genesis: nothing strictly below.
        let mut seen = Vec::new();
        store
            .manifests(false, true, Some(Height(0)), 0, &mut |h, _, _| {
                seen.push(h.0);
                Ok(true)
            })
            .unwrap();
        assert!(seen.is_empty());
    }

    #[test]
    fn manifests_respects_limit_and_early_stop() {
        let (store, _dir) = temp_archive();
        for h in 0..10 {
            store.put_block(&block(h)).unwrap();
        }

        let mut seen = Vec::new();
        store
            .manifests(false, false, None, 3, &mut |h, _, _| {
                seen.push(h.0);
                Ok(true)
            })
            .unwrap();
        assert_eq!(seen, vec![0, 1, 2]);

        let mut seen = Vec::new();
        store
            .manifests(false, false, None, 0, &mut |h, _, _| {
                seen.push(h.0);
                Ok(h.0 < 4)
            })
            .unwrap();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn currency_round_trip() {
        let (store, _dir) = temp_archive();
        let cid = CurrencyId::new("SLT").unwrap();
        let design = CurrencyDesign {
            currency: cid.clone(),
            genesis_supply: 1_000_000_000,
            min_balance: 1,
        };
        store.put_currency(&design).unwrap();

        assert_eq!(store.currency(&cid).unwrap(), Some(design.clone()));
        assert_eq!(store.currencies().unwrap(), vec![design]);
        assert!(store
            .currency(&CurrencyId::new("NONE").unwrap())
            .unwrap()
            .is_none());
    }
}
