//! # silt-digest — Derived store, block sessions, and the digester.
//!
//! Consumes finalized blocks and maintains the query-optimized index:
//! - [`store::DigestStore`] — RocksDB-backed derived store
//! - [`session::BlockSession`] — one block's upserts, committed atomically
//! - [`digester::Digester`] — single-writer ingestion pipeline with retry
//! - [`primary::PrimaryLedger`] — read handle to the consensus engine's store
//! - [`offset`] — the `"height,index"` pagination cursor codec

pub mod config;
pub mod digester;
pub mod offset;
pub mod primary;
pub mod session;
pub mod store;
pub mod values;

pub use config::DigestConfig;
pub use digester::{DigestReport, Digester, RetryPolicy};
pub use offset::{build_offset, parse_offset};
pub use primary::{ArchiveStore, PrimaryLedger};
pub use session::{BlockSession, digest_block};
pub use store::{DigestStore, OperationsFilter};
pub use values::{AccountValue, DocumentValue, OperationValue};
