//! State updates carried by finalized blocks.
//!
//! The consensus engine emits one record per mutated state cell. Records
//! are append-only and versioned by height: a new record never replaces an
//! older one, and `previous_height` links back to the prior version of the
//! same cell.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::Amount;
use crate::types::Height;

/// Account record: existence and keying of an address.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct AccountState {
    /// The account's address.
    pub address: Address,
    /// Hex-encoded public key controlling the account.
    pub public_key: String,
    /// Height at which this version was written.
    pub height: Height,
    /// Height of the previous version, or nil for the first.
    pub previous_height: Height,
}

/// Balance record: one per (address, currency, height) mutation.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct BalanceState {
    /// The account's address.
    pub address: Address,
    /// Post-mutation amount for one currency.
    pub amount: Amount,
    /// Height at which this version was written.
    pub height: Height,
    /// Height of the previous version for this currency, or nil.
    pub previous_height: Height,
}

/// Document record: registration of a signed-document cell.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct DocumentState {
    /// Owning address.
    pub address: Address,
    /// Document id, unique per owner.
    pub document_id: u64,
    /// Hash of the document content.
    pub file_hash: String,
    /// Height at which this version was written.
    pub height: Height,
    /// Height of the previous version, or nil.
    pub previous_height: Height,
}

/// Filedata record: per-document signing metadata, joined with documents.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct FileDataState {
    /// Owning address.
    pub address: Address,
    /// Hash of the document content.
    pub file_hash: String,
    /// Address that produced the latest signature.
    pub signer: Address,
    /// Height at which this version was written.
    pub height: Height,
    /// Height of the previous version, or nil.
    pub previous_height: Height,
}

/// One state mutation, tagged by the collection it belongs to.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateUpdate {
    Account(AccountState),
    Balance(BalanceState),
    Document(DocumentState),
    FileData(FileDataState),
}

impl StateUpdate {
    /// Height of the wrapped record.
    pub fn height(&self) -> Height {
        match self {
            StateUpdate::Account(s) => s.height,
            StateUpdate::Balance(s) => s.height,
            StateUpdate::Document(s) => s.height,
            StateUpdate::FileData(s) => s.height,
        }
    }

    /// Address of the wrapped record.
    pub fn address(&self) -> &Address {
        match self {
            StateUpdate::Account(s) => &s.address,
            StateUpdate::Balance(s) => &s.address,
            StateUpdate::Document(s) => &s.address,
            StateUpdate::FileData(s) => &s.address,
        }
    }
}
