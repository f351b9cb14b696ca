//! Join values served by the derived store's queries.

use serde::{Deserialize, Serialize};

use silt_core::address::Address;
use silt_core::amount::Amount;
use silt_core::operation::Operation;
use silt_core::state::{DocumentState, FileDataState};
use silt_core::types::Height;

/// An account joined with its most recent balance per currency.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct AccountValue {
    /// The account's address.
    pub address: Address,
    /// Hex-encoded public key controlling the account.
    pub public_key: String,
    /// Latest known balance per currency, one entry per currency.
    pub balances: Vec<Amount>,
    /// Height of the newest contributing balance record.
    pub height: Height,
    /// Previous height of that record, for block-link navigation.
    pub previous_height: Height,
}

/// A document joined with its most recent filedata record.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct DocumentValue {
    /// The latest document record.
    pub document: DocumentState,
    /// The latest filedata record, if any was ever written.
    pub filedata: Option<FileDataState>,
    /// Height of the newest contributing record.
    pub height: Height,
    /// Previous height of that record.
    pub previous_height: Height,
}

/// An operation as indexed by the derived store.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct OperationValue {
    /// The confirmed operation, including its application outcome.
    pub op: Operation,
    /// Height of the confirming block.
    pub height: Height,
    /// Unix timestamp (seconds) at which the block was confirmed.
    pub confirmed_at: i64,
    /// Position of the operation within its block; disambiguates multiple
    /// operations at the same height.
    pub index: u64,
    /// Every address the operation is indexed under.
    pub addresses: Vec<Address>,
}

impl OperationValue {
    /// The pagination cursor pointing at this operation.
    pub fn cursor(&self) -> (Height, u64) {
        (self.height, self.index)
    }
}
