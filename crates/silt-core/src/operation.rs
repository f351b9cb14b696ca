//! Confirmed operations.
//!
//! Operation payloads form a closed set of tagged variants; everything that
//! needs to act per-kind dispatches on the tag. The index receives
//! operations only inside finalized blocks, so each one already carries its
//! application outcome.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::Amount;
use crate::types::Hash256;

/// Payload of an operation, tagged by kind.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationBody {
    /// Create a new account funded with initial amounts.
    CreateAccount {
        target: Address,
        amounts: Vec<Amount>,
    },
    /// Move amounts from sender to receiver.
    Transfer {
        sender: Address,
        receiver: Address,
        amounts: Vec<Amount>,
    },
    /// Record a signature over a registered document.
    SignDocument {
        owner: Address,
        signer: Address,
        document_id: u64,
    },
}

impl OperationBody {
    /// Stable tag name of this operation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            OperationBody::CreateAccount { .. } => "create_account",
            OperationBody::Transfer { .. } => "transfer",
            OperationBody::SignDocument { .. } => "sign_document",
        }
    }

    /// Every address participating in this operation, deduplicated,
    /// in payload order. Multi-party operations are indexed under each of
    /// these addresses.
    pub fn addresses(&self) -> Vec<Address> {
        let raw: Vec<&Address> = match self {
            OperationBody::CreateAccount { target, .. } => vec![target],
            OperationBody::Transfer { sender, receiver, .. } => vec![sender, receiver],
            OperationBody::SignDocument { owner, signer, .. } => vec![owner, signer],
        };
        let mut out: Vec<Address> = Vec::with_capacity(raw.len());
        for a in raw {
            if !out.contains(a) {
                out.push(a.clone());
            }
        }
        out
    }
}

/// An operation as confirmed in a finalized block.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Operation {
    /// Hash of the operation's fact, assigned by the consensus engine.
    pub fact_hash: Hash256,
    /// The operation payload.
    pub body: OperationBody,
    /// Whether the operation was applied to state.
    pub in_state: bool,
    /// Failure reason when `in_state` is false.
    pub reason: Option<String>,
}

/// An unsigned or signed bundle of operations submitted through the API.
///
/// Analogous to a seal: the node signs the bundle before distributing it to
/// peer channels. Signing is exposed through the
/// [`Signable`](crate::traits::Signable) capability.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// Hex-encoded public key of the signer; empty until signed.
    #[serde(default)]
    pub signer: String,
    /// Operations carried by this envelope.
    pub operations: Vec<OperationBody>,
    /// Hex-encoded signature over the canonical bytes; absent until signed.
    #[serde(default)]
    pub signature: Option<String>,
    /// Unix timestamp (seconds) at which the envelope was signed.
    #[serde(default)]
    pub signed_at: i64,
}
