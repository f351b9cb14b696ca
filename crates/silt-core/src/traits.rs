//! Trait interfaces for the Silt index.
//!
//! - [`Signable`] — capability of a payload to be signed with the node key
//!   (silt-core implements it for [`Envelope`]; the API's send path depends
//!   only on the trait, never on the concrete payload type)

use std::time::{SystemTime, UNIX_EPOCH};

use crate::crypto::{NetworkId, PrivateKey, PublicKey};
use crate::error::SignError;
use crate::operation::Envelope;

/// A payload that can carry a node signature.
///
/// Implementations define their own canonical byte form; `sign` attaches
/// the signature and signer produced with `key` over those bytes for the
/// given network.
pub trait Signable {
    /// Canonical bytes covered by the signature.
    fn signing_bytes(&self, network_id: &NetworkId) -> Result<Vec<u8>, SignError>;

    /// Sign in place with `key` for `network_id`.
    fn sign(&mut self, key: &PrivateKey, network_id: &NetworkId) -> Result<(), SignError>;

    /// Verify the attached signature, if any.
    fn verify(&self, network_id: &NetworkId) -> Result<(), SignError>;
}

impl Signable for Envelope {
    fn signing_bytes(&self, network_id: &NetworkId) -> Result<Vec<u8>, SignError> {
        let ops = bincode::encode_to_vec(&self.operations, bincode::config::standard())
            .map_err(|e| SignError::Serialization(e.to_string()))?;
        let mut out =
            Vec::with_capacity(network_id.as_bytes().len() + ops.len() + 8);
        out.extend_from_slice(network_id.as_bytes());
        out.extend_from_slice(&ops);
        out.extend_from_slice(&self.signed_at.to_be_bytes());
        Ok(out)
    }

    fn sign(&mut self, key: &PrivateKey, network_id: &NetworkId) -> Result<(), SignError> {
        self.signed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        self.signer = key.public_key().to_hex();
        let bytes = self.signing_bytes(network_id)?;
        self.signature = Some(hex::encode(key.sign(&bytes)));
        Ok(())
    }

    fn verify(&self, network_id: &NetworkId) -> Result<(), SignError> {
        let sig_hex = self.signature.as_deref().ok_or(SignError::InvalidSignature)?;
        let sig = hex::decode(sig_hex).map_err(|_| SignError::InvalidSignature)?;
        let signer = PublicKey::from_hex(&self.signer)?;
        signer.verify(&self.signing_bytes(network_id)?, &sig)
    }
}
