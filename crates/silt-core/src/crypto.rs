//! Ed25519 key wrappers for envelope signing.
//!
//! The index never verifies operation signatures (the consensus engine
//! already has); it only signs outbound envelopes with the node key before
//! distributing them to peer channels.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::SignError;

/// Network identifier mixed into every signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkId(String);

impl NetworkId {
    /// Wrap a network id string.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The id as bytes, for signing.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Node private key.
#[derive(Debug)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        Self(SigningKey::generate(&mut OsRng))
    }

    /// Parse a key from 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, SignError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| SignError::InvalidPrivateKey)?;
        Ok(Self(SigningKey::from_bytes(&bytes)))
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// Sign a message, returning the 64-byte signature.
    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.0.sign(msg).to_bytes().to_vec()
    }
}

/// Node public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Parse a key from 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, SignError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| SignError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|_| SignError::InvalidPublicKey)
    }

    /// Hex encoding of the key bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Verify a 64-byte signature over a message.
    pub fn verify(&self, msg: &[u8], signature: &[u8]) -> Result<(), SignError> {
        let sig_bytes: [u8; 64] = signature
            .try_into()
            .map_err(|_| SignError::InvalidSignature)?;
        let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        self.0
            .verify(msg, &sig)
            .map_err(|_| SignError::VerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let key = PrivateKey::generate();
        let msg = b"finalized at height 7";
        let sig = key.sign(msg);
        assert!(key.public_key().verify(msg, &sig).is_ok());
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let key = PrivateKey::generate();
        let sig = key.sign(b"original");
        assert_eq!(
            key.public_key().verify(b"tampered", &sig),
            Err(SignError::VerificationFailed)
        );
    }

    #[test]
    fn verify_rejects_short_signature() {
        let key = PrivateKey::generate();
        assert_eq!(
            key.public_key().verify(b"msg", &[0u8; 10]),
            Err(SignError::InvalidSignature)
        );
    }

    #[test]
    fn public_key_hex_round_trip() {
        let key = PrivateKey::generate();
        let pk = key.public_key();
        let parsed = PublicKey::from_hex(&pk.to_hex()).unwrap();
        assert_eq!(parsed, pk);
    }

    #[test]
    fn private_key_from_bad_hex() {
        assert_eq!(
            PrivateKey::from_hex("nothex").unwrap_err(),
            SignError::InvalidPrivateKey
        );
    }
}
