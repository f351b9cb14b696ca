//! Error types for the Silt index.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("empty address")] Empty,
    #[error("address too short: {0} chars")] TooShort(usize),
    #[error("address too long: {0} chars")] TooLong(usize),
    #[error("invalid leading character: {0}")] InvalidLeadingCharacter(char),
    #[error("invalid character: {0}")] InvalidCharacter(char),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("empty currency id")] Empty,
    #[error("currency id too long: {0} chars")] TooLong(usize),
    #[error("invalid currency character: {0}")] InvalidCharacter(char),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OffsetError {
    #[error("missing separator in offset: {0:?}")] MissingSeparator(String),
    #[error("invalid height in offset: {0:?}")] InvalidHeight(String),
    #[error("invalid index in offset: {0:?}")] InvalidIndex(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignError {
    #[error("invalid private key bytes")] InvalidPrivateKey,
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("invalid signature bytes")] InvalidSignature,
    #[error("signature verification failed")] VerificationFailed,
    #[error("serialization: {0}")] Serialization(String),
}

/// Top-level error for the Silt index.
///
/// Small domain errors stay transparent so callers can match on them; the
/// catch-all `Storage` and `Network` variants wrap backend failures as
/// strings, which keeps the type cloneable for coalesced query results.
#[derive(Error, Debug, Clone)]
pub enum SiltError {
    #[error(transparent)] Address(#[from] AddressError),
    #[error(transparent)] Currency(#[from] CurrencyError),
    #[error(transparent)] Offset(#[from] OffsetError),
    #[error(transparent)] Sign(#[from] SignError),
    #[error("{0} not found")] NotFound(String),
    #[error("read-only store")] Readonly,
    #[error("not supported: {0}")] Unsupported(String),
    #[error("storage: {0}")] Storage(String),
    #[error("network: {0}")] Network(String),
}

impl SiltError {
    /// True when this error means the requested entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SiltError::NotFound(_))
    }
}
