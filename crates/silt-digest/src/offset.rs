//! Offset cursor codec for keyset pagination.
//!
//! A cursor is the string `"<height>,<index>"` and totally orders records
//! within a collection by `(height, index)`. It is never a row count, so it
//! stays stable while new blocks append records.

use silt_core::error::OffsetError;
use silt_core::types::Height;

/// Parse a cursor string into `(height, index)`.
///
/// Accepts exactly one comma separating a non-negative height and a
/// non-negative index; anything else is rejected.
pub fn parse_offset(s: &str) -> Result<(Height, u64), OffsetError> {
    let (h, i) = s
        .split_once(',')
        .ok_or_else(|| OffsetError::MissingSeparator(s.to_string()))?;
    let height: i64 = h
        .parse()
        .map_err(|_| OffsetError::InvalidHeight(h.to_string()))?;
    if height < 0 {
        return Err(OffsetError::InvalidHeight(h.to_string()));
    }
    let index: u64 = i
        .parse()
        .map_err(|_| OffsetError::InvalidIndex(i.to_string()))?;
    Ok((Height(height), index))
}

/// Build the cursor string for `(height, index)`. Exact inverse of
/// [`parse_offset`] for all valid inputs.
pub fn build_offset(height: Height, index: u64) -> String {
    format!("{height},{index}")
}
