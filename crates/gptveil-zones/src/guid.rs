//! GUID codec for GPT's mixed-endian on-disk layout
//!
//! On disk the first three groups are little-endian and the last two are
//! stored in order, so a straight hex dump does not match the canonical text
//! form vendor tools print:
//!
//! ```text
//! bytes:  af 3d c6 0f | 83 84 | 72 47 | 8e 79 | 3d 69 d8 47 7d e4
//! text:   0FC63DAF   - 8483  - 4772  - 8E79  - 3D69D8477DE4
//! ```

use gptveil_core::{Error, Result};
use uuid::Uuid;

/// Size of an on-disk GUID
pub const GUID_LEN: usize = 16;

/// The all-zero GUID in canonical form
pub const ZERO_GUID: &str = "00000000-0000-0000-0000-000000000000";

/// Decode a 16-byte on-disk GUID into canonical uppercase text
pub fn decode(bytes: &[u8; GUID_LEN]) -> String {
    Uuid::from_bytes_le(*bytes)
        .hyphenated()
        .to_string()
        .to_uppercase()
}

/// Decode the first 16 bytes of `bytes`, if there are that many
pub fn decode_slice(bytes: &[u8]) -> Option<String> {
    let field: &[u8; GUID_LEN] = bytes.get(..GUID_LEN)?.try_into().ok()?;
    Some(decode(field))
}

/// Encode canonical GUID text (either case) into its 16-byte on-disk form
pub fn encode(text: &str) -> Result<[u8; GUID_LEN]> {
    let uuid = Uuid::parse_str(text.trim())
        .map_err(|e| Error::invalid_guid(format!("{}: {}", text, e)))?;
    Ok(uuid.to_bytes_le())
}

/// Normalize GUID text to the canonical uppercase form used as registry key
pub fn normalize(text: &str) -> Result<String> {
    Ok(decode(&encode(text)?))
}

/// Check whether a GUID field is all zero
pub fn is_zero(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0)
}
