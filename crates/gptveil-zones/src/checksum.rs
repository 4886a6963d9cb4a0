//! CRC-32 checksums as stored in GPT headers
//!
//! GPT stores both checksums as the little-endian encoding of the standard
//! (zlib / IEEE 802.3) CRC-32. Every function here returns exactly four bytes.

use gptveil_core::{Error, Result};

/// Offset of the header's own checksum field
pub const HEADER_CHECKSUM_OFFSET: usize = 0x10;

/// Offset of the partition entry array checksum field
pub const ENTRIES_CHECKSUM_OFFSET: usize = 0x58;

/// Offset of the header size field
pub const HEADER_SIZE_OFFSET: usize = 0x0C;

/// CRC-32 of `bytes`, little-endian
pub fn crc32_le(bytes: &[u8]) -> [u8; 4] {
    crc32fast::hash(bytes).to_le_bytes()
}

/// Checksum of a partition entry array
///
/// Covers the whole array, unused slots included.
pub fn table_checksum(table: &[u8]) -> [u8; 4] {
    crc32_le(table)
}

/// Checksum of a GPT header
///
/// Computed over the first `header_size` bytes (read from the header itself at
/// offset 0x0C) with the checksum field at 0x10..0x14 treated as zero.
///
/// # Errors
///
/// Returns `InvalidZoneTable` if the declared header size does not cover the
/// checksum field or runs past the end of `header`.
pub fn header_checksum(header: &[u8]) -> Result<[u8; 4]> {
    let size_field = header
        .get(HEADER_SIZE_OFFSET..HEADER_SIZE_OFFSET + 4)
        .ok_or_else(|| Error::invalid_zone_table("GPT header is too short"))?;
    let header_size = u32::from_le_bytes([size_field[0], size_field[1], size_field[2], size_field[3]]) as usize;

    if header_size < HEADER_CHECKSUM_OFFSET + 4 || header_size > header.len() {
        return Err(Error::invalid_zone_table(format!(
            "GPT header size {} outside 20..={}",
            header_size,
            header.len()
        )));
    }

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&header[..HEADER_CHECKSUM_OFFSET]);
    hasher.update(&[0u8; 4]);
    hasher.update(&header[HEADER_CHECKSUM_OFFSET + 4..header_size]);

    Ok(hasher.finalize().to_le_bytes())
}
