//! GPT header decoding

use gptveil_core::{
    checked_multiply_u32_to_u64, validate_allocation_size, Error, Result, TableCopy,
    LBA_SIZE, MAX_PARTITION_COUNT, MAX_PARTITION_TABLE_SIZE,
};
use serde::Serialize;

use crate::checksum::{self, ENTRIES_CHECKSUM_OFFSET, HEADER_CHECKSUM_OFFSET};
use crate::guid;

/// A decoded GPT header together with the entry array it describes
///
/// Decoding is permissive: a wrong signature or a stale checksum is reported
/// through [`GptHeader::verify_header_checksum`] and friends, never rejected.
/// Only a header whose sizes make the entry array impossible to locate fails.
///
/// # Structure
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0x00    8     Signature ("EFI PART")
/// 0x08    4     Revision
/// 0x0C    4     Header size
/// 0x10    4     Header CRC32
/// 0x18    8     Current LBA
/// 0x20    8     Backup LBA
/// 0x28    8     First usable LBA
/// 0x30    8     Last usable LBA
/// 0x38    16    Disk GUID
/// 0x48    8     Partition entries LBA
/// 0x50    4     Number of partition entries
/// 0x54    4     Size of a partition entry
/// 0x58    4     Partition entries CRC32
/// ```
#[derive(Debug, Clone)]
pub struct GptHeader {
    /// Which copy this header was read from
    pub copy: TableCopy,
    /// The whole header sector as read
    pub raw: Vec<u8>,
    /// Byte offset of the header on disk
    pub offset: u64,
    /// Header signature (should be "EFI PART")
    pub signature: [u8; 8],
    /// GPT revision (usually 0x00010000)
    pub revision: u32,
    /// Header size in bytes (usually 92)
    pub header_size: u32,
    /// Stored header checksum
    pub checksum: [u8; 4],
    /// LBA of this header
    pub current_lba: u64,
    /// LBA of the other header
    pub backup_lba: u64,
    /// First usable LBA for partitions
    pub first_usable_lba: u64,
    /// Last usable LBA for partitions
    pub last_usable_lba: u64,
    /// Disk GUID
    pub disk_guid: String,
    /// Starting LBA of the entry array as declared by the header
    pub partition_entries_lba: u64,
    /// Number of partition entries
    pub entries_count: u32,
    /// Size of each partition entry
    pub entry_size: u32,
    /// Stored entry array checksum
    pub entries_checksum: [u8; 4],
    /// Byte offset of the entry array that was read
    pub partition_table_offset: u64,
    /// The entry array, `entries_count * entry_size` bytes
    pub partition_table_raw: Vec<u8>,
}

impl GptHeader {
    /// GPT header signature
    pub const SIGNATURE: &'static [u8; 8] = b"EFI PART";

    /// Smallest header size that holds every field
    pub const MIN_HEADER_SIZE: u32 = 0x5C;

    /// Smallest entry size (the standard 128-byte entry)
    pub const MIN_ENTRY_SIZE: u32 = 128;

    /// Length of the entry array a header sector declares
    ///
    /// Used before the array is read, to know how much to read.
    ///
    /// # Errors
    ///
    /// Returns `InvalidZoneTable` if the entry size is smaller than a standard
    /// entry, the count is implausible, or the array exceeds allocation limits.
    pub fn declared_table_len(raw: &[u8]) -> Result<usize> {
        if raw.len() < Self::MIN_HEADER_SIZE as usize {
            return Err(Error::invalid_zone_table(format!(
                "GPT header sector is {} bytes",
                raw.len()
            )));
        }

        let entries_count = read_u32(raw, 0x50);
        let entry_size = read_u32(raw, 0x54);

        if entry_size < Self::MIN_ENTRY_SIZE {
            return Err(Error::invalid_zone_table(format!(
                "partition entry size {} is smaller than {}",
                entry_size,
                Self::MIN_ENTRY_SIZE
            )));
        }

        if entries_count > MAX_PARTITION_COUNT {
            return Err(Error::invalid_zone_table(format!(
                "partition entry count {} exceeds {}",
                entries_count, MAX_PARTITION_COUNT
            )));
        }

        let len = checked_multiply_u32_to_u64(entries_count, entry_size, "partition entry array")?;
        validate_allocation_size(len, MAX_PARTITION_TABLE_SIZE, "partition entry array")
    }

    /// Number of whole sectors the entry array occupies
    pub fn table_sectors(table_len: usize) -> u64 {
        (table_len as u64).div_ceil(LBA_SIZE as u64)
    }

    /// Decode a header sector and attach the entry array read for it
    ///
    /// # Arguments
    ///
    /// * `copy` - Which copy the sector came from
    /// * `raw` - The header sector (512 bytes)
    /// * `offset` - Byte offset of the header sector on disk
    /// * `partition_table_raw` - The entry array, exactly as long as the header declares
    /// * `partition_table_offset` - Byte offset of the entry array on disk
    pub fn from_parts(
        copy: TableCopy,
        raw: Vec<u8>,
        offset: u64,
        partition_table_raw: Vec<u8>,
        partition_table_offset: u64,
    ) -> Result<Self> {
        let table_len = Self::declared_table_len(&raw)?;

        let header_size = read_u32(&raw, 0x0C);
        if header_size < Self::MIN_HEADER_SIZE || header_size as usize > raw.len() {
            return Err(Error::invalid_zone_table(format!(
                "{} GPT header size {} outside {}..={}",
                copy,
                header_size,
                Self::MIN_HEADER_SIZE,
                raw.len()
            )));
        }

        if partition_table_raw.len() != table_len {
            return Err(Error::invalid_zone_table(format!(
                "{} partition entry array is {} bytes, header declares {}",
                copy,
                partition_table_raw.len(),
                table_len
            )));
        }

        let mut signature = [0u8; 8];
        signature.copy_from_slice(&raw[0..8]);

        let mut disk_guid = [0u8; 16];
        disk_guid.copy_from_slice(&raw[0x38..0x48]);

        let header = Self {
            copy,
            signature,
            revision: read_u32(&raw, 0x08),
            header_size,
            checksum: read_array(&raw, HEADER_CHECKSUM_OFFSET),
            current_lba: read_u64(&raw, 0x18),
            backup_lba: read_u64(&raw, 0x20),
            first_usable_lba: read_u64(&raw, 0x28),
            last_usable_lba: read_u64(&raw, 0x30),
            disk_guid: guid::decode(&disk_guid),
            partition_entries_lba: read_u64(&raw, 0x48),
            entries_count: read_u32(&raw, 0x50),
            entry_size: read_u32(&raw, 0x54),
            entries_checksum: read_array(&raw, ENTRIES_CHECKSUM_OFFSET),
            raw,
            offset,
            partition_table_offset,
            partition_table_raw,
        };

        if !header.has_valid_signature() {
            tracing::warn!(
                "{} GPT header at offset {} lacks the \"EFI PART\" signature",
                copy,
                offset
            );
        }

        Ok(header)
    }

    /// Check the "EFI PART" signature
    pub fn has_valid_signature(&self) -> bool {
        &self.signature == Self::SIGNATURE
    }

    /// Recompute the header checksum from the header bytes
    pub fn calculate_checksum(&self) -> Result<[u8; 4]> {
        checksum::header_checksum(&self.raw)
    }

    /// Recompute the entry array checksum
    pub fn calculate_entries_checksum(&self) -> [u8; 4] {
        checksum::table_checksum(&self.partition_table_raw)
    }

    /// Verify the stored header checksum
    pub fn verify_header_checksum(&self) -> bool {
        matches!(self.calculate_checksum(), Ok(c) if c == self.checksum)
    }

    /// Verify the stored entry array checksum
    pub fn verify_entries_checksum(&self) -> bool {
        self.calculate_entries_checksum() == self.entries_checksum
    }

    /// Copy of the header bytes with a new entry array checksum spliced in
    ///
    /// The header's own checksum field is left as it was; recompute it with
    /// [`checksum::header_checksum`] over the returned bytes.
    pub fn with_entries_checksum(&self, entries_checksum: [u8; 4]) -> Vec<u8> {
        let mut raw = self.raw.clone();
        raw[ENTRIES_CHECKSUM_OFFSET..ENTRIES_CHECKSUM_OFFSET + 4].copy_from_slice(&entries_checksum);
        raw
    }

    /// Byte offset of the header checksum field on disk
    pub fn checksum_offset(&self) -> u64 {
        self.offset + HEADER_CHECKSUM_OFFSET as u64
    }

    /// Byte offset of the entry array checksum field on disk
    pub fn entries_checksum_offset(&self) -> u64 {
        self.offset + ENTRIES_CHECKSUM_OFFSET as u64
    }

    /// Summarize the header for display
    pub fn report(&self) -> HeaderReport {
        HeaderReport {
            copy: self.copy,
            offset: self.offset,
            signature_valid: self.has_valid_signature(),
            revision: self.revision,
            header_size: self.header_size,
            checksum: hex::encode(self.checksum),
            calculated_checksum: self
                .calculate_checksum()
                .map(hex::encode)
                .unwrap_or_default(),
            current_lba: self.current_lba,
            backup_lba: self.backup_lba,
            first_usable_lba: self.first_usable_lba,
            last_usable_lba: self.last_usable_lba,
            disk_guid: self.disk_guid.clone(),
            partition_entries_lba: self.partition_entries_lba,
            entries_count: self.entries_count,
            entry_size: self.entry_size,
            partition_table_offset: self.partition_table_offset,
            entries_checksum: hex::encode(self.entries_checksum),
            calculated_entries_checksum: hex::encode(self.calculate_entries_checksum()),
        }
    }
}

/// Header fields alongside recomputed checksums, for display
#[derive(Debug, Clone, Serialize)]
pub struct HeaderReport {
    pub copy: TableCopy,
    pub offset: u64,
    pub signature_valid: bool,
    pub revision: u32,
    pub header_size: u32,
    pub checksum: String,
    pub calculated_checksum: String,
    pub current_lba: u64,
    pub backup_lba: u64,
    pub first_usable_lba: u64,
    pub last_usable_lba: u64,
    pub disk_guid: String,
    pub partition_entries_lba: u64,
    pub entries_count: u32,
    pub entry_size: u32,
    pub partition_table_offset: u64,
    pub entries_checksum: String,
    pub calculated_entries_checksum: String,
}

impl HeaderReport {
    /// Whether both stored checksums match their recomputed values
    pub fn is_consistent(&self) -> bool {
        self.checksum == self.calculated_checksum
            && self.entries_checksum == self.calculated_entries_checksum
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(read_array(bytes, offset))
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(read_array(bytes, offset))
}

fn read_array<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}
