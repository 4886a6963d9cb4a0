//! GPT partition entry decoding

use serde::Serialize;

use crate::guid::{self, GUID_LEN};

/// Bytes at the head of an entry holding the type and unique GUIDs, and
/// at the tail where a hidden entry keeps them
pub const GUID_PAIR_LEN: usize = 2 * GUID_LEN;

/// A live partition entry decoded from one slot of an entry array
///
/// Each partition entry is `entry_size` bytes (128 in practice):
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0x00    16    Partition type GUID
/// 0x10    16    Unique partition GUID
/// 0x20    8     First LBA
/// 0x28    8     Last LBA (inclusive)
/// 0x30    8     Attribute flags
/// 0x38    72    Partition name (UTF-16LE)
/// ```
///
/// A hidden ("secret") entry has zeroed head GUIDs and carries its real pair
/// in the last 32 bytes of the slot.
#[derive(Debug, Clone, Serialize)]
pub struct GptPartitionEntry {
    /// Partition type GUID (canonical uppercase)
    pub type_guid: String,
    /// Unique partition GUID (canonical uppercase)
    pub unique_guid: String,
    /// The slot exactly as stored
    #[serde(serialize_with = "crate::hex_bytes")]
    pub raw_block: Vec<u8>,
    /// Absolute byte offset of the slot on disk
    pub table_offset: u64,
    /// Whether the GUIDs were recovered from the slot's tail
    pub is_secret: bool,
    /// First LBA (inclusive)
    pub first_lba: u64,
    /// Last LBA (inclusive)
    pub last_lba: u64,
    /// Attribute flags
    pub attributes: u64,
    /// Partition name
    pub name: String,
}

impl GptPartitionEntry {
    /// Standard size of a partition entry in bytes
    pub const ENTRY_SIZE: usize = 128;

    /// Decode one slot
    ///
    /// Returns `None` for an empty slot (all-zero type GUID with no hidden pair,
    /// or no hidden-pair search requested) and for a slot that cannot be keyed
    /// because its unique GUID is zero. Both are skipped by the scanner rather
    /// than reported.
    pub fn decode(slot: &[u8], table_offset: u64, secret_search: bool) -> Option<Self> {
        if slot.len() < Self::ENTRY_SIZE {
            return None;
        }

        let (guids, is_secret) = if !guid::is_zero(&slot[..GUID_LEN]) {
            (&slot[..GUID_PAIR_LEN], false)
        } else if secret_search {
            let tail = &slot[slot.len() - GUID_PAIR_LEN..];
            if guid::is_zero(&tail[GUID_LEN..]) {
                return None;
            }
            (tail, true)
        } else {
            return None;
        };

        if guid::is_zero(&guids[GUID_LEN..]) {
            tracing::debug!(
                "skipping slot at offset {}: type GUID set but unique GUID is zero",
                table_offset
            );
            return None;
        }

        Some(Self {
            type_guid: guid::decode_slice(&guids[..GUID_LEN])?,
            unique_guid: guid::decode_slice(&guids[GUID_LEN..])?,
            raw_block: slot.to_vec(),
            table_offset,
            is_secret,
            first_lba: read_u64(slot, 0x20),
            last_lba: read_u64(slot, 0x28),
            attributes: read_u64(slot, 0x30),
            name: parse_name(&slot[0x38..Self::ENTRY_SIZE]),
        })
    }

    /// Get the size of this partition in LBA sectors
    pub fn size_lba(&self) -> u64 {
        if self.last_lba >= self.first_lba {
            self.last_lba - self.first_lba + 1
        } else {
            0
        }
    }
}

/// Parse a NUL-terminated UTF-16LE partition name
pub(crate) fn parse_name(bytes: &[u8]) -> String {
    let utf16: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&c| c != 0)
        .collect();

    String::from_utf16_lossy(&utf16)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut field = [0u8; 8];
    field.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{hidden, linux_entry, LINUX_FILESYSTEM};

    #[test]
    fn test_decode_live_entry() {
        let slot = linux_entry(1, "root");

        let entry = GptPartitionEntry::decode(&slot, 1024, false).unwrap();
        assert_eq!(entry.type_guid, "0FC63DAF-8483-4772-8E79-3D69D8477DE4");
        assert_eq!(entry.unique_guid, guid::decode_slice(&slot[16..32]).unwrap());
        assert_eq!(entry.table_offset, 1024);
        assert!(!entry.is_secret);
        assert_eq!(entry.first_lba, 100);
        assert_eq!(entry.last_lba, 199);
        assert_eq!(entry.size_lba(), 100);
        assert_eq!(entry.name, "root");
        assert_eq!(entry.raw_block, slot);
    }

    #[test]
    fn test_decode_empty_slot() {
        let slot = vec![0u8; 128];
        assert!(GptPartitionEntry::decode(&slot, 0, false).is_none());
        assert!(GptPartitionEntry::decode(&slot, 0, true).is_none());
    }

    #[test]
    fn test_decode_hidden_slot_requires_secret_search() {
        let slot = hidden(&linux_entry(2, "data"));

        assert!(GptPartitionEntry::decode(&slot, 0, false).is_none());

        let entry = GptPartitionEntry::decode(&slot, 0, true).unwrap();
        assert!(entry.is_secret);
        assert_eq!(entry.type_guid, guid::decode(&LINUX_FILESYSTEM));
        assert_eq!(
            entry.unique_guid,
            guid::decode_slice(&linux_entry(2, "data")[16..32]).unwrap()
        );
        assert_eq!(entry.first_lba, 200);
    }

    #[test]
    fn test_decode_tail_with_zero_unique_guid_is_empty() {
        let mut slot = vec![0u8; 128];
        slot[96..112].copy_from_slice(&LINUX_FILESYSTEM);

        assert!(GptPartitionEntry::decode(&slot, 0, true).is_none());
    }

    #[test]
    fn test_decode_unkeyable_slot_skipped() {
        let mut slot = linux_entry(1, "root");
        slot[16..32].fill(0);

        assert!(GptPartitionEntry::decode(&slot, 0, false).is_none());
    }

    #[test]
    fn test_decode_short_slot() {
        assert!(GptPartitionEntry::decode(&[1u8; 64], 0, true).is_none());
    }

    #[test]
    fn test_parse_name() {
        let mut bytes = vec![0u8; 72];
        for (i, unit) in "EFI system".encode_utf16().enumerate() {
            bytes[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(parse_name(&bytes), "EFI system");
        assert_eq!(parse_name(&[0u8; 72]), "");
    }
}
