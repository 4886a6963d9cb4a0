//! Partition entry array scanner

use super::entry::GptPartitionEntry;
use super::header::GptHeader;

/// Decode every live entry in a header's entry array
///
/// Slots are walked in order, `entry_size` bytes at a time; each entry is tagged
/// with its absolute byte offset (`partition_table_offset + index * entry_size`).
/// Empty and undecodable slots are skipped. With `secret_search`, slots whose
/// type GUID is zero are also checked for a GUID pair stashed in their last
/// 32 bytes.
pub fn scan_table(header: &GptHeader, secret_search: bool) -> Vec<GptPartitionEntry> {
    let entry_size = header.entry_size as usize;
    let mut entries = Vec::new();

    for (index, slot) in header.partition_table_raw.chunks_exact(entry_size).enumerate() {
        let offset = header.partition_table_offset + (index * entry_size) as u64;

        if let Some(entry) = GptPartitionEntry::decode(slot, offset, secret_search) {
            tracing::debug!(
                "{} slot {} at offset {}: {} ({}){}",
                header.copy,
                index,
                offset,
                entry.unique_guid,
                entry.type_guid,
                if entry.is_secret { " [secret]" } else { "" }
            );
            entries.push(entry);
        }
    }

    entries
}
