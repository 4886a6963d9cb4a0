//! GPT (GUID Partition Table) header and entry array handling
//!
//! # Structure
//!
//! ```text
//! LBA 0:         Protective MBR
//! LBA 1:         Primary GPT header
//! LBA 2-33:      Primary partition entry array (128 entries x 128 bytes)
//! LBA 34+:       Usable disk space
//! ...
//! Last 33 to -2: Secondary partition entry array
//! Last:          Secondary GPT header
//! ```

pub mod entry;
pub mod header;
pub mod scan;
pub mod types;

use gptveil_core::{DiskGeometry, ReadSeek, Result, TableCopy};
use gptveil_pipeline::read_region;

pub use entry::GptPartitionEntry;
pub use header::{GptHeader, HeaderReport};
pub use scan::scan_table;
pub use types::classify;

/// Read one GPT header and its entry array
///
/// Both locations are derived from the geometry rather than from the header's
/// own LBA fields: the header sits at LBA 1 (primary) or the last LBA
/// (secondary); the entry array starts at LBA 2 (primary) or ends just before
/// the secondary header. Its length comes from the header's entry count and
/// entry size. Disagreement with the header's declared LBAs is logged.
///
/// # Errors
///
/// Returns `Io` if either region cannot be read, and `InvalidZoneTable` if the
/// header's sizes make the entry array impossible to locate.
pub fn read_header(
    stream: &mut dyn ReadSeek,
    geometry: &DiskGeometry,
    copy: TableCopy,
) -> Result<GptHeader> {
    let header_offset = geometry.header_offset(copy);
    let raw = read_region(stream, header_offset, geometry.lba_size as usize)?;

    let table_len = GptHeader::declared_table_len(&raw)?;
    let table_offset = geometry.table_offset(copy, GptHeader::table_sectors(table_len));
    let table = read_region(stream, table_offset, table_len)?;

    let header = GptHeader::from_parts(copy, raw, header_offset, table, table_offset)?;

    let lba_size = geometry.lba_size as u64;
    if header.current_lba * lba_size != header_offset {
        tracing::warn!(
            "{} GPT header claims LBA {} but was read from LBA {}",
            copy,
            header.current_lba,
            header_offset / lba_size
        );
    }
    if header.partition_entries_lba * lba_size != table_offset {
        tracing::warn!(
            "{} GPT header declares entries at LBA {}, reading them from LBA {}",
            copy,
            header.partition_entries_lba,
            table_offset / lba_size
        );
    }
    if !header.verify_header_checksum() {
        tracing::warn!("{} GPT header checksum mismatch", copy);
    }
    if !header.verify_entries_checksum() {
        tracing::warn!("{} GPT partition entry array checksum mismatch", copy);
    }

    Ok(header)
}
