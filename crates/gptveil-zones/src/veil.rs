//! Hide/unhide - checksum-consistent rewrite of one partition entry
//!
//! Hiding moves an entry's type and unique GUIDs from its first 32 bytes to
//! its last 32 bytes and zeroes the head, so standard tools see an empty slot.
//! Unhiding moves the tail pair back to the head. The entry is rewritten in
//! both tables and both headers get fresh checksums:
//!
//! ```text
//! hide:    [type|unique][ lba / attrs / name ][tail32]
//!      ->  [   zeros   ][ lba / attrs / name ][type|unique]
//!
//! unhide:  [   zeros   ][ lba / attrs / name ][type|unique]
//!      ->  [type|unique][ lba / attrs / name ][   zeros   ]
//! ```
//!
//! The six writes are independent positioned writes with no rollback. A
//! failure part-way leaves the disk with one copy updated and the other not.

use gptveil_core::{Error, ReadWriteSeek, Result, TableCopy};
use gptveil_pipeline::write_region;

use crate::checksum;
use crate::gpt::entry::GUID_PAIR_LEN;
use crate::gpt::GptHeader;
use crate::registry::PartitionRecord;

/// What a pending write updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    /// The header's own checksum (header offset + 0x10)
    HeaderChecksum(TableCopy),
    /// The entry array checksum (header offset + 0x58)
    TableChecksum(TableCopy),
    /// The partition entry itself
    Entry(TableCopy),
}

/// One positioned write of a hide/unhide transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub target: WriteTarget,
    /// Absolute byte offset on the device
    pub offset: u64,
    pub bytes: Vec<u8>,
}

/// New checksums for one GPT copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyChecksums {
    pub entries_checksum: [u8; 4],
    pub header_checksum: [u8; 4],
}

/// A fully computed hide/unhide transaction, not yet written
#[derive(Debug, Clone)]
pub struct VeilPlan {
    /// `true` to hide, `false` to unhide
    pub hide: bool,
    pub unique_guid: String,
    /// The rewritten entry, identical for both tables
    pub new_entry: Vec<u8>,
    pub primary: CopyChecksums,
    pub secondary: CopyChecksums,
    /// The writes in issue order
    pub writes: Vec<PendingWrite>,
}

impl VeilPlan {
    /// Compute the new entry, checksums and writes for a hide or unhide
    ///
    /// The primary entry is the source of truth for the GUID pair; both
    /// copies are expected to be identical before the change.
    ///
    /// # Errors
    ///
    /// Returns `AmbiguousState` if the record is missing from either table,
    /// is already hidden (hide) or is not hidden (unhide). Returns
    /// `InvalidZoneTable` if the record's offsets fall outside the tables.
    pub fn build(
        primary_header: &GptHeader,
        secondary_header: &GptHeader,
        record: &PartitionRecord,
        hide: bool,
    ) -> Result<Self> {
        let (primary_block, secondary_offset) = match (&record.primary_block, record.secondary_offset) {
            (Some(block), Some(offset)) if record.secondary_block.is_some() => (block, offset),
            _ => {
                return Err(Error::ambiguous_state(format!(
                    "partition {} is not present in both GPT tables",
                    record.unique_guid
                )))
            }
        };
        let primary_offset = record.primary_offset.ok_or_else(|| {
            Error::ambiguous_state(format!(
                "partition {} has no primary entry offset",
                record.unique_guid
            ))
        })?;

        if hide && record.is_secret {
            return Err(Error::ambiguous_state(format!(
                "partition {} is already hidden",
                record.unique_guid
            )));
        }
        if !hide && !record.is_secret {
            return Err(Error::ambiguous_state(format!(
                "partition {} is not hidden",
                record.unique_guid
            )));
        }

        let entry_size = primary_header.entry_size as usize;
        if primary_block.len() != entry_size || secondary_header.entry_size != primary_header.entry_size {
            return Err(Error::invalid_zone_table(format!(
                "entry sizes disagree: primary {}, secondary {}, stored entry {}",
                primary_header.entry_size,
                secondary_header.entry_size,
                primary_block.len()
            )));
        }

        let new_entry = rewrite_entry(primary_block, hide);
        if hide && !crate::guid::is_zero(&primary_block[entry_size - GUID_PAIR_LEN..]) {
            tracing::warn!(
                "partition {}: the last {} bytes of the entry (end of the name field) are not zero and will be overwritten",
                record.unique_guid,
                GUID_PAIR_LEN
            );
        }

        let primary = copy_checksums(primary_header, primary_offset, &new_entry)?;
        let secondary = copy_checksums(secondary_header, secondary_offset, &new_entry)?;

        let writes = vec![
            PendingWrite {
                target: WriteTarget::HeaderChecksum(TableCopy::Primary),
                offset: primary_header.checksum_offset(),
                bytes: primary.header_checksum.to_vec(),
            },
            PendingWrite {
                target: WriteTarget::TableChecksum(TableCopy::Primary),
                offset: primary_header.entries_checksum_offset(),
                bytes: primary.entries_checksum.to_vec(),
            },
            PendingWrite {
                target: WriteTarget::Entry(TableCopy::Primary),
                offset: primary_offset,
                bytes: new_entry.clone(),
            },
            PendingWrite {
                target: WriteTarget::Entry(TableCopy::Secondary),
                offset: secondary_offset,
                bytes: new_entry.clone(),
            },
            PendingWrite {
                target: WriteTarget::HeaderChecksum(TableCopy::Secondary),
                offset: secondary_header.checksum_offset(),
                bytes: secondary.header_checksum.to_vec(),
            },
            PendingWrite {
                target: WriteTarget::TableChecksum(TableCopy::Secondary),
                offset: secondary_header.entries_checksum_offset(),
                bytes: secondary.entries_checksum.to_vec(),
            },
        ];

        Ok(Self {
            hide,
            unique_guid: record.unique_guid.clone(),
            new_entry,
            primary,
            secondary,
            writes,
        })
    }

    /// Issue the writes in order, then flush
    ///
    /// Stops at the first failed write; earlier writes are not undone.
    pub fn apply(&self, device: &mut dyn ReadWriteSeek) -> Result<()> {
        for write in &self.writes {
            tracing::debug!("{:?} -> offset {}", write.target, write.offset);
            write_region(device, write.offset, &write.bytes)?;
        }
        device.flush()?;

        tracing::info!(
            "partition {} {}",
            self.unique_guid,
            if self.hide { "hidden" } else { "unhidden" }
        );

        Ok(())
    }
}

/// Build and apply a hide (`hide = true`) or unhide (`hide = false`)
pub fn hide_partition(
    device: &mut dyn ReadWriteSeek,
    primary_header: &GptHeader,
    secondary_header: &GptHeader,
    record: &PartitionRecord,
    hide: bool,
) -> Result<VeilPlan> {
    let plan = VeilPlan::build(primary_header, secondary_header, record, hide)?;
    plan.apply(device)?;
    Ok(plan)
}

/// Swap the head and tail GUID pairs of an entry
///
/// Hiding puts zeros in the head; unhiding puts the stashed tail pair there.
/// Either way the old head pair lands in the tail.
fn rewrite_entry(block: &[u8], hide: bool) -> Vec<u8> {
    let len = block.len();
    let head = &block[..GUID_PAIR_LEN];
    let tail = &block[len - GUID_PAIR_LEN..];

    let mut entry = Vec::with_capacity(len);
    if hide {
        entry.extend_from_slice(&[0u8; GUID_PAIR_LEN]);
    } else {
        entry.extend_from_slice(tail);
    }
    entry.extend_from_slice(&block[GUID_PAIR_LEN..len - GUID_PAIR_LEN]);
    entry.extend_from_slice(head);
    entry
}

/// Splice the new entry into a copy's table and recompute both checksums
fn copy_checksums(header: &GptHeader, entry_offset: u64, new_entry: &[u8]) -> Result<CopyChecksums> {
    let relative = entry_offset
        .checked_sub(header.partition_table_offset)
        .and_then(|r| usize::try_from(r).ok())
        .filter(|&r| r + new_entry.len() <= header.partition_table_raw.len())
        .ok_or_else(|| {
            Error::invalid_zone_table(format!(
                "entry offset {} is outside the {} partition table",
                entry_offset, header.copy
            ))
        })?;

    let mut table = header.partition_table_raw.clone();
    table[relative..relative + new_entry.len()].copy_from_slice(new_entry);
    let entries_checksum = checksum::table_checksum(&table);

    let new_header = header.with_entries_checksum(entries_checksum);
    let header_checksum = checksum::header_checksum(&new_header)?;

    Ok(CopyChecksums {
        entries_checksum,
        header_checksum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpt::scan_table;
    use crate::registry::PartitionRegistry;
    use crate::testutil::{
        build_disk, build_disk_with, hidden, linux_entry, read_headers, widen, TOTAL_SECTORS,
    };
    use std::io::Cursor;

    fn registry_for(disk: &[u8]) -> (GptHeader, GptHeader, PartitionRegistry) {
        let (primary, secondary) = read_headers(disk);
        let registry =
            PartitionRegistry::build(&scan_table(&primary, true), &scan_table(&secondary, true));
        (primary, secondary, registry)
    }

    #[test]
    fn test_rewrite_entry_hide() {
        let block = linux_entry(1, "root");
        let hidden_block = rewrite_entry(&block, true);

        assert_eq!(hidden_block.len(), 128);
        assert!(hidden_block[..32].iter().all(|&b| b == 0));
        assert_eq!(&hidden_block[32..96], &block[32..96]);
        assert_eq!(&hidden_block[96..], &block[..32]);
        assert_eq!(hidden_block, hidden(&block));
    }

    #[test]
    fn test_rewrite_entry_round_trip() {
        let block = linux_entry(1, "root");
        assert_eq!(rewrite_entry(&rewrite_entry(&block, true), false), block);
    }

    #[test]
    fn test_hide_plan_write_order() {
        let disk = build_disk(TOTAL_SECTORS, &[(2, linux_entry(1, "root"))], true);
        let (primary, secondary, registry) = registry_for(&disk);
        let record = &registry.records()[0];

        let plan = VeilPlan::build(&primary, &secondary, record, true).unwrap();

        let targets: Vec<WriteTarget> = plan.writes.iter().map(|w| w.target).collect();
        assert_eq!(
            targets,
            vec![
                WriteTarget::HeaderChecksum(TableCopy::Primary),
                WriteTarget::TableChecksum(TableCopy::Primary),
                WriteTarget::Entry(TableCopy::Primary),
                WriteTarget::Entry(TableCopy::Secondary),
                WriteTarget::HeaderChecksum(TableCopy::Secondary),
                WriteTarget::TableChecksum(TableCopy::Secondary),
            ]
        );

        let offsets: Vec<u64> = plan.writes.iter().map(|w| w.offset).collect();
        let secondary_header = (TOTAL_SECTORS - 1) * 512;
        assert_eq!(
            offsets,
            vec![
                512 + 0x10,
                512 + 0x58,
                1024 + 2 * 128,
                (TOTAL_SECTORS - 33) * 512 + 2 * 128,
                secondary_header + 0x10,
                secondary_header + 0x58,
            ]
        );

        // Identical tables yield the same entry array checksum for both copies
        assert_eq!(plan.primary.entries_checksum, plan.secondary.entries_checksum);
        assert_ne!(plan.primary.header_checksum, plan.secondary.header_checksum);
    }

    #[test]
    fn test_hide_then_unhide_restores_disk() {
        let original = build_disk(
            TOTAL_SECTORS,
            &[(0, linux_entry(1, "boot")), (1, linux_entry(2, "root"))],
            true,
        );
        let mut device = Cursor::new(original.clone());

        let (primary, secondary, registry) = registry_for(device.get_ref());
        let target = registry.records()[1].clone();
        hide_partition(&mut device, &primary, &secondary, &target, true).unwrap();

        // The hidden disk is internally consistent and the entry is invisible
        let (primary, secondary, registry) = registry_for(device.get_ref());
        assert!(primary.verify_header_checksum());
        assert!(primary.verify_entries_checksum());
        assert!(secondary.verify_header_checksum());
        assert!(secondary.verify_entries_checksum());
        assert_eq!(scan_table(&primary, false).len(), 1);
        assert_eq!(scan_table(&secondary, false).len(), 1);

        let hidden_record = registry.get(&target.unique_guid).unwrap().clone();
        assert!(hidden_record.is_secret);
        assert!(hidden_record.is_complete());
        assert_eq!(hidden_record.type_guid, target.type_guid);

        hide_partition(&mut device, &primary, &secondary, &hidden_record, false).unwrap();

        assert_eq!(device.into_inner(), original);
    }

    #[test]
    fn test_hide_checksums_match_reread_headers() {
        let disk = build_disk(TOTAL_SECTORS, &[(0, linux_entry(1, "root"))], true);
        let mut device = Cursor::new(disk);

        let (primary, secondary, registry) = registry_for(device.get_ref());
        let plan =
            hide_partition(&mut device, &primary, &secondary, &registry.records()[0], true).unwrap();

        let (primary, secondary) = read_headers(device.get_ref());
        assert_eq!(primary.checksum, plan.primary.header_checksum);
        assert_eq!(primary.entries_checksum, plan.primary.entries_checksum);
        assert_eq!(secondary.checksum, plan.secondary.header_checksum);
        assert_eq!(secondary.entries_checksum, plan.secondary.entries_checksum);
    }

    #[test]
    fn test_hide_already_secret_is_ambiguous() {
        let disk = build_disk(TOTAL_SECTORS, &[(0, hidden(&linux_entry(1, "root")))], true);
        let (primary, secondary, registry) = registry_for(&disk);

        let result = VeilPlan::build(&primary, &secondary, &registry.records()[0], true);
        assert!(matches!(result, Err(Error::AmbiguousState(_))));
    }

    #[test]
    fn test_unhide_not_secret_is_ambiguous() {
        let disk = build_disk(TOTAL_SECTORS, &[(0, linux_entry(1, "root"))], true);
        let (primary, secondary, registry) = registry_for(&disk);

        let result = VeilPlan::build(&primary, &secondary, &registry.records()[0], false);
        assert!(matches!(result, Err(Error::AmbiguousState(_))));
    }

    #[test]
    fn test_one_sided_record_is_ambiguous() {
        let disk = build_disk(TOTAL_SECTORS, &[(0, linux_entry(1, "root"))], true);
        let (primary, secondary) = read_headers(&disk);
        let registry = PartitionRegistry::build(&scan_table(&primary, true), &[]);

        let result = VeilPlan::build(&primary, &secondary, &registry.records()[0], true);
        assert!(matches!(result, Err(Error::AmbiguousState(_))));
    }

    #[test]
    fn test_failed_precondition_writes_nothing() {
        let disk = build_disk(TOTAL_SECTORS, &[(0, linux_entry(1, "root"))], true);
        let mut device = Cursor::new(disk.clone());
        let (primary, secondary, registry) = registry_for(&disk);

        let result = hide_partition(&mut device, &primary, &secondary, &registry.records()[0], false);
        assert!(result.is_err());
        assert_eq!(device.into_inner(), disk);
    }

    #[test]
    fn test_offset_outside_table_rejected() {
        let disk = build_disk(TOTAL_SECTORS, &[(0, linux_entry(1, "root"))], true);
        let (primary, secondary, registry) = registry_for(&disk);
        let mut record = registry.records()[0].clone();
        record.secondary_offset = Some(0);

        let result = VeilPlan::build(&primary, &secondary, &record, true);
        assert!(matches!(result, Err(Error::InvalidZoneTable(_))));
    }

    #[test]
    fn test_hide_then_unhide_with_256_byte_entries() {
        let entries = vec![
            (0, widen(&linux_entry(1, "boot"), 256)),
            (3, widen(&linux_entry(2, "data"), 256)),
        ];
        let original = build_disk_with(TOTAL_SECTORS, 256, &entries, Some(entries.as_slice()));
        let mut device = Cursor::new(original.clone());

        let (primary, secondary, registry) = registry_for(device.get_ref());
        assert_eq!(primary.entry_size, 256);
        let target = registry.records()[1].clone();
        assert_eq!(target.primary_offset, Some(1024 + 3 * 256));

        let plan = hide_partition(&mut device, &primary, &secondary, &target, true).unwrap();
        assert_eq!(plan.new_entry.len(), 256);
        assert!(plan.new_entry[..32].iter().all(|&b| b == 0));
        assert_eq!(&plan.new_entry[224..], &entries[1].1[..32]);

        let (primary, secondary, registry) = registry_for(device.get_ref());
        assert!(primary.report().is_consistent());
        assert!(secondary.report().is_consistent());
        let hidden_record = registry.get(&target.unique_guid).unwrap().clone();
        assert!(hidden_record.is_secret);
        assert_eq!(hidden_record.name(), "data");

        hide_partition(&mut device, &primary, &secondary, &hidden_record, false).unwrap();
        assert_eq!(device.into_inner(), original);
    }

    #[test]
    fn test_hide_entry_in_different_secondary_slot() {
        let primary_entries = vec![(1, linux_entry(1, "data"))];
        let secondary_entries = vec![(4, linux_entry(1, "data"))];
        let original = build_disk_with(
            TOTAL_SECTORS,
            128,
            &primary_entries,
            Some(secondary_entries.as_slice()),
        );
        let mut device = Cursor::new(original.clone());

        let (primary, secondary, registry) = registry_for(device.get_ref());
        let target = registry.records()[0].clone();
        let secondary_base = (TOTAL_SECTORS - 33) * 512;
        assert_eq!(target.secondary_offset, Some(secondary_base + 4 * 128));

        let plan = hide_partition(&mut device, &primary, &secondary, &target, true).unwrap();
        assert_ne!(plan.primary.entries_checksum, plan.secondary.entries_checksum);

        let (primary, secondary, registry) = registry_for(device.get_ref());
        assert!(primary.verify_entries_checksum());
        assert!(secondary.verify_entries_checksum());
        assert!(primary.verify_header_checksum());
        assert!(secondary.verify_header_checksum());
        let disk = device.get_ref();
        let slot = (secondary_base + 4 * 128) as usize;
        assert_eq!(&disk[slot..slot + 128], &plan.new_entry[..]);

        let hidden_record = registry.get(&target.unique_guid).unwrap().clone();
        hide_partition(&mut device, &primary, &secondary, &hidden_record, false).unwrap();
        assert_eq!(device.into_inner(), original);
    }
}
