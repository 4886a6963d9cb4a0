//! Partition registry - primary and secondary scans merged by unique GUID

use gptveil_core::TableCopy;
use serde::Serialize;
use std::collections::HashMap;

use crate::gpt::entry::{parse_name, GptPartitionEntry};
use crate::gpt::types::classify;

/// One partition as seen across both GPT copies
#[derive(Debug, Clone, Serialize)]
pub struct PartitionRecord {
    /// Partition type GUID from the first copy it was seen in
    pub type_guid: String,
    /// Unique partition GUID (uppercase), the registry key
    pub unique_guid: String,
    /// The entry as stored in the primary table
    #[serde(serialize_with = "crate::hex_bytes_opt")]
    pub primary_block: Option<Vec<u8>>,
    /// Absolute byte offset of the primary entry
    pub primary_offset: Option<u64>,
    /// The entry as stored in the secondary table
    #[serde(serialize_with = "crate::hex_bytes_opt")]
    pub secondary_block: Option<Vec<u8>>,
    /// Absolute byte offset of the secondary entry
    pub secondary_offset: Option<u64>,
    /// Whether any copy held this partition hidden
    pub is_secret: bool,
}

impl PartitionRecord {
    fn from_entry(entry: &GptPartitionEntry) -> Self {
        Self {
            type_guid: entry.type_guid.clone(),
            unique_guid: entry.unique_guid.to_ascii_uppercase(),
            primary_block: None,
            primary_offset: None,
            secondary_block: None,
            secondary_offset: None,
            is_secret: false,
        }
    }

    /// Both table copies hold this partition
    pub fn is_complete(&self) -> bool {
        self.primary_block.is_some() && self.secondary_block.is_some()
    }

    /// The stored entry for one copy
    pub fn block(&self, copy: TableCopy) -> Option<&[u8]> {
        match copy {
            TableCopy::Primary => self.primary_block.as_deref(),
            TableCopy::Secondary => self.secondary_block.as_deref(),
        }
    }

    /// The absolute entry offset for one copy
    pub fn offset(&self, copy: TableCopy) -> Option<u64> {
        match copy {
            TableCopy::Primary => self.primary_offset,
            TableCopy::Secondary => self.secondary_offset,
        }
    }

    /// Type name from the well-known type table
    pub fn type_name(&self) -> &'static str {
        classify(&self.type_guid)
    }

    /// First and last LBA, from the primary entry if present
    pub fn lba_range(&self) -> Option<(u64, u64)> {
        let block = self.preferred_block()?;
        Some((read_u64(block, 0x20), read_u64(block, 0x28)))
    }

    /// Size of the partition in LBA sectors
    pub fn size_lba(&self) -> u64 {
        match self.lba_range() {
            Some((first, last)) if last >= first => last - first + 1,
            _ => 0,
        }
    }

    /// Partition name, from the primary entry if present
    pub fn name(&self) -> String {
        self.preferred_block()
            .and_then(|block| block.get(0x38..GptPartitionEntry::ENTRY_SIZE))
            .map(parse_name)
            .unwrap_or_default()
    }

    fn preferred_block(&self) -> Option<&[u8]> {
        self.block(TableCopy::Primary)
            .or_else(|| self.block(TableCopy::Secondary))
    }

    fn attach(&mut self, entry: &GptPartitionEntry, copy: TableCopy) {
        match copy {
            TableCopy::Primary => {
                self.primary_block = Some(entry.raw_block.clone());
                self.primary_offset = Some(entry.table_offset);
            }
            TableCopy::Secondary => {
                self.secondary_block = Some(entry.raw_block.clone());
                self.secondary_offset = Some(entry.table_offset);
            }
        }
        if entry.is_secret {
            self.is_secret = true;
        }
    }
}

/// A unique GUID seen with different type GUIDs in the two copies
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeConflict {
    pub unique_guid: String,
    /// The type the registry kept (first sighting)
    pub kept_type_guid: String,
    /// The type seen later and ignored
    pub other_type_guid: String,
    /// The copy the ignored type came from
    pub other_copy: TableCopy,
}

/// All partitions found on a disk, keyed by uppercase unique GUID
///
/// Records are kept in first-sighting order. A partition found in only one
/// copy keeps a one-sided record. The type GUID of a record is never
/// overwritten by a later sighting; disagreements are collected as
/// [`TypeConflict`]s instead.
#[derive(Debug, Clone, Default)]
pub struct PartitionRegistry {
    records: Vec<PartitionRecord>,
    index: HashMap<String, usize>,
    conflicts: Vec<TypeConflict>,
}

impl PartitionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the primary and secondary scans of one disk
    pub fn build(primary: &[GptPartitionEntry], secondary: &[GptPartitionEntry]) -> Self {
        let mut registry = Self::new();
        registry.merge(primary, TableCopy::Primary);
        registry.merge(secondary, TableCopy::Secondary);
        registry
    }

    /// Merge one scan into the registry
    pub fn merge(&mut self, entries: &[GptPartitionEntry], copy: TableCopy) {
        for entry in entries {
            self.insert(entry, copy);
        }
    }

    /// Record one sighting of a partition in the given copy
    pub fn insert(&mut self, entry: &GptPartitionEntry, copy: TableCopy) {
        let key = entry.unique_guid.to_ascii_uppercase();

        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                self.records.push(PartitionRecord::from_entry(entry));
                self.index.insert(key, self.records.len() - 1);
                self.records.len() - 1
            }
        };

        let record = &mut self.records[position];
        if !record.type_guid.eq_ignore_ascii_case(&entry.type_guid) {
            tracing::warn!(
                "partition {} has type {} but the {} table says {}; keeping {}",
                record.unique_guid,
                record.type_guid,
                copy,
                entry.type_guid,
                record.type_guid
            );
            self.conflicts.push(TypeConflict {
                unique_guid: record.unique_guid.clone(),
                kept_type_guid: record.type_guid.clone(),
                other_type_guid: entry.type_guid.clone(),
                other_copy: copy,
            });
        }

        record.attach(entry, copy);
    }

    /// Look up a partition by unique GUID (any case)
    pub fn get(&self, unique_guid: &str) -> Option<&PartitionRecord> {
        self.index
            .get(&unique_guid.trim().to_ascii_uppercase())
            .map(|&position| &self.records[position])
    }

    /// All records in first-sighting order
    pub fn records(&self) -> &[PartitionRecord] {
        &self.records
    }

    /// Iterate over records in first-sighting order
    pub fn iter(&self) -> impl Iterator<Item = &PartitionRecord> {
        self.records.iter()
    }

    /// Type GUID disagreements found while merging
    pub fn conflicts(&self) -> &[TypeConflict] {
        &self.conflicts
    }

    /// Number of distinct partitions
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no partitions were found
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    bytes
        .get(offset..offset + 8)
        .and_then(|field| field.try_into().ok())
        .map(u64::from_le_bytes)
        .unwrap_or(0)
}
