//! Core types shared across gptveil

use serde::Serialize;
use std::fmt;

/// Bytes per logical block. GPT handling here is fixed to 512-byte sectors.
pub const LBA_SIZE: u32 = 512;

/// Disk geometry derived from the protective MBR
///
/// `total_sectors` is the protective record's size field plus one (the record
/// starts at LBA 1 and spans the rest of the disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiskGeometry {
    /// Bytes per logical block (always [`LBA_SIZE`])
    pub lba_size: u32,

    /// Number of addressable sectors on the disk
    pub total_sectors: u64,
}

impl DiskGeometry {
    /// Sectors needed at each end of the disk: one header plus a 32-sector entry array
    pub const MIN_SECTORS: u64 = 33;

    /// Create a geometry with the fixed 512-byte block size
    pub fn new(total_sectors: u64) -> Self {
        Self {
            lba_size: LBA_SIZE,
            total_sectors,
        }
    }

    /// Index of the last sector on the disk
    pub fn last_lba(&self) -> u64 {
        self.total_sectors.saturating_sub(1)
    }

    /// Total size of the disk in bytes
    pub fn byte_len(&self) -> u64 {
        self.total_sectors * self.lba_size as u64
    }

    /// Byte offset of the GPT header for the given copy
    pub fn header_offset(&self, copy: TableCopy) -> u64 {
        match copy {
            TableCopy::Primary => self.lba_size as u64,
            TableCopy::Secondary => self.last_lba() * self.lba_size as u64,
        }
    }

    /// Byte offset of the partition entry array for the given copy
    ///
    /// The primary array starts right after the primary header (LBA 2). The
    /// secondary array occupies the `table_sectors` sectors immediately before
    /// the secondary header.
    pub fn table_offset(&self, copy: TableCopy, table_sectors: u64) -> u64 {
        match copy {
            TableCopy::Primary => 2 * self.lba_size as u64,
            TableCopy::Secondary => self
                .header_offset(TableCopy::Secondary)
                .saturating_sub(table_sectors * self.lba_size as u64),
        }
    }
}

impl fmt::Display for DiskGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sectors x {} bytes ({} bytes)",
            self.total_sectors,
            self.lba_size,
            self.byte_len()
        )
    }
}

/// Which of the two GPT copies a header or table was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableCopy {
    /// Header at LBA 1, entries from LBA 2
    Primary,
    /// Header at the last LBA, entries just before it
    Secondary,
}

impl fmt::Display for TableCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableCopy::Primary => write!(f, "primary"),
            TableCopy::Secondary => write!(f, "secondary"),
        }
    }
}
