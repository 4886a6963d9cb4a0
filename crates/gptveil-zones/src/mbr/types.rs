//! MBR partition record types

use serde::Serialize;
use std::fmt;

/// MBR partition type codes
///
/// Only the codes that matter when telling a protective MBR apart from a
/// legacy one are named; everything else is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MbrPartitionType {
    /// Empty/unused partition entry
    Empty,
    /// NTFS/exFAT/HPFS
    Ntfs,
    /// FAT32, LBA
    Fat32Lba,
    /// Linux native (ext2/ext3/ext4)
    LinuxNative,
    /// GPT protective MBR
    GptProtective,
    /// EFI system partition
    EfiSystem,
    /// Unknown partition type
    Unknown(u8),
}

impl MbrPartitionType {
    /// Create a partition type from a byte value
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Self::Empty,
            0x07 => Self::Ntfs,
            0x0C => Self::Fat32Lba,
            0x83 => Self::LinuxNative,
            0xEE => Self::GptProtective,
            0xEF => Self::EfiSystem,
            _ => Self::Unknown(b),
        }
    }

    /// Get the byte value of this partition type
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Empty => 0x00,
            Self::Ntfs => 0x07,
            Self::Fat32Lba => 0x0C,
            Self::LinuxNative => 0x83,
            Self::GptProtective => 0xEE,
            Self::EfiSystem => 0xEF,
            Self::Unknown(b) => b,
        }
    }

    /// Get a human-readable name for this partition type
    pub fn name(&self) -> &str {
        match self {
            Self::Empty => "Empty",
            Self::Ntfs => "NTFS/exFAT",
            Self::Fat32Lba => "FAT32 (LBA)",
            Self::LinuxNative => "Linux",
            Self::GptProtective => "GPT Protective",
            Self::EfiSystem => "EFI System",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for MbrPartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.to_byte())
    }
}

/// One 16-byte MBR partition record
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0x00    1     Status
/// 0x01    3     CHS start
/// 0x04    1     Partition type
/// 0x05    3     CHS end
/// 0x08    4     LBA start
/// 0x0C    4     LBA size (sectors)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MbrRecord {
    /// The record exactly as stored
    #[serde(serialize_with = "crate::hex_bytes")]
    pub raw: [u8; 16],
    /// Boot indicator
    pub status: u8,
    /// Partition type
    pub partition_type: MbrPartitionType,
    /// First sector of the partition
    pub lba_start: u32,
    /// Length of the partition in sectors
    pub lba_size: u32,
}

impl MbrRecord {
    /// Size of a partition record in bytes
    pub const SIZE: usize = 16;

    /// Parse a record from its 16 bytes
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            raw: *bytes,
            status: bytes[0],
            partition_type: MbrPartitionType::from_byte(bytes[4]),
            lba_start: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            lba_size: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        }
    }

    /// A record is empty only when every byte is zero
    pub fn is_empty(&self) -> bool {
        self.raw.iter().all(|&b| b == 0)
    }
}

impl fmt::Display for MbrRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} status=0x{:02X} start={} size={}",
            self.partition_type, self.status, self.lba_start, self.lba_size
        )
    }
}
