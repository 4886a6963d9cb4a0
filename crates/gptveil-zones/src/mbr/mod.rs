//! Protective MBR verification
//!
//! A GPT disk carries a legacy MBR in sector 0 whose only job is to keep
//! MBR-only tools away from the disk. It has exactly one record, of type
//! `0xEE`, spanning the whole disk from LBA 1.

pub mod types;

use gptveil_core::{DiskGeometry, Error, ReadSeek, Result};
use gptveil_pipeline::read_region;
use serde::Serialize;
use types::{MbrPartitionType, MbrRecord};

/// Number of partition records in the MBR
pub const NUM_PARTITIONS: usize = 4;

/// A verified protective MBR
///
/// # Structure
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0x000   446   Bootstrap code
/// 0x1BE   16    Partition record 0 (type 0xEE, must be present)
/// 0x1CE   16    Partition record 1 (must be zero)
/// 0x1DE   16    Partition record 2 (must be zero)
/// 0x1EE   16    Partition record 3 (must be zero)
/// 0x1FE   2     Boot signature (55 AA)
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ProtectiveMbr {
    records: [MbrRecord; NUM_PARTITIONS],
    geometry: DiskGeometry,
}

impl ProtectiveMbr {
    /// The boot signature bytes that must be present at offset 0x1FE
    pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];

    /// Size of the MBR in bytes (always 512)
    pub const MBR_SIZE: usize = 512;

    /// Offset of the first partition record
    pub const PARTITION_TABLE_OFFSET: usize = 0x1BE;

    /// Offset of the boot signature
    pub const BOOT_SIGNATURE_OFFSET: usize = 0x1FE;


    /// Read sector 0 from `stream` and verify it
    ///
    /// # Errors
    ///
    /// Returns `Io` if sector 0 cannot be read and `NotGpt` if any protective
    /// MBR check fails.
    pub fn parse(stream: &mut dyn ReadSeek) -> Result<Self> {
        let sector = read_region(stream, 0, Self::MBR_SIZE)?;
        Self::from_sector(&sector)
    }

    /// Verify a raw sector 0
    ///
    /// Checks, in order: boot signature, record 0 present, records 1-3 empty,
    /// record 0 type `0xEE`, and a sector count large enough to hold both GPT
    /// copies. No upper bound is placed on the sector count.
    pub fn from_sector(sector: &[u8]) -> Result<Self> {
        if sector.len() < Self::MBR_SIZE {
            return Err(Error::not_gpt(format!(
                "sector 0 is {} bytes, expected {}",
                sector.len(),
                Self::MBR_SIZE
            )));
        }

        let signature = &sector[Self::BOOT_SIGNATURE_OFFSET..Self::BOOT_SIGNATURE_OFFSET + 2];
        if signature != &Self::BOOT_SIGNATURE[..] {
            return Err(Error::not_gpt(format!(
                "MBR boot signature not found: got {:02X} {:02X}",
                signature[0], signature[1]
            )));
        }

        let mut records = [MbrRecord::from_bytes(&[0u8; MbrRecord::SIZE]); NUM_PARTITIONS];
        for (i, record) in records.iter_mut().enumerate() {
            let offset = Self::PARTITION_TABLE_OFFSET + i * MbrRecord::SIZE;
            let mut bytes = [0u8; MbrRecord::SIZE];
            bytes.copy_from_slice(&sector[offset..offset + MbrRecord::SIZE]);
            *record = MbrRecord::from_bytes(&bytes);
        }

        if records[0].is_empty() {
            return Err(Error::not_gpt("MBR partition record 0 is empty"));
        }

        if let Some(i) = records[1..].iter().position(|r| !r.is_empty()) {
            return Err(Error::not_gpt(format!(
                "MBR partition record {} is in use alongside the protective record",
                i + 1
            )));
        }

        if records[0].partition_type != MbrPartitionType::GptProtective {
            return Err(Error::not_gpt(format!(
                "MBR partition record 0 has type 0x{:02X}, expected 0xEE",
                records[0].partition_type.to_byte()
            )));
        }

        let total_sectors = records[0].lba_size as u64 + 1;
        if total_sectors <= DiskGeometry::MIN_SECTORS {
            return Err(Error::not_gpt(format!(
                "protective record spans {} sectors, too small for GPT",
                total_sectors
            )));
        }

        let geometry = DiskGeometry::new(total_sectors);
        tracing::info!("protective MBR found: {}", geometry);

        Ok(Self { records, geometry })
    }

    /// The disk geometry implied by the protective record
    pub fn geometry(&self) -> DiskGeometry {
        self.geometry
    }

    /// All four partition records
    pub fn records(&self) -> &[MbrRecord; NUM_PARTITIONS] {
        &self.records
    }

    /// The protective (`0xEE`) record
    pub fn protective_record(&self) -> &MbrRecord {
        &self.records[0]
    }
}
