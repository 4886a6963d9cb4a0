//! Path-level operations
//!
//! Each call opens the device, performs one sequence of positioned reads or
//! writes, and closes it before returning.

use gptveil_core::{DiskGeometry, Error, Result, TableCopy};
use gptveil_pipeline::{DeviceAccess, DevicePipeline};
use std::path::Path;

use crate::gpt::{self, scan_table, GptHeader, GptPartitionEntry};
use crate::mbr::ProtectiveMbr;
use crate::registry::{PartitionRecord, PartitionRegistry};
use crate::veil::VeilPlan;

/// Scan settings
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Also recover partitions hidden in the trailing 32 bytes of empty slots
    pub secret_search: bool,
}

impl ScanOptions {
    /// Options with secret search turned on
    pub fn with_secret_search() -> Self {
        Self {
            secret_search: true,
        }
    }
}

/// Read and verify the protective MBR of a device
pub fn read_protective_mbr(path: &Path) -> Result<ProtectiveMbr> {
    let mut device = DevicePipeline::open(path, DeviceAccess::ReadOnly)?;
    let mbr = ProtectiveMbr::parse(&mut device)?;

    let length = device.length()?;
    let geometry = mbr.geometry();
    if length < geometry.byte_len() {
        tracing::warn!(
            "{} is {} bytes but its protective MBR describes {}",
            device.path(),
            length,
            geometry
        );
    }

    Ok(mbr)
}

/// Verify that a device carries a protective MBR and return its geometry
///
/// # Errors
///
/// Returns `DeviceNotFound` if the path does not exist and `NotGpt` if any
/// protective MBR check fails.
pub fn verify(path: &Path) -> Result<DiskGeometry> {
    Ok(read_protective_mbr(path)?.geometry())
}

/// Read one GPT header and its entry array from a device
pub fn read_header(path: &Path, geometry: &DiskGeometry, copy: TableCopy) -> Result<GptHeader> {
    let mut device = DevicePipeline::open(path, DeviceAccess::ReadOnly)?;
    gpt::read_header(&mut device, geometry, copy)
}

/// Merge primary and secondary scans into a registry
pub fn build_registry(
    primary: &[GptPartitionEntry],
    secondary: &[GptPartitionEntry],
) -> PartitionRegistry {
    PartitionRegistry::build(primary, secondary)
}

/// Hide (`hide = true`) or unhide (`hide = false`) a partition on a device
///
/// The headers and record must come from a scan of the same device with
/// secret search on. Nothing is written if a precondition fails.
///
/// # Errors
///
/// Returns `AmbiguousState` if the record is not in both tables or is already
/// in the requested state, and `Io` if a write fails. A write failure after
/// earlier writes succeeded leaves the two copies inconsistent.
pub fn hide(
    path: &Path,
    primary: &GptHeader,
    secondary: &GptHeader,
    record: &PartitionRecord,
    hide: bool,
) -> Result<VeilPlan> {
    // Check preconditions before the device is opened for writing
    let plan = VeilPlan::build(primary, secondary, record, hide)?;

    let mut device = DevicePipeline::open(path, DeviceAccess::ReadWrite)?;
    plan.apply(&mut device)?;
    device.sync()?;

    Ok(plan)
}

/// Everything read from a device in one inspection pass
#[derive(Debug, Clone)]
pub struct DiskInspection {
    pub mbr: ProtectiveMbr,
    pub primary: GptHeader,
    /// `None` if the secondary copy could not be read
    pub secondary: Option<GptHeader>,
    pub registry: PartitionRegistry,
}

impl DiskInspection {
    pub fn geometry(&self) -> DiskGeometry {
        self.mbr.geometry()
    }

    /// Both headers, as needed for hide/unhide
    pub fn headers(&self) -> Result<(&GptHeader, &GptHeader)> {
        let secondary = self.secondary.as_ref().ok_or_else(|| {
            Error::ambiguous_state("the secondary GPT copy could not be read")
        })?;
        Ok((&self.primary, secondary))
    }

    /// Hide or unhide a partition found by this inspection
    pub fn hide(&self, path: &Path, unique_guid: &str, hide: bool) -> Result<VeilPlan> {
        let (primary, secondary) = self.headers()?;
        let record = self.record(unique_guid)?;
        self::hide(path, primary, secondary, record, hide)
    }

    /// Look up a record, failing if it is unknown
    pub fn record(&self, unique_guid: &str) -> Result<&PartitionRecord> {
        self.registry.get(unique_guid).ok_or_else(|| {
            Error::ambiguous_state(format!("no partition with unique GUID {}", unique_guid))
        })
    }
}

/// Verify a device, read both GPT copies, scan them and merge the results
///
/// A primary copy that cannot be read is an error. A secondary copy that
/// cannot be read is logged and left out, so primary-only images can still be
/// listed.
pub fn inspect(path: &Path, options: &ScanOptions) -> Result<DiskInspection> {
    let mut device = DevicePipeline::open(path, DeviceAccess::ReadOnly)?;
    let mbr = ProtectiveMbr::parse(&mut device)?;
    let geometry = mbr.geometry();

    let primary = gpt::read_header(&mut device, &geometry, TableCopy::Primary)?;
    let secondary = match gpt::read_header(&mut device, &geometry, TableCopy::Secondary) {
        Ok(header) => Some(header),
        Err(e) => {
            tracing::warn!("secondary GPT copy unreadable: {}", e);
            None
        }
    };

    let primary_entries = scan_table(&primary, options.secret_search);
    let secondary_entries = secondary
        .as_ref()
        .map(|header| scan_table(header, options.secret_search))
        .unwrap_or_default();
    let registry = build_registry(&primary_entries, &secondary_entries);

    tracing::info!(
        "{}: {} partitions ({} primary, {} secondary entries)",
        device.path(),
        registry.len(),
        primary_entries.len(),
        secondary_entries.len()
    );

    Ok(DiskInspection {
        mbr,
        primary,
        secondary,
        registry,
    })
}
