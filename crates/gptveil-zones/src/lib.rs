//! # gptveil Zones
//!
//! GPT inspection and partition hiding.
//!
//! This crate provides:
//! - **MBR**: protective MBR verification and disk geometry
//! - **GPT**: header decoding, entry array scanning, type classification
//! - **Registry**: primary and secondary scans merged by unique GUID
//! - **Veil**: checksum-consistent hide/unhide of a partition entry
//!
//! ## Example
//!
//! ```rust,no_run
//! use gptveil_zones::{inspect, ScanOptions};
//! use std::path::Path;
//!
//! let disk = Path::new("/dev/sdb");
//! let inspection = inspect(disk, &ScanOptions::with_secret_search()).unwrap();
//!
//! for record in inspection.registry.iter() {
//!     println!("{} {} {}", record.unique_guid, record.type_name(), record.is_secret);
//! }
//! ```

pub mod checksum;
pub mod disk;
pub mod gpt;
pub mod guid;
pub mod mbr;
pub mod registry;
pub mod veil;

#[cfg(test)]
pub(crate) mod testutil;

pub use disk::{
    build_registry, hide, inspect, read_header, read_protective_mbr, verify, DiskInspection,
    ScanOptions,
};
pub use gpt::{classify, scan_table, GptHeader, GptPartitionEntry, HeaderReport};
pub use mbr::ProtectiveMbr;
pub use registry::{PartitionRecord, PartitionRegistry, TypeConflict};
pub use veil::{hide_partition, PendingWrite, VeilPlan, WriteTarget};

use serde::Serializer;

/// Serialize raw bytes as lowercase hex
pub(crate) fn hex_bytes<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<[u8]>,
{
    serializer.serialize_str(&hex::encode(bytes))
}

/// Serialize optional raw bytes as lowercase hex or null
pub(crate) fn hex_bytes_opt<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match bytes {
        Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
        None => serializer.serialize_none(),
    }
}
