//! # gptveil Core
//!
//! Core traits, types, and error handling shared by the gptveil crates.
//!
//! This crate provides the foundational pieces for working with GPT disks:
//! - **Error**: the error type every gptveil operation reports
//! - **DiskGeometry**: sector size and sector count derived from the protective MBR
//! - **TableCopy**: which of the two GPT copies (primary or secondary) a structure came from
//! - **ReadSeek / ReadWriteSeek**: object-safe stream traits used for device access
//!
//! ## Example
//!
//! ```rust
//! use gptveil_core::{DiskGeometry, TableCopy};
//!
//! let geometry = DiskGeometry::new(2048);
//! assert_eq!(geometry.header_offset(TableCopy::Primary), 512);
//! assert_eq!(geometry.header_offset(TableCopy::Secondary), 2047 * 512);
//! ```

pub mod error;
pub mod security;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use error::{Error, Result};
pub use security::*;
pub use traits::{ReadSeek, ReadWriteSeek};
pub use types::{DiskGeometry, TableCopy, LBA_SIZE};
