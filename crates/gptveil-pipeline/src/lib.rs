//! # gptveil Pipeline
//!
//! Device access for gptveil.
//!
//! This crate provides:
//! - **DevicePipeline**: a block device or image file opened by path, read-only
//!   or read-write, exposing `Read + Write + Seek`
//! - **Positioned I/O**: `read_region` / `write_region` helpers that seek to an
//!   absolute byte offset before every transfer
//!
//! ## Example
//!
//! ```rust,no_run
//! use gptveil_pipeline::{DeviceAccess, DevicePipeline};
//! use std::path::Path;
//!
//! let mut device = DevicePipeline::open(Path::new("/dev/sdb"), DeviceAccess::ReadOnly).unwrap();
//! let mbr = device.read_at(0, 512).unwrap();
//! assert_eq!(mbr.len(), 512);
//! ```

pub mod device;
pub mod positioned;

pub use device::{DeviceAccess, DevicePipeline};
pub use positioned::{read_region, write_region};
