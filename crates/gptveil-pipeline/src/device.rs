//! Device pipeline - a block device or image file opened by path

use gptveil_core::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::positioned::{read_region, write_region};

/// How a device is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceAccess {
    /// Inspection only
    #[default]
    ReadOnly,
    /// Required for hide/unhide
    ReadWrite,
}

/// A device (or disk image) opened for one sequence of positioned transfers
///
/// The handle is closed when the pipeline is dropped. Exclusive access to the
/// device for the lifetime of the pipeline is the caller's responsibility.
///
/// # Example
///
/// ```rust,no_run
/// use gptveil_pipeline::{DeviceAccess, DevicePipeline};
/// use std::path::Path;
///
/// let mut device = DevicePipeline::open(Path::new("disk.img"), DeviceAccess::ReadWrite).unwrap();
/// device.write_at(0x1FE, &[0x55, 0xAA]).unwrap();
/// device.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct DevicePipeline {
    file: File,
    path: String,
    access: DeviceAccess,
}

impl DevicePipeline {
    /// Open a device by path
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` if the path does not exist, `PermissionDenied`
    /// if it cannot be opened with the requested access, and `Io` otherwise.
    pub fn open(path: &Path, access: DeviceAccess) -> Result<Self> {
        let path_str = path.display().to_string();

        let file = OpenOptions::new()
            .read(true)
            .write(access == DeviceAccess::ReadWrite)
            .create(false)
            .truncate(false)
            .append(false)
            .open(path)
            .map_err(|e| Error::from_open(e, &path_str))?;

        tracing::debug!("opened {} ({:?})", path_str, access);

        Ok(Self {
            file,
            path: path_str,
            access,
        })
    }

    /// The path this device was opened from
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The access mode this device was opened with
    pub fn access(&self) -> DeviceAccess {
        self.access
    }

    /// Size of the device in bytes
    ///
    /// Uses a seek to the end rather than file metadata, which reports zero
    /// for block devices.
    pub fn length(&mut self) -> Result<u64> {
        Ok(self.file.seek(SeekFrom::End(0))?)
    }

    /// Read exactly `len` bytes at absolute byte `offset`
    pub fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        read_region(&mut self.file, offset, len)
    }

    /// Write all of `bytes` at absolute byte `offset`
    pub fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        if self.access != DeviceAccess::ReadWrite {
            return Err(Error::permission_denied(format!(
                "{} was opened read-only",
                self.path
            )));
        }

        write_region(&mut self.file, offset, bytes)
    }

    /// Flush written data to the device
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

impl Read for DevicePipeline {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for DevicePipeline {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.access != DeviceAccess::ReadWrite {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "device was opened read-only",
            ));
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for DevicePipeline {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn temp_image(len: usize) -> NamedTempFile {
        let mut tmpfile = NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0u8..=255).cycle().take(len).collect();
        tmpfile.write_all(&data).unwrap();
        tmpfile.flush().unwrap();
        tmpfile
    }

    #[test]
    fn test_open_missing_device() {
        let result = DevicePipeline::open(Path::new("/nonexistent/disk.img"), DeviceAccess::ReadOnly);
        assert!(matches!(result, Err(Error::DeviceNotFound(_))));
    }

    #[test]
    fn test_read_at() {
        let tmpfile = temp_image(1024);
        let mut device = DevicePipeline::open(tmpfile.path(), DeviceAccess::ReadOnly).unwrap();

        assert_eq!(device.length().unwrap(), 1024);
        assert_eq!(device.read_at(10, 4).unwrap(), vec![10, 11, 12, 13]);
        assert_eq!(device.access(), DeviceAccess::ReadOnly);
    }

    #[test]
    fn test_open_records_path() {
        let tmpfile = temp_image(16);
        let device = DevicePipeline::open(tmpfile.path(), DeviceAccess::ReadWrite).unwrap();

        assert_eq!(device.path(), tmpfile.path().display().to_string());
        assert_eq!(device.access(), DeviceAccess::ReadWrite);
    }

    #[test]
    fn test_write_at_read_write() {
        let tmpfile = temp_image(1024);

        {
            let mut device =
                DevicePipeline::open(tmpfile.path(), DeviceAccess::ReadWrite).unwrap();
            device.write_at(512, &[0xDE, 0xAD]).unwrap();
            device.sync().unwrap();
        }

        let mut device = DevicePipeline::open(tmpfile.path(), DeviceAccess::ReadOnly).unwrap();
        assert_eq!(device.read_at(512, 2).unwrap(), vec![0xDE, 0xAD]);
        assert_eq!(device.length().unwrap(), 1024);
    }

    #[test]
    fn test_write_at_read_only_rejected() {
        let tmpfile = temp_image(64);
        let mut device = DevicePipeline::open(tmpfile.path(), DeviceAccess::ReadOnly).unwrap();

        let result = device.write_at(0, &[1]);
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
    }
}
