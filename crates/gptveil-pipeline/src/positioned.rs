//! Positioned reads and writes over any seekable stream

use gptveil_core::{ReadSeek, ReadWriteSeek, Result};
use std::io::SeekFrom;

/// Read exactly `len` bytes starting at absolute byte `offset`
///
/// # Errors
///
/// Returns an I/O error if the seek fails or the stream ends before `len`
/// bytes were read.
pub fn read_region(stream: &mut dyn ReadSeek, offset: u64, len: usize) -> Result<Vec<u8>> {
    stream.seek(SeekFrom::Start(offset))?;

    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf)?;

    Ok(buf)
}

/// Write all of `bytes` at absolute byte `offset`
pub fn write_region(stream: &mut dyn ReadWriteSeek, offset: u64, bytes: &[u8]) -> Result<()> {
    stream.seek(SeekFrom::Start(offset))?;
    stream.write_all(bytes)?;

    tracing::debug!("wrote {} bytes at offset {}", bytes.len(), offset);

    Ok(())
}
