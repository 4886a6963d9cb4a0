//! Allocation and arithmetic guards
//!
//! GPT headers are read from untrusted media. Every size derived from header
//! fields passes through these helpers before it is used to allocate or seek.

use crate::Error;

/// Maximum partition entry array we'll read (1 MB; the standard array is 16 KB)
pub const MAX_PARTITION_TABLE_SIZE: usize = 1024 * 1024;

/// Maximum partition entry count (128 is standard, padded for safety)
pub const MAX_PARTITION_COUNT: u32 = 4096;

/// Validate that a size is within allocation limits
///
/// # Security
/// Prevents memory exhaustion from a corrupted or hostile header
pub fn validate_allocation_size(size: u64, limit: usize, context: &str) -> crate::Result<usize> {
    if size > limit as u64 {
        return Err(Error::invalid_zone_table(format!(
            "{} size {} exceeds limit {}",
            context, size, limit
        )));
    }

    size.try_into().map_err(|_| {
        Error::invalid_zone_table(format!("{} size exceeds platform limits", context))
    })
}

/// Safely multiply u32 values and return u64
pub fn checked_multiply_u32_to_u64(a: u32, b: u32, context: &str) -> crate::Result<u64> {
    (a as u64)
        .checked_mul(b as u64)
        .ok_or_else(|| Error::invalid_zone_table(format!("{}: multiplication overflow", context)))
}
