//! Synthetic GPT disk images for tests

use gptveil_core::{DiskGeometry, TableCopy};
use std::io::Cursor;

use crate::gpt::{self, GptHeader};

pub const TOTAL_SECTORS: u64 = 2048;

/// Linux filesystem data type GUID, on-disk byte order
pub const LINUX_FILESYSTEM: [u8; 16] = [
    0xaf, 0x3d, 0xc6, 0x0f, 0x83, 0x84, 0x72, 0x47, 0x8e, 0x79, 0x3d, 0x69, 0xd8, 0x47, 0x7d, 0xe4,
];

const DISK_GUID: [u8; 16] = [
    0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0,
];

const ENTRY_SIZE: usize = 128;
const TABLE_LEN: usize = 128 * ENTRY_SIZE;

/// A protective MBR sector covering `total_sectors`
pub fn protective_mbr(total_sectors: u64) -> Vec<u8> {
    let mut sector = vec![0u8; 512];
    let record = 0x1BE;
    sector[record + 1] = 0x02;
    sector[record + 4] = 0xEE;
    sector[record + 8..record + 12].copy_from_slice(&1u32.to_le_bytes());
    let size = u32::try_from(total_sectors - 1).unwrap_or(u32::MAX);
    sector[record + 12..record + 16].copy_from_slice(&size.to_le_bytes());
    sector[510] = 0x55;
    sector[511] = 0xAA;
    sector
}

/// A live Linux filesystem entry; `n` distinguishes the unique GUID and LBAs
pub fn linux_entry(n: u8, name: &str) -> Vec<u8> {
    let mut entry = vec![0u8; ENTRY_SIZE];
    entry[..16].copy_from_slice(&LINUX_FILESYSTEM);

    let mut unique = [0x11u8; 16];
    unique[0] = n;
    unique[15] = 0x42;
    entry[16..32].copy_from_slice(&unique);

    let first = 100 * n as u64;
    entry[0x20..0x28].copy_from_slice(&first.to_le_bytes());
    entry[0x28..0x30].copy_from_slice(&(first + 99).to_le_bytes());

    for (i, unit) in name.encode_utf16().take(36).enumerate() {
        entry[0x38 + i * 2..0x38 + i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }
    entry
}

/// The hidden form of an entry: zeroed head, original head pair at the tail
pub fn hidden(entry: &[u8]) -> Vec<u8> {
    let len = entry.len();
    let mut out = vec![0u8; 32];
    out.extend_from_slice(&entry[32..len - 32]);
    out.extend_from_slice(&entry[..32]);
    out
}

/// Build a consistent GPT disk image
///
/// `entries` places entry bytes at slot indices. Without a secondary copy the
/// end of the image is left zeroed.
pub fn build_disk(total_sectors: u64, entries: &[(usize, Vec<u8>)], with_secondary: bool) -> Vec<u8> {
    let secondary = if with_secondary { Some(entries) } else { None };
    build_disk_with(total_sectors, ENTRY_SIZE, entries, secondary)
}

/// Build a GPT disk image with a custom entry size and separate table contents
///
/// The entry array always fills 32 sectors, so the entry count is
/// `16384 / entry_size`. `secondary` of `None` leaves the secondary copy out.
pub fn build_disk_with(
    total_sectors: u64,
    entry_size: usize,
    primary: &[(usize, Vec<u8>)],
    secondary: Option<&[(usize, Vec<u8>)]>,
) -> Vec<u8> {
    let mut disk = vec![0u8; (total_sectors * 512) as usize];
    disk[..512].copy_from_slice(&protective_mbr(total_sectors));

    let table = fill_table(entry_size, primary);
    let header = header_sector(total_sectors, 1, total_sectors - 1, 2, entry_size, &table);
    disk[512..1024].copy_from_slice(&header);
    disk[1024..1024 + TABLE_LEN].copy_from_slice(&table);

    if let Some(entries) = secondary {
        let table = fill_table(entry_size, entries);
        let table_lba = total_sectors - 33;
        let table_start = (table_lba * 512) as usize;
        disk[table_start..table_start + TABLE_LEN].copy_from_slice(&table);

        let header = header_sector(total_sectors, total_sectors - 1, 1, table_lba, entry_size, &table);
        let header_start = ((total_sectors - 1) * 512) as usize;
        disk[header_start..header_start + 512].copy_from_slice(&header);
    }

    disk
}

/// Pad an entry with zeros to `entry_size` bytes
pub fn widen(entry: &[u8], entry_size: usize) -> Vec<u8> {
    let mut out = entry.to_vec();
    out.resize(entry_size, 0);
    out
}

fn fill_table(entry_size: usize, entries: &[(usize, Vec<u8>)]) -> Vec<u8> {
    let mut table = vec![0u8; TABLE_LEN];
    for (slot, bytes) in entries {
        table[slot * entry_size..(slot + 1) * entry_size].copy_from_slice(bytes);
    }
    table
}

fn header_sector(
    total_sectors: u64,
    current: u64,
    backup: u64,
    entries_lba: u64,
    entry_size: usize,
    table: &[u8],
) -> Vec<u8> {
    let mut raw = vec![0u8; 512];
    raw[0..8].copy_from_slice(b"EFI PART");
    raw[0x08..0x0C].copy_from_slice(&0x0001_0000u32.to_le_bytes());
    raw[0x0C..0x10].copy_from_slice(&92u32.to_le_bytes());
    raw[0x18..0x20].copy_from_slice(&current.to_le_bytes());
    raw[0x20..0x28].copy_from_slice(&backup.to_le_bytes());
    raw[0x28..0x30].copy_from_slice(&34u64.to_le_bytes());
    raw[0x30..0x38].copy_from_slice(&(total_sectors - 34).to_le_bytes());
    raw[0x38..0x48].copy_from_slice(&DISK_GUID);
    raw[0x48..0x50].copy_from_slice(&entries_lba.to_le_bytes());
    raw[0x50..0x54].copy_from_slice(&((TABLE_LEN / entry_size) as u32).to_le_bytes());
    raw[0x54..0x58].copy_from_slice(&(entry_size as u32).to_le_bytes());
    raw[0x58..0x5C].copy_from_slice(&crc32fast::hash(table).to_le_bytes());

    let header_crc = crc32fast::hash(&raw[..92]);
    raw[0x10..0x14].copy_from_slice(&header_crc.to_le_bytes());
    raw
}

/// Read both headers of an image built by [`build_disk`]
pub fn read_headers(disk: &[u8]) -> (GptHeader, GptHeader) {
    let geometry = DiskGeometry::new(TOTAL_SECTORS);
    let mut cursor = Cursor::new(disk.to_vec());
    let primary = gpt::read_header(&mut cursor, &geometry, TableCopy::Primary).unwrap();
    let secondary = gpt::read_header(&mut cursor, &geometry, TableCopy::Secondary).unwrap();
    (primary, secondary)
}
