//! Well-known GPT partition type GUIDs

/// Canonical type GUID to type name
///
/// Names are the short identifiers the tool has always printed, so scripts
/// that match on them keep working.
pub const PARTITION_TYPES: &[(&str, &str)] = &[
    // Generic
    ("024DEE41-33E7-11D3-9D69-0008C781F39F", "MBR"),
    ("C12A7328-F81F-11D2-BA4B-00A0C93EC93B", "EFI"),
    ("21686148-6449-6E6F-744E-656564454649", "BIOS_boot_partition"),
    // Microsoft
    ("E3C9E316-0B5C-4DB8-817D-F92DF00215AE", "Microsoft_reserved_partition"),
    ("EBD0A0A2-B9E5-4433-87C0-68B6B72699C7", "Microsoft_basic_data_partition"),
    ("5808C8AA-7E8F-42E0-85D2-E1E90434CFB3", "Microsoft_Logical_Disk_Manager_metadata_partition"),
    ("AF9B60A0-1431-4F62-BC68-3311714A69AD", "Microsoft_Logical_Disk_Manager_data_partition"),
    ("DE94BBA4-06D1-4D40-A16A-BFD50179D6AC", "Windows_Recovery_Environment"),
    ("E75CAF8F-F680-4CEE-AFA3-B001E56EFC2D", "Microsoft_Storage_Spaces_partition"),
    // Linux
    ("0FC63DAF-8483-4772-8E79-3D69D8477DE4", "Linux_filesystem_data"),
    ("A19D880F-05FC-4D3B-A006-743F0F84911E", "Linux_RAID_partition"),
    ("44479540-F297-41B2-9AF7-D131D5F0458A", "Linux_Root_partition_x86"),
    ("4F68BCE3-E8CD-4DB1-96E7-FBCAF984B709", "Linux_Root_partition_x86_64"),
    ("69DAD710-2CE4-4E3C-B16C-21A1D49ABED3", "Linux_Root_partition_ARM_x32"),
    ("B921B045-1DF0-41C3-AF44-4C6F280D3FAE", "Linux_Root_partition_ARM_x64"),
    ("0657FD6D-A4AB-43C4-84E5-0933C84B4F4F", "Linux_Swap_partition"),
    ("E6D6D379-F507-44C2-A23C-238F2A3DF928", "Linux_Logical_Volume_Manager_partition"),
    ("933AC7E1-2EB4-4F13-B844-0E14E2AEF915", "Linux_home_partition"),
    ("3B8F8425-20E0-4F3B-907F-1A25A76F98E8", "Linux_server_data_partition"),
    ("7FFEC5C9-2D00-49B7-8941-3EA10A5586B7", "Linux_Plain_dm_crypt_partition"),
    ("CA7D7CCB-63ED-4C53-861C-1742536059CC", "Linux_LUKS_partition"),
    ("8DA63339-0007-60C0-C436-083AC8230908", "Reserved"),
];

/// Name returned for type GUIDs not in [`PARTITION_TYPES`]
pub const UNKNOWN_TYPE: &str = "Unknown";

/// Get the type name for a partition type GUID
///
/// Matching is case-insensitive; anything not in the table is `"Unknown"`.
pub fn classify(type_guid: &str) -> &'static str {
    let type_guid = type_guid.trim();

    PARTITION_TYPES
        .iter()
        .find(|(guid, _)| guid.eq_ignore_ascii_case(type_guid))
        .map(|&(_, name)| name)
        .unwrap_or(UNKNOWN_TYPE)
}
