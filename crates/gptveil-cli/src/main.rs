//! gptveil CLI - inspect GPT disks and hide or unhide partitions

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gptveil_core::TableCopy;
use gptveil_zones::{
    guid, inspect, read_header, read_protective_mbr, GptHeader, PartitionRecord, ScanOptions,
    VeilPlan,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gptveil")]
#[command(about = "Inspect GPT disks and hide partitions from standard tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Check the protective MBR and print the disk geometry
    Verify {
        /// Block device or disk image
        device: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print both GPT headers with stored and recomputed checksums
    Headers {
        device: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List partitions from both GPT copies
    List {
        device: PathBuf,

        /// Also look for hidden partitions
        #[arg(long)]
        secret: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Hide a partition from standard tools
    Hide(VeilArgs),

    /// Restore a hidden partition
    Unhide(VeilArgs),
}

#[derive(clap::Args)]
struct VeilArgs {
    device: PathBuf,

    /// Unique partition GUID (any case)
    unique_guid: String,

    /// Do not ask for confirmation
    #[arg(long)]
    yes: bool,

    /// Show the writes without performing them
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Verify { device, json } => cmd_verify(&device, json),
        Command::Headers { device, json } => cmd_headers(&device, json),
        Command::List {
            device,
            secret,
            json,
        } => cmd_list(&device, secret, json),
        Command::Hide(args) => cmd_veil(&args, true),
        Command::Unhide(args) => cmd_veil(&args, false),
    }
}

fn cmd_verify(device: &Path, json: bool) -> Result<()> {
    let mbr = read_protective_mbr(device)
        .with_context(|| format!("failed to verify {}", device.display()))?;
    let geometry = mbr.geometry();

    if json {
        println!("{}", serde_json::to_string_pretty(&mbr)?);
        return Ok(());
    }

    println!("=== Protective MBR ===");
    println!("Device:   {}", device.display());
    println!("Sectors:  {}", geometry.total_sectors);
    println!("LBA size: {} bytes", geometry.lba_size);
    println!("Size:     {}", format_bytes(geometry.byte_len()));
    println!();
    for (index, record) in mbr.records().iter().enumerate() {
        println!("Record {}: {}", index, record);
    }

    Ok(())
}

fn cmd_headers(device: &Path, json: bool) -> Result<()> {
    let geometry = read_protective_mbr(device)
        .with_context(|| format!("failed to verify {}", device.display()))?
        .geometry();

    let mut reports = Vec::new();
    for copy in [TableCopy::Primary, TableCopy::Secondary] {
        let header = read_header(device, &geometry, copy)
            .with_context(|| format!("failed to read the {} GPT header", copy))?;
        reports.push(header.report());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        println!("=== {} GPT header ===", report.copy);
        println!("Offset:            {}", report.offset);
        println!("Signature valid:   {}", yes_no(report.signature_valid));
        println!("Revision:          0x{:08X}", report.revision);
        println!("Header size:       {}", report.header_size);
        println!("Header CRC32:      {} (calculated {})", report.checksum, report.calculated_checksum);
        println!("Current LBA:       {}", report.current_lba);
        println!("Backup LBA:        {}", report.backup_lba);
        println!("Usable LBAs:       {}..={}", report.first_usable_lba, report.last_usable_lba);
        println!("Disk GUID:         {}", report.disk_guid);
        println!("Entries LBA:       {}", report.partition_entries_lba);
        println!("Entries:           {} x {} bytes", report.entries_count, report.entry_size);
        println!(
            "Entries CRC32:     {} (calculated {})",
            report.entries_checksum, report.calculated_entries_checksum
        );
        println!();
    }

    Ok(())
}

fn cmd_list(device: &Path, secret: bool, json: bool) -> Result<()> {
    let options = ScanOptions {
        secret_search: secret,
    };
    let inspection = inspect(device, &options)
        .with_context(|| format!("failed to inspect {}", device.display()))?;

    if json {
        let records: Vec<&PartitionRecord> = inspection.registry.iter().collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!("Disk GUID: {}", inspection.primary.disk_guid);
    println!();

    if inspection.registry.is_empty() {
        println!("No partitions found.");
        return Ok(());
    }

    println!(
        "{:<38} {:<28} {:<10} {:<7} {:<6} {}",
        "Unique GUID", "Type", "Size", "Copies", "Secret", "Name"
    );
    println!("{}", "-".repeat(100));

    let lba_size = inspection.geometry().lba_size as u64;
    for record in inspection.registry.iter() {
        println!(
            "{:<38} {:<28} {:<10} {:<7} {:<6} {}",
            record.unique_guid,
            record.type_name(),
            format_bytes(record.size_lba() * lba_size),
            copies(record),
            yes_no(record.is_secret),
            record.name()
        );
    }

    for conflict in inspection.registry.conflicts() {
        println!();
        println!(
            "Warning: {} has type {} but the {} table says {}",
            conflict.unique_guid, conflict.kept_type_guid, conflict.other_copy, conflict.other_type_guid
        );
    }

    Ok(())
}

fn cmd_veil(args: &VeilArgs, hide: bool) -> Result<()> {
    let action = if hide { "hide" } else { "unhide" };

    let inspection = inspect(&args.device, &ScanOptions::with_secret_search())
        .with_context(|| format!("failed to inspect {}", args.device.display()))?;
    let unique_guid = guid::normalize(&args.unique_guid)?;
    let record = inspection.record(&unique_guid)?;
    let (primary, secondary) = inspection.headers()?;

    let plan = VeilPlan::build(primary, secondary, record, hide)?;
    print_plan(&plan, record, primary, secondary);

    if args.dry_run {
        tracing::info!("dry run: {} of {} not written", action, record.unique_guid);
        println!("Dry run: nothing written.");
        return Ok(());
    }

    if !args.yes && !confirm(&format!("{} partition {}?", action, record.unique_guid))? {
        tracing::info!("{} of {} cancelled at the prompt", action, record.unique_guid);
        bail!("{} cancelled", action);
    }

    tracing::info!("{} {} on {}", action, record.unique_guid, args.device.display());

    inspection
        .hide(&args.device, &unique_guid, hide)
        .with_context(|| format!("failed to {} {}", action, record.unique_guid))?;

    println!("Done.");
    Ok(())
}

fn print_plan(plan: &VeilPlan, record: &PartitionRecord, primary: &GptHeader, secondary: &GptHeader) {
    println!(
        "{} {} ({}, {})",
        if plan.hide { "Hiding" } else { "Unhiding" },
        record.unique_guid,
        record.type_name(),
        record.name()
    );
    println!(
        "Primary:   entries CRC32 {} -> {}, header CRC32 {} -> {}",
        hex::encode(primary.entries_checksum),
        hex::encode(plan.primary.entries_checksum),
        hex::encode(primary.checksum),
        hex::encode(plan.primary.header_checksum)
    );
    println!(
        "Secondary: entries CRC32 {} -> {}, header CRC32 {} -> {}",
        hex::encode(secondary.entries_checksum),
        hex::encode(plan.secondary.entries_checksum),
        hex::encode(secondary.checksum),
        hex::encode(plan.secondary.header_checksum)
    );
    for write in &plan.writes {
        println!("  write {:>4} bytes at {:>12}  {:?}", write.bytes.len(), write.offset, write.target);
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}

fn copies(record: &PartitionRecord) -> &'static str {
    match (record.primary_block.is_some(), record.secondary_block.is_some()) {
        (true, true) => "both",
        (true, false) => "primary",
        (false, true) => "backup",
        (false, false) => "none",
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1_048_576 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else if bytes < 1_073_741_824 {
        format!("{:.2} MB", bytes as f64 / 1_048_576.0)
    } else {
        format!("{:.2} GB", bytes as f64 / 1_073_741_824.0)
    }
}
