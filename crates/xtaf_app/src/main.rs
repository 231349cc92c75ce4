//! xtaf - read-only access to Xbox 360 XTAF (FATX) partitions.
//!
//! Thin glue over the volume engine: opens a device or image, mounts the
//! filesystem adapter in-process and answers `info` / `ls` / `stat` /
//! `cat` through it.

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use humansize::{BINARY, format_size};
use std::io::Write;
use xtaf_core::{EntryWidth, Volume, XtafFs};
use xtaf_io::Source;

#[derive(Parser)]
#[command(name = "xtaf")]
#[command(version)]
#[command(about = "Inspect Xbox 360 XTAF (FATX) partitions", long_about = None)]
struct Cli {
    /// Raw block device or image file
    device: String,

    /// Partition byte offset (hex accepted); defaults to the Data partition
    #[arg(short, long, value_parser = parse_offset, default_value = "0x130eb0000")]
    offset: u64,

    /// Partition size in bytes; 0 extends to the end of the device
    #[arg(short, long, value_parser = parse_offset, default_value = "0")]
    size: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print drive and volume information
    Info,

    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },

    /// Print the attributes of a single entry
    Stat { path: String },

    /// Write a file's contents to stdout
    Cat { path: String },
}

fn parse_offset(raw: &str) -> std::result::Result<u64, String> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(digits) => u64::from_str_radix(digits, 16),
        None => raw.parse(),
    };
    parsed.map_err(|error| format!("invalid offset \"{raw}\": {error}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let source = Source::open(&cli.device)
        .with_context(|| format!("failed to open device: {}", cli.device))?;
    log::info!(
        "opened {} ({})",
        cli.device,
        if source.is_mmap() { "mmap" } else { "file" }
    );
    let volume = Volume::open(source, cli.offset, cli.size)
        .with_context(|| format!("no XTAF volume at offset {:#x}", cli.offset))?;
    let fs = XtafFs::new(volume);

    match cli.command {
        Commands::Info => info(&fs),
        Commands::Ls { path } => ls(&fs, &path),
        Commands::Stat { path } => stat(&fs, &path),
        Commands::Cat { path } => cat(&fs, &path),
    }
}

fn info(fs: &XtafFs<Source>) -> Result<()> {
    let volume = fs.volume();

    if let Some(drive) = volume.drive() {
        println!("model:         {}", drive.model_number);
        println!("firmware:      {}", drive.firmware_revision);
        println!("serial:        {}", drive.serial_number);
        println!(
            "capacity:      {} ({} sectors)",
            format_size(drive.capacity(), BINARY),
            drive.sector_count
        );
    }

    println!("volume id:     {:#010x}", volume.volume_id());
    println!(
        "volume size:   {} ({} bytes)",
        format_size(volume.size(), BINARY),
        volume.size()
    );
    println!("cluster size:  {} bytes", volume.cluster_size());
    let bits = match volume.table().width() {
        EntryWidth::Fat16 => 16,
        EntryWidth::Fat32 => 32,
    };
    println!(
        "table:         {} entries, {}-bit",
        volume.table().len(),
        bits
    );
    println!("root cluster:  {}", volume.root_cluster());
    if let Some(label) = volume.label() {
        println!("label:         {}", label);
    }
    Ok(())
}

fn ls(fs: &XtafFs<Source>, path: &str) -> Result<()> {
    for name in fs.readdir(path)? {
        if name == "." || name == ".." {
            continue;
        }
        let full = join(path, &name);
        let stat = fs.getattr(&full)?;
        println!(
            "{:06o} {:>12} {} {}",
            stat.mode,
            stat.size,
            format_time(stat.mtime),
            name
        );
    }
    Ok(())
}

fn stat(fs: &XtafFs<Source>, path: &str) -> Result<()> {
    let stat = fs.getattr(path)?;
    println!("path:  {}", path);
    println!("mode:  {:06o}", stat.mode);
    println!("nlink: {}", stat.nlink);
    println!("size:  {}", stat.size);
    println!("ctime: {}", format_time(stat.ctime));
    println!("mtime: {}", format_time(stat.mtime));
    println!("atime: {}", format_time(stat.atime));
    Ok(())
}

fn cat(fs: &XtafFs<Source>, path: &str) -> Result<()> {
    const CHUNK: u64 = 1 << 20;

    let stat = fs.getattr(path)?;
    let mut stdout = std::io::stdout().lock();
    let mut offset = 0u64;
    while offset < stat.size {
        let data = fs.read(path, CHUNK, offset)?;
        if data.is_empty() {
            break;
        }
        stdout.write_all(&data)?;
        offset += data.len() as u64;
    }
    Ok(())
}

fn join(directory: &str, name: &str) -> String {
    if directory.ends_with('/') {
        format!("{directory}{name}")
    } else {
        format!("{directory}/{name}")
    }
}

fn format_time(seconds: i64) -> String {
    DateTime::from_timestamp(seconds, 0)
        .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| seconds.to_string())
}
