//! ntfsview — command-line front-end over the `ntfsview` library.
//!
//! This binary is a thin external collaborator: it owns argument parsing,
//! device opening, and output formatting, and contains no NTFS parsing
//! logic of its own.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ntfsview::arena::Arena;
use ntfsview::device::{FileBlockDevice, MmapBlockDevice};
use ntfsview::file::File;
use ntfsview::volume::Volume;

/// ntfsview — read-only NTFS metadata inspector.
#[derive(Parser)]
#[command(name = "ntfsview")]
#[command(version)]
#[command(about = "Decode NTFS volumes and images without mounting them", long_about = None)]
struct Cli {
    /// Force the partition start offset in bytes, bypassing MBR discovery.
    #[arg(long, global = true)]
    offset: Option<u64>,

    /// Use a memory-mapped reader instead of positioned file I/O.
    #[arg(long, global = true)]
    mmap: bool,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output.
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show volume geometry and metadata.
    Info {
        /// Path to the device or image file.
        image: PathBuf,
    },

    /// Show a decoded file's attributes.
    Stat {
        /// Path to the device or image file.
        image: PathBuf,
        /// MFT index of the file to inspect.
        mft_index: u64,
    },

    /// Stream a file's $DATA content to stdout.
    Cat {
        /// Path to the device or image file.
        image: PathBuf,
        /// MFT index of the file to read.
        mft_index: u64,
    },

    /// List a file's parsed attributes.
    Attrs {
        /// Path to the device or image file.
        image: PathBuf,
        /// MFT index of the file to inspect.
        mft_index: u64,
    },
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
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    match &cli.command {
        Commands::Info { image } => show_info(image, cli.offset, cli.mmap),
        Commands::Stat { image, mft_index } => show_stat(image, cli.offset, cli.mmap, *mft_index),
        Commands::Cat { image, mft_index } => cat_file(image, cli.offset, cli.mmap, *mft_index),
        Commands::Attrs { image, mft_index } => show_attrs(image, cli.offset, cli.mmap, *mft_index),
    }
}

fn open_volume(image: &PathBuf, offset: Option<u64>, mmap: bool) -> Result<Volume> {
    let reader: Box<dyn ntfsview::device::BlockReader> = if mmap {
        Box::new(MmapBlockDevice::open(image).context("failed to memory-map image")?)
    } else {
        Box::new(FileBlockDevice::open(image).context("failed to open image")?)
    };

    let volume = match offset {
        Some(offset) => Volume::open_from_file_with_offset(reader, offset),
        None => Volume::open_from_file(reader),
    }
    .context("failed to open NTFS volume")?;

    Ok(volume)
}

fn show_info(image: &PathBuf, offset: Option<u64>, mmap: bool) -> Result<()> {
    let volume = open_volume(image, offset, mmap)?;

    println!("Bytes per sector:    {}", volume.bytes_per_sector);
    println!("Sectors per cluster: {}", volume.sectors_per_cluster);
    println!("Bytes per cluster:   {}", volume.bytes_per_cluster);
    println!("Bytes per MFT entry: {}", volume.bytes_per_mft_entry);
    println!("MFT cluster:         {}", volume.mft_cluster);
    println!("Serial number:       {:#018x}", volume.serial_number);
    println!("Volume name:         {}", String::from_utf16_lossy(&volume.name));

    Ok(())
}

fn show_stat(image: &PathBuf, offset: Option<u64>, mmap: bool, mft_index: u64) -> Result<()> {
    let volume = open_volume(image, offset, mmap)?;
    let arena = Arena::new();
    let file = File::open(&volume, &arena, mft_index).context("failed to open file")?;

    let name = String::from_utf16_lossy(&file.name[..file.name.len().saturating_sub(1)]);
    println!("Name:          {name}");
    println!("MFT index:     {}", file.record.index);
    println!("Parent index:  {}", file.parent_index);
    println!("Is directory:  {}", file.record.is_dir);
    println!("Size:          {}", file.size);
    println!("Aligned size:  {}", file.aligned_size);
    println!("Flags:         {:?}", file.flags);
    println!("Creation time: {:#018x}", file.creation_time);
    println!("Modified time: {:#018x}", file.modified_time);
    println!("Changed time:  {:#018x}", file.changed_time);
    println!("Read time:     {:#018x}", file.read_time);

    Ok(())
}

fn cat_file(image: &PathBuf, offset: Option<u64>, mmap: bool, mft_index: u64) -> Result<()> {
    use std::io::{stdout, Write};

    let volume = open_volume(image, offset, mmap)?;
    let arena = Arena::new();
    let file = File::open(&volume, &arena, mft_index).context("failed to open file")?;

    let chunk_size = volume.bytes_per_cluster.max(4096) as usize;
    let mut buffer = vec![0u8; chunk_size];
    let mut position = 0u64;
    let mut remaining = file.size;
    let stdout = stdout();
    let mut handle = stdout.lock();

    while remaining > 0 {
        let read = file
            .read(position, &mut buffer)
            .context("failed to read file content")?;
        if read == 0 {
            break;
        }
        let to_write = (read as u64).min(remaining) as usize;
        handle.write_all(&buffer[..to_write])?;
        position += read as u64;
        remaining = remaining.saturating_sub(to_write as u64);
    }

    Ok(())
}

fn show_attrs(image: &PathBuf, offset: Option<u64>, mmap: bool, mft_index: u64) -> Result<()> {
    let volume = open_volume(image, offset, mmap)?;
    let arena = Arena::new();
    let record = volume
        .decode_record(&arena, mft_index)
        .context("failed to decode MFT record")?;

    for attr in record.iter() {
        match &attr.body {
            ntfsview::attr::AttrBody::Resident { data } => {
                println!(
                    "{:<24} resident     flags={:?} id={} size={}",
                    attr.attr_type.name(),
                    attr.flags,
                    attr.id,
                    data.len()
                );
            }
            ntfsview::attr::AttrBody::NonResident { real_size, runs, .. } => {
                println!(
                    "{:<24} non-resident flags={:?} id={} size={} runs={}",
                    attr.attr_type.name(),
                    attr.flags,
                    attr.id,
                    real_size,
                    runs.len()
                );
            }
        }
    }

    Ok(())
}
