//! BearDB Maintenance Tool
//!
//! Inspects and compacts a store file offline.

use std::path::{Path, PathBuf};
use std::process;

use beardb::record::Preamble;
use beardb::{BearError, Config, Engine, FileBackend, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// BearDB maintenance tool
#[derive(Parser, Debug)]
#[command(name = "beardb")]
#[command(about = "Inspect and maintain BearDB store files")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print record and free-space counters
    Stats {
        /// Store file
        file: PathBuf,
    },

    /// List live records
    Dump {
        /// Store file
        file: PathBuf,

        /// Stop after this many records
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Merge adjacent deleted records
    Defrag {
        /// Store file
        file: PathBuf,

        /// First record id to consider
        #[arg(short, long, default_value = "0")]
        begin: u64,

        /// Byte offset to stop at (defaults to the end of the file)
        #[arg(short, long)]
        end: Option<u64>,
    },

    /// Rebuild the free-space index by scanning every record
    RebuildIndex {
        /// Store file
        file: PathBuf,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,beardb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args.command) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Stats { file } => {
            let engine = open(&file)?;
            let stats = engine.stats()?;

            println!("size:              {}", stats.size);
            println!("live records:      {}", stats.live_records);
            println!("deleted records:   {}", stats.deleted_records);
            println!("redirects:         {}", stats.redirects);
            println!("relocated bodies:  {}", stats.relocated_bodies);
            println!("free slots:        {}", stats.free_slots);
            println!("free bytes:        {}", stats.free_bytes);
            println!("largest free slot: {}", stats.largest_free_slot);

            engine.close()
        }

        Commands::Dump { file, limit } => {
            let engine = open(&file)?;

            for id in engine.ids().take(limit.unwrap_or(usize::MAX)) {
                let info = engine.record_info(id?)?;
                match info.target() {
                    Some(target) => println!(
                        "{:>12}  len={:<10} -> {}",
                        info.id,
                        info.slot.length(),
                        target
                    ),
                    None => println!("{:>12}  len={}", info.id, info.slot.length()),
                }
            }

            engine.close()
        }

        Commands::Defrag { file, begin, end } => {
            let engine = open(&file)?;
            let report = engine.defrag(begin, end.unwrap_or(u64::MAX))?;

            println!(
                "merged {} runs ({} records), reclaimed {} bytes",
                report.runs_merged, report.records_merged, report.bytes_reclaimed
            );

            engine.close()
        }

        Commands::RebuildIndex { file } => {
            let engine = open(&file)?;
            let slots = engine.rebuild_free_index()?;

            println!("indexed {} free slots", slots);

            engine.close()
        }
    }
}

/// Open an existing store with the mode recorded in its preamble
fn open(path: &Path) -> Result<Engine> {
    let preamble = {
        let backend = FileBackend::open(path)?;
        Preamble::read_from(&backend)?
    };

    let Some(preamble) = preamble else {
        return Err(BearError::Format(format!(
            "{} is empty, not a BearDB store",
            path.display()
        )));
    };

    let config = Config::builder()
        .persist_keys(preamble.persist_keys)
        .mutable(preamble.mutable)
        .build();

    Engine::open_path(path, config)
}
