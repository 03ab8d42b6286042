//! diskbtree CLI
//!
//! Command-line interface for creating, filling and reading index files.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use diskbtree::common::config::DEFAULT_BLOCK_SIZE;
use diskbtree::{BTree, BulkLoader, Config, Error, Extractor, Key, LoadPolicy, Result, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// diskbtree CLI
#[derive(Parser, Debug)]
#[command(name = "diskbtree")]
#[command(about = "Disk-backed B-tree index manager")]
#[command(version)]
struct Args {
    /// Skip the fsync after every write; sync once on exit instead
    #[arg(long, global = true)]
    no_sync: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new, empty index file
    Create {
        /// Index file to create
        file: PathBuf,

        /// Block size in bytes
        #[arg(default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: u32,
    },

    /// Insert a key/value pair
    Insert {
        /// Index file
        file: PathBuf,

        /// The key to insert
        key: Key,

        /// The value to store
        value: Value,
    },

    /// Look up a key
    Search {
        /// Index file
        file: PathBuf,

        /// The key to find
        key: Key,
    },

    /// Insert every `key,value` record of a CSV file
    Load {
        /// Index file
        file: PathBuf,

        /// CSV source
        csv: PathBuf,

        /// Log and skip malformed records and duplicate keys
        #[arg(long)]
        skip_malformed: bool,
    },

    /// Print every pair in key order
    Print {
        /// Index file
        file: PathBuf,
    },

    /// Write every pair in key order to a new CSV file
    Extract {
        /// Index file
        file: PathBuf,

        /// Output file; must not exist
        output: PathBuf,
    },

    /// Show header information
    Info {
        /// Index file
        file: PathBuf,
    },

    /// Verify the tree structure
    Check {
        /// Index file
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only command output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = Config::builder().sync_writes(!args.no_sync).build();

    match args.command {
        Commands::Create { file, block_size } => {
            config.block_size = block_size;
            BTree::create(&file, &config)?.close()
        }

        Commands::Insert { file, key, value } => {
            let mut tree = BTree::open(&file, &config)?;
            tree.insert(key, value)?;
            tree.close()
        }

        Commands::Search { file, key } => {
            let mut tree = BTree::open(&file, &config)?;
            let value = tree.search(key)?;
            println!("{} {}", key, value);
            tree.close()
        }

        Commands::Load {
            file,
            csv,
            skip_malformed,
        } => {
            ensure_readable(&csv)?;
            if skip_malformed {
                config.load_policy = LoadPolicy::Skip;
            }

            let mut tree = BTree::open(&file, &config)?;
            let report = BulkLoader::new(config.load_policy).load_path(&mut tree, &csv)?;
            if report.skipped > 0 {
                eprintln!(
                    "loaded {} record(s), skipped {}",
                    report.inserted, report.skipped
                );
            }
            tree.close()
        }

        Commands::Print { file } => {
            let mut tree = BTree::open(&file, &config)?;
            let mut out = BufWriter::new(io::stdout().lock());
            for pair in tree.iter() {
                let (key, value) = pair?;
                writeln!(out, "{} {}", key, value)?;
            }
            out.flush()?;
            tree.close()
        }

        Commands::Extract { file, output } => {
            if output.exists() {
                return Err(Error::OutputExists(output));
            }
            let mut tree = BTree::open(&file, &config)?;
            Extractor::new().extract_path(&mut tree, &output)?;
            tree.close()
        }

        Commands::Info { file } => {
            let mut tree = BTree::open(&file, &config)?;
            println!("{}", tree.info()?);
            tree.close()
        }

        Commands::Check { file } => {
            let mut tree = BTree::open(&file, &config)?;
            let shape = tree.verify()?;
            println!(
                "ok: height {}, {} node(s), {} leaf node(s), {} entries",
                shape.height, shape.nodes, shape.leaves, shape.entries
            );
            tree.close()
        }
    }
}

/// Fail before the index is opened if the CSV source is missing.
fn ensure_readable(path: &Path) -> Result<()> {
    fs::metadata(path)?;
    Ok(())
}
