//! dictdb CLI - Build and query compressed dictionary stores
//!
//! Commands:
//! - build: Train a zstd dictionary from a JSONL file and write the store
//! - info: Show store statistics (pages, entries, dictionary size)
//! - lookup: Find entries by headword or phonetic annotation
//! - get: Print the decompressed JSON of one entry

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sqlite_dict_store::{build, BuildConfig, DictStore, JsonlFile, Schema};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dictdb")]
#[command(about = "Compressed SQLite dictionary store builder", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a store from a JSONL file (replaces any existing store)
    Build {
        /// Input JSONL file, one entry per line
        input: PathBuf,
        /// Output database file
        output: PathBuf,
        /// Dictionary size in KB (default: 112)
        #[arg(long, default_value = "112")]
        dict_size: usize,
        /// SQLite page size (default: 4096)
        #[arg(long, default_value = "4096")]
        page_size: u32,
        /// Rows per commit (default: 500)
        #[arg(long, default_value = "500")]
        batch_size: usize,
        /// Compression level (1-22, default: 7)
        #[arg(short, long, default_value = "7")]
        level: i32,
        /// Index by the `phonetic` field instead of the normalized headword
        #[arg(long)]
        phonetic: bool,
    },

    /// Show store statistics
    Info {
        /// Path to database file
        db: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up entries by headword (or phonetic annotation)
    Lookup {
        /// Path to database file
        db: PathBuf,
        /// Query text, normalized the same way as the index
        query: String,
        /// Search the phonetic index
        #[arg(long)]
        phonetic: bool,
    },

    /// Print the full JSON of an entry
    Get {
        /// Path to database file
        db: PathBuf,
        /// Entry id
        entry_id: i64,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            dict_size,
            page_size,
            batch_size,
            level,
            phonetic,
        } => {
            let config = build_config(dict_size, page_size, batch_size, level, phonetic)?;
            cmd_build(&input, &output, &config)
        }
        Commands::Info { db, json } => cmd_info(&db, json),
        Commands::Lookup { db, query, phonetic } => cmd_lookup(&db, &query, phonetic),
        Commands::Get { db, entry_id } => cmd_get(&db, entry_id),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn open_store(db: &Path) -> Result<DictStore> {
    if !db.exists() {
        bail!("File not found: {}", db.display());
    }
    DictStore::open(db).with_context(|| format!("Failed to open store {}", db.display()))
}

/// Validates build flags. `dict_size_kb` is in KB.
fn build_config(dict_size_kb: usize, page_size: u32, batch_size: usize, level: i32, phonetic: bool) -> Result<BuildConfig> {
    if !page_size.is_power_of_two() || !(512..=65536).contains(&page_size) {
        bail!("Page size must be a power of two between 512 and 65536, got {}", page_size);
    }
    if !(1..=22).contains(&level) {
        bail!("Compression level must be between 1 and 22, got {}", level);
    }
    let dict_size = dict_size_kb
        .checked_mul(1024)
        .with_context(|| format!("Dictionary size too large: {} KB", dict_size_kb))?;

    Ok(BuildConfig {
        dict_size,
        page_size,
        batch_size,
        level,
        phonetic,
        ..BuildConfig::default()
    })
}

fn cmd_build(input: &Path, output: &Path, config: &BuildConfig) -> Result<()> {
    if !input.exists() {
        bail!("Input not found: {}", input.display());
    }

    let report = build(&JsonlFile::new(input), output, config).context("Build failed")?;

    println!("Database build complete: {}", output.display());
    println!("  Entries:      {} ({} words, {} phrases)", report.written, report.words, report.phrases);
    println!("  Samples:      {}", report.samples);
    println!("  Dictionary:   {}", format_bytes(report.dict_size as u64));
    println!("  Phonetic:     {}", if report.phonetic { "yes" } else { "no" });
    println!(
        "  File size:    {} (before vacuum: {})",
        format_bytes(report.size_after_vacuum),
        format_bytes(report.size_before_vacuum)
    );
    Ok(())
}

fn cmd_info(db: &Path, json: bool) -> Result<()> {
    let store = open_store(db)?;
    let stats = store.stats()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Dictionary store: {}", db.display());
        println!("  Schema:          {}", stats.schema);
        println!("  Entries:         {}", stats.entry_count);
        println!("  Page size:       {} bytes", stats.page_size);
        println!("  Pages:           {}", stats.page_count);
        println!("  Freelist pages:  {}", stats.freelist_count);
        println!("  Dictionary:      {}", format_bytes(stats.dict_size as u64));
        println!("  File size:       {}", format_bytes(stats.file_size));
    }
    Ok(())
}

fn cmd_lookup(db: &Path, query: &str, phonetic: bool) -> Result<()> {
    let store = open_store(db)?;

    if phonetic && store.schema() != Schema::Phonetic {
        bail!("Store was not built in phonetic mode: {}", db.display());
    }
    let hits = if phonetic {
        store.lookup_phonetic(query)?
    } else {
        store.lookup_headword(query)?
    };

    if hits.is_empty() {
        println!("No entries for {:?}", query);
    }
    for hit in hits {
        println!(
            "{}\t{}\t{}\tpage {}\t{}",
            hit.entry_id,
            hit.headword,
            hit.entry_type,
            hit.page.as_deref().unwrap_or("-"),
            hit.section
        );
    }
    Ok(())
}

fn cmd_get(db: &Path, entry_id: i64) -> Result<()> {
    let store = open_store(db)?;
    match store.get(entry_id)? {
        Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
        None => bail!("No entry with id {}", entry_id),
    }
    Ok(())
}
