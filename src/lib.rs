//! Compact SQLite stores for dictionary entries, compressed per entry
//! with a trained zstd dictionary.
//!
//! A build reads a JSONL file twice:
//! - Pass 1 classifies entries (word / phrase), notes whether any entry
//!   carries a `phonetic` field, and draws a seeded stratified sample
//! - The sample trains a shared zstd dictionary
//! - Pass 2 compresses each entry's compact JSON against the dictionary and
//!   upserts it with its plaintext index columns, in batches
//! - Secondary indexes are built after the bulk insert, then the file is
//!   vacuumed
//!
//! Store layout:
//! - `config(key TEXT PRIMARY KEY, value BLOB)`: the dictionary under `zstd_dict`
//! - `entries`: `entry_id`, `headword`, `entry_type`, `page`, `section`,
//!   `json_data` (compressed) plus either `headword_normalized` or
//!   `phonetic` / `phonetic_normalized`
//!
//! ## Usage
//!
//! ```ignore
//! use sqlite_dict_store::{build, BuildConfig, DictStore, JsonlFile};
//!
//! let report = build(&JsonlFile::new("entries.jsonl"), "entries.db", &BuildConfig::default())?;
//!
//! let store = DictStore::open("entries.db")?;
//! for hit in store.lookup_headword("Café")? {
//!     let entry = store.get(hit.entry_id)?;
//! }
//! ```

pub mod build;
pub mod classify;
pub mod dict;
pub mod error;
pub mod normalize;
pub mod reader;
pub mod record;
pub mod sample;
pub mod store;

pub use build::{build, build_with_rng, BuildConfig, BuildReport};
pub use error::{Error, Result};
pub use normalize::normalize;
pub use reader::{DictStore, EntrySummary, StoreStats};
pub use record::{JsonlFile, MemorySource, Record, RecordSource};
pub use store::{vacuum, Schema};
