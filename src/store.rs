//! SQLite layout of a dictionary store and the bulk writer that fills it.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rusqlite::{params, Connection};

use crate::error::Result;
use crate::normalize::normalize;
use crate::record::Record;

/// Key of the dictionary row in the `config` table.
pub const DICT_KEY: &str = "zstd_dict";

pub const DEFAULT_PAGE_SIZE: u32 = 4096;
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Which index columns the `entries` table carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// `headword_normalized`, indexed.
    Default,
    /// `phonetic` and `phonetic_normalized`; raw headword and normalized
    /// phonetic are indexed.
    Phonetic,
}

impl Schema {
    fn create_entries_sql(self) -> &'static str {
        match self {
            Schema::Default => {
                "CREATE TABLE IF NOT EXISTS entries (
                    entry_id INTEGER PRIMARY KEY,
                    headword TEXT,
                    headword_normalized TEXT,
                    entry_type TEXT,
                    page TEXT,
                    section TEXT,
                    json_data BLOB
                )"
            }
            Schema::Phonetic => {
                "CREATE TABLE IF NOT EXISTS entries (
                    entry_id INTEGER PRIMARY KEY,
                    headword TEXT,
                    phonetic TEXT,
                    phonetic_normalized TEXT,
                    entry_type TEXT,
                    page TEXT,
                    section TEXT,
                    json_data BLOB
                )"
            }
        }
    }

    fn upsert_sql(self) -> &'static str {
        match self {
            Schema::Default => {
                "INSERT OR REPLACE INTO entries
                    (entry_id, headword, headword_normalized, entry_type, page, section, json_data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            }
            Schema::Phonetic => {
                "INSERT OR REPLACE INTO entries
                    (entry_id, headword, phonetic, phonetic_normalized, entry_type, page, section, json_data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            }
        }
    }

    fn index_sql(self) -> &'static [&'static str] {
        match self {
            Schema::Default => &[
                "CREATE INDEX IF NOT EXISTS idx_entry_id ON entries(entry_id)",
                "CREATE INDEX IF NOT EXISTS idx_headword_normalized ON entries(headword_normalized)",
            ],
            Schema::Phonetic => &[
                "CREATE INDEX IF NOT EXISTS idx_entry_id ON entries(entry_id)",
                "CREATE INDEX IF NOT EXISTS idx_headword ON entries(headword)",
                "CREATE INDEX IF NOT EXISTS idx_phonetic ON entries(phonetic_normalized)",
            ],
        }
    }

    /// Detects the variant from the columns of an existing `entries` table.
    pub fn detect(conn: &Connection) -> Result<Schema> {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('entries')")?;
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        if columns.iter().any(|c| c == "phonetic_normalized") {
            Ok(Schema::Phonetic)
        } else {
            Ok(Schema::Default)
        }
    }
}

/// Removes a previous store (and its journal files) at `path`.
/// Returns whether anything was removed.
pub fn remove_existing(path: &Path) -> Result<bool> {
    let mut removed = false;
    for suffix in ["", "-journal", "-wal", "-shm"] {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(suffix);
        match fs::remove_file(&candidate) {
            Ok(()) => removed = true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(removed)
}

/// Bulk writer owning the target store for the duration of a build.
pub struct StoreWriter {
    conn: Connection,
    path: PathBuf,
    schema: Schema,
    batch_size: usize,
    pending: usize,
    written: usize,
}

impl StoreWriter {
    /// Creates the store: page size first, then the `config` and
    /// `entries` tables.
    pub fn create<P: AsRef<Path>>(path: P, page_size: u32, schema: Schema, batch_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "page_size", page_size)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value BLOB
            )",
            [],
        )?;
        conn.execute(schema.create_entries_sql(), [])?;
        debug!("created store {} ({:?} schema, page size {})", path.display(), schema, page_size);

        Ok(Self {
            conn,
            path,
            schema,
            batch_size: batch_size.max(1),
            pending: 0,
            written: 0,
        })
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Stores the dictionary under [`DICT_KEY`] and commits it.
    pub fn put_dictionary(&self, dict: &[u8]) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            params![DICT_KEY, dict],
        )?;
        Ok(())
    }

    /// Upserts one entry keyed by `entry_id`; commits every `batch_size`
    /// rows.
    pub fn upsert(&mut self, record: &Record, json_data: &[u8]) -> Result<()> {
        if self.pending == 0 {
            self.conn.execute_batch("BEGIN")?;
        }

        let mut stmt = self.conn.prepare_cached(self.schema.upsert_sql())?;
        match self.schema {
            Schema::Default => {
                stmt.execute(params![
                    record.entry_id,
                    record.headword,
                    normalize(&record.headword),
                    record.entry_type,
                    record.page,
                    record.section,
                    json_data,
                ])?;
            }
            Schema::Phonetic => {
                let phonetic = record.phonetic.as_deref().unwrap_or("");
                stmt.execute(params![
                    record.entry_id,
                    record.headword,
                    phonetic,
                    normalize(phonetic),
                    record.entry_type,
                    record.page,
                    record.section,
                    json_data,
                ])?;
            }
        }
        drop(stmt);

        self.pending += 1;
        self.written += 1;
        if self.pending >= self.batch_size {
            self.commit()?;
            info!("Processed {} entries...", self.written);
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.pending > 0 {
            self.conn.execute_batch("COMMIT")?;
            self.pending = 0;
        }
        Ok(())
    }

    /// Commits the last batch, builds the secondary indexes and closes
    /// the connection. Returns the number of rows written.
    pub fn finish(mut self) -> Result<usize> {
        self.commit()?;
        for sql in self.schema.index_sql() {
            self.conn.execute(sql, [])?;
        }
        debug!("built {} indexes", self.schema.index_sql().len());
        let written = self.written;
        self.conn.close().map_err(|(_, e)| e)?;
        Ok(written)
    }
}

/// Store file size before and after compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionReport {
    pub size_before: u64,
    pub size_after: u64,
}

impl CompactionReport {
    pub fn saved(&self) -> u64 {
        self.size_before.saturating_sub(self.size_after)
    }
}

/// Reclaims free pages left behind by the bulk write.
pub fn vacuum<P: AsRef<Path>>(path: P) -> Result<CompactionReport> {
    let path = path.as_ref();
    let size_before = fs::metadata(path)?.len();

    let conn = Connection::open(path)?;
    conn.execute_batch("VACUUM")?;
    conn.close().map_err(|(_, e)| e)?;

    let size_after = fs::metadata(path)?.len();
    Ok(CompactionReport {
        size_before,
        size_after,
    })
}
