//! Read side of a finished store: the decompression contract.
//!
//! Fetch the `json_data` blob, decompress it with the single stored
//! dictionary, JSON-decode. Queries are normalized exactly like the index
//! columns were at build time.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use serde_json::Value;

use crate::dict::DictDecompressor;
use crate::error::{Error, Result};
use crate::normalize::normalize;
use crate::store::{Schema, DICT_KEY};

/// Index columns of one entry, without its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub entry_id: i64,
    pub headword: String,
    pub entry_type: String,
    pub page: Option<String>,
    pub section: String,
}

/// Physical statistics of a store file.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub schema: String,
    pub page_size: u32,
    pub page_count: u64,
    pub freelist_count: u64,
    pub entry_count: u64,
    pub dict_size: usize,
    pub file_size: u64,
}

pub struct DictStore {
    conn: Connection,
    path: PathBuf,
    schema: Schema,
    dict_size: usize,
    decompressor: DictDecompressor,
}

impl DictStore {
    /// Opens a finished store read-only and loads its dictionary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

        let dict: Vec<u8> = conn.query_row(
            "SELECT value FROM config WHERE key = ?1",
            params![DICT_KEY],
            |row| row.get(0),
        )?;
        let schema = Schema::detect(&conn)?;

        Ok(Self {
            conn,
            path,
            schema,
            dict_size: dict.len(),
            decompressor: DictDecompressor::new(&dict),
        })
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn entry_count(&self) -> Result<u64> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?)
    }

    /// All entry ids, ascending.
    pub fn ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare("SELECT entry_id FROM entries ORDER BY entry_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        Ok(ids)
    }

    /// Full original record of `entry_id`, or `None` if absent.
    pub fn get(&self, entry_id: i64) -> Result<Option<Value>> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT json_data FROM entries WHERE entry_id = ?1",
                params![entry_id],
                |row| row.get(0),
            )
            .optional()?;

        blob.map(|blob| self.decode(entry_id, &blob)).transpose()
    }

    fn decode(&self, entry_id: i64, blob: &[u8]) -> Result<Value> {
        let json = self.decompressor.decompress(blob).map_err(|e| Error::Decompress {
            entry_id,
            reason: e.to_string(),
        })?;
        serde_json::from_slice(&json).map_err(|e| Error::Decompress {
            entry_id,
            reason: e.to_string(),
        })
    }

    /// Entries whose headword matches `query`: normalized match in the
    /// default layout, exact match on the raw headword in phonetic layout.
    pub fn lookup_headword(&self, query: &str) -> Result<Vec<EntrySummary>> {
        match self.schema {
            Schema::Default => self.summaries("headword_normalized", &normalize(query)),
            Schema::Phonetic => self.summaries("headword", query),
        }
    }

    /// Entries whose normalized phonetic matches `query`. Empty for
    /// stores built without phonetic mode.
    pub fn lookup_phonetic(&self, query: &str) -> Result<Vec<EntrySummary>> {
        match self.schema {
            Schema::Default => Ok(Vec::new()),
            Schema::Phonetic => self.summaries("phonetic_normalized", &normalize(query)),
        }
    }

    fn summaries(&self, column: &str, value: &str) -> Result<Vec<EntrySummary>> {
        let sql = format!(
            "SELECT entry_id, headword, entry_type, page, section FROM entries
             WHERE {} = ?1 ORDER BY entry_id",
            column
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params![value], |row| {
                Ok(EntrySummary {
                    entry_id: row.get(0)?,
                    headword: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    entry_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    page: row.get(3)?,
                    section: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                })
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(rows)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let page_size: u32 = self.conn.query_row("PRAGMA page_size", [], |r| r.get(0))?;
        let page_count: u64 = self.conn.query_row("PRAGMA page_count", [], |r| r.get(0))?;
        let freelist_count: u64 = self.conn.query_row("PRAGMA freelist_count", [], |r| r.get(0))?;

        Ok(StoreStats {
            schema: format!("{:?}", self.schema).to_lowercase(),
            page_size,
            page_count,
            freelist_count,
            entry_count: self.entry_count()?,
            dict_size: self.dict_size,
            file_size: fs::metadata(&self.path)?.len(),
        })
    }
}
