//! The two-pass build: classify and sample, train, compress and write,
//! then compact.

use std::path::Path;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::classify::classify;
use crate::dict::{train_dictionary, DictCompressor, DEFAULT_DICT_SIZE, DEFAULT_LEVEL};
use crate::error::Result;
use crate::record::RecordSource;
use crate::sample::{stratified_sample, DEFAULT_SEED};
use crate::store::{self, Schema, StoreWriter, DEFAULT_BATCH_SIZE, DEFAULT_PAGE_SIZE};

/// Build parameters.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Upper bound on the trained dictionary, in bytes.
    pub dict_size: usize,
    /// SQLite page size, fixed when the store is created.
    pub page_size: u32,
    /// Rows per commit.
    pub batch_size: usize,
    /// zstd compression level for entries.
    pub level: i32,
    /// Index by phonetic annotation instead of normalized headword.
    /// Only honoured if the input carries `phonetic` fields.
    pub phonetic: bool,
    /// Seed for the training sample RNG.
    pub seed: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dict_size: DEFAULT_DICT_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            level: DEFAULT_LEVEL,
            phonetic: false,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub total: usize,
    pub words: usize,
    pub phrases: usize,
    pub samples: usize,
    pub dict_size: usize,
    pub written: usize,
    pub phonetic: bool,
    pub size_before_vacuum: u64,
    pub size_after_vacuum: u64,
}

/// Picks the layout: phonetic only when requested and present in data.
pub fn select_schema(requested: bool, has_phonetic: bool) -> Schema {
    match (requested, has_phonetic) {
        (true, true) => {
            info!("Phonetic mode enabled: indexing phonetic, no headword_normalized");
            Schema::Phonetic
        }
        (true, false) => {
            warn!("Phonetic mode requested but no phonetic field found in data; using headword index");
            Schema::Default
        }
        (false, _) => Schema::Default,
    }
}

/// Builds a store at `output` from `source` with the seed in `config`.
/// Any existing store at `output` is deleted first.
pub fn build<S, P>(source: &S, output: P, config: &BuildConfig) -> Result<BuildReport>
where
    S: RecordSource,
    P: AsRef<Path>,
{
    let mut rng = StdRng::seed_from_u64(config.seed);
    build_with_rng(source, output, config, &mut rng)
}

/// Same as [`build`] with a caller-supplied random source for sampling.
pub fn build_with_rng<S, P, R>(source: &S, output: P, config: &BuildConfig, rng: &mut R) -> Result<BuildReport>
where
    S: RecordSource,
    P: AsRef<Path>,
    R: Rng + ?Sized,
{
    let output = output.as_ref();
    if store::remove_existing(output)? {
        info!("Removed existing database: {}", output.display());
    }

    info!("Phase 1: training dictionary");
    let classification = classify(source.records()?.with_raw())?;
    let schema = select_schema(config.phonetic, classification.has_phonetic);

    let samples = stratified_sample(&classification, rng);
    info!("Training dictionary from {} samples...", samples.len());
    let dict = train_dictionary(&samples, config.dict_size)?;
    info!("Dictionary trained, size: {} bytes", dict.len());

    let total = classification.total();
    let (words, phrases) = (classification.words.len(), classification.phrases.len());
    drop(classification);

    info!("Phase 2: compressing and writing to {}", output.display());
    let mut writer = StoreWriter::create(output, config.page_size, schema, config.batch_size)?;
    writer.put_dictionary(&dict)?;
    let compressor = DictCompressor::new(&dict, config.level);

    for record in source.records()? {
        let record = record?;
        let canonical = record.canonical_json()?;
        let blob = compressor.compress(&canonical)?;
        writer.upsert(&record, &blob)?;
    }
    let written = writer.finish()?;
    info!("Total entries written to database: {}", written);

    info!("Phase 3: vacuuming");
    let compaction = store::vacuum(output)?;
    info!(
        "Database vacuumed: {:.2}MB -> {:.2}MB (saved {:.2}MB)",
        mb(compaction.size_before),
        mb(compaction.size_after),
        mb(compaction.saved())
    );

    Ok(BuildReport {
        total,
        words,
        phrases,
        samples: samples.len(),
        dict_size: dict.len(),
        written,
        phonetic: schema == Schema::Phonetic,
        size_before_vacuum: compaction.size_before,
        size_after_vacuum: compaction.size_after,
    })
}

fn mb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}
