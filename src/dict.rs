//! Dictionary compression support for zstd.
//!
//! Entries are small JSON documents that repeat the same keys and value
//! shapes, so each one is compressed on its own against a dictionary
//! trained from a sample of the corpus.
//!
//! ## Usage
//!
//! ```ignore
//! use sqlite_dict_store::dict::{train_dictionary, DictCompressor, DictDecompressor};
//!
//! let dict = train_dictionary(&samples, 112 * 1024)?;
//! let compressor = DictCompressor::new(&dict, 7);
//! let blob = compressor.compress(br#"{"entry_id":1}"#)?;
//!
//! let decompressor = DictDecompressor::new(&dict);
//! let json = decompressor.decompress(&blob)?;
//! ```

use std::io::{self, Read, Write};

use log::{debug, warn};
use zstd::dict::{from_samples, DecoderDictionary, EncoderDictionary};

use crate::error::{Error, Result};

/// Default target dictionary size (112 KiB).
pub const DEFAULT_DICT_SIZE: usize = 112 * 1024;

/// Compression level for entry blobs.
pub const DEFAULT_LEVEL: i32 = 7;

/// Below this many samples zstd's trainer refuses to run; the sample is
/// used as raw dictionary content instead.
pub const MIN_TRAINING_SAMPLES: usize = 10;

/// Train a compression dictionary from sample data.
///
/// # Arguments
/// * `samples` - One raw record per sample
/// * `dict_size` - Upper bound on the dictionary size in bytes
///
/// Fails with [`Error::Training`] for an empty sample or when zstd cannot
/// train on it.
pub fn train_dictionary(samples: &[Vec<u8>], dict_size: usize) -> Result<Vec<u8>> {
    let total_bytes: usize = samples.iter().map(Vec::len).sum();
    if samples.is_empty() || total_bytes == 0 {
        return Err(Error::Training("no sample data".to_string()));
    }
    if dict_size == 0 {
        return Err(Error::Training("dictionary size must be positive".to_string()));
    }

    if samples.len() < MIN_TRAINING_SAMPLES {
        warn!(
            "Only {} samples, below the {} needed for training; using raw sample content as dictionary",
            samples.len(),
            MIN_TRAINING_SAMPLES
        );
        return Ok(raw_content_dictionary(samples, dict_size));
    }

    debug!(
        "training dictionary from {} samples ({} bytes), target {} bytes",
        samples.len(),
        total_bytes,
        dict_size
    );
    let sample_refs: Vec<&[u8]> = samples.iter().map(|s| s.as_slice()).collect();
    from_samples(&sample_refs, dict_size).map_err(|e| Error::Training(e.to_string()))
}

/// Concatenated samples, truncated to `dict_size`. zstd treats a buffer
/// without the dictionary magic as raw content.
fn raw_content_dictionary(samples: &[Vec<u8>], dict_size: usize) -> Vec<u8> {
    let mut dict = Vec::with_capacity(dict_size);
    for sample in samples {
        let room = dict_size - dict.len();
        if room == 0 {
            break;
        }
        dict.extend_from_slice(&sample[..sample.len().min(room)]);
    }
    dict
}

/// Compresses independent blobs against one prepared dictionary.
pub struct DictCompressor {
    dict: EncoderDictionary<'static>,
}

impl DictCompressor {
    pub fn new(dict: &[u8], level: i32) -> Self {
        Self {
            dict: EncoderDictionary::copy(dict, level),
        }
    }

    pub fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = zstd::stream::Encoder::with_prepared_dictionary(Vec::new(), &self.dict)?;
        encoder.write_all(data)?;
        encoder.finish()
    }
}

/// Reverse of [`DictCompressor`]; must be built from the same dictionary.
pub struct DictDecompressor {
    dict: DecoderDictionary<'static>,
}

impl DictDecompressor {
    pub fn new(dict: &[u8]) -> Self {
        Self {
            dict: DecoderDictionary::copy(dict),
        }
    }

    pub fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut decoder = zstd::stream::Decoder::with_prepared_dictionary(data, &self.dict)?;
        let mut output = Vec::new();
        decoder.read_to_end(&mut output)?;
        Ok(output)
    }
}
