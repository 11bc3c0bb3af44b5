//! Stratified selection of training samples.

use log::info;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::classify::Classification;

/// Seed used by the build so sampling is reproducible across runs.
pub const DEFAULT_SEED: u64 = 42;

pub const MIN_SAMPLE_COUNT: usize = 2000;
pub const MAX_SAMPLE_COUNT: usize = 10_000;

/// `min(total, 10000, max(2000, total / 50))`
pub fn sample_count(total: usize) -> usize {
    total
        .min(MAX_SAMPLE_COUNT)
        .min(MIN_SAMPLE_COUNT.max(total / 50))
}

/// Per-bucket targets. The word share is truncated; any remainder goes
/// to phrases.
pub fn split_targets(sample_count: usize, words: usize, total: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    let word_target = (sample_count as u128 * words as u128 / total as u128) as usize;
    (word_target, sample_count - word_target)
}

/// Draws the training sample: word picks then phrase picks, shuffled
/// together. Buckets smaller than their target are taken whole.
pub fn stratified_sample<R: Rng + ?Sized>(classification: &Classification, rng: &mut R) -> Vec<Vec<u8>> {
    let total = classification.total();
    let count = sample_count(total);
    let (word_target, phrase_target) = split_targets(count, classification.words.len(), total);

    info!(
        "Total entries: {} (words: {}, phrases: {})",
        total,
        classification.words.len(),
        classification.phrases.len()
    );
    info!(
        "Sampling {} words and {} phrases ({} total)",
        word_target, phrase_target, count
    );

    let mut samples: Vec<&String> = pick(&classification.words, word_target, rng);
    samples.extend(pick(&classification.phrases, phrase_target, rng));
    samples.shuffle(rng);

    samples.into_iter().map(|s| s.as_bytes().to_vec()).collect()
}

fn pick<'a, R: Rng + ?Sized>(bucket: &'a [String], target: usize, rng: &mut R) -> Vec<&'a String> {
    if bucket.len() > target {
        bucket.choose_multiple(rng, target).collect()
    } else {
        bucket.iter().collect()
    }
}
