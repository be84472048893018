use std::collections::{BTreeMap, HashMap};

use rand::{RngCore, SeedableRng};

/// Curriculum order of question types. Sessions always present types in this sequence,
/// regardless of how a blueprint lists its counts.
pub(crate) const QUESTION_TYPE_ORDER: [&str; 19] = [
    "read_aloud",
    "repeat_sentence",
    "describe_image",
    "respond_situation",
    "answer_short_question",
    "summarize_written_text",
    "write_email",
    "rw_fill_in_blanks",
    "reading_mcq_multiple",
    "reorder_paragraphs",
    "reading_fill_in_blanks",
    "reading_mcq_single",
    "summarize_spoken_text",
    "listening_mcq_multiple",
    "listening_fill_in_blanks",
    "listening_mcq_single",
    "select_missing_word",
    "highlight_incorrect_words",
    "write_from_dictation",
];

/// Mulberry32: a 32-bit generator whose whole state is the seed, so a persisted seed
/// replays the exact draw sequence.
#[derive(Debug, Clone)]
pub(crate) struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub(crate) fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Uniform value in `[0, 1)`.
    pub(crate) fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }
}

impl RngCore for Mulberry32 {
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    fn next_u64(&mut self) -> u64 {
        let low = u64::from(self.next_u32());
        let high = u64::from(self.next_u32());
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Mulberry32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(state as u32)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Pick {
    pub(crate) type_slug: &'static str,
    pub(crate) question_id: String,
}

/// Draws `count` items with replacement. An empty pool yields nothing and consumes no draws.
pub(crate) fn sample_with_replacement<'a, T>(
    pool: &'a [T],
    count: u32,
    rng: &mut Mulberry32,
) -> Vec<&'a T> {
    if pool.is_empty() {
        return Vec::new();
    }

    (0..count)
        .map(|_| {
            let index = (rng.next_f64() * pool.len() as f64).floor() as usize;
            &pool[index.min(pool.len() - 1)]
        })
        .collect()
}

/// Builds the ordered item list for a session. The position of a pick in the returned
/// vector is its presentation order.
pub(crate) fn assemble(
    counts_by_type: &BTreeMap<String, u32>,
    pools: &HashMap<String, Vec<String>>,
    seed: u32,
) -> Vec<Pick> {
    let mut rng = Mulberry32::new(seed);
    let mut picks = Vec::new();

    for type_slug in QUESTION_TYPE_ORDER {
        let count = counts_by_type.get(type_slug).copied().unwrap_or(0);
        if count == 0 {
            continue;
        }
        let Some(pool) = pools.get(type_slug) else {
            continue;
        };

        picks.extend(sample_with_replacement(pool, count, &mut rng).into_iter().map(
            |question_id| Pick { type_slug, question_id: question_id.clone() },
        ));
    }

    picks
}

/// Blueprint entries that the canonical order does not know about and that `assemble` skips.
pub(crate) fn unknown_type_slugs(counts_by_type: &BTreeMap<String, u32>) -> Vec<&str> {
    counts_by_type
        .keys()
        .map(String::as_str)
        .filter(|slug| !QUESTION_TYPE_ORDER.iter().any(|known| known == slug))
        .collect()
}
