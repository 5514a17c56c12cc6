//! Gestalt (Ratcliff/Obershelp) sequence similarity.
//!
//! The ratio between two strings is `2·M / T`, where `T` is their combined
//! length in characters and `M` the number of characters covered by matching
//! blocks. Blocks are found by taking the longest common contiguous run,
//! then recursing on the pieces to its left and to its right.
//!
//! # Complexity
//! - Building a matcher: O(n) in the query length
//! - Scoring one candidate: O(m·n) worst case, usually far less because only
//!   positions sharing a character are visited
//!
//! # Popular characters
//!
//! For queries of 200 characters or more, a character occurring in more than
//! `len / 100 + 1` query positions cannot seed a block. Once the longest
//! seeded block is chosen it is still extended over equal neighbours on both
//! sides, popular or not. This keeps long, repetitive queries from going
//! quadratic and matches the classic `SequenceMatcher` heuristic that alias
//! dictionaries are tuned against.

use std::collections::HashMap;

use crate::error::ParameterError;

const POPULAR_MIN_LEN: usize = 200;

/// A similarity cutoff strictly inside (0.0, 1.0).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Threshold(f64);

impl Threshold {
    /// Validates and wraps a cutoff.
    ///
    /// # Errors
    /// `ParameterError::ThresholdOutOfRange` for values outside (0, 1) or NaN.
    pub fn new(value: f64) -> Result<Self, ParameterError> {
        if value.is_finite() && value > 0.0 && value < 1.0 {
            Ok(Self(value))
        } else {
            Err(ParameterError::ThresholdOutOfRange { value })
        }
    }

    /// The raw cutoff.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

/// A candidate that met the threshold, with its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredMatch<'c> {
    /// The accepted candidate, borrowed from the input.
    pub candidate: &'c str,
    /// Its similarity ratio to the query.
    pub ratio: f64,
}

#[allow(clippy::cast_precision_loss)]
fn ratio_of(matches: usize, total_len: usize) -> f64 {
    if total_len == 0 {
        1.0
    } else {
        2.0 * matches as f64 / total_len as f64
    }
}

/// Scores candidates against one fixed query.
///
/// The query-side index is built once and reused for every candidate.
#[derive(Debug, Clone)]
pub struct GestaltMatcher {
    query: Vec<char>,
    /// Query positions per character, ascending, popular characters removed.
    positions: HashMap<char, Vec<usize>>,
    /// Full character counts of the query.
    counts: HashMap<char, usize>,
}

impl GestaltMatcher {
    /// Index `query` for repeated scoring.
    #[must_use]
    pub fn new(query: &str) -> Self {
        let query: Vec<char> = query.chars().collect();

        let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in query.iter().enumerate() {
            positions.entry(c).or_default().push(j);
        }
        let counts = positions.iter().map(|(&c, js)| (c, js.len())).collect();

        if query.len() >= POPULAR_MIN_LEN {
            let limit = query.len() / 100 + 1;
            positions.retain(|_, js| js.len() <= limit);
        }

        Self {
            query,
            positions,
            counts,
        }
    }

    /// Length of the query in characters.
    #[must_use]
    pub fn query_len(&self) -> usize {
        self.query.len()
    }

    /// Longest block `(i, j, k)` with `candidate[i..i+k] == query[j..j+k]`
    /// inside the given windows. Ties go to the smallest `i`, then `j`.
    ///
    /// Only non-popular characters seed the search; the winner is then grown
    /// across any equal characters around it.
    fn longest_block(
        &self,
        candidate: &[char],
        (alo, ahi): (usize, usize),
        (blo, bhi): (usize, usize),
    ) -> (usize, usize, usize) {
        let mut best = (alo, blo, 0);
        // run length of the match ending at query position j, for row i - 1
        let mut run_ending_at: HashMap<usize, usize> = HashMap::new();

        for (i, c) in candidate.iter().enumerate().take(ahi).skip(alo) {
            let mut next_runs = HashMap::new();
            if let Some(js) = self.positions.get(c) {
                for &j in js {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let prev = j
                        .checked_sub(1)
                        .and_then(|p| run_ending_at.get(&p))
                        .copied()
                        .unwrap_or(0);
                    let k = prev + 1;
                    next_runs.insert(j, k);
                    if k > best.2 {
                        best = (i + 1 - k, j + 1 - k, k);
                    }
                }
            }
            run_ending_at = next_runs;
        }

        let (mut i, mut j, mut k) = best;
        while i > alo && j > blo && candidate[i - 1] == self.query[j - 1] {
            i -= 1;
            j -= 1;
            k += 1;
        }
        while i + k < ahi && j + k < bhi && candidate[i + k] == self.query[j + k] {
            k += 1;
        }

        (i, j, k)
    }

    /// Total number of characters covered by matching blocks.
    fn matched_chars(&self, candidate: &[char]) -> usize {
        let mut pending = vec![((0, candidate.len()), (0, self.query.len()))];
        let mut total = 0;

        while let Some(((alo, ahi), (blo, bhi))) = pending.pop() {
            let (i, j, k) = self.longest_block(candidate, (alo, ahi), (blo, bhi));
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                pending.push(((alo, i), (blo, j)));
            }
            if i + k < ahi && j + k < bhi {
                pending.push(((i + k, ahi), (j + k, bhi)));
            }
        }

        total
    }

    /// Upper bound on the ratio from lengths alone.
    fn length_bound(&self, candidate_len: usize) -> f64 {
        ratio_of(
            candidate_len.min(self.query.len()),
            candidate_len + self.query.len(),
        )
    }

    /// Upper bound on the ratio from shared character counts.
    fn multiset_bound(&self, candidate: &[char]) -> f64 {
        let mut available = self.counts.clone();
        let mut shared = 0;
        for c in candidate {
            if let Some(n) = available.get_mut(c) {
                if *n > 0 {
                    *n -= 1;
                    shared += 1;
                }
            }
        }
        ratio_of(shared, candidate.len() + self.query.len())
    }

    /// Similarity ratio in [0.0, 1.0] between `candidate` and the query.
    #[must_use]
    pub fn ratio(&self, candidate: &str) -> f64 {
        let candidate: Vec<char> = candidate.chars().collect();
        ratio_of(
            self.matched_chars(&candidate),
            candidate.len() + self.query.len(),
        )
    }

    /// Best candidate scoring at least `threshold`.
    ///
    /// Equal scores keep the earliest candidate.
    pub fn best_of<'c, I>(&self, candidates: I, threshold: Threshold) -> Option<ScoredMatch<'c>>
    where
        I: IntoIterator<Item = &'c str>,
    {
        let cutoff = threshold.value();
        let mut best: Option<ScoredMatch<'c>> = None;

        for candidate in candidates {
            let chars: Vec<char> = candidate.chars().collect();
            if self.length_bound(chars.len()) < cutoff || self.multiset_bound(&chars) < cutoff {
                continue;
            }
            let ratio = ratio_of(self.matched_chars(&chars), chars.len() + self.query.len());
            if ratio < cutoff {
                continue;
            }
            if best.map_or(true, |b| ratio > b.ratio) {
                best = Some(ScoredMatch { candidate, ratio });
            }
        }

        best
    }
}

/// Similarity ratio between two strings.
#[must_use]
pub fn gestalt_ratio(a: &str, b: &str) -> f64 {
    GestaltMatcher::new(b).ratio(a)
}

/// Best approximately matching candidate for `query`, or `None`.
///
/// # Errors
/// `ParameterError::ThresholdOutOfRange` unless `0.0 < threshold < 1.0`.
pub fn best_match<'c, I>(
    query: &str,
    candidates: I,
    threshold: f64,
) -> Result<Option<ScoredMatch<'c>>, ParameterError>
where
    I: IntoIterator<Item = &'c str>,
{
    let threshold = Threshold::new(threshold)?;
    Ok(GestaltMatcher::new(query).best_of(candidates, threshold))
}
