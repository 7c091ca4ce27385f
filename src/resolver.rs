//! Free-text team name resolution.
//!
//! Input and candidates are compared lowercased and trimmed. A containment
//! pass runs first: if the input is a substring of a candidate, the first
//! such candidate wins. Only when nothing contains the input do we fall back
//! to approximate matching, taking the best-scoring candidate at or above
//! the cutoff. Anything below the cutoff is unresolved.
//!
//! Lower cutoffs resolve more inputs but accept worse guesses.

use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Default minimum similarity for an approximate match.
pub const DEFAULT_CUTOFF: f64 = 0.3;

/// Similarity score used by the approximate pass, all on a 0..=1 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimilarityMetric {
    /// Longest-matching-blocks ratio: `2 * matched / (len(a) + len(b))`.
    #[default]
    Ratio,
    NormalizedLevenshtein,
    JaroWinkler,
}

impl SimilarityMetric {
    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            SimilarityMetric::Ratio => matching_blocks_ratio(a, b),
            SimilarityMetric::NormalizedLevenshtein => strsim::normalized_levenshtein(a, b),
            SimilarityMetric::JaroWinkler => strsim::jaro_winkler(a, b),
        }
    }
}

impl FromStr for SimilarityMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ratio" => Ok(SimilarityMetric::Ratio),
            "levenshtein" => Ok(SimilarityMetric::NormalizedLevenshtein),
            "jaro_winkler" | "jaro-winkler" => Ok(SimilarityMetric::JaroWinkler),
            other => Err(format!(
                "unknown similarity metric '{}' (expected ratio, levenshtein or jaro_winkler)",
                other
            )),
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SimilarityMetric::Ratio => "ratio",
            SimilarityMetric::NormalizedLevenshtein => "levenshtein",
            SimilarityMetric::JaroWinkler => "jaro_winkler",
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TeamResolver {
    cutoff: f64,
    metric: SimilarityMetric,
}

impl Default for TeamResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOFF, SimilarityMetric::default())
    }
}

impl TeamResolver {
    /// `cutoff` is clamped into `0.0..=1.0`.
    pub fn new(cutoff: f64, metric: SimilarityMetric) -> Self {
        Self {
            cutoff: cutoff.clamp(0.0, 1.0),
            metric,
        }
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    /// Map user input to a canonical candidate, or `None` if nothing is
    /// close enough. Blank input never resolves.
    pub fn resolve<'a>(&self, raw_input: &str, candidates: &[&'a str]) -> Option<&'a str> {
        let needle = normalize(raw_input);
        if needle.is_empty() {
            return None;
        }

        // An exact name must not lose to an earlier, longer name containing it.
        if let Some(found) = candidates.iter().find(|candidate| normalize(candidate) == needle) {
            return Some(*found);
        }

        if let Some(found) = candidates
            .iter()
            .find(|candidate| normalize(candidate).contains(&needle))
        {
            return Some(*found);
        }

        let (best, score) = self.best_by_score(&needle, candidates)?;
        if score >= self.cutoff {
            debug!("Approximate match '{}' -> '{}' ({:.3})", raw_input, best, score);
            Some(best)
        } else {
            debug!(
                "No match for '{}': best '{}' scored {:.3} < {:.3}",
                raw_input, best, score, self.cutoff
            );
            None
        }
    }

    /// Closest candidate regardless of cutoff, for "did you mean" hints.
    /// Candidates with no similarity at all are never suggested.
    pub fn closest<'a>(&self, raw_input: &str, candidates: &[&'a str]) -> Option<(&'a str, f64)> {
        let needle = normalize(raw_input);
        if needle.is_empty() {
            return None;
        }
        self.best_by_score(&needle, candidates)
            .filter(|&(_, score)| score > 0.0)
    }

    /// Highest score wins; ties go to the earliest candidate.
    fn best_by_score<'a>(&self, needle: &str, candidates: &[&'a str]) -> Option<(&'a str, f64)> {
        let mut best: Option<(&'a str, f64)> = None;
        for &candidate in candidates {
            let score = self.metric.score(needle, &normalize(candidate));
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((candidate, score)),
            }
        }
        best
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Ratcliff/Obershelp similarity: find the longest common block, recurse on
/// the pieces either side of it, and score `2 * matched / total length`.
pub fn matching_blocks_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut matched = 0usize;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(&a, &b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    2.0 * matched as f64 / total as f64
}

/// Longest common run in `a[alo..ahi]` / `b[blo..bhi]`, earliest on ties.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // prev[j + 1 - blo]: length of the run ending at a[i - 1], b[j]
    let mut prev = vec![0usize; bhi - blo + 1];
    let mut curr = vec![0usize; bhi - blo + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let slot = j + 1 - blo;
            curr[slot] = if a[i] == b[j] { prev[slot - 1] + 1 } else { 0 };
            if curr[slot] > best_k {
                best_k = curr[slot];
                best_i = i + 1 - best_k;
                best_j = j + 1 - best_k;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_k)
}
