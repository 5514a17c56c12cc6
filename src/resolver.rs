//! Cascade resolver.
//!
//! A query is sanitized once and then tried against the alias dictionary in
//! eight tiers, most specific first. Every tier asks the same question (what
//! is the single best fuzzy match for this query string?) and then accepts or
//! rejects that match based on its stored priority and on how its length
//! compares to the query's.
//!
//! | Tier | Query                  | Priority | Length rule          |
//! |------|------------------------|----------|----------------------|
//! | 1    | whole string           | 1        | differs by at most 1 |
//! | 2    | whole string           | 2        | differs by at most 1 |
//! | 3    | whitespace removed     | 1        | differs by at most 1 |
//! | 4    | whitespace removed     | 2        | differs by at most 1 |
//! | 5    | each word, in order    | 1        | equal                |
//! | 6    | each word, in order    | 1        | any                  |
//! | 7    | each word, in order    | 2        | equal                |
//! | 8    | each word, in order    | 2        | any                  |
//!
//! Only the best candidate is considered. If a priority-2 alias outscores a
//! priority-1 alias for the whole string, tier 1 rejects and tier 2 accepts;
//! the runner-up is never consulted. Lengths are counted in characters.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::alias::{AliasSnapshot, Priority};
use crate::config::ResolverConfig;
use crate::error::NormResult;
use crate::operations;
use crate::sanitize::sanitize;
use crate::similarity::{GestaltMatcher, ScoredMatch, Threshold};
use crate::storage::AliasStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryForm {
    Whole,
    Compact,
    Words,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LengthRule {
    WithinOne,
    Exact,
    Any,
}

impl LengthRule {
    fn admits(self, query_len: usize, key_len: usize) -> bool {
        match self {
            Self::WithinOne => query_len.abs_diff(key_len) <= 1,
            Self::Exact => query_len == key_len,
            Self::Any => true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Tier {
    number: u8,
    form: QueryForm,
    priority: Priority,
    length: LengthRule,
}

const TIERS: [Tier; 8] = [
    Tier { number: 1, form: QueryForm::Whole, priority: Priority::High, length: LengthRule::WithinOne },
    Tier { number: 2, form: QueryForm::Whole, priority: Priority::Low, length: LengthRule::WithinOne },
    Tier { number: 3, form: QueryForm::Compact, priority: Priority::High, length: LengthRule::WithinOne },
    Tier { number: 4, form: QueryForm::Compact, priority: Priority::Low, length: LengthRule::WithinOne },
    Tier { number: 5, form: QueryForm::Words, priority: Priority::High, length: LengthRule::Exact },
    Tier { number: 6, form: QueryForm::Words, priority: Priority::High, length: LengthRule::Any },
    Tier { number: 7, form: QueryForm::Words, priority: Priority::Low, length: LengthRule::Exact },
    Tier { number: 8, form: QueryForm::Words, priority: Priority::Low, length: LengthRule::Any },
];

/// A successful resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedName {
    /// The authoritative country name.
    pub canonical_name: String,
    /// Dictionary key that matched.
    pub alias: String,
    /// Tier (1-8) that accepted the match.
    pub tier: u8,
    /// Similarity ratio of the match.
    pub ratio: f64,
}

/// Outcome of a resolution. `NotFound` is a normal answer, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A tier accepted a match.
    Found(ResolvedName),
    /// Every tier rejected.
    NotFound,
}

impl Resolution {
    /// The canonical name, if one was found.
    #[must_use]
    pub fn canonical_name(&self) -> Option<&str> {
        match self {
            Self::Found(found) => Some(&found.canonical_name),
            Self::NotFound => None,
        }
    }

    /// The accepting tier, if one was found.
    #[must_use]
    pub fn tier(&self) -> Option<u8> {
        match self {
            Self::Found(found) => Some(found.tier),
            Self::NotFound => None,
        }
    }

    /// Whether a tier accepted a match.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Best match per distinct query string, computed at most once per call.
struct BestMatches<'s> {
    snapshot: &'s AliasSnapshot,
    threshold: Threshold,
    memo: HashMap<String, Option<ScoredMatch<'s>>>,
}

impl<'s> BestMatches<'s> {
    fn new(snapshot: &'s AliasSnapshot, threshold: Threshold) -> Self {
        Self {
            snapshot,
            threshold,
            memo: HashMap::new(),
        }
    }

    fn best(&mut self, query: &str) -> Option<ScoredMatch<'s>> {
        if let Some(cached) = self.memo.get(query) {
            return *cached;
        }
        let found = GestaltMatcher::new(query).best_of(self.snapshot.keys(), self.threshold);
        self.memo.insert(query.to_string(), found);
        found
    }
}

impl Tier {
    /// The tier's verdict on the best match for one query string.
    fn accept(&self, matches: &mut BestMatches<'_>, query: &str) -> Option<ResolvedName> {
        let best = matches.best(query)?;
        let entry = matches.snapshot.get(best.candidate)?;
        if entry.priority != self.priority {
            return None;
        }

        let (query_len, key_len) = match self.form {
            QueryForm::Compact => (
                query.chars().count(),
                best.candidate.chars().filter(|c| !c.is_whitespace()).count(),
            ),
            QueryForm::Whole | QueryForm::Words => {
                (query.chars().count(), best.candidate.chars().count())
            }
        };
        if !self.length.admits(query_len, key_len) {
            return None;
        }

        Some(ResolvedName {
            canonical_name: entry.canonical_name.clone(),
            alias: best.candidate.to_string(),
            tier: self.number,
            ratio: best.ratio,
        })
    }
}

/// Run the tier cascade for an already sanitized query.
#[must_use]
pub fn cascade(snapshot: &AliasSnapshot, sanitized: &str, threshold: Threshold) -> Resolution {
    let compact = strip_whitespace(sanitized);
    let words: Vec<&str> = sanitized.split_whitespace().collect();
    let mut matches = BestMatches::new(snapshot, threshold);

    for tier in &TIERS {
        let accepted = match tier.form {
            QueryForm::Whole => tier.accept(&mut matches, sanitized),
            QueryForm::Compact => tier.accept(&mut matches, &compact),
            QueryForm::Words => words
                .iter()
                .find_map(|word| tier.accept(&mut matches, word)),
        };

        if let Some(found) = accepted {
            debug!(
                query = sanitized,
                tier = found.tier,
                alias = %found.alias,
                canonical = %found.canonical_name,
                ratio = found.ratio,
                "resolved country name"
            );
            return Resolution::Found(found);
        }
        trace!(query = sanitized, tier = tier.number, "tier rejected");
    }

    debug!(query = sanitized, "no alias matched");
    Resolution::NotFound
}

/// Resolve `posname` against `store` with cutoff `dif_acc`.
///
/// Arguments are validated before the store is read.
///
/// # Errors
/// - `InvalidParameter` unless `0.0 < dif_acc < 1.0`
/// - `InvalidInput` if `posname` is blank, before or after sanitization
/// - `Database` if the snapshot cannot be read
pub fn resolve<S>(store: &S, posname: &str, dif_acc: f64) -> NormResult<Resolution>
where
    S: AliasStore + ?Sized,
{
    let threshold = Threshold::new(dif_acc)?;
    let sanitized = sanitize(posname)?;
    let snapshot = store.snapshot()?;
    Ok(cascade(&snapshot, &sanitized, threshold))
}

/// Store handle plus default settings.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn AliasStore>,
    config: ResolverConfig,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// A resolver with the default cutoff of 0.7.
    #[must_use]
    pub fn new(store: Arc<dyn AliasStore>) -> Self {
        Self {
            store,
            config: ResolverConfig::default(),
        }
    }

    /// A resolver with custom settings.
    ///
    /// # Errors
    /// `InvalidParameter` if the configured cutoff is out of range.
    pub fn with_config(store: Arc<dyn AliasStore>, config: ResolverConfig) -> NormResult<Self> {
        config.threshold()?;
        Ok(Self { store, config })
    }

    /// The backing alias store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn AliasStore> {
        &self.store
    }

    /// Settings used by [`Resolver::resolve`].
    #[must_use]
    pub fn config(&self) -> ResolverConfig {
        self.config
    }

    /// Resolve with the configured cutoff.
    ///
    /// # Errors
    /// As [`resolve`], minus the cutoff check already done at construction.
    pub fn resolve(&self, posname: &str) -> NormResult<Resolution> {
        resolve(self.store.as_ref(), posname, self.config.dif_acc)
    }

    /// Resolve with an explicit cutoff.
    ///
    /// # Errors
    /// As [`resolve`].
    pub fn resolve_with(&self, posname: &str, dif_acc: f64) -> NormResult<Resolution> {
        resolve(self.store.as_ref(), posname, dif_acc)
    }

    /// See [`operations::set_alias`].
    ///
    /// # Errors
    /// As [`operations::set_alias`].
    pub fn set_alias(&self, key: &str, canonical_name: &str, priority: u8) -> NormResult<()> {
        operations::set_alias(self.store.as_ref(), key, canonical_name, priority)
    }

    /// See [`operations::delete_alias`].
    ///
    /// # Errors
    /// As [`operations::delete_alias`].
    pub fn delete_alias(&self, key: &str) -> NormResult<bool> {
        operations::delete_alias(self.store.as_ref(), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasEntry;

    fn snapshot(entries: &[(&str, &str)]) -> AliasSnapshot {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), AliasEntry::from_tagged(k, v).unwrap()))
            .collect()
    }

    fn run(snapshot: &AliasSnapshot, raw: &str, dif_acc: f64) -> Resolution {
        cascade(
            snapshot,
            &sanitize(raw).unwrap(),
            Threshold::new(dif_acc).unwrap(),
        )
    }

    fn russia_store() -> AliasSnapshot {
        snapshot(&[
            ("russia", "1Russia"),
            ("moscow", "2Russia"),
            ("deutschland", "1Germany"),
        ])
    }

    #[test]
    fn tier_table_is_ordered() {
        let numbers: Vec<u8> = TIERS.iter().map(|t| t.number).collect();
        assert_eq!(numbers, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn length_rules() {
        assert!(LengthRule::WithinOne.admits(5, 6));
        assert!(LengthRule::WithinOne.admits(6, 5));
        assert!(!LengthRule::WithinOne.admits(4, 6));
        assert!(LengthRule::Exact.admits(4, 4));
        assert!(!LengthRule::Exact.admits(4, 5));
        assert!(LengthRule::Any.admits(1, 40));
    }

    #[test]
    fn exact_key_resolves_at_tier_one() {
        let store = russia_store();
        let found = run(&store, "Russia", 0.7);
        assert_eq!(found.canonical_name(), Some("Russia"));
        assert_eq!(found.tier(), Some(1));
    }

    #[test]
    fn one_letter_typo_resolves_at_tier_one() {
        let store = russia_store();
        let Resolution::Found(found) = run(&store, "Rusia", 0.7) else {
            panic!("expected a match");
        };
        assert_eq!(found.canonical_name, "Russia");
        assert_eq!(found.alias, "russia");
        assert_eq!(found.tier, 1);
        assert!((found.ratio - 10.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn capital_alias_needs_lower_cutoff() {
        let store = russia_store();
        assert_eq!(run(&store, "moskva", 0.7), Resolution::NotFound);

        // "moskva" vs "moscow" scores exactly 0.5
        let found = run(&store, "moskva", 0.45);
        assert_eq!(found.canonical_name(), Some("Russia"));
        assert_eq!(found.tier(), Some(2));
    }

    #[test]
    fn unknown_name_is_not_found() {
        assert_eq!(run(&russia_store(), "Atlantis", 0.7), Resolution::NotFound);
        assert_eq!(run(&AliasSnapshot::default(), "Russia", 0.7), Resolution::NotFound);
    }

    #[test]
    fn trailing_digit_is_tolerated_by_length_rule() {
        let store = snapshot(&[("chad", "1Chad")]);
        // "chad " is one character longer than the key
        let found = run(&store, "Chad2", 0.7);
        assert_eq!(found.canonical_name(), Some("Chad"));
        assert_eq!(found.tier(), Some(1));

        // the zero survives sanitization, but still within one character
        assert_eq!(run(&store, "Chad0", 0.7).tier(), Some(1));
    }

    #[test]
    fn compact_tier_joins_spaced_abbreviations() {
        let store = snapshot(&[("uk", "1United Kingdom")]);
        let found = run(&store, "U. K.", 0.7);
        assert_eq!(found.canonical_name(), Some("United Kingdom"));
        assert_eq!(found.tier(), Some(3));
    }

    #[test]
    fn priority_two_rejected_when_length_differs() {
        let store = snapshot(&[("new york", "2United States"), ("usa", "1United States")]);
        // whole and compact queries prefer "new york" but are too long for it
        let found = run(&store, "New York, USA", 0.7);
        assert_eq!(found.canonical_name(), Some("United States"));
        assert_eq!(found.tier(), Some(5));
    }

    #[test]
    fn priority_one_word_beats_earlier_priority_two_word() {
        let store = snapshot(&[("georgia", "1Georgia"), ("atlanta", "2United States")]);
        let Resolution::Found(found) = run(&store, "Atlanta, Georgia", 0.7) else {
            panic!("expected a match");
        };
        assert_eq!(found.canonical_name, "Georgia");
        assert_eq!(found.alias, "georgia");
        assert_eq!(found.tier, 5);
    }

    #[test]
    fn priority_one_word_of_other_length_at_tier_six() {
        let store = snapshot(&[("argentina", "1Argentina")]);
        let found = run(&store, "Buenos Argentin", 0.7);
        assert_eq!(found.canonical_name(), Some("Argentina"));
        assert_eq!(found.tier(), Some(6));
    }

    #[test]
    fn priority_two_word_tiers() {
        let store = snapshot(&[("paris", "2France"), ("lyonnais", "2France")]);
        assert_eq!(run(&store, "downtown paris", 0.7).tier(), Some(7));
        assert_eq!(run(&store, "greater lyonnai", 0.7).tier(), Some(8));
    }

    #[test]
    fn repeated_spaces_do_not_break_word_tiers() {
        let store = snapshot(&[("peru", "1Peru")]);
        let found = run(&store, "lima -- (peru)", 0.7);
        assert_eq!(found.canonical_name(), Some("Peru"));
        assert_eq!(found.tier(), Some(5));
    }
}
