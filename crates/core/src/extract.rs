//! Pattern-based signal extraction over normalized record text.
//!
//! Each strategy is one capability: given text, return zero or more candidate
//! strings. Strategies are line-oriented regex scanners; which candidate wins
//! is decided by an explicit [`Reducer`], not by the extraction order baked
//! into control flow.

use std::sync::LazyLock;

use regex::Regex;

// ---------------------------------------------------------------------------
// SignalExtractor
// ---------------------------------------------------------------------------

/// One extraction strategy: text in, candidate strings out.
pub trait SignalExtractor: Send + Sync {
    /// Short name for logs and diagnostics.
    fn name(&self) -> &'static str;
    /// Scan `text` and return every candidate, in text order.
    fn extract(&self, text: &str) -> Vec<String>;
}

// ---------------------------------------------------------------------------
// Reducer
// ---------------------------------------------------------------------------

/// How a candidate list collapses to one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    /// Keep the first candidate (year signals: the earliest mention wins).
    FirstWins,
    /// Keep the last candidate (occupations: later sources override, so an
    /// externally fetched description appended last takes precedence).
    LastWins,
}

impl Reducer {
    /// Collapse `candidates` according to this policy.
    pub fn reduce(self, candidates: Vec<String>) -> Option<String> {
        match self {
            Self::FirstWins => candidates.into_iter().next(),
            Self::LastWins => candidates.into_iter().next_back(),
        }
    }
}

// ---------------------------------------------------------------------------
// PatternExtractor
// ---------------------------------------------------------------------------

/// Regex-backed line extractor: capture group 1 of the first match per line.
pub struct PatternExtractor {
    name: &'static str,
    pattern: &'static Regex,
    /// If set, each candidate is truncated at the first occurrence of this
    /// separator (stands in for a lookahead guard in the source patterns).
    cut_at: Option<&'static str>,
}

impl PatternExtractor {
    /// Wrap a pattern whose capture group 1 is the candidate.
    pub fn new(name: &'static str, pattern: &'static Regex) -> Self {
        Self {
            name,
            pattern,
            cut_at: None,
        }
    }

    /// Truncate every candidate at the first occurrence of `separator`.
    pub fn cut_at(mut self, separator: &'static str) -> Self {
        self.cut_at = Some(separator);
        self
    }
}

impl SignalExtractor for PatternExtractor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(&self, text: &str) -> Vec<String> {
        let mut candidates = Vec::new();

        for line in text.lines() {
            if let Some(caps) = self.pattern.captures(line) {
                let Some(m) = caps.get(1) else { continue };
                let mut candidate = m.as_str();
                if let Some(sep) = self.cut_at {
                    if let Some(at) = candidate.find(sep) {
                        candidate = &candidate[..at];
                    }
                }
                if !candidate.is_empty() {
                    candidates.push(candidate.to_string());
                }
            }
        }

        candidates
    }
}

// ---------------------------------------------------------------------------
// Built-in strategies
// ---------------------------------------------------------------------------

// The corpus uses French event markers. Year fields may carry partial dates
// (`1850.06.12`) or negative years, hence the permissive year classes.

static BIRTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([-\d\.]+)\s*/.*?Naissance.+$").expect("valid regex"));

static DEATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([-\d\.]*\d+).+Décès.+$").expect("valid regex"));

static ELECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*[EÉ]lection.*?(?:en tant que|comme|au poste de) ([\w '-]+).*$")
        .expect("valid regex")
});

static NOMINATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*Nomination.*?(?:comme|au titre de) ?([\w '-]+).*$").expect("valid regex")
});

static REFERENCE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Wikidata: (Q\d+).*$").expect("valid regex"));

/// Birth-year signal from `<year> / … Naissance …` lines.
pub fn birth_year() -> PatternExtractor {
    PatternExtractor::new("birth-year", &BIRTH_RE)
}

/// Death-year signal from `<year> … Décès …` lines.
pub fn death_year() -> PatternExtractor {
    PatternExtractor::new("death-year", &DEATH_RE)
}

/// Role from `Élection … en tant que/comme/au poste de <role>` lines.
pub fn election_role() -> PatternExtractor {
    PatternExtractor::new("election-role", &ELECTION_RE)
}

/// Role from `Nomination … comme/au titre de <role>` lines, cut before any
/// trailing `par <authority>` clause.
pub fn nomination_role() -> PatternExtractor {
    PatternExtractor::new("nomination-role", &NOMINATION_RE).cut_at(" par")
}

/// External reference identifier from `Wikidata: Q…` lines.
pub fn reference_id() -> PatternExtractor {
    PatternExtractor::new("reference-id", &REFERENCE_ID_RE)
}

// ---------------------------------------------------------------------------
// ExtractionProfile
// ---------------------------------------------------------------------------

/// The ordered strategy set one resolver run uses.
pub struct ExtractionProfile {
    /// Birth-year strategy, reduced first-wins.
    pub birth: Box<dyn SignalExtractor>,
    /// Death-year strategy, reduced first-wins.
    pub death: Box<dyn SignalExtractor>,
    /// Occupation strategies, concatenated in order.
    pub occupations: Vec<Box<dyn SignalExtractor>>,
    /// How the combined occupation candidates collapse.
    pub occupation_reducer: Reducer,
    /// External reference-id strategy.
    pub reference_id: Box<dyn SignalExtractor>,
}

impl Default for ExtractionProfile {
    /// The French-corpus strategy set, occupation tie-break last-wins so a
    /// knowledge-base description appended after the pattern candidates
    /// overrides them.
    fn default() -> Self {
        Self {
            birth: Box::new(birth_year()),
            death: Box::new(death_year()),
            occupations: vec![Box::new(nomination_role()), Box::new(election_role())],
            occupation_reducer: Reducer::LastWins,
            reference_id: Box::new(reference_id()),
        }
    }
}
