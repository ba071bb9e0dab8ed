//! Core domain types for biograph.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Person
// ---------------------------------------------------------------------------

/// A candidate resolved into a biographical person.
///
/// Immutable once constructed. Years are kept as the strings the corpus
/// carries (they may be partial dates like `1850.06` or negative years), so
/// rendering reproduces them byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Candidate name, exactly as it appears in the corpus title.
    pub name: String,
    /// Birth-year signal, if one was extracted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth: Option<String>,
    /// Death-year signal, if one was extracted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death: Option<String>,
    /// Occupation (pattern-derived or knowledge-base description).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
}

impl Person {
    /// Build a `Person` from extracted signals.
    ///
    /// Returns `None` when no signal is present at all — a record with
    /// neither birth, death, nor occupation is not considered a person.
    pub fn from_signals(
        name: impl Into<String>,
        birth: Option<String>,
        death: Option<String>,
        occupation: Option<String>,
    ) -> Option<Self> {
        if birth.is_none() && death.is_none() && occupation.is_none() {
            return None;
        }
        Some(Self {
            name: name.into(),
            birth,
            death,
            occupation,
        })
    }
}

// ---------------------------------------------------------------------------
// HomonymGroup
// ---------------------------------------------------------------------------

/// A confirmed set of ≥ 2 distinct people sharing a name.
///
/// `people` preserves the original candidate-name order. Construction goes
/// through the assembler, which silently drops groups of ≤ 1 person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomonymGroup {
    /// The shared name this group disambiguates.
    pub label: String,
    /// Title of the disambiguation page to write.
    pub destination_title: String,
    /// Resolved people, in original candidate order.
    pub people: Vec<Person>,
}

// ---------------------------------------------------------------------------
// NameGroup
// ---------------------------------------------------------------------------

/// One input name-group: a label and the candidate titles suspected to
/// denote distinct people sharing that name.
///
/// The groups file is a JSON array of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameGroup {
    /// The shared name (becomes the group label).
    pub label: String,
    /// Candidate corpus titles, in curation order.
    pub names: Vec<String>,
}
