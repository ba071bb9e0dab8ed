//! Disambiguation-page assembly and rendering.
//!
//! `assemble` applies the acceptance rule (≥ 2 people or no group), `render`
//! produces the page body. The output format is consumed downstream as-is,
//! so its punctuation — including the non-breaking space before the en
//! dash — must not drift.

use tracing::debug;

use biograph_shared::{HomonymGroup, Person};

/// Build an accepted homonym group, or nothing for ≤ 1 person.
///
/// Dropping small groups is silent and intentional: a name with at most one
/// resolved person needs no disambiguation page.
pub fn assemble(label: &str, people: Vec<Person>) -> Option<HomonymGroup> {
    if people.len() <= 1 {
        debug!(label, resolved = people.len(), "not enough people for a group");
        return None;
    }

    Some(HomonymGroup {
        label: label.to_string(),
        destination_title: format!("{label} (homonymie)"),
        people,
    })
}

/// Render a group into its disambiguation-page body.
///
/// One line per person: link marker, then ` ({birth}\u{a0}– {death})` when
/// the birth year is known (death left blank otherwise, parentheses kept),
/// then `, {occupation}` when one is known.
pub fn render(group: &HomonymGroup) -> String {
    let mut output = String::new();
    output.push_str(&format!("[[{}]] peut désigner :\n", group.label));

    for person in &group.people {
        output.push_str(&format!("* [[{}]]", person.name));

        if let Some(birth) = &person.birth {
            let death = person.death.as_deref().unwrap_or_default();
            output.push_str(&format!(" ({birth}\u{a0}– {death})"));
        }

        if let Some(occupation) = &person.occupation {
            output.push_str(&format!(", {occupation}"));
        }

        output.push('\n');
    }

    output
}
