//! Cross-group run orchestration.
//!
//! Every name-group is submitted eagerly; the only global throttle is the
//! shared rate-limited description source the resolver carries. Groups
//! complete in whatever order the corpus and the network dictate, progress
//! is reported per completion, and the accepted groups are re-ordered to
//! match the input before they are returned.

use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use biograph_shared::{HomonymGroup, NameGroup};

use crate::resolver::Resolver;

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called after each group completes (in completion order, not input
    /// order). `completed` only ever grows.
    fn group_completed(&self, completed: usize, total: usize, label: &str, accepted: bool);
    /// Called once when the whole run is finished.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn group_completed(&self, _completed: usize, _total: usize, _label: &str, _accepted: bool) {}
    fn done(&self, _summary: &RunSummary) {}
}

// ---------------------------------------------------------------------------
// Run outcome
// ---------------------------------------------------------------------------

/// Final counts for a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Name-groups processed (accepted or not).
    pub groups_processed: usize,
    /// Groups that passed the ≥ 2 people acceptance rule.
    pub groups_accepted: usize,
    /// People across all accepted groups.
    pub people_resolved: usize,
}

/// Result of [`run_groups`]: the accepted groups plus the summary.
#[derive(Debug)]
pub struct RunOutcome {
    /// Accepted groups, in input order.
    pub groups: Vec<HomonymGroup>,
    /// Run totals.
    pub summary: RunSummary,
}

// ---------------------------------------------------------------------------
// Run driver
// ---------------------------------------------------------------------------

/// Process every group concurrently and gather the accepted ones.
///
/// A group whose task fails is logged and counted as not accepted; sibling
/// groups are unaffected.
#[instrument(skip_all, fields(groups = groups.len()))]
pub async fn run_groups(
    resolver: &Resolver,
    groups: Vec<NameGroup>,
    progress: &dyn ProgressReporter,
) -> RunOutcome {
    let total = groups.len();
    let mut tasks = JoinSet::new();

    for (index, group) in groups.into_iter().enumerate() {
        let resolver = resolver.clone();
        tasks.spawn(async move {
            let outcome = resolver.process_group(&group).await;
            (index, group.label, outcome)
        });
    }

    let mut accepted: Vec<(usize, HomonymGroup)> = Vec::new();
    let mut completed = 0usize;

    while let Some(joined) = tasks.join_next().await {
        completed += 1;
        match joined {
            Ok((index, label, outcome)) => {
                progress.group_completed(completed, total, &label, outcome.is_some());
                if let Some(group) = outcome {
                    accepted.push((index, group));
                }
            }
            Err(e) => {
                warn!(error = %e, "group task failed");
            }
        }
    }

    // Completion order is nondeterministic; hand results back in input order.
    accepted.sort_by_key(|(index, _)| *index);
    let groups: Vec<HomonymGroup> = accepted.into_iter().map(|(_, group)| group).collect();

    let summary = RunSummary {
        groups_processed: total,
        groups_accepted: groups.len(),
        people_resolved: groups.iter().map(|g| g.people.len()).sum(),
    };

    info!(
        processed = summary.groups_processed,
        accepted = summary.groups_accepted,
        people = summary.people_resolved,
        "run complete"
    );

    progress.done(&summary);

    RunOutcome { groups, summary }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::extract::ExtractionProfile;

    use biograph_corpus::{CorpusRecord, TitleLookup};
    use biograph_knowledge::{DescriptionSource, FetchOutcome};
    use biograph_shared::Result;

    struct FakeStore(HashMap<String, String>);

    impl FakeStore {
        fn new(records: &[(&str, &str)]) -> Self {
            Self(
                records
                    .iter()
                    .map(|(t, x)| (t.to_string(), x.to_string()))
                    .collect(),
            )
        }
    }

    impl TitleLookup for FakeStore {
        fn lookup(&self, title: &str) -> Result<Option<CorpusRecord>> {
            Ok(self.0.get(title).map(|text| CorpusRecord {
                title: title.to_string(),
                text: text.clone(),
                extra: serde_json::Map::new(),
            }))
        }
    }

    struct NoSource;

    #[async_trait]
    impl DescriptionSource for NoSource {
        async fn describe(&self, _id: &str) -> FetchOutcome {
            FetchOutcome::NotFound
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        completions: Mutex<Vec<(usize, bool)>>,
        summary: Mutex<Option<RunSummary>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn group_completed(&self, completed: usize, _total: usize, _label: &str, accepted: bool) {
            self.completions.lock().unwrap().push((completed, accepted));
        }

        fn done(&self, summary: &RunSummary) {
            *self.summary.lock().unwrap() = Some(summary.clone());
        }
    }

    fn group(label: &str, names: &[&str]) -> NameGroup {
        NameGroup {
            label: label.into(),
            names: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn accepted_groups_come_back_in_input_order() {
        let store = Arc::new(FakeStore::new(&[
            ("A1", "1850 / Naissance de A."),
            ("A2", "1851 / Naissance de A."),
            ("C1", "1870 / Naissance de C."),
            ("C2", "1871 / Naissance de C."),
        ]));
        let resolver = Resolver::new(store, ExtractionProfile::default(), Arc::new(NoSource));

        let groups = vec![
            group("Alpha", &["A1", "A2"]),
            group("Beta", &["B1", "B2"]),
            group("Gamma", &["C1", "C2"]),
        ];

        let progress = RecordingProgress::default();
        let outcome = run_groups(&resolver, groups, &progress).await;

        let labels: Vec<&str> = outcome.groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Alpha", "Gamma"]);
        assert_eq!(
            outcome.summary,
            RunSummary {
                groups_processed: 3,
                groups_accepted: 2,
                people_resolved: 4,
            }
        );
    }

    #[tokio::test]
    async fn progress_counter_is_monotonic_under_unordered_completion() {
        let store = Arc::new(FakeStore::new(&[]));
        let resolver = Resolver::new(store, ExtractionProfile::default(), Arc::new(NoSource));

        let groups: Vec<NameGroup> = (0..16)
            .map(|i| group(&format!("G{i}"), &["x", "y"]))
            .collect();

        let progress = RecordingProgress::default();
        run_groups(&resolver, groups, &progress).await;

        let completions = progress.completions.lock().unwrap().clone();
        let counts: Vec<usize> = completions.iter().map(|(c, _)| *c).collect();
        assert_eq!(counts, (1..=16).collect::<Vec<_>>());
        assert!(completions.iter().all(|(_, accepted)| !accepted));

        let summary = progress.summary.lock().unwrap().clone().expect("done called");
        assert_eq!(summary.groups_accepted, 0);
    }

    #[tokio::test]
    async fn empty_run_still_reports_a_summary() {
        let store = Arc::new(FakeStore::new(&[]));
        let resolver = Resolver::new(store, ExtractionProfile::default(), Arc::new(NoSource));

        let progress = RecordingProgress::default();
        let outcome = run_groups(&resolver, vec![], &progress).await;

        assert!(outcome.groups.is_empty());
        assert_eq!(outcome.summary.groups_processed, 0);
        assert!(progress.summary.lock().unwrap().is_some());
    }
}
