//! Name resolution and per-group orchestration.
//!
//! [`Resolver::resolve_one`] turns a candidate name into a [`Person`] (or
//! nothing), and [`Resolver::process_group`] drives one name-group: all names
//! but the last resolve concurrently, the last resolves only if at least one
//! of the others did. A group of homonyms needs ≥ 2 people, so when the first
//! N−1 names all came up empty the last lookup cannot change the outcome and
//! its external calls are saved.
//!
//! Every failure mode of a single resolution — title absent from the corpus,
//! store read error, throttled or failing knowledge-base call — degrades that
//! one name to "not resolved" and never aborts siblings or the group.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use biograph_corpus::{TitleLookup, text};
use biograph_knowledge::{DescriptionCache, DescriptionSource};
use biograph_shared::{HomonymGroup, NameGroup, Person};

use crate::assembler;
use crate::extract::{ExtractionProfile, Reducer};

/// Resolves candidate names against the corpus and the knowledge base.
///
/// Cheap to clone; clones share the store, the strategy set, and the
/// rate-limited description source.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn TitleLookup>,
    profile: Arc<ExtractionProfile>,
    source: Arc<dyn DescriptionSource>,
}

impl Resolver {
    /// Build a resolver over a title store and a description source.
    pub fn new(
        store: Arc<dyn TitleLookup>,
        profile: ExtractionProfile,
        source: Arc<dyn DescriptionSource>,
    ) -> Self {
        Self {
            store,
            profile: Arc::new(profile),
            source,
        }
    }

    /// Resolve one candidate name into a person, if its record carries at
    /// least one biographical signal.
    ///
    /// `cache` is the owning group's description cache; an external reference
    /// id found in the record is looked up through it, and the returned
    /// description is appended after the pattern-derived occupation
    /// candidates so the occupation reducer lets it win.
    pub async fn resolve_one(&self, name: &str, cache: &DescriptionCache) -> Option<Person> {
        let record = match self.store.lookup(name) {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                warn!(name, error = %e, "store lookup failed; treating name as unresolved");
                return None;
            }
        };

        let text = text::normalize(&record.text);

        let birth = Reducer::FirstWins.reduce(self.profile.birth.extract(&text));
        let death = Reducer::FirstWins.reduce(self.profile.death.extract(&text));

        let mut occupations: Vec<String> = self
            .profile
            .occupations
            .iter()
            .flat_map(|strategy| strategy.extract(&text))
            .collect();

        if let Some(id) = Reducer::FirstWins.reduce(self.profile.reference_id.extract(&text)) {
            if let Some(description) = cache.get_or_fetch(&id, self.source.as_ref()).await {
                occupations.push(description);
            }
        }

        let occupation = self.profile.occupation_reducer.reduce(occupations);

        Person::from_signals(name, birth, death, occupation)
    }

    /// Process one name-group into an accepted homonym group, or nothing.
    ///
    /// All names except the last resolve concurrently (results are mapped
    /// back to their original positions); the last name resolves only when
    /// at least one earlier name did. The group is accepted when more than
    /// one person resolved in total, preserving original candidate order.
    #[instrument(skip_all, fields(label = %group.label, names = group.names.len()))]
    pub async fn process_group(&self, group: &NameGroup) -> Option<HomonymGroup> {
        if group.names.is_empty() {
            return None;
        }

        let cache = Arc::new(DescriptionCache::new());
        let (head, last) = group.names.split_at(group.names.len() - 1);

        let mut resolved: Vec<Option<Person>> = vec![None; group.names.len()];
        let mut tasks = JoinSet::new();

        for (position, name) in head.iter().enumerate() {
            let resolver = self.clone();
            let cache = Arc::clone(&cache);
            let name = name.clone();
            tasks.spawn(async move {
                let person = resolver.resolve_one(&name, &cache).await;
                (position, person)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, person)) => resolved[position] = person,
                Err(e) => warn!(label = %group.label, error = %e, "resolution task failed"),
            }
        }

        let head_count = resolved.iter().flatten().count();

        if head_count >= 1 {
            let position = group.names.len() - 1;
            resolved[position] = self.resolve_one(&last[0], &cache).await;
        } else {
            debug!(
                label = %group.label,
                "no person among the first names; skipping the last lookup"
            );
        }

        let people: Vec<Person> = resolved.into_iter().flatten().collect();

        assembler::assemble(&group.label, people)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use biograph_corpus::CorpusRecord;
    use biograph_knowledge::FetchOutcome;
    use biograph_shared::Result;

    /// In-memory store double recording which titles were looked up.
    struct FakeStore {
        records: HashMap<String, String>,
        lookups: Mutex<Vec<String>>,
    }

    impl FakeStore {
        fn new(records: &[(&str, &str)]) -> Self {
            Self {
                records: records
                    .iter()
                    .map(|(t, x)| (t.to_string(), x.to_string()))
                    .collect(),
                lookups: Mutex::new(Vec::new()),
            }
        }

        fn lookups(&self) -> Vec<String> {
            self.lookups.lock().unwrap().clone()
        }
    }

    impl TitleLookup for FakeStore {
        fn lookup(&self, title: &str) -> Result<Option<CorpusRecord>> {
            self.lookups.lock().unwrap().push(title.to_string());
            Ok(self.records.get(title).map(|text| CorpusRecord {
                title: title.to_string(),
                text: text.clone(),
                extra: serde_json::Map::new(),
            }))
        }
    }

    /// Description source double with a fixed outcome and a call counter.
    struct FixedSource {
        outcome: FetchOutcome,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(outcome: FetchOutcome) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DescriptionSource for FixedSource {
        async fn describe(&self, _id: &str) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn resolver_over(
        store: Arc<FakeStore>,
        source: Arc<FixedSource>,
    ) -> Resolver {
        Resolver::new(store, ExtractionProfile::default(), source)
    }

    const BIO: &str = "1850 / Naissance de X à Paris.\n1920 / Décès de X à Lyon.";

    #[tokio::test]
    async fn resolve_one_builds_a_person_from_signals() {
        let store = Arc::new(FakeStore::new(&[("Jean Dupont", BIO)]));
        let source = Arc::new(FixedSource::new(FetchOutcome::NotFound));
        let resolver = resolver_over(store, source);

        let cache = DescriptionCache::new();
        let person = resolver
            .resolve_one("Jean Dupont", &cache)
            .await
            .expect("resolved");
        assert_eq!(person.birth.as_deref(), Some("1850"));
        assert_eq!(person.death.as_deref(), Some("1920"));
        assert!(person.occupation.is_none());
    }

    #[tokio::test]
    async fn signal_free_records_are_not_people() {
        let store = Arc::new(FakeStore::new(&[(
            "Place Jean Dupont",
            "Une place de Lyon, inaugurée en 1930.",
        )]));
        let source = Arc::new(FixedSource::new(FetchOutcome::NotFound));
        let resolver = resolver_over(store, source);

        let cache = DescriptionCache::new();
        assert!(resolver.resolve_one("Place Jean Dupont", &cache).await.is_none());
    }

    #[tokio::test]
    async fn external_description_wins_the_occupation_tiebreak() {
        let text = "1880 / Nomination de X comme directeur par le conseil.\nWikidata: Q42";
        let store = Arc::new(FakeStore::new(&[("X", text)]));
        let source = Arc::new(FixedSource::new(FetchOutcome::Found("écrivain".into())));
        let resolver = resolver_over(store, Arc::clone(&source));

        let cache = DescriptionCache::new();
        let person = resolver.resolve_one("X", &cache).await.expect("resolved");
        assert_eq!(person.occupation.as_deref(), Some("écrivain"));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn throttled_description_degrades_to_pattern_signals() {
        let text = "1850 / Naissance de X.\nWikidata: Q42";
        let store = Arc::new(FakeStore::new(&[("X", text)]));
        let source = Arc::new(FixedSource::new(FetchOutcome::Throttled));
        let resolver = resolver_over(store, source);

        let cache = DescriptionCache::new();
        let person = resolver.resolve_one("X", &cache).await.expect("resolved");
        assert_eq!(person.birth.as_deref(), Some("1850"));
        assert!(person.occupation.is_none(), "description must degrade to absent");
    }

    #[tokio::test]
    async fn pattern_occupation_survives_a_failing_knowledge_base() {
        let text = "1871 / Élection de X comme maire.\nWikidata: Q42";
        let store = Arc::new(FakeStore::new(&[("X", text)]));
        let source = Arc::new(FixedSource::new(FetchOutcome::ServiceError("boom".into())));
        let resolver = resolver_over(store, source);

        let cache = DescriptionCache::new();
        let person = resolver.resolve_one("X", &cache).await.expect("resolved");
        assert_eq!(person.occupation.as_deref(), Some("maire"));
    }

    #[tokio::test]
    async fn group_short_circuits_when_nothing_resolved_early() {
        // "A" and "B" are absent; the group can never reach two people, so
        // "C" must not even be looked up.
        let store = Arc::new(FakeStore::new(&[("C", BIO)]));
        let source = Arc::new(FixedSource::new(FetchOutcome::NotFound));
        let resolver = resolver_over(Arc::clone(&store), source);

        let group = NameGroup {
            label: "Jean Dupont".into(),
            names: vec!["A".into(), "B".into(), "C".into()],
        };
        assert!(resolver.process_group(&group).await.is_none());

        let lookups = store.lookups();
        assert!(lookups.contains(&"A".to_string()));
        assert!(lookups.contains(&"B".to_string()));
        assert!(
            !lookups.contains(&"C".to_string()),
            "the last name must not be resolved when the head resolved nothing"
        );
    }

    #[tokio::test]
    async fn group_resolves_the_last_name_once_one_head_resolved() {
        let store = Arc::new(FakeStore::new(&[
            ("B", "1850 / Naissance de B."),
            ("C", "1860 / Naissance de C."),
        ]));
        let source = Arc::new(FixedSource::new(FetchOutcome::NotFound));
        let resolver = resolver_over(Arc::clone(&store), source);

        let group = NameGroup {
            label: "Jean Dupont".into(),
            names: vec!["A".into(), "B".into(), "C".into()],
        };
        let homonyms = resolver.process_group(&group).await.expect("accepted");

        // Original relative order, absent names filtered out.
        let names: Vec<&str> = homonyms.people.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
        assert_eq!(homonyms.label, "Jean Dupont");
    }

    #[tokio::test]
    async fn single_person_groups_are_silently_dropped() {
        let store = Arc::new(FakeStore::new(&[("B", BIO)]));
        let source = Arc::new(FixedSource::new(FetchOutcome::NotFound));
        let resolver = resolver_over(Arc::clone(&store), source);

        let group = NameGroup {
            label: "Jean Dupont".into(),
            names: vec!["B".into(), "A".into()],
        };
        assert!(resolver.process_group(&group).await.is_none());
        // "B" resolved, so the last name was attempted — and still no group.
        let lookups = store.lookups();
        assert!(lookups.contains(&"A".to_string()));
        assert!(lookups.contains(&"B".to_string()));
    }

    #[tokio::test]
    async fn empty_and_singleton_groups_resolve_nothing() {
        let store = Arc::new(FakeStore::new(&[("Solo", BIO)]));
        let source = Arc::new(FixedSource::new(FetchOutcome::NotFound));
        let resolver = resolver_over(Arc::clone(&store), source);

        let empty = NameGroup {
            label: "Nobody".into(),
            names: vec![],
        };
        assert!(resolver.process_group(&empty).await.is_none());

        // A one-name group cannot reach two people; its only name is the
        // last one and the head count is zero, so it is never looked up.
        let singleton = NameGroup {
            label: "Solo".into(),
            names: vec!["Solo".into()],
        };
        assert!(resolver.process_group(&singleton).await.is_none());
        assert!(store.lookups().is_empty());
    }

    #[tokio::test]
    async fn duplicate_reference_ids_share_one_fetch_within_a_group() {
        let text_b = "1850 / Naissance de B.\nWikidata: Q42";
        let text_c = "1860 / Naissance de C.\nWikidata: Q42";
        let store = Arc::new(FakeStore::new(&[("B", text_b), ("C", text_c)]));
        let source = Arc::new(FixedSource::new(FetchOutcome::Found("peintre".into())));
        let resolver = resolver_over(store, Arc::clone(&source));

        let group = NameGroup {
            label: "X".into(),
            names: vec!["B".into(), "C".into()],
        };
        let homonyms = resolver.process_group(&group).await.expect("accepted");
        assert_eq!(homonyms.people.len(), 2);
        assert_eq!(source.calls(), 1, "same id within one group must coalesce");
    }
}
