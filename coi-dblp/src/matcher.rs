//! Conflict matching
//!
//! A conflict exists between a submission and a committee member when one
//! of the submission's resolved authors shares a publication with the
//! member. Publications are attributed to people through the snapshot's
//! name→id map, so every name variant carrying the same homepage id
//! contributes.

use crate::model::{
    CanonicalId, CommitteeEntry, ConflictRecord, Justification, RosterNumber,
    SubmissionAuthorEntry,
};
use crate::snapshot::CorpusSnapshot;
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

type ConflictKey = (RosterNumber, RosterNumber);

/// Person id → publications, built from the snapshot's name→id map
struct PublicationIndex<'a> {
    snapshot: &'a CorpusSnapshot,
    names_by_id: HashMap<&'a CanonicalId, Vec<&'a str>>,
}

impl<'a> PublicationIndex<'a> {
    fn new(snapshot: &'a CorpusSnapshot) -> Self {
        let mut names_by_id: HashMap<&CanonicalId, Vec<&str>> = HashMap::new();
        for (name, id) in snapshot.author_ids() {
            names_by_id.entry(id).or_default().push(name.as_str());
        }
        Self {
            snapshot,
            names_by_id,
        }
    }

    /// Union of publications of every name mapped to `id`, first-seen order
    fn publications(&self, id: &CanonicalId) -> IndexSet<&'a str> {
        let mut pubs = IndexSet::new();
        if let Some(names) = self.names_by_id.get(id) {
            for name in names {
                pubs.extend(self.snapshot.publications_of(name).iter().map(String::as_str));
            }
        }
        pubs
    }

    /// Ids of the resolved authors of `publication`
    fn authors(&self, publication: &str) -> IndexSet<&'a CanonicalId> {
        self.snapshot
            .authors_of(publication)
            .iter()
            .filter_map(|name| self.snapshot.author_ids().get(name))
            .collect()
    }
}

/// Committee id → person number; the first row for an id wins
fn committee_ids(committee: &[CommitteeEntry]) -> HashMap<&CanonicalId, &RosterNumber> {
    let mut ids = HashMap::new();
    for entry in committee {
        let Some(id) = entry.dblp_id.as_ref() else {
            continue;
        };
        if let Some(existing) = ids.get(id) {
            warn!(
                id = %id,
                kept = %existing,
                ignored = %entry.person,
                "dblp id listed for more than one committee member"
            );
            continue;
        }
        ids.insert(id, &entry.person);
    }
    ids
}

/// Find every submission/committee conflict
///
/// Output is sorted by (submission number, member number); justifications
/// keep the order they were found in and never repeat.
pub fn find_conflicts(
    committee: &[CommitteeEntry],
    submissions: &[SubmissionAuthorEntry],
    snapshot: &CorpusSnapshot,
) -> Vec<ConflictRecord> {
    let index = PublicationIndex::new(snapshot);
    let members = committee_ids(committee);

    let found: Vec<Vec<(ConflictKey, Justification)>> = submissions
        .par_iter()
        .map(|author| {
            let Some(id) = author.dblp_id.as_ref() else {
                return Vec::new();
            };

            let mut hits = Vec::new();
            for publication in index.publications(id) {
                for coauthor in index.authors(publication) {
                    if let Some(member) = members.get(coauthor) {
                        hits.push((
                            (author.submission.clone(), (*member).clone()),
                            Justification {
                                publication: publication.to_string(),
                                author_name: author.name.clone(),
                            },
                        ));
                    }
                }
            }
            hits
        })
        .collect();

    let mut conflicts: BTreeMap<ConflictKey, IndexSet<Justification>> = BTreeMap::new();
    for (key, justification) in found.into_iter().flatten() {
        conflicts.entry(key).or_default().insert(justification);
    }

    let skipped = submissions.iter().filter(|a| a.dblp_id.is_none()).count();
    if skipped > 0 {
        debug!(skipped, "Submission authors without dblp id ignored");
    }
    info!(
        conflicts = conflicts.len(),
        authors = submissions.len(),
        members = members.len(),
        "Conflict matching complete"
    );

    conflicts
        .into_iter()
        .map(|((submission, member), justifications)| ConflictRecord {
            submission,
            member,
            justifications: justifications.into_iter().collect(),
        })
        .collect()
}

/// Conflicts grouped by committee member, in member order
pub fn conflicts_by_member(
    records: &[ConflictRecord],
) -> IndexMap<&RosterNumber, Vec<&RosterNumber>> {
    let mut sorted: Vec<&ConflictRecord> = records.iter().collect();
    sorted.sort_by(|a, b| (&a.member, &a.submission).cmp(&(&b.member, &b.submission)));

    let mut grouped: IndexMap<&RosterNumber, Vec<&RosterNumber>> = IndexMap::new();
    for record in sorted {
        grouped.entry(&record.member).or_default().push(&record.submission);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::AdjacencyMap;

    fn adjacency(entries: &[(&str, &[&str])]) -> AdjacencyMap {
        entries
            .iter()
            .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    /// Alice and Bob co-wrote p1; Bob alone wrote p2; Carol wrote p3.
    fn snapshot() -> CorpusSnapshot {
        let author_pubs = adjacency(&[
            ("Alice Smith", &["homepages/a/1", "p1"]),
            ("Bob Jones", &["homepages/b/2", "p1", "p2"]),
            ("Carol White", &["homepages/c/3", "p3"]),
        ]);
        let pub_authors = adjacency(&[
            ("homepages/a/1", &["Alice Smith"]),
            ("homepages/b/2", &["Bob Jones"]),
            ("homepages/c/3", &["Carol White"]),
            ("p1", &["Alice Smith", "Bob Jones"]),
            ("p2", &["Bob Jones"]),
            ("p3", &["Carol White"]),
        ]);
        CorpusSnapshot::new(author_pubs, pub_authors, IndexMap::new())
    }

    fn member(person: &str, name: &str, id: Option<&str>) -> CommitteeEntry {
        CommitteeEntry {
            person: RosterNumber::from(person),
            name: name.to_string(),
            dblp_id: id.map(CanonicalId::from),
            affiliation: String::new(),
            country: String::new(),
        }
    }

    fn author(submission: &str, name: &str, id: Option<&str>) -> SubmissionAuthorEntry {
        SubmissionAuthorEntry {
            submission: RosterNumber::from(submission),
            name: name.to_string(),
            dblp_id: id.map(CanonicalId::from),
            affiliation: String::new(),
            country: String::new(),
        }
    }

    #[test]
    fn test_direct_conflict() {
        let committee = vec![member("7", "Alice Smith", Some("a/1"))];
        let submissions = vec![author("3", "Bob Jones", Some("b/2"))];

        let conflicts = find_conflicts(&committee, &submissions, &snapshot());
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].submission, RosterNumber::from("3"));
        assert_eq!(conflicts[0].member, RosterNumber::from("7"));
        assert_eq!(conflicts[0].details(), "p1 with Bob Jones");
    }

    #[test]
    fn test_unresolved_authors_are_ignored() {
        let committee = vec![member("7", "Alice Smith", Some("a/1"))];
        let submissions = vec![author("3", "Bob Jones", None)];
        assert!(find_conflicts(&committee, &submissions, &snapshot()).is_empty());
    }

    #[test]
    fn test_no_shared_publication_no_conflict() {
        let committee = vec![member("7", "Carol White", Some("c/3"))];
        let submissions = vec![author("3", "Bob Jones", Some("b/2"))];
        assert!(find_conflicts(&committee, &submissions, &snapshot()).is_empty());
    }

    #[test]
    fn test_output_sorted_and_order_independent() {
        let committee = vec![
            member("7", "Alice Smith", Some("a/1")),
            member("2", "Bob Jones", Some("b/2")),
        ];
        let submissions = vec![
            author("10", "Bob Jones", Some("b/2")),
            author("9", "Alice Smith", Some("a/1")),
        ];

        let forward = find_conflicts(&committee, &submissions, &snapshot());
        let mut committee_rev = committee.clone();
        committee_rev.reverse();
        let mut submissions_rev = submissions.clone();
        submissions_rev.reverse();
        let backward = find_conflicts(&committee_rev, &submissions_rev, &snapshot());

        assert_eq!(forward, backward);
        let keys: Vec<(&str, &str)> = forward
            .iter()
            .map(|r| (r.submission.as_str(), r.member.as_str()))
            .collect();
        assert_eq!(keys, vec![("9", "2"), ("9", "7"), ("10", "2"), ("10", "7")]);
    }

    #[test]
    fn test_duplicate_committee_id_keeps_first_row() {
        let committee = vec![
            member("7", "Alice Smith", Some("a/1")),
            member("8", "A. Smith", Some("a/1")),
        ];
        let submissions = vec![author("3", "Bob Jones", Some("b/2"))];
        let conflicts = find_conflicts(&committee, &submissions, &snapshot());
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].member, RosterNumber::from("7"));
    }

    #[test]
    fn test_repeated_author_rows_do_not_repeat_justifications() {
        let committee = vec![member("7", "Alice Smith", Some("a/1"))];
        let submissions = vec![
            author("3", "Bob Jones", Some("b/2")),
            author("3", "Bob Jones", Some("b/2")),
        ];
        let conflicts = find_conflicts(&committee, &submissions, &snapshot());
        assert_eq!(conflicts[0].justifications.len(), 1);
    }

    #[test]
    fn test_conflicts_by_member() {
        let committee = vec![
            member("7", "Alice Smith", Some("a/1")),
            member("2", "Bob Jones", Some("b/2")),
        ];
        let submissions = vec![author("4", "Bob Jones", Some("b/2"))];
        let conflicts = find_conflicts(&committee, &submissions, &snapshot());
        let grouped = conflicts_by_member(&conflicts);
        let members: Vec<&str> = grouped.keys().map(|m| m.as_str()).collect();
        assert_eq!(members, vec!["2", "7"]);
    }
}
