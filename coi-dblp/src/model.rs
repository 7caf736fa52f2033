//! Core data model shared by the indexer, resolver and matcher

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Key prefix marking a dblp person page rather than a publication
pub const HOMEPAGE_PREFIX: &str = "homepages/";

/// One bibliographic record as read from the corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Unique, stable record key (e.g. `conf/sigir/Smith20`)
    pub key: String,
    /// Author display names in document order
    pub authors: Vec<String>,
    /// Publication year, when present and numeric
    pub year: Option<i32>,
    /// Record is a disambiguation aggregator (`publtype="disambiguation"`)
    pub disambiguation: bool,
}

/// Identifier of one disambiguated person (dblp pid, e.g. `123/4567`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the id from a `homepages/` key; `None` for any other key
    pub fn from_homepage_key(key: &str) -> Option<Self> {
        key.strip_prefix(HOMEPAGE_PREFIX)
            .filter(|rest| !rest.is_empty())
            .map(|rest| Self(rest.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// dblp profile page for this person
    pub fn profile_url(&self, base_url: &str) -> String {
        format!("{}/pid/{}.html", base_url.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CanonicalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Person or submission number from a roster
///
/// Numbers compare numerically when both sides parse as integers, so
/// submission 9 sorts before submission 10. Anything else falls back to
/// plain string order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RosterNumber(String);

impl RosterNumber {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for RosterNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<u64>(), other.0.parse::<u64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for RosterNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RosterNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RosterNumber {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Reviewing committee member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitteeEntry {
    pub person: RosterNumber,
    pub name: String,
    pub dblp_id: Option<CanonicalId>,
    pub affiliation: String,
    pub country: String,
}

/// One author of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionAuthorEntry {
    pub submission: RosterNumber,
    pub name: String,
    pub dblp_id: Option<CanonicalId>,
    pub affiliation: String,
    pub country: String,
}

/// Candidate person returned by a disambiguation page or author search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CanonicalId,
    pub display_name: String,
    pub affiliations: Vec<String>,
}

impl Candidate {
    /// Case-insensitive substring match of `affiliation` against any listed
    /// affiliation
    pub fn matches_affiliation(&self, affiliation: &str) -> bool {
        let needle = affiliation.to_lowercase();
        self.affiliations
            .iter()
            .any(|a| a.to_lowercase().contains(&needle))
    }
}

/// Shared publication justifying a conflict
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Justification {
    pub publication: String,
    pub author_name: String,
}

impl fmt::Display for Justification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with {}", self.publication, self.author_name)
    }
}

/// Conflict between one submission and one committee member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRecord {
    pub submission: RosterNumber,
    pub member: RosterNumber,
    pub justifications: Vec<Justification>,
}

impl ConflictRecord {
    /// `"; "`-joined justification list as written to the report
    pub fn details(&self) -> String {
        self.justifications
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_id_from_homepage_key() {
        assert_eq!(
            CanonicalId::from_homepage_key("homepages/123/456"),
            Some(CanonicalId::new("123/456"))
        );
        assert_eq!(CanonicalId::from_homepage_key("conf/sigir/X20"), None);
        assert_eq!(CanonicalId::from_homepage_key("homepages/"), None);
    }

    #[test]
    fn test_roster_numbers_sort_numerically() {
        let mut numbers: Vec<RosterNumber> =
            ["10", "9", "x", "100", "2"].iter().map(|s| RosterNumber::from(*s)).collect();
        numbers.sort();
        let sorted: Vec<&str> = numbers.iter().map(RosterNumber::as_str).collect();
        assert_eq!(sorted, vec!["2", "9", "10", "100", "x"]);
    }

    #[test]
    fn test_affiliation_match_is_case_insensitive_substring() {
        let candidate = Candidate {
            id: CanonicalId::new("1/2"),
            display_name: "J. Lee".to_string(),
            affiliations: vec!["ACME University, Springfield".to_string()],
        };
        assert!(candidate.matches_affiliation("acme univ"));
        assert!(!candidate.matches_affiliation("Other Univ"));
    }

    #[test]
    fn test_conflict_details_format() {
        let record = ConflictRecord {
            submission: RosterNumber::from("1"),
            member: RosterNumber::from("7"),
            justifications: vec![
                Justification {
                    publication: "p1".to_string(),
                    author_name: "Bob Jones".to_string(),
                },
                Justification {
                    publication: "p2".to_string(),
                    author_name: "Bob Jones".to_string(),
                },
            ],
        };
        assert_eq!(record.details(), "p1 with Bob Jones; p2 with Bob Jones");
    }
}
