//! Candidate list reduction

use crate::model::Candidate;

/// Result of narrowing a candidate list without human input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reduction {
    /// No candidates at all
    Empty,
    /// A single candidate, either the only one or the only affiliation match
    Selected(Candidate),
    /// Still ambiguous; carries the full, unfiltered list
    Ambiguous(Vec<Candidate>),
}

/// Narrow a candidate list
///
/// One candidate is selected outright. Otherwise candidates whose
/// affiliations contain `affiliation` (case-insensitive) are kept, and a
/// single survivor is selected. A blank affiliation never narrows.
pub fn reduce_candidates(mut candidates: Vec<Candidate>, affiliation: Option<&str>) -> Reduction {
    match candidates.len() {
        0 => return Reduction::Empty,
        1 => return Reduction::Selected(candidates.remove(0)),
        _ => {}
    }

    let affiliation = affiliation.map(str::trim).filter(|a| !a.is_empty());
    if let Some(affiliation) = affiliation {
        let mut matching = candidates
            .iter()
            .filter(|c| c.matches_affiliation(affiliation));
        if let (Some(only), None) = (matching.next(), matching.next()) {
            return Reduction::Selected(only.clone());
        }
    }

    Reduction::Ambiguous(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CanonicalId;

    fn candidate(id: &str, affiliations: &[&str]) -> Candidate {
        Candidate {
            id: CanonicalId::new(id),
            display_name: format!("Person {}", id),
            affiliations: affiliations.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_empty() {
        assert_eq!(reduce_candidates(vec![], Some("Acme")), Reduction::Empty);
    }

    #[test]
    fn test_single_candidate_selected_regardless_of_affiliation() {
        let only = candidate("1", &["Elsewhere"]);
        assert_eq!(
            reduce_candidates(vec![only.clone()], Some("Acme")),
            Reduction::Selected(only)
        );
    }

    #[test]
    fn test_unique_affiliation_match_selected() {
        let acme = candidate("1", &["ACME Univ"]);
        let other = candidate("2", &["Globex"]);
        assert_eq!(
            reduce_candidates(vec![other, acme.clone()], Some("acme")),
            Reduction::Selected(acme)
        );
    }

    #[test]
    fn test_multiple_affiliation_matches_stay_ambiguous() {
        let a = candidate("1", &["Acme Univ"]);
        let b = candidate("2", &["Acme Labs"]);
        let c = candidate("3", &["Globex"]);
        match reduce_candidates(vec![a, b, c], Some("Acme")) {
            Reduction::Ambiguous(all) => assert_eq!(all.len(), 3),
            other => panic!("unexpected reduction: {other:?}"),
        }
    }

    #[test]
    fn test_blank_affiliation_does_not_narrow() {
        let a = candidate("1", &["Acme Univ"]);
        let b = candidate("2", &[]);
        assert!(matches!(
            reduce_candidates(vec![a, b], Some("  ")),
            Reduction::Ambiguous(_)
        ));
    }
}
