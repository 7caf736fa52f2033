//! Identity resolution
//!
//! Maps a display name to a dblp person id. Rules are tried in order and
//! the first hit wins:
//!
//! 1. the name's own homepage record in the snapshot
//! 2. the disambiguation page the snapshot points to
//! 3. the live author search
//!
//! Candidate lists from (2) and (3) go through [`reduce_candidates`] and,
//! if still ambiguous, to the injected [`DecisionMaker`]. External failures
//! are logged and treated as "no candidates"; resolution itself never
//! fails.

pub mod candidates;
pub mod decision;

pub use candidates::{reduce_candidates, Reduction};
pub use decision::{
    CandidateSummary, Decision, DecisionMaker, DecisionPrompt, ScriptedDecisions, SkipDecisions,
    TerminalDecisions,
};

use crate::clients::{AuthorSearch, DisambiguationLoader};
use crate::model::{CanonicalId, Candidate};
use crate::snapshot::CorpusSnapshot;
use regex::Regex;
use tracing::{error, info, warn};

/// Publications listed next to each candidate in a decision prompt
const PROMPT_PUBLICATIONS: usize = 5;

/// Terminal outcome of one resolve call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Name carries its own homepage record
    Exact(CanonicalId),
    /// Picked automatically from a disambiguation page
    Disambiguation(Candidate),
    /// Picked automatically from the live search
    Search(Candidate),
    /// Picked by a human; `candidate` is `None` for ids typed in directly
    Manual {
        id: CanonicalId,
        candidate: Option<Candidate>,
    },
    Unresolved,
}

impl Resolution {
    pub fn canonical_id(&self) -> Option<&CanonicalId> {
        match self {
            Resolution::Exact(id) => Some(id),
            Resolution::Disambiguation(c) | Resolution::Search(c) => Some(&c.id),
            Resolution::Manual { id, .. } => Some(id),
            Resolution::Unresolved => None,
        }
    }

    /// Candidate details, when the id came from a candidate list
    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Resolution::Disambiguation(c) | Resolution::Search(c) => Some(c),
            Resolution::Manual { candidate, .. } => candidate.as_ref(),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Resolution::Unresolved)
    }

    /// Short label of the rule that produced this outcome
    pub fn rule(&self) -> &'static str {
        match self {
            Resolution::Exact(_) => "exact",
            Resolution::Disambiguation(_) => "disambiguation",
            Resolution::Search(_) => "search",
            Resolution::Manual { .. } => "manual",
            Resolution::Unresolved => "unresolved",
        }
    }
}

/// Name to resolve plus optional hints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveRequest<'a> {
    pub name: &'a str,
    pub affiliation: Option<&'a str>,
    pub country: Option<&'a str>,
}

impl<'a> ResolveRequest<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            affiliation: None,
            country: None,
        }
    }

    pub fn with_affiliation(mut self, affiliation: &'a str) -> Self {
        self.affiliation = Some(affiliation).filter(|a| !a.trim().is_empty());
        self
    }

    pub fn with_country(mut self, country: &'a str) -> Self {
        self.country = Some(country).filter(|c| !c.trim().is_empty());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateSource {
    Disambiguation,
    Search,
}

/// Name → person id resolver over an immutable snapshot
pub struct IdentityResolver<'a> {
    snapshot: &'a CorpusSnapshot,
    search: &'a dyn AuthorSearch,
    disambiguation: &'a dyn DisambiguationLoader,
    decisions: &'a dyn DecisionMaker,
    venue_filter: Option<Regex>,
    base_url: String,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(
        snapshot: &'a CorpusSnapshot,
        search: &'a dyn AuthorSearch,
        disambiguation: &'a dyn DisambiguationLoader,
        decisions: &'a dyn DecisionMaker,
    ) -> Self {
        Self {
            snapshot,
            search,
            disambiguation,
            decisions,
            venue_filter: None,
            base_url: "https://dblp.org".to_string(),
        }
    }

    /// Restrict prompt publications to keys matching `filter`
    pub fn with_venue_filter(mut self, filter: Regex) -> Self {
        self.venue_filter = Some(filter);
        self
    }

    /// Base URL used for profile and search links in prompts
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Resolve one name
    pub async fn resolve(&self, request: ResolveRequest<'_>) -> Resolution {
        let name = request.name.trim();
        if name.is_empty() {
            return Resolution::Unresolved;
        }

        if let Some(id) = self.snapshot.homepage_id(name) {
            info!(name = %name, id = %id, "Matched using exact homepage record");
            return Resolution::Exact(id.clone());
        }

        if let Some(aggregator) = self.snapshot.disambiguation_id(name) {
            info!(name = %name, aggregator = %aggregator, "Name matches disambiguation page");
            match self.disambiguation.load_disambiguation(aggregator).await {
                Ok(candidates) if !candidates.is_empty() => {
                    return self
                        .choose(request, candidates, CandidateSource::Disambiguation)
                        .await;
                }
                Ok(_) => warn!(name = %name, "Disambiguation page lists no candidates"),
                Err(e) => error!(name = %name, "Error loading disambiguation page: {}", e),
            }
        }

        info!(name = %name, "Performing author search");
        match self.search.search_authors(name).await {
            Ok(candidates) if !candidates.is_empty() => {
                self.choose(request, candidates, CandidateSource::Search).await
            }
            Ok(_) => {
                info!(name = %name, "No matches found");
                Resolution::Unresolved
            }
            Err(e) => {
                error!(name = %name, "Error searching for author: {}", e);
                Resolution::Unresolved
            }
        }
    }

    async fn choose(
        &self,
        request: ResolveRequest<'_>,
        candidates: Vec<Candidate>,
        source: CandidateSource,
    ) -> Resolution {
        let candidates = match reduce_candidates(candidates, request.affiliation) {
            Reduction::Empty => return Resolution::Unresolved,
            Reduction::Selected(candidate) => {
                info!(
                    name = %request.name,
                    id = %candidate.id,
                    source = ?source,
                    "Matched without manual input"
                );
                return match source {
                    CandidateSource::Disambiguation => Resolution::Disambiguation(candidate),
                    CandidateSource::Search => Resolution::Search(candidate),
                };
            }
            Reduction::Ambiguous(candidates) => candidates,
        };

        let prompt = self.prompt(request, &candidates);
        match self.decisions.decide(&prompt).await {
            Decision::Id(id) => {
                let candidate = candidates.iter().find(|c| c.id == id).cloned();
                info!(name = %request.name, id = %id, "Manually entered id");
                Resolution::Manual { id, candidate }
            }
            Decision::Index(index) => match candidates.get(index) {
                Some(candidate) => {
                    info!(name = %request.name, id = %candidate.id, "Manually picked candidate");
                    Resolution::Manual {
                        id: candidate.id.clone(),
                        candidate: Some(candidate.clone()),
                    }
                }
                None => {
                    warn!(name = %request.name, index, "Invalid selection, skipping");
                    Resolution::Unresolved
                }
            },
            Decision::Skip => {
                info!(name = %request.name, "Skipped");
                Resolution::Unresolved
            }
        }
    }

    fn prompt(&self, request: ResolveRequest<'_>, candidates: &[Candidate]) -> DecisionPrompt {
        let search_url = reqwest::Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[("q", request.name)],
        )
        .map(String::from)
        .unwrap_or_else(|_| format!("{}/search?q={}", self.base_url, request.name));

        DecisionPrompt {
            name: request.name.to_string(),
            affiliation: request.affiliation.map(str::to_string),
            country: request.country.map(str::to_string),
            search_url,
            candidates: candidates
                .iter()
                .enumerate()
                .map(|(index, candidate)| CandidateSummary {
                    index,
                    candidate: candidate.clone(),
                    profile_url: candidate.id.profile_url(&self.base_url),
                    recent_publications: self.recent_publications(&candidate.display_name),
                })
                .collect(),
        }
    }

    /// First few matching keys in document order
    fn recent_publications(&self, name: &str) -> Vec<String> {
        self.snapshot
            .publications_of(name)
            .iter()
            .filter(|key| {
                self.venue_filter
                    .as_ref()
                    .map_or(true, |filter| filter.is_match(key))
            })
            .take(PROMPT_PUBLICATIONS)
            .cloned()
            .collect()
    }
}
