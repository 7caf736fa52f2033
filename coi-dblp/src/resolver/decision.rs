//! Human-in-the-loop candidate selection
//!
//! The resolver hands an ambiguous candidate list to a [`DecisionMaker`]
//! and accepts whatever comes back. Anything unusable counts as a skip.

use crate::model::{CanonicalId, Candidate};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::Mutex;
use tracing::{info, warn};

/// One candidate as presented for adjudication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSummary {
    pub index: usize,
    pub candidate: Candidate,
    pub profile_url: String,
    /// Up to five keys matching the venue filter, in document order
    pub recent_publications: Vec<String>,
}

/// Everything a human needs to pick a person
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionPrompt {
    pub name: String,
    pub affiliation: Option<String>,
    pub country: Option<String>,
    pub search_url: String,
    pub candidates: Vec<CandidateSummary>,
}

impl DecisionPrompt {
    /// Multi-line rendering for terminals and logs
    pub fn render(&self) -> String {
        let mut out = format!(
            "{} - {} {}\n{}\n",
            self.name,
            self.affiliation.as_deref().unwrap_or(""),
            self.country.as_deref().unwrap_or(""),
            self.search_url
        );
        for summary in &self.candidates {
            out.push_str(&format!(
                "  {} {}: {} - {} {} {}\n",
                summary.index,
                summary.candidate.id,
                summary.candidate.display_name,
                summary.candidate.affiliations.join(", "),
                summary.profile_url,
                summary.recent_publications.join(", ")
            ));
        }
        out
    }
}

/// Answer to a [`DecisionPrompt`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Literal person id, which need not be among the candidates
    Id(CanonicalId),
    /// Position in the candidate list
    Index(usize),
    Skip,
}

impl Decision {
    /// Interpret free-text input
    ///
    /// Input containing `/` is an id, a number is an index, anything else
    /// (including blank) is a skip.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.contains('/') {
            Decision::Id(CanonicalId::new(input))
        } else if let Ok(index) = input.parse::<usize>() {
            Decision::Index(index)
        } else {
            Decision::Skip
        }
    }
}

/// Source of human decisions
#[async_trait]
pub trait DecisionMaker: Send + Sync {
    async fn decide(&self, prompt: &DecisionPrompt) -> Decision;
}

/// Non-interactive runs: log the candidates and skip
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipDecisions;

#[async_trait]
impl DecisionMaker for SkipDecisions {
    async fn decide(&self, prompt: &DecisionPrompt) -> Decision {
        info!(
            name = %prompt.name,
            candidates = prompt.candidates.len(),
            "Ambiguous name left for manual adjudication\n{}",
            prompt.render()
        );
        Decision::Skip
    }
}

/// Interactive terminal prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalDecisions;

#[async_trait]
impl DecisionMaker for TerminalDecisions {
    async fn decide(&self, prompt: &DecisionPrompt) -> Decision {
        let rendered = prompt.render();
        let answer = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
            let mut stderr = std::io::stderr();
            writeln!(stderr, "{}", rendered)?;
            dialoguer::Input::<String>::new()
                .with_prompt("Enter the dblp ID to use, index of the dblp ID, or leave blank to skip")
                .allow_empty(true)
                .interact_text()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
        })
        .await;

        match answer {
            Ok(Ok(text)) => Decision::parse(&text),
            Ok(Err(e)) => {
                warn!("Could not read decision: {}", e);
                Decision::Skip
            }
            Err(e) => {
                warn!("Decision prompt task failed: {}", e);
                Decision::Skip
            }
        }
    }
}

/// Canned decisions, consumed in order; skips once exhausted
///
/// Every prompt received is recorded for later inspection.
#[derive(Debug, Default)]
pub struct ScriptedDecisions {
    answers: Mutex<VecDeque<Decision>>,
    prompts: Mutex<Vec<DecisionPrompt>>,
}

impl ScriptedDecisions {
    pub fn new(answers: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<DecisionPrompt> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DecisionMaker for ScriptedDecisions {
    async fn decide(&self, prompt: &DecisionPrompt) -> Decision {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.clone());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .unwrap_or(Decision::Skip)
    }
}
