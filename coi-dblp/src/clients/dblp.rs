//! dblp web API client
//!
//! Author search uses the JSON search API; person and disambiguation pages
//! are fetched as XML. All requests share one rate limiter and carry the
//! configured timeout. Failures are returned, never retried here.

use super::person_xml::{parse_person_page, PersonPage};
use super::{AuthorRecord, AuthorRecordLoader, AuthorSearch, DisambiguationLoader};
use crate::error::ClientError;
use crate::model::{CanonicalId, Candidate};
use async_trait::async_trait;
use coi_common::config::DblpConfig;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("coi-dblp/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hit: Option<OneOrMany<SearchHit>>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    info: HitInfo,
}

#[derive(Debug, Deserialize)]
struct HitInfo {
    author: String,
    url: String,
    #[serde(default)]
    notes: Option<HitNotes>,
}

#[derive(Debug, Deserialize)]
struct HitNotes {
    note: OneOrMany<HitNote>,
}

#[derive(Debug, Deserialize)]
struct HitNote {
    #[serde(rename = "@type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// dblp emits a bare object when a list has a single element
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

impl HitInfo {
    fn into_candidate(self) -> Option<Candidate> {
        let id = pid_from_url(&self.url)?;
        let affiliations = self
            .notes
            .map(|n| n.note.into_vec())
            .unwrap_or_default()
            .into_iter()
            .filter(|note| note.kind.as_deref() == Some("affiliation"))
            .filter_map(|note| note.text)
            .collect();

        Some(Candidate {
            id,
            display_name: self.author,
            affiliations,
        })
    }
}

/// Extract the person id from a profile URL (`https://dblp.org/pid/12/3456`)
fn pid_from_url(url: &str) -> Option<CanonicalId> {
    let (_, rest) = url.split_once("/pid/")?;
    let rest = rest.trim_end_matches(".html").trim_end_matches('/');
    (!rest.is_empty()).then(|| CanonicalId::new(rest))
}

/// Parse a search API response body into ranked candidates
fn parse_search_response(body: &str) -> Result<Vec<Candidate>, ClientError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| ClientError::Parse(e.to_string()))?;

    Ok(response
        .result
        .hits
        .hit
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|hit| hit.info.into_candidate())
        .collect())
}

/// dblp API client
pub struct DblpClient {
    http_client: reqwest::Client,
    base_url: String,
    search_results: u32,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl DblpClient {
    pub fn new(config: &DblpConfig) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            search_results: config.search_results,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, ClientError> {
        self.rate_limiter.until_ready().await;

        debug!(url = %url, "Querying dblp");
        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClientError::Api(status.as_u16(), error_text));
        }

        response
            .text()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))
    }

    async fn person_page(&self, id: &CanonicalId) -> Result<PersonPage, ClientError> {
        let url = format!("{}/pid/{}.xml", self.base_url, id);
        let body = self.get_text(&url, &[]).await?;
        parse_person_page(&body)
    }
}

#[async_trait]
impl AuthorSearch for DblpClient {
    async fn search_authors(&self, name: &str) -> Result<Vec<Candidate>, ClientError> {
        let url = format!("{}/search/author/api", self.base_url);
        let body = self
            .get_text(
                &url,
                &[
                    ("q", name.to_string()),
                    ("format", "json".to_string()),
                    ("h", self.search_results.to_string()),
                ],
            )
            .await?;

        let candidates = parse_search_response(&body)?;
        info!(name = %name, hits = candidates.len(), "dblp author search");
        Ok(candidates)
    }
}

#[async_trait]
impl DisambiguationLoader for DblpClient {
    async fn load_disambiguation(&self, id: &CanonicalId) -> Result<Vec<Candidate>, ClientError> {
        let page = self.person_page(id).await?;
        info!(id = %id, candidates = page.homonyms.len(), "Loaded disambiguation page");
        Ok(page.homonyms)
    }
}

#[async_trait]
impl AuthorRecordLoader for DblpClient {
    async fn load_author(&self, id: &CanonicalId) -> Result<AuthorRecord, ClientError> {
        let page = self.person_page(id).await?;
        Ok(AuthorRecord {
            name: page.name,
            affiliations: page.affiliations,
        })
    }
}
