//! Client for the external entity-matching service.
//!
//! Queries are sent with the service's `best` ranking algorithm and the
//! ranked candidates are returned exactly as received. Unlike the scrape and
//! count paths, every failure here is surfaced: a screening that did not
//! happen must never look like a screening without hits.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::config::ScreeningConfig;

const QUERY_KEY: &str = "q";

#[derive(Error, Debug)]
pub enum ScreeningError {
    #[error("Invalid screening query: {0}")]
    InvalidQuery(String),

    #[error("Screening service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Screening service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Unexpected screening response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Company,
    Organization,
}

impl EntityType {
    fn schema(&self) -> &'static str {
        match self {
            EntityType::Person => "Person",
            EntityType::Company => "Company",
            EntityType::Organization => "Organization",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MatchQuery {
    #[validate(length(min = 1), custom = "not_blank")]
    pub entity_name: String,
    #[serde(default)]
    pub entity_type: Option<EntityType>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub matched_entity_id: String,
    pub caption: Option<String>,
    pub score: f64,
    pub dataset_source: String,
}

/// Candidates ranked by the upstream service, highest score first.
pub type MatchResult = Vec<MatchCandidate>;

// Wire format of the matching API
#[derive(Debug, Deserialize)]
struct MatchResponse {
    responses: HashMap<String, QueryResponse>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    id: String,
    #[serde(default)]
    caption: Option<String>,
    score: f64,
    #[serde(default)]
    datasets: Vec<String>,
}

impl From<WireCandidate> for MatchCandidate {
    fn from(wire: WireCandidate) -> Self {
        MatchCandidate {
            matched_entity_id: wire.id,
            caption: wire.caption,
            score: wire.score,
            dataset_source: wire.datasets.join(","),
        }
    }
}

pub struct MatchClient {
    endpoint: String,
    algorithm: String,
    api_key: String,
    client: Client,
}

impl MatchClient {
    pub fn new(config: &ScreeningConfig) -> Result<Self, ScreeningError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: format!(
                "{}/match/{}",
                config.base_url.trim_end_matches('/'),
                config.dataset
            ),
            algorithm: config.algorithm.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    /// Ranked candidates for one entity, as returned by the service.
    pub async fn best_matches(&self, query: &MatchQuery) -> Result<MatchResult, ScreeningError> {
        query
            .validate()
            .map_err(|e| ScreeningError::InvalidQuery(e.to_string()))?;
        let name = query.entity_name.trim();

        let schema = query
            .entity_type
            .map(|t| t.schema())
            .unwrap_or("LegalEntity");

        let body = json!({
            "queries": {
                QUERY_KEY: {
                    "schema": schema,
                    "properties": { "name": [name] }
                }
            }
        });

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("algorithm", self.algorithm.as_str())])
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScreeningError::Upstream {
                status: status.as_u16(),
                body: upstream_message(status, body),
            });
        }

        let mut decoded: MatchResponse = response
            .json()
            .await
            .map_err(|e| ScreeningError::Decode(e.to_string()))?;

        let answer = decoded
            .responses
            .remove(QUERY_KEY)
            .ok_or_else(|| {
                ScreeningError::Decode(format!("no response for query '{}'", QUERY_KEY))
            })?;

        Ok(answer.results.into_iter().map(MatchCandidate::from).collect())
    }
}

fn upstream_message(status: StatusCode, body: String) -> String {
    if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("no body").to_string()
    } else {
        body
    }
}
