//! External advisory client — optional service that turns a finding digest
//! into extra recommendation text.
//!
//! The digest carries derived counts and names only; raw log text never
//! leaves the host. A failed or disabled advisor degrades to the static
//! recommendation list, never to a tool failure.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::AdvisorConfig;
use crate::domain::rules::Finding;

/// One summarized finding as sent to the advisory service.
#[derive(Debug, Clone, Serialize)]
pub struct FindingDigest {
    pub category: String,
    pub severity: String,
    pub metric: String,
    pub observed: String,
}

pub fn digest(findings: &[Finding]) -> Vec<FindingDigest> {
    findings
        .iter()
        .map(|f| FindingDigest {
            category: f.category.to_string(),
            severity: f.severity.to_string(),
            metric: f.metric_name.clone(),
            observed: f.observed_value.clone(),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct AdviceResponse {
    recommendations: Vec<String>,
}

pub enum Advisor {
    Http(HttpAdvisor),
    Disabled,
}

impl Advisor {
    pub fn from_config(cfg: &AdvisorConfig) -> Result<Self> {
        if !cfg.enabled {
            return Ok(Advisor::Disabled);
        }
        Ok(Advisor::Http(HttpAdvisor::new(
            &cfg.endpoint,
            cfg.api_key.as_deref(),
            cfg.timeout_secs,
        )?))
    }

    /// Request advisory text for a finding digest.
    pub async fn advise(&self, digest: &[FindingDigest]) -> Result<Vec<String>> {
        match self {
            Advisor::Http(client) => client.advise(digest).await,
            Advisor::Disabled => bail!("advisor is disabled"),
        }
    }
}

pub struct HttpAdvisor {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAdvisor {
    pub fn new(endpoint: &str, api_key: Option<&str>, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
        })
    }

    async fn advise(&self, digest: &[FindingDigest]) -> Result<Vec<String>> {
        let mut request = self.http.post(&self.endpoint).json(&digest);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response: AdviceResponse = request
            .send()
            .await
            .with_context(|| format!("POST {}", self.endpoint))?
            .error_for_status()
            .context("advisor returned error status")?
            .json()
            .await
            .context("parsing advisor response")?;

        Ok(response.recommendations)
    }
}
