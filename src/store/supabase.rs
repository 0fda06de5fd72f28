//! Hosted table store client.
//!
//! Talks to the PostgREST API in front of the results tables. One
//! `reqwest::Client` is built at startup and reused for every request.

use crate::config::SupabaseConfig;
use crate::models::{QuestionSet, TestResult};
use crate::store::{ResultStore, StoreError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Values per `in.(...)` filter, keeping request URLs a sane length.
const IN_FILTER_CHUNK: usize = 150;

/// Client for the results and question set tables.
pub struct SupabaseStore {
    http_client: reqwest::Client,
    base_url: String,
    service_key: String,
    results_table: String,
    question_sets_table: String,
    timeout_seconds: u64,
}

impl SupabaseStore {
    /// Build the client. Fails when the URL or key is missing.
    pub fn new(config: &SupabaseConfig) -> Result<Self, StoreError> {
        let base_url = config
            .url
            .as_deref()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| StoreError::Config("table store URL is not set".to_string()))?;
        let service_key = config
            .service_role_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| StoreError::Config("table store key is not set".to_string()))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            service_key,
            results_table: config.results_table.clone(),
            question_sets_table: config.question_sets_table.clone(),
            timeout_seconds: config.timeout_seconds,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Run one `GET` against a table and decode the row array.
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let url = self.table_url(table);
        debug!("GET {} ({} filters)", url, query.len());

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StoreError::Timeout(self.timeout_seconds)
                } else if e.is_connect() {
                    StoreError::Connect(self.base_url.clone())
                } else {
                    StoreError::Http(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, body });
        }

        response.json().await.map_err(|e| StoreError::Decode {
            what: "table store rows",
            reason: e.to_string(),
        })
    }

    /// `select` over a large value set, split across several requests.
    async fn select_in<T: DeserializeOwned>(
        &self,
        table: &str,
        select: &str,
        column: &str,
        values: &[String],
    ) -> Result<Vec<T>, StoreError> {
        let mut rows = Vec::new();

        for chunk in values.chunks(IN_FILTER_CHUNK) {
            let query = [
                ("select", select.to_string()),
                (column, in_filter(chunk)),
            ];
            rows.extend(self.select::<T>(table, &query).await?);
        }

        Ok(rows)
    }
}

#[async_trait]
impl ResultStore for SupabaseStore {
    async fn fetch_results_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<TestResult>, StoreError> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<TestResult> = self
            .select_in(&self.results_table, "*", "candidate_email", emails)
            .await?;
        debug!("Fetched {} result rows for {} emails", rows.len(), emails.len());
        Ok(rows)
    }

    async fn fetch_question_sets(&self, ids: &[String]) -> Result<Vec<QuestionSet>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<QuestionSet> = self
            .select_in(&self.question_sets_table, "id,jd_id", "id", ids)
            .await?;
        debug!("Fetched {} of {} question sets", rows.len(), ids.len());
        Ok(rows)
    }

    async fn fetch_results_for_email(&self, email: &str) -> Result<Vec<TestResult>, StoreError> {
        let query = [
            ("select", "*".to_string()),
            ("candidate_email", eq_filter(email)),
            ("order", "evaluated_at.desc.nullslast".to_string()),
        ];
        self.select(&self.results_table, &query).await
    }
}

/// Quote a value for use inside a PostgREST filter.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// `in.("a","b")` filter over the given values.
fn in_filter(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
    format!("in.({})", quoted.join(","))
}

fn eq_filter(value: &str) -> String {
    format!("eq.{}", quote(value))
}
