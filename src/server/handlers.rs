//! Route handlers.

use crate::models::{CandidateResult, JobSummary, RecruiterFilter};
use crate::server::error::ApiError;
use crate::server::AppState;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::Json;
use serde::Deserialize;
use tracing::info;

const INDEX_HTML: &str = "<h1>Backend OK</h1><p>Use <a href='/result'>/result</a></p>";

/// Query parameters for `GET /result`.
#[derive(Debug, Default, Deserialize)]
pub struct ResultQuery {
    #[serde(rename = "recruiterId")]
    pub recruiter_id: Option<String>,
    pub recruiter_email: Option<String>,
}

/// Query parameters for `GET /candidate_results`.
#[derive(Debug, Default, Deserialize)]
pub struct CandidateQuery {
    pub email: Option<String>,
}

/// `GET /` health check.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// `GET /result`: per-job summaries, optionally for one recruiter.
pub async fn get_results(
    State(state): State<AppState>,
    Query(query): Query<ResultQuery>,
) -> Result<Json<Vec<JobSummary>>, ApiError> {
    let filter = RecruiterFilter::from_parts(
        query.recruiter_id.as_deref(),
        query.recruiter_email.as_deref(),
    );

    let summaries = state.aggregator.aggregate(filter.as_ref()).await?;
    info!(
        "GET /result filter={:?} -> {} jobs",
        filter,
        summaries.len()
    );

    Ok(Json(summaries))
}

/// `GET /candidate_results?email=`: every result for one candidate.
pub async fn get_candidate_results(
    State(state): State<AppState>,
    Query(query): Query<CandidateQuery>,
) -> Result<Json<Vec<CandidateResult>>, ApiError> {
    let email = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or(ApiError::MissingParameter("email"))?;

    let rows = state.aggregator.candidate_results(email).await?;
    info!("GET /candidate_results -> {} rows", rows.len());

    Ok(Json(rows))
}
