//! Request-scoped aggregation over the two stores.

use crate::aggregation::merge::{build_summaries, unique_emails, unresolved_question_set_ids};
use crate::models::{CandidateResult, JobSummary, RecruiterFilter};
use crate::store::{CandidateStore, ResultStore, StoreError};
use std::sync::Arc;
use tracing::{debug, info};

/// Joins candidate records with test results.
///
/// Holds the store handles built at startup; each call performs its own
/// sequential round trips and keeps no state between calls.
#[derive(Clone)]
pub struct ResultsAggregator {
    candidates: Arc<dyn CandidateStore>,
    results: Arc<dyn ResultStore>,
}

impl ResultsAggregator {
    pub fn new(candidates: Arc<dyn CandidateStore>, results: Arc<dyn ResultStore>) -> Self {
        Self {
            candidates,
            results,
        }
    }

    /// Per-job summaries, optionally scoped to one recruiter's jobs.
    ///
    /// A filter that resolves to no recruiter, or a recruiter without jobs,
    /// yields an empty list.
    pub async fn aggregate(
        &self,
        filter: Option<&RecruiterFilter>,
    ) -> Result<Vec<JobSummary>, StoreError> {
        let recruiter = match filter {
            Some(filter) => match self.candidates.find_recruiter(filter).await? {
                Some(recruiter) => Some(recruiter),
                None => {
                    info!("Recruiter filter {:?} did not resolve", filter);
                    return Ok(Vec::new());
                }
            },
            None => None,
        };

        let jobs = self.candidates.find_jobs(recruiter.as_ref()).await?;
        if jobs.is_empty() {
            debug!("No jobs in scope");
            return Ok(Vec::new());
        }

        let job_ids: Vec<String> = jobs.iter().map(|j| j.id.clone()).collect();
        let candidates = self.candidates.find_candidates(&job_ids).await?;
        let emails = unique_emails(&candidates);
        debug!(
            "{} jobs, {} candidate records, {} unique emails",
            jobs.len(),
            candidates.len(),
            emails.len()
        );

        let results = if emails.is_empty() {
            Vec::new()
        } else {
            self.results.fetch_results_by_emails(&emails).await?
        };

        // Owners are looked up by id so a row tied to a job outside the
        // filter resolves to that job and is dropped, not used as a fallback.
        let question_set_ids = unresolved_question_set_ids(&results);
        let question_sets = if question_set_ids.is_empty() {
            Vec::new()
        } else {
            self.results.fetch_question_sets(&question_set_ids).await?
        };

        Ok(build_summaries(&jobs, &candidates, &results, &question_sets))
    }

    /// Every stored result for one candidate email, newest first.
    pub async fn candidate_results(&self, email: &str) -> Result<Vec<CandidateResult>, StoreError> {
        let rows = self.results.fetch_results_for_email(email.trim()).await?;
        Ok(rows.into_iter().map(CandidateResult::from).collect())
    }
}
