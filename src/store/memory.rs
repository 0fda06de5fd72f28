//! In-memory store used by tests.

use crate::aggregation::merge::normalize_email;
use crate::models::{Candidate, Job, QuestionSet, Recruiter, RecruiterFilter, TestResult};
use crate::store::{CandidateStore, ResultStore, StoreError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A job together with the id of the recruiter owning it.
#[derive(Debug, Clone)]
pub struct OwnedJob {
    pub job: Job,
    pub recruiter_id: String,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub recruiters: Vec<Recruiter>,
    pub jobs: Vec<OwnedJob>,
    pub candidates: Vec<Candidate>,
    pub question_sets: Vec<QuestionSet>,
    pub results: Vec<TestResult>,
    /// Make every result store call fail.
    pub fail_results: bool,
    pub result_queries: AtomicUsize,
}

impl MemoryStore {
    pub fn result_queries(&self) -> usize {
        self.result_queries.load(Ordering::SeqCst)
    }

    fn result_call(&self) -> Result<(), StoreError> {
        self.result_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_results {
            return Err(StoreError::Api {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn find_recruiter(
        &self,
        filter: &RecruiterFilter,
    ) -> Result<Option<Recruiter>, StoreError> {
        let found = self.recruiters.iter().find(|r| match filter {
            RecruiterFilter::Id(id) => &r.id == id,
            RecruiterFilter::Email(email) => {
                r.email.as_deref().and_then(normalize_email) == normalize_email(email)
            }
        });
        Ok(found.cloned())
    }

    async fn find_jobs(&self, recruiter: Option<&Recruiter>) -> Result<Vec<Job>, StoreError> {
        Ok(self
            .jobs
            .iter()
            .filter(|j| recruiter.map_or(true, |r| r.id == j.recruiter_id))
            .map(|j| j.job.clone())
            .collect())
    }

    async fn find_candidates(&self, job_ids: &[String]) -> Result<Vec<Candidate>, StoreError> {
        Ok(self
            .candidates
            .iter()
            .filter(|c| job_ids.contains(&c.job_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn fetch_results_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<TestResult>, StoreError> {
        self.result_call()?;
        Ok(self
            .results
            .iter()
            .filter(|r| {
                r.candidate_email
                    .as_ref()
                    .map_or(false, |e| emails.contains(e))
            })
            .cloned()
            .collect())
    }

    async fn fetch_question_sets(&self, ids: &[String]) -> Result<Vec<QuestionSet>, StoreError> {
        self.result_call()?;
        Ok(self
            .question_sets
            .iter()
            .filter(|qs| ids.contains(&qs.id))
            .cloned()
            .collect())
    }

    async fn fetch_results_for_email(&self, email: &str) -> Result<Vec<TestResult>, StoreError> {
        self.result_call()?;
        let mut rows: Vec<TestResult> = self
            .results
            .iter()
            .filter(|r| r.candidate_email.as_deref() == Some(email))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        Ok(rows)
    }
}
