//! Store clients.
//!
//! The aggregator only sees the two traits below. Concrete clients are
//! built once at startup and shared for the life of the process.

pub mod mongo;
pub mod supabase;

#[cfg(test)]
pub mod memory;

use crate::models::{Candidate, Job, QuestionSet, Recruiter, RecruiterFilter, TestResult};
use async_trait::async_trait;
use thiserror::Error;

pub use mongo::MongoStore;
pub use supabase::SupabaseStore;

/// Errors raised by either store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document store driver failure.
    #[error("document store error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// The table store did not answer in time.
    #[error("table store request timed out after {0}s")]
    Timeout(u64),

    /// The table store could not be reached.
    #[error("cannot connect to table store at {0}")]
    Connect(String),

    /// Transport failure talking to the table store.
    #[error("table store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The table store answered with a non-success status.
    #[error("table store API error {status}: {body}")]
    Api { status: u16, body: String },

    /// A response could not be decoded.
    #[error("failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    /// The client was configured in a way it cannot run with.
    #[error("invalid store configuration: {0}")]
    Config(String),
}

/// Read access to jobs, recruiters and candidates.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Resolve a recruiter filter. Unresolvable filters (including
    /// malformed ids) yield `Ok(None)`, never an error.
    async fn find_recruiter(
        &self,
        filter: &RecruiterFilter,
    ) -> Result<Option<Recruiter>, StoreError>;

    /// All jobs, or only those owned by `recruiter`.
    async fn find_jobs(&self, recruiter: Option<&Recruiter>) -> Result<Vec<Job>, StoreError>;

    /// Candidates referencing any of `job_ids`, in storage order.
    async fn find_candidates(&self, job_ids: &[String]) -> Result<Vec<Candidate>, StoreError>;
}

/// Read access to external test results.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Result rows whose candidate email is in `emails`.
    async fn fetch_results_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<TestResult>, StoreError>;

    /// Question sets with any of the given ids, whichever job owns them.
    async fn fetch_question_sets(&self, ids: &[String]) -> Result<Vec<QuestionSet>, StoreError>;

    /// Every result recorded for one candidate, newest first.
    async fn fetch_results_for_email(&self, email: &str) -> Result<Vec<TestResult>, StoreError>;
}
