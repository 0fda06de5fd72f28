//! Join candidates with their latest test result.
//!
//! Everything here is pure and single-pass over in-memory records; the
//! store round trips happen in [`super::service`].

use crate::models::{Candidate, Job, JobSummary, MergedRecord, QuestionSet, TestResult};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

/// Placeholder name some upstream writers store when none was given.
const UNKNOWN_NAME: &str = "unknown";

/// Trim and lowercase an email; blank emails normalize to `None`.
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}

/// Sorted, unique normalized emails across all candidates.
pub fn unique_emails(candidates: &[Candidate]) -> Vec<String> {
    candidates
        .iter()
        .filter_map(|c| c.email.as_deref().and_then(normalize_email))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// A candidate kept after deduplication.
#[derive(Debug, Clone)]
pub struct UniqueCandidate<'a> {
    pub email_key: String,
    pub candidate: &'a Candidate,
}

/// Candidates grouped by job, deduplicated by normalized email.
///
/// First occurrence in input order wins. Records without an email are
/// dropped.
pub fn dedup_by_job(candidates: &[Candidate]) -> HashMap<&str, Vec<UniqueCandidate<'_>>> {
    let mut seen: HashSet<(&str, String)> = HashSet::new();
    let mut grouped: HashMap<&str, Vec<UniqueCandidate<'_>>> = HashMap::new();

    for candidate in candidates {
        let Some(email_key) = candidate.email.as_deref().and_then(normalize_email) else {
            continue;
        };

        if seen.insert((candidate.job_id.as_str(), email_key.clone())) {
            grouped
                .entry(candidate.job_id.as_str())
                .or_default()
                .push(UniqueCandidate {
                    email_key,
                    candidate,
                });
        }
    }

    grouped
}

/// Sorted, unique question set ids of results that carry no job reference
/// of their own.
pub fn unresolved_question_set_ids(results: &[TestResult]) -> Vec<String> {
    results
        .iter()
        .filter(|r| r.jd_id.is_none())
        .filter_map(|r| r.question_set_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Map question set id to the job that owns it.
pub fn question_set_owners(question_sets: &[QuestionSet]) -> HashMap<&str, &str> {
    question_sets
        .iter()
        .filter_map(|qs| Some((qs.id.as_str(), qs.jd_id.as_deref()?)))
        .collect()
}

/// The job a result belongs to: its own job reference, else the owner of
/// its question set.
pub fn resolve_job(result: &TestResult, owners: &HashMap<&str, &str>) -> Option<String> {
    result.jd_id.clone().or_else(|| {
        result
            .question_set_id
            .as_deref()
            .and_then(|qs| owners.get(qs))
            .map(|job| job.to_string())
    })
}

/// Whether `candidate` is strictly more recent than `current`.
///
/// Missing or unparseable timestamps rank below every valid one, so ties
/// (including two undated rows) keep the row seen first.
pub fn is_newer(candidate: &TestResult, current: &TestResult) -> bool {
    candidate.timestamp() > current.timestamp()
}

/// Most recent result per (job, email), plus per email for rows whose job
/// could not be resolved.
#[derive(Debug, Default)]
pub struct LatestResults<'a> {
    by_job: HashMap<(String, String), &'a TestResult>,
    by_email: HashMap<String, &'a TestResult>,
}

impl<'a> LatestResults<'a> {
    pub fn build(results: &'a [TestResult], question_sets: &[QuestionSet]) -> Self {
        let owners = question_set_owners(question_sets);
        let mut latest = Self::default();

        for result in results {
            let Some(email) = result.candidate_email.as_deref().and_then(normalize_email) else {
                continue;
            };

            match resolve_job(result, &owners) {
                Some(job_id) => keep_latest(&mut latest.by_job, (job_id, email), result),
                None => keep_latest(&mut latest.by_email, email, result),
            }
        }

        latest
    }

    /// The result to attach to a candidate of `job_id`. A job-scoped match
    /// wins; an unscoped row for the same email is the fallback.
    pub fn lookup(&self, job_id: &str, email_key: &str) -> Option<&'a TestResult> {
        self.by_job
            .get(&(job_id.to_string(), email_key.to_string()))
            .or_else(|| self.by_email.get(email_key))
            .copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.by_job.len() + self.by_email.len()
    }
}

fn keep_latest<'a, K: Eq + Hash>(
    map: &mut HashMap<K, &'a TestResult>,
    key: K,
    result: &'a TestResult,
) {
    match map.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(result);
        }
        Entry::Occupied(mut slot) => {
            if is_newer(result, slot.get()) {
                slot.insert(result);
            }
        }
    }
}

/// Pick a display name. The candidate store wins unless its value is blank
/// or the "unknown" placeholder.
pub fn reconcile_name(candidate_name: Option<&str>, result_name: Option<&str>) -> Option<String> {
    fn usable(name: Option<&str>) -> Option<&str> {
        name.map(str::trim)
            .filter(|n| !n.is_empty() && !n.eq_ignore_ascii_case(UNKNOWN_NAME))
    }

    usable(candidate_name)
        .or_else(|| usable(result_name))
        .map(str::to_string)
}

/// One output record; result fields stay `None` when nothing matched.
pub fn merge_record(unique: &UniqueCandidate<'_>, result: Option<&TestResult>) -> MergedRecord {
    let candidate = unique.candidate;
    let email = candidate
        .email
        .as_deref()
        .map(str::trim)
        .unwrap_or(unique.email_key.as_str())
        .to_string();
    let name = reconcile_name(
        candidate.name.as_deref(),
        result.and_then(|r| r.candidate_name.as_deref()),
    );

    match result {
        Some(result) => MergedRecord {
            candidate_id: candidate.id.clone(),
            name,
            email,
            phone: candidate.phone.clone(),
            test_id: result.question_set_id.clone(),
            score: result.score,
            max_score: result.max_score,
            percentage: result.percentage,
            status: result.status.clone(),
            evaluated_at: result.timestamp_raw().map(str::to_string),
            proctoring: result.proctoring.clone(),
        },
        None => MergedRecord {
            candidate_id: candidate.id.clone(),
            name,
            email,
            phone: candidate.phone.clone(),
            test_id: None,
            score: None,
            max_score: None,
            percentage: None,
            status: None,
            evaluated_at: None,
            proctoring: Default::default(),
        },
    }
}

/// Build one summary per job, ordered by job id.
///
/// Candidates referencing jobs outside `jobs` are ignored. Jobs without
/// candidates still appear, with an empty list.
pub fn build_summaries(
    jobs: &[Job],
    candidates: &[Candidate],
    results: &[TestResult],
    question_sets: &[QuestionSet],
) -> Vec<JobSummary> {
    let mut titles: BTreeMap<&str, Option<&str>> = BTreeMap::new();
    for job in jobs {
        titles.entry(job.id.as_str()).or_insert(job.title.as_deref());
    }

    let grouped = dedup_by_job(candidates);
    let latest = LatestResults::build(results, question_sets);

    titles
        .into_iter()
        .map(|(job_id, title)| {
            let records: Vec<MergedRecord> = grouped
                .get(job_id)
                .map(|uniques| {
                    uniques
                        .iter()
                        .map(|u| merge_record(u, latest.lookup(job_id, &u.email_key)))
                        .collect()
                })
                .unwrap_or_default();

            JobSummary {
                job_id: job_id.to_string(),
                job_title: title.map(str::to_string),
                total_candidates: records.len(),
                candidates: records,
            }
        })
        .collect()
}
