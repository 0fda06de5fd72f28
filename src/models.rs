//! Data models for the results aggregator.
//!
//! Input records come from two places: the document store (jobs, recruiters,
//! candidates) and the hosted table store (test results, question sets).
//! Output records are what the HTTP layer serializes.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A job posting candidates apply against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub title: Option<String>,
}

/// An account owning a subset of jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recruiter {
    pub id: String,
    pub email: Option<String>,
}

/// How a caller scopes aggregation to one recruiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecruiterFilter {
    /// Internal store identifier.
    Id(String),
    /// Account email.
    Email(String),
}

impl RecruiterFilter {
    /// Build a filter from raw query values. Blank values count as absent,
    /// and an id takes precedence over an email.
    pub fn from_parts(id: Option<&str>, email: Option<&str>) -> Option<Self> {
        let id = id.map(str::trim).filter(|s| !s.is_empty());
        let email = email.map(str::trim).filter(|s| !s.is_empty());

        match (id, email) {
            (Some(id), _) => Some(Self::Id(id.to_string())),
            (None, Some(email)) => Some(Self::Email(email.to_string())),
            (None, None) => None,
        }
    }
}

/// A single application record. Several may share an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub job_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Assessment template owned by a job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuestionSet {
    #[serde(deserialize_with = "required_opaque_id")]
    pub id: String,
    #[serde(default, deserialize_with = "opaque_id")]
    pub jd_id: Option<String>,
}

/// Proctoring counters recorded alongside a test result.
///
/// Rows are read with the table store's snake_case column names (and the
/// older spellings some rows still carry); output is camelCase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProctoringSignals {
    #[serde(
        default,
        rename(serialize = "tabSwitches", deserialize = "tab_switches"),
        alias = "tab switches",
        deserialize_with = "counter"
    )]
    pub tab_switches: Option<i64>,
    #[serde(
        default,
        rename(serialize = "textSelections", deserialize = "text_selections"),
        alias = "text selections",
        deserialize_with = "counter"
    )]
    pub text_selections: Option<i64>,
    #[serde(default, deserialize_with = "counter")]
    pub copies: Option<i64>,
    #[serde(default, deserialize_with = "counter")]
    pub pastes: Option<i64>,
    #[serde(
        default,
        rename(serialize = "rightClicks", deserialize = "right_clicks"),
        alias = "right clicks",
        deserialize_with = "counter"
    )]
    pub right_clicks: Option<i64>,
    #[serde(
        default,
        rename(serialize = "faceNotVisible", deserialize = "face_not_visible"),
        alias = "face not visible",
        deserialize_with = "counter"
    )]
    pub face_not_visible: Option<i64>,
    #[serde(default, alias = "inactivites", deserialize_with = "counter")]
    pub inactivities: Option<i64>,
}

/// A row of the external test results table. Append-only: one candidate
/// may have many rows.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TestResult {
    #[serde(default)]
    pub candidate_email: Option<String>,
    #[serde(default)]
    pub candidate_name: Option<String>,
    #[serde(default, deserialize_with = "opaque_id")]
    pub jd_id: Option<String>,
    #[serde(default, deserialize_with = "opaque_id")]
    pub question_set_id: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub evaluated_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub inserted_at: Option<String>,
    #[serde(flatten)]
    pub proctoring: ProctoringSignals,
}

impl TestResult {
    /// The raw timestamp used for recency: `evaluated_at`, else
    /// `created_at`, else `inserted_at`.
    pub fn timestamp_raw(&self) -> Option<&str> {
        [&self.evaluated_at, &self.created_at, &self.inserted_at]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    /// Parsed recency timestamp. `None` sorts before every valid time.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp_raw().and_then(parse_timestamp)
    }
}

/// Parse the timestamp shapes the table store emits.
///
/// Accepts RFC 3339 (with `Z` or an offset), and naive date-times or
/// bare dates, which are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // Postgres renders timestamptz with a space separator and a short offset
    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// One unique candidate within a job, joined with its latest result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRecord {
    pub candidate_id: String,
    pub name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub test_id: Option<String>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub percentage: Option<f64>,
    pub status: Option<String>,
    pub evaluated_at: Option<String>,
    #[serde(flatten)]
    pub proctoring: ProctoringSignals,
}

impl MergedRecord {
    /// Whether a test result was joined onto this candidate.
    #[cfg(test)]
    pub fn has_result(&self) -> bool {
        self.test_id.is_some() || self.score.is_some() || self.evaluated_at.is_some()
    }
}

/// Per-job output of an aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: String,
    pub job_title: Option<String>,
    pub total_candidates: usize,
    pub candidates: Vec<MergedRecord>,
}

/// A single historical result, as returned for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    pub candidate_email: Option<String>,
    pub candidate_name: Option<String>,
    pub job_id: Option<String>,
    pub test_id: Option<String>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub percentage: Option<f64>,
    pub status: Option<String>,
    pub evaluated_at: Option<String>,
    #[serde(flatten)]
    pub proctoring: ProctoringSignals,
}

impl From<TestResult> for CandidateResult {
    fn from(result: TestResult) -> Self {
        let evaluated_at = result.timestamp_raw().map(str::to_string);
        Self {
            candidate_email: result.candidate_email,
            candidate_name: result.candidate_name,
            job_id: result.jd_id,
            test_id: result.question_set_id,
            score: result.score,
            max_score: result.max_score,
            percentage: result.percentage,
            status: result.status,
            evaluated_at,
            proctoring: result.proctoring,
        }
    }
}

/// Ids in the table store may be uuids, text, or integers.
fn opaque_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn required_opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    opaque_id(deserializer)?.ok_or_else(|| serde::de::Error::custom("missing id"))
}

/// Counters are integers, but older rows hold floats or numeric strings.
fn counter<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_recruiter_filter_from_parts() {
        assert_eq!(RecruiterFilter::from_parts(None, None), None);
        assert_eq!(RecruiterFilter::from_parts(Some("  "), Some("")), None);
        assert_eq!(
            RecruiterFilter::from_parts(Some(" abc "), Some("r@x.com")),
            Some(RecruiterFilter::Id("abc".to_string()))
        );
        assert_eq!(
            RecruiterFilter::from_parts(Some(""), Some(" R@x.com ")),
            Some(RecruiterFilter::Email("R@x.com".to_string()))
        );
    }

    #[test]
    fn test_parse_timestamp_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T10:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T10:30:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 10:30:00+00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_timestamp_falls_back_in_order() {
        let result = TestResult {
            evaluated_at: Some("  ".to_string()),
            created_at: Some("2024-01-02T00:00:00Z".to_string()),
            inserted_at: Some("2024-05-01T00:00:00Z".to_string()),
            ..TestResult::default()
        };
        assert_eq!(result.timestamp_raw(), Some("2024-01-02T00:00:00Z"));

        let unparseable = TestResult {
            evaluated_at: Some("not a date".to_string()),
            created_at: Some("2024-01-02T00:00:00Z".to_string()),
            ..TestResult::default()
        };
        assert_eq!(unparseable.timestamp(), None);
    }

    #[test]
    fn test_deserialize_result_row() {
        let row = json!({
            "id": 17,
            "candidate_email": "a@x.com",
            "candidate_name": "Avery",
            "jd_id": null,
            "question_set_id": 42,
            "score": 8,
            "max_score": 10,
            "percentage": 80.0,
            "status": "passed",
            "evaluated_at": "2024-03-01T10:30:00Z",
            "tab switches": 3,
            "text_selections": "2",
            "copies": 1.0,
            "inactivites": 4
        });

        let result: TestResult = serde_json::from_value(row).unwrap();
        assert_eq!(result.question_set_id.as_deref(), Some("42"));
        assert_eq!(result.jd_id, None);
        assert_eq!(result.score, Some(8.0));
        assert_eq!(result.proctoring.tab_switches, Some(3));
        assert_eq!(result.proctoring.text_selections, Some(2));
        assert_eq!(result.proctoring.copies, Some(1));
        assert_eq!(result.proctoring.pastes, None);
        assert_eq!(result.proctoring.inactivities, Some(4));
    }

    #[test]
    fn test_deserialize_question_set() {
        let qs: QuestionSet =
            serde_json::from_value(json!({"id": "qs-1", "jd_id": "job-9"})).unwrap();
        assert_eq!(qs.id, "qs-1");
        assert_eq!(qs.jd_id.as_deref(), Some("job-9"));

        assert!(serde_json::from_value::<QuestionSet>(json!({"jd_id": "job-9"})).is_err());
    }

    #[test]
    fn test_candidate_result_serializes_camel_case() {
        let result = TestResult {
            candidate_email: Some("a@x.com".to_string()),
            question_set_id: Some("qs-1".to_string()),
            created_at: Some("2024-01-02T00:00:00Z".to_string()),
            proctoring: ProctoringSignals {
                tab_switches: Some(2),
                ..ProctoringSignals::default()
            },
            ..TestResult::default()
        };

        let value = serde_json::to_value(CandidateResult::from(result)).unwrap();
        assert_eq!(value["candidateEmail"], "a@x.com");
        assert_eq!(value["testId"], "qs-1");
        assert_eq!(value["evaluatedAt"], "2024-01-02T00:00:00Z");
        assert_eq!(value["tabSwitches"], 2);
        assert!(value["faceNotVisible"].is_null());
        assert!(value.get("tab_switches").is_none());
    }
}
