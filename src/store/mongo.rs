//! Document store client.
//!
//! Jobs, recruiters and candidates live in MongoDB. Documents are read
//! loosely (ids may be ObjectIds or strings, phones may be numbers) and
//! converted to the plain domain records the aggregator works with.

use crate::config::MongoConfig;
use crate::models::{Candidate, Job, Recruiter, RecruiterFilter};
use crate::store::{CandidateStore, StoreError};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::options::{FindOneOptions, FindOptions};
use mongodb::{Client, Collection, Database};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct JobDocument {
    #[serde(rename = "_id")]
    id: Bson,
    #[serde(default)]
    title: Option<Bson>,
}

#[derive(Debug, Deserialize)]
struct RecruiterDocument {
    #[serde(rename = "_id")]
    id: Bson,
    #[serde(default)]
    email: Option<Bson>,
}

#[derive(Debug, Deserialize)]
struct CandidateDocument {
    #[serde(rename = "_id")]
    id: Bson,
    #[serde(rename = "jdId", default)]
    jd_id: Option<Bson>,
    #[serde(default)]
    name: Option<Bson>,
    #[serde(default)]
    email: Option<Bson>,
    #[serde(default)]
    phone: Option<Bson>,
}

/// MongoDB-backed candidate store.
pub struct MongoStore {
    jobs: Collection<JobDocument>,
    recruiters: Collection<RecruiterDocument>,
    candidates: Collection<CandidateDocument>,
}

impl MongoStore {
    /// Connect and select the configured (or the URI's default) database.
    pub async fn connect(config: &MongoConfig) -> Result<Self, StoreError> {
        let uri = config
            .uri
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| StoreError::Config("document store URI is not set".to_string()))?;

        let client = Client::with_uri_str(uri).await?;

        let database = match config.database.as_deref().filter(|d| !d.is_empty()) {
            Some(name) => client.database(name),
            None => client.default_database().ok_or_else(|| {
                StoreError::Config(
                    "document store URI has no default database; set mongo.database".to_string(),
                )
            })?,
        };

        info!("Using document database: {}", database.name());
        Ok(Self::from_database(&database, config))
    }

    fn from_database(database: &Database, config: &MongoConfig) -> Self {
        Self {
            jobs: database.collection(&config.jobs_collection),
            recruiters: database.collection(&config.recruiters_collection),
            candidates: database.collection(&config.candidates_collection),
        }
    }
}

#[async_trait]
impl CandidateStore for MongoStore {
    async fn find_recruiter(
        &self,
        filter: &RecruiterFilter,
    ) -> Result<Option<Recruiter>, StoreError> {
        match filter {
            RecruiterFilter::Id(raw) => match ObjectId::parse_str(raw) {
                Ok(oid) => Ok(Some(Recruiter {
                    id: oid.to_hex(),
                    email: None,
                })),
                Err(_) => {
                    debug!("Recruiter id {:?} is not an ObjectId", raw);
                    Ok(None)
                }
            },
            RecruiterFilter::Email(raw) => {
                let trimmed = raw.trim();
                let query = doc! { "email": { "$in": [trimmed, trimmed.to_lowercase()] } };
                let options = FindOneOptions::builder()
                    .projection(doc! { "_id": 1, "email": 1 })
                    .build();

                let found = self.recruiters.find_one(query, options).await?;
                Ok(found.and_then(|d| {
                    Some(Recruiter {
                        id: bson_to_string(&d.id)?,
                        email: d.email.as_ref().and_then(bson_to_string),
                    })
                }))
            }
        }
    }

    async fn find_jobs(&self, recruiter: Option<&Recruiter>) -> Result<Vec<Job>, StoreError> {
        let filter = match recruiter {
            Some(r) => doc! { "recruiter": { "$in": id_variants(&r.id) } },
            None => Document::new(),
        };
        let options = FindOptions::builder()
            .projection(doc! { "_id": 1, "title": 1 })
            .build();

        let docs: Vec<JobDocument> = self.jobs.find(filter, options).await?.try_collect().await?;
        debug!("Loaded {} job documents", docs.len());

        Ok(docs
            .into_iter()
            .filter_map(|d| {
                Some(Job {
                    id: bson_to_string(&d.id)?,
                    title: d.title.as_ref().and_then(bson_to_string),
                })
            })
            .collect())
    }

    async fn find_candidates(&self, job_ids: &[String]) -> Result<Vec<Candidate>, StoreError> {
        if job_ids.is_empty() {
            return Ok(Vec::new());
        }

        let refs: Vec<Bson> = job_ids.iter().flat_map(|id| id_variants(id)).collect();
        let filter = doc! { "jdId": { "$in": refs } };
        let options = FindOptions::builder()
            .projection(doc! { "_id": 1, "jdId": 1, "name": 1, "email": 1, "phone": 1 })
            .build();

        let docs: Vec<CandidateDocument> = self
            .candidates
            .find(filter, options)
            .await?
            .try_collect()
            .await?;
        debug!("Loaded {} candidate documents", docs.len());

        Ok(docs.into_iter().filter_map(candidate_from_document).collect())
    }
}

fn candidate_from_document(doc: CandidateDocument) -> Option<Candidate> {
    Some(Candidate {
        id: bson_to_string(&doc.id)?,
        job_id: doc.jd_id.as_ref().and_then(bson_to_string)?,
        name: doc.name.as_ref().and_then(bson_to_string),
        email: doc.email.as_ref().and_then(bson_to_string),
        phone: doc.phone.as_ref().and_then(bson_to_string),
    })
}

/// A reference may be stored as an ObjectId or as its hex string.
fn id_variants(id: &str) -> Vec<Bson> {
    let mut variants = vec![Bson::String(id.to_string())];
    if let Ok(oid) = ObjectId::parse_str(id) {
        variants.insert(0, Bson::ObjectId(oid));
    }
    variants
}

/// Render a scalar BSON value as a string; `None` for null and composites.
fn bson_to_string(value: &Bson) -> Option<String> {
    match value {
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Bson::Int32(n) => Some(n.to_string()),
        Bson::Int64(n) => Some(n.to_string()),
        Bson::Double(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
        Bson::Double(n) => Some(n.to_string()),
        _ => None,
    }
}
