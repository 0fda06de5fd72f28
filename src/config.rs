//! Configuration file handling.
//!
//! Settings come from an optional `results-aggregator.toml`, then CLI
//! flags and environment variables override them. Store connection
//! settings are required; everything else has a default.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "results-aggregator.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Document store settings.
    #[serde(default)]
    pub mongo: MongoConfig,

    /// Table store settings.
    #[serde(default)]
    pub supabase: SupabaseConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Attach a permissive CORS layer.
    #[serde(default = "default_true")]
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors: true,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_true() -> bool {
    true
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    /// Connection string. Required.
    #[serde(default)]
    pub uri: Option<String>,

    /// Database name. Falls back to the connection string's default database.
    #[serde(default)]
    pub database: Option<String>,

    #[serde(default = "default_jobs_collection")]
    pub jobs_collection: String,

    #[serde(default = "default_candidates_collection")]
    pub candidates_collection: String,

    #[serde(default = "default_recruiters_collection")]
    pub recruiters_collection: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: None,
            database: None,
            jobs_collection: default_jobs_collection(),
            candidates_collection: default_candidates_collection(),
            recruiters_collection: default_recruiters_collection(),
        }
    }
}

fn default_jobs_collection() -> String {
    "jds".to_string()
}

fn default_candidates_collection() -> String {
    "candidates".to_string()
}

fn default_recruiters_collection() -> String {
    "recruiters".to_string()
}

/// Table store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project base URL. Required.
    #[serde(default)]
    pub url: Option<String>,

    /// Service role key. Required.
    #[serde(default)]
    pub service_role_key: Option<String>,

    #[serde(default = "default_results_table")]
    pub results_table: String,

    #[serde(default = "default_question_sets_table")]
    pub question_sets_table: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            service_role_key: None,
            results_table: default_results_table(),
            question_sets_table: default_question_sets_table(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_results_table() -> String {
    "test_results".to_string()
}

fn default_question_sets_table() -> String {
    "question_sets".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Environment variables consulted for the document store URI, in order.
const MONGO_URI_FALLBACK_VARS: [&str; 2] = ["MONGODB_URI", "MONGO_URI"];

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and the environment variables clap reads for them)
    /// take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref uri) = args.mongo_url {
            self.mongo.uri = Some(uri.clone());
        }
        if self.mongo.uri.is_none() {
            self.mongo.uri =
                first_non_blank(&MONGO_URI_FALLBACK_VARS, |var| std::env::var(var).ok());
        }
        if let Some(ref db) = args.mongo_db {
            self.mongo.database = Some(db.clone());
        }

        if let Some(ref url) = args.supabase_url {
            self.supabase.url = Some(url.clone());
        }
        if let Some(ref key) = args.supabase_key {
            self.supabase.service_role_key = Some(key.clone());
        }

        if let Some(ref bind) = args.bind {
            self.server.bind = bind.clone();
        }
        if args.no_cors {
            self.server.cors = false;
        }
    }

    /// Check that everything needed to serve traffic is present.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();

        if is_blank(&self.mongo.uri) {
            missing.push("mongo.uri (MONGO_URL)");
        }
        if is_blank(&self.supabase.url) {
            missing.push("supabase.url (SUPABASE_URL)");
        }
        if is_blank(&self.supabase.service_role_key) {
            missing.push("supabase.service_role_key (SUPABASE_SERVICE_ROLE_KEY)");
        }

        if !missing.is_empty() {
            bail!("Missing required configuration: {}", missing.join(", "));
        }

        if let Some(ref url) = self.supabase.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("supabase.url must start with 'http://' or 'https://'");
            }
        }

        if self.supabase.timeout_seconds == 0 {
            bail!("supabase.timeout_seconds must be at least 1");
        }

        self.bind_addr()?;

        Ok(())
    }

    /// The parsed listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.server.bind))
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// First variable in `vars` whose value is set and not blank.
fn first_non_blank<F>(vars: &[&str], lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    vars.iter()
        .find_map(|&var| lookup(var).filter(|v| !v.trim().is_empty()))
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
