//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

/// Results Aggregator - per-job assessment results over HTTP
///
/// Joins candidate records from the document store with test results
/// from the hosted table store and serves per-job summaries.
///
/// Examples:
///   results-aggregator serve --bind 0.0.0.0:5000
///   results-aggregator dump --recruiter-id 64f1c0ffee0123456789abcd
///   results-aggregator init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for results-aggregator.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Document store connection string
    #[arg(long, value_name = "URI", env = "MONGO_URL", hide_env_values = true, global = true)]
    pub mongo_url: Option<String>,

    /// Document store database name (overrides the connection string default)
    #[arg(long, value_name = "NAME", env = "MONGO_DB_NAME", global = true)]
    pub mongo_db: Option<String>,

    /// Table store base URL
    #[arg(long, value_name = "URL", env = "SUPABASE_URL", global = true)]
    pub supabase_url: Option<String>,

    /// Table store service role key
    #[arg(
        long,
        value_name = "KEY",
        env = "SUPABASE_SERVICE_ROLE_KEY",
        hide_env_values = true,
        global = true
    )]
    pub supabase_key: Option<String>,

    /// Address the HTTP server listens on
    #[arg(long, value_name = "ADDR", env = "BIND_ADDR", global = true)]
    pub bind: Option<String>,

    /// Disable the CORS layer
    #[arg(long, global = true)]
    pub no_cors: bool,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Run one aggregation and print it as JSON
    #[command(group(
        ArgGroup::new("recruiter")
            .args(["recruiter_id", "recruiter_email"])
            .multiple(false)
    ))]
    Dump {
        /// Restrict to jobs owned by this recruiter id
        #[arg(long, value_name = "ID")]
        recruiter_id: Option<String>,

        /// Restrict to jobs owned by the recruiter with this email
        #[arg(long, value_name = "EMAIL")]
        recruiter_email: Option<String>,

        /// Print compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
    /// Write a default configuration file
    InitConfig {
        /// Where to write it
        #[arg(long, default_value = crate::config::DEFAULT_CONFIG_FILE, value_name = "FILE")]
        output: PathBuf,
    },
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand to run; serving is the default.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.supabase_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Supabase URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref uri) = self.mongo_url {
            if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
                return Err(
                    "Mongo URL must start with 'mongodb://' or 'mongodb+srv://'".to_string(),
                );
            }
        }

        if let Some(ref bind) = self.bind {
            if bind.parse::<std::net::SocketAddr>().is_err() {
                return Err(format!("Invalid bind address: {}", bind));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            config: None,
            mongo_url: Some("mongodb://localhost:27017/hiring".to_string()),
            mongo_db: None,
            supabase_url: Some("https://project.supabase.co".to_string()),
            supabase_key: Some("key".to_string()),
            bind: None,
            no_cors: false,
            verbose: false,
            quiet: false,
            command: None,
        }
    }

    #[test]
    fn test_default_command_is_serve() {
        let args = make_args();
        assert_eq!(args.command(), Command::Serve);
    }

    #[test]
    fn test_bind_without_subcommand() {
        let parsed =
            Args::try_parse_from(["results-aggregator", "--bind", "0.0.0.0:8080", "--no-cors"])
                .unwrap();
        assert_eq!(parsed.command, None);
        assert_eq!(parsed.bind.as_deref(), Some("0.0.0.0:8080"));
        assert!(parsed.no_cors);

        let parsed =
            Args::try_parse_from(["results-aggregator", "serve", "--bind", "0.0.0.0:9000"])
                .unwrap();
        assert_eq!(parsed.command, Some(Command::Serve));
        assert_eq!(parsed.bind.as_deref(), Some("0.0.0.0:9000"));
    }

    #[test]
    fn test_bind_addr_env_applies_to_default_command() {
        std::env::set_var("BIND_ADDR", "0.0.0.0:8080");
        let parsed = Args::try_parse_from(["results-aggregator"]);
        std::env::remove_var("BIND_ADDR");

        let parsed = parsed.unwrap();
        assert_eq!(parsed.command(), Command::Serve);
        assert_eq!(parsed.bind.as_deref(), Some("0.0.0.0:8080"));

        let mut config = crate::config::Config::default();
        config.merge_with_args(&parsed);
        assert_eq!(config.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_validation_invalid_urls() {
        let mut args = make_args();
        args.supabase_url = Some("project.supabase.co".to_string());
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.mongo_url = Some("http://localhost".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_bind_address() {
        let mut args = make_args();
        args.bind = Some("not-an-address".to_string());
        assert!(args.validate().is_err());

        args.bind = Some("0.0.0.0:8080".to_string());
        args.no_cors = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_dump_recruiter_flags_are_exclusive() {
        let parsed = Args::try_parse_from([
            "results-aggregator",
            "dump",
            "--recruiter-id",
            "abc",
            "--recruiter-email",
            "r@x.com",
        ]);
        assert!(parsed.is_err());

        let parsed =
            Args::try_parse_from(["results-aggregator", "dump", "--recruiter-email", "r@x.com"])
                .unwrap();
        assert_eq!(
            parsed.command,
            Some(Command::Dump {
                recruiter_id: None,
                recruiter_email: Some("r@x.com".to_string()),
                compact: false,
            })
        );
    }
}
