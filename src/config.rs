use crate::services::auth_gate::LocalAdmin;
use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub admin_allowlist: Vec<String>,
    pub local_admin_email: Option<String>,
    pub local_admin_password: Option<String>,
    pub prediction_url: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Compliance document hub API")]
pub struct Args {
    /// Host to bind to (overrides DOCVAULT_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides DOCVAULT_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where payloads are stored (overrides DOCVAULT_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides DOCVAULT_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Admin allow-list emails; repeatable (overrides DOCVAULT_ADMIN_ALLOWLIST)
    #[arg(long = "admin-email")]
    pub admin_emails: Vec<String>,

    /// Enable the local admin account with this email (DOCVAULT_LOCAL_ADMIN_EMAIL).
    /// Requires the matching password; off by default.
    #[arg(long)]
    pub local_admin_email: Option<String>,

    /// Password for the local admin account (DOCVAULT_LOCAL_ADMIN_PASSWORD)
    #[arg(long)]
    pub local_admin_password: Option<String>,

    /// Prediction service URL (overrides DOCVAULT_PREDICTION_URL)
    #[arg(long)]
    pub prediction_url: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("DOCVAULT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("DOCVAULT_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing DOCVAULT_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading DOCVAULT_PORT"),
        };
        let env_storage =
            env::var("DOCVAULT_STORAGE_DIR").unwrap_or_else(|_| "./data/blobs".into());
        let env_db = env::var("DOCVAULT_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/docvault.db".into());
        let env_allowlist = env::var("DOCVAULT_ADMIN_ALLOWLIST")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let env_prediction = env::var("DOCVAULT_PREDICTION_URL")
            .unwrap_or_else(|_| "http://localhost:8000/predict/".into());

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            admin_allowlist: if args.admin_emails.is_empty() {
                env_allowlist
            } else {
                args.admin_emails
            },
            local_admin_email: args
                .local_admin_email
                .or_else(|| env::var("DOCVAULT_LOCAL_ADMIN_EMAIL").ok()),
            local_admin_password: args
                .local_admin_password
                .or_else(|| env::var("DOCVAULT_LOCAL_ADMIN_PASSWORD").ok()),
            prediction_url: args.prediction_url.unwrap_or(env_prediction),
        };

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Local admin credentials, only when both halves are configured.
    pub fn local_admin(&self) -> Option<LocalAdmin> {
        match (&self.local_admin_email, &self.local_admin_password) {
            (Some(email), Some(password)) => Some(LocalAdmin {
                email: email.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}
