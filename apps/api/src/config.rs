use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::notify::{MailerConfig, TlsMode};

const DEFAULT_EXAM_LINK_BASE: &str = "https://your-app.vercel.app/exam";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// What the intake pipeline does when a live delivery attempt fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Keep the saved record and report the failure in the response message.
    #[default]
    Warn,
    /// Turn the failure into a 500 once the record is saved.
    Fail,
}

impl DeliveryPolicy {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "fail" => Ok(Self::Fail),
            other => bail!("EMAIL_FAILURE_POLICY must be 'warn' or 'fail', got '{other}'"),
        }
    }
}

/// S3 settings, only present when resume bytes should be kept.
#[derive(Debug, Clone)]
pub struct ResumeStorageConfig {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub mailer: MailerConfig,
    pub delivery_policy: DeliveryPolicy,
    pub exam_link_base: String,
    pub company_name: String,
    pub resume_storage: Option<ResumeStorageConfig>,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let smtp_port = get("SMTP_PORT")
            .unwrap_or_else(|| "587".to_string())
            .parse::<u16>()
            .context("SMTP_PORT must be a valid port number")?;
        let timeout_secs = get("SMTP_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse::<u64>()
            .context("SMTP_TIMEOUT_SECS must be a whole number of seconds")?;
        let username = get("SMTP_USERNAME");
        let tls = match get("SMTP_TLS") {
            Some(raw) => TlsMode::parse(&raw).with_context(|| {
                format!("SMTP_TLS must be starttls, implicit or none, got '{raw}'")
            })?,
            None => TlsMode::for_port(smtp_port),
        };

        let mailer = MailerConfig {
            host: get("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            port: smtp_port,
            from_address: get("EMAIL_FROM").or_else(|| username.clone()),
            username,
            password: get("SMTP_PASSWORD"),
            dry_run: get("DRY_RUN_EMAILS")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(true),
            tls,
            timeout: Duration::from_secs(timeout_secs),
        };

        let resume_storage = match get("RESUME_S3_BUCKET") {
            Some(bucket) => Some(ResumeStorageConfig {
                bucket,
                endpoint: require("S3_ENDPOINT")?,
                access_key_id: require("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            }),
            None => None,
        };

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            port: get("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            mailer,
            delivery_policy: get("EMAIL_FAILURE_POLICY")
                .map(|raw| DeliveryPolicy::parse(&raw))
                .transpose()?
                .unwrap_or_default(),
            exam_link_base: get("EXAM_LINK_BASE")
                .unwrap_or_else(|| DEFAULT_EXAM_LINK_BASE.to_string()),
            company_name: get("COMPANY_NAME").unwrap_or_else(|| "Your Company".to_string()),
            resume_storage,
            max_upload_bytes: get("MAX_UPLOAD_BYTES")
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("MAX_UPLOAD_BYTES must be a byte count")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        })
    }
}
