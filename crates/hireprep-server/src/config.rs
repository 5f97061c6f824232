use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub media_root: PathBuf,
    pub token_ttl_hours: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = get("HIREPREP_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("HIREPREP_JWT_SECRET is unset or still a placeholder");
        }

        let port = get("HIREPREP_PORT")
            .unwrap_or_else(|| "8000".into())
            .parse()
            .context("HIREPREP_PORT must be a port number")?;
        let token_ttl_hours = get("HIREPREP_TOKEN_TTL_HOURS")
            .unwrap_or_else(|| "720".into())
            .parse()
            .context("HIREPREP_TOKEN_TTL_HOURS must be a whole number of hours")?;

        Ok(Self {
            jwt_secret,
            db_path: get("HIREPREP_DB_PATH").unwrap_or_else(|| "hireprep.db".into()).into(),
            host: get("HIREPREP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            media_root: get("HIREPREP_MEDIA_ROOT").unwrap_or_else(|| "./media".into()).into(),
            token_ttl_hours,
        })
    }
}
