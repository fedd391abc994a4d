use std::path::PathBuf;

use crate::error::AnalysisError;

/// Service configuration loaded explicitly from environment variables.
///
/// Catalog paths have no defaults; the caller must point at both files.
/// Redis is optional; without it every model call goes to the backend.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the checklist catalog (`checklist.json`).
    pub checklist_path: PathBuf,
    /// Path to the prompt templates (`prompts.json`).
    pub prompts_path: PathBuf,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Accepted article host; subdomains are accepted too.
    pub target_domain: String,
    /// Redis connection URL. `None` disables the response cache.
    pub redis_url: Option<String>,
    pub response_cache_ttl_secs: u64,
}

impl Config {
    /// Required:
    /// - `CHECKLIST_PATH`: rule catalog JSON
    /// - `PROMPTS_PATH`: prompt template JSON
    ///
    /// Optional:
    /// - `BIND_ADDR` (default `0.0.0.0:5000`)
    /// - `TARGET_DOMAIN` (default `medium.com`)
    /// - `REDIS_URL`
    /// - `RESPONSE_CACHE_TTL_SECS` (default 3600)
    pub fn from_env() -> Result<Self, AnalysisError> {
        let checklist_path = required_file("CHECKLIST_PATH")?;
        let prompts_path = required_file("PROMPTS_PATH")?;

        let response_cache_ttl_secs = match std::env::var("RESPONSE_CACHE_TTL_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                AnalysisError::Config(format!("RESPONSE_CACHE_TTL_SECS is not a number: {raw}"))
            })?,
            Err(_) => 3600,
        };

        Ok(Self {
            checklist_path,
            prompts_path,
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            target_domain: std::env::var("TARGET_DOMAIN")
                .unwrap_or_else(|_| "medium.com".to_string())
                .to_ascii_lowercase(),
            redis_url: std::env::var("REDIS_URL").ok().filter(|u| !u.trim().is_empty()),
            response_cache_ttl_secs,
        })
    }
}

fn required_file(var: &str) -> Result<PathBuf, AnalysisError> {
    let value = std::env::var(var)
        .map_err(|_| AnalysisError::Config(format!("{var} environment variable is required")))?;
    let path = PathBuf::from(value);
    if !path.is_file() {
        return Err(AnalysisError::Config(format!(
            "{var} points to a missing file: {}",
            path.display()
        )));
    }
    Ok(path)
}
