use anyhow::{Context, Result, bail};
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Service configuration, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential for the advisory endpoint. Its absence only affects chat replies.
    pub groq_api_key: Option<String>,
    pub bind_addr: String,
    /// TrueType font embedded into exported reports; installed Korean fonts are tried when unset
    pub report_font_path: Option<PathBuf>,
    /// Idle time after which a session expires. `None` keeps sessions forever.
    pub session_ttl: Option<chrono::Duration>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let session_ttl = match get("SESSION_TTL_SECS") {
            Some(raw) => {
                let secs: i64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("SESSION_TTL_SECS is not a number: {raw}"))?;
                if secs < 0 {
                    bail!("SESSION_TTL_SECS must not be negative: {secs}");
                }
                (secs > 0).then(|| chrono::Duration::seconds(secs))
            }
            None => Some(chrono::Duration::seconds(DEFAULT_SESSION_TTL_SECS)),
        };

        let log_format = match get("LOG_FORMAT").as_deref() {
            Some("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        };

        Ok(Self {
            groq_api_key: get("GROQ_API_KEY"),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            report_font_path: get("REPORT_FONT_PATH").map(PathBuf::from),
            session_ttl,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert!(config.groq_api_key.is_none());
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.session_ttl, Some(chrono::Duration::seconds(3600)));
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.report_font_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("REPORT_FONT_PATH", "/fonts/NotoSansKR.ttf"),
            ("SESSION_TTL_SECS", "0"),
            ("LOG_FORMAT", "pretty"),
        ])
        .unwrap();
        assert_eq!(config.groq_api_key.as_deref(), Some("gsk_test"));
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(
            config.report_font_path,
            Some(PathBuf::from("/fonts/NotoSansKR.ttf"))
        );
        assert!(config.session_ttl.is_none());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_blank_key_is_unset() {
        let config = config(&[("GROQ_API_KEY", "  ")]).unwrap();
        assert!(config.groq_api_key.is_none());
    }

    #[test]
    fn test_invalid_ttl() {
        assert!(config(&[("SESSION_TTL_SECS", "soon")]).is_err());
        assert!(config(&[("SESSION_TTL_SECS", "-5")]).is_err());
    }
}
