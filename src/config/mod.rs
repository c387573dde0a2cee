// src/config/mod.rs
// Runtime configuration loaded from .env and the process environment

use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::str::FromStr;

use crate::llm::gemini::{DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, GEMINI_BASE_URL};

#[derive(Debug, Clone)]
pub struct ForgeConfig {
    // ── Gemini
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub gemini_timeout: u64,

    // ── Local state
    pub data_dir: PathBuf,

    // ── Auth gateway
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub client_url: String,
    pub server_url: String,
    pub api_url: String,
    pub session_ttl_hours: i64,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub github_client_id: Option<String>,
    pub github_client_secret: Option<String>,

    // ── Rate limiting (per client IP)
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,

    // ── Logging
    pub log_level: String,
}

/// Parse `key` from the lookup, falling back to `default` when missing or unparsable.
/// Trailing `# comments` and surrounding whitespace are ignored.
fn env_var_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        None => default,
    }
}

/// Optional string value; blank counts as unset
fn env_opt<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("prompt-forge")
}

impl ForgeConfig {
    pub fn from_env() -> Self {
        // .env is optional
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, map in tests)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = &lookup;
        let host: String = env_var_or(lookup, "FORGE_HOST", "0.0.0.0".to_string());
        let port: u16 = env_var_or(lookup, "PORT", 3001);
        let server_url = env_opt(lookup, "SERVER_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port));
        let api_url = env_opt(lookup, "FORGE_API_URL")
            .unwrap_or_else(|| format!("{}/api", server_url.trim_end_matches('/')));

        Self {
            gemini_api_key: env_opt(lookup, "GEMINI_API_KEY").or_else(|| env_opt(lookup, "API_KEY")),
            gemini_model: env_var_or(lookup, "FORGE_MODEL", DEFAULT_MODEL.to_string()),
            gemini_base_url: env_var_or(lookup, "GEMINI_BASE_URL", GEMINI_BASE_URL.to_string()),
            gemini_timeout: env_var_or(lookup, "FORGE_GEMINI_TIMEOUT", DEFAULT_TIMEOUT_SECS),
            data_dir: env_opt(lookup, "FORGE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            host,
            port,
            environment: env_var_or(lookup, "FORGE_ENV", "development".to_string()),
            client_url: env_var_or(lookup, "CLIENT_URL", "http://localhost:3000".to_string()),
            server_url,
            api_url,
            session_ttl_hours: env_var_or(lookup, "FORGE_SESSION_TTL_HOURS", 24),
            google_client_id: env_opt(lookup, "GOOGLE_CLIENT_ID"),
            google_client_secret: env_opt(lookup, "GOOGLE_CLIENT_SECRET"),
            github_client_id: env_opt(lookup, "GITHUB_CLIENT_ID"),
            github_client_secret: env_opt(lookup, "GITHUB_CLIENT_SECRET"),
            rate_limit_max: env_var_or(lookup, "FORGE_RATE_LIMIT_MAX", 100),
            rate_limit_window_secs: env_var_or(lookup, "FORGE_RATE_LIMIT_WINDOW", 15 * 60),
            log_level: env_var_or(lookup, "FORGE_LOG_LEVEL", "info".to_string()),
        }
    }

    /// Get server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Where OAuth providers send the browser back to
    pub fn callback_url(&self, provider: &str) -> String {
        format!(
            "{}/api/auth/{}/callback",
            self.server_url.trim_end_matches('/'),
            provider
        )
    }

    pub fn google_configured(&self) -> bool {
        self.google_client_id.is_some() && self.google_client_secret.is_some()
    }

    pub fn github_configured(&self) -> bool {
        self.github_client_id.is_some() && self.github_client_secret.is_some()
    }
}

// Global config instance - loaded once at startup
pub static CONFIG: Lazy<ForgeConfig> = Lazy::new(ForgeConfig::from_env);
