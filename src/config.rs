use std::path::Path;
use std::time::Duration;

use crate::fetch::RetryPolicy;

pub const DEFAULT_JIKAN_BASE_URL: &str = "https://api.jikan.moe/v4";
pub const DEFAULT_MANGADEX_BASE_URL: &str = "https://api.mangadex.org";

// The two origins have independent rate limits, so each gets its own floor
// and retry tuning. Jikan allows ~3 req/s; MangaDex is a little looser but
// throttles harder, hence the shorter floor with the steeper retry base.
const DEFAULT_JIKAN_MIN_DELAY_MS: u64 = 400;
const DEFAULT_MANGADEX_MIN_DELAY_MS: u64 = 300;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_JIKAN_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_JIKAN_BACKOFF_MULTIPLIER: f64 = 2.0;
const DEFAULT_MANGADEX_RETRY_DELAY_MS: u64 = 800;
const DEFAULT_MANGADEX_BACKOFF_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct Config {
    pub jikan_base_url: String,
    pub mangadex_base_url: String,
    pub jikan_min_delay: Duration,
    pub mangadex_min_delay: Duration,
    pub jikan_retry: RetryPolicy,
    pub mangadex_retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            jikan_base_url: DEFAULT_JIKAN_BASE_URL.to_string(),
            mangadex_base_url: DEFAULT_MANGADEX_BASE_URL.to_string(),
            jikan_min_delay: Duration::from_millis(DEFAULT_JIKAN_MIN_DELAY_MS),
            mangadex_min_delay: Duration::from_millis(DEFAULT_MANGADEX_MIN_DELAY_MS),
            jikan_retry: RetryPolicy {
                max_retries: DEFAULT_MAX_RETRIES,
                retry_delay: Duration::from_millis(DEFAULT_JIKAN_RETRY_DELAY_MS),
                backoff_multiplier: DEFAULT_JIKAN_BACKOFF_MULTIPLIER,
            },
            mangadex_retry: RetryPolicy {
                max_retries: DEFAULT_MAX_RETRIES,
                retry_delay: Duration::from_millis(DEFAULT_MANGADEX_RETRY_DELAY_MS),
                backoff_multiplier: DEFAULT_MANGADEX_BACKOFF_MULTIPLIER,
            },
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let defaults = Config::default();
        Config {
            jikan_base_url: env_string("JIKAN_BASE_URL", defaults.jikan_base_url),
            mangadex_base_url: env_string("MANGADEX_BASE_URL", defaults.mangadex_base_url),
            jikan_min_delay: Duration::from_millis(env_u64(
                "JIKAN_MIN_DELAY_MS",
                DEFAULT_JIKAN_MIN_DELAY_MS,
            )),
            mangadex_min_delay: Duration::from_millis(env_u64(
                "MANGADEX_MIN_DELAY_MS",
                DEFAULT_MANGADEX_MIN_DELAY_MS,
            )),
            jikan_retry: RetryPolicy {
                max_retries: env_u32("JIKAN_MAX_RETRIES", DEFAULT_MAX_RETRIES),
                retry_delay: Duration::from_millis(env_u64(
                    "JIKAN_RETRY_DELAY_MS",
                    DEFAULT_JIKAN_RETRY_DELAY_MS,
                )),
                backoff_multiplier: env_f64(
                    "JIKAN_BACKOFF_MULTIPLIER",
                    DEFAULT_JIKAN_BACKOFF_MULTIPLIER,
                ),
            },
            mangadex_retry: RetryPolicy {
                max_retries: env_u32("MANGADEX_MAX_RETRIES", DEFAULT_MAX_RETRIES),
                retry_delay: Duration::from_millis(env_u64(
                    "MANGADEX_RETRY_DELAY_MS",
                    DEFAULT_MANGADEX_RETRY_DELAY_MS,
                )),
                backoff_multiplier: env_f64(
                    "MANGADEX_BACKOFF_MULTIPLIER",
                    DEFAULT_MANGADEX_BACKOFF_MULTIPLIER,
                ),
            },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.jikan_base_url.is_empty() {
            return Err("JIKAN_BASE_URL is empty".into());
        }
        if self.mangadex_base_url.is_empty() {
            return Err("MANGADEX_BASE_URL is empty".into());
        }
        Ok(())
    }
}

fn env_string(name: &str, default: String) -> String {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => value,
        _ => default,
    }
}

// Unparseable or out-of-range values fall back to the default; no silent
// truncation across integer widths.

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Load environment variables from .env files, preferring a local override.
pub fn load_dotenv() -> anyhow::Result<()> {
    if Path::new(".env.local").exists() {
        dotenvy::from_filename(".env.local")?;
    } else if Path::new(".env").exists() {
        dotenvy::from_filename(".env")?;
    }
    Ok(())
}
