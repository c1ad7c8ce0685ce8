//! Process configuration.
//!
//! Everything is read from environment variables once at startup (after
//! `.env` has been loaded by `main`). Every value except `WEBHOOK_URL` has a
//! default; a value that is present but does not parse is a fatal error rather
//! than a silent fallback.
//!
//! | variable | default |
//! |---|---|
//! | `WEBHOOK_URL` | required |
//! | `CATALOG_PATH` | `games.json` |
//! | `CHECKPOINT_PATH` | `last_news_state.json` |
//! | `STEAM_API_BASE` | `https://api.steampowered.com` |
//! | `STEAM_STORE_BASE` | `https://store.steampowered.com` |
//! | `SCAN_REQUEST_DELAY_MS` | `1500` |
//! | `SCAN_INTERVAL_MINS` | `10` |
//! | `SCAN_CHECKPOINT_EVERY` | `50` |
//! | `SCAN_RATE_LIMIT_COOLDOWN_SECS` | `300` |
//! | `SCAN_RETRY_ATTEMPTS` | `2` |
//! | `SCAN_RETRY_DELAY_MS` | `5000` |
//! | `REQUEST_TIMEOUT_SECS` | `10` |
//! | `DISPATCH_INTERVAL_SECS` | `2` |
//! | `DISPATCH_DEFAULT_COOLDOWN_SECS` | `30` |
//! | `DESCRIPTION_LIMIT` | `250` |
//! | `BUILD_SCAN_WINDOW` | `3` |
//! | `STATUS_ADDR` | unset (status server disabled) |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::upstream::RetryConfig;

const DEFAULT_CATALOG_PATH: &str = "games.json";
const DEFAULT_CHECKPOINT_PATH: &str = "last_news_state.json";
const DEFAULT_STEAM_API_BASE: &str = "https://api.steampowered.com";
const DEFAULT_STEAM_STORE_BASE: &str = "https://store.steampowered.com";

const DEFAULT_REQUEST_DELAY_MS: u64 = 1500;
const DEFAULT_PASS_INTERVAL_MINS: u64 = 10;
const DEFAULT_CHECKPOINT_EVERY: usize = 50;
const DEFAULT_RATE_LIMIT_COOLDOWN_SECS: u64 = 300;
const DEFAULT_RETRY_ATTEMPTS: u32 = 2;
const DEFAULT_RETRY_DELAY_MS: u64 = 5000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const DEFAULT_DISPATCH_INTERVAL_SECS: u64 = 2;
const DEFAULT_DISPATCH_COOLDOWN_SECS: u64 = 30;

const DEFAULT_DESCRIPTION_LIMIT: usize = 250;
const DEFAULT_BUILD_SCAN_WINDOW: u32 = 3;

/// Errors that can occur while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    /// A variable is set but does not parse.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Upstream client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub api_base: String,
    pub store_base: String,
    /// Bound on every upstream and webhook request.
    pub request_timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            api_base: DEFAULT_STEAM_API_BASE.to_string(),
            store_base: DEFAULT_STEAM_STORE_BASE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Pacing for the scan loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Sleep between consecutive entities.
    pub request_delay: Duration,

    /// Sleep between the end of one pass and the start of the next.
    pub pass_interval: Duration,

    /// Flush checkpoints after this many entities. Zero or one flushes after
    /// every entity; the end-of-pass flush always happens.
    pub checkpoint_every: usize,

    /// Global pause after the upstream signals rate limiting.
    pub rate_limit_cooldown: Duration,

    /// Retry policy for transient upstream failures.
    pub retry: RetryConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            pass_interval: Duration::from_secs(DEFAULT_PASS_INTERVAL_MINS * 60),
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            rate_limit_cooldown: Duration::from_secs(DEFAULT_RATE_LIMIT_COOLDOWN_SECS),
            retry: RetryConfig::fixed(
                DEFAULT_RETRY_ATTEMPTS,
                Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            ),
        }
    }
}

/// Pacing for the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Time between dispatch ticks; at most one notification per tick.
    pub interval: Duration,

    /// Cooldown after webhook backpressure that carries no retry hint.
    pub default_cooldown: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            interval: Duration::from_secs(DEFAULT_DISPATCH_INTERVAL_SECS),
            default_cooldown: Duration::from_secs(DEFAULT_DISPATCH_COOLDOWN_SECS),
        }
    }
}

/// Notification building settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichConfig {
    /// Maximum description length in characters, ellipsis included.
    pub description_limit: usize,

    /// Number of recent news items scanned for build ids.
    pub build_scan_window: u32,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        EnrichConfig {
            description_limit: DEFAULT_DESCRIPTION_LIMIT,
            build_scan_window: DEFAULT_BUILD_SCAN_WINDOW,
        }
    }
}

/// Complete process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub webhook_url: String,
    pub catalog_path: PathBuf,
    pub checkpoint_path: PathBuf,
    pub status_addr: Option<SocketAddr>,
    pub upstream: UpstreamConfig,
    pub scan: ScanConfig,
    pub dispatch: DispatchConfig,
    pub enrich: EnrichConfig,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to its
    /// value. Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let webhook_url = get("WEBHOOK_URL").ok_or(ConfigError::Missing("WEBHOOK_URL"))?;
        if !(webhook_url.starts_with("https://") || webhook_url.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                key: "WEBHOOK_URL",
                value: webhook_url,
                reason: "expected an http(s) URL".to_string(),
            });
        }

        let request_timeout_secs =
            parse_or(&get, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        let retry_attempts = parse_or(&get, "SCAN_RETRY_ATTEMPTS", DEFAULT_RETRY_ATTEMPTS)?;
        let retry_delay_ms = parse_or(&get, "SCAN_RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS)?;

        AppConfig {
            webhook_url,
            catalog_path: get("CATALOG_PATH")
                .unwrap_or_else(|| DEFAULT_CATALOG_PATH.to_string())
                .into(),
            checkpoint_path: get("CHECKPOINT_PATH")
                .unwrap_or_else(|| DEFAULT_CHECKPOINT_PATH.to_string())
                .into(),
            status_addr: parse_opt(&get, "STATUS_ADDR")?,
            upstream: UpstreamConfig {
                api_base: get("STEAM_API_BASE")
                    .unwrap_or_else(|| DEFAULT_STEAM_API_BASE.to_string()),
                store_base: get("STEAM_STORE_BASE")
                    .unwrap_or_else(|| DEFAULT_STEAM_STORE_BASE.to_string()),
                request_timeout: Duration::from_secs(request_timeout_secs),
            },
            scan: ScanConfig {
                request_delay: Duration::from_millis(parse_or(
                    &get,
                    "SCAN_REQUEST_DELAY_MS",
                    DEFAULT_REQUEST_DELAY_MS,
                )?),
                pass_interval: Duration::from_secs(
                    parse_or(&get, "SCAN_INTERVAL_MINS", DEFAULT_PASS_INTERVAL_MINS)?.saturating_mul(60),
                ),
                checkpoint_every: parse_or(&get, "SCAN_CHECKPOINT_EVERY", DEFAULT_CHECKPOINT_EVERY)?,
                rate_limit_cooldown: Duration::from_secs(parse_or(
                    &get,
                    "SCAN_RATE_LIMIT_COOLDOWN_SECS",
                    DEFAULT_RATE_LIMIT_COOLDOWN_SECS,
                )?),
                retry: RetryConfig::fixed(retry_attempts, Duration::from_millis(retry_delay_ms)),
            },
            dispatch: DispatchConfig {
                interval: Duration::from_secs(parse_or(
                    &get,
                    "DISPATCH_INTERVAL_SECS",
                    DEFAULT_DISPATCH_INTERVAL_SECS,
                )?),
                default_cooldown: Duration::from_secs(parse_or(
                    &get,
                    "DISPATCH_DEFAULT_COOLDOWN_SECS",
                    DEFAULT_DISPATCH_COOLDOWN_SECS,
                )?),
            },
            enrich: EnrichConfig {
                description_limit: parse_or(&get, "DESCRIPTION_LIMIT", DEFAULT_DESCRIPTION_LIMIT)?,
                build_scan_window: parse_or(&get, "BUILD_SCAN_WINDOW", DEFAULT_BUILD_SCAN_WINDOW)?,
            },
        }
        .validated()
    }

    /// Rejects combinations that would make a loop spin or a field unusable.
    fn validated(self) -> Result<Self, ConfigError> {
        if self.dispatch.interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "DISPATCH_INTERVAL_SECS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.enrich.description_limit < 4 {
            return Err(ConfigError::Invalid {
                key: "DESCRIPTION_LIMIT",
                value: self.enrich.description_limit.to_string(),
                reason: "must leave room for the ellipsis".to_string(),
            });
        }
        if self.upstream.request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "REQUEST_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(self)
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}

fn parse_opt<T, G>(get: &G, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}
