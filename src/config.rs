use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono_tz::Tz;

use crate::constants::{
    DEFAULT_REPORT_HOUR, DEFAULT_RUN_LEASE_TTL_SECS, DEFAULT_TRUSTED_REFERER,
    MAX_RUN_LEASE_TTL_SECS,
};

#[derive(Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub trusted_referer: String,
    pub export: ExportConfig,
    pub upstream: UpstreamConfig,
    pub destination: DestinationConfig,
    pub slack: SlackConfig,
    pub report: ReportConfig,
    pub worker: WorkerConfig,
}

/// Per-run export settings; resolved against the sender registry at run time.
#[derive(Debug, Clone, Default)]
pub struct ExportConfig {
    pub provider: String,
    pub batch_size: Option<usize>,
    pub start_from: Option<String>,
    pub log_types: Option<String>,
    pub run_lease_ttl_secs: u64,
}

#[derive(Clone)]
pub struct UpstreamConfig {
    pub domain: String,
    pub api_token: String,
    pub timeout_secs: u64,
}

#[derive(Clone)]
pub struct DestinationConfig {
    pub url: String,
    pub token: String,
}

#[derive(Clone)]
pub struct SlackConfig {
    pub webhook_url: Option<String>,
    pub send_success: bool,
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub hour: u32,
    pub timezone: Tz,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub is_leader: bool,
    pub export_cron: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            hour: DEFAULT_REPORT_HOUR,
            timezone: Tz::UTC,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("enable_file_logs", &self.enable_file_logs)
            .field("log_dir", &self.log_dir)
            .field("sled_path", &self.sled_path)
            .field("trusted_referer", &self.trusted_referer)
            .field("export", &self.export)
            .field("upstream", &self.upstream)
            .field("destination", &self.destination)
            .field("slack", &self.slack)
            .field("report", &self.report)
            .field("worker", &self.worker)
            .finish()
    }
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("domain", &self.domain)
            .field("api_token", &"***REDACTED***")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl fmt::Debug for DestinationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationConfig")
            .field("url", &self.url)
            .field("token", &"***REDACTED***")
            .finish()
    }
}

impl fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackConfig")
            .field(
                "webhook_url",
                &self.webhook_url.as_ref().map(|_| "***REDACTED***"),
            )
            .field("send_success", &self.send_success)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        let log_level = env::var("RUST_LOG")
            .or_else(|_| env::var("LOG_LEVEL"))
            .unwrap_or_else(|_| "info".to_string());

        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level,
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/logs-export.sled"),
            trusted_referer: env_or("TRUSTED_REFERER", DEFAULT_TRUSTED_REFERER),
            export: ExportConfig {
                provider: env_or("PROVIDER", "").trim().to_string(),
                batch_size: env_opt_parse("BATCH_SIZE"),
                start_from: env_opt("START_FROM"),
                log_types: env_opt("LOG_TYPES"),
                run_lease_ttl_secs: env_or_parse_in_range(
                    "RUN_LEASE_TTL_SECS",
                    DEFAULT_RUN_LEASE_TTL_SECS,
                    1..=MAX_RUN_LEASE_TTL_SECS,
                ),
            },
            upstream: UpstreamConfig {
                domain: env_or("UPSTREAM_DOMAIN", ""),
                api_token: env_or("UPSTREAM_API_TOKEN", ""),
                timeout_secs: env_or_parse("HTTP_TIMEOUT_SECS", 30_u64),
            },
            destination: DestinationConfig {
                url: env_or("DESTINATION_URL", ""),
                token: env_or("DESTINATION_TOKEN", ""),
            },
            slack: SlackConfig {
                webhook_url: env_opt("SLACK_INCOMING_WEBHOOK_URL"),
                send_success: env_or_bool("SLACK_SEND_SUCCESS", false),
            },
            report: ReportConfig {
                hour: env_or_parse("DAILY_REPORT_TIME", DEFAULT_REPORT_HOUR).min(23),
                timezone: env_or_parse("REPORT_TIMEZONE", Tz::UTC),
            },
            worker: WorkerConfig {
                is_leader: env_or_bool("WORKER_LEADER", true),
                export_cron: env_opt("EXPORT_CRON"),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Unset and blank values are both treated as absent.
pub fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn env_opt_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env_opt(key)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Failed to parse env var, ignoring");
            None
        }
    }
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

/// Like `env_or_parse`, but values outside `range` also fall back to the default.
pub fn env_or_parse_in_range<T>(key: &str, default: T, range: RangeInclusive<T>) -> T
where
    T: FromStr + Copy + PartialOrd + fmt::Display,
{
    let value = env_or_parse(key, default);
    if range.contains(&value) {
        value
    } else {
        tracing::warn!(
            key,
            value = %value,
            min = %range.start(),
            max = %range.end(),
            "Env var out of range, using default"
        );
        default
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
