//! Environment-driven configuration, read once at process startup.
//!
//! No dynamic reloads: every config type here is constructed by
//! [`Config::from_env`] and then handed to the subsystem it configures.

use std::env::VarError;
use std::ops::RangeInclusive;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("missing required environment variable {name}")]
    Missing { name: &'static str },
    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid { name: &'static str, value: String, reason: &'static str },
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) => Ok(v),
        Err(VarError::NotPresent) => Err(ConfigError::Missing { name }),
        Err(VarError::NotUnicode(_)) => {
            Err(ConfigError::Invalid { name, value: "<non-unicode>".into(), reason: "not UTF-8" })
        }
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: "could not parse",
    })
}

fn optional_parse<T: std::str::FromStr>(
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(v) => parse(name, &v),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => {
            Err(ConfigError::Invalid { name, value: "<non-unicode>".into(), reason: "not UTF-8" })
        }
    }
}

/// Admission policy for a full command buffer (see `spec.md` §9 Open Question).
///
/// `FailFast` is the default this crate selects; `Block` is available for
/// callers who would rather wait out a caller-supplied deadline than see an
/// immediate `Overloaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionPolicy {
    FailFast,
    Block,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self::FailFast
    }
}

/// Worker-side Command Buffer configuration.
#[derive(Debug, Clone)]
pub struct BufferConfig {
    pub capacity: usize,
    pub query_concurrency: usize,
    pub admission_policy: AdmissionPolicy,
}

impl BufferConfig {
    pub const DEFAULT_CAPACITY: usize = 10_000;

    fn default_query_concurrency() -> usize {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4) * 4
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            capacity: optional_parse("BUFFER_CAPACITY", Self::DEFAULT_CAPACITY)?,
            query_concurrency: optional_parse(
                "QUERY_CONCURRENCY",
                Self::default_query_concurrency(),
            )?,
            admission_policy: AdmissionPolicy::FailFast,
        })
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            query_concurrency: Self::default_query_concurrency(),
            admission_policy: AdmissionPolicy::FailFast,
        }
    }
}

/// Per-tenant circuit breaker configuration (Router-side).
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub failure_threshold: usize,
    pub open_timeout: Duration,
}

impl BreakerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            failure_threshold: optional_parse("BREAKER_FAILURE_THRESHOLD", 5)?,
            open_timeout: Duration::from_secs(optional_parse(
                "BREAKER_OPEN_TIMEOUT_SECONDS",
                30,
            )?),
        })
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, open_timeout: Duration::from_secs(30) }
    }
}

/// Router-side Tenant Process Supervisor configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub port_range: RangeInclusive<u16>,
    pub health_interval: Duration,
    pub health_failures_to_restart: u32,
    pub restart_window: Duration,
    pub max_restarts: u32,
    pub spawn_timeout: Duration,
    pub grace_period: Duration,
}

impl SupervisorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let min: u16 = optional_parse("SUPERVISOR_PORT_RANGE_MIN", 50_000)?;
        let max: u16 = optional_parse("SUPERVISOR_PORT_RANGE_MAX", 60_000)?;
        if min > max {
            return Err(ConfigError::Invalid {
                name: "SUPERVISOR_PORT_RANGE_MIN",
                value: min.to_string(),
                reason: "must be <= SUPERVISOR_PORT_RANGE_MAX",
            });
        }
        Ok(Self {
            port_range: min..=max,
            health_interval: Duration::from_secs(optional_parse("HEALTH_INTERVAL_SECONDS", 5)?),
            health_failures_to_restart: optional_parse("HEALTH_FAILURES_TO_RESTART", 3)?,
            restart_window: Duration::from_secs(600),
            max_restarts: 5,
            spawn_timeout: Duration::from_secs(30),
            grace_period: Duration::from_secs(5),
        })
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            port_range: 50_000..=60_000,
            health_interval: Duration::from_secs(5),
            health_failures_to_restart: 3,
            restart_window: Duration::from_secs(600),
            max_restarts: 5,
            spawn_timeout: Duration::from_secs(30),
            grace_period: Duration::from_secs(5),
        }
    }
}

/// Top-level Router configuration: the union of everything read from the
/// environment at process startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub supervisor: SupervisorConfig,
    pub buffer: BufferConfig,
    pub breaker: BreakerConfig,
    pub listen_addr: String,
    pub worker_binary: String,
    pub call_deadline: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            supervisor: SupervisorConfig::from_env()?,
            buffer: BufferConfig::from_env()?,
            breaker: BreakerConfig::from_env()?,
            listen_addr: match std::env::var("ROUTER_LISTEN_ADDR") {
                Ok(v) => v,
                Err(VarError::NotPresent) => "0.0.0.0:7000".to_string(),
                Err(VarError::NotUnicode(_)) => {
                    return Err(ConfigError::Invalid {
                        name: "ROUTER_LISTEN_ADDR",
                        value: "<non-unicode>".into(),
                        reason: "not UTF-8",
                    })
                }
            },
            worker_binary: match std::env::var("WORKER_BINARY_PATH") {
                Ok(v) => v,
                Err(VarError::NotPresent) => "acsd-worker".to_string(),
                Err(VarError::NotUnicode(_)) => {
                    return Err(ConfigError::Invalid {
                        name: "WORKER_BINARY_PATH",
                        value: "<non-unicode>".into(),
                        reason: "not UTF-8",
                    })
                }
            },
            call_deadline: Duration::from_secs(optional_parse("CALL_DEADLINE_SECONDS", 10)?),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            supervisor: SupervisorConfig::default(),
            buffer: BufferConfig::default(),
            breaker: BreakerConfig::default(),
            listen_addr: "0.0.0.0:7000".to_string(),
            worker_binary: "acsd-worker".to_string(),
            call_deadline: Duration::from_secs(10),
        }
    }
}

/// Worker process inputs: `TENANT_ID` and `GRPC_PORT` (spec.md §6).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub tenant_id: crate::tenant::TenantId,
    pub grpc_port: u16,
    pub buffer: BufferConfig,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let tenant_id = required("TENANT_ID")?;
        let grpc_port = parse("GRPC_PORT", &required("GRPC_PORT")?)?;
        Ok(Self {
            tenant_id: tenant_id.into(),
            grpc_port,
            buffer: BufferConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_config_defaults() {
        let cfg = BufferConfig::default();
        assert_eq!(cfg.capacity, 10_000);
        assert_eq!(cfg.admission_policy, AdmissionPolicy::FailFast);
    }

    #[test]
    fn breaker_config_defaults() {
        let cfg = BreakerConfig::default();
        assert_eq!(cfg.failure_threshold, 5);
        assert_eq!(cfg.open_timeout, Duration::from_secs(30));
    }

    #[test]
    fn supervisor_config_rejects_inverted_port_range() {
        std::env::set_var("SUPERVISOR_PORT_RANGE_MIN", "60000");
        std::env::set_var("SUPERVISOR_PORT_RANGE_MAX", "50000");
        let result = SupervisorConfig::from_env();
        std::env::remove_var("SUPERVISOR_PORT_RANGE_MIN");
        std::env::remove_var("SUPERVISOR_PORT_RANGE_MAX");
        assert!(result.is_err());
    }
}
