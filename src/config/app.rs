//! Application and target configuration structures.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::target::MAX_CONCURRENT_JOBS;

use super::validation::ConfigError;

/// Default probe interval (30 seconds).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Default per-attempt timeout (3 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Default echo attempts per ping cycle.
pub const DEFAULT_COUNT: usize = 5;

/// Default hop limit per trace cycle.
pub const DEFAULT_MAX_HOPS: u8 = 30;

fn default_enabled() -> bool {
    true
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_count() -> usize {
    DEFAULT_COUNT
}

fn default_max_hops() -> u8 {
    DEFAULT_MAX_HOPS
}

fn default_max_concurrent_jobs() -> usize {
    MAX_CONCURRENT_JOBS
}

fn default_startup_stagger() -> Duration {
    Duration::from_secs(5)
}

/// Configuration for one ping target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingTargetConfig {
    /// Unique name for this target.
    pub name: String,
    /// Target host (hostname or IP address).
    pub host: String,
    /// Source address to probe from (IP literal).
    #[serde(default)]
    pub source: Option<String>,
    /// Enable this target (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Scheduling interval; also the spacing between echo attempts
    /// within a cycle (default: 30s).
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    /// Per-attempt timeout (default: 3s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Echo attempts per cycle (default: 5).
    #[serde(default = "default_count")]
    pub count: usize,
    /// Bound on concurrently running cycles (default: 10).
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    /// Static labels for the exporting layer.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl PingTargetConfig {
    /// Create a new ping target configuration with defaults.
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            source: None,
            enabled: true,
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            count: DEFAULT_COUNT,
            max_concurrent_jobs: MAX_CONCURRENT_JOBS,
            labels: BTreeMap::new(),
        }
    }

    /// Set the scheduling interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the attempts per cycle.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Set the source address.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the concurrent-cycle bound.
    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    /// Add a static label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Configuration for one trace target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceTargetConfig {
    /// Unique name for this target.
    pub name: String,
    /// Target host (hostname or IP address).
    pub host: String,
    /// Source address to probe from (IP literal).
    #[serde(default)]
    pub source: Option<String>,
    /// Enable this target (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Scheduling interval (default: 30s).
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    /// Per-attempt timeout (default: 3s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Probes per hop per cycle (default: 5).
    #[serde(default = "default_count")]
    pub count: usize,
    /// Hop limit per cycle (default: 30).
    #[serde(default = "default_max_hops")]
    pub max_hops: u8,
    /// Static labels for the exporting layer.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl TraceTargetConfig {
    /// Create a new trace target configuration with defaults.
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            source: None,
            enabled: true,
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            count: DEFAULT_COUNT,
            max_hops: DEFAULT_MAX_HOPS,
            labels: BTreeMap::new(),
        }
    }

    /// Set the scheduling interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the hop limit.
    pub fn with_max_hops(mut self, max_hops: u8) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Set the probes per hop.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Add a static label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Spread of the randomized startup delay applied to each target so
    /// that targets sharing an interval do not probe in lockstep
    /// (default: 5s).
    #[serde(default = "default_startup_stagger", with = "humantime_serde")]
    pub startup_stagger: Duration,

    /// Ping targets.
    #[serde(default)]
    pub ping: Vec<PingTargetConfig>,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate all target configurations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen_names = HashSet::new();

        for target in &self.ping {
            if target.name.is_empty() {
                return Err(ConfigError::Validation(
                    "ping target name cannot be empty".to_string(),
                ));
            }
            if !seen_names.insert(&target.name) {
                return Err(ConfigError::Validation(format!(
                    "duplicate target name: '{}'",
                    target.name
                )));
            }
            if target.count == 0 {
                return Err(ConfigError::Validation(format!(
                    "ping target '{}': count must be at least 1",
                    target.name
                )));
            }
            if target.max_concurrent_jobs == 0 {
                return Err(ConfigError::Validation(format!(
                    "ping target '{}': max_concurrent_jobs must be at least 1",
                    target.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_config_defaults() {
        let config = PingTargetConfig::new("google-dns", "8.8.8.8");

        assert_eq!(config.name, "google-dns");
        assert_eq!(config.host, "8.8.8.8");
        assert!(config.enabled);
        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.count, DEFAULT_COUNT);
        assert_eq!(config.max_concurrent_jobs, MAX_CONCURRENT_JOBS);
    }

    #[test]
    fn test_ping_config_builder() {
        let config = PingTargetConfig::new("cloudflare", "1.1.1.1")
            .with_interval(Duration::from_secs(60))
            .with_timeout(Duration::from_secs(10))
            .with_count(3)
            .with_label("env", "prod");

        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.count, 3);
        assert_eq!(config.labels.get("env"), Some(&"prod".to_string()));
    }

    #[test]
    fn test_ping_config_serde_roundtrip() {
        let yaml = r#"
name: backbone
host: 192.0.2.1
source: 192.0.2.10
interval: 10s
timeout: 500ms
count: 3
labels:
  region: eu
"#;

        let config: PingTargetConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "backbone");
        assert_eq!(config.source.as_deref(), Some("192.0.2.10"));
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.count, 3);
        assert_eq!(config.labels.get("region"), Some(&"eu".to_string()));
    }

    #[test]
    fn test_trace_config_serde_defaults() {
        let yaml = r#"
name: minimal
host: example.net
"#;

        let config: TraceTargetConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.enabled);
        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert_eq!(config.max_hops, DEFAULT_MAX_HOPS);
        assert_eq!(config.count, DEFAULT_COUNT);
    }

    #[test]
    fn test_app_config_validate_duplicate_names() {
        let config = AppConfig {
            startup_stagger: Duration::ZERO,
            ping: vec![
                PingTargetConfig::new("duplicate", "192.0.2.1"),
                PingTargetConfig::new("duplicate", "192.0.2.2"),
            ],
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_app_config_validate_empty_name() {
        let config = AppConfig {
            startup_stagger: Duration::ZERO,
            ping: vec![PingTargetConfig::new("", "192.0.2.1")],
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_app_config_validate_zero_count() {
        let config = AppConfig {
            startup_stagger: Duration::ZERO,
            ping: vec![PingTargetConfig::new("zero", "192.0.2.1").with_count(0)],
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("count"));
    }

    #[test]
    fn test_app_config_yaml() {
        let yaml = r#"
startup_stagger: 2s
ping:
  - name: dns-a
    host: 8.8.8.8
  - name: dns-b
    host: 1.1.1.1
    interval: 15s
"#;

        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.startup_stagger, Duration::from_secs(2));
        assert_eq!(config.ping.len(), 2);
        assert_eq!(config.ping[1].interval, Duration::from_secs(15));
    }
}
