use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Configuration for the socket-release wait between the kill and launch steps
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseConfig {
    /// Fixed pause after the kill step, in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Whether to poll the port-owner lookup until the port is free
    /// instead of relying on the single fixed delay
    #[serde(default = "default_poll_owners")]
    pub poll_owners: bool,

    /// Minimum delay between poll attempts (in milliseconds)
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Maximum delay between poll attempts (in milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Maximum number of poll attempts before launching anyway
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            poll_owners: default_poll_owners(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ReleaseConfig {
    /// Create a ReleaseConfig with sensible defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Single fixed delay, no polling (matches the classic restart script)
    pub fn fixed() -> Self {
        Self::default()
    }

    /// Poll the port-owner lookup with exponential backoff until the port
    /// is released or the attempt budget runs out
    pub fn polling() -> Self {
        Self {
            delay_ms: 0,
            poll_owners: true,
            min_delay_ms: 100,
            max_delay_ms: 2_000,
            max_attempts: 10,
        }
    }

    /// No wait at all (launch immediately after the kill step)
    pub fn immediate() -> Self {
        Self {
            delay_ms: 0,
            poll_owners: false,
            min_delay_ms: 0,
            max_delay_ms: 0,
            max_attempts: 0,
        }
    }

    /// Validate the configuration and return errors if invalid
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_owners && self.min_delay_ms > self.max_delay_ms {
            return Err(anyhow::anyhow!(
                "min_delay_ms cannot be greater than max_delay_ms"
            ));
        }

        if self.max_attempts > 50 {
            return Err(anyhow::anyhow!(
                "max_attempts should not exceed 50 to avoid unbounded waits"
            ));
        }

        if self.delay_ms > 60_000 {
            return Err(anyhow::anyhow!("delay_ms should not exceed 60 seconds"));
        }

        Ok(())
    }

    /// Get the fixed delay as Duration
    pub fn delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.delay_ms)
    }

    /// Get the minimum poll delay as Duration
    pub fn min_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.min_delay_ms)
    }

    /// Get the maximum poll delay as Duration
    pub fn max_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.max_delay_ms)
    }
}

/// Main restart configuration
#[derive(Default, Debug, Clone, PartialEq, Builder)]
#[builder(setter(into, strip_option))]
pub struct RestartConfig {
    pub name: String,
    pub port: u16,
    pub command: String,
    #[builder(default)]
    #[builder(setter(custom))]
    pub args: Vec<String>,
    /// Extra variables layered over the inherited environment at launch
    #[builder(default)]
    #[builder(setter(custom))]
    pub env: HashMap<String, String>,
    #[builder(default)]
    pub working_directory: Option<PathBuf>,
    /// Environment variable holding the module search path to augment
    #[builder(default = "default_search_path_var()")]
    pub search_path_var: String,
    #[builder(default)]
    pub release_config: ReleaseConfig,
}

impl RestartConfig {
    pub fn builder() -> RestartConfigBuilder {
        RestartConfigBuilder::default()
    }
}

impl RestartConfigBuilder {
    pub fn args<S: ToString, I: IntoIterator<Item = S>>(&mut self, iter: I) -> &mut Self {
        let args: Vec<String> = iter.into_iter().map(|s| s.to_string()).collect();
        self.args = Some(args);
        self
    }

    pub fn env<T: ToString>(&mut self, key: T, value: T) -> &mut Self {
        let map = self.env.get_or_insert_with(HashMap::new);
        map.insert(key.to_string(), value.to_string());

        self
    }

    pub fn env_multi<T: ToString, I: IntoIterator<Item = (T, T)>>(&mut self, iter: I) -> &mut Self {
        let env = self.env.get_or_insert_with(HashMap::new);
        for (key, value) in iter {
            env.insert(key.to_string(), value.to_string());
        }
        self
    }
}

// Default value functions for serde
fn default_delay_ms() -> u64 {
    1_000
}
fn default_poll_owners() -> bool {
    false
}
fn default_min_delay_ms() -> u64 {
    100
}
fn default_max_delay_ms() -> u64 {
    2_000
}
fn default_max_attempts() -> u32 {
    10
}
fn default_search_path_var() -> String {
    "PYTHONPATH".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_with_defaults() {
        let config = RestartConfig::builder()
            .name("backend")
            .port(8000u16)
            .command("python3")
            .args(["main.py"])
            .build()
            .unwrap();

        assert_eq!(config.port, 8000);
        assert_eq!(config.args, vec!["main.py".to_string()]);
        assert_eq!(config.search_path_var, "PYTHONPATH");
        assert!(config.working_directory.is_none());
        assert_eq!(config.release_config, ReleaseConfig::default());
    }

    #[test]
    fn test_builder_env_setters() {
        let config = RestartConfig::builder()
            .name("backend")
            .port(8000u16)
            .command("python3")
            .env("APP_ENV", "dev")
            .env_multi([("A", "1"), ("B", "2")])
            .build()
            .unwrap();

        assert_eq!(config.env.get("APP_ENV"), Some(&"dev".to_string()));
        assert_eq!(config.env.get("A"), Some(&"1".to_string()));
        assert_eq!(config.env.get("B"), Some(&"2".to_string()));
    }

    #[test]
    fn test_release_config_validation() {
        let mut config = ReleaseConfig::polling();
        config.min_delay_ms = 5_000;
        config.max_delay_ms = 100;
        assert!(config.validate().is_err());

        assert!(ReleaseConfig::fixed().validate().is_ok());
        assert!(ReleaseConfig::polling().validate().is_ok());
        assert!(ReleaseConfig::immediate().validate().is_ok());
    }

    #[test]
    fn test_release_config_serde_defaults() {
        let config: ReleaseConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ReleaseConfig::default());
        assert_eq!(config.delay_ms, 1_000);
        assert!(!config.poll_owners);

        let config: ReleaseConfig =
            serde_json::from_str(r#"{"pollOwners": true, "maxAttempts": 3}"#).unwrap();
        assert!(config.poll_owners);
        assert_eq!(config.max_attempts, 3);
    }
}
