// OfficeFloor Execution
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Execution configuration for teams

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

pub const ENV_THREAD_PREFIX: &str = "OFFICEFLOOR_THREAD_PREFIX";
pub const ENV_TEAM_SIZE: &str = "OFFICEFLOOR_TEAM_SIZE";
pub const ENV_IDLE_WAIT_MS: &str = "OFFICEFLOOR_IDLE_WAIT_MS";
pub const ENV_RETRY_POLICY: &str = "OFFICEFLOOR_RETRY_POLICY";

const DEFAULT_BACKOFF_INITIAL_MICROS: u64 = 50;
const DEFAULT_BACKOFF_MAX_MICROS: u64 = 5_000;

/// Pause taken between two invocations of a job that reported `Pending`.
///
/// `Spin` re-invokes immediately, favouring low-latency continuation over
/// fairness. It assumes a pending job becomes complete quickly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryPolicy {
    #[default]
    Spin,
    Yield,
    Backoff { initial_micros: u64, max_micros: u64 },
}

impl RetryPolicy {
    /// Parse the policy name used by `OFFICEFLOOR_RETRY_POLICY`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "spin" => Some(Self::Spin),
            "yield" => Some(Self::Yield),
            "backoff" => Some(Self::Backoff {
                initial_micros: DEFAULT_BACKOFF_INITIAL_MICROS,
                max_micros: DEFAULT_BACKOFF_MAX_MICROS,
            }),
            _ => None,
        }
    }

    /// Delay before the next invocation after `attempt` pending results.
    /// `None` means retry immediately.
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        match *self {
            Self::Spin | Self::Yield => None,
            Self::Backoff { initial_micros, max_micros } => {
                let shift = attempt.saturating_sub(1).min(20);
                let micros = initial_micros.saturating_mul(1u64 << shift).min(max_micros);
                Some(Duration::from_micros(micros))
            }
        }
    }

    /// Apply the pause on the current thread
    pub fn pause(&self, attempt: u32) {
        match self {
            Self::Spin => {}
            Self::Yield => std::thread::yield_now(),
            Self::Backoff { .. } => {
                if let Some(delay) = self.delay(attempt) {
                    std::thread::sleep(delay);
                }
            }
        }
    }
}

/// Configuration shared by the team implementations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Prefix of manufactured thread names (`<prefix>-<team>-<n>`)
    pub thread_name_prefix: String,
    /// Number of workers in a fixed executor team
    pub team_size: usize,
    /// How long an idle worker waits before re-checking its queue
    pub idle_wait_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "officefloor".to_string(),
            team_size: num_cpus::get().max(1),
            idle_wait_ms: 100,
            retry: RetryPolicy::Spin,
        }
    }
}

impl ExecutionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Invalid values are logged and the default is kept.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(prefix) = lookup(ENV_THREAD_PREFIX) {
            if prefix.trim().is_empty() {
                warn!("Invalid {ENV_THREAD_PREFIX} '{prefix}', using default");
            } else {
                config.thread_name_prefix = prefix.trim().to_string();
            }
        }

        if let Some(size_str) = lookup(ENV_TEAM_SIZE) {
            match size_str.trim().parse::<usize>() {
                Ok(size) if size > 0 => config.team_size = size,
                _ => warn!("Invalid {ENV_TEAM_SIZE} '{size_str}', using default"),
            }
        }

        if let Some(wait_str) = lookup(ENV_IDLE_WAIT_MS) {
            match wait_str.trim().parse::<u64>() {
                Ok(wait) => config.idle_wait_ms = wait,
                Err(_) => warn!("Invalid {ENV_IDLE_WAIT_MS} '{wait_str}', using default"),
            }
        }

        if let Some(policy_str) = lookup(ENV_RETRY_POLICY) {
            match RetryPolicy::parse(&policy_str) {
                Some(policy) => config.retry = policy,
                None => warn!("Invalid {ENV_RETRY_POLICY} '{policy_str}', using default"),
            }
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.team_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "team_size",
                value: self.team_size.to_string(),
                reason: "a team needs at least one worker".to_string(),
            });
        }
        if self.thread_name_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "thread_name_prefix",
                value: self.thread_name_prefix.clone(),
                reason: "thread names need a prefix".to_string(),
            });
        }
        if let RetryPolicy::Backoff { initial_micros, max_micros } = self.retry
            && initial_micros > max_micros
        {
            return Err(ConfigError::InvalidValue {
                key: "retry",
                value: format!("{initial_micros}..{max_micros}"),
                reason: "initial backoff exceeds the maximum".to_string(),
            });
        }
        Ok(())
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    /// Thread group name for a team, e.g. `officefloor-io`
    pub fn thread_group(&self, team_name: &str) -> String {
        format!("{}-{}", self.thread_name_prefix, team_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ExecutionConfig::from_lookup(|_| None);
        assert_eq!(config, ExecutionConfig::default());
        assert!(config.team_size >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = ExecutionConfig::from_lookup(lookup(&[
            (ENV_THREAD_PREFIX, "floor"),
            (ENV_TEAM_SIZE, "3"),
            (ENV_IDLE_WAIT_MS, "25"),
            (ENV_RETRY_POLICY, "Yield"),
        ]));
        assert_eq!(config.thread_name_prefix, "floor");
        assert_eq!(config.team_size, 3);
        assert_eq!(config.idle_wait(), Duration::from_millis(25));
        assert_eq!(config.retry, RetryPolicy::Yield);
        assert_eq!(config.thread_group("io"), "floor-io");
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let defaults = ExecutionConfig::default();
        let config = ExecutionConfig::from_lookup(lookup(&[
            (ENV_THREAD_PREFIX, "  "),
            (ENV_TEAM_SIZE, "0"),
            (ENV_IDLE_WAIT_MS, "soon"),
            (ENV_RETRY_POLICY, "sometimes"),
        ]));
        assert_eq!(config, defaults);
    }

    #[test]
    fn test_validate_rejects_zero_team() {
        let config = ExecutionConfig {
            team_size: 0,
            ..ExecutionConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "team_size", .. }));
    }

    #[test]
    fn test_backoff_delay_is_capped() {
        let policy = RetryPolicy::Backoff {
            initial_micros: 10,
            max_micros: 100,
        };
        assert_eq!(policy.delay(1), Some(Duration::from_micros(10)));
        assert_eq!(policy.delay(2), Some(Duration::from_micros(20)));
        assert_eq!(policy.delay(30), Some(Duration::from_micros(100)));
        assert_eq!(RetryPolicy::Spin.delay(5), None);
    }

    #[test]
    fn test_retry_policy_serialization() {
        let json = serde_json::to_string(&RetryPolicy::Spin).unwrap();
        assert_eq!(json, r#"{"kind":"spin"}"#);
        let back: RetryPolicy = serde_json::from_str(r#"{"kind":"backoff","initial_micros":1,"max_micros":2}"#).unwrap();
        assert_eq!(
            back,
            RetryPolicy::Backoff {
                initial_micros: 1,
                max_micros: 2
            }
        );
    }
}
