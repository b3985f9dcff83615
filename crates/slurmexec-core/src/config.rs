//! Driver configuration.
//!
//! Values come from `SLURMEXEC_*` environment variables; anything unset keeps
//! its default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::DEFAULT_REDIRECT_PREFIX;
use crate::domain::{ExecError, Result};

pub const ENV_MONITORING_INTERVAL_SECS: &str = "SLURMEXEC_MONITORING_INTERVAL_SECS";
pub const ENV_REDIRECT_PREFIX: &str = "SLURMEXEC_REDIRECT_PREFIX";
pub const ENV_JOBID_ATTEMPTS: &str = "SLURMEXEC_JOBID_ATTEMPTS";
pub const ENV_JOBID_DELAY_MS: &str = "SLURMEXEC_JOBID_DELAY_MS";
pub const ENV_TRANSPORT_TIMEOUT_SECS: &str = "SLURMEXEC_TRANSPORT_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecConfig {
    /// Poll interval handed to the monitor when the request has none.
    pub monitoring_interval: Duration,
    /// Prefix of interactive-mode redirect files.
    pub redirect_prefix: String,
    /// `squeue` attempts when looking up an interactive job's ID.
    pub job_id_lookup_attempts: u32,
    /// Pause between `squeue` attempts.
    pub job_id_lookup_delay: Duration,
    /// Per-command limit for [`crate::transport::ShellTransport`].
    pub transport_timeout: Option<Duration>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            monitoring_interval: Duration::from_secs(5),
            redirect_prefix: DEFAULT_REDIRECT_PREFIX.to_string(),
            job_id_lookup_attempts: 5,
            job_id_lookup_delay: Duration::from_millis(1000),
            transport_timeout: None,
        }
    }
}

impl ExecConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64, _>(&var, ENV_MONITORING_INTERVAL_SECS)? {
            config.monitoring_interval = Duration::from_secs(secs);
        }
        if let Some(prefix) = var(ENV_REDIRECT_PREFIX).filter(|p| !p.trim().is_empty()) {
            config.redirect_prefix = prefix;
        }
        if let Some(attempts) = parse_var::<u32, _>(&var, ENV_JOBID_ATTEMPTS)? {
            if attempts == 0 {
                return Err(ExecError::Configuration(format!(
                    "{ENV_JOBID_ATTEMPTS} must be at least 1"
                )));
            }
            config.job_id_lookup_attempts = attempts;
        }
        if let Some(ms) = parse_var::<u64, _>(&var, ENV_JOBID_DELAY_MS)? {
            config.job_id_lookup_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64, _>(&var, ENV_TRANSPORT_TIMEOUT_SECS)? {
            config.transport_timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ExecError::Configuration(format!("{key}={raw:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = ExecConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config, ExecConfig::default());
        assert_eq!(config.monitoring_interval, Duration::from_secs(5));
        assert_eq!(config.redirect_prefix, "slurmexec_");
    }

    #[test]
    fn test_env_overrides() {
        let config = ExecConfig::from_vars(vars(&[
            (ENV_MONITORING_INTERVAL_SECS, "30"),
            (ENV_REDIRECT_PREFIX, "job_"),
            (ENV_JOBID_ATTEMPTS, "2"),
            (ENV_JOBID_DELAY_MS, "250"),
            (ENV_TRANSPORT_TIMEOUT_SECS, "60"),
        ]))
        .unwrap();

        assert_eq!(config.monitoring_interval, Duration::from_secs(30));
        assert_eq!(config.redirect_prefix, "job_");
        assert_eq!(config.job_id_lookup_attempts, 2);
        assert_eq!(config.job_id_lookup_delay, Duration::from_millis(250));
        assert_eq!(config.transport_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_unparseable_value_is_a_configuration_error() {
        let err = ExecConfig::from_vars(vars(&[(ENV_MONITORING_INTERVAL_SECS, "soon")])).unwrap_err();
        assert!(matches!(err, ExecError::Configuration(_)));
        assert!(err.to_string().contains(ENV_MONITORING_INTERVAL_SECS));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = ExecConfig::from_vars(vars(&[(ENV_JOBID_ATTEMPTS, "0")])).unwrap_err();
        assert!(matches!(err, ExecError::Configuration(_)));
    }
}
