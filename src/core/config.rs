//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{FdhError, Result};
use crate::executor::RetryPolicy;
use crate::model::resource::ResourceRef;
use crate::model::scenario::{DrillResources, VerifyDefaults};

/// Full drill configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub drill: DrillConfig,
    pub resources: ResourcesConfig,
    pub verify: VerifyConfig,
    pub retry: RetryConfig,
    pub paths: PathsConfig,
}

/// Drill identity and overall budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DrillConfig {
    /// Scenario identity carried into the report and archive.
    pub scenario_id: String,
    /// Ceiling on total drill duration, in seconds.
    pub run_budget_secs: u64,
}

/// One resource identity inside a scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResourceEntry {
    pub scope: String,
    pub name: String,
}

/// The resource pair identities a standard drill exercises.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResourcesConfig {
    pub compute_primary: ResourceEntry,
    pub compute_secondary: ResourceEntry,
    pub data_primary: ResourceEntry,
    pub data_secondary: ResourceEntry,
    /// Failover group queried for the replication role.
    pub replication_group: ResourceEntry,
}

/// Verification timing knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VerifyConfig {
    pub max_wait_secs: u64,
    pub poll_interval_ms: u64,
    pub min_consistent_observations: u32,
}

/// Transient-error retry knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

/// Filesystem paths used by fdh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub archive_dir: PathBuf,
    pub local_log: PathBuf,
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            scenario_id: "standard-pair-drill".to_string(),
            run_budget_secs: 45 * 60,
        }
    }
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            compute_primary: ResourceEntry {
                scope: "rg-1".into(),
                name: "primary-webapp".into(),
            },
            compute_secondary: ResourceEntry {
                scope: "rg-2".into(),
                name: "secondary-webapp".into(),
            },
            data_primary: ResourceEntry {
                scope: "rg-1".into(),
                name: "primary-sql-server".into(),
            },
            data_secondary: ResourceEntry {
                scope: "rg-2".into(),
                name: "secondary-sql-server".into(),
            },
            replication_group: ResourceEntry {
                scope: "rg-1".into(),
                name: "failover-group".into(),
            },
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            max_wait_secs: 300,
            poll_interval_ms: 10_000,
            min_consistent_observations: 2,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[FDH-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir.join(".config").join("fdh").join("config.toml");
        let data = home_dir.join(".local").join("share").join("fdh");
        Self {
            config_file: cfg,
            archive_dir: data.join("archive"),
            local_log: data.join("drill.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from the default
    /// path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| FdhError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(FdhError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for the run report.
    ///
    /// FNV-1a over the canonical JSON encoding, stable across processes
    /// and Rust releases.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Resolved resource identities for the standard drill.
    #[must_use]
    pub fn drill_resources(&self) -> DrillResources {
        let r = &self.resources;
        DrillResources {
            compute_primary: ResourceRef::compute(&r.compute_primary.scope, &r.compute_primary.name),
            compute_secondary: ResourceRef::compute(
                &r.compute_secondary.scope,
                &r.compute_secondary.name,
            ),
            data_primary: ResourceRef::data_member(&r.data_primary.scope, &r.data_primary.name),
            data_secondary: ResourceRef::data_member(
                &r.data_secondary.scope,
                &r.data_secondary.name,
            ),
            replication_group: ResourceRef::data_member(
                &r.replication_group.scope,
                &r.replication_group.name,
            ),
        }
    }

    /// Verification defaults applied to every built step.
    #[must_use]
    pub const fn verify_defaults(&self) -> VerifyDefaults {
        VerifyDefaults {
            max_wait: Duration::from_secs(self.verify.max_wait_secs),
            poll_interval: Duration::from_millis(self.verify.poll_interval_ms),
            min_consistent_observations: self.verify.min_consistent_observations,
        }
    }

    /// Retry policy for transient action errors.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    /// Overall drill duration ceiling.
    #[must_use]
    pub const fn run_budget(&self) -> Duration {
        Duration::from_secs(self.drill.run_budget_secs)
    }

    /// Apply `FDH_*` overrides read through `lookup`, so tests can
    /// drive the parsing without touching process environment.
    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("FDH_DRILL_RUN_BUDGET_SECS") {
            self.drill.run_budget_secs = parse_env_u64("FDH_DRILL_RUN_BUDGET_SECS", &raw)?;
        }
        if let Some(raw) = lookup("FDH_VERIFY_MAX_WAIT_SECS") {
            self.verify.max_wait_secs = parse_env_u64("FDH_VERIFY_MAX_WAIT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("FDH_VERIFY_POLL_INTERVAL_MS") {
            self.verify.poll_interval_ms = parse_env_u64("FDH_VERIFY_POLL_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = lookup("FDH_VERIFY_MIN_CONSISTENT_OBS") {
            self.verify.min_consistent_observations =
                parse_env_u32("FDH_VERIFY_MIN_CONSISTENT_OBS", &raw)?;
        }
        if let Some(raw) = lookup("FDH_RETRY_MAX_RETRIES") {
            self.retry.max_retries = parse_env_u32("FDH_RETRY_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = lookup("FDH_RETRY_BASE_DELAY_MS") {
            self.retry.base_delay_ms = parse_env_u64("FDH_RETRY_BASE_DELAY_MS", &raw)?;
        }
        if let Some(raw) = lookup("FDH_RETRY_MAX_DELAY_MS") {
            self.retry.max_delay_ms = parse_env_u64("FDH_RETRY_MAX_DELAY_MS", &raw)?;
        }
        if let Some(raw) = lookup("FDH_ARCHIVE_DIR") {
            self.paths.archive_dir = PathBuf::from(raw);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.drill.scenario_id.trim().is_empty() {
            return Err(invalid("drill.scenario_id must not be empty"));
        }
        if self.verify.poll_interval_ms == 0 {
            return Err(invalid("verify.poll_interval_ms must be nonzero"));
        }
        if self.verify.min_consistent_observations == 0 {
            return Err(invalid("verify.min_consistent_observations must be >= 1"));
        }
        if self.drill.run_budget_secs <= self.verify.max_wait_secs {
            return Err(invalid(
                "drill.run_budget_secs must exceed verify.max_wait_secs",
            ));
        }
        if self.retry.base_delay_ms == 0 {
            return Err(invalid("retry.base_delay_ms must be nonzero"));
        }
        for (label, entry) in [
            ("resources.compute_primary", &self.resources.compute_primary),
            (
                "resources.compute_secondary",
                &self.resources.compute_secondary,
            ),
            ("resources.data_primary", &self.resources.data_primary),
            ("resources.data_secondary", &self.resources.data_secondary),
            (
                "resources.replication_group",
                &self.resources.replication_group,
            ),
        ] {
            if entry.scope.trim().is_empty() || entry.name.trim().is_empty() {
                return Err(invalid(&format!("{label} needs both scope and name")));
            }
        }
        Ok(())
    }
}

fn invalid(details: &str) -> FdhError {
    FdhError::InvalidConfig {
        details: details.to_string(),
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.parse::<u64>().map_err(|error| FdhError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

fn parse_env_u32(name: &str, raw: &str) -> Result<u32> {
    raw.parse::<u32>().map_err(|error| FdhError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn defaults_validate() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut cfg = Config::default();
        let overrides = vars(&[
            ("FDH_DRILL_RUN_BUDGET_SECS", "3600"),
            ("FDH_VERIFY_MAX_WAIT_SECS", "120"),
            ("FDH_VERIFY_POLL_INTERVAL_MS", "2500"),
            ("FDH_VERIFY_MIN_CONSISTENT_OBS", "4"),
            ("FDH_RETRY_MAX_RETRIES", "7"),
            ("FDH_RETRY_BASE_DELAY_MS", "250"),
            ("FDH_RETRY_MAX_DELAY_MS", "10000"),
            ("FDH_ARCHIVE_DIR", "/var/lib/fdh/archive"),
        ]);

        cfg.apply_env_overrides_from(|name| overrides.get(name).cloned())
            .unwrap();

        assert_eq!(cfg.drill.run_budget_secs, 3_600);
        assert_eq!(cfg.verify.max_wait_secs, 120);
        assert_eq!(cfg.verify.poll_interval_ms, 2_500);
        assert_eq!(cfg.verify.min_consistent_observations, 4);
        assert_eq!(cfg.retry.max_retries, 7);
        assert_eq!(cfg.retry.base_delay_ms, 250);
        assert_eq!(cfg.retry.max_delay_ms, 10_000);
        assert_eq!(cfg.paths.archive_dir, PathBuf::from("/var/lib/fdh/archive"));
    }

    #[test]
    fn env_override_garbage_is_rejected() {
        let mut cfg = Config::default();
        let overrides = vars(&[("FDH_RETRY_MAX_RETRIES", "not-a-number")]);

        let err = cfg
            .apply_env_overrides_from(|name| overrides.get(name).cloned())
            .unwrap_err();
        assert_eq!(err.code(), "FDH-1003");
        match err {
            FdhError::ConfigParse { context, details } => {
                assert_eq!(context, "env");
                assert!(details.contains("FDH_RETRY_MAX_RETRIES"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn env_override_untouched_fields_keep_their_values() {
        let mut cfg = Config::default();
        let overrides = vars(&[("FDH_RETRY_MAX_RETRIES", "9")]);

        cfg.apply_env_overrides_from(|name| overrides.get(name).cloned())
            .unwrap();

        assert_eq!(cfg.retry.max_retries, 9);
        assert_eq!(cfg.retry.base_delay_ms, RetryConfig::default().base_delay_ms);
        assert_eq!(cfg.verify.max_wait_secs, VerifyConfig::default().max_wait_secs);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = Config::load(Some(&missing)).unwrap_err();
        assert_eq!(err.code(), "FDH-1002");
    }

    #[test]
    fn toml_round_trip_preserves_resources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[drill]
scenario_id = "quarterly-dr"
run_budget_secs = 1800

[resources.compute_primary]
scope = "prod-east"
name = "app-east"

[resources.compute_secondary]
scope = "prod-west"
name = "app-west"

[verify]
max_wait_secs = 120
poll_interval_ms = 5000
min_consistent_observations = 3
"#,
        )
        .unwrap();
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.drill.scenario_id, "quarterly-dr");
        assert_eq!(cfg.resources.compute_primary.scope, "prod-east");
        // Unspecified sections fall back to defaults.
        assert_eq!(cfg.resources.data_primary.name, "primary-sql-server");
        assert_eq!(cfg.verify.min_consistent_observations, 3);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut cfg = Config::default();
        cfg.verify.poll_interval_ms = 0;
        assert_eq!(cfg.validate().unwrap_err().code(), "FDH-1001");
    }

    #[test]
    fn budget_must_exceed_max_wait() {
        let mut cfg = Config::default();
        cfg.drill.run_budget_secs = cfg.verify.max_wait_secs;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_resource_name_is_rejected() {
        let mut cfg = Config::default();
        cfg.resources.data_secondary.name.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn stable_hash_tracks_content() {
        let a = Config::default();
        let mut b = Config::default();
        assert_eq!(a.stable_hash().unwrap(), b.stable_hash().unwrap());
        b.drill.scenario_id = "other".into();
        assert_ne!(a.stable_hash().unwrap(), b.stable_hash().unwrap());
    }

    #[test]
    fn typed_accessors_convert_units() {
        let cfg = Config::default();
        assert_eq!(cfg.verify_defaults().max_wait, Duration::from_secs(300));
        assert_eq!(cfg.retry_policy().base_delay, Duration::from_millis(500));
        assert_eq!(cfg.run_budget(), Duration::from_secs(2700));
    }
}
