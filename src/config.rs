use crate::error::{CrosswalkError, ErrorCode};
use crate::pairwise::{DEFAULT_GAP_EXTEND, DEFAULT_GAP_OPEN, GapPenalties};
use crosswalk_protocol::AlignmentAlgorithm;
use serde::{Deserialize, Serialize};

pub const DEFAULT_REMOTE_BASE_URL: &str = "https://www.ebi.ac.uk/Tools/services/rest";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_MAX_POLL_ATTEMPTS: usize = 180;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

pub const REMOTE_BASE_URL_ENV: &str = "CROSSWALK_REMOTE_BASE_URL";
pub const REMOTE_EMAIL_ENV: &str = "CROSSWALK_REMOTE_EMAIL";
pub const ALGORITHM_ENV: &str = "CROSSWALK_ALGORITHM";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub base_url: String,
    /// Contact address the EMBOSS job dispatcher requires with each submission.
    pub email: String,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: usize,
    pub request_timeout_secs: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REMOTE_BASE_URL.to_string(),
            email: String::new(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrosswalkConfig {
    pub algorithm: AlignmentAlgorithm,
    pub gap_open: f64,
    pub gap_extend: f64,
    pub remote: RemoteSettings,
}

impl Default for CrosswalkConfig {
    fn default() -> Self {
        Self {
            algorithm: AlignmentAlgorithm::NeedlemanWunsch,
            gap_open: DEFAULT_GAP_OPEN,
            gap_extend: DEFAULT_GAP_EXTEND,
            remote: RemoteSettings::default(),
        }
    }
}

impl CrosswalkConfig {
    pub fn gap_penalties(&self) -> GapPenalties {
        GapPenalties {
            open: self.gap_open,
            extend: self.gap_extend,
        }
    }

    pub fn load_from_path(path: &str) -> Result<Self, CrosswalkError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CrosswalkError::new(
                ErrorCode::Io,
                format!("Could not read config file '{path}': {e}"),
            )
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            CrosswalkError::invalid_input(format!("Could not parse config JSON '{path}': {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &str) -> Result<(), CrosswalkError> {
        let text = serde_json::to_string_pretty(self).map_err(|e| {
            CrosswalkError::new(ErrorCode::Internal, format!("Could not serialize config: {e}"))
        })?;
        std::fs::write(path, text).map_err(|e| {
            CrosswalkError::new(
                ErrorCode::Io,
                format!("Could not write config file '{path}': {e}"),
            )
        })
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), CrosswalkError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), CrosswalkError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(REMOTE_BASE_URL_ENV) {
            self.remote.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(email) = non_empty(REMOTE_EMAIL_ENV) {
            self.remote.email = email.trim().to_string();
        }
        if let Some(name) = non_empty(ALGORITHM_ENV) {
            self.algorithm = AlignmentAlgorithm::from_name(&name).ok_or_else(|| {
                CrosswalkError::invalid_input(format!(
                    "{ALGORITHM_ENV}='{name}' is not a known alignment algorithm"
                ))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), CrosswalkError> {
        if self.gap_open > 0.0 || self.gap_extend > 0.0 {
            return Err(CrosswalkError::invalid_input(format!(
                "Gap penalties must not be positive (open {}, extend {})",
                self.gap_open, self.gap_extend
            )));
        }
        if self.remote.max_poll_attempts == 0 {
            return Err(CrosswalkError::invalid_input(
                "remote.max_poll_attempts must be at least 1",
            ));
        }
        if self.algorithm.is_remote() && self.remote.base_url.trim().is_empty() {
            return Err(CrosswalkError::invalid_input(format!(
                "Algorithm '{}' needs remote.base_url",
                self.algorithm
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let td = tempdir().unwrap();
        let path = td.path().join("config.json");
        std::fs::write(&path, r#"{"algorithm": "water", "remote": {"email": "me@example.org"}}"#)
            .unwrap();
        let config = CrosswalkConfig::load_from_path(&path.to_string_lossy()).unwrap();
        assert_eq!(config.algorithm, AlignmentAlgorithm::Water);
        assert_eq!(config.gap_open, DEFAULT_GAP_OPEN);
        assert_eq!(config.remote.email, "me@example.org");
        assert_eq!(config.remote.max_poll_attempts, DEFAULT_MAX_POLL_ATTEMPTS);
        assert_eq!(config.remote.base_url, DEFAULT_REMOTE_BASE_URL);
    }

    #[test]
    fn save_and_load_round_trip() {
        let td = tempdir().unwrap();
        let path = td.path().join("saved.json");
        let path = path.to_string_lossy();
        let mut config = CrosswalkConfig::default();
        config.algorithm = AlignmentAlgorithm::SmithWaterman;
        config.gap_extend = -1.0;
        config.save_to_path(&path).unwrap();
        assert_eq!(CrosswalkConfig::load_from_path(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = CrosswalkConfig::load_from_path("/nonexistent/crosswalk.json").unwrap_err();
        assert_eq!(err.code, ErrorCode::Io);
    }

    #[test]
    fn rejects_positive_gap_penalty() {
        let config = CrosswalkConfig {
            gap_open: 10.0,
            ..CrosswalkConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_apply_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (REMOTE_BASE_URL_ENV, "http://localhost:9000/rest/"),
            (REMOTE_EMAIL_ENV, " lab@example.org "),
            (ALGORITHM_ENV, "needle"),
        ]
        .into_iter()
        .collect();
        let mut config = CrosswalkConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.remote.base_url, "http://localhost:9000/rest");
        assert_eq!(config.remote.email, "lab@example.org");
        assert_eq!(config.algorithm, AlignmentAlgorithm::Needle);

        let mut config = CrosswalkConfig::default();
        let err = config
            .apply_overrides(|key| (key == ALGORITHM_ENV).then(|| "clustal".to_string()))
            .unwrap_err();
        assert!(err.message.contains("clustal"));
    }
}
