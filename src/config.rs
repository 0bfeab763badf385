//! Study configuration
//!
//! A single JSON document at the store root holding the scheduler policy,
//! the exam date and the per-session card cap. Missing or unreadable files
//! fall back to defaults so a fresh install needs no setup step.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::cards::storage;
use crate::scheduler::SchedulerPolicy;

/// User-tunable study settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudyConfig {
    /// Scheduling constants applied to review assessments
    pub scheduler: SchedulerPolicy,
    /// Exam date shown as a countdown in mastery snapshots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_date: Option<NaiveDate>,
    /// Cap on cards drawn into one session; `None` draws everything
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cards_per_session: Option<usize>,
}

impl StudyConfig {
    /// Read the config at `path`, falling back to defaults when the file
    /// is missing or unreadable
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    warn!(
                        "Malformed config at {}: {}. Using defaults",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!(
                    "Failed to read config at {}: {}. Using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> storage::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");

        let config = StudyConfig::load_or_default(&path);
        assert_eq!(config, StudyConfig::default());
        assert_eq!(config.scheduler.first_interval_days, 2);
        assert!(config.exam_date.is_none());
        assert!(config.max_cards_per_session.is_none());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");

        let config = StudyConfig {
            scheduler: SchedulerPolicy::classic(),
            exam_date: NaiveDate::from_ymd_opt(2026, 5, 18),
            max_cards_per_session: Some(25),
        };
        config.save(&path).unwrap();

        let loaded = StudyConfig::load_or_default(&path);
        assert_eq!(loaded, config);
        assert!(loaded.scheduler.lapse_requeue.is_none());
    }

    #[test]
    fn test_malformed_config_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, "{ scheduler: oops").unwrap();

        assert_eq!(StudyConfig::load_or_default(&path), StudyConfig::default());
    }

    #[test]
    fn test_partial_config_keeps_defaults_for_missing_fields() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{ "maxCardsPerSession": 10 }"#).unwrap();

        let config = StudyConfig::load_or_default(&path);
        assert_eq!(config.max_cards_per_session, Some(10));
        assert_eq!(config.scheduler, SchedulerPolicy::default());
    }
}
