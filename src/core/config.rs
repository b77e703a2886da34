use std::path::PathBuf;

use crate::error::{FactsError, Result};
use crate::fiscal::FiscalCalendarRegistry;

#[derive(Clone, Debug, PartialEq)]
pub struct FactsConfig {
    /// JSON array of calendar entries, if any
    pub calendars_path: Option<PathBuf>,
    pub data_dir: PathBuf,
    /// Largest acceptable share of facts with unresolved contexts
    pub orphan_tolerance: f64,
}

impl Default for FactsConfig {
    fn default() -> Self {
        Self {
            calendars_path: None,
            data_dir: PathBuf::from("data"),
            orphan_tolerance: 0.0,
        }
    }
}

impl FactsConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let calendars_path = lookup("FISCAL_CALENDARS")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let data_dir = PathBuf::from(lookup("FACTS_DATA_DIR").unwrap_or_else(|| "data".to_string()));

        let orphan_tolerance = match lookup("ORPHAN_TOLERANCE") {
            Some(raw) => parse_tolerance(&raw)?,
            None => 0.0,
        };

        Ok(Self {
            calendars_path,
            data_dir,
            orphan_tolerance,
        })
    }

    /// Registry from the configured calendar file, or an empty one.
    pub fn load_registry(&self) -> Result<FiscalCalendarRegistry> {
        match &self.calendars_path {
            Some(path) => FiscalCalendarRegistry::load_json(path),
            None => {
                log::info!("FISCAL_CALENDARS not set, all companies use December year ends");
                Ok(FiscalCalendarRegistry::new())
            }
        }
    }
}

pub fn parse_tolerance(raw: &str) -> Result<f64> {
    let tolerance: f64 = raw
        .trim()
        .parse()
        .map_err(|_| FactsError::Config(format!("ORPHAN_TOLERANCE is not a number: {}", raw)))?;

    if !(0.0..=1.0).contains(&tolerance) {
        return Err(FactsError::Config(format!(
            "ORPHAN_TOLERANCE must be between 0 and 1, got {}",
            tolerance
        )));
    }

    Ok(tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<FactsConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        FactsConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config_from(&[]).unwrap(), FactsConfig::default());
    }

    #[test]
    fn test_values_from_environment() {
        let config = config_from(&[
            ("FISCAL_CALENDARS", "calendars.json"),
            ("FACTS_DATA_DIR", "/tmp/facts"),
            ("ORPHAN_TOLERANCE", "0.05"),
        ])
        .unwrap();

        assert_eq!(config.calendars_path, Some(PathBuf::from("calendars.json")));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/facts"));
        assert_eq!(config.orphan_tolerance, 0.05);
    }

    #[test]
    fn test_invalid_tolerance() {
        assert!(config_from(&[("ORPHAN_TOLERANCE", "lots")]).is_err());
        assert!(config_from(&[("ORPHAN_TOLERANCE", "1.5")]).is_err());
    }

    #[test]
    fn test_missing_calendar_file_is_an_error() {
        let config = FactsConfig {
            calendars_path: Some(PathBuf::from("/nonexistent/calendars.json")),
            ..FactsConfig::default()
        };
        assert!(matches!(config.load_registry(), Err(FactsError::Io(_))));
    }
}
