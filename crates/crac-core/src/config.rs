//! TOML layout of an empty Crac: its instants and usage limits.
//!
//! Partial files are accepted; missing sections fall back to the defaults
//! (the four-instant timeline `preventive, outage, auto, curative` and no
//! usage limits).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crac::{Crac, RaUsageLimits};
use crate::error::CracResult;
use crate::instant::InstantKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantConfig {
    pub id: String,
    pub kind: InstantKind,
}

impl InstantConfig {
    pub fn new(id: impl Into<String>, kind: InstantKind) -> Self {
        Self { id: id.into(), kind }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CracConfig {
    /// Instants in timeline order
    pub instants: Vec<InstantConfig>,

    /// Usage limits keyed by instant id
    pub ra_usage_limits: BTreeMap<String, RaUsageLimits>,
}

impl Default for CracConfig {
    fn default() -> Self {
        Self {
            instants: vec![
                InstantConfig::new("preventive", InstantKind::Preventive),
                InstantConfig::new("outage", InstantKind::Outage),
                InstantConfig::new("auto", InstantKind::Auto),
                InstantConfig::new("curative", InstantKind::Curative),
            ],
            ra_usage_limits: BTreeMap::new(),
        }
    }
}

impl CracConfig {
    pub fn from_toml_str(contents: &str) -> CracResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load_from(path: impl AsRef<Path>) -> CracResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "loading crac config");
        Self::from_toml_str(&contents)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> CracResult<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

impl Crac {
    /// Empty Crac with the instants and usage limits of `config`.
    pub fn from_config(id: impl Into<String>, name: impl Into<String>, config: &CracConfig) -> CracResult<Self> {
        let mut crac = Crac::new(id).with_name(name);
        for instant in &config.instants {
            crac.new_instant(instant.id.clone(), instant.kind)?;
        }
        for (instant_id, limits) in &config.ra_usage_limits {
            crac.new_ra_usage_limits(instant_id.clone())
                .with_limits(limits.clone())
                .add()?;
        }
        Ok(crac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_layout() {
        let crac = Crac::from_config("crac", "Crac", &CracConfig::default()).unwrap();
        let ids: Vec<&str> = crac.sorted_instants().iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["preventive", "outage", "auto", "curative"]);
        assert_eq!(crac.name(), "Crac");
    }

    #[test]
    fn test_partial_config_parsing() {
        let toml = r#"
[ra_usage_limits.curative]
max_ra = 4
"#;
        let config = CracConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.instants.len(), 4);
        assert_eq!(config.ra_usage_limits["curative"].max_ra, 4);
        assert_eq!(config.ra_usage_limits["curative"].max_tso, i32::MAX);
    }

    #[test]
    fn test_invalid_layout_is_rejected() {
        let toml = r#"
[[instants]]
id = "curative"
kind = "CURATIVE"
"#;
        let config = CracConfig::from_toml_str(toml).unwrap();
        let err = Crac::from_config("crac", "crac", &config).unwrap_err();
        assert_eq!(err.to_string(), "The first instant in the CRAC must be preventive");
    }

    #[test]
    fn test_limits_on_unknown_instant() {
        let mut config = CracConfig::default();
        config
            .ra_usage_limits
            .insert("curative 2".into(), RaUsageLimits::default());
        let err = Crac::from_config("crac", "crac", &config).unwrap_err();
        assert_eq!(err.to_string(), "The instant curative 2 does not exist in the crac.");
    }

    #[test]
    fn test_save_and_load() {
        let mut config = CracConfig::default();
        config.instants.retain(|i| i.kind != InstantKind::Auto);
        config.ra_usage_limits.insert(
            "curative".into(),
            RaUsageLimits {
                max_ra: 2,
                ..RaUsageLimits::default()
            },
        );

        let file = NamedTempFile::new().unwrap();
        config.save_to(file.path()).unwrap();
        let loaded = CracConfig::load_from(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "instants = 3").unwrap();
        let err = CracConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("Serialization error"));
    }
}
