//! Service YAML configuration types
//!
//! Defines the serde schema for the config file named by the `APP_CONFIG`
//! environment variable. One model entry per `(kind, language)` pair:
//!
//! ```yaml
//! models:
//!   - arch: lexicon
//!     kind: named_entity
//!     lang: he
//!     path: /models/he-named-entity.json
//!   - arch: remote
//!     kind: ref_part
//!     lang: he
//!     path: http://inference:8080/ref-part/predict
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::NerError;
use crate::models::ModelKind;

/// Environment variable naming the config file
pub const APP_CONFIG_ENV: &str = "APP_CONFIG";

/// Root configuration structure
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub models: Vec<ModelConfig>,
}

/// One model entry: which backend, for which pipeline stage and language
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Backend architecture: "lexicon" or "remote"
    pub arch: String,

    /// Language the model serves (e.g. "he", "en")
    pub lang: String,

    /// Artifact location (lexicon) or endpoint URL (remote)
    pub path: String,

    /// Pipeline stage the model serves
    pub kind: ModelKind,
}

impl AppConfig {
    /// Load from the file named by `APP_CONFIG`
    pub fn from_env() -> Result<Self, NerError> {
        let path = std::env::var(APP_CONFIG_ENV).map_err(|_| {
            NerError::Config(format!("{} environment variable not set", APP_CONFIG_ENV))
        })?;
        Self::from_file(&path)
    }

    /// Load and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NerError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: AppConfig = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject duplicate `(kind, lang)` pairs
    fn validate(&self) -> Result<(), NerError> {
        let mut seen = HashSet::new();
        for model in &self.models {
            if !seen.insert((model.kind, model.lang.clone())) {
                return Err(NerError::Config(format!(
                    "Duplicate model for kind '{}' and language '{}'",
                    model.kind, model.lang
                )));
            }
        }
        Ok(())
    }
}
