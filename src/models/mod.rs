//! Pluggable NER model backends
//!
//! The service never runs tokenization or sequence-labeling inference
//! in-process; backends either match against a lexicon artifact or delegate
//! to an external inference endpoint. Models are selected per
//! `(kind, language)` from the registry built at startup.

pub mod lexicon;
pub mod remote;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AppConfig;
use crate::error::NerError;
use crate::span::NeSpan;

pub use lexicon::{LexiconArtifact, LexiconNer};
pub use remote::RemoteNer;

/// What a model is used for in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// First-stage model: citations and person references in running text
    NamedEntity,
    /// Second-stage model: structured sub-spans within a citation
    RefPart,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::NamedEntity => write!(f, "named_entity"),
            ModelKind::RefPart => write!(f, "ref_part"),
        }
    }
}

/// A NER model backend.
///
/// `bulk_predict` must return one span list per input text, in input order.
#[async_trait]
pub trait NerModel: std::fmt::Debug + Send + Sync {
    /// Predict the named entities in the given text
    async fn predict(&self, text: &str) -> Result<Vec<NeSpan>, NerError>;

    /// Predict named entities for a list of texts.
    ///
    /// `batch_size` bounds how many texts a backend submits to its model at
    /// once; in-process backends may ignore it.
    async fn bulk_predict(
        &self,
        texts: &[String],
        batch_size: usize,
    ) -> Result<Vec<Vec<NeSpan>>, NerError>;
}

/// Builds model backends from config entries
pub struct NerFactory;

impl NerFactory {
    /// Create a backend for the given arch and artifact/endpoint location.
    ///
    /// - `lexicon`: `location` is a JSON gazetteer artifact (local path,
    ///   `http(s)://`, or `gs://`)
    /// - `remote`: `location` is the inference endpoint URL
    pub async fn create(arch: &str, location: &str) -> Result<Arc<dyn NerModel>, NerError> {
        match arch {
            "lexicon" => Ok(Arc::new(LexiconNer::load(location).await?)),
            "remote" => Ok(Arc::new(RemoteNer::new(location))),
            other => Err(NerError::UnknownArch(other.to_string())),
        }
    }
}

/// Models keyed by `(kind, language)`, built from config at startup
#[derive(Default)]
pub struct ModelRegistry {
    models: HashMap<(ModelKind, String), Arc<dyn NerModel>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from config, loading every model up front
    pub async fn from_config(config: &AppConfig) -> Result<Self, NerError> {
        let mut registry = Self::new();
        for model_config in &config.models {
            info!(
                arch = %model_config.arch,
                kind = %model_config.kind,
                lang = %model_config.lang,
                "Loading model"
            );
            let model = NerFactory::create(&model_config.arch, &model_config.path).await?;
            registry.insert(model_config.kind, &model_config.lang, model)?;
        }
        Ok(registry)
    }

    /// Register a model for `(kind, lang)`; duplicate keys are a config error
    pub fn insert(
        &mut self,
        kind: ModelKind,
        lang: &str,
        model: Arc<dyn NerModel>,
    ) -> Result<(), NerError> {
        if self
            .models
            .insert((kind, lang.to_string()), model)
            .is_some()
        {
            return Err(NerError::Config(format!(
                "Duplicate model for kind '{}' and language '{}'",
                kind, lang
            )));
        }
        Ok(())
    }

    /// Look up the model for `(kind, lang)`
    pub fn get(&self, kind: ModelKind, lang: &str) -> Result<&Arc<dyn NerModel>, NerError> {
        self.models
            .get(&(kind, lang.to_string()))
            .ok_or_else(|| NerError::ModelNotFound {
                kind,
                lang: lang.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct EmptyModel;

    #[async_trait]
    impl NerModel for EmptyModel {
        async fn predict(&self, _text: &str) -> Result<Vec<NeSpan>, NerError> {
            Ok(vec![])
        }

        async fn bulk_predict(
            &self,
            texts: &[String],
            _batch_size: usize,
        ) -> Result<Vec<Vec<NeSpan>>, NerError> {
            Ok(texts.iter().map(|_| vec![]).collect())
        }
    }

    #[tokio::test]
    async fn test_unknown_arch_rejected() {
        let err = NerFactory::create("spacy", "/tmp/nowhere").await.unwrap_err();
        assert!(matches!(err, NerError::UnknownArch(arch) if arch == "spacy"));
    }

    #[test]
    fn test_registry_lookup_and_duplicates() {
        let mut registry = ModelRegistry::new();
        registry
            .insert(ModelKind::NamedEntity, "he", Arc::new(EmptyModel))
            .unwrap();

        assert!(registry.get(ModelKind::NamedEntity, "he").is_ok());

        let missing = registry.get(ModelKind::RefPart, "he").unwrap_err();
        assert!(matches!(
            missing,
            NerError::ModelNotFound { kind: ModelKind::RefPart, .. }
        ));

        let duplicate = registry
            .insert(ModelKind::NamedEntity, "he", Arc::new(EmptyModel))
            .unwrap_err();
        assert!(matches!(duplicate, NerError::Config(_)));
    }

    #[test]
    fn test_model_kind_wire_names() {
        assert_eq!(ModelKind::NamedEntity.to_string(), "named_entity");
        assert_eq!(
            serde_json::from_str::<ModelKind>("\"ref_part\"").unwrap(),
            ModelKind::RefPart
        );
    }

    #[tokio::test]
    async fn test_model_used_via_trait_object() {
        let model: Arc<dyn NerModel> = Arc::new(EmptyModel);
        assert!(model.predict("nothing here").await.unwrap().is_empty());
    }
}
