//! linker-ner: citation and person NER extraction
//!
//! Extracts named entities (citations and person references) from text
//! using pluggable NER model backends, and for citation spans additionally
//! extracts nested "reference part" sub-spans via a second-stage model.
//! The `linker` module holds the partition-and-link pipeline; the
//! `web-server` crate exposes it over HTTP.

pub mod artifact;
pub mod config;
pub mod error;
pub mod linker;
pub mod models;
pub mod normalize;
pub mod span;

pub use config::AppConfig;
pub use error::NerError;
pub use linker::{
    make_bulk_recognize_entities_output, make_recognize_entities_output, BATCH_SIZE,
};
pub use models::{ModelKind, ModelRegistry, NerFactory, NerModel};
pub use span::{NeDoc, NeSpan, SerializedSpan};
