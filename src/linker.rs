//! Partition-and-link pipeline
//!
//! The service's core: take raw first-stage NER output, partition spans by
//! semantic type, batch the citation span texts through the second-stage
//! reference-part model, and reassemble a nested result. Input order is
//! preserved everywhere, and in the bulk flow every citation span gets the
//! reference parts predicted for its own text.

use serde::{Deserialize, Serialize};

use crate::error::NerError;
use crate::models::NerModel;
use crate::span::{NeSpan, SerializedSpan};

/// Batch size for second-stage bulk prediction
pub const BATCH_SIZE: usize = 150;

/// Semantic type of a model label, if it has one
fn semantic_type(label: &str) -> Option<&'static str> {
    match label {
        "מקור" | "Citation" => Some("citation"),
        _ => None,
    }
}

/// Extracted entities for one text: citation spans paired (by position) with
/// their reference parts, plus the remaining spans
#[derive(Debug)]
pub struct LinkerEntities {
    pub cit_spans: Vec<NeSpan>,
    pub ref_parts: Vec<Vec<NeSpan>>,
    pub other_spans: Vec<NeSpan>,
}

/// Response body of `/recognize-entities`
#[derive(Debug, Serialize, Deserialize)]
pub struct RecognizeEntitiesOutput {
    pub entities: Vec<SerializedSpan>,
}

/// Response body of `/bulk-recognize-entities`
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkRecognizeEntitiesOutput {
    pub results: Vec<RecognizeEntitiesOutput>,
}

/// Extract entities and reference parts from a single text
pub async fn make_recognize_entities_output(
    text: &str,
    ner_model: &dyn NerModel,
    ref_part_model: &dyn NerModel,
    with_span_text: bool,
) -> Result<RecognizeEntitiesOutput, NerError> {
    let entities = get_linker_entities(text, ner_model, ref_part_model).await?;
    Ok(serialize_linker_entities(&entities, with_span_text))
}

/// Extract entities and reference parts from a list of texts
pub async fn make_bulk_recognize_entities_output(
    texts: &[String],
    ner_model: &dyn NerModel,
    ref_part_model: &dyn NerModel,
    with_span_text: bool,
) -> Result<BulkRecognizeEntitiesOutput, NerError> {
    let results = bulk_get_linker_entities(texts, ner_model, ref_part_model).await?;
    Ok(BulkRecognizeEntitiesOutput {
        results: results
            .iter()
            .map(|entities| serialize_linker_entities(entities, with_span_text))
            .collect(),
    })
}

async fn get_linker_entities(
    text: &str,
    ner_model: &dyn NerModel,
    ref_part_model: &dyn NerModel,
) -> Result<LinkerEntities, NerError> {
    let spans = ner_model.predict(text).await?;
    let (cit_spans, other_spans) = partition_spans(spans);

    let ref_part_input: Vec<String> = cit_spans.iter().map(|s| s.text().to_string()).collect();
    let ref_parts = ref_part_model.bulk_predict(&ref_part_input, BATCH_SIZE).await?;
    check_alignment(ref_parts.len(), cit_spans.len())?;

    Ok(LinkerEntities {
        cit_spans,
        ref_parts,
        other_spans,
    })
}

async fn bulk_get_linker_entities(
    texts: &[String],
    ner_model: &dyn NerModel,
    ref_part_model: &dyn NerModel,
) -> Result<Vec<LinkerEntities>, NerError> {
    let spans_list = ner_model.bulk_predict(texts, BATCH_SIZE).await?;
    check_alignment(spans_list.len(), texts.len())?;

    let mut cit_spans_list = Vec::with_capacity(texts.len());
    let mut other_spans_list = Vec::with_capacity(texts.len());
    for spans in spans_list {
        let (cit_spans, other_spans) = partition_spans(spans);
        cit_spans_list.push(cit_spans);
        other_spans_list.push(other_spans);
    }

    // Flatten citation span texts into one second-stage batch, remembering
    // which input text each came from
    let mut ref_part_input: Vec<String> = Vec::new();
    let mut source_indices: Vec<usize> = Vec::new();
    for (input_idx, cit_spans) in cit_spans_list.iter().enumerate() {
        for span in cit_spans {
            ref_part_input.push(span.text().to_string());
            source_indices.push(input_idx);
        }
    }

    let all_ref_parts = ref_part_model
        .bulk_predict(&ref_part_input, BATCH_SIZE)
        .await?;
    check_alignment(all_ref_parts.len(), ref_part_input.len())?;

    // Regroup by source text; flattening was in order, so the j-th list for
    // a text belongs to its j-th citation span
    let mut ref_parts_by_source: Vec<Vec<Vec<NeSpan>>> = (0..texts.len()).map(|_| vec![]).collect();
    for (ref_parts, input_idx) in all_ref_parts.into_iter().zip(source_indices) {
        ref_parts_by_source[input_idx].push(ref_parts);
    }

    let mut output = Vec::with_capacity(texts.len());
    for ((cit_spans, other_spans), ref_parts) in cit_spans_list
        .into_iter()
        .zip(other_spans_list)
        .zip(ref_parts_by_source)
    {
        output.push(LinkerEntities {
            cit_spans,
            ref_parts,
            other_spans,
        });
    }
    Ok(output)
}

fn partition_spans(spans: Vec<NeSpan>) -> (Vec<NeSpan>, Vec<NeSpan>) {
    let mut cit_spans = Vec::new();
    let mut other_spans = Vec::new();
    for span in spans {
        if semantic_type(&span.label) == Some("citation") {
            cit_spans.push(span);
        } else {
            other_spans.push(span);
        }
    }
    (cit_spans, other_spans)
}

fn serialize_linker_entities(
    entities: &LinkerEntities,
    with_span_text: bool,
) -> RecognizeEntitiesOutput {
    let mut serial: Vec<SerializedSpan> = entities
        .other_spans
        .iter()
        .map(|span| span.serialize(with_span_text))
        .collect();
    for (span, ref_parts) in entities.cit_spans.iter().zip(&entities.ref_parts) {
        let mut serialized_span = span.serialize(with_span_text);
        serialized_span.parts = Some(
            ref_parts
                .iter()
                .map(|part| part.serialize(with_span_text))
                .collect(),
        );
        serial.push(serialized_span);
    }
    RecognizeEntitiesOutput { entities: serial }
}

/// Models must answer one result per input; anything else breaks the zip
fn check_alignment(got: usize, expected: usize) -> Result<(), NerError> {
    if got != expected {
        return Err(NerError::Inference(format!(
            "Model returned {} results for {} inputs",
            got, expected
        )));
    }
    Ok(())
}
