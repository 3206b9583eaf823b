//! Remote inference NER backend
//!
//! Delegates token-classification inference to an external endpoint over
//! HTTP JSON. Heavyweight model stacks stay out of process; this backend
//! only maps character-offset/label triples back onto the input texts.
//!
//! Protocol: `POST {endpoint}` with `{"texts": [...]}`, responding
//! `{"results": [[{"start": .., "end": .., "label": ".."}]]}` with one span
//! list per input text, in input order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::NerError;
use crate::span::{NeDoc, NeSpan};

use super::NerModel;

#[derive(Serialize)]
struct PredictRequest<'a> {
    texts: &'a [String],
}

#[derive(Deserialize)]
struct RawEntity {
    start: usize,
    end: usize,
    label: String,
}

#[derive(Deserialize)]
struct PredictResponse {
    results: Vec<Vec<RawEntity>>,
}

/// NER model served by an external inference endpoint
#[derive(Debug, Clone)]
pub struct RemoteNer {
    endpoint: String,
    client: reqwest::Client,
}

impl RemoteNer {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn call_endpoint(&self, texts: &[String]) -> Result<Vec<Vec<NeSpan>>, NerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&PredictRequest { texts })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, endpoint = %self.endpoint, "Inference endpoint error");
            return Err(NerError::Inference(format!(
                "Inference endpoint returned {}: {}",
                status, body
            )));
        }

        let parsed: PredictResponse = response
            .json()
            .await
            .map_err(|e| NerError::Inference(format!("Malformed inference response: {}", e)))?;

        if parsed.results.len() != texts.len() {
            return Err(NerError::Inference(format!(
                "Inference endpoint returned {} results for {} inputs",
                parsed.results.len(),
                texts.len()
            )));
        }

        Ok(texts
            .iter()
            .zip(parsed.results)
            .map(|(text, entities)| {
                let doc = NeDoc::new(text.as_str());
                entities
                    .into_iter()
                    .map(|e| NeSpan::new(&doc, e.start, e.end, e.label))
                    .collect()
            })
            .collect())
    }
}

#[async_trait]
impl NerModel for RemoteNer {
    async fn predict(&self, text: &str) -> Result<Vec<NeSpan>, NerError> {
        let texts = [text.to_string()];
        let mut results = self.call_endpoint(&texts).await?;
        Ok(results.pop().unwrap_or_default())
    }

    async fn bulk_predict(
        &self,
        texts: &[String],
        batch_size: usize,
    ) -> Result<Vec<Vec<NeSpan>>, NerError> {
        let batch_size = batch_size.max(1);
        let mut all_results = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(batch_size) {
            all_results.extend(self.call_endpoint(chunk).await?);
        }
        Ok(all_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Minimal inference stub: answers each request with one span per input
    /// text, labeled with the text itself, and counts requests served.
    async fn spawn_echo_stub(requests_served: Arc<AtomicUsize>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                requests_served.fetch_add(1, Ordering::SeqCst);

                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                let (body_start, content_length) = loop {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        return;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                        let headers = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                        let content_length = headers
                            .lines()
                            .find_map(|line| line.strip_prefix("content-length:"))
                            .and_then(|v| v.trim().parse::<usize>().ok())
                            .unwrap_or(0);
                        break (pos + 4, content_length);
                    }
                };
                while buf.len() < body_start + content_length {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        return;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }

                let request: serde_json::Value =
                    serde_json::from_slice(&buf[body_start..body_start + content_length]).unwrap();
                let results: Vec<Vec<serde_json::Value>> = request["texts"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|text| {
                        let text = text.as_str().unwrap();
                        vec![serde_json::json!({
                            "start": 0,
                            "end": text.chars().count(),
                            "label": text,
                        })]
                    })
                    .collect();

                let payload = serde_json::json!({ "results": results }).to_string();
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    payload.len(),
                    payload
                );
                socket.write_all(response.as_bytes()).await.unwrap();
            }
        });

        format!("http://{}/predict", addr)
    }

    #[tokio::test]
    async fn test_bulk_predict_chunks_by_batch_size_in_order() {
        let requests_served = Arc::new(AtomicUsize::new(0));
        let endpoint = spawn_echo_stub(requests_served.clone()).await;
        let model = RemoteNer::new(&endpoint);

        let texts = vec![
            "aleph".to_string(),
            "bet".to_string(),
            "gimel".to_string(),
        ];
        let results = model.bulk_predict(&texts, 2).await.unwrap();

        // 3 texts with batch_size 2 -> two endpoint calls
        assert_eq!(requests_served.load(Ordering::SeqCst), 2);

        // Concatenated results mirror input order across the chunk boundary
        assert_eq!(results.len(), 3);
        for (text, spans) in texts.iter().zip(&results) {
            assert_eq!(spans.len(), 1);
            assert_eq!(spans[0].label, *text);
            assert_eq!(spans[0].text(), text);
            assert_eq!((spans[0].start, spans[0].end), (0, text.chars().count()));
        }
    }

    #[tokio::test]
    async fn test_predict_uses_single_call() {
        let requests_served = Arc::new(AtomicUsize::new(0));
        let endpoint = spawn_echo_stub(requests_served.clone()).await;
        let model = RemoteNer::new(&endpoint);

        let spans = model.predict("aleph").await.unwrap();
        assert_eq!(requests_served.load(Ordering::SeqCst), 1);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].label, "aleph");
    }

    #[test]
    fn test_request_and_response_wire_shapes() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let body = serde_json::to_value(PredictRequest { texts: &texts }).unwrap();
        assert_eq!(body, serde_json::json!({ "texts": ["a", "b"] }));

        let response: PredictResponse = serde_json::from_value(serde_json::json!({
            "results": [[{ "start": 0, "end": 1, "label": "Citation" }], []]
        }))
        .unwrap();
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0][0].label, "Citation");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        // Nothing listens on port 1; connection is refused immediately
        let model = RemoteNer::new("http://127.0.0.1:1/predict");
        let texts = vec!["text".to_string()];
        assert!(model.bulk_predict(&texts, 150).await.is_err());
    }
}
