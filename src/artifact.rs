//! Model artifact loading
//!
//! Resolves a model `path` from config to bytes. Supports local filesystem
//! paths, `http(s)://` URLs, and the `gs://bucket/object` convention (mapped
//! to the GCS public media URL and fetched the same way).

use tracing::info;

use crate::error::NerError;

const GCS_MEDIA_BASE: &str = "https://storage.googleapis.com";

/// Fetch an artifact's bytes from a local path, `http(s)://`, or `gs://`
pub async fn fetch_bytes(location: &str) -> Result<Vec<u8>, NerError> {
    if let Some(object_path) = location.strip_prefix("gs://") {
        let url = gcs_media_url(object_path)?;
        download(&url).await
    } else if location.starts_with("http://") || location.starts_with("https://") {
        download(location).await
    } else {
        Ok(tokio::fs::read(location).await?)
    }
}

/// Map `bucket/object` (the part after `gs://`) to the public media URL
fn gcs_media_url(object_path: &str) -> Result<String, NerError> {
    match object_path.split_once('/') {
        Some((bucket, object)) if !bucket.is_empty() && !object.is_empty() => {
            Ok(format!("{}/{}/{}", GCS_MEDIA_BASE, bucket, object))
        }
        _ => Err(NerError::Artifact(format!(
            "Invalid gs:// location: gs://{}",
            object_path
        ))),
    }
}

async fn download(url: &str) -> Result<Vec<u8>, NerError> {
    info!(%url, "Downloading model artifact");
    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        return Err(NerError::Artifact(format!(
            "Artifact download failed with {}: {}",
            response.status(),
            url
        )));
    }
    Ok(response.bytes().await?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_gcs_media_url_mapping() {
        assert_eq!(
            gcs_media_url("my-bucket/models/lexicon.json").unwrap(),
            "https://storage.googleapis.com/my-bucket/models/lexicon.json"
        );
        assert!(gcs_media_url("bucket-only").is_err());
        assert!(gcs_media_url("/object-only").is_err());
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"labels\":{}}").unwrap();

        let bytes = fetch_bytes(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(bytes, b"{\"labels\":{}}");
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_io_error() {
        let err = fetch_bytes("/nonexistent/lexicon.json").await.unwrap_err();
        assert!(matches!(err, NerError::Io(_)));
    }
}
