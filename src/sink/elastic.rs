use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::errors::ExtractError;

/// Bulk publisher of JSON documents to an indexing service.
///
/// Every document is keyed by a SHA-256 content hash of its serialized
/// form, so re-sending an identical document overwrites in place rather
/// than duplicating — publishing is idempotent.
pub struct BulkIndexSink {
    url: String,
    auth: Option<(String, String)>,
    client: reqwest::blocking::Client,
}

impl BulkIndexSink {
    /// Create a sink posting to `url` (index endpoint, trailing `/` optional).
    pub fn new(url: impl Into<String>, auth: Option<(String, String)>) -> Result<Self, ExtractError> {
        let mut url = url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| ExtractError::Configuration(err.to_string()))?;
        Ok(Self { url, auth, client })
    }

    /// Bulk-insert `documents`, one `_bulk` request for the whole batch.
    pub fn put(&self, documents: &[serde_json::Value]) -> Result<(), ExtractError> {
        if documents.is_empty() {
            return Ok(());
        }
        let body = build_bulk_body(documents).map_err(|err| ExtractError::Decode(err.to_string()))?;
        debug!(count = documents.len(), "publishing bulk document batch");
        let mut request = self
            .client
            .put(format!("{}_bulk", self.url))
            .header("Content-Type", "application/json")
            .body(body);
        if let Some((user, password)) = &self.auth {
            request = request.basic_auth(user, Some(password));
        }
        request
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|err| ExtractError::Decode(format!("bulk publish: {err}")))?;
        Ok(())
    }
}

/// `_bulk` wire body: an action line naming the content-hash id, then the
/// document, for every document, newline-terminated.
fn build_bulk_body(documents: &[serde_json::Value]) -> Result<String, serde_json::Error> {
    let mut body = String::new();
    for document in documents {
        let serialized = serde_json::to_string(document)?;
        let action = serde_json::json!({ "index": { "_id": content_hash(&serialized) } });
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serialized);
        body.push('\n');
    }
    Ok(body)
}

/// Hex SHA-256 of a serialized document, used as its stable id.
fn content_hash(serialized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    hex::encode(hasher.finalize())
}
