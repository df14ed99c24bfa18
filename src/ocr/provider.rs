//! OCR-provider port plus its two required implementations.
//!
//! Each implementation owns the HTTP call to its cloud OCR service and the
//! parsing of its native response tree into `RawCandidate`s sharing one
//! `RawResponseHandle` — C1 (`super::digit_confidence::extract`) does the
//! actual per-digit walk later, against whichever candidate it's handed.

use base64::Engine;
use tracing::{error, warn};

use super::types::{ConfidenceScore, DigitString, RawCandidate, RawResponseHandle};
use crate::error::CoreError;

/// Implemented once per cloud OCR provider.
pub trait OcrProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    /// Returns ordered top-to-bottom guesses for every row found in `image`.
    fn extract(&self, image: &[u8]) -> Result<Vec<RawCandidate>, CoreError>;

    /// Returns the provider's flattened full-page text for `image`, with no
    /// digit-run filtering. Used by the handwritten-row and web-form ports
    /// (§6.2, §6.3) to read free-text name fields, which are outside C1's
    /// digit-only concern.
    fn read_text(&self, image: &[u8]) -> Result<String, CoreError>;

    /// Optional preprocessing hook; identity by default. The
    /// core does not specify preprocessing — if present it runs before
    /// `extract`.
    fn preprocess(&self, image: &[u8]) -> Vec<u8> {
        image.to_vec()
    }
}

fn http_client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(30)) // spec §5: network RPCs default to a 30s client timeout
        .build()
        .expect("building the HTTP client cannot fail with this configuration")
}

/// Extract every digit run from a block of recognized text, in reading
/// order, treating each contiguous digit run as one row's candidate.
fn digit_runs(text: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_ascii_digit() {
            current.push(ch);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

// ── Google Vision ─────────────────────────────────────────────────────────

pub struct GoogleVisionProvider {
    api_key: String,
    client: reqwest::blocking::Client,
}

impl GoogleVisionProvider {
    pub fn new(api_key: impl Into<String>) -> GoogleVisionProvider {
        GoogleVisionProvider {
            api_key: api_key.into(),
            client: http_client(),
        }
    }
}

impl GoogleVisionProvider {
    /// One network call, shared by `extract` and `read_text` so a page is
    /// never fetched twice for the same caller.
    fn fetch(&self, image: &[u8]) -> Result<(String, RawResponseHandle), CoreError> {
        let b64 = base64::engine::general_purpose::STANDARD.encode(image);
        let body = serde_json::json!({
            "requests": [{
                "image": {"content": b64},
                "features": [{"type": "DOCUMENT_TEXT_DETECTION"}],
            }]
        });

        let url = format!("https://vision.googleapis.com/v1/images:annotate?key={}", self.api_key);
        let resp = self.client.post(&url).json(&body).send().map_err(|e| {
            warn!(provider = "google_vision", "request failed: {e}");
            CoreError::OcrProviderUnavailable {
                provider: self.provider_id().to_string(),
                reason: e.to_string(),
            }
        })?;

        let json: serde_json::Value = resp.json().map_err(|e| {
            error!(provider = "google_vision", "response body not JSON: {e}");
            CoreError::OcrResponseMalformed {
                provider: self.provider_id().to_string(),
                reason: e.to_string(),
            }
        })?;

        let response_tree = json
            .get("responses")
            .and_then(|r| r.as_array())
            .and_then(|arr| arr.first())
            .cloned()
            .unwrap_or(serde_json::json!({}));

        let full_text = response_tree
            .get("fullTextAnnotation")
            .and_then(|f| f.get("text"))
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .to_string();

        let handle = RawResponseHandle::google_vision(response_tree);
        Ok((full_text, handle))
    }
}

impl OcrProvider for GoogleVisionProvider {
    fn provider_id(&self) -> &str {
        "google_vision"
    }

    fn extract(&self, image: &[u8]) -> Result<Vec<RawCandidate>, CoreError> {
        let (full_text, handle) = self.fetch(image)?;
        Ok(build_candidates(&full_text, self.provider_id(), handle))
    }

    fn read_text(&self, image: &[u8]) -> Result<String, CoreError> {
        let (full_text, _handle) = self.fetch(image)?;
        Ok(full_text)
    }
}

// ── Azure Read ────────────────────────────────────────────────────────────

pub struct AzureReadProvider {
    endpoint: String,
    api_key: String,
    client: reqwest::blocking::Client,
    poll_interval: std::time::Duration,
    poll_attempts: u32,
}

impl AzureReadProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> AzureReadProvider {
        AzureReadProvider {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client: http_client(),
            poll_interval: std::time::Duration::from_millis(500),
            poll_attempts: 20,
        }
    }
}

impl AzureReadProvider {
    /// One submit-then-poll round trip, shared by `extract` and `read_text`.
    fn fetch(&self, image: &[u8]) -> Result<(String, RawResponseHandle), CoreError> {
        // Azure's Read API is asynchronous: submit, then poll the
        // Operation-Location URL until status leaves "running".
        let submit_url = format!("{}/vision/v3.2/read/analyze", self.endpoint.trim_end_matches('/'));
        let resp = self
            .client
            .post(&submit_url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Content-Type", "application/octet-stream")
            .body(image.to_vec())
            .send()
            .map_err(|e| CoreError::OcrProviderUnavailable {
                provider: self.provider_id().to_string(),
                reason: e.to_string(),
            })?;

        let operation_location = resp
            .headers()
            .get("Operation-Location")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| CoreError::OcrResponseMalformed {
                provider: self.provider_id().to_string(),
                reason: "missing Operation-Location header".to_string(),
            })?;

        let json = self.poll_result(&operation_location)?;

        let full_text = json
            .get("readResult")
            .and_then(|r| r.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or("")
            .to_string();

        let handle = RawResponseHandle::azure_read(json);
        Ok((full_text, handle))
    }

    fn poll_result(&self, operation_location: &str) -> Result<serde_json::Value, CoreError> {
        for _ in 0..self.poll_attempts {
            let resp = self
                .client
                .get(operation_location)
                .header("Ocp-Apim-Subscription-Key", &self.api_key)
                .send()
                .map_err(|e| CoreError::OcrProviderUnavailable {
                    provider: self.provider_id().to_string(),
                    reason: e.to_string(),
                })?;
            let json: serde_json::Value = resp.json().map_err(|e| CoreError::OcrResponseMalformed {
                provider: self.provider_id().to_string(),
                reason: e.to_string(),
            })?;
            match json.get("status").and_then(|s| s.as_str()) {
                Some("succeeded") => return Ok(json),
                Some("failed") => {
                    return Err(CoreError::OcrProviderUnavailable {
                        provider: self.provider_id().to_string(),
                        reason: "azure read operation failed".to_string(),
                    })
                }
                _ => std::thread::sleep(self.poll_interval),
            }
        }
        Err(CoreError::OcrProviderUnavailable {
            provider: self.provider_id().to_string(),
            reason: "polling timed out waiting for azure read result".to_string(),
        })
    }
}

impl OcrProvider for AzureReadProvider {
    fn provider_id(&self) -> &str {
        "azure_read"
    }

    fn extract(&self, image: &[u8]) -> Result<Vec<RawCandidate>, CoreError> {
        let (full_text, handle) = self.fetch(image)?;
        Ok(build_candidates(&full_text, self.provider_id(), handle))
    }

    fn read_text(&self, image: &[u8]) -> Result<String, CoreError> {
        let (full_text, _handle) = self.fetch(image)?;
        Ok(full_text)
    }
}

/// Build one `RawCandidate` per digit run found in the provider's flattened
/// full-page text, in reading order.
fn build_candidates(full_text: &str, provider_id: &str, handle: RawResponseHandle) -> Vec<RawCandidate> {
    digit_runs(full_text)
        .into_iter()
        .filter_map(|run| DigitString::from_noisy(&run))
        .map(|digits| RawCandidate {
            digits,
            confidence: ConfidenceScore::new(0.9), // whole-string confidence; refined per-digit by C1
            provider_id: provider_id.to_string(),
            raw_response_handle: handle.clone(),
        })
        .collect()
}

// ── Headless stub ─────────────────────────────────────────────────────────

/// A provider that makes no network calls and returns nothing. Used by the
/// CLI's headless default wiring (§0.1) so the binary can be exercised
/// end-to-end without live cloud credentials.
pub struct NullOcrProvider;

impl OcrProvider for NullOcrProvider {
    fn provider_id(&self) -> &str {
        "null"
    }

    fn extract(&self, _image: &[u8]) -> Result<Vec<RawCandidate>, CoreError> {
        Ok(Vec::new())
    }

    fn read_text(&self, _image: &[u8]) -> Result<String, CoreError> {
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_runs_splits_on_non_digits() {
        assert_eq!(digit_runs("abc123 def 456-789"), vec!["123", "456", "789"]);
        assert_eq!(digit_runs("no digits here"), Vec::<String>::new());
    }

    #[test]
    fn null_provider_returns_empty() {
        let p = NullOcrProvider;
        assert!(p.extract(b"x").unwrap().is_empty());
        assert_eq!(p.read_text(b"x").unwrap(), "");
    }
}
