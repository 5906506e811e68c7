//! # Upload Orchestrator
//!
//! Sends a picked audio file to the separation backend and turns the JSON
//! answer into a [`StemUrlMap`].
//!
//! The request is a single `POST {backend}/split` with one multipart part
//! (field `file`) carrying the file bytes, its name and an audio MIME type
//! inferred from the extension. The response is expected to look like:
//!
//! ```json
//! {
//!   "message": "File processed successfully!",
//!   "vocals_url": "http://10.0.0.5:8000/stems/song/vocals.mp3",
//!   "drums_url": "http%3A%2F%2F10.0.0.5%3A8000%2Fstems%2Fsong%2Fdrums.mp3"
//! }
//! ```
//!
//! Stem URLs may be percent-encoded and are decoded before use. Absent,
//! empty, `null` or non-string fields leave the stem unresolved. The
//! orchestrator keeps no state between calls and never retries.

use crate::error::UploadError;
use crate::stems::{StemLayout, StemUrlMap};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, MultipartForm, MultipartPart};
use bridge_traits::picker::{audio_mime_type, PickedFile};
use core_runtime::logging::strip_path;
use serde_json::Value;
use std::string::FromUtf8Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// MIME type sent when the extension is not a known audio type.
pub const FALLBACK_MIME_TYPE: &str = "audio/mpeg";

/// Longest error body kept in [`UploadError::HttpStatus`].
const MAX_ERROR_BODY_CHARS: usize = 512;

pub struct UploadOrchestrator {
    http: Arc<dyn HttpClient>,
    endpoint: String,
    field: String,
    layout: StemLayout,
    timeout: Option<Duration>,
}

impl UploadOrchestrator {
    /// `endpoint` is the absolute URL of the separation endpoint.
    pub fn new(http: Arc<dyn HttpClient>, endpoint: impl Into<String>, layout: StemLayout) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            field: "file".to_string(),
            layout,
            timeout: None,
        }
    }

    /// Multipart field name for the file part.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Bound the whole request. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.set_timeout(timeout);
        self
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn layout(&self) -> StemLayout {
        self.layout
    }

    /// Upload `file` and return the decoded stem URLs.
    ///
    /// A response with some stems missing is not an error here; the map
    /// reports them through [`StemUrlMap::missing`].
    ///
    /// # Errors
    ///
    /// - [`UploadError::UnreadableFile`] if the picked file cannot be read
    /// - [`UploadError::Network`] if the request could not be sent
    /// - [`UploadError::TimedOut`] if a timeout is set and elapsed
    /// - [`UploadError::HttpStatus`] for any non-2xx status
    /// - [`UploadError::InvalidBody`] if the body is not a JSON object
    /// - [`UploadError::InvalidUrl`] if a stem URL does not decode
    #[instrument(skip(self, file), fields(file = %strip_path(&file.name)))]
    pub async fn submit(&self, file: &PickedFile) -> Result<StemUrlMap, UploadError> {
        let request = self.build_request(file);
        info!(endpoint = %self.endpoint, "Uploading file for separation");

        let pending = self.http.execute(request);
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| {
                    error!(?limit, "Separation request timed out");
                    UploadError::TimedOut(limit)
                })?,
            None => pending.await,
        };

        let response = outcome.map_err(|e| {
            error!(error = %e, "Separation request failed");
            UploadError::from_bridge(e)
        })?;

        if !response.is_success() {
            let body: String = String::from_utf8_lossy(&response.body)
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            error!(status = response.status, "Backend rejected upload");
            return Err(UploadError::HttpStatus {
                status: response.status,
                body,
            });
        }

        let map = parse_stem_urls(&response.body, self.layout)?;
        let missing = map.missing();
        if missing.is_empty() {
            info!("All stems resolved");
        } else {
            warn!(?missing, "Separation response is missing stems");
        }
        Ok(map)
    }

    fn build_request(&self, file: &PickedFile) -> HttpRequest {
        let mime = audio_mime_type(&file.name).unwrap_or(FALLBACK_MIME_TYPE);
        let part = MultipartPart::file(self.field.clone(), file.local_path())
            .file_name(file.name.clone())
            .mime_type(mime);

        let mut request = HttpRequest::new(HttpMethod::Post, self.endpoint.clone())
            .header("Accept", "application/json")
            .multipart(MultipartForm::new().part(part));
        if let Some(limit) = self.timeout {
            request = request.timeout(limit);
        }
        request
    }
}

/// Parse a separation response body into stem URLs for `layout`.
///
/// # Errors
///
/// [`UploadError::InvalidBody`] if the body is not a JSON object, and
/// [`UploadError::InvalidUrl`] if a present URL fails to decode.
pub fn parse_stem_urls(body: &[u8], layout: StemLayout) -> Result<StemUrlMap, UploadError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| UploadError::InvalidBody(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| UploadError::InvalidBody("expected a JSON object".to_string()))?;

    if let Some(message) = object.get("message").and_then(Value::as_str) {
        info!(server_message = message, "Backend message");
    }

    let mut map = StemUrlMap::empty(layout);
    for name in layout.stems() {
        let field = name.response_field();
        let raw = match object.get(&field) {
            Some(Value::String(raw)) if !raw.is_empty() => raw,
            Some(Value::String(_)) | Some(Value::Null) | None => continue,
            Some(other) => {
                debug!(field = %field, value = %other, "Ignoring non-string stem URL");
                continue;
            }
        };

        let url = decode_stem_url(raw).map_err(|e| UploadError::InvalidUrl {
            stem: name.to_string(),
            reason: e.to_string(),
        })?;
        map.set(*name, Some(url));
    }

    Ok(map)
}

/// Percent-encode a stem URL as a single component.
pub fn encode_stem_url(url: &str) -> String {
    urlencoding::encode(url).into_owned()
}

/// Decode a percent-encoded stem URL. Unencoded URLs pass through unchanged.
pub fn decode_stem_url(encoded: &str) -> Result<String, FromUtf8Error> {
    urlencoding::decode(encoded).map(|url| url.into_owned())
}
