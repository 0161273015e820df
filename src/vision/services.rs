//! Gemini `generateContent` client for pest detection on inspection photos.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

use super::models::{Detection, LocatedPest, Localization};

/// Largest accepted upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Description returned when the vision service could not be used.
pub const DEGRADED_DESCRIPTION: &str = "Gagal menganalisis gambar.";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const DETECT_PROMPT: &str = "Analyze this image to detect any pests (like termites, ants, cockroaches, etc.) \
or signs of pest activity. Describe the findings in Indonesian. \
Output ONLY A JSON object containing a single key 'description' with a string value. \
Example for a positive finding: {\"description\": \"Terdeteksi: 1x Rayap, 3x Semut.\"} \
Example for a negative finding: {\"description\": \"Tidak ada hama yang terdeteksi secara visual.\"} \
Be concise.";

const LOCATE_PROMPT: &str = "Give segmentation masks of any pests (like termites, ants, cockroaches, etc.) \
or signs of pest activity. Output ONLY A JSON list where each entry contains the 2D bounding box in \"box_2d\" \
and a text label in \"label\" to describe the object in Indonesian language. \
Coordinates in box_2d must be [ymin, xmin, ymax, xmax] normalised to 1000. \
If no pests are found, return an empty list [].";

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("GEMINI_API_KEY is not configured on the server")]
    MissingApiKey,
    #[error("image is empty")]
    EmptyImage,
    #[error("image exceeds the 5 MiB limit ({0} bytes)")]
    TooLarge(usize),
    #[error("unsupported image format, expected JPEG or PNG")]
    UnsupportedFormat,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("vision service returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("invalid vision response: {0}")]
    InvalidResponse(String),
}

impl VisionError {
    /// The upload itself was rejected.
    pub fn is_invalid_image(&self) -> bool {
        matches!(
            self,
            VisionError::EmptyImage | VisionError::TooLarge(_) | VisionError::UnsupportedFormat
        )
    }

    /// The vision service failed or answered with something unusable.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            VisionError::Http(_) | VisionError::Upstream { .. } | VisionError::InvalidResponse(_)
        )
    }
}

/// Check size and format; returns the MIME type to send upstream.
pub fn detect_image_mime(bytes: &[u8]) -> Result<&'static str, VisionError> {
    if bytes.is_empty() {
        return Err(VisionError::EmptyImage);
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(VisionError::TooLarge(bytes.len()));
    }
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => Ok("image/jpeg"),
        Ok(ImageFormat::Png) => Ok("image/png"),
        _ => Err(VisionError::UnsupportedFormat),
    }
}

pub fn build_payload(prompt: &str, mime_type: &str, image: &[u8]) -> Value {
    json!({
        "contents": [{
            "parts": [
                { "text": prompt },
                { "inline_data": { "mime_type": mime_type, "data": STANDARD.encode(image) } }
            ]
        }],
        "generationConfig": { "response_mime_type": "application/json" }
    })
}

/// JSON document the model generated, from the first candidate.
pub fn generated_json(response: &Value) -> Result<Value, VisionError> {
    let text = response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| VisionError::InvalidResponse(format!("no generated text in {}", response)))?;

    serde_json::from_str(text)
        .map_err(|e| VisionError::InvalidResponse(format!("{}: {}", e, text)))
}

pub fn parse_detection(response: &Value) -> Result<Detection, VisionError> {
    serde_json::from_value(generated_json(response)?)
        .map_err(|e| VisionError::InvalidResponse(e.to_string()))
}

pub fn parse_localization(response: &Value) -> Result<Localization, VisionError> {
    let pests: Vec<LocatedPest> = serde_json::from_value(generated_json(response)?)
        .map_err(|e| VisionError::InvalidResponse(e.to_string()))?;
    Ok(Localization::new(pests))
}

/// Pest detector backed by the Gemini API.
#[derive(Debug, Clone)]
pub struct PestDetector {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl PestDetector {
    /// Create a detector whose requests give up after `timeout`.
    pub fn new(api_key: Option<String>, model: String, timeout: Duration) -> Result<Self, VisionError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, prompt: &str, image: &[u8]) -> Result<Value, VisionError> {
        let mime_type = detect_image_mime(image)?;
        let api_key = self.api_key.as_deref().ok_or(VisionError::MissingApiKey)?;

        let url = format!("{}/{}:generateContent", API_BASE, self.model);
        debug!(model = %self.model, mime_type, bytes = image.len(), "Sending image to vision service");

        let resp = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&build_payload(prompt, mime_type, image))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Vision request failed");
            return Err(VisionError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json().await?)
    }

    /// Describe the pests visible on the image.
    pub async fn detect(&self, image: &[u8]) -> Result<Detection, VisionError> {
        let response = self.generate(DETECT_PROMPT, image).await?;
        parse_detection(&response)
    }

    /// Locate pests on the image with bounding boxes.
    pub async fn locate(&self, image: &[u8]) -> Result<Localization, VisionError> {
        let response = self.generate(LOCATE_PROMPT, image).await?;
        parse_localization(&response)
    }
}
