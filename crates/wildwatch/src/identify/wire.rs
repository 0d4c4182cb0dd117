//! Request and response bodies of the `generateContent` endpoint, plus the
//! photo payload they carry.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use super::IdentifyError;

/// A photo ready to be sent inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// MIME type announced to the model.
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

impl ImagePayload {
    /// Encode raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Read and encode the photo behind `photo_ref`.
    ///
    /// `photo_ref` is a filesystem path, optionally with a `file://` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifyError::ImageRead`] if the file cannot be read.
    pub async fn load(photo_ref: &str) -> Result<Self, IdentifyError> {
        let path = resolve_photo_path(photo_ref);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| IdentifyError::ImageRead {
                path: path.clone(),
                source,
            })?;
        Ok(Self::from_bytes(&bytes, mime_type_for(&path)))
    }
}

/// Turn a photo reference into a filesystem path.
#[must_use]
pub fn resolve_photo_path(photo_ref: &str) -> PathBuf {
    PathBuf::from(photo_ref.strip_prefix("file://").unwrap_or(photo_ref))
}

/// Guess the MIME type from the file extension; JPEG when unknown.
#[must_use]
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        _ => "image/jpeg",
    }
}

/// Body of a `generateContent` call.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    /// Conversation turns; identification sends exactly one.
    pub contents: Vec<Content>,
}

/// One turn of the conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    /// Ordered parts of the turn.
    pub parts: Vec<Part>,
}

/// A text or inline-data part.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// Inline binary data.
    InlineData {
        /// The payload.
        inline_data: InlineData,
    },
}

/// Base64 payload with its MIME type.
#[derive(Debug, Clone, Serialize)]
pub struct InlineData {
    /// MIME type of the decoded bytes.
    pub mime_type: String,
    /// Base64 data.
    pub data: String,
}

impl GenerateContentRequest {
    /// Build the single-turn prompt + image request.
    #[must_use]
    pub fn new(prompt: &str, image: &ImagePayload) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: image.data.clone(),
                        },
                    },
                ],
            }],
        }
    }
}

/// Envelope returned by `generateContent`. Only the fields we read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    /// Candidate answers, best first.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// One candidate answer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    /// The answer content.
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

/// Content of a candidate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateContent {
    /// Parts of the answer.
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

/// A part of the answer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsePart {
    /// Text, when the part is textual.
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let image = ImagePayload::from_bytes(b"abc", "image/jpeg");
        let request = GenerateContentRequest::new("Identify", &image);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{
                    "parts": [
                        { "text": "Identify" },
                        { "inline_data": { "mime_type": "image/jpeg", "data": "YWJj" } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_first_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"hello"}],"role":"model"},"finishReason":"STOP"}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.first_text(), Some("hello"));
    }

    #[test]
    fn test_first_text_missing() {
        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.first_text(), None);

        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert_eq!(blocked.first_text(), None);
    }

    #[test]
    fn test_resolve_photo_path() {
        assert_eq!(
            resolve_photo_path("file:///data/photos/fox.jpg"),
            PathBuf::from("/data/photos/fox.jpg")
        );
        assert_eq!(resolve_photo_path("fox.jpg"), PathBuf::from("fox.jpg"));
    }

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_type_for(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_type_for(Path::new("a.heic")), "image/heic");
        assert_eq!(mime_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("no_extension")), "image/jpeg");
    }

    #[tokio::test]
    async fn test_load_encodes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.png");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let payload = ImagePayload::load(&format!("file://{}", path.display()))
            .await
            .unwrap();
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.data, STANDARD.encode(b"\x89PNG"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = ImagePayload::load("/nonexistent/photo.jpg").await.unwrap_err();
        assert!(matches!(err, IdentifyError::ImageRead { .. }));
    }
}
