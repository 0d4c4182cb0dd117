//! Best-effort identification of photographed specimens.
//!
//! [`ImageIdentifier`] sends a photo and a fixed prompt to a remote vision
//! model and maps the answer to an [`IdentificationResult`]. Identification is
//! advisory: any failure (unreadable photo, network, bad credential, garbage
//! answer) yields [`IdentificationResult::unidentified`] rather than an error,
//! with the failure logged and tagged in [`Identification::failure`].

pub mod client;
pub mod parse;
pub mod wire;

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::IdentificationConfig;
use crate::observation::ObservationIcon;

pub use client::{GeminiBackend, VisionBackend};
pub use parse::{extract_json_object, parse_identification, ParsedResponse};
pub use wire::ImagePayload;

/// Instruction sent with every photo.
pub const IDENTIFICATION_PROMPT: &str = r#"Identifie cette image de nature (plante, animal ou champignon).

Réponds UNIQUEMENT au format JSON suivant :
{
  "name": "Nom commun en français",
  "scientificName": "Nom scientifique (genre espèce)",
  "family": "Famille taxonomique",
  "description": "Description courte (2-3 phrases)",
  "habitat": "Habitat naturel et distribution",
  "safety": "safe|caution|dangerous",
  "confidence": 0.95,
  "category": "plant|animal|fungus|unknown"
}

Critères de sécurité :
- "safe" : Espèce inoffensive
- "caution" : Précautions nécessaires (allergies, épines, etc.)
- "dangerous" : Espèce toxique, venimeuse ou dangereuse

Sois précis et scientifique dans ton identification."#;

/// Errors inside the identification pipeline.
///
/// These never escape [`ImageIdentifier`]; they are logged and reduced to an
/// [`IdentifyFailure`] tag.
#[derive(Debug, Error)]
pub enum IdentifyError {
    /// No API key is configured.
    #[error("identification is not configured")]
    NotConfigured,

    /// The photo could not be read.
    #[error("failed to read image {path}: {source}")]
    ImageRead {
        /// Resolved path of the photo.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The remote call failed or returned a non-2xx status.
    #[error("remote service failed{}: {message}", status_suffix(.status))]
    RemoteService {
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Description of what went wrong.
        message: String,
    },

    /// The answer held no usable identification.
    #[error("could not parse response: {reason}")]
    ResponseParse {
        /// Why the answer was rejected.
        reason: String,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with status {s}")).unwrap_or_default()
}

impl IdentifyError {
    /// The tag recorded alongside the default result.
    #[must_use]
    pub fn kind(&self) -> IdentifyFailure {
        match self {
            Self::NotConfigured => IdentifyFailure::NotConfigured,
            Self::ImageRead { .. } => IdentifyFailure::ImageRead,
            Self::RemoteService { .. } => IdentifyFailure::RemoteService,
            Self::ResponseParse { .. } => IdentifyFailure::ResponseParse,
        }
    }
}

/// Why an identification fell back to the default result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifyFailure {
    /// No API key.
    NotConfigured,
    /// Photo missing or unreadable.
    ImageRead,
    /// Network error or non-2xx response.
    RemoteService,
    /// No usable JSON in the answer.
    ResponseParse,
}

impl std::fmt::Display for IdentifyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "not_configured"),
            Self::ImageRead => write!(f, "image_read"),
            Self::RemoteService => write!(f, "remote_service"),
            Self::ResponseParse => write!(f, "response_parse"),
        }
    }
}

/// How hazardous the identified specimen is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Safety {
    /// Harmless.
    #[default]
    Safe,
    /// Needs care (allergens, thorns, ...).
    Caution,
    /// Toxic, venomous or otherwise dangerous.
    Dangerous,
}

impl Safety {
    /// Parse a model-supplied value, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "safe" => Some(Self::Safe),
            "caution" => Some(Self::Caution),
            "dangerous" => Some(Self::Dangerous),
            _ => None,
        }
    }
}

impl std::fmt::Display for Safety {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Caution => write!(f, "caution"),
            Self::Dangerous => write!(f, "dangerous"),
        }
    }
}

/// Broad kind of the identified specimen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// A plant.
    Plant,
    /// An animal.
    Animal,
    /// A fungus.
    Fungus,
    /// Could not tell.
    #[default]
    Unknown,
}

impl Category {
    /// Parse a model-supplied value, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "plant" => Some(Self::Plant),
            "animal" => Some(Self::Animal),
            "fungus" => Some(Self::Fungus),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// The observation icon to pre-select for this category.
    #[must_use]
    pub fn suggested_icon(self) -> Option<ObservationIcon> {
        match self {
            Self::Plant => Some(ObservationIcon::Plant),
            Self::Animal => Some(ObservationIcon::Animal),
            Self::Fungus => Some(ObservationIcon::Fungus),
            Self::Unknown => None,
        }
    }

    /// Glyph shown next to an identification.
    #[must_use]
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Plant => "🌿",
            Self::Animal => "🦌",
            Self::Fungus => "🍄",
            Self::Unknown => "🔍",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plant => write!(f, "plant"),
            Self::Animal => write!(f, "animal"),
            Self::Fungus => write!(f, "fungus"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The model's best guess about a photo. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationResult {
    /// Common name.
    pub name: String,
    /// Binomial name.
    pub scientific_name: String,
    /// Taxonomic family.
    pub family: String,
    /// Short description.
    pub description: String,
    /// Natural habitat and range.
    pub habitat: String,
    /// Hazard classification.
    pub safety: Safety,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Broad kind.
    pub category: Category,
}

impl IdentificationResult {
    /// The result substituted whenever identification fails.
    #[must_use]
    pub fn unidentified() -> Self {
        Self {
            name: "Non identifié".to_string(),
            scientific_name: "Non identifié".to_string(),
            family: parse::DEFAULT_FAMILY.to_string(),
            description: "Impossible d'identifier cette image. Veuillez réessayer ou saisir manuellement."
                .to_string(),
            habitat: parse::DEFAULT_HABITAT.to_string(),
            safety: Safety::Safe,
            confidence: 0.0,
            category: Category::Unknown,
        }
    }

    /// Confidence as a whole percentage.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

/// An identification together with the reason it fell back, if it did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identification {
    /// The result shown to the user.
    pub result: IdentificationResult,
    /// Set when `result` is the default because something failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<IdentifyFailure>,
}

impl Identification {
    /// Check whether the default result was substituted.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.failure.is_some()
    }
}

/// Identifies photos through a [`VisionBackend`], never failing.
///
/// Each call is one independent request: no retries, no caching.
#[derive(Debug, Clone)]
pub struct ImageIdentifier {
    backend: Arc<dyn VisionBackend>,
}

impl ImageIdentifier {
    /// Create an identifier over the given backend.
    pub fn new(backend: impl VisionBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Create an identifier using the configured HTTP backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &IdentificationConfig) -> crate::Result<Self> {
        Ok(Self::new(GeminiBackend::from_config(config)?))
    }

    /// True iff a credential is present. Callers should check this first and
    /// report a configuration error instead of identifying.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.backend.is_configured()
    }

    /// Identify the photo behind `photo_ref`.
    ///
    /// Always returns a result; failures yield
    /// [`IdentificationResult::unidentified`].
    pub async fn identify_image(&self, photo_ref: &str) -> IdentificationResult {
        self.identify_image_detailed(photo_ref).await.result
    }

    /// Like [`ImageIdentifier::identify_image`], keeping the failure kind.
    pub async fn identify_image_detailed(&self, photo_ref: &str) -> Identification {
        match self.try_identify(photo_ref).await {
            Ok(result) => {
                info!(
                    "Identified {} as {} ({}%)",
                    photo_ref,
                    result.name,
                    result.confidence_percent()
                );
                Identification {
                    result,
                    failure: None,
                }
            }
            Err(e) => {
                warn!("Identification of {} failed: {}", photo_ref, e);
                Identification {
                    result: IdentificationResult::unidentified(),
                    failure: Some(e.kind()),
                }
            }
        }
    }

    async fn try_identify(
        &self,
        photo_ref: &str,
    ) -> std::result::Result<IdentificationResult, IdentifyError> {
        if !self.backend.is_configured() {
            return Err(IdentifyError::NotConfigured);
        }

        let image = ImagePayload::load(photo_ref).await?;
        let answer = self.backend.generate(IDENTIFICATION_PROMPT, &image).await?;

        match parse_identification(&answer) {
            ParsedResponse::Parsed(result) => Ok(result),
            ParsedResponse::Unparseable { reason } => Err(IdentifyError::ResponseParse { reason }),
        }
    }
}
