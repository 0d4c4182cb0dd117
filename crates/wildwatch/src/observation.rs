//! Core observation types for wildwatch.
//!
//! This module defines the record persisted for every sighting, the category
//! icon attached to it, and the creation and partial-update types the store
//! accepts.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Shape of a stored observation date. Calendar correctness is not checked.
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"));

/// Category tag shown on the map marker of an observation.
///
/// Collections written by the mobile app stored the marker glyph itself, so
/// each variant also accepts its emoji when deserializing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationIcon {
    /// Mammals, reptiles, insects and anything without a better tag.
    #[default]
    #[serde(alias = "🦌")]
    Animal,
    /// Mushrooms and other fungi.
    #[serde(alias = "🍄")]
    Fungus,
    /// Plants.
    #[serde(alias = "🌿")]
    Plant,
    /// Birds.
    #[serde(alias = "🦅")]
    Bird,
}

impl ObservationIcon {
    /// Every icon, in the order the picker presents them.
    pub const ALL: [Self; 4] = [Self::Animal, Self::Fungus, Self::Plant, Self::Bird];

    /// The marker glyph.
    #[must_use]
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Animal => "🦌",
            Self::Fungus => "🍄",
            Self::Plant => "🌿",
            Self::Bird => "🦅",
        }
    }

    /// The label shown next to the glyph.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Animal => "Animal",
            Self::Fungus => "Champignon",
            Self::Plant => "Plante",
            Self::Bird => "Oiseau",
        }
    }
}

impl std::fmt::Display for ObservationIcon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Animal => write!(f, "animal"),
            Self::Fungus => write!(f, "fungus"),
            Self::Plant => write!(f, "plant"),
            Self::Bird => write!(f, "bird"),
        }
    }
}

impl std::str::FromStr for ObservationIcon {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "animal" | "🦌" => Ok(Self::Animal),
            "fungus" | "🍄" => Ok(Self::Fungus),
            "plant" | "🌿" => Ok(Self::Plant),
            "bird" | "🦅" => Ok(Self::Bird),
            other => Err(Error::invalid(format!("unknown icon: {other}"))),
        }
    }
}

/// A recorded sighting.
///
/// Field names are serialized in camelCase so the persisted collection stays
/// compatible with the format the mobile app writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Unique identifier, assigned at creation.
    pub id: String,

    /// Free-text label.
    pub name: String,

    /// Observation date as `YYYY-MM-DD`.
    pub date: String,

    /// Latitude in degrees. Never edited after creation.
    pub latitude: f64,

    /// Longitude in degrees. Never edited after creation.
    pub longitude: f64,

    /// Reference to a locally stored photo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,

    /// Category tag. Older records without one read as [`ObservationIcon::Animal`].
    #[serde(default)]
    pub icon: ObservationIcon,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Observation {
    /// Generate an id from the given instant (milliseconds since the epoch).
    #[must_use]
    pub fn generate_id(at: DateTime<Utc>) -> String {
        at.timestamp_millis().to_string()
    }

    /// Today's date in the stored `YYYY-MM-DD` form.
    #[must_use]
    pub fn today() -> String {
        Utc::now().date_naive().format("%Y-%m-%d").to_string()
    }

    /// Check the record invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidObservation`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::invalid("id must not be empty"));
        }
        validate_name(&self.name)?;
        validate_date(&self.date)?;
        validate_coordinates(self.latitude, self.longitude)?;
        if self.created_at > self.updated_at {
            return Err(Error::invalid(format!(
                "updatedAt ({}) precedes createdAt ({})",
                self.updated_at.to_rfc3339(),
                self.created_at.to_rfc3339()
            )));
        }
        Ok(())
    }

    /// Mark the record as modified at `now`.
    ///
    /// `updated_at` never moves before `created_at`, even if the clock does.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }

    /// Check whether a photo is attached.
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.image_uri.is_some()
    }
}

/// Input for a new observation, typically built after a map tap.
#[derive(Debug, Clone, PartialEq)]
pub struct NewObservation {
    /// Free-text label.
    pub name: String,
    /// Observation date; today when `None`.
    pub date: Option<String>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Optional photo reference.
    pub image_uri: Option<String>,
    /// Category tag.
    pub icon: ObservationIcon,
}

impl NewObservation {
    /// Start a new observation at the given coordinate.
    #[must_use]
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            date: None,
            latitude,
            longitude,
            image_uri: None,
            icon: ObservationIcon::default(),
        }
    }

    /// Set the observation date.
    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Set the category icon.
    #[must_use]
    pub fn with_icon(mut self, icon: ObservationIcon) -> Self {
        self.icon = icon;
        self
    }

    /// Attach a photo reference.
    #[must_use]
    pub fn with_image(mut self, image_uri: impl Into<String>) -> Self {
        self.image_uri = Some(image_uri.into());
        self
    }

    /// Stamp an id and timestamps and produce the record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidObservation`] if the input violates a record
    /// invariant.
    pub fn build(self) -> Result<Observation> {
        self.build_at(Utc::now())
    }

    /// Like [`NewObservation::build`] with an explicit creation instant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidObservation`] if the input violates a record
    /// invariant.
    pub fn build_at(self, now: DateTime<Utc>) -> Result<Observation> {
        let observation = Observation {
            id: Observation::generate_id(now),
            name: self.name.trim().to_string(),
            date: self.date.unwrap_or_else(Observation::today),
            latitude: self.latitude,
            longitude: self.longitude,
            image_uri: self.image_uri,
            icon: self.icon,
            created_at: now,
            updated_at: now,
        };
        observation.validate()?;
        Ok(observation)
    }
}

/// Partial update applied by the edit flow.
///
/// Coordinates and timestamps are deliberately absent: they cannot be edited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationPatch {
    /// New label.
    pub name: Option<String>,
    /// New date.
    pub date: Option<String>,
    /// New category icon.
    pub icon: Option<ObservationIcon>,
    /// `Some(Some(uri))` replaces the photo, `Some(None)` removes it.
    pub image_uri: Option<Option<String>>,
}

impl ObservationPatch {
    /// An empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the label.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Change the date.
    #[must_use]
    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Change the icon.
    #[must_use]
    pub fn icon(mut self, icon: ObservationIcon) -> Self {
        self.icon = Some(icon);
        self
    }

    /// Replace the photo.
    #[must_use]
    pub fn image_uri(mut self, image_uri: impl Into<String>) -> Self {
        self.image_uri = Some(Some(image_uri.into()));
        self
    }

    /// Remove the photo.
    #[must_use]
    pub fn remove_image(mut self) -> Self {
        self.image_uri = Some(None);
        self
    }

    /// Check whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.date.is_none() && self.icon.is_none() && self.image_uri.is_none()
    }

    /// Check the fields this patch sets. Fields it leaves alone are not
    /// looked at, so records written by older clients stay editable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidObservation`] for a blank name or a date that
    /// is not `YYYY-MM-DD`.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(date) = &self.date {
            validate_date(date)?;
        }
        Ok(())
    }

    /// Shallow-merge the patch into `observation`. Does not touch timestamps.
    pub fn apply_to(&self, observation: &mut Observation) {
        if let Some(name) = &self.name {
            observation.name = name.trim().to_string();
        }
        if let Some(date) = &self.date {
            observation.date.clone_from(date);
        }
        if let Some(icon) = self.icon {
            observation.icon = icon;
        }
        if let Some(image_uri) = &self.image_uri {
            observation.image_uri.clone_from(image_uri);
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::invalid("name must not be empty"));
    }
    Ok(())
}

fn validate_date(date: &str) -> Result<()> {
    if !DATE_PATTERN.is_match(date) {
        return Err(Error::invalid(format!("date must be YYYY-MM-DD, got {date:?}")));
    }
    Ok(())
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(Error::invalid(format!("latitude out of range: {latitude}")));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::invalid(format!("longitude out of range: {longitude}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap()
    }

    fn sample() -> Observation {
        NewObservation::new("Renard roux", 48.8566, 2.3522)
            .with_date("2024-03-15")
            .build_at(fixed_instant())
            .unwrap()
    }

    #[test]
    fn test_icon_display() {
        assert_eq!(ObservationIcon::Animal.to_string(), "animal");
        assert_eq!(ObservationIcon::Fungus.to_string(), "fungus");
        assert_eq!(ObservationIcon::Plant.to_string(), "plant");
        assert_eq!(ObservationIcon::Bird.to_string(), "bird");
    }

    #[test]
    fn test_icon_from_str_accepts_names_and_glyphs() {
        assert_eq!("bird".parse::<ObservationIcon>().unwrap(), ObservationIcon::Bird);
        assert_eq!("Plant".parse::<ObservationIcon>().unwrap(), ObservationIcon::Plant);
        assert_eq!("🍄".parse::<ObservationIcon>().unwrap(), ObservationIcon::Fungus);
        assert!("fish".parse::<ObservationIcon>().is_err());
    }

    #[test]
    fn test_icon_deserializes_legacy_glyph() {
        let icon: ObservationIcon = serde_json::from_str("\"🦅\"").unwrap();
        assert_eq!(icon, ObservationIcon::Bird);
    }

    #[test]
    fn test_build_stamps_id_and_timestamps() {
        let obs = sample();
        assert_eq!(obs.id, fixed_instant().timestamp_millis().to_string());
        assert_eq!(obs.created_at, obs.updated_at);
        assert_eq!(obs.icon, ObservationIcon::Animal);
        assert!(!obs.has_image());
    }

    #[test]
    fn test_build_trims_name() {
        let obs = NewObservation::new("  Cèpe  ", 45.0, 5.0)
            .with_date("2024-10-01")
            .build()
            .unwrap();
        assert_eq!(obs.name, "Cèpe");
    }

    #[test]
    fn test_build_defaults_date_to_today() {
        let obs = NewObservation::new("Héron", 45.0, 5.0).build().unwrap();
        assert_eq!(obs.date, Observation::today());
    }

    #[test]
    fn test_build_rejects_blank_name() {
        let err = NewObservation::new("   ", 45.0, 5.0).build().unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_build_rejects_malformed_date() {
        let err = NewObservation::new("Héron", 45.0, 5.0)
            .with_date("15/03/2024")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_date_calendar_is_not_checked() {
        let obs = NewObservation::new("Héron", 45.0, 5.0)
            .with_date("2024-02-31")
            .build();
        assert!(obs.is_ok());
    }

    #[test]
    fn test_build_rejects_out_of_range_coordinates() {
        assert!(NewObservation::new("x", 91.0, 0.0).build().is_err());
        assert!(NewObservation::new("x", 0.0, -180.5).build().is_err());
        assert!(NewObservation::new("x", f64::NAN, 0.0).build().is_err());
    }

    #[test]
    fn test_touch_never_precedes_creation() {
        let mut obs = sample();
        let earlier = fixed_instant() - chrono::Duration::hours(1);
        obs.touch(earlier);
        assert_eq!(obs.updated_at, obs.created_at);

        let later = fixed_instant() + chrono::Duration::hours(1);
        obs.touch(later);
        assert_eq!(obs.updated_at, later);
    }

    #[test]
    fn test_patch_applies_only_set_fields() {
        let mut obs = sample();
        let before = obs.clone();
        ObservationPatch::new().name("  Blaireau ").apply_to(&mut obs);

        assert_eq!(obs.name, "Blaireau");
        assert_eq!(obs.date, before.date);
        assert_eq!(obs.icon, before.icon);
        assert_eq!(obs.latitude, before.latitude);
        assert_eq!(obs.updated_at, before.updated_at);
    }

    #[test]
    fn test_patch_sets_and_removes_image() {
        let mut obs = sample();
        ObservationPatch::new()
            .image_uri("file:///photos/a.jpg")
            .apply_to(&mut obs);
        assert_eq!(obs.image_uri.as_deref(), Some("file:///photos/a.jpg"));

        ObservationPatch::new().remove_image().apply_to(&mut obs);
        assert!(obs.image_uri.is_none());
    }

    #[test]
    fn test_patch_validates_only_set_fields() {
        assert!(ObservationPatch::new().validate().is_ok());
        assert!(ObservationPatch::new().icon(ObservationIcon::Plant).validate().is_ok());
        assert!(ObservationPatch::new().name("Blaireau").validate().is_ok());
        assert!(ObservationPatch::new().date("2024-03-16").validate().is_ok());
        assert!(ObservationPatch::new().name("   ").validate().is_err());
        assert!(ObservationPatch::new().date("16/03/2024").validate().is_err());
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(ObservationPatch::new().is_empty());
        assert!(!ObservationPatch::new().icon(ObservationIcon::Bird).is_empty());
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let obs = sample();
        let json = serde_json::to_string(&obs).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"updatedAt\""));
        assert!(!json.contains("imageUri"));
    }

    #[test]
    fn test_deserialize_record_without_icon() {
        let json = r#"{
            "id": "1710513000000",
            "name": "Chevreuil",
            "date": "2024-03-15",
            "latitude": 48.85,
            "longitude": 2.35,
            "imageUri": "file:///photos/chevreuil.jpg",
            "createdAt": "2024-03-15T14:30:00.000Z",
            "updatedAt": "2024-03-15T14:30:00.000Z"
        }"#;
        let obs: Observation = serde_json::from_str(json).unwrap();
        assert_eq!(obs.icon, ObservationIcon::Animal);
        assert_eq!(obs.image_uri.as_deref(), Some("file:///photos/chevreuil.jpg"));
        assert!(obs.validate().is_ok());
    }
}
