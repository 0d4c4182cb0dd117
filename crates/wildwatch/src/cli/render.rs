//! Text rendering for command output.

use std::fmt::Write as _;

use crate::config::{Config, CredentialReport};
use crate::identify::Identification;
use crate::location::{
    format_accuracy, format_altitude, format_coordinate, format_speed, format_timestamp, Position,
};
use crate::observation::{Observation, ObservationIcon};
use crate::store::StoreStats;

const NAME_WIDTH: usize = 28;

/// One-line summary of an observation.
#[must_use]
pub fn observation_line(observation: &Observation) -> String {
    format!(
        "{} {}  {}  ({}, {})  [{}]",
        observation.icon.glyph(),
        observation.date,
        observation.name,
        format_coordinate(observation.latitude, true),
        format_coordinate(observation.longitude, false),
        observation.id
    )
}

/// Aligned table of observations, header included.
#[must_use]
pub fn observation_table(observations: &[Observation]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<14} {:<10} {:<4} {:<NAME_WIDTH$} {:>11} {:>12}  PHOTO",
        "ID", "DATE", "ICON", "NAME", "LATITUDE", "LONGITUDE"
    );
    for o in observations {
        let _ = writeln!(
            out,
            "{:<14} {:<10} {:<4} {:<NAME_WIDTH$} {:>11.6} {:>12.6}  {}",
            o.id,
            o.date,
            o.icon.glyph(),
            clip(&o.name, NAME_WIDTH),
            o.latitude,
            o.longitude,
            if o.has_image() { "yes" } else { "-" }
        );
    }
    out
}

/// Full description of one observation.
#[must_use]
pub fn observation_details(o: &Observation) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", o.icon.glyph(), o.name);
    let _ = writeln!(out, "  ID:        {}", o.id);
    let _ = writeln!(out, "  Date:      {}", o.date);
    let _ = writeln!(out, "  Category:  {}", o.icon.label());
    let _ = writeln!(
        out,
        "  Position:  {}, {}",
        format_coordinate(o.latitude, true),
        format_coordinate(o.longitude, false)
    );
    let _ = writeln!(
        out,
        "  Photo:     {}",
        o.image_uri.as_deref().unwrap_or("(none)")
    );
    let _ = writeln!(out, "  Created:   {}", format_timestamp(&o.created_at));
    let _ = writeln!(out, "  Updated:   {}", format_timestamp(&o.updated_at));
    out
}

/// Where and how precisely a fix was taken.
#[must_use]
pub fn position_details(position: &Position) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  Position:  {}, {}",
        format_coordinate(position.latitude, true),
        format_coordinate(position.longitude, false)
    );
    let _ = writeln!(out, "  Accuracy:  {}", format_accuracy(position.accuracy));
    let _ = writeln!(out, "  Altitude:  {}", format_altitude(position.altitude));
    let _ = writeln!(out, "  Speed:     {}", format_speed(position.speed));
    let _ = writeln!(out, "  Fix time:  {}", format_timestamp(&position.timestamp));
    out
}

/// Human-readable identification result.
#[must_use]
pub fn identification_details(identification: &Identification) -> String {
    let r = &identification.result;
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", r.category.glyph(), r.name);
    let _ = writeln!(out, "  Scientific name: {}", r.scientific_name);
    let _ = writeln!(out, "  Family:          {}", r.family);
    let _ = writeln!(out, "  Safety:          {}", r.safety);
    let _ = writeln!(out, "  Confidence:      {}%", r.confidence_percent());
    let _ = writeln!(out, "  Habitat:         {}", r.habitat);
    let _ = writeln!(out, "  {}", r.description);
    if let Some(failure) = identification.failure {
        let _ = writeln!(out, "  (identification failed: {failure})");
    }
    out
}

/// Collection statistics.
#[must_use]
pub fn stats_summary(stats: &StoreStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Observations:  {}", stats.total_observations);
    let _ = writeln!(out, "With photo:    {}", stats.with_image);
    let _ = writeln!(out, "Database size: {}", format_size(stats.db_size_bytes));
    for icon in ObservationIcon::ALL {
        let _ = writeln!(
            out,
            "  {} {:<11} {}",
            icon.glyph(),
            icon.label(),
            stats.count_for(icon)
        );
    }
    if let (Some(oldest), Some(newest)) = (stats.oldest_created, stats.newest_created) {
        let _ = writeln!(out, "First added:   {}", format_timestamp(&oldest));
        let _ = writeln!(out, "Last added:    {}", format_timestamp(&newest));
    }
    out
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Sectioned view of the configuration. The API key is masked.
#[must_use]
pub fn config_summary(config: &Config) -> String {
    let report = config.identification.credential_report();
    let mut out = String::new();
    let _ = writeln!(out, "Current Configuration");
    let _ = writeln!(out, "=====================");
    let _ = writeln!(out);
    let _ = writeln!(out, "[Storage]");
    let _ = writeln!(out, "  Database path:   {}", config.database_path().display());
    let _ = writeln!(out, "  Collection key:  {}", config.storage.collection_key);
    let _ = writeln!(out);
    let _ = writeln!(out, "[Identification]");
    let _ = writeln!(out, "  API URL:         {}", config.identification.api_url);
    let _ = writeln!(
        out,
        "  API key:         {}",
        report.masked_prefix.as_deref().unwrap_or("(not set)")
    );
    let _ = writeln!(out, "  Timeout (s):     {}", config.identification.timeout_secs);
    let _ = writeln!(out);
    let _ = writeln!(out, "[Map]");
    let _ = writeln!(
        out,
        "  Default center:  {}, {}",
        format_coordinate(config.map.default_latitude, true),
        format_coordinate(config.map.default_longitude, false)
    );
    let _ = writeln!(out, "  Default zoom:    {}", config.map.default_zoom);
    out
}

/// Report of the credential check.
#[must_use]
pub fn credential_check(report: &CredentialReport) -> String {
    let mut out = String::new();
    if !report.present {
        let _ = writeln!(out, "✗ No API key configured.");
        let _ = writeln!(
            out,
            "  Set WILDWATCH_IDENTIFICATION__API_KEY or GEMINI_API_KEY, or add api_key under [identification]."
        );
        return out;
    }
    let _ = writeln!(out, "✓ API key found");
    let _ = writeln!(out, "  Length:  {} characters", report.length);
    if let Some(prefix) = &report.masked_prefix {
        let _ = writeln!(out, "  Starts:  {prefix}");
    }
    if report.expected_prefix {
        let _ = writeln!(out, "✓ Key format looks valid");
    } else {
        let _ = writeln!(out, "⚠ Key does not start with \"AIza\"; it may be invalid");
    }
    out
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identify::{IdentificationResult, IdentifyFailure};
    use crate::observation::NewObservation;

    fn fox() -> Observation {
        let mut o = NewObservation::new("Renard roux", 37.785_834, -122.406_417)
            .with_date("2024-03-15")
            .with_image("/photos/fox.jpg")
            .build()
            .unwrap();
        o.id = "1710513000000".to_string();
        o
    }

    #[test]
    fn test_observation_line() {
        let line = observation_line(&fox());
        assert!(line.starts_with("🦌 2024-03-15  Renard roux"));
        assert!(line.contains("37.785834° N"));
        assert!(line.contains("122.406417° W"));
        assert!(line.ends_with("[1710513000000]"));
    }

    #[test]
    fn test_observation_table() {
        let table = observation_table(&[fox()]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].contains("Renard roux"));
        assert!(lines[1].contains("-122.406417"));
        assert!(lines[1].ends_with("yes"));
    }

    #[test]
    fn test_observation_details() {
        let details = observation_details(&fox());
        assert!(details.contains("Category:  Animal"));
        assert!(details.contains("Photo:     /photos/fox.jpg"));
    }

    #[test]
    fn test_identification_details_mentions_failure() {
        let identification = Identification {
            result: IdentificationResult::unidentified(),
            failure: Some(IdentifyFailure::RemoteService),
        };
        let text = identification_details(&identification);
        assert!(text.contains("Non identifié"));
        assert!(text.contains("Confidence:      0%"));
        assert!(text.contains("remote_service"));
    }

    #[test]
    fn test_position_details() {
        let position = Position {
            accuracy: Some(1234.0),
            altitude: Some(1035.4),
            speed: Some(2.5),
            ..Position::at(45.9, 6.87)
        };
        let text = position_details(&position);
        assert!(text.contains("45.900000° N, 6.870000° E"));
        assert!(text.contains("Accuracy:  1.2km"));
        assert!(text.contains("Altitude:  1035m"));
        assert!(text.contains("Speed:     9.0 km/h"));

        let bare = position_details(&Position::at(0.0, 0.0));
        assert!(bare.contains("Accuracy:  N/A"));
        assert!(bare.contains("Speed:     N/A"));
    }

    #[test]
    fn test_stats_summary() {
        let stats = StoreStats::from_observations(&[fox()]);
        let text = stats_summary(&stats);
        assert!(text.contains("Observations:  1"));
        assert!(text.contains("With photo:    1"));
        assert!(text.contains("Champignon"));
        assert!(text.contains("Database size: 0 B"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(24_576), "24.0 KiB");
        assert_eq!(format_size(3 * 1024 * 1024 / 2), "1.5 MiB");
    }

    #[test]
    fn test_config_summary_masks_key() {
        let mut config = Config::default();
        config.identification.api_key = Some("AIzaSyAbcdefghijklmnop".to_string());
        let text = config_summary(&config);
        assert!(text.contains("AIzaSyAbcd..."));
        assert!(!text.contains("efghijklmnop"));
    }

    #[test]
    fn test_credential_check() {
        let missing = credential_check(&CredentialReport::for_key(None));
        assert!(missing.contains("No API key"));

        let odd = credential_check(&CredentialReport::for_key(Some("sk-123")));
        assert!(odd.contains("may be invalid"));

        let good = credential_check(&CredentialReport::for_key(Some("AIzaSyAbcdef")));
        assert!(good.contains("looks valid"));
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdefghij", 5), "abcd…");
    }
}
