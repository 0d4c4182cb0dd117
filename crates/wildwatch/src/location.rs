//! Acquiring the current position and formatting location values.
//!
//! A [`LocationProvider`] answers permission queries and position requests;
//! [`LocationTracker`] drives one through the
//! `idle → loading → success | error | denied` state machine. The CLI uses
//! [`FixedLocationProvider`] with coordinates from its arguments or the
//! configured map center.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Message recorded when the user refuses location access.
pub const PERMISSION_DENIED_MESSAGE: &str = "Permission de localisation refusée";

/// Message recorded when a provider fails without saying why.
const UNKNOWN_ERROR_MESSAGE: &str = "Erreur inconnue";

/// Where a [`LocationTracker`] is in its acquisition cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationStatus {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// Request in flight.
    Loading,
    /// A position was obtained.
    Success,
    /// The provider failed.
    Error,
    /// Permission was refused.
    Denied,
}

/// Answer to a permission query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    /// Access allowed.
    Granted,
    /// Access refused.
    Denied,
    /// The user has not been asked yet.
    Undetermined,
}

/// A position fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: Option<f64>,
    /// Meters above sea level.
    pub altitude: Option<f64>,
    /// Ground speed in m/s.
    pub speed: Option<f64>,
    /// When the fix was taken.
    pub timestamp: DateTime<Utc>,
}

impl Position {
    /// A bare coordinate fixed now.
    #[must_use]
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            altitude: None,
            speed: None,
            timestamp: Utc::now(),
        }
    }
}

/// Source of positions.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Current permission state, without prompting.
    async fn permission_status(&self) -> Result<PermissionStatus>;

    /// Ask for permission.
    async fn request_permission(&self) -> Result<PermissionStatus>;

    /// Obtain a fix. Only called once permission is granted.
    async fn current_position(&self) -> Result<Position>;
}

/// Provider that always grants access and returns the same coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLocationProvider {
    latitude: f64,
    longitude: f64,
    accuracy: Option<f64>,
    altitude: Option<f64>,
}

impl FixedLocationProvider {
    /// Create a provider pinned to the given coordinate.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            altitude: None,
        }
    }

    /// Report this horizontal accuracy, in meters, with every fix.
    #[must_use]
    pub fn with_accuracy(mut self, accuracy: Option<f64>) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// Report this altitude, in meters, with every fix.
    #[must_use]
    pub fn with_altitude(mut self, altitude: Option<f64>) -> Self {
        self.altitude = altitude;
        self
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn permission_status(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn current_position(&self) -> Result<Position> {
        Ok(Position {
            accuracy: self.accuracy,
            altitude: self.altitude,
            ..Position::at(self.latitude, self.longitude)
        })
    }
}

/// Tracks one provider's position and acquisition status.
#[derive(Debug)]
pub struct LocationTracker<P> {
    provider: P,
    position: Option<Position>,
    status: LocationStatus,
    error: Option<String>,
}

impl<P: LocationProvider> LocationTracker<P> {
    /// Create an idle tracker.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            position: None,
            status: LocationStatus::Idle,
            error: None,
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> LocationStatus {
        self.status
    }

    /// Last position obtained, kept across later failures.
    #[must_use]
    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Message of the last failure.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Run one acquisition cycle and return the resulting status.
    ///
    /// Asks for permission only when it is not already granted.
    pub async fn request_location(&mut self) -> LocationStatus {
        self.status = LocationStatus::Loading;
        self.error = None;

        match self.acquire().await {
            Ok(Some(position)) => {
                info!(
                    "Position acquired: {}, {}",
                    format_coordinate(position.latitude, true),
                    format_coordinate(position.longitude, false)
                );
                self.position = Some(position);
                self.status = LocationStatus::Success;
            }
            Ok(None) => {
                warn!("Location permission refused");
                self.status = LocationStatus::Denied;
                self.error = Some(PERMISSION_DENIED_MESSAGE.to_string());
            }
            Err(e) => {
                warn!("Location request failed: {}", e);
                let message = e.to_string();
                self.status = LocationStatus::Error;
                self.error = Some(if message.is_empty() {
                    UNKNOWN_ERROR_MESSAGE.to_string()
                } else {
                    message
                });
            }
        }

        self.status
    }

    /// Run a cycle and return the position, or the failure as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] when access is refused and
    /// [`Error::Location`] when the provider fails.
    pub async fn require_position(&mut self) -> Result<Position> {
        match self.request_location().await {
            LocationStatus::Success => self
                .position
                .clone()
                .ok_or_else(|| Error::internal("position missing after success")),
            LocationStatus::Denied => Err(Error::PermissionDenied),
            _ => Err(Error::location(
                self.error.clone().unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string()),
            )),
        }
    }

    async fn acquire(&self) -> Result<Option<Position>> {
        let mut permission = self.provider.permission_status().await?;
        if permission != PermissionStatus::Granted {
            debug!("Location permission is {:?}, requesting", permission);
            permission = self.provider.request_permission().await?;
        }
        if permission != PermissionStatus::Granted {
            return Ok(None);
        }
        self.provider.current_position().await.map(Some)
    }
}

/// Format a coordinate with its hemisphere, e.g. `37.785834° N`.
#[must_use]
pub fn format_coordinate(value: f64, is_latitude: bool) -> String {
    let direction = match (is_latitude, value >= 0.0) {
        (true, true) => 'N',
        (true, false) => 'S',
        (false, true) => 'E',
        (false, false) => 'W',
    };
    format!("{:.6}° {}", value.abs(), direction)
}

/// Format a horizontal accuracy: meters below 1 km, else kilometers.
#[must_use]
pub fn format_accuracy(accuracy: Option<f64>) -> String {
    match present(accuracy) {
        None => "N/A".to_string(),
        Some(m) if m < 1000.0 => format!("{}m", m.round()),
        Some(m) => format!("{:.1}km", m / 1000.0),
    }
}

/// Format a speed given in m/s as km/h.
#[must_use]
pub fn format_speed(speed: Option<f64>) -> String {
    match present(speed) {
        None => "N/A".to_string(),
        Some(ms) => format!("{:.1} km/h", ms * 3.6),
    }
}

/// Format an altitude in whole meters.
#[must_use]
pub fn format_altitude(altitude: Option<f64>) -> String {
    match present(altitude) {
        None => "N/A".to_string(),
        Some(m) => format!("{}m", m.round()),
    }
}

/// Format a timestamp as `dd/mm/yyyy hh:mm`.
#[must_use]
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%d/%m/%Y %H:%M").to_string()
}

// Zero and NaN read as "no value", like a missing reading.
fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.abs() > 0.0)
}
