//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::observation::{ObservationIcon, ObservationPatch};
use crate::query::{ObservationQuery, SortOrder};

/// Add command arguments.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Name of the observed species or specimen
    #[arg(short, long)]
    pub name: Option<String>,

    /// Latitude in degrees (defaults to the configured map center)
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude in degrees (defaults to the configured map center)
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Horizontal accuracy of the coordinate, in meters
    #[arg(long, value_name = "METERS", requires = "lat")]
    pub accuracy: Option<f64>,

    /// Altitude of the coordinate, in meters
    #[arg(long, value_name = "METERS", requires = "lat", allow_negative_numbers = true)]
    pub altitude: Option<f64>,

    /// Observation date as YYYY-MM-DD (defaults to today)
    #[arg(short, long)]
    pub date: Option<String>,

    /// Category icon: animal, fungus, plant or bird (or its emoji)
    #[arg(short, long, value_name = "ICON")]
    pub icon: Option<ObservationIcon>,

    /// Path to a photo of the observation
    #[arg(long, value_name = "PATH")]
    pub image: Option<String>,

    /// Identify the photo first and pre-fill the name and icon
    #[arg(long, requires = "image")]
    pub identify: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only show observations with this icon
    #[arg(short, long, value_name = "ICON")]
    pub icon: Option<ObservationIcon>,

    /// Case-insensitive search on the name
    #[arg(short, long)]
    pub search: Option<String>,

    /// Sort order: date-desc, date-asc, name-asc or name-desc
    #[arg(long, value_name = "ORDER", default_value_t = SortOrder::DateDesc)]
    pub sort: SortOrder,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl ListCommand {
    /// The query these arguments describe.
    #[must_use]
    pub fn query(&self) -> ObservationQuery {
        ObservationQuery {
            icon: self.icon,
            search: self.search.clone(),
            sort: self.sort,
        }
    }
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Observation ID
    pub id: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Edit command arguments.
#[derive(Debug, Args)]
pub struct EditCommand {
    /// Observation ID
    pub id: String,

    /// New name
    #[arg(short, long)]
    pub name: Option<String>,

    /// New date as YYYY-MM-DD
    #[arg(short, long)]
    pub date: Option<String>,

    /// New category icon
    #[arg(short, long, value_name = "ICON")]
    pub icon: Option<ObservationIcon>,

    /// Attach or replace the photo
    #[arg(long, value_name = "PATH", conflicts_with = "remove_image")]
    pub image: Option<String>,

    /// Detach the photo
    #[arg(long)]
    pub remove_image: bool,
}

impl EditCommand {
    /// The patch these arguments describe.
    #[must_use]
    pub fn patch(&self) -> ObservationPatch {
        let mut patch = ObservationPatch::new();
        if let Some(name) = &self.name {
            patch = patch.name(name.clone());
        }
        if let Some(date) = &self.date {
            patch = patch.date(date.clone());
        }
        if let Some(icon) = self.icon {
            patch = patch.icon(icon);
        }
        if let Some(image) = &self.image {
            patch = patch.image_uri(image.clone());
        } else if self.remove_image {
            patch = patch.remove_image();
        }
        patch
    }
}

/// Delete command arguments.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Observation ID
    pub id: String,
}

/// Clear command arguments.
#[derive(Debug, Args)]
pub struct ClearCommand {
    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Identify command arguments.
#[derive(Debug, Args)]
pub struct IdentifyCommand {
    /// Path to the photo
    pub photo: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Check the identification API key
    Check,
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
