//! Filtering and ordering observation lists.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::observation::{Observation, ObservationIcon};

/// Order of a listed collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Most recent observation date first.
    #[default]
    DateDesc,
    /// Oldest observation date first.
    DateAsc,
    /// Name, A to Z.
    NameAsc,
    /// Name, Z to A.
    NameDesc,
}

impl SortOrder {
    /// All orders, in menu order.
    pub const ALL: [SortOrder; 4] = [
        SortOrder::DateDesc,
        SortOrder::DateAsc,
        SortOrder::NameAsc,
        SortOrder::NameDesc,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::DateDesc => "date-desc",
            Self::DateAsc => "date-asc",
            Self::NameAsc => "name-asc",
            Self::NameDesc => "name-desc",
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|order| order.as_str() == wanted)
            .ok_or_else(|| {
                Error::invalid(format!(
                    "unknown sort order '{s}' (expected date-desc, date-asc, name-asc or name-desc)"
                ))
            })
    }
}

/// Criteria for listing observations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationQuery {
    /// Keep only this category.
    pub icon: Option<ObservationIcon>,
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
    /// Result order.
    pub sort: SortOrder,
}

impl ObservationQuery {
    /// Whether `observation` passes the icon and search filters.
    #[must_use]
    pub fn matches(&self, observation: &Observation) -> bool {
        if self.icon.is_some_and(|icon| icon != observation.icon) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => observation
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }

    /// Filter and sort `observations`. Sorting is stable, so ties keep their
    /// stored order.
    #[must_use]
    pub fn apply(&self, observations: Vec<Observation>) -> Vec<Observation> {
        let mut selected: Vec<Observation> = observations
            .into_iter()
            .filter(|o| self.matches(o))
            .collect();

        match self.sort {
            // `YYYY-MM-DD` orders lexicographically.
            SortOrder::DateDesc => selected.sort_by(|a, b| b.date.cmp(&a.date)),
            SortOrder::DateAsc => selected.sort_by(|a, b| a.date.cmp(&b.date)),
            SortOrder::NameAsc => selected.sort_by_cached_key(|o| o.name.to_lowercase()),
            SortOrder::NameDesc => {
                selected.sort_by(|a, b| b.name.to_lowercase().cmp(&a.name.to_lowercase()));
            }
        }
        selected
    }
}
