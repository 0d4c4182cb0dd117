//! Read-modify-write operations over the persisted observation collection.
//!
//! The whole collection lives in one JSON array under a single key. Every
//! mutation loads the array, changes it in memory and writes it back whole.
//! The repository is not safe for concurrent writers on its own; wrap it in
//! an [`ObservationStore`](super::ObservationStore) to serialize mutations.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::observation::{Observation, ObservationIcon, ObservationPatch};

use super::kv::KeyValueStore;
use super::StoreStats;

/// Key the mobile app used for the collection.
pub const DEFAULT_COLLECTION_KEY: &str = "wildwatch_observations";

/// CRUD over the observation collection stored in a [`KeyValueStore`].
#[derive(Debug)]
pub struct ObservationRepository<K> {
    kv: K,
    key: String,
}

impl<K: KeyValueStore> ObservationRepository<K> {
    /// Create a repository storing its collection under `key`.
    pub fn new(kv: K, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    /// Create a repository using [`DEFAULT_COLLECTION_KEY`].
    pub fn with_default_key(kv: K) -> Self {
        Self::new(kv, DEFAULT_COLLECTION_KEY)
    }

    /// The key holding the collection.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying key-value store.
    #[must_use]
    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Get every observation in insertion order.
    ///
    /// Absent, unreadable or undecodable data all read as an empty
    /// collection; the failure is logged, never returned.
    #[must_use]
    pub fn get_observations(&self) -> Vec<Observation> {
        match self.load() {
            Ok(observations) => observations,
            Err(e) => {
                warn!("Treating observation collection as empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Get a single observation by id.
    #[must_use]
    pub fn get_observation(&self, id: &str) -> Option<Observation> {
        self.get_observations().into_iter().find(|o| o.id == id)
    }

    /// Append an observation and persist the collection.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidObservation`] if the record violates an invariant.
    /// - [`Error::DuplicateObservation`] if the id is already stored.
    /// - [`Error::StorageRead`] if the stored collection cannot be decoded;
    ///   the unreadable data is left untouched.
    /// - [`Error::StorageWrite`] if the collection cannot be written.
    pub fn save_observation(&mut self, observation: Observation) -> Result<()> {
        observation.validate()?;

        let mut observations = self.load()?;
        if observations.iter().any(|o| o.id == observation.id) {
            return Err(Error::DuplicateObservation { id: observation.id });
        }

        let id = observation.id.clone();
        observations.push(observation);
        self.persist(&observations)?;

        info!("Saved observation {} ({} total)", id, observations.len());
        Ok(())
    }

    /// Merge `patch` into the observation with the given id and persist.
    ///
    /// Returns the updated record.
    ///
    /// # Errors
    ///
    /// - [`Error::ObservationNotFound`] if no record has this id; nothing is
    ///   written.
    /// - [`Error::InvalidObservation`] if a field set by the patch is invalid.
    ///   Fields the patch does not set are kept as stored.
    /// - [`Error::StorageRead`] / [`Error::StorageWrite`] as for
    ///   [`ObservationRepository::save_observation`].
    pub fn update_observation(&mut self, id: &str, patch: &ObservationPatch) -> Result<Observation> {
        self.update_observation_at(id, patch, Utc::now())
    }

    /// Like [`ObservationRepository::update_observation`] with an explicit
    /// modification instant.
    ///
    /// # Errors
    ///
    /// See [`ObservationRepository::update_observation`].
    pub fn update_observation_at(
        &mut self,
        id: &str,
        patch: &ObservationPatch,
        now: DateTime<Utc>,
    ) -> Result<Observation> {
        let mut observations = self.load()?;
        let target = observations
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| Error::not_found(id))?;

        patch.validate()?;
        let mut updated = target.clone();
        patch.apply_to(&mut updated);
        updated.touch(now);
        *target = updated.clone();

        self.persist(&observations)?;
        debug!("Updated observation {}", id);
        Ok(updated)
    }

    /// Remove the observation with the given id and persist.
    ///
    /// Returns the removed record. The remaining records keep their order.
    ///
    /// # Errors
    ///
    /// - [`Error::ObservationNotFound`] if no record has this id; nothing is
    ///   written.
    /// - [`Error::StorageRead`] / [`Error::StorageWrite`] as for
    ///   [`ObservationRepository::save_observation`].
    pub fn delete_observation(&mut self, id: &str) -> Result<Observation> {
        let mut observations = self.load()?;
        let index = observations
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| Error::not_found(id))?;

        let removed = observations.remove(index);
        self.persist(&observations)?;
        info!("Deleted observation {} ({} left)", id, observations.len());
        Ok(removed)
    }

    /// Remove the persisted collection entirely.
    ///
    /// This also works when the stored data is unreadable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageWrite`] if the removal fails.
    pub fn clear_all_observations(&mut self) -> Result<()> {
        self.kv.remove_item(&self.key)?;
        info!("Cleared all observations");
        Ok(())
    }

    /// Summarize the collection.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            db_size_bytes: self.kv.size_bytes(),
            ..StoreStats::from_observations(&self.get_observations())
        }
    }

    /// Load strictly: absence is an empty collection, anything else that goes
    /// wrong is an error.
    fn load(&self) -> Result<Vec<Observation>> {
        let Some(blob) = self.kv.get_item(&self.key)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&blob)
            .map_err(|e| Error::storage_read(format!("decoding {}: {e}", self.key)))
    }

    fn persist(&mut self, observations: &[Observation]) -> Result<()> {
        let blob = serde_json::to_string(observations)
            .map_err(|e| Error::storage_write(format!("encoding {}: {e}", self.key)))?;
        self.kv.set_item(&self.key, &blob)
    }
}

impl StoreStats {
    /// Compute statistics over a slice of observations.
    #[must_use]
    pub fn from_observations(observations: &[Observation]) -> Self {
        let by_icon = ObservationIcon::ALL
            .iter()
            .map(|icon| (*icon, observations.iter().filter(|o| o.icon == *icon).count()))
            .collect();

        Self {
            total_observations: observations.len(),
            with_image: observations.iter().filter(|o| o.has_image()).count(),
            by_icon,
            oldest_created: observations.iter().map(|o| o.created_at).min(),
            newest_created: observations.iter().map(|o| o.created_at).max(),
            db_size_bytes: 0,
        }
    }
}
