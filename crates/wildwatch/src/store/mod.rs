//! Storage layer for wildwatch.
//!
//! Observations are persisted as one JSON array inside a `SQLite`-backed
//! key-value table ([`kv`]), manipulated by read-modify-write operations
//! ([`repository`]). [`ObservationStore`] owns the repository on a dedicated
//! worker thread and processes commands one at a time, so concurrent callers
//! can never interleave their load and write steps.

pub mod kv;
pub mod repository;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::observation::{Observation, ObservationIcon, ObservationPatch};

pub use kv::{KeyValueStore, SqliteKv};
pub use repository::{ObservationRepository, DEFAULT_COLLECTION_KEY};

/// Pending commands the worker buffers before senders wait.
const COMMAND_BUFFER: usize = 64;

/// Statistics about the stored collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Total number of observations stored.
    pub total_observations: usize,
    /// Number of observations with a photo attached.
    pub with_image: usize,
    /// Count per icon, in [`ObservationIcon::ALL`] order.
    pub by_icon: Vec<(ObservationIcon, usize)>,
    /// Creation time of the oldest observation.
    pub oldest_created: Option<DateTime<Utc>>,
    /// Creation time of the newest observation.
    pub newest_created: Option<DateTime<Utc>>,
    /// Size of the database file; 0 for in-memory stores.
    pub db_size_bytes: u64,
}

impl StoreStats {
    /// Number of observations tagged with `icon`.
    #[must_use]
    pub fn count_for(&self, icon: ObservationIcon) -> usize {
        self.by_icon
            .iter()
            .find(|(i, _)| *i == icon)
            .map_or(0, |(_, count)| *count)
    }
}

enum Command {
    Save {
        observation: Box<Observation>,
        reply: oneshot::Sender<Result<()>>,
    },
    List {
        reply: oneshot::Sender<Vec<Observation>>,
    },
    Get {
        id: String,
        reply: oneshot::Sender<Option<Observation>>,
    },
    Update {
        id: String,
        patch: ObservationPatch,
        reply: oneshot::Sender<Result<Observation>>,
    },
    Delete {
        id: String,
        reply: oneshot::Sender<Result<Observation>>,
    },
    Clear {
        reply: oneshot::Sender<Result<()>>,
    },
    Stats {
        reply: oneshot::Sender<StoreStats>,
    },
}

/// Cloneable async handle to the observation collection.
///
/// Every clone talks to the same worker, which applies commands strictly in
/// arrival order. The worker stops once the last handle is dropped.
///
/// Dropping a pending request future does not cancel it: a write the worker
/// has already received still completes.
#[derive(Debug, Clone)]
pub struct ObservationStore {
    tx: mpsc::Sender<Command>,
    path: PathBuf,
}

impl ObservationStore {
    /// Open the database at `path` and start the worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the worker thread
    /// cannot be spawned.
    pub fn open(path: impl AsRef<Path>, key: impl Into<String>) -> Result<Self> {
        let kv = SqliteKv::open(path.as_ref())?;
        let path = kv.path().to_path_buf();
        Self::spawn(ObservationRepository::new(kv, key), path)
    }

    /// Start a store over a fresh in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database or worker cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let kv = SqliteKv::open_in_memory()?;
        Self::spawn(
            ObservationRepository::with_default_key(kv),
            PathBuf::from(":memory:"),
        )
    }

    /// Start a worker thread that owns `repository`.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned.
    pub fn spawn<K>(repository: ObservationRepository<K>, path: PathBuf) -> Result<Self>
    where
        K: KeyValueStore + 'static,
    {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        std::thread::Builder::new()
            .name("wildwatch-store".to_string())
            .spawn(move || run_worker(repository, rx))?;
        debug!("Observation store worker started for {}", path.display());
        Ok(Self { tx, path })
    }

    /// Path of the backing database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an observation.
    ///
    /// # Errors
    ///
    /// See [`ObservationRepository::save_observation`]; additionally
    /// [`Error::StoreClosed`] if the worker is gone.
    pub async fn save_observation(&self, observation: Observation) -> Result<()> {
        self.request(|reply| Command::Save {
            observation: Box::new(observation),
            reply,
        })
        .await?
    }

    /// Get every observation in insertion order.
    ///
    /// Storage problems read as an empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreClosed`] if the worker is gone.
    pub async fn get_observations(&self) -> Result<Vec<Observation>> {
        self.request(|reply| Command::List { reply }).await
    }

    /// Get one observation by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreClosed`] if the worker is gone.
    pub async fn get_observation(&self, id: impl Into<String>) -> Result<Option<Observation>> {
        let id = id.into();
        self.request(|reply| Command::Get { id, reply }).await
    }

    /// Merge `patch` into the observation with the given id.
    ///
    /// # Errors
    ///
    /// See [`ObservationRepository::update_observation`]; additionally
    /// [`Error::StoreClosed`] if the worker is gone.
    pub async fn update_observation(
        &self,
        id: impl Into<String>,
        patch: ObservationPatch,
    ) -> Result<Observation> {
        let id = id.into();
        self.request(|reply| Command::Update { id, patch, reply })
            .await?
    }

    /// Remove the observation with the given id.
    ///
    /// # Errors
    ///
    /// See [`ObservationRepository::delete_observation`]; additionally
    /// [`Error::StoreClosed`] if the worker is gone.
    pub async fn delete_observation(&self, id: impl Into<String>) -> Result<Observation> {
        let id = id.into();
        self.request(|reply| Command::Delete { id, reply }).await?
    }

    /// Remove the whole collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageWrite`] if the removal fails or
    /// [`Error::StoreClosed`] if the worker is gone.
    pub async fn clear_all_observations(&self) -> Result<()> {
        self.request(|reply| Command::Clear { reply }).await?
    }

    /// Summarize the collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreClosed`] if the worker is gone.
    pub async fn stats(&self) -> Result<StoreStats> {
        self.request(|reply| Command::Stats { reply }).await
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| Error::StoreClosed)?;
        response.await.map_err(|_| Error::StoreClosed)
    }
}

fn run_worker<K: KeyValueStore>(
    mut repository: ObservationRepository<K>,
    mut rx: mpsc::Receiver<Command>,
) {
    while let Some(command) = rx.blocking_recv() {
        let delivered = match command {
            Command::Save { observation, reply } => reply
                .send(repository.save_observation(*observation))
                .is_ok(),
            Command::List { reply } => reply.send(repository.get_observations()).is_ok(),
            Command::Get { id, reply } => reply.send(repository.get_observation(&id)).is_ok(),
            Command::Update { id, patch, reply } => reply
                .send(repository.update_observation(&id, &patch))
                .is_ok(),
            Command::Delete { id, reply } => {
                reply.send(repository.delete_observation(&id)).is_ok()
            }
            Command::Clear { reply } => reply.send(repository.clear_all_observations()).is_ok(),
            Command::Stats { reply } => reply.send(repository.stats()).is_ok(),
        };
        if !delivered {
            warn!("Store caller went away before receiving its reply");
        }
    }
    debug!("Observation store worker stopped");
}
