//! Whole-collection persistence of events under a single storage key.
//!
//! The collection is serialized as one JSON array and every save overwrites
//! it entirely.
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::{CountdownError, Event, KeyValueStore, Result};

/// Storage key used when none is configured
pub const DEFAULT_STORAGE_KEY: &str = "@events";

/// What `load` does when the stored blob cannot be read or decoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadFailurePolicy {
    /// Log the failure and behave as if nothing was stored
    #[default]
    FallbackEmpty,
    /// Return a `StorageRead` error to the caller
    Surface,
}

pub struct EventPersistence<S> {
    backend: Arc<S>,
    key: String,
    read_policy: ReadFailurePolicy,
}

impl<S: KeyValueStore> EventPersistence<S> {
    pub fn new(backend: Arc<S>, key: impl Into<String>, read_policy: ReadFailurePolicy) -> Self {
        Self {
            backend,
            key: key.into(),
            read_policy,
        }
    }

    /// Reads the full collection.
    ///
    /// A missing key is an empty collection. Read or decode failures follow
    /// the configured [`ReadFailurePolicy`].
    pub async fn load(&self) -> Result<Vec<Event>> {
        match self.try_load().await {
            Ok(events) => Ok(events),
            Err(e) => match self.read_policy {
                ReadFailurePolicy::FallbackEmpty => {
                    error!("Error loading events from {}: {}", self.key, e);
                    warn!("Continuing with an empty event collection");
                    Ok(Vec::new())
                }
                ReadFailurePolicy::Surface => {
                    error!("Error loading events from {}: {}", self.key, e);
                    Err(CountdownError::StorageRead {
                        message: e.to_string(),
                    })
                }
            },
        }
    }

    async fn try_load(&self) -> Result<Vec<Event>> {
        let Some(raw) = self.backend.get_item(&self.key).await? else {
            debug!("Nothing stored under {}", self.key);
            return Ok(Vec::new());
        };

        let events: Vec<Event> = serde_json::from_str(&raw)?;
        debug!("Loaded {} events from {}", events.len(), self.key);
        Ok(events)
    }

    /// Serializes and overwrites the full collection.
    pub async fn save(&self, events: &[Event]) -> Result<()> {
        let json = serde_json::to_string(events).map_err(|e| {
            error!("Failed to serialize events: {}", e);
            CountdownError::StorageWrite {
                message: e.to_string(),
            }
        })?;

        self.backend
            .set_item(&self.key, json)
            .await
            .map_err(|e| {
                error!("Error saving events to {}: {}", self.key, e);
                CountdownError::StorageWrite {
                    message: e.to_string(),
                }
            })?;

        info!("Saved {} events to {}", events.len(), self.key);
        Ok(())
    }
}
