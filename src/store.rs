use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::{
    Clock, CountdownError, Event, EventDraft, EventPatch, EventPersistence, KeyValueStore, Result,
    StoreChange, Subscription, SystemClock, DEFAULT_CHANGE_CAPACITY,
};

/// Owns the event collection and mediates every change to it.
///
/// The persisted collection is the source of truth: every read goes back to
/// storage, and every mutation is a read-modify-write of the whole
/// collection performed while holding `write_lock`, so concurrent mutations
/// cannot lose each other's writes.
pub struct EventStore<S> {
    persistence: EventPersistence<S>,

    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,

    clock: Arc<dyn Clock>,

    /// Committed changes, fanned out to subscribers
    changes: broadcast::Sender<StoreChange>,
}

impl<S: KeyValueStore> EventStore<S> {
    pub fn new(persistence: EventPersistence<S>) -> Self {
        let (changes, _) = broadcast::channel(DEFAULT_CHANGE_CAPACITY);

        Self {
            persistence,
            write_lock: Mutex::new(()),
            clock: Arc::new(SystemClock),
            changes,
        }
    }

    /// Replaces the clock used for `createdAt`/`updatedAt` stamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the stored collection in insertion order.
    pub async fn get_all(&self) -> Result<Vec<Event>> {
        self.persistence.load().await
    }

    /// Looks an event up by id; a missing id is `Ok(None)`.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Event>> {
        let events = self.persistence.load().await?;
        Ok(events.into_iter().find(|event| event.id == id))
    }

    /// Creates and persists a new event.
    ///
    /// Validation happens before any storage access. If the save fails the
    /// error is `NotPersisted` and subscribers are not notified.
    pub async fn create(&self, draft: EventDraft) -> Result<Event> {
        let mut event = Event::new(draft, self.clock.now())?;

        let _guard = self.write_lock.lock().await;
        let mut events = self.persistence.load().await?;

        while events.iter().any(|existing| existing.id == event.id) {
            debug!("Generated id {} already in use, regenerating", event.id);
            event.id = Uuid::new_v4().to_string();
        }

        events.push(event.clone());
        self.persist(&events).await?;

        info!("Created event {} ({})", event.id, event.name);
        self.notify(StoreChange::Created(event.clone()));
        Ok(event)
    }

    /// Merges `patch` over the stored event and persists the result.
    pub async fn update(&self, id: &str, patch: EventPatch) -> Result<Event> {
        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(CountdownError::validation("Event name is required"));
        }

        let _guard = self.write_lock.lock().await;
        let mut events = self.persistence.load().await?;

        let Some(index) = events.iter().position(|event| event.id == id) else {
            error!("Cannot update event {}: Event not found", id);
            return Err(CountdownError::EventNotFound { id: id.to_string() });
        };

        let updated = events[index].merged(&patch, self.clock.now())?;
        events[index] = updated.clone();
        self.persist(&events).await?;

        info!("Updated event {}", id);
        self.notify(StoreChange::Updated(updated.clone()));
        Ok(updated)
    }

    /// Removes the event with `id`. Deleting an unknown id is a no-op and
    /// does not touch storage.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut events = self.persistence.load().await?;

        let before = events.len();
        events.retain(|event| event.id != id);
        if events.len() == before {
            debug!("Event {} not present, nothing to delete", id);
            return Ok(());
        }

        self.persist(&events).await?;

        info!("Event {} successfully deleted", id);
        self.notify(StoreChange::Deleted { id: id.to_string() });
        Ok(())
    }

    /// Subscribes to changes committed from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription::new(self.changes.subscribe())
    }

    async fn persist(&self, events: &[Event]) -> Result<()> {
        self.persistence
            .save(events)
            .await
            .map_err(CountdownError::not_persisted)
    }

    fn notify(&self, change: StoreChange) {
        // Sending only fails when nobody is subscribed.
        let _ = self.changes.send(change);
    }
}
