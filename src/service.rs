//! Use-case layer between presentation code and the event store.
//!
//! [`EventService`] wraps each store operation with the bookkeeping a screen
//! binds to: the current event list, a loading flag and the message of the
//! most recent failure. After a successful mutation the list is patched from
//! the store's return value instead of being reloaded.
//!
//! Operations run one at a time so a slow load can never overwrite the list
//! with a snapshot older than a mutation that finished meanwhile.
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use log::error;
use tokio::sync::{watch, Mutex, MutexGuard};

use crate::{
    calculate_countdown, matches_query, Agenda, Clock, Countdown, CountdownError, Event,
    EventDraft, EventPatch, EventStore, KeyValueStore, Result, StateSubscription, SystemClock,
};

/// Snapshot of what a presentation layer renders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub events: Vec<Event>,
    /// Some operation is running or waiting to run
    pub is_loading: bool,
    /// Message of the last failed operation; cleared when a new one starts
    pub last_error: Option<String>,
}

pub struct EventService<S> {
    store: Arc<EventStore<S>>,
    clock: Arc<dyn Clock>,
    state: watch::Sender<ViewState>,

    /// Serializes operations from start to state update
    op_lock: Mutex<()>,

    /// Operations started but not yet finished
    in_flight: AtomicUsize,
}

impl<S: KeyValueStore> EventService<S> {
    pub fn new(store: Arc<EventStore<S>>) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self {
            store,
            clock: Arc::new(SystemClock),
            state,
            op_lock: Mutex::new(()),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Replaces the clock used by [`EventService::countdown_now`].
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<EventStore<S>> {
        &self.store
    }

    /// Current view state.
    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error.clone()
    }

    /// Observes every view state change.
    pub fn subscribe(&self) -> StateSubscription {
        StateSubscription::new(self.state.subscribe())
    }

    /// Reloads the event list from storage.
    pub async fn load_events(&self) -> Result<Vec<Event>> {
        let _op = self.begin().await;
        let result = self.store.get_all().await;
        self.finish(&result, "Failed to load events", |state, events| {
            state.events = events.clone();
        });
        result
    }

    pub async fn get_event(&self, id: &str) -> Result<Option<Event>> {
        self.store.get_by_id(id).await
    }

    /// Trims the draft's text fields and creates the event.
    pub async fn create_event(&self, draft: EventDraft) -> Result<Event> {
        let _op = self.begin().await;
        let result = match normalize_draft(draft) {
            Ok(draft) => self.store.create(draft).await,
            Err(e) => Err(e),
        };
        self.finish(&result, "Failed to create event", |state, event| {
            state.events.push(event.clone());
        });
        result
    }

    pub async fn update_event(&self, id: &str, patch: EventPatch) -> Result<Event> {
        let _op = self.begin().await;
        let result = match normalize_patch(patch) {
            Ok(patch) => self.store.update(id, patch).await,
            Err(e) => Err(e),
        };
        self.finish(&result, "Failed to update event", |state, event| {
            if let Some(slot) = state.events.iter_mut().find(|e| e.id == event.id) {
                *slot = event.clone();
            }
        });
        result
    }

    pub async fn delete_event(&self, id: &str) -> Result<()> {
        let _op = self.begin().await;
        let result = self.store.delete(id).await;
        self.finish(&result, "Failed to delete event", |state, _| {
            state.events.retain(|event| event.id != id);
        });
        result
    }

    /// Countdown to `date` as of `now`.
    pub fn calculate_countdown(&self, date: DateTime<Utc>, now: DateTime<Utc>) -> Countdown {
        calculate_countdown(date, now)
    }

    /// Countdown to `date` as of the service clock.
    pub fn countdown_now(&self, date: DateTime<Utc>) -> Countdown {
        calculate_countdown(date, self.clock.now())
    }

    /// Loaded events matching `query`, earliest first.
    pub fn search(&self, query: &str) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .state
            .borrow()
            .events
            .iter()
            .filter(|event| matches_query(event, query))
            .cloned()
            .collect();
        events.sort_by_key(|event| event.date);
        events
    }

    /// Matches of `query` split into the next event and the rest.
    pub fn agenda(&self, query: &str) -> Agenda {
        let mut events = self.search(query).into_iter();
        Agenda {
            next: events.next(),
            others: events.collect(),
        }
    }

    async fn begin(&self) -> Operation<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|state| state.is_loading = true);
        let pending = Pending {
            state: &self.state,
            in_flight: &self.in_flight,
        };

        let guard = self.op_lock.lock().await;
        self.state.send_modify(|state| state.last_error = None);
        Operation {
            _guard: guard,
            _pending: pending,
        }
    }

    fn finish<T>(
        &self,
        result: &Result<T>,
        context: &str,
        apply: impl FnOnce(&mut ViewState, &T),
    ) {
        self.state.send_modify(|state| {
            match result {
                Ok(value) => apply(state, value),
                Err(e) => {
                    error!("{}: {}", context, e);
                    state.last_error = Some(format!("{}: {}", context, e));
                }
            }
        });
    }
}

/// Held for the duration of one service operation.
struct Operation<'a> {
    _guard: MutexGuard<'a, ()>,
    _pending: Pending<'a>,
}

/// Counts an operation as in flight until dropped, including when the
/// caller abandons it while it waits for its turn.
struct Pending<'a> {
    state: &'a watch::Sender<ViewState>,
    in_flight: &'a AtomicUsize,
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        let remaining = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        self.state.send_modify(|state| state.is_loading = remaining > 0);
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_draft(draft: EventDraft) -> Result<EventDraft> {
    let name = draft.name.trim().to_string();
    if name.is_empty() {
        return Err(CountdownError::validation("Event name is required"));
    }

    Ok(EventDraft {
        name,
        description: trimmed(draft.description),
        category: trimmed(draft.category),
        color: trimmed(draft.color),
        icon: trimmed(draft.icon),
        ..draft
    })
}

fn normalize_patch(patch: EventPatch) -> Result<EventPatch> {
    let name = match patch.name {
        Some(name) => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(CountdownError::validation("Event name is required"));
            }
            Some(name)
        }
        None => None,
    };

    Ok(EventPatch {
        name,
        description: patch.description.map(|v| v.trim().to_string()),
        category: patch.category.map(|v| v.trim().to_string()),
        ..patch
    })
}
