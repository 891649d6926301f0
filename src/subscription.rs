//! Change notification handles.
//!
//! Store changes fan out over a `tokio::sync::broadcast` channel so every
//! subscriber sees every committed change; view state is published over a
//! `tokio::sync::watch` channel where only the latest value matters. Both
//! handles unsubscribe when dropped, and `unsubscribe` may be called any
//! number of times.
use log::{debug, warn};
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::sync::watch;

use crate::{StoreChange, ViewState};

/// Capacity of the store change channel before slow subscribers lag
pub const DEFAULT_CHANGE_CAPACITY: usize = 64;

/// Receives every change the store commits after subscribing.
#[derive(Debug)]
pub struct Subscription {
    receiver: Option<broadcast::Receiver<StoreChange>>,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<StoreChange>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    /// Waits for the next change.
    ///
    /// Returns `None` once unsubscribed or when the store is gone. Changes a
    /// lagging subscriber missed are skipped.
    pub async fn recv(&mut self) -> Option<StoreChange> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(change) => return Some(change),
                Err(RecvError::Lagged(missed)) => {
                    warn!("Subscriber lagged, skipped {} store changes", missed);
                }
                Err(RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Returns a pending change without waiting.
    pub fn try_recv(&mut self) -> Option<StoreChange> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.try_recv() {
                Ok(change) => return Some(change),
                Err(TryRecvError::Lagged(missed)) => {
                    warn!("Subscriber lagged, skipped {} store changes", missed);
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    pub fn unsubscribe(&mut self) {
        if self.receiver.take().is_some() {
            debug!("Store subscription closed");
        }
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }
}

/// Observes the service's view state.
#[derive(Debug)]
pub struct StateSubscription {
    receiver: Option<watch::Receiver<ViewState>>,
}

impl StateSubscription {
    pub(crate) fn new(receiver: watch::Receiver<ViewState>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    /// Waits until the state changes and returns the new snapshot.
    pub async fn changed(&mut self) -> Option<ViewState> {
        let receiver = self.receiver.as_mut()?;
        if receiver.changed().await.is_err() {
            self.receiver = None;
            return None;
        }
        Some(receiver.borrow_and_update().clone())
    }

    /// Latest state, or `None` after unsubscribing.
    pub fn current(&self) -> Option<ViewState> {
        self.receiver.as_ref().map(|r| r.borrow().clone())
    }

    pub fn unsubscribe(&mut self) {
        if self.receiver.take().is_some() {
            debug!("View state subscription closed");
        }
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }
}
