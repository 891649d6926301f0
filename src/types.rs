//! Core data structures for the countdowns application.
//!
//! This module contains the input shapes accepted by the store and the
//! command definitions of the CLI.
use chrono::{DateTime, Utc};
use clap::Subcommand;

use crate::{CountdownError, Event};

/// A specialized Result type for countdowns operations.
pub type Result<T> = std::result::Result<T, CountdownError>;

/// Fields supplied when creating an event; identity and timestamps are
/// assigned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub name: String,
    pub date: DateTime<Utc>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl EventDraft {
    pub fn new(name: impl Into<String>, date: DateTime<Utc>) -> Self {
        EventDraft {
            name: name.into(),
            date,
            description: None,
            category: None,
            color: None,
            icon: None,
        }
    }
}

/// Partial update; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self == &EventPatch::default()
    }
}

/// A change that reached storage, delivered to store subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Created(Event),
    Updated(Event),
    Deleted { id: String },
}

/// Events matching a query, split the way the home screen shows them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Agenda {
    /// The earliest matching event
    pub next: Option<Event>,
    /// The remaining matches, by date
    pub others: Vec<Event>,
}

/// Available subcommands for the countdowns application
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new event
    Add {
        /// Name of the event
        #[clap(short, long)]
        name: String,

        /// Target date (RFC 3339, YYYY-MM-DD [HH:MM] or dd/MM/yyyy [HH:mm])
        #[clap(short, long)]
        date: String,

        /// Free text description
        #[clap(short = 'D', long)]
        description: Option<String>,

        /// Category tag
        #[clap(short, long)]
        category: Option<String>,

        /// Card color
        #[clap(long)]
        color: Option<String>,

        /// Card icon
        #[clap(long)]
        icon: Option<String>,
    },

    /// List events with their countdowns
    List {
        /// Only show events whose name, description or category match
        #[clap(short, long)]
        search: Option<String>,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Show a single event by ID
    Show {
        /// ID of the event to show
        id: String,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Edit an existing event
    Edit {
        /// ID of the event to edit
        id: String,

        /// New name
        #[clap(short, long)]
        name: Option<String>,

        /// New target date
        #[clap(short, long)]
        date: Option<String>,

        /// New description
        #[clap(short = 'D', long)]
        description: Option<String>,

        /// New category
        #[clap(short, long)]
        category: Option<String>,

        /// New color
        #[clap(long)]
        color: Option<String>,

        /// New icon
        #[clap(long)]
        icon: Option<String>,
    },

    /// Delete an event by ID
    Delete {
        /// ID of the event to delete
        id: String,
    },

    /// Follow an event's countdown live
    Watch {
        /// ID of the event to follow
        id: String,

        /// Stop after this many refreshes
        #[clap(short, long)]
        ticks: Option<u64>,
    },

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,

        /// Reset configuration to defaults
        #[clap(short, long)]
        reset: bool,
    },
}
