//! The persisted event entity.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CountdownError, EventDraft, EventPatch, Result};

/// Color applied by the CLI when none is given
pub const DEFAULT_COLOR: &str = "#4F46E5";

/// Icon applied by the CLI when none is given
pub const DEFAULT_ICON: &str = "calendar";

/// Represents a single countdown target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique identifier, never changes after creation
    pub id: String,
    /// Display name
    pub name: String,
    /// The instant being counted down to
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// When the event was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Builds a new event from a draft, stamping both timestamps with `now`.
    pub fn new(draft: EventDraft, now: DateTime<Utc>) -> Result<Self> {
        validate_name(&draft.name)?;

        Ok(Event {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            date: draft.date,
            description: draft.description.as_deref().and_then(non_empty),
            category: draft.category.as_deref().and_then(non_empty),
            color: draft.color.as_deref().and_then(non_empty),
            icon: draft.icon.as_deref().and_then(non_empty),
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns a copy with every field present in `patch` applied.
    ///
    /// `updated_at` never moves backwards, even if `now` does.
    pub fn merged(&self, patch: &EventPatch, now: DateTime<Utc>) -> Result<Self> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }

        let mut updated = self.clone();
        if let Some(name) = &patch.name {
            updated.name = name.clone();
        }
        if let Some(date) = patch.date {
            updated.date = date;
        }
        if let Some(description) = &patch.description {
            updated.description = non_empty(description);
        }
        if let Some(category) = &patch.category {
            updated.category = non_empty(category);
        }
        if let Some(color) = &patch.color {
            updated.color = non_empty(color);
        }
        if let Some(icon) = &patch.icon {
            updated.icon = non_empty(icon);
        }
        updated.updated_at = now.max(self.updated_at);

        Ok(updated)
    }
}

// Empty optional text is stored as absent; in a patch it clears the field.
fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CountdownError::validation("Event name is required"));
    }
    Ok(())
}
