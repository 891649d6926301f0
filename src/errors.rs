//! Error types for the countdowns application.
//!
//! This module defines the error taxonomy used by the storage backends, the
//! event store and the service layer.

use std::io;

use thiserror::Error;

/// The main error type for the countdowns application.
#[derive(Error, Debug)]
pub enum CountdownError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stored event collection could not be read or decoded.
    #[error("Failed to read stored events: {message}")]
    StorageRead { message: String },

    /// The storage backend rejected a write.
    #[error("Failed to write to storage: {message}")]
    StorageWrite { message: String },

    /// A mutation was computed but the collection could not be saved.
    #[error("Changes were not persisted: {source}")]
    NotPersisted {
        #[source]
        source: Box<CountdownError>,
    },

    /// Event was not found when performing an operation.
    #[error("Event not found: {id}")]
    EventNotFound { id: String },

    /// A required field is missing or malformed.
    #[error("{message}")]
    Validation { message: String },

    /// A date string could not be understood.
    #[error("Invalid date: {input}")]
    InvalidDate { input: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Generic application error with a custom message.
    #[error("{message}")]
    ApplicationError { message: String },

    /// for mutex lock acquisition issues
    #[error("{message}")]
    LockAcquisitionFailed { message: String },
}

impl CountdownError {
    /// Wraps a failed save so callers can tell the mutation did not land.
    pub fn not_persisted(source: CountdownError) -> Self {
        CountdownError::NotPersisted {
            source: Box::new(source),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CountdownError::Validation {
            message: message.into(),
        }
    }
}
