//! Error types
//!
//! Each failure class is contained where it happens: transport errors
//! fail one upload chunk, migration and library errors fail one record.
//! None of them abort a sync run.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from a single request to the account store
#[derive(Error, Debug)]
pub enum TransportError {
    /// Server answered with a non-success status
    #[error("{method} {path} failed with status {status}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
    },

    /// Request did not settle within the configured timeout
    #[error("{method} {path} timed out after {}s", timeout.as_secs())]
    Timeout {
        method: &'static str,
        path: String,
        timeout: Duration,
    },

    /// Connection or protocol failure
    #[error("{method} {path} failed: {message}")]
    Request {
        method: &'static str,
        path: String,
        message: String,
    },

    /// Response body was not the JSON we expected
    #[error("Invalid response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Request body could not be serialized
    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl TransportError {
    /// Server-side (5xx) and timeout failures may succeed when retried
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Status { status, .. } => *status >= 500,
            TransportError::Timeout { .. } | TransportError::Request { .. } => true,
            _ => false,
        }
    }
}

/// Errors upgrading a pre-versioning record to the current shape
#[derive(Error, Debug)]
pub enum MigrationError {
    /// Legacy encounter carries no creature list at all
    #[error("Encounter '{name}' cannot be migrated: it has no Creatures")]
    MissingCreatures { name: String },

    /// Active creature index does not point at a creature
    #[error("Encounter '{name}' cannot be migrated: active creature index {index} is out of range for {count} creatures")]
    ActiveIndexOutOfRange {
        name: String,
        index: i64,
        count: usize,
    },

    /// Record matches neither the legacy nor the current shape
    #[error("Record '{name}' does not match any known encounter shape: {details}")]
    Malformed { name: String, details: String },
}

/// Errors reading or writing the local library
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid JSON in '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No {collection} record named '{name}'")]
    NotFound { collection: String, name: String },
}

/// Why a single record was left out of a sync run
#[derive(Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("'{name}' is not a valid {collection} record: {source}")]
    Decode {
        collection: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{name}' is not a valid {collection} record: expected a JSON object")]
    NotAnObject { collection: String, name: String },

    /// The record's name sanitizes to nothing, and the store needs a path segment
    #[error("'{name}' has no usable id")]
    EmptyId { name: String },
}

impl RecordError {
    /// Whether the record failed schema migration, as opposed to loading
    pub fn is_migration(&self) -> bool {
        matches!(self, RecordError::Migration(_))
    }
}

/// Result type for account store requests
pub type TransportResult<T> = Result<T, TransportError>;
