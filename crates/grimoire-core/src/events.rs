//! Progress and error messages emitted during a sync run
//!
//! Events are delivered over an unbounded channel so that the concurrent
//! per-collection pipelines can report without coordinating. Ordering is
//! only meaningful within one collection. Each event renders as the
//! human-readable line shown to the user.

use std::fmt;

use tokio::sync::mpsc;

use crate::models::EntityKind;

/// Sender half handed to sync operations
pub type EventSender = mpsc::UnboundedSender<SyncEvent>;

/// Receiver half read by the UI
pub type EventReceiver = mpsc::UnboundedReceiver<SyncEvent>;

/// Create a new event channel
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Events emitted while uploading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A chunk settled; `remaining` counts it and every chunk after it
    Progress { kind: EntityKind, remaining: usize },
    /// A chunk request failed; the upload carries on with the next chunk
    ChunkFailed {
        kind: EntityKind,
        chunk: usize,
        message: String,
    },
    /// A record was left out of the run before upload
    RecordSkipped {
        kind: EntityKind,
        name: String,
        reason: String,
        migration: bool,
    },
    /// A collection could not be listed; nothing of it was uploaded
    CollectionFailed { kind: EntityKind, message: String },
    /// All chunks of one collection have settled
    UploadFinished {
        kind: EntityKind,
        uploaded: usize,
        failed: usize,
    },
    /// Every collection has settled
    Complete,
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncEvent::Progress { kind, remaining } => {
                write!(f, "Syncing, {} {} remaining...", remaining, kind)
            }
            SyncEvent::ChunkFailed { message, .. } => f.write_str(message),
            SyncEvent::RecordSkipped {
                reason, migration, ..
            } => {
                if *migration {
                    write!(f, "Could not migrate: {}", reason)
                } else {
                    write!(f, "Skipped: {}", reason)
                }
            }
            SyncEvent::CollectionFailed { kind, message } => {
                write!(f, "Could not read local {}: {}", kind, message)
            }
            SyncEvent::UploadFinished {
                kind,
                uploaded,
                failed: 0,
            } => write!(f, "Synced {} {}.", uploaded, kind),
            SyncEvent::UploadFinished {
                kind,
                uploaded,
                failed,
            } => write!(f, "Synced {} {}, {} failed.", uploaded, kind, failed),
            SyncEvent::Complete => f.write_str("Account Sync complete."),
        }
    }
}

/// Send an event, ignoring a closed receiver
pub(crate) fn emit(events: &EventSender, event: SyncEvent) {
    let _ = events.send(event);
}
