//! Batch upload
//!
//! Records go up in fixed-size chunks, one request at a time. A chunk is
//! only submitted once the previous one has settled, so each collection
//! has at most one upload in flight and the reported remaining count only
//! ever decreases. A failed chunk is reported and skipped; the rest of the
//! chunks are still sent.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::{collection_path, AccountClient};
use crate::error::TransportError;
use crate::events::{emit, EventSender, SyncEvent};
use crate::models::EntityKind;
use crate::transport::Transport;

/// Result of uploading one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOutcome {
    pub kind: EntityKind,
    /// Records handed to the uploader
    pub total: usize,
    /// Requests issued
    pub chunks: usize,
    /// Requests that failed
    pub failed_chunks: usize,
    /// Records in chunks that were accepted
    pub uploaded: usize,
}

impl UploadOutcome {
    pub fn empty(kind: EntityKind) -> Self {
        Self {
            kind,
            total: 0,
            chunks: 0,
            failed_chunks: 0,
            uploaded: 0,
        }
    }

    /// Records in chunks that failed
    pub fn failed(&self) -> usize {
        self.total - self.uploaded
    }

    pub fn is_complete(&self) -> bool {
        self.failed_chunks == 0
    }
}

impl<T: Transport> AccountClient<T> {
    /// Upload `items` to their collection in chunks of `batch_size`
    ///
    /// Emits `SyncEvent::ChunkFailed` for every failed chunk and
    /// `SyncEvent::Progress` after every chunk settles, then
    /// `SyncEvent::UploadFinished`. Nothing is sent or emitted for an empty
    /// set, or when storage is disabled.
    pub async fn upload_all<E: Serialize>(
        &self,
        items: &[E],
        kind: EntityKind,
        events: &EventSender,
    ) -> UploadOutcome {
        let mut outcome = UploadOutcome::empty(kind);
        if !self.storage_enabled || items.is_empty() {
            return outcome;
        }

        let path = collection_path(kind.collection());
        outcome.total = items.len();
        let mut remaining = items.len();

        for (index, chunk) in items.chunks(self.batch_size).enumerate() {
            debug!(
                "Uploading {} chunk {} ({} records)",
                kind,
                index,
                chunk.len()
            );
            outcome.chunks += 1;

            let result = match serde_json::to_value(chunk) {
                Ok(body) => self.transport.post_json(&path, &body).await,
                Err(e) => Err(TransportError::from(e)),
            };

            match result {
                Ok(()) => outcome.uploaded += chunk.len(),
                Err(e) => {
                    if e.is_transient() {
                        warn!("Upload of {} chunk {} failed: {}", kind, index, e);
                    } else {
                        error!("Upload of {} chunk {} rejected: {}", kind, index, e);
                    }
                    outcome.failed_chunks += 1;
                    emit(
                        events,
                        SyncEvent::ChunkFailed {
                            kind,
                            chunk: index,
                            message: e.to_string(),
                        },
                    );
                }
            }

            emit(events, SyncEvent::Progress { kind, remaining });
            remaining -= chunk.len();
        }

        info!(
            "Uploaded {} of {} {} in {} requests",
            outcome.uploaded, outcome.total, kind, outcome.chunks
        );
        emit(
            events,
            SyncEvent::UploadFinished {
                kind,
                uploaded: outcome.uploaded,
                failed: outcome.failed(),
            },
        );
        outcome
    }
}
