//! Full-library sync
//!
//! Stat blocks, persistent characters, spells and encounters each get
//! their own pipeline (reconcile, then batch upload). The pipelines run
//! concurrently and are joined once; a failing collection never holds up
//! the others or the final completion message.

use tracing::info;

use super::{AccountClient, UploadOutcome};
use crate::events::{emit, EventSender, SyncEvent};
use crate::identity::RandomIds;
use crate::library::Library;
use crate::models::EntityKind;
use crate::reconcile::prepare_for_sync;
use crate::transport::Transport;

/// Result of one collection's pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    pub kind: EntityKind,
    /// Records left out before upload
    pub skipped: usize,
    pub upload: UploadOutcome,
    /// Set when the collection could not be listed at all
    pub error: Option<String>,
}

impl CollectionReport {
    fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            skipped: 0,
            upload: UploadOutcome::empty(kind),
            error: None,
        }
    }

    /// Listed, and every chunk accepted
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.upload.is_complete()
    }
}

/// Result of a full sync
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub collections: Vec<CollectionReport>,
}

impl SyncReport {
    pub fn uploaded(&self) -> usize {
        self.collections.iter().map(|c| c.upload.uploaded).sum()
    }

    pub fn failed(&self) -> usize {
        self.collections.iter().map(|c| c.upload.failed()).sum()
    }

    pub fn skipped(&self) -> usize {
        self.collections.iter().map(|c| c.skipped).sum()
    }

    pub fn collection(&self, kind: EntityKind) -> Option<&CollectionReport> {
        self.collections.iter().find(|c| c.kind == kind)
    }
}

impl<T: Transport> AccountClient<T> {
    /// Upload every local record the account lacks
    ///
    /// Emits `SyncEvent::Complete` once every pipeline has settled. With
    /// storage disabled nothing is read, sent or emitted.
    pub async fn sync_all<L: Library>(&self, library: &L, events: &EventSender) -> SyncReport {
        if !self.storage_enabled {
            return SyncReport::default();
        }

        let (stat_blocks, persistent_characters, spells, encounters) = tokio::join!(
            self.sync_collection(library, EntityKind::StatBlocks, events),
            self.sync_collection(library, EntityKind::PersistentCharacters, events),
            self.sync_collection(library, EntityKind::Spells, events),
            self.sync_collection(library, EntityKind::Encounters, events),
        );

        let report = SyncReport {
            collections: vec![stat_blocks, persistent_characters, spells, encounters],
        };
        info!(
            "Account sync complete: {} uploaded, {} failed, {} skipped",
            report.uploaded(),
            report.failed(),
            report.skipped()
        );
        emit(events, SyncEvent::Complete);
        report
    }

    async fn sync_collection<L: Library>(
        &self,
        library: &L,
        kind: EntityKind,
        events: &EventSender,
    ) -> CollectionReport {
        let mut report = CollectionReport::new(kind);

        let prepared = match prepare_for_sync(library, kind, &mut RandomIds).await {
            Ok(prepared) => prepared,
            Err(e) => {
                emit(
                    events,
                    SyncEvent::CollectionFailed {
                        kind,
                        message: e.to_string(),
                    },
                );
                report.error = Some(e.to_string());
                return report;
            }
        };

        for skipped in &prepared.skipped {
            emit(
                events,
                SyncEvent::RecordSkipped {
                    kind,
                    name: skipped.name.clone(),
                    reason: skipped.error.to_string(),
                    migration: skipped.error.is_migration(),
                },
            );
        }
        report.skipped = prepared.skipped.len();

        report.upload = self.upload_all(&prepared.items, kind, events).await;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LibraryError;
    use crate::events::{self, EventReceiver};
    use crate::models::Listing;
    use crate::testing::{MemoryLibrary, RecordingTransport};
    use serde_json::{json, Value};

    fn drain(rx: &mut EventReceiver) -> Vec<SyncEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn remaining_for(events: &[SyncEvent], kind: EntityKind) -> Vec<usize> {
        events
            .iter()
            .filter_map(|e| match e {
                SyncEvent::Progress { kind: k, remaining } if *k == kind => Some(*remaining),
                _ => None,
            })
            .collect()
    }

    fn full_library() -> MemoryLibrary {
        MemoryLibrary::new()
            .many(EntityKind::StatBlocks, "Goblin", 23)
            .account(EntityKind::StatBlocks, "Goblin 0")
            .many(EntityKind::Spells, "Cantrip", 12)
            .local(
                EntityKind::PersistentCharacters,
                "Aria",
                json!({
                    "Name": "Aria",
                    "StatBlock": { "Name": "Aria", "HP": { "Value": 30 } },
                    "CurrentHP": 22
                }),
            )
            .local(
                EntityKind::Encounters,
                "V01_Encounter",
                json!({
                    "Name": "V0.1 Encounter",
                    "ActiveCreatureIndex": 0,
                    "Creatures": [{ "Statblock": { "Name": "Rat" }, "CurrentHP": 1 }]
                }),
            )
            .local(
                EntityKind::Encounters,
                "Broken",
                json!({ "Name": "Broken" }),
            )
            .many(EntityKind::PlayerCharacters, "Hero", 3)
    }

    #[tokio::test]
    async fn test_sync_all_uploads_every_collection() {
        let client = AccountClient::with_options(RecordingTransport::new(), true, 10);
        let (tx, mut rx) = events::channel();

        let report = client.sync_all(&full_library(), &tx).await;
        let transport = client.transport();

        let stat_block_sizes: Vec<_> = transport
            .posted("/my/statblocks/")
            .iter()
            .map(|b| b.as_array().map_or(0, Vec::len))
            .collect();
        assert_eq!(stat_block_sizes, vec![10, 10, 2]);
        assert_eq!(transport.posted("/my/spells/").len(), 2);
        assert_eq!(transport.posted("/my/persistentcharacters/").len(), 1);

        let encounters = transport.posted("/my/encounters/");
        assert_eq!(encounters.len(), 1);
        assert_eq!(encounters[0][0]["Id"], json!("V01_Encounter"));
        assert_eq!(encounters[0][0]["Version"], json!("legacy"));

        // Player characters are not part of the bulk sync
        assert!(transport.posted("/my/playercharacters/").is_empty());

        assert_eq!(report.uploaded(), 22 + 12 + 1 + 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(
            report.collection(EntityKind::Encounters).map(|c| c.skipped),
            Some(1)
        );

        let events = drain(&mut rx);
        assert_eq!(events.last(), Some(&SyncEvent::Complete));
        assert_eq!(
            events.iter().filter(|e| **e == SyncEvent::Complete).count(),
            1
        );
        assert_eq!(remaining_for(&events, EntityKind::StatBlocks), vec![22, 12, 2]);
        assert_eq!(remaining_for(&events, EntityKind::Spells), vec![12, 2]);
        assert!(events.iter().any(|e| matches!(
            e,
            SyncEvent::RecordSkipped { migration: true, name, .. } if name == "Broken"
        )));
    }

    #[tokio::test]
    async fn test_records_upload_as_stored() {
        let library = MemoryLibrary::new()
            .local(
                EntityKind::StatBlocks,
                "Goblin",
                json!({ "Name": "Goblin", "Version": "3.0.0", "Gm": "secret" }),
            )
            .local(
                EntityKind::StatBlocks,
                "Ooze",
                json!({ "Name": "Ooze", "HP": { "Value": 7.5 } }),
            )
            .local(
                EntityKind::Spells,
                "Wish",
                json!({ "Name": "Wish", "Level": "9" }),
            );
        let client = AccountClient::with_options(RecordingTransport::new(), true, 10);
        let (tx, _rx) = events::channel();

        let report = client.sync_all(&library, &tx).await;
        let transport = client.transport();

        assert_eq!(report.skipped(), 0);
        assert_eq!(
            transport.posted("/my/statblocks/"),
            vec![json!([
                { "Id": "Goblin", "Name": "Goblin", "Version": "3.0.0", "Gm": "secret" },
                { "Id": "Ooze", "Name": "Ooze", "Version": "legacy", "HP": { "Value": 7.5 } }
            ])]
        );
        assert_eq!(
            transport.posted("/my/spells/"),
            vec![json!([{ "Id": "Wish", "Name": "Wish", "Version": "legacy", "Level": "9" }])]
        );
    }

    #[tokio::test]
    async fn test_pipelines_run_concurrently_but_chunks_do_not() {
        let client = AccountClient::with_options(RecordingTransport::new(), true, 10);
        let (tx, _rx) = events::channel();

        client.sync_all(&full_library(), &tx).await;
        let transport = client.transport();

        for path in ["/my/statblocks/", "/my/spells/"] {
            assert_eq!(transport.max_in_flight(path), 1);
        }
        assert!(transport.max_in_flight_total() > 1);
    }

    #[tokio::test]
    async fn test_failing_collection_does_not_block_completion() {
        // First POST issued overall fails; everything else goes through
        let transport = RecordingTransport::new().failing_post(0);
        let client = AccountClient::with_options(transport, true, 10);
        let (tx, mut rx) = events::channel();

        let report = client.sync_all(&full_library(), &tx).await;

        assert_eq!(report.collections.len(), 4);
        assert_eq!(
            report
                .collections
                .iter()
                .map(|c| c.upload.failed_chunks)
                .sum::<usize>(),
            1
        );
        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, SyncEvent::ChunkFailed { .. })));
        assert_eq!(events.last(), Some(&SyncEvent::Complete));
    }

    struct UnreadableSpells(MemoryLibrary);

    impl Library for UnreadableSpells {
        async fn listings(&self, kind: EntityKind) -> Result<Vec<Listing>, LibraryError> {
            if kind == EntityKind::Spells {
                return Err(LibraryError::Read {
                    path: "/library/spells".into(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                });
            }
            self.0.listings(kind).await
        }

        async fn materialize(
            &self,
            kind: EntityKind,
            listing: &Listing,
        ) -> Result<Value, LibraryError> {
            self.0.materialize(kind, listing).await
        }
    }

    #[tokio::test]
    async fn test_unreadable_collection_is_reported() {
        let client = AccountClient::with_options(RecordingTransport::new(), true, 10);
        let (tx, mut rx) = events::channel();

        let report = client
            .sync_all(&UnreadableSpells(full_library()), &tx)
            .await;

        let spells = report.collection(EntityKind::Spells).unwrap();
        assert!(spells.error.is_some());
        assert!(!spells.is_complete());
        assert!(report.collection(EntityKind::StatBlocks).unwrap().is_complete());
        assert_eq!(spells.upload.chunks, 0);
        assert_eq!(client.transport().posted("/my/statblocks/").len(), 3);

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            SyncEvent::CollectionFailed {
                kind: EntityKind::Spells,
                ..
            }
        )));
        assert_eq!(events.last(), Some(&SyncEvent::Complete));
    }

    #[tokio::test]
    async fn test_empty_library_completes_without_requests() {
        let client = AccountClient::with_options(RecordingTransport::new(), true, 10);
        let (tx, mut rx) = events::channel();

        let report = client.sync_all(&MemoryLibrary::new(), &tx).await;

        assert_eq!(report.uploaded(), 0);
        assert!(client.transport().requests().is_empty());
        assert_eq!(drain(&mut rx), vec![SyncEvent::Complete]);
    }

    #[tokio::test]
    async fn test_storage_disabled_sync_is_noop() {
        let client = AccountClient::with_options(RecordingTransport::new(), false, 10);
        let (tx, mut rx) = events::channel();

        let report = client.sync_all(&full_library(), &tx).await;

        assert_eq!(report, SyncReport::default());
        assert!(client.transport().requests().is_empty());
        assert!(drain(&mut rx).is_empty());
    }
}
