//! Account store client
//!
//! REST surface of the remote account store:
//!
//! | Request                      | Purpose                          |
//! |------------------------------|----------------------------------|
//! | `GET /my`                    | current user, or null            |
//! | `DELETE /my`                 | delete the account               |
//! | `GET /my/fullaccount`        | export of every collection       |
//! | `POST /my/{collection}/`     | save one record, or a batch      |
//! | `DELETE /my/{collection}/{id}` | delete one record              |
//!
//! When storage is disabled every request short-circuits to success
//! without touching the transport.
//!
//! ## Usage
//!
//! ```ignore
//! let client = AccountClient::new(HttpTransport::new(&config)?, &config);
//! let (tx, mut rx) = events::channel();
//! let report = client.sync_all(&library, &tx).await;
//! ```

mod sync;
mod upload;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{Config, DEFAULT_BATCH_SIZE};
use crate::error::{TransportError, TransportResult};
use crate::models::{EncounterState, Entity, EntityKind, PersistentCharacter, Spell, StatBlock};
use crate::transport::Transport;

pub use sync::{CollectionReport, SyncReport};
pub use upload::UploadOutcome;

/// Collection name of the user settings document
const SETTINGS_COLLECTION: &str = "settings";

/// Client for the remote account store
pub struct AccountClient<T> {
    transport: T,
    storage_enabled: bool,
    batch_size: usize,
}

impl<T: Transport> AccountClient<T> {
    /// Create a client using the configured storage mode and batch size
    pub fn new(transport: T, config: &Config) -> Self {
        Self::with_options(transport, config.storage_enabled, config.batch_size)
    }

    /// Create a client with explicit options
    pub fn with_options(transport: T, storage_enabled: bool, batch_size: usize) -> Self {
        Self {
            transport,
            storage_enabled,
            batch_size: if batch_size == 0 {
                DEFAULT_BATCH_SIZE
            } else {
                batch_size
            },
        }
    }

    pub fn storage_enabled(&self) -> bool {
        self.storage_enabled
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ==================== Account ====================

    /// Current user, or `None` when signed out or storage is disabled
    pub async fn get_account(&self) -> TransportResult<Option<Value>> {
        if !self.storage_enabled {
            return Ok(None);
        }

        match self.transport.get_json("/my").await {
            Err(TransportError::Status {
                status: 401 | 403 | 404,
                ..
            }) => Ok(None),
            other => other,
        }
    }

    /// Delete the account and everything stored in it
    pub async fn delete_account(&self) -> TransportResult<()> {
        if !self.storage_enabled {
            return Ok(());
        }
        self.transport.delete("/my").await
    }

    /// Export of every collection, or `None` when storage is disabled
    pub async fn get_full_account(&self) -> TransportResult<Option<Value>> {
        if !self.storage_enabled {
            return Ok(None);
        }
        self.transport.get_json("/my/fullaccount").await
    }

    // ==================== Single records ====================

    /// Create or update one record
    pub async fn save_entity<E: Entity>(
        &self,
        kind: EntityKind,
        entity: &E,
    ) -> TransportResult<()> {
        debug!("Saving {} '{}'", kind, entity.listable().name);
        self.save_to(kind.collection(), entity).await
    }

    /// Delete one record by id
    pub async fn delete_entity(&self, kind: EntityKind, id: &str) -> TransportResult<()> {
        if !self.storage_enabled {
            return Ok(());
        }
        self.transport.delete(&entity_path(kind, id)).await
    }

    pub async fn save_settings(&self, settings: &Value) -> TransportResult<()> {
        self.save_to(SETTINGS_COLLECTION, settings).await
    }

    pub async fn save_stat_block(&self, stat_block: &StatBlock) -> TransportResult<()> {
        self.save_entity(EntityKind::StatBlocks, stat_block).await
    }

    pub async fn delete_stat_block(&self, id: &str) -> TransportResult<()> {
        self.delete_entity(EntityKind::StatBlocks, id).await
    }

    pub async fn save_player_character(&self, character: &StatBlock) -> TransportResult<()> {
        self.save_entity(EntityKind::PlayerCharacters, character)
            .await
    }

    pub async fn delete_player_character(&self, id: &str) -> TransportResult<()> {
        self.delete_entity(EntityKind::PlayerCharacters, id).await
    }

    pub async fn save_persistent_character(
        &self,
        character: &PersistentCharacter,
    ) -> TransportResult<()> {
        self.save_entity(EntityKind::PersistentCharacters, character)
            .await
    }

    pub async fn delete_persistent_character(&self, id: &str) -> TransportResult<()> {
        self.delete_entity(EntityKind::PersistentCharacters, id)
            .await
    }

    pub async fn save_encounter(&self, encounter: &EncounterState) -> TransportResult<()> {
        self.save_entity(EntityKind::Encounters, encounter).await
    }

    pub async fn delete_encounter(&self, id: &str) -> TransportResult<()> {
        self.delete_entity(EntityKind::Encounters, id).await
    }

    pub async fn save_spell(&self, spell: &Spell) -> TransportResult<()> {
        self.save_entity(EntityKind::Spells, spell).await
    }

    pub async fn delete_spell(&self, id: &str) -> TransportResult<()> {
        self.delete_entity(EntityKind::Spells, id).await
    }

    async fn save_to<E: Serialize + ?Sized>(
        &self,
        collection: &str,
        entity: &E,
    ) -> TransportResult<()> {
        if !self.storage_enabled {
            return Ok(());
        }
        let body = serde_json::to_value(entity)?;
        debug!("Saving one record to {}", collection);
        self.transport
            .post_json(&collection_path(collection), &body)
            .await
    }
}

/// `/my/{collection}/`
fn collection_path(collection: &str) -> String {
    format!("/my/{}/", collection)
}

/// `/my/{collection}/{id}`
fn entity_path(kind: EntityKind, id: &str) -> String {
    format!("/my/{}/{}", kind.collection(), id)
}
