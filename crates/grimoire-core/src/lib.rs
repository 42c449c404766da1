//! Grimoire Core Library
//!
//! This crate keeps a user's locally cached tabletop library (stat blocks,
//! player characters, persistent characters, spells and encounters) in
//! step with their remote account.
//!
//! # Architecture
//!
//! - **Reconcile**: local records whose name the account doesn't know
//!   are selected for upload
//! - **Migrate**: records from before schema versioning are stamped, and
//!   old encounter snapshots are rebuilt in the current shape
//! - **Upload**: each collection goes up in fixed-size chunks, one
//!   request at a time, with progress after every chunk
//!
//! The four synced collections run as concurrent pipelines joined by a
//! single completion event.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let client = AccountClient::new(HttpTransport::new(&config)?, &config);
//! let export = client.get_full_account().await?.unwrap_or_default();
//! let library = MergedLibrary::new(
//!     LocalLibrary::new(config.library_dir()),
//!     AccountSnapshot::from_export(&export),
//! );
//!
//! let (tx, mut rx) = events::channel();
//! let report = client.sync_all(&library, &tx).await;
//! ```
//!
//! # Modules
//!
//! - `account`: account store client, batch uploader and full sync
//! - `reconcile`: unsynced record selection and preparation
//! - `migrate`: legacy stamping and encounter snapshot upgrade
//! - `identity`: id derivation and repair
//! - `models`: record shapes
//! - `library`: local and account record sources
//! - `transport`: HTTP transport
//! - `events`: progress messages
//! - `config`: application configuration

pub mod account;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod library;
pub mod migrate;
pub mod models;
pub mod reconcile;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use account::{AccountClient, CollectionReport, SyncReport, UploadOutcome};
pub use config::Config;
pub use error::{LibraryError, MigrationError, RecordError, TransportError};
pub use events::SyncEvent;
pub use identity::make_id;
pub use library::{AccountSnapshot, Library, LocalLibrary, MergedLibrary};
pub use models::{
    EncounterState, Entity, EntityKind, Listable, Listing, Origin, PersistentCharacter, Spell,
    StatBlock,
};
pub use transport::{HttpTransport, Transport};
