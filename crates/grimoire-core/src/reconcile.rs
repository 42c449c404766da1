//! Reconciliation of local records against the account
//!
//! A local record needs uploading when no account record shares its
//! display name. Matching is exact and case-sensitive, and only the
//! current name counts: renaming a record after it was synced uploads it
//! again as a new record.
//!
//! Records are uploaded as stored. Only the `Id` and `Version` header
//! fields are rewritten; every other field passes through untouched,
//! including fields this crate has no model for.

use std::collections::HashSet;

use futures_util::future::join_all;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{LibraryError, RecordError};
use crate::identity::{repair_legacy_id, IdSource};
use crate::library::Library;
use crate::migrate::{is_current_encounter, migrate_encounter, stamp_legacy};
use crate::models::{EntityKind, Listable, Listing, Origin};

/// A stored record, field for field
pub type Record = Map<String, Value>;

/// Local listings with no same-named account listing
pub fn unsynced_listings(items: &[Listing]) -> Vec<Listing> {
    let synced: HashSet<&str> = items
        .iter()
        .filter(|i| i.origin == Origin::Account)
        .map(|i| i.name.as_str())
        .collect();

    items
        .iter()
        .filter(|i| i.origin == Origin::LocalStorage)
        .filter(|l| !synced.contains(l.name.as_str()))
        .cloned()
        .collect()
}

/// A record left out of the upload, and why
#[derive(Debug)]
pub struct SkippedRecord {
    pub name: String,
    pub error: RecordError,
}

/// Records ready for upload
#[derive(Debug, Default)]
pub struct Prepared {
    /// Identified, versioned records, in listing order
    pub items: Vec<Record>,
    pub skipped: Vec<SkippedRecord>,
}

/// Select, load and sanitize every local record the account lacks
///
/// All unsynced records are materialized concurrently. A record that
/// fails to load or migrate is skipped without affecting the rest.
pub async fn prepare_for_sync<L: Library>(
    library: &L,
    kind: EntityKind,
    ids: &mut dyn IdSource,
) -> Result<Prepared, LibraryError> {
    let listings = library.listings(kind).await?;
    let unsynced = unsynced_listings(&listings);
    debug!(
        "{} of {} {} listings are unsynced",
        unsynced.len(),
        listings.len(),
        kind
    );

    let loaded = join_all(
        unsynced
            .iter()
            .map(|listing| library.materialize(kind, listing)),
    )
    .await;

    let mut prepared = Prepared::default();
    for (listing, record) in unsynced.iter().zip(loaded) {
        let result = record
            .map_err(RecordError::from)
            .and_then(|record| decode_record(kind, record, &mut *ids))
            .and_then(|record| sanitize(record, listing));

        match result {
            Ok(record) => prepared.items.push(record),
            Err(error) => {
                warn!("Skipping {} '{}': {}", kind, listing.name, error);
                prepared.skipped.push(SkippedRecord {
                    name: listing.name.clone(),
                    error,
                });
            }
        }
    }

    Ok(prepared)
}

/// Take a stored record apart into its fields
///
/// Legacy encounter snapshots are rebuilt in the current shape first.
fn decode_record(
    kind: EntityKind,
    record: Value,
    ids: &mut dyn IdSource,
) -> Result<Record, RecordError> {
    let name = record
        .get("Name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let record = if kind == EntityKind::Encounters && !is_current_encounter(&record) {
        let encounter = migrate_encounter(record, ids)?;
        serde_json::to_value(encounter).map_err(|source| RecordError::Decode {
            collection: kind.collection().to_string(),
            name: name.clone(),
            source,
        })?
    } else {
        record
    };

    match record {
        Value::Object(fields) => Ok(fields),
        _ => Err(RecordError::NotAnObject {
            collection: kind.collection().to_string(),
            name,
        }),
    }
}

/// Carry the storage key onto the record, repair legacy ids and stamp versions
fn sanitize(mut record: Record, listing: &Listing) -> Result<Record, RecordError> {
    let mut header = Listable::from_fields(&record);
    if !listing.id.is_empty() {
        header.id = listing.id.clone();
    }
    header.id = repair_legacy_id(&header.id);
    stamp_legacy(&mut header);

    if header.id.is_empty() {
        return Err(RecordError::EmptyId { name: header.name });
    }

    record.insert("Id".to_string(), Value::String(header.id));
    record.insert("Version".to_string(), Value::String(header.version));
    Ok(record)
}
