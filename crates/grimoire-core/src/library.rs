//! Record sources for reconciliation
//!
//! A `Library` lists every known record of a collection, from both the
//! local cache and the account, and materializes full records on demand.
//!
//! ## Local layout
//!
//! ```text
//! <data_dir>/library/
//!   statblocks/<id>.json
//!   persistentcharacters/<id>.json
//!   encounters/<id>.json
//!   spells/<id>.json
//! ```
//!
//! The file stem is the record's storage key and becomes its listing id.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::LibraryError;
use crate::models::{EntityKind, Listable, Listing, Origin};

/// Source of listings and full records for every collection
#[allow(async_fn_in_trait)]
pub trait Library {
    /// Every listing of a collection, local and account alike
    async fn listings(&self, kind: EntityKind) -> Result<Vec<Listing>, LibraryError>;

    /// Load the full record behind a listing
    async fn materialize(&self, kind: EntityKind, listing: &Listing)
        -> Result<Value, LibraryError>;
}

/// Directory-backed local cache
#[derive(Debug, Clone)]
pub struct LocalLibrary {
    root: PathBuf,
}

impl LocalLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, kind: EntityKind) -> PathBuf {
        self.root.join(kind.collection())
    }

    fn record_path(&self, kind: EntityKind, key: &str) -> PathBuf {
        self.collection_dir(kind).join(format!("{}.json", key))
    }

    /// Number of records stored for a collection
    pub async fn count(&self, kind: EntityKind) -> Result<usize, LibraryError> {
        Ok(self.record_keys(kind).await?.len())
    }

    async fn record_keys(
        &self,
        kind: EntityKind,
    ) -> Result<Vec<(String, PathBuf)>, LibraryError> {
        let dir = self.collection_dir(kind);
        let read_error = |source: std::io::Error| LibraryError::Read {
            path: dir.clone(),
            source,
        };

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_error(e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push((stem.to_string(), path.clone()));
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Write a record under the given storage key
    ///
    /// Writes go to a temporary file first and are renamed into place.
    pub fn save_record(
        &self,
        kind: EntityKind,
        key: &str,
        record: &Value,
    ) -> Result<PathBuf, LibraryError> {
        let dir = self.collection_dir(kind);
        fs::create_dir_all(&dir).map_err(|source| LibraryError::Write {
            path: dir.clone(),
            source,
        })?;

        let path = self.record_path(kind, key);
        let bytes = serde_json::to_vec_pretty(record).map_err(|source| LibraryError::Parse {
            path: path.clone(),
            source,
        })?;
        atomic_write(&path, &bytes).map_err(|source| LibraryError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

impl Library for LocalLibrary {
    async fn listings(&self, kind: EntityKind) -> Result<Vec<Listing>, LibraryError> {
        let mut listings = Vec::new();
        for (key, path) in self.record_keys(kind).await? {
            let record = match read_json(&path).await {
                Ok(record) => record,
                Err(e) => {
                    // Unreadable files still get listed; materializing reports the error
                    warn!("{}", e);
                    Value::Null
                }
            };
            let mut listing = Listing::from_listable(&header(&record), Origin::LocalStorage);
            listing.id = key;
            listings.push(listing);
        }
        debug!("Listed {} local {}", listings.len(), kind);
        Ok(listings)
    }

    async fn materialize(
        &self,
        kind: EntityKind,
        listing: &Listing,
    ) -> Result<Value, LibraryError> {
        let path = self.record_path(kind, &listing.id);
        let bytes = tokio::fs::read(&path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LibraryError::NotFound {
                    collection: kind.collection().to_string(),
                    name: listing.name.clone(),
                }
            } else {
                LibraryError::Read {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|source| LibraryError::Parse { path, source })
    }
}

/// Records known to the remote account, from `GET /my/fullaccount`
#[derive(Debug, Clone, Default)]
pub struct AccountSnapshot {
    records: HashMap<EntityKind, Vec<Value>>,
}

impl AccountSnapshot {
    /// Parse a full account export; unknown keys are ignored
    pub fn from_export(export: &Value) -> Self {
        let mut records = HashMap::new();
        for kind in EntityKind::ALL {
            if let Some(items) = export.get(kind.collection()).and_then(Value::as_array) {
                records.insert(kind, items.clone());
            }
        }
        Self { records }
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.records.get(&kind).map_or(0, Vec::len)
    }

    fn find(&self, kind: EntityKind, listing: &Listing) -> Option<&Value> {
        self.records
            .get(&kind)?
            .iter()
            .find(|r| str_field(r, "Id").as_deref() == Some(listing.id.as_str()))
    }
}

impl Library for AccountSnapshot {
    async fn listings(&self, kind: EntityKind) -> Result<Vec<Listing>, LibraryError> {
        Ok(self
            .records
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|record| Listing::from_listable(&header(record), Origin::Account))
            .collect())
    }

    async fn materialize(
        &self,
        kind: EntityKind,
        listing: &Listing,
    ) -> Result<Value, LibraryError> {
        self.find(kind, listing)
            .cloned()
            .ok_or_else(|| LibraryError::NotFound {
                collection: kind.collection().to_string(),
                name: listing.name.clone(),
            })
    }
}

/// Local cache and account snapshot viewed as one library
#[derive(Debug, Clone)]
pub struct MergedLibrary<L> {
    local: L,
    account: AccountSnapshot,
}

impl<L: Library> MergedLibrary<L> {
    pub fn new(local: L, account: AccountSnapshot) -> Self {
        Self { local, account }
    }
}

impl<L: Library> Library for MergedLibrary<L> {
    async fn listings(&self, kind: EntityKind) -> Result<Vec<Listing>, LibraryError> {
        let mut listings = self.local.listings(kind).await?;
        listings.extend(self.account.listings(kind).await?);
        Ok(listings)
    }

    async fn materialize(
        &self,
        kind: EntityKind,
        listing: &Listing,
    ) -> Result<Value, LibraryError> {
        match listing.origin {
            Origin::LocalStorage => self.local.materialize(kind, listing).await,
            Origin::Account => self.account.materialize(kind, listing).await,
        }
    }
}

fn str_field(record: &Value, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}

fn header(record: &Value) -> Listable {
    record
        .as_object()
        .map(Listable::from_fields)
        .unwrap_or_default()
}

async fn read_json(path: &Path) -> Result<Value, LibraryError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| LibraryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| LibraryError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write data atomically (temp file + rename)
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let temp_path = path.with_extension("json.tmp");

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)
}
