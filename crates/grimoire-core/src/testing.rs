//! In-memory collaborators for tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde_json::Value;

use crate::error::{LibraryError, TransportError, TransportResult};
use crate::library::Library;
use crate::models::{EntityKind, Listing, Origin};
use crate::transport::Transport;

/// A request seen by `RecordingTransport`
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Request {
    Get(String),
    Post(String, Value),
    Delete(String),
}

#[derive(Default)]
struct Flight {
    current: HashMap<String, usize>,
    max_per_path: HashMap<String, usize>,
    max_total: usize,
}

/// Transport that records requests and fails selected POSTs
#[derive(Default)]
pub(crate) struct RecordingTransport {
    requests: Mutex<Vec<Request>>,
    responses: HashMap<String, Value>,
    failing_posts: HashSet<usize>,
    posts_seen: Mutex<usize>,
    flight: Mutex<Flight>,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fail the n-th POST (0-based, counted across all paths)
    pub(crate) fn failing_post(mut self, n: usize) -> Self {
        self.failing_posts.insert(n);
        self
    }

    pub(crate) fn with_response(mut self, path: &str, body: Value) -> Self {
        self.responses.insert(path.to_string(), body);
        self
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// Bodies of every POST to `path`, in submission order
    pub(crate) fn posted(&self, path: &str) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::Post(p, body) if p == path => Some(body),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn max_in_flight(&self, path: &str) -> usize {
        let flight = self.flight.lock().unwrap();
        flight.max_per_path.get(path).copied().unwrap_or(0)
    }

    pub(crate) fn max_in_flight_total(&self) -> usize {
        self.flight.lock().unwrap().max_total
    }

    fn take_off(&self, path: &str) {
        let mut flight = self.flight.lock().unwrap();
        let current = flight.current.entry(path.to_string()).or_default();
        *current += 1;
        let now = *current;
        let max = flight.max_per_path.entry(path.to_string()).or_default();
        *max = (*max).max(now);
        let total: usize = flight.current.values().sum();
        flight.max_total = flight.max_total.max(total);
    }

    fn land(&self, path: &str) {
        let mut flight = self.flight.lock().unwrap();
        if let Some(current) = flight.current.get_mut(path) {
            *current -= 1;
        }
    }
}

impl Transport for RecordingTransport {
    async fn get_json(&self, path: &str) -> TransportResult<Option<Value>> {
        self.requests
            .lock()
            .unwrap()
            .push(Request::Get(path.to_string()));
        Ok(self.responses.get(path).cloned())
    }

    async fn post_json(&self, path: &str, body: &Value) -> TransportResult<()> {
        let n = {
            let mut seen = self.posts_seen.lock().unwrap();
            let n = *seen;
            *seen += 1;
            n
        };
        self.requests
            .lock()
            .unwrap()
            .push(Request::Post(path.to_string(), body.clone()));

        self.take_off(path);
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        self.land(path);

        if self.failing_posts.contains(&n) {
            return Err(TransportError::Status {
                method: "POST",
                path: path.to_string(),
                status: 500,
            });
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> TransportResult<()> {
        self.requests
            .lock()
            .unwrap()
            .push(Request::Delete(path.to_string()));
        Ok(())
    }
}

/// Library holding records in memory
#[derive(Default)]
pub(crate) struct MemoryLibrary {
    records: HashMap<EntityKind, Vec<(Listing, Option<Value>)>>,
}

impl MemoryLibrary {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a local record keyed by `id`
    pub(crate) fn local(mut self, kind: EntityKind, id: &str, record: Value) -> Self {
        let name = record
            .get("Name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let listing = Listing::new(id, name, Origin::LocalStorage);
        self.records
            .entry(kind)
            .or_default()
            .push((listing, Some(record)));
        self
    }

    /// Add a local listing whose record cannot be loaded
    pub(crate) fn dangling(mut self, kind: EntityKind, id: &str, name: &str) -> Self {
        let listing = Listing::new(id, name, Origin::LocalStorage);
        self.records.entry(kind).or_default().push((listing, None));
        self
    }

    /// Add an account listing
    pub(crate) fn account(mut self, kind: EntityKind, name: &str) -> Self {
        let listing = Listing::new(name, name, Origin::Account);
        self.records.entry(kind).or_default().push((listing, None));
        self
    }

    /// Add `count` plain local records named `<prefix> <n>`
    pub(crate) fn many(mut self, kind: EntityKind, prefix: &str, count: usize) -> Self {
        for n in 0..count {
            let name = format!("{} {}", prefix, n);
            let id = name.replace(' ', "_");
            self = self.local(kind, &id, serde_json::json!({ "Name": name }));
        }
        self
    }
}

impl Library for MemoryLibrary {
    async fn listings(&self, kind: EntityKind) -> Result<Vec<Listing>, LibraryError> {
        Ok(self
            .records
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|(listing, _)| listing.clone())
            .collect())
    }

    async fn materialize(
        &self,
        kind: EntityKind,
        listing: &Listing,
    ) -> Result<Value, LibraryError> {
        tokio::task::yield_now().await;
        self.records
            .get(&kind)
            .into_iter()
            .flatten()
            .find(|(l, _)| l == listing)
            .and_then(|(_, record)| record.clone())
            .ok_or_else(|| LibraryError::NotFound {
                collection: kind.collection().to_string(),
                name: listing.name.clone(),
            })
    }
}
