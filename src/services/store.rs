use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::trip::TripRecord;

const TRIPS_FILE: &str = "trips.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: io::Error,
    },
    #[error("{path} is not a valid trip document: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("a trip with id {id} already exists")]
    DuplicateIdentifier { id: String },
}

// One JSON document under the data dir; mutations serialize behind the lock
// so overlapping requests cannot lose an update.
#[derive(Debug, Clone)]
pub struct TripStore {
    data_dir: Arc<PathBuf>,
    write_lock: Arc<Mutex<()>>,
}

impl TripStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir: Arc::new(data_dir),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn trips_path(&self) -> PathBuf {
        self.data_dir.join(TRIPS_FILE)
    }

    pub async fn ensure_structure(&self) -> Result<(), StorageError> {
        fs::create_dir_all(self.data_dir.as_ref())
            .await
            .map_err(|source| StorageError::Write {
                path: self.data_dir.as_ref().clone(),
                source,
            })
    }

    // Absent or empty document is an empty log; one that does not parse is
    // an error, never a silent reset.
    pub async fn load(&self) -> Result<Vec<TripRecord>, StorageError> {
        let path = self.trips_path();
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StorageError::Read { path, source }),
        };
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|source| StorageError::Malformed { path, source })
    }

    pub async fn save(&self, trips: &[TripRecord]) -> Result<(), StorageError> {
        let path = self.trips_path();
        let bytes = serde_json::to_vec_pretty(trips).map_err(|source| StorageError::Malformed {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, bytes)
            .await
            .map_err(|source| StorageError::Write { path, source })
    }

    pub fn next_identifier(&self) -> String {
        Uuid::new_v4().to_string()
    }

    pub async fn find(&self, id: &str) -> Result<Option<TripRecord>, StorageError> {
        let trips = self.load().await?;
        Ok(trips.into_iter().find(|t| t.id == id))
    }

    pub async fn append(&self, trip: TripRecord) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut trips = self.load().await?;
        if trips.iter().any(|t| t.id == trip.id) {
            return Err(StorageError::DuplicateIdentifier { id: trip.id });
        }
        trips.push(trip);
        trips.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.save(&trips).await
    }

    // False when no stored trip carries the id; the document is untouched.
    pub async fn replace(&self, trip: TripRecord) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut trips = self.load().await?;
        let Some(slot) = trips.iter_mut().find(|t| t.id == trip.id) else {
            return Ok(false);
        };
        *slot = trip;
        self.save(&trips).await?;
        Ok(true)
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut trips = self.load().await?;
        let before = trips.len();
        trips.retain(|t| t.id != id);
        if trips.len() == before {
            return Ok(false);
        }
        self.save(&trips).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trip::{DistanceSource, TripKind};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn sample_trip(id: &str) -> TripRecord {
        TripRecord {
            id: id.to_string(),
            created_at: Utc::now(),
            kind: TripKind::OneWay,
            start_address: "12 Harbor Rd".into(),
            end_address: "400 Summit Ave".into(),
            departed_at: None,
            arrived_at: None,
            stops: Vec::new(),
            rate_per_mile: 0.70,
            one_way_miles: 42.0,
            total_miles: 42.0,
            reimbursement: 29.40,
            distance_source: DistanceSource::Manual,
            route_legs: Vec::new(),
            costs: Default::default(),
        }
    }

    async fn store() -> (TripStore, TempDir) {
        let root = TempDir::new().expect("tempdir");
        let store = TripStore::new(root.path().join("data"));
        store.ensure_structure().await.expect("ensure structure");
        (store, root)
    }

    #[tokio::test]
    async fn absent_document_loads_empty() {
        let (store, _root) = store().await;
        assert!(store.load().await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn empty_document_loads_empty() {
        let (store, _root) = store().await;
        fs::write(store.trips_path(), b"").await.expect("write");
        assert!(store.load().await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn malformed_document_is_an_error() {
        let (store, _root) = store().await;
        fs::write(store.trips_path(), b"{ not json")
            .await
            .expect("write");
        let err = store.load().await.expect_err("malformed");
        assert!(matches!(err, StorageError::Malformed { .. }));
    }

    #[tokio::test]
    async fn append_then_load_round_trips() {
        let (store, _root) = store().await;
        store.append(sample_trip("a")).await.expect("append");
        let trips = store.load().await.expect("load");
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].id, "a");
        assert_eq!(trips[0].start_address, "12 Harbor Rd");
    }

    #[tokio::test]
    async fn append_keeps_newest_first() {
        let (store, _root) = store().await;
        let mut old = sample_trip("old");
        old.created_at = Utc::now() - Duration::minutes(30);
        store.append(old).await.expect("append old");
        store.append(sample_trip("new")).await.expect("append new");
        let trips = store.load().await.expect("load");
        assert_eq!(trips[0].id, "new");
        assert_eq!(trips[1].id, "old");
    }

    #[tokio::test]
    async fn duplicate_identifier_is_rejected() {
        let (store, _root) = store().await;
        store.append(sample_trip("a")).await.expect("append");
        let err = store.append(sample_trip("a")).await.expect_err("dup");
        assert!(matches!(err, StorageError::DuplicateIdentifier { id } if id == "a"));
        assert_eq!(store.load().await.expect("load").len(), 1);
    }

    #[tokio::test]
    async fn identifiers_are_unique() {
        let (store, _root) = store().await;
        let mut ids: Vec<String> = (0..100).map(|_| store.next_identifier()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 100);
    }

    #[tokio::test]
    async fn replace_swaps_exactly_one_record() {
        let (store, _root) = store().await;
        store.append(sample_trip("a")).await.expect("append a");
        store.append(sample_trip("b")).await.expect("append b");

        let mut amended = store.find("a").await.expect("find").expect("present");
        amended.costs.gas = 35.0;
        assert!(store.replace(amended).await.expect("replace"));

        let trips = store.load().await.expect("load");
        let a = trips.iter().find(|t| t.id == "a").expect("a present");
        let b = trips.iter().find(|t| t.id == "b").expect("b present");
        assert_eq!(a.costs.gas, 35.0);
        assert_eq!(b.costs.gas, 0.0);
    }

    #[tokio::test]
    async fn replace_of_unknown_id_touches_nothing() {
        let (store, _root) = store().await;
        store.append(sample_trip("a")).await.expect("append");
        assert!(!store.replace(sample_trip("ghost")).await.expect("replace"));
        assert_eq!(store.load().await.expect("load").len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_exactly_the_named_trip() {
        let (store, _root) = store().await;
        store.append(sample_trip("a")).await.expect("append a");
        store.append(sample_trip("b")).await.expect("append b");
        store.append(sample_trip("c")).await.expect("append c");

        assert!(store.delete("b").await.expect("delete"));
        let trips = store.load().await.expect("load");
        let ids: Vec<&str> = trips.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"a"));
        assert!(ids.contains(&"c"));

        assert!(!store.delete("b").await.expect("second delete"));
    }
}
