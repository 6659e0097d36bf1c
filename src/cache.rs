//! Per-class transform cache.
//!
//! The cache guarantees that a class name is transformed at most once per
//! process: the first caller computes the record under a per-name lock and
//! every later (or concurrently racing) caller observes exactly those bytes.
//! Records are immutable once stored and pinned to their original origin for
//! the process lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::source::ArchiveManifest;

/// Fully resolved state of one class, keyed by its requested name.
#[derive(Debug, Clone)]
pub struct ClassRecord {
    /// Name the class was requested under.
    pub name: String,
    /// Name after namespace mapping, used for the source lookup.
    pub mapped_name: String,
    /// Label of the classpath entry the bytes came from.
    pub origin: String,
    /// Untransformed bytes as read from the source.
    pub raw: Vec<u8>,
    /// Bytes after the full transformer chain ran.
    pub transformed: Vec<u8>,
    /// Manifest of the origin, when the origin carries one.
    pub manifest: Option<ArchiveManifest>,
}

impl ClassRecord {
    /// Content digest of the transformed bytes, for diagnostics.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.transformed))
    }
}

/// Concurrent record store with atomic first-insertion per key.
#[derive(Default)]
pub struct TransformCache {
    records: RwLock<HashMap<String, Arc<ClassRecord>>>,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TransformCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<ClassRecord>> {
        self.records.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Return the cached record for `name`, computing it with `load` on first
    /// access.
    ///
    /// Concurrent callers for the same uncached name serialize on a per-name
    /// lock; the second caller waits, then observes the first caller's
    /// record, so `load` runs at most once per name. A failed `load` caches
    /// nothing and the next caller retries.
    pub fn get_or_load<F>(&self, name: &str, load: F) -> Result<Arc<ClassRecord>>
    where
        F: FnOnce() -> Result<ClassRecord>,
    {
        if let Some(record) = self.get(name) {
            return Ok(record);
        }

        let name_lock = {
            let mut in_flight = self.in_flight.lock();
            in_flight
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = name_lock.lock();

        // A racing caller may have finished while we waited for the lock.
        if let Some(record) = self.get(name) {
            return Ok(record);
        }

        let record = match load() {
            Ok(record) => Arc::new(record),
            Err(err) => {
                // Drop the per-name entry so failing names do not accumulate.
                self.in_flight.lock().remove(name);
                return Err(err);
            }
        };
        debug!(
            class = %record.name,
            origin = %record.origin,
            digest = %record.digest(),
            "class transformed and cached"
        );
        self.records
            .write()
            .insert(name.to_string(), record.clone());
        self.in_flight.lock().remove(name);
        Ok(record)
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(name: &str, bytes: Vec<u8>) -> ClassRecord {
        ClassRecord {
            name: name.to_string(),
            mapped_name: name.to_string(),
            origin: "test".to_string(),
            raw: bytes.clone(),
            transformed: bytes,
            manifest: None,
        }
    }

    #[test]
    fn second_load_reuses_first_result() {
        let cache = TransformCache::new();
        let loads = AtomicUsize::new(0);

        let first = cache
            .get_or_load("a.B", || {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(record("a.B", vec![1]))
            })
            .unwrap();
        let second = cache
            .get_or_load("a.B", || {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(record("a.B", vec![2]))
            })
            .unwrap();

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(first.transformed, second.transformed);
    }

    #[test]
    fn failed_load_is_not_cached() {
        let cache = TransformCache::new();
        let err = cache.get_or_load("a.B", || anyhow::bail!("source missing"));
        assert!(err.is_err());
        assert!(!cache.contains("a.B"));

        let ok = cache.get_or_load("a.B", || Ok(record("a.B", vec![7])));
        assert!(ok.is_ok());
    }

    #[test]
    fn failed_loads_leave_no_in_flight_entries() {
        let cache = TransformCache::new();
        for i in 0..4 {
            let name = format!("missing.Class{}", i);
            let err = cache.get_or_load(&name, || anyhow::bail!("source missing"));
            assert!(err.is_err());
        }
        assert_eq!(cache.in_flight_len(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_loads_compute_once() {
        let cache = Arc::new(TransformCache::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let loads = loads.clone();
                std::thread::spawn(move || {
                    cache
                        .get_or_load("a.B", || {
                            loads.fetch_add(1, Ordering::SeqCst);
                            Ok(record("a.B", vec![42]))
                        })
                        .unwrap()
                        .transformed
                        .clone()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec![42]);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }
}
