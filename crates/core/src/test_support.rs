//! In-memory ObjectStore for engine tests

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::path::RemotePath;
use crate::traits::{
    DeleteFailure, DeleteReport, ListOptions, ListResult, ObjectInfo, ObjectStore,
};

#[derive(Default)]
pub(crate) struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    page_size: Option<usize>,
    fail_listings: bool,
    op_delay: Option<Duration>,
    failing_keys: Mutex<HashSet<String>>,
    flaky_keys: Mutex<HashMap<String, usize>>,
    refused_deletes: Mutex<HashSet<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    list_calls: AtomicUsize,
    put_calls: AtomicUsize,
    get_calls: AtomicUsize,
    delete_batches: Mutex<Vec<usize>>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.op_delay = Some(delay);
        self
    }

    pub fn failing_listings(mut self) -> Self {
        self.fail_listings = true;
        self
    }

    pub fn insert(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn object_count(&self, bucket: &str) -> usize {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .count()
    }

    /// Every get/put touching `key` fails permanently
    pub fn fail_key(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    /// The first `times` get/put calls touching `key` fail with a transient error
    pub fn flaky_key(&self, key: &str, times: usize) {
        self.flaky_keys.lock().unwrap().insert(key.to_string(), times);
    }

    /// Bulk delete reports `key` as refused
    pub fn refuse_delete(&self, key: &str) {
        self.refused_deletes.lock().unwrap().insert(key.to_string());
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn delete_batches(&self) -> Vec<usize> {
        self.delete_batches.lock().unwrap().clone()
    }

    async fn enter(&self, key: &str) -> Result<InFlight<'_>> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        if let Some(delay) = self.op_delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(Error::General(format!("injected failure for {key}")));
        }
        if let Some(remaining) = self.flaky_keys.lock().unwrap().get_mut(key)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(Error::Network("request timeout".to_string()));
        }
        Ok(guard)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listings {
            return Err(Error::Network(format!("listing refused for {path}")));
        }

        let delimiter = (!options.recursive)
            .then(|| options.delimiter.clone().unwrap_or_else(|| "/".to_string()));

        let mut items: Vec<ObjectInfo> = Vec::new();
        {
            let objects = self.objects.lock().unwrap();
            for ((bucket, key), data) in objects.iter() {
                if bucket != &path.bucket || !key.starts_with(&path.key) {
                    continue;
                }
                let rest = &key[path.key.len()..];
                match delimiter.as_deref().and_then(|d| rest.find(d).map(|i| (i, d))) {
                    Some((index, d)) => {
                        let prefix = format!("{}{}", path.key, &rest[..index + d.len()]);
                        if items.last().is_none_or(|last| last.key != prefix) {
                            items.push(ObjectInfo::dir(prefix));
                        }
                    }
                    None => items.push(ObjectInfo::file(key, data.len() as u64)),
                }
            }
        }

        let start: usize = options
            .continuation_token
            .as_deref()
            .map(|t| t.parse().unwrap())
            .unwrap_or(0);
        let page_size = self
            .page_size
            .or(options.max_keys.map(|m| m as usize))
            .unwrap_or(1000);
        let end = (start + page_size).min(items.len());
        let truncated = end < items.len();

        Ok(ListResult {
            items: items[start..end].to_vec(),
            truncated,
            continuation_token: truncated.then(|| end.to_string()),
        })
    }

    async fn get_object(&self, path: &RemotePath) -> Result<Vec<u8>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let _guard = self.enter(&path.key).await?;
        self.object(&path.bucket, &path.key)
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    async fn put_object(
        &self,
        path: &RemotePath,
        data: Vec<u8>,
        _content_type: Option<String>,
    ) -> Result<ObjectInfo> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let _guard = self.enter(&path.key).await?;
        let size = data.len() as u64;
        self.insert(&path.bucket, &path.key, data);
        Ok(ObjectInfo::file(&path.key, size))
    }

    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<DeleteReport> {
        self.delete_batches.lock().unwrap().push(keys.len());

        let refused = self.refused_deletes.lock().unwrap().clone();
        let mut objects = self.objects.lock().unwrap();
        let mut failures = Vec::new();
        for key in keys {
            if refused.contains(&key) {
                failures.push(DeleteFailure {
                    key,
                    code: "AccessDenied".to_string(),
                    message: "Access Denied".to_string(),
                });
            } else {
                objects.remove(&(bucket.to_string(), key));
            }
        }
        Ok(DeleteReport { failures })
    }
}
