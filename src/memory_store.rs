//! In-memory `ObjectStore` that records every request it serves.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;

use super::store::{ListPage, ObjectCopy, ObjectStore, RemoteObject};
use super::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    List { bucket: String, prefix: String },
    Head { bucket: String, key: String },
    Copy(ObjectCopy),
}

impl Op {
    fn bucket(&self) -> &str {
        match self {
            Op::List { bucket, .. } | Op::Head { bucket, .. } => bucket,
            Op::Copy(copy) => &copy.destination_bucket,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub size: u64,
    pub e_tag: String,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
}

pub struct MemoryStore {
    page_size: usize,
    buckets: Mutex<BTreeMap<String, BTreeMap<String, StoredObject>>>,
    ops: Mutex<Vec<Op>>,
    failing_key: Mutex<Option<String>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_page_size(1000)
    }
}

impl MemoryStore {
    pub fn with_page_size(page_size: usize) -> Self {
        MemoryStore {
            page_size,
            buckets: Mutex::new(BTreeMap::new()),
            ops: Mutex::new(Vec::new()),
            failing_key: Mutex::new(None),
        }
    }

    pub fn insert(&self, bucket: &str, key: &str, body: &[u8], content_type: Option<&str>) {
        let mut hasher = DefaultHasher::new();
        body.hash(&mut hasher);
        let object = StoredObject {
            size: body.len() as u64,
            e_tag: format!("\"{:016x}\"", hasher.finish()),
            content_type: content_type.map(str::to_string),
            cache_control: None,
        };
        self.put(bucket, key, object);
    }

    pub fn put(&self, bucket: &str, key: &str, object: StoredObject) {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), object);
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Makes copies from `key` fail.
    pub fn fail_copies_of(&self, key: &str) {
        *self.failing_key.lock().unwrap() = Some(key.to_string());
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    pub fn ops_on(&self, bucket: &str) -> Vec<Op> {
        self.ops()
            .into_iter()
            .filter(|op| op.bucket() == bucket)
            .collect()
    }

    pub fn copies(&self) -> Vec<ObjectCopy> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Copy(copy) => Some(copy),
                _ => None,
            })
            .collect()
    }

    pub fn list_calls(&self, bucket: &str) -> usize {
        self.ops_on(bucket)
            .iter()
            .filter(|op| matches!(op, Op::List { .. }))
            .count()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().unwrap().clear();
    }

    fn record(&self, op: Op) {
        self.ops.lock().unwrap().push(op);
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListPage, Error> {
        self.record(Op::List {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        });
        let start = match continuation {
            Some(token) => token
                .parse::<usize>()
                .map_err(|e| Error::Storage(format!("bad continuation token: {}", e)))?,
            None => 0,
        };
        let buckets = self.buckets.lock().unwrap();
        let matching: Vec<RemoteObject> = buckets
            .get(bucket)
            .into_iter()
            .flat_map(|objects| objects.iter())
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| RemoteObject {
                bucket: bucket.to_string(),
                key: key.clone(),
                size: object.size,
                e_tag: Some(object.e_tag.clone()),
            })
            .collect();
        let end = (start + self.page_size).min(matching.len());
        let objects = matching[start.min(end)..end].to_vec();
        let next = if end < matching.len() {
            Some(end.to_string())
        } else {
            None
        };
        Ok(ListPage { objects, next })
    }

    async fn content_type(&self, bucket: &str, key: &str) -> Result<Option<String>, Error> {
        self.record(Op::Head {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        self.get(bucket, key)
            .map(|object| object.content_type)
            .ok_or_else(|| Error::Storage(format!("NoSuchKey: {}/{}", bucket, key)))
    }

    async fn copy(&self, copy: &ObjectCopy) -> Result<(), Error> {
        self.record(Op::Copy(copy.clone()));
        if self.failing_key.lock().unwrap().as_deref() == Some(copy.source_key.as_str()) {
            return Err(Error::Storage(format!("InternalError: {}", copy.source_key)));
        }
        let source = self
            .get(&copy.source_bucket, &copy.source_key)
            .ok_or_else(|| Error::Storage(format!("NoSuchKey: {}", copy.source_key)))?;
        let object = StoredObject {
            content_type: copy.content_type.clone(),
            cache_control: Some(copy.cache_control.clone()),
            ..source
        };
        self.put(&copy.destination_bucket, &copy.destination_key, object);
        Ok(())
    }
}
