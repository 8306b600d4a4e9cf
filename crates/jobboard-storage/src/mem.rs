use crate::traits::{Expansion, FindOptions, Storage};
use jobboard_core::{BoardError, Document, Filter, Projection, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus::{register_histogram_vec, HistogramVec};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use ulid::Ulid;

static SCAN_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "store_scan_seconds",
        "In-memory collection scan latency",
        &["collection", "op"]
    )
    .unwrap()
});

#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    // collection -> records in insertion order
    collections: HashMap<String, Vec<Document>>,
    // (collection, _id) -> position in the collection vec
    by_id: HashMap<(String, String), usize>,
}

impl Inner {
    fn lookup(&self, collection: &str, id: &str) -> Option<&Document> {
        let pos = *self.by_id.get(&(collection.to_string(), id.to_string()))?;
        self.collections.get(collection)?.get(pos)
    }

    fn push(&mut self, collection: &str, mut doc: Document) -> Result<Document> {
        let JsonValue::Object(ref mut obj) = doc else {
            return Err(BoardError::Invalid("records must be JSON objects".into()));
        };
        let id = match obj.get("_id").and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => {
                let id = Ulid::new().to_string();
                obj.insert("_id".into(), JsonValue::String(id.clone()));
                id
            }
        };
        let key = (collection.to_string(), id);
        if self.by_id.contains_key(&key) {
            return Err(BoardError::Invalid(format!("duplicate _id {}", key.1)));
        }
        let records = self.collections.entry(collection.to_string()).or_default();
        self.by_id.insert(key, records.len());
        records.push(doc.clone());
        Ok(doc)
    }

    fn expand(&self, doc: &mut Document, expansion: &Expansion) {
        let Some(slot) = doc.get_mut(&expansion.field) else {
            return;
        };
        let Some(id) = slot.as_str().map(str::to_string) else {
            return;
        };
        *slot = match self.lookup(&expansion.collection, &id) {
            Some(referenced) => expansion.projection.apply(referenced),
            None => JsonValue::Null,
        };
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load records, skipping ones that fail to insert.
    pub fn seed(&self, collection: &str, docs: impl IntoIterator<Item = Document>) -> usize {
        let mut inner = self.inner.write();
        let mut loaded = 0;
        for doc in docs {
            match inner.push(collection, doc) {
                Ok(_) => loaded += 1,
                Err(e) => tracing::warn!(collection, error = %e, "skipping seed record"),
            }
        }
        loaded
    }
}

#[async_trait::async_trait]
impl Storage for InMemoryStore {
    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let _timer = SCAN_SECONDS
            .with_label_values(&[collection, "count"])
            .start_timer();
        let inner = self.inner.read();
        let n = inner
            .collections
            .get(collection)
            .map(|records| records.iter().filter(|d| filter.matches(d)).count())
            .unwrap_or(0);
        Ok(n as u64)
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        opts: FindOptions,
    ) -> Result<Vec<Document>> {
        let _timer = SCAN_SECONDS
            .with_label_values(&[collection, "find"])
            .start_timer();
        let inner = self.inner.read();
        let Some(records) = inner.collections.get(collection) else {
            return Ok(Vec::new());
        };
        let limit = opts.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let mut out = Vec::new();
        for doc in records
            .iter()
            .filter(|d| filter.matches(d))
            .skip(opts.skip as usize)
            .take(limit)
        {
            let mut projected = opts.projection.apply(doc);
            if let Some(expansion) = &opts.expand {
                inner.expand(&mut projected, expansion);
            }
            out.push(projected);
        }
        Ok(out)
    }

    async fn get(&self, collection: &str, id: &str, projection: &Projection) -> Result<Document> {
        let inner = self.inner.read();
        inner
            .lookup(collection, id)
            .map(|d| projection.apply(d))
            .ok_or(BoardError::NotFound)
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document> {
        self.inner.write().push(collection, doc)
    }

    fn collection_sizes(&self) -> BTreeMap<String, usize> {
        let inner = self.inner.read();
        inner
            .collections
            .iter()
            .map(|(name, records)| (name.clone(), records.len()))
            .collect()
    }
}
