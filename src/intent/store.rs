//! The Intent Store façade (§4.C): a uniform interface over a vector
//! collection, with one concrete in-process implementation backed by a
//! brute-force cosine-similarity scan and a JSON snapshot on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::embedding::EmbeddingFn;
use crate::error::{Error, Result};

/// The reserved record id holding the collection's configuration hash.
pub const COLLECTION_METADATA_ID: &str = "__collection_metadata__";

/// One stored intent node, keyed by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRecord {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    pub embedding: Vec<f32>,
}

/// One result of a similarity query.
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub id: String,
    pub text: String,
    pub metadata: BTreeMap<String, Value>,
    pub similarity: f32,
}

/// Merge a partial metadata update into an existing metadata map following
/// the store-wide merge rule (§4.C): list-valued keys are combined with any
/// existing list under that key (order-preserving de-duplication), other
/// keys overwrite.
pub fn merge_metadata(existing: &mut BTreeMap<String, Value>, partial: BTreeMap<String, Value>) {
    for (key, new_value) in partial {
        if let Value::Array(new_items) = &new_value {
            let mut merged: Vec<Value> = match existing.get(&key) {
                Some(Value::Array(items)) => items.clone(),
                Some(Value::String(s)) => serde_json::from_str(s).unwrap_or_default(),
                _ => Vec::new(),
            };
            for item in new_items {
                if !merged.contains(item) {
                    merged.push(item.clone());
                }
            }
            existing.insert(key, Value::Array(merged));
        } else {
            existing.insert(key, new_value);
        }
    }
}

/// The façade the cognitive loop and the intent index builder depend on.
/// Kept as a trait so the backing vector engine stays swappable (§9).
#[async_trait]
pub trait IntentStore: Send + Sync {
    /// Idempotent insert. Overwrites text, metadata, and embedding if `id`
    /// already exists.
    async fn put_item(&self, id: &str, text: &str, metadata: BTreeMap<String, Value>) -> Result<()>;

    /// Merge `partial` into an existing record's metadata. A no-op (not an
    /// error) if `id` does not exist.
    async fn update_metadata(&self, id: &str, partial: BTreeMap<String, Value>) -> Result<()>;

    /// The `n` most similar records to `text`, descending by similarity,
    /// restricted to records whose metadata matches `where_clause` by
    /// equality on every key (e.g. `{"type": "L1"}`), or unrestricted if
    /// `where_clause` is `None` (§4.C, §9).
    async fn query_by_text(
        &self,
        text: &str,
        n: usize,
        where_clause: Option<&BTreeMap<String, Value>>,
    ) -> Result<Vec<QueryHit>>;

    async fn get_by_id(&self, id: &str) -> Result<Option<IntentRecord>>;

    /// Delete every record, including the collection-metadata record.
    async fn clear(&self) -> Result<()>;

    async fn load_collection_metadata(&self) -> Result<BTreeMap<String, Value>>;

    async fn save_collection_metadata(&self, partial: BTreeMap<String, Value>) -> Result<()>;
}

#[derive(Default, Serialize, Deserialize)]
struct Snapshot {
    records: BTreeMap<String, IntentRecord>,
}

/// An embedded, in-process `IntentStore` keeping all records in memory and
/// persisting them to a single JSON file on every write, reloaded at
/// construction (mirrors the donor's "collection directory is the only
/// durable state" contract, §6).
pub struct InMemoryIntentStore {
    path: PathBuf,
    embed: Arc<dyn EmbeddingFn>,
    records: RwLock<BTreeMap<String, IntentRecord>>,
}

impl InMemoryIntentStore {
    /// Load `persist_dir/<collection_name>.json` if present, else start
    /// empty. The directory is created on first write if it does not exist.
    pub async fn open(persist_dir: &Path, collection_name: &str, embed: Arc<dyn EmbeddingFn>) -> Result<Self> {
        let path = persist_dir.join(format!("{}.json", collection_name));
        let records = if path.exists() {
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::StoreIo(format!("failed to read snapshot {}: {}", path.display(), e)))?;
            let snapshot: Snapshot = serde_json::from_str(&content)
                .map_err(|e| Error::StoreIo(format!("failed to parse snapshot {}: {}", path.display(), e)))?;

            let expected = embed.dimensions();
            if let Some(mismatch) = snapshot
                .records
                .values()
                .find(|r| !r.embedding.is_empty() && r.embedding.len() != expected)
            {
                return Err(Error::StoreIo(format!(
                    "snapshot {} was built with a {}-dimensional embedding function, but the configured one produces {} ('{}')",
                    path.display(),
                    mismatch.embedding.len(),
                    expected,
                    mismatch.id,
                )));
            }

            snapshot.records
        } else {
            BTreeMap::new()
        };

        Ok(InMemoryIntentStore {
            path,
            embed,
            records: RwLock::new(records),
        })
    }

    async fn persist(&self, records: &BTreeMap<String, IntentRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::StoreIo(format!("failed to create {}: {}", parent.display(), e)))?;
        }
        let snapshot = Snapshot { records: records.clone() };
        let content = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| Error::StoreIo(format!("failed to write snapshot {}: {}", self.path.display(), e)))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl IntentStore for InMemoryIntentStore {
    async fn put_item(&self, id: &str, text: &str, metadata: BTreeMap<String, Value>) -> Result<()> {
        let embedding = self.embed.embed(text).await?;
        let mut records = self.records.write().await;
        records.insert(
            id.to_string(),
            IntentRecord {
                id: id.to_string(),
                text: text.to_string(),
                metadata,
                embedding,
            },
        );
        self.persist(&records).await
    }

    async fn update_metadata(&self, id: &str, partial: BTreeMap<String, Value>) -> Result<()> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(id) {
            merge_metadata(&mut record.metadata, partial);
            self.persist(&records).await?;
        }
        Ok(())
    }

    async fn query_by_text(
        &self,
        text: &str,
        n: usize,
        where_clause: Option<&BTreeMap<String, Value>>,
    ) -> Result<Vec<QueryHit>> {
        let query_embedding = self.embed.embed(text).await?;
        let records = self.records.read().await;

        let mut hits: Vec<QueryHit> = records
            .values()
            .filter(|r| r.id != COLLECTION_METADATA_ID)
            .filter(|r| match where_clause {
                Some(where_clause) => where_clause.iter().all(|(k, v)| r.metadata.get(k) == Some(v)),
                None => true,
            })
            .map(|r| QueryHit {
                id: r.id.clone(),
                text: r.text.clone(),
                metadata: r.metadata.clone(),
                similarity: cosine_similarity(&query_embedding, &r.embedding),
            })
            .collect();

        hits.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(n);
        debug!("query_by_text('{}') matched {} of {} records", text, hits.len(), records.len());
        Ok(hits)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<IntentRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn clear(&self) -> Result<()> {
        let mut records = self.records.write().await;
        records.clear();
        self.persist(&records).await
    }

    async fn load_collection_metadata(&self) -> Result<BTreeMap<String, Value>> {
        Ok(self
            .records
            .read()
            .await
            .get(COLLECTION_METADATA_ID)
            .map(|r| r.metadata.clone())
            .unwrap_or_default())
    }

    async fn save_collection_metadata(&self, partial: BTreeMap<String, Value>) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .entry(COLLECTION_METADATA_ID.to_string())
            .or_insert_with(|| IntentRecord {
                id: COLLECTION_METADATA_ID.to_string(),
                text: String::new(),
                metadata: BTreeMap::new(),
                embedding: Vec::new(),
            });
        merge_metadata(&mut record.metadata, partial);
        self.persist(&records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::embedding::EmbeddingFn;
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::tempdir;

    struct DeterministicEmbedFn;

    #[async_trait]
    impl EmbeddingFn for DeterministicEmbedFn {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0_f32; 16];
            for (i, b) in text.bytes().enumerate() {
                v[i % 16] += b as f32;
            }
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            16
        }
    }

    #[test]
    fn merge_metadata_dedupes_lists_preserving_order() {
        let mut existing = BTreeMap::new();
        existing.insert("tools".to_string(), json!(["tool::a::x", "tool::b::y"]));
        let mut partial = BTreeMap::new();
        partial.insert("tools".to_string(), json!(["tool::b::y", "tool::c::z"]));

        merge_metadata(&mut existing, partial);

        assert_eq!(existing["tools"], json!(["tool::a::x", "tool::b::y", "tool::c::z"]));
    }

    #[test]
    fn merge_metadata_overwrites_non_list_values() {
        let mut existing = BTreeMap::new();
        existing.insert("schema".to_string(), json!({"old": true}));
        let mut partial = BTreeMap::new();
        partial.insert("schema".to_string(), json!({"new": true}));

        merge_metadata(&mut existing, partial);

        assert_eq!(existing["schema"], json!({"new": true}));
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = InMemoryIntentStore::open(dir.path(), "test", Arc::new(DeterministicEmbedFn)).await.unwrap();

        let mut metadata = BTreeMap::new();
        metadata.insert("type".to_string(), json!("L1"));
        store.put_item("intent::L1::a::x", "sends an email", metadata).await.unwrap();

        let record = store.get_by_id("intent::L1::a::x").await.unwrap().unwrap();
        assert_eq!(record.text, "sends an email");
    }

    #[tokio::test]
    async fn get_by_id_returns_none_not_error_for_missing_id() {
        let dir = tempdir().unwrap();
        let store = InMemoryIntentStore::open(dir.path(), "test", Arc::new(DeterministicEmbedFn)).await.unwrap();
        assert!(store.get_by_id("does-not-exist").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn query_by_text_excludes_collection_metadata_record() {
        let dir = tempdir().unwrap();
        let store = InMemoryIntentStore::open(dir.path(), "test", Arc::new(DeterministicEmbedFn)).await.unwrap();

        store.put_item("intent::L1::a::x", "sends an email", BTreeMap::new()).await.unwrap();
        let mut meta = BTreeMap::new();
        meta.insert("config_hash".to_string(), json!("abc123"));
        store.save_collection_metadata(meta).await.unwrap();

        let hits = store.query_by_text("sends an email", 10, None).await.unwrap();
        assert!(hits.iter().all(|h| h.id != COLLECTION_METADATA_ID));
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn query_by_text_restricts_to_where_clause_type() {
        let dir = tempdir().unwrap();
        let store = InMemoryIntentStore::open(dir.path(), "test", Arc::new(DeterministicEmbedFn)).await.unwrap();

        let mut l1_metadata = BTreeMap::new();
        l1_metadata.insert("type".to_string(), json!("L1"));
        store.put_item("intent::L1::a::x", "sends an email", l1_metadata).await.unwrap();

        let mut l2_metadata = BTreeMap::new();
        l2_metadata.insert("type".to_string(), json!("L2"));
        store.put_item("intent::L2::a::0", "sends an email", l2_metadata).await.unwrap();

        let mut filter = BTreeMap::new();
        filter.insert("type".to_string(), json!("L1"));
        let hits = store.query_by_text("sends an email", 10, Some(&filter)).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "intent::L1::a::x");
    }

    #[tokio::test]
    async fn snapshot_persists_and_reloads() {
        let dir = tempdir().unwrap();
        {
            let store = InMemoryIntentStore::open(dir.path(), "test", Arc::new(DeterministicEmbedFn)).await.unwrap();
            store.put_item("intent::L1::a::x", "sends an email", BTreeMap::new()).await.unwrap();
        }
        let reopened = InMemoryIntentStore::open(dir.path(), "test", Arc::new(DeterministicEmbedFn)).await.unwrap();
        assert!(reopened.get_by_id("intent::L1::a::x").await.unwrap().is_some());
    }

    struct NarrowEmbedFn;

    #[async_trait]
    impl EmbeddingFn for NarrowEmbedFn {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32; 4])
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    #[tokio::test]
    async fn reopening_with_a_mismatched_embedding_function_is_rejected() {
        let dir = tempdir().unwrap();
        {
            let store = InMemoryIntentStore::open(dir.path(), "test", Arc::new(DeterministicEmbedFn)).await.unwrap();
            store.put_item("intent::L1::a::x", "sends an email", BTreeMap::new()).await.unwrap();
        }

        let reopened = InMemoryIntentStore::open(dir.path(), "test", Arc::new(NarrowEmbedFn)).await;
        assert!(reopened.is_err());
    }
}
