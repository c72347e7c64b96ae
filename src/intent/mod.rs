//! The intent index (§3, §4.C, §4.E): a two-level (tool-level / category-level)
//! hierarchy over a vector store, rebuilt from the capability host's tool
//! listing whenever the manifest changes.

mod builder;
mod embedding;
mod hash;
mod store;

pub use builder::{parse_l2_blocks, IntentIndexBuilder};
pub use embedding::{EmbeddingFn, FastEmbedFn};
pub use hash::{canonical_json, config_hash};
pub use store::{merge_metadata, InMemoryIntentStore, IntentRecord, IntentStore, QueryHit, COLLECTION_METADATA_ID};
