//! The Intent Index Builder (§4.E): rebuilds the L1/L2 intent hierarchy
//! from the capability host's tool listing whenever the manifest's
//! configuration hash has changed since the last run.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use super::hash::config_hash;
use super::store::IntentStore;
use crate::capability::{CapabilityHost, ToolDescriptor};
use crate::error::Result;
use crate::llm::{GenerationOptions, LlmClient, Message, ToolChoice};
use crate::prompts::{names, PromptRenderer};

/// Builds and maintains the intent index against a capability host and an
/// intent store.
pub struct IntentIndexBuilder {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn IntentStore>,
    renderer: Arc<PromptRenderer>,
    insertion_threshold: f32,
}

impl IntentIndexBuilder {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn IntentStore>,
        renderer: Arc<PromptRenderer>,
        insertion_threshold: f32,
    ) -> Self {
        IntentIndexBuilder {
            llm,
            store,
            renderer,
            insertion_threshold,
        }
    }

    /// Compare `hash(manifest)` against the stored `config_hash`. If equal,
    /// return immediately; otherwise clear the collection, rebuild from the
    /// host's current tool listing, and write the new hash last, so a
    /// crash mid-rebuild is recovered by simply retrying at next startup
    /// (§4.E, §5).
    pub async fn rebuild_if_needed(&self, host: &CapabilityHost, manifest: &Value) -> Result<()> {
        let hash = config_hash(manifest);
        let metadata = self.store.load_collection_metadata().await?;
        if metadata.get("config_hash").and_then(|v| v.as_str()) == Some(hash.as_str()) {
            info!("intent index up to date (config_hash={})", hash);
            return Ok(());
        }

        info!("rebuilding intent index (config_hash changed)");
        self.store.clear().await?;
        self.rebuild(host).await?;

        let mut new_metadata = BTreeMap::new();
        new_metadata.insert("config_hash".to_string(), json!(hash));
        self.store.save_collection_metadata(new_metadata).await?;
        Ok(())
    }

    async fn rebuild(&self, host: &CapabilityHost) -> Result<()> {
        let tools = host.list_all_tools().await?;

        let mut by_server: BTreeMap<String, Vec<ToolDescriptor>> = BTreeMap::new();
        for tool in tools {
            by_server.entry(tool.server_name.clone()).or_default().push(tool);
        }

        for (server, tools) in by_server {
            let mut l1_texts = Vec::new();
            for tool in tools {
                let text = self.generate_l1_text(&tool).await?;
                let effective_text = self.upsert_l1(&server, &tool, &text).await?;
                l1_texts.push(effective_text);
            }

            if !l1_texts.is_empty() {
                self.generate_and_upsert_l2(&server, &l1_texts).await?;
            }
        }

        Ok(())
    }

    async fn generate_l1_text(&self, tool: &ToolDescriptor) -> Result<String> {
        let prompt = self.renderer.render(
            names::GENERATE_L1_INTENT,
            &json!({
                "server_name": tool.server_name,
                "tool_name": tool.tool_name,
                "description": tool.description,
                "input_schema": tool.input_schema,
            }),
        )?;

        let response = self
            .llm
            .complete(
                vec![Message::user(prompt)],
                vec![],
                ToolChoice::Auto,
                GenerationOptions::deterministic(),
            )
            .await?;

        Ok(response
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default())
    }

    /// UPSERT one tool's L1 text against the existing L1 set. Returns the
    /// *effective* text to use downstream for L2 generation: the existing
    /// record's text on merge, the newly generated text on insert (§4.E
    /// step 1.c).
    async fn upsert_l1(&self, server: &str, tool: &ToolDescriptor, text: &str) -> Result<String> {
        let mut l1_only = BTreeMap::new();
        l1_only.insert("type".to_string(), json!("L1"));
        let hits = self.store.query_by_text(text, 1, Some(&l1_only)).await?;

        if let Some(top) = hits.first() {
            if top.similarity >= self.insertion_threshold {
                let mut tools_update = BTreeMap::new();
                tools_update.insert("tools".to_string(), json!([tool.uri()]));
                self.store.update_metadata(&top.id, tools_update).await?;

                if !top.metadata.contains_key("schema") {
                    let mut schema_update = BTreeMap::new();
                    schema_update.insert("schema".to_string(), tool.input_schema.clone());
                    self.store.update_metadata(&top.id, schema_update).await?;
                }

                return Ok(top.text.clone());
            }
        }

        let id = format!("intent::L1::{}::{}", server, tool.tool_name);
        let mut metadata = BTreeMap::new();
        metadata.insert("type".to_string(), json!("L1"));
        metadata.insert("tools".to_string(), json!([tool.uri()]));
        metadata.insert("schema".to_string(), tool.input_schema.clone());
        self.store.put_item(&id, text, metadata).await?;
        Ok(text.to_string())
    }

    async fn generate_and_upsert_l2(&self, server: &str, l1_texts: &[String]) -> Result<()> {
        let prompt = self.renderer.render(
            names::GENERATE_L2_INTENT,
            &json!({
                "server_name": server,
                "l1_texts": l1_texts,
            }),
        )?;

        let response = self
            .llm
            .complete(
                vec![Message::user(prompt)],
                vec![],
                ToolChoice::Auto,
                GenerationOptions::deterministic(),
            )
            .await?;

        let content = response.choices.first().map(|c| c.message.content.as_str()).unwrap_or("");
        let groups = parse_l2_blocks(content);

        for (group_index, (label, items)) in groups.into_iter().enumerate() {
            self.upsert_l2(server, group_index, &label, items).await?;
        }

        Ok(())
    }

    /// UPSERT one L2 group against the existing L2 set, using the same
    /// order-preserving de-duplication rule as §4.C for the merged
    /// `l1_intents` list (see DESIGN.md: this re-implementation applies the
    /// uniform merge rule here too, rather than replicating the donor's
    /// one-off unordered-set merge for this call site).
    async fn upsert_l2(&self, server: &str, group_index: usize, label: &str, l1_texts: Vec<String>) -> Result<()> {
        let mut l2_only = BTreeMap::new();
        l2_only.insert("type".to_string(), json!("L2"));
        let hits = self.store.query_by_text(label, 1, Some(&l2_only)).await?;

        if let Some(top) = hits.first() {
            if top.similarity >= self.insertion_threshold {
                let mut partial = BTreeMap::new();
                partial.insert("l1_intents".to_string(), json!(l1_texts));
                self.store.update_metadata(&top.id, partial).await?;
                return Ok(());
            }
        }

        let id = format!("intent::L2::{}::{}", server, group_index);
        let mut metadata = BTreeMap::new();
        metadata.insert("type".to_string(), json!("L2"));
        metadata.insert("l1_intents".to_string(), json!(l1_texts));
        self.store.put_item(&id, label, metadata).await?;
        Ok(())
    }
}

/// Parse an L2 generation response into `(label, l1_texts)` groups per the
/// `L2 Intent: <label>` / `L1 Intents:` / `- <text>` grammar, with blocks
/// separated by a `[GROUP]` line. Malformed blocks are skipped with a
/// warning rather than aborting the whole parse (§4.E).
pub fn parse_l2_blocks(response: &str) -> Vec<(String, Vec<String>)> {
    let mut groups = Vec::new();

    for block in response.split("[GROUP]") {
        let lines: Vec<&str> = block.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        if lines.is_empty() {
            continue;
        }

        let Some(label_line) = lines.iter().find(|l| l.starts_with("L2 Intent:")) else {
            warn!("skipping malformed L2 block: missing 'L2 Intent:' line");
            continue;
        };
        let label = label_line["L2 Intent:".len()..].trim().to_string();
        if label.is_empty() {
            warn!("skipping malformed L2 block: empty label");
            continue;
        }

        if !lines.iter().any(|l| l.starts_with("L1 Intents:")) {
            warn!("skipping malformed L2 block '{}': missing 'L1 Intents:' header", label);
            continue;
        }

        let items: Vec<String> = lines
            .iter()
            .filter(|l| l.starts_with("- "))
            .map(|l| l[2..].trim().to_string())
            .collect();

        groups.push((label, items));
    }

    groups
}
