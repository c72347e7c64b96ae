//! The kernel: the top-level value that owns every subsystem and exposes
//! `run_task` as the crate's public entry point.
//!
//! This replaces the donor's module-scope mutable globals (`mcp_host`,
//! `collection`, `template_env`) with one explicit, owned value — see
//! DESIGN.md for the redesign rationale.

use std::sync::Arc;

use tracing::info;

use crate::capability::{CapabilityHost, Manifest};
use crate::cognitive_loop::{CognitiveLoop, TaskOutcome};
use crate::config::{validate_config_fatal, Config};
use crate::error::Result;
use crate::intent::{FastEmbedFn, IntentIndexBuilder, InMemoryIntentStore, IntentStore};
use crate::llm::{HttpLlmClient, LlmClient};
use crate::prompts::PromptRenderer;
use crate::trace::TraceLog;

/// Owns the capability host, intent store, prompt renderer, and cognitive
/// loop for one running process.
pub struct Kernel {
    config: Config,
    host: Arc<CapabilityHost>,
    cognitive_loop: CognitiveLoop,
}

impl Kernel {
    /// Validate configuration, start the capability host, open the intent
    /// store, rebuild the intent index if the manifest changed, and wire
    /// the cognitive loop. Any failure here is a startup-fatal error (§7).
    pub async fn start(config: Config) -> Result<Self> {
        validate_config_fatal(&config)?;

        let llm: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::new(&config.llm)?);

        info!("starting capability host from {}", config.capability_manifest.display());
        let host = Arc::new(CapabilityHost::startup(&config.capability_manifest).await?);

        let embed: Arc<dyn crate::intent::EmbeddingFn> = Arc::new(FastEmbedFn::new()?);
        let store: Arc<dyn IntentStore> = Arc::new(
            InMemoryIntentStore::open(
                &config.intent_store.persist_dir,
                &config.intent_store.collection_name,
                embed,
            )
            .await?,
        );

        let renderer = Arc::new(PromptRenderer::new()?);

        let manifest = Manifest::load(&config.capability_manifest)?;
        let manifest_value = serde_json::to_value(&manifest)?;

        let builder = IntentIndexBuilder::new(
            llm.clone(),
            store.clone(),
            renderer.clone(),
            config.intent_store.insertion_threshold,
        );
        builder.rebuild_if_needed(&host, &manifest_value).await?;

        let cognitive_loop = CognitiveLoop::new(
            llm,
            store,
            host.clone(),
            renderer,
            config.intent_store.match_threshold,
        );

        Ok(Kernel { config, host, cognitive_loop })
    }

    /// Run one task, defaulting `max_iterations` to the configured value.
    pub async fn run_task(&self, description: &str, max_iterations: Option<u32>) -> Result<(TaskOutcome, TraceLog)> {
        let max_iterations = max_iterations.unwrap_or(self.config.default_max_iterations);
        self.cognitive_loop.run_task(description, max_iterations).await
    }

    /// Close every capability session in reverse acquisition order.
    pub async fn shutdown(&self) -> Result<()> {
        self.host.shutdown().await
    }
}
