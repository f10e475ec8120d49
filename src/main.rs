mod config;
mod llm;
mod pipeline;
mod platform;
mod registry;
mod search;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::llm::{LlmClient, TextGenerator};
use crate::pipeline::Pipeline;
use crate::platform::telegram::AppState;
use crate::registry::UserRegistry;
use crate::search::GoogleSearchClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,media_search_bot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!(
        "  Profile: qualifier={:?}, spoiler_in_groups={}, ai_query={}",
        config.profile.language_qualifier, config.profile.spoiler_in_groups, config.profile.ai_query
    );
    info!(
        "  Mode: {}",
        config
            .webhook
            .as_ref()
            .map(|w| format!("webhook on {}", w.listen_addr))
            .unwrap_or_else(|| "long polling".to_string())
    );

    let generator = match &config.llm {
        Some(llm) => {
            info!("  LLM: {} ({})", llm.provider, llm.effective_model());
            Some(Arc::new(LlmClient::new(llm.clone())?) as Arc<dyn TextGenerator>)
        }
        None => {
            info!("  LLM: disabled, using fixed query template and fail-open intent gate");
            None
        }
    };

    let search = Arc::new(GoogleSearchClient::new(config.search.clone())?);

    let registry = match &config.registry {
        Some(registry_config) => {
            let registry = UserRegistry::open(&registry_config.database_path)?;
            info!("  Registry: {} known chat(s)", registry.count().await?);
            Some(registry)
        }
        None => {
            info!("  Registry: disabled");
            None
        }
    };

    let pipeline = Pipeline::new(config.profile.clone(), generator, search);

    // Create shared state
    let state = Arc::new(AppState::new(pipeline, registry, config.telegram.clone()));

    // Run the Telegram bot
    info!("Bot is starting...");
    platform::telegram::run(state, config.webhook.clone()).await?;

    Ok(())
}
