use std::sync::Arc;

use anyhow::Context;
use distill_config::DistillConfig;
use distill_db::PipelineStore;

/// Loaded configuration plus an open store.
pub struct AppContext {
    pub config: DistillConfig,
    pub store: Arc<PipelineStore>,
}

impl AppContext {
    pub async fn init() -> anyhow::Result<Self> {
        let config = DistillConfig::load_with_dotenv().context("failed to load configuration")?;
        config.validate().context("invalid configuration")?;
        let store = PipelineStore::open(&config.database)
            .await
            .with_context(|| format!("failed to open store at '{}'", config.database.path))?;
        tracing::debug!(path = %config.database.path, "store opened");
        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }
}
