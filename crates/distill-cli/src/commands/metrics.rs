use std::collections::BTreeMap;

use distill_core::responses::PipelineMetrics;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

#[derive(Serialize)]
struct MetricsReport {
    #[serde(flatten)]
    metrics: PipelineMetrics,
    /// Unacknowledged messages per stage queue.
    queue_depth: BTreeMap<String, u64>,
}

/// Handle `distill metrics`.
pub async fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let metrics = ctx.store.metrics().await?;
    let mut queue_depth = BTreeMap::new();
    for queue in [&ctx.config.queue.search_queue, &ctx.config.queue.analysis_queue] {
        queue_depth.insert(queue.clone(), ctx.store.queue_depth(queue).await?);
    }
    output(&MetricsReport { metrics, queue_depth }, flags.format)
}
