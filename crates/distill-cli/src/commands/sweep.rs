use std::sync::Arc;
use std::time::Duration;

use distill_core::enums::Stage;
use distill_pipeline::{StoreQueue, requeue_stranded};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SweepArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `distill sweep`.
///
/// Fails stale claims, requeues requests waiting on a task that was never
/// published, and purges old acknowledged queue messages.
pub async fn handle(args: &SweepArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let older_than = args
        .older_than_secs
        .map_or_else(|| ctx.config.worker.stale_claim_age(), Duration::from_secs);
    let queues = &ctx.config.queue;

    let swept = ctx.store.sweep_stale_claims(older_than).await?;

    let queue = StoreQueue::from_config(Arc::clone(&ctx.store), queues);
    let requeued_search =
        requeue_stranded(&ctx.store, &queue, Stage::Searching, &queues.search_queue, older_than).await?;
    let requeued_analysis =
        requeue_stranded(&ctx.store, &queue, Stage::Analyzing, &queues.analysis_queue, older_than).await?;

    let purged = ctx.store.purge_acked_messages(queues.acked_retention()).await?;

    output(
        &serde_json::json!({
            "swept": swept,
            "requeued_search": requeued_search,
            "requeued_analysis": requeued_analysis,
            "purged_messages": purged,
            "older_than_secs": older_than.as_secs(),
        }),
        flags.format,
    )
}
