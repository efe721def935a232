use std::sync::Arc;

use anyhow::Context;
use distill_core::enums::WorkerKind;
use distill_inference::{ContextReducer, TokenBudget, VllmEngine, resolve_tier};
use distill_pipeline::{AnalysisStage, SearchStage, StageHandler, StoreQueue, TaskQueue, Worker};
use distill_search::SearxngFetcher;
use tokio_util::sync::CancellationToken;

use crate::cli::root_commands::WorkerArgs;
use crate::context::AppContext;

/// Handle `distill worker`.
///
/// Startup faults (unreachable engine, bad client config) end the process;
/// once running, per-request faults never do.
pub async fn handle(args: &WorkerArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let queue: Arc<dyn TaskQueue> = Arc::new(StoreQueue::from_config(Arc::clone(&ctx.store), &ctx.config.queue));

    match WorkerKind::from(args.role) {
        WorkerKind::Search => {
            let fetcher = SearxngFetcher::new(&ctx.config.search).context("failed to build search client")?;
            let stage = SearchStage::new(
                Arc::new(fetcher),
                Arc::clone(&queue),
                ctx.config.queue.analysis_queue.as_str(),
                ctx.config.search.max_results,
            );
            run(stage, ctx, queue, &ctx.config.queue.search_queue).await;
        }
        WorkerKind::Analysis => {
            let config = &ctx.config.inference;
            let tier = resolve_tier(config).await;
            let engine = VllmEngine::new(&config.base_url, &tier.model, config.request_timeout())
                .context("failed to build inference client")?;
            let served = engine
                .health_check()
                .await
                .with_context(|| format!("inference engine at {} is not serving", config.base_url))?;
            tracing::info!(models = served.len(), model = %tier.model, "inference engine ready");

            let budget = TokenBudget::for_tier(&tier, config);
            tracing::info!(context = budget.context, chunk = budget.chunk, "token budget");
            let reducer = ContextReducer::new(Arc::new(engine), budget, config.language.as_str());
            run(AnalysisStage::new(reducer), ctx, queue, &ctx.config.queue.analysis_queue).await;
        }
    }
    Ok(())
}

async fn run<H: StageHandler>(handler: H, ctx: &AppContext, queue: Arc<dyn TaskQueue>, queue_name: &str) {
    let mut worker = Worker::new(handler, Arc::clone(&ctx.store), queue, queue_name)
        .with_poll_timeout(ctx.config.queue.poll_interval().max(std::time::Duration::from_secs(1)));
    if let Some(every) = ctx.config.worker.sweep_interval() {
        worker = worker
            .with_sweep(ctx.config.worker.stale_claim_age(), every)
            .with_acked_retention(ctx.config.queue.acked_retention());
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
        }
        signal.cancel();
    });

    worker.run(shutdown).await;
}
