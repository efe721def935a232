use std::sync::Arc;

use distill_pipeline::{StoreQueue, Submitter};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SubmitArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `distill submit`.
pub async fn handle(args: &SubmitArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let queue = Arc::new(StoreQueue::from_config(Arc::clone(&ctx.store), &ctx.config.queue));
    let submitter = Submitter::new(Arc::clone(&ctx.store), queue, ctx.config.queue.search_queue.as_str());
    let request = submitter.submit(&args.topic).await?;
    output(&request, flags.format)
}
