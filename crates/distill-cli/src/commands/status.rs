use anyhow::Context;
use distill_core::ids::RequestId;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::StatusArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `distill status`.
pub async fn handle(args: &StatusArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let id: RequestId = args.id.parse()?;
    let detail = ctx
        .store
        .get_request_detail(&id)
        .await
        .with_context(|| format!("request {id} not found"))?;
    output(&detail, flags.format)
}
