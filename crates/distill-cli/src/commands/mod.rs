pub mod list;
pub mod metrics;
pub mod status;
pub mod submit;
pub mod sweep;
pub mod worker;

use crate::cli::{Commands, GlobalFlags};
use crate::context::AppContext;

/// Dispatch a parsed command to its handler.
pub async fn dispatch(command: Commands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Submit(args) => submit::handle(&args, ctx, flags).await,
        Commands::Status(args) => status::handle(&args, ctx, flags).await,
        Commands::List(args) => list::handle(&args, ctx, flags).await,
        Commands::Metrics => metrics::handle(ctx, flags).await,
        Commands::Worker(args) => worker::handle(&args, ctx).await,
        Commands::Sweep(args) => sweep::handle(&args, ctx, flags).await,
    }
}
