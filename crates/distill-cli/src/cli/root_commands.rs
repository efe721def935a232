use clap::{Args, Subcommand, ValueEnum};
use distill_core::enums::{Stage, WorkerKind};
use distill_db::repos::request::MAX_PAGE_SIZE;

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Create a request for a topic and queue its search.
    Submit(SubmitArgs),
    /// Show one request with its documents and summary.
    Status(StatusArgs),
    /// List requests, newest first.
    List(ListArgs),
    /// Aggregate pipeline metrics and queue depths.
    Metrics,
    /// Run a stage worker until Ctrl-C.
    Worker(WorkerArgs),
    /// Fail stale claims, requeue stranded requests, purge acknowledged messages.
    Sweep(SweepArgs),
}

#[derive(Clone, Debug, Args)]
pub struct SubmitArgs {
    /// Topic to research and summarize.
    pub topic: String,
}

#[derive(Clone, Debug, Args)]
pub struct StatusArgs {
    /// Request id.
    pub id: String,
}

#[derive(Clone, Debug, Args)]
pub struct ListArgs {
    /// Only requests in this stage.
    #[arg(long, value_parser = parse_stage)]
    pub stage: Option<Stage>,

    /// Page size, at most 100.
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_PAGE_SIZE)))]
    pub limit: u32,

    #[arg(long, default_value_t = 0)]
    pub offset: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum WorkerRole {
    Search,
    Analysis,
}

impl From<WorkerRole> for WorkerKind {
    fn from(role: WorkerRole) -> Self {
        match role {
            WorkerRole::Search => Self::Search,
            WorkerRole::Analysis => Self::Analysis,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct WorkerArgs {
    /// Which stage this worker runs.
    #[arg(value_enum)]
    pub role: WorkerRole,
}

#[derive(Clone, Debug, Args)]
pub struct SweepArgs {
    /// Override `worker.stale_claim_secs`.
    #[arg(long)]
    pub older_than_secs: Option<u64>,
}

fn parse_stage(s: &str) -> Result<Stage, String> {
    s.parse().map_err(|e: distill_core::errors::CoreError| e.to_string())
}
