use anyhow::Result;
use clap::Parser;
use subsift::{init_tracing_once, run_topics, Store, TermSet};

/// Recompute daily topic-mention counts and rates from the mirrored items.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Database file path (must already exist)
    #[arg(long, default_value = "subsift.sqlite")]
    db: std::path::PathBuf,

    /// Truncate the aggregate tables before recomputing
    #[arg(long)]
    rebuild: bool,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
}

fn main() -> Result<()> {
    init_tracing_once();
    let args = Args::parse();

    let store = Store::open_existing(&args.db)?;
    let terms = TermSet::builtin();
    run_topics(&store, &terms, args.rebuild, !args.no_progress)?;
    Ok(())
}
