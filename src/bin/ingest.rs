use anyhow::Result;
use clap::Parser;
use subsift::{init_tracing_once, run_ingest, FsArchive, PipelineOptions, RedditClient, Store};

const USER_AGENT: &str = concat!("subsift/", env!("CARGO_PKG_VERSION"), " (subreddit mirror)");

/// Mirror recent posts and comments for a subreddit into the local database.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Database file path (created if missing)
    #[arg(long, default_value = "subsift.sqlite")]
    db: std::path::PathBuf,

    /// Subreddit to mirror (with or without the "r/" prefix)
    #[arg(long, default_value = "nyu")]
    subreddit: String,

    /// Only ingest items newer than this many days
    #[arg(long)]
    days: Option<u32>,

    /// Maximum number of listing posts to walk (API caps around 1000)
    #[arg(long, default_value_t = 1000)]
    limit: usize,

    /// Skip comment trees (faster, gentler on rate limits)
    #[arg(long)]
    posts_only: bool,

    /// Also write raw documents to a filesystem archive at this root
    #[arg(long)]
    archive_dir: Option<std::path::PathBuf>,
}

fn main() -> Result<()> {
    init_tracing_once();
    let args = Args::parse();

    let opts = PipelineOptions::default()
        .with_db_path(&args.db)
        .with_subreddit(&args.subreddit)
        .with_lookback_days(args.days)
        .with_post_limit(args.limit)
        .with_posts_only(args.posts_only)
        .with_archive_dir(args.archive_dir.clone());

    let store = Store::create_or_open(&opts.db_path)?;
    let client = RedditClient::new(USER_AGENT)?;
    let archive = match &opts.archive_dir {
        Some(dir) => Some(FsArchive::open(dir)?),
        None => None,
    };

    run_ingest(&store, &client, &opts, archive.as_ref())?;
    Ok(())
}
