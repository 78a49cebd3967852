use anyhow::Result;
use clap::Parser;
use subsift::{
    init_tracing_once, make_spinner, run_classification, BertSequenceClassifier, ModelSpec,
    PipelineOptions, Store, ThresholdTable,
};

/// Score every mirrored post and comment with a pretrained classifier and
/// upsert one classification row per item.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Database file path (must already exist)
    #[arg(long, default_value = "subsift.sqlite")]
    db: std::path::PathBuf,

    /// "toxicity", "hate", or any BERT-family checkpoint id / local dir
    #[arg(long, default_value = "toxicity")]
    model: String,

    /// Inference batch size
    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    /// Per-item token truncation limit
    #[arg(long, default_value_t = 512)]
    max_tokens: usize,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
}

fn main() -> Result<()> {
    init_tracing_once();
    let args = Args::parse();

    let spec = match args.model.as_str() {
        "toxicity" => ModelSpec::toxicity(),
        "hate" => ModelSpec::hate(),
        other => ModelSpec::custom(other, ThresholdTable::toxicity()),
    };

    let opts = PipelineOptions::default()
        .with_db_path(&args.db)
        .with_batch_size(args.batch_size)
        .with_max_input_tokens(args.max_tokens)
        .with_progress(!args.no_progress);

    // A missing database or a broken model aborts before any item is touched.
    let store = Store::open_existing(&opts.db_path)?;
    let spinner = make_spinner(&format!("Loading model {}", spec.model_id));
    let model = BertSequenceClassifier::load(&spec.model_id, opts.max_input_tokens)?;
    spinner.finish_with_message("Model loaded");

    run_classification(&store, &model, &spec, &opts)?;
    Ok(())
}
