use std::io::{self, Write};
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use mood_predict::{Config, Layout, Outcome, PredictError, Prediction};

/// Predict the emotion shown in a face image and print it as JSON
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image file to classify
    #[arg(allow_hyphen_values = true)]
    image: Option<PathBuf>,

    /// Path to the ONNX model [default: model/ResNet50V2_Model.onnx]
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of intra-op threads for inference
    #[arg(long)]
    threads: Option<usize>,

    /// Model input layout: "nhwc" or "nchw"
    #[arg(long)]
    layout: Option<Layout>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let outcome: Outcome = match Args::try_parse() {
        Ok(args) => {
            init_logging(args.verbose);
            run(&args).into()
        }
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => Outcome::Failure(usage_message(&err)),
        },
    };

    let line = outcome.to_json_line()?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    stdout.flush()?;

    Ok(())
}

fn init_logging(verbose: bool) {
    // stdout carries the result line only
    let log_level = if verbose { "debug" } else { "off" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();
}

fn run(args: &Args) -> Result<Prediction, PredictError> {
    // a missing image path wins over any flag or config problem
    let image = args.image.as_deref().ok_or(PredictError::MissingImagePath)?;

    let config = resolve_config(args)?;
    debug!("Config: {:?}", config);

    let result = mood_predict::predict(Some(image), &config);
    if let Err(ref e) = result {
        warn!(kind = e.kind(), "Prediction failed: {}", e);
    }
    result
}

/// Defaults, then the config file, then command-line flags.
fn resolve_config(args: &Args) -> Result<Config, PredictError> {
    let mut config = match &args.config {
        Some(path) => Config::load(path).map_err(|e| PredictError::Usage(format!("{:#}", e)))?,
        None => Config::default(),
    };

    if let Some(model) = &args.model {
        config.model_path = model.clone();
    }
    if let Some(threads) = args.threads {
        if threads == 0 {
            return Err(PredictError::Usage("--threads must be positive".to_string()));
        }
        config.intra_threads = threads;
    }
    if let Some(layout) = args.layout {
        config.layout = layout;
    }

    Ok(config)
}

/// First line of a clap error, without its "error: " prefix.
fn usage_message(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}
