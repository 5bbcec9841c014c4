use clap::{ArgAction, Parser};
use color_eyre::eyre::eyre;
use indicatif::{ProgressBar, ProgressStyle};
use review_stream_config::{PathManager, ScrapeConfig};
use review_stream_core::ScrapePipeline;
use review_stream_sources::{MapsTransport, PlaceId};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod logging;
mod output;

#[derive(Parser)]
#[command(name = "reviewstream")]
#[command(about = "Fetch every review of a Google Maps place, walking the list from both ends at once")]
#[command(version)]
struct Cli {
    /// Google Maps place URL, or a bare place id (0x…:0x…)
    #[arg(value_name = "URL")]
    url: String,

    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Config file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory the JSON result file is written to (defaults to the
    /// current directory)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Also write logs to this file (rotated daily)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Also write logs to the default log directory (rotated daily)
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "log_file")]
    log_to_file: bool,

    /// Bound of the fetch/decode queue
    #[arg(long, value_name = "N")]
    queue_size: Option<usize>,

    /// Number of concurrent decode workers
    #[arg(long, value_name = "N")]
    consumers: Option<usize>,

    /// Stop once this many unique reviews have been collected
    #[arg(long, value_name = "N")]
    max_records: Option<usize>,

    /// Drop reviews that carry neither text nor a rating
    #[arg(long, action = ArgAction::SetTrue)]
    require_content: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let paths = PathManager::new().map_err(|e| eyre!("{e:#}"))?;

    let log_file = cli.log_file.clone().or_else(|| {
        cli.log_to_file
            .then(|| paths.log_dir().join("reviewstream.log"))
    });
    logging::init_logging(cli.verbose, cli.quiet, log_file).map_err(|e| eyre!("{}", e))?;

    let out = output::Output::new(cli.output, cli.quiet);

    let place_id = match PlaceId::from_url(&cli.url)
        .or_else(|| cli.url.contains(":0x").then(|| PlaceId::new(&cli.url)))
    {
        Some(place_id) => place_id,
        None => {
            out.error(format!("No place id found in '{}'", cli.url));
            return Err(eyre!("unrecognized place URL or id"));
        }
    };

    let config_path = cli.config.unwrap_or_else(|| paths.config_file());
    let mut config = ScrapeConfig::load(&config_path).map_err(|e| eyre!("{e:#}"))?;
    if let Some(n) = cli.queue_size {
        config.pipeline.max_queue_size = n;
    }
    if let Some(n) = cli.consumers {
        config.pipeline.num_consumers = n;
    }
    if let Some(n) = cli.max_records {
        config.pipeline.max_records = Some(n);
    }
    if cli.require_content {
        config.pipeline.require_content = true;
    }

    let transport = Arc::new(MapsTransport::new(place_id.clone(), &config.http));
    let pipeline = ScrapePipeline::new(config.pipeline.clone())?;

    // First ctrl-c drains in-flight work instead of killing the process.
    let stop = pipeline.stop_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing in-flight work");
            stop.trigger();
        }
    });

    out.info(format!("Fetching reviews for place {place_id}"));
    let spinner = if !cli.quiet && out.format() == output::OutputFormat::Human {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Fetching review pages from both ends...");
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let outcome = pipeline.run(transport).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let output_dir = cli
        .output_dir
        .unwrap_or_else(|| paths.output_dir().to_path_buf());
    let path = output::write_reviews(&output_dir, &place_id, &outcome)
        .map_err(|e| eyre!("{e:#}"))?;

    out.success(format!(
        "{} unique reviews ({} duplicates discarded) -> {}",
        outcome.reviews.len(),
        outcome.duplicates_discarded,
        path.display()
    ));
    for summary in &outcome.directions {
        out.info(format!(
            "  {}: {} pages, {} records",
            summary.direction, summary.pages_fetched, summary.records_pushed
        ));
        if let Some(token) = &summary.resume_token {
            out.warn(format!(
                "  {} direction stopped early; resume token: {}",
                summary.direction, token
            ));
        }
    }

    Ok(())
}
