//! Segment frame collector binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;
use tracing::{error, info, warn};

use segframe_media::{check_tools, usable_cookies, CliToolkit};
use segframe_models::{normalize_source, SegmentDescriptor};
use segframe_worker::{
    init_tracing, AcquisitionOrchestrator, BatchRunner, DatasetWriter, MetadataSampler,
    PipelineConfig, DEFAULT_LABEL,
};

#[derive(Parser)]
#[command(name = "segframe")]
#[command(about = "Collect representative frames from labelled video segments", long_about = None)]
struct Cli {
    /// Root directory for frames, results and the output table
    #[arg(long, global = true, env = "SEGFRAME_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Whole-pipeline attempts per segment
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sample segments from a catalog and collect one frame for each
    Collect {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long, default_value = DEFAULT_LABEL)]
        label: String,
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
        /// Seed for reproducible sampling
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Collect the frame for a single window
    Grab {
        /// Video id or URL
        #[arg(long)]
        source: String,
        #[arg(long)]
        start: f64,
        #[arg(long)]
        duration: f64,
        #[arg(long, default_value_t = 0)]
        index: u64,
    },
    /// Verify that yt-dlp, FFmpeg and FFprobe are installed
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    if let Command::Check = cli.command {
        return check();
    }

    let mut config = PipelineConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config = config.rebase(dir);
    }
    if let Some(n) = cli.max_attempts {
        config = config.with_max_attempts(n);
    }
    config.validate()?;
    config.ensure_dirs().await?;
    info!("Pipeline config: {:?}", config);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received interrupt, cancelling");
            cancel_tx.send(true).ok();
        }
    });

    let cookies = match &config.cookies_path {
        Some(path) => usable_cookies(path).await,
        None => None,
    };
    let toolkit = CliToolkit::new()
        .with_timeout(config.tool_timeout.as_secs())
        .with_cancel(cancel_rx.clone())
        .with_cookies(cookies);

    let writer = Arc::new(DatasetWriter::open(&config.output_table)?);
    let orchestrator =
        Arc::new(AcquisitionOrchestrator::new(Arc::new(toolkit), config).with_cancel(cancel_rx));

    match cli.command {
        Command::Collect {
            catalog,
            label,
            count,
            seed,
        } => {
            let sampler = MetadataSampler::load(&catalog, &label).await?;
            let descriptors = match seed {
                Some(seed) => sampler.sample_descriptors(count, &mut StdRng::seed_from_u64(seed)),
                None => sampler.sample_descriptors(count, &mut rand::rng()),
            };

            let summary = BatchRunner::new(orchestrator, writer).run(descriptors).await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            if summary.cancelled > 0 {
                anyhow::bail!("interrupted after {} frame(s)", summary.succeeded);
            }
        }
        Command::Grab {
            source,
            start,
            duration,
            index,
        } => {
            let source_id = normalize_source(&source)
                .with_context(|| format!("not a video id or URL: {}", source))?;
            let descriptor = SegmentDescriptor::new(source_id, start, duration, index)?;

            let outcome = orchestrator.acquire(&descriptor).await;
            match (outcome.result, outcome.last_error) {
                (Some(row), _) => {
                    writer.append(&row).await?;
                    println!("{}\t{}\t{}", row.source_url, row.timestamp, row.frame_path.display());
                }
                (None, Some(e)) => {
                    error!("Acquisition failed after {} attempt(s): {}", outcome.attempts, e);
                    anyhow::bail!(e);
                }
                (None, None) => anyhow::bail!("acquisition produced no result"),
            }
        }
        Command::Check => {}
    }

    Ok(())
}

fn check() -> anyhow::Result<()> {
    let tools = check_tools()?;
    for (tool, path) in tools {
        println!("{:<8} {}", tool.program(), path.display());
    }
    Ok(())
}
