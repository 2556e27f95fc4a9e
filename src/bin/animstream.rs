use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use animstream::{
    ArtifactKind, ExtractionCoordinator, GifFrameDecoder, JobStatus, PipelineConfig,
    ProgressEvent, TimingStats,
};

#[derive(Parser, Debug)]
#[command(name = "animstream", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print frame count, duration and frame-rate statistics of an animation.
    Stats(StatsArgs),
    /// Extract full frames and previews into a working directory.
    Extract(ExtractArgs),
    /// Report the disk-cache state for a source.
    Cache(CacheArgs),
    /// Rescale the delays of a frame range to a target duration and print the new table.
    Retime(RetimeArgs),
    /// Remove extracted frame directories from a working directory, keeping cache blobs.
    Cleanup(CleanupArgs),
}

#[derive(Parser, Debug)]
struct StatsArgs {
    /// Input animated GIF.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Input animated GIF.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Working directory. Defaults to the config value, then a per-process temp directory.
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Pipeline config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Resume automatically when the job pauses itself on a large source.
    #[arg(long, default_value_t = false)]
    auto_resume: bool,

    /// Override frames per batch.
    #[arg(long)]
    batch_size: Option<usize>,
}

#[derive(Parser, Debug)]
struct CacheArgs {
    /// Input animated GIF.
    #[arg(long = "in")]
    in_path: PathBuf,

    #[arg(long)]
    work_dir: PathBuf,

    /// Check sidecar digests, not only their presence.
    #[arg(long, default_value_t = false)]
    verify: bool,
}

#[derive(Parser, Debug)]
struct RetimeArgs {
    /// Input animated GIF.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// First frame of the range (0-based).
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// Last frame of the range, inclusive. Defaults to the last frame.
    #[arg(long)]
    end: Option<usize>,

    /// Target duration of the range in milliseconds.
    #[arg(long)]
    total_ms: u64,
}

#[derive(Parser, Debug)]
struct CleanupArgs {
    #[arg(long)]
    work_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("animstream=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Stats(args) => cmd_stats(args),
        Command::Extract(args) => cmd_extract(args),
        Command::Cache(args) => cmd_cache(args),
        Command::Retime(args) => cmd_retime(args),
        Command::Cleanup(args) => cmd_cleanup(args),
    }
}

fn cmd_stats(args: StatsArgs) -> anyhow::Result<()> {
    let stats = animstream::timing::probe_stats(&GifFrameDecoder::new(), &args.in_path)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }
    Ok(())
}

fn print_stats(stats: &TimingStats) {
    println!("frames:   {}", stats.frame_count);
    println!("duration: {} ms", stats.total_duration_ms);
    println!("avg fps:  {:.2}", stats.avg_fps);
    println!("min fps:  {:.2}", stats.min_fps);
    println!("max fps:  {:.2}", stats.max_fps);
    for mode in &stats.modes {
        println!("mode:     {} fps x {}", mode.fps, mode.count);
    }
    if let Some(size) = stats.file_size {
        println!("size:     {size} bytes");
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::from_path(p)
            .with_context(|| format!("load config '{}'", p.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn cmd_extract(args: ExtractArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(n) = args.batch_size {
        config.extract.batch_size = n;
    }
    config.validate()?;

    let work_dir = match args.work_dir.or(config.work_dir.clone()) {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create work dir '{}'", dir.display()))?;
            dir
        }
        None => animstream::init_work_dir(None)?,
    };

    let (tx, rx) = mpsc::channel::<ProgressEvent>();
    let coordinator =
        ExtractionCoordinator::new(Arc::new(GifFrameDecoder::new())).with_sink(Arc::new(tx));
    let job = coordinator.start(&args.in_path, &work_dir, config.extract.clone())?;

    loop {
        match rx.recv_timeout(Duration::from_millis(250)) {
            Ok(ProgressEvent::Progress { kind, progress, .. }) => {
                tracing::info!(%kind, current = progress.current, total = progress.total, "progress");
            }
            Ok(ProgressEvent::Status {
                status: JobStatus::Paused,
                auto: true,
                ..
            }) => {
                if args.auto_resume {
                    tracing::info!("auto-paused; resuming");
                    job.resume();
                } else {
                    tracing::warn!(
                        "auto-paused on a large source; stopping (rerun to continue, or pass --auto-resume)"
                    );
                    job.cancel();
                }
            }
            Ok(ProgressEvent::Status { status, .. }) if status.is_terminal() => break,
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) if job.status().is_terminal() => break,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    coordinator.shutdown();

    let status = job.status();
    let full = job.progress(ArtifactKind::FullFrame);
    eprintln!(
        "{status:?}: {}/{} frames in {}",
        full.current,
        full.total,
        work_dir.display()
    );
    match status {
        JobStatus::Failed => anyhow::bail!(
            "extraction failed: {}",
            job.error().unwrap_or_else(|| "unknown error".to_owned())
        ),
        _ => Ok(()),
    }
}

fn cmd_cache(args: CacheArgs) -> anyhow::Result<()> {
    let status = animstream::disk_cache::inspect(&args.work_dir, &args.in_path, args.verify)?;
    for (name, artifact) in [("delays", status.delays), ("preview", status.preview)] {
        let size = artifact
            .blob_bytes
            .map_or_else(|| "absent".to_owned(), |b| format!("{b} bytes"));
        println!(
            "{name:8} {size:>14}  sidecar {:?}  {}",
            artifact.sidecar,
            if artifact.usable() { "usable" } else { "cold" }
        );
    }
    Ok(())
}

fn cmd_retime(args: RetimeArgs) -> anyhow::Result<()> {
    let info = animstream::FrameDecoder::probe(&GifFrameDecoder::new(), &args.in_path)?;
    let end = match args.end {
        Some(e) => e,
        None => info
            .frame_count()
            .checked_sub(1)
            .context("source has no frames")?,
    };
    let delays = animstream::timing::retime_range(&info.delays_ms, args.start..=end, args.total_ms)?;
    println!("{}", serde_json::to_string(&delays)?);
    Ok(())
}

fn cmd_cleanup(args: CleanupArgs) -> anyhow::Result<()> {
    let report = animstream::cleanup_work_dir(&args.work_dir)?;
    eprintln!(
        "removed {} artifact dirs, {} temp files",
        report.artifact_dirs, report.temp_files
    );
    Ok(())
}
