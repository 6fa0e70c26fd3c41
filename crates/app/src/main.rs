use std::path::PathBuf;
use std::time::{Duration, Instant};

use audio_visualiser_core::{
    catalog, AnalyzerConfig, CaptureSource, MicrophoneSource, RenderMode, SyntheticSource,
    VisualiserError, VisualizerSession, SurfaceDimensions,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() -> audio_visualiser_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Modes => run_modes(),
        Commands::Run(args) => run_live(args),
    }
}

fn run_modes() -> audio_visualiser_core::Result<()> {
    for entry in catalog() {
        println!("{:<16} {:<16} {}", entry.id, entry.name, entry.description);
    }
    Ok(())
}

fn run_live(args: RunArgs) -> audio_visualiser_core::Result<()> {
    let mode = RenderMode::from_id(&args.mode);
    tracing::info!(mode = mode.id(), duration = args.duration, "starting live mode");

    let mut session = VisualizerSession::new(AnalyzerConfig::default(), mode)?;
    if let Some(seed) = args.seed {
        session = session.with_seed(seed);
    }

    let mut source: Box<dyn CaptureSource> = match args.synthetic {
        Some(frequency) => Box::new(SyntheticSource::tone(frequency)),
        None => Box::new(MicrophoneSource::new()),
    };
    session.start(source.as_mut(), SurfaceDimensions::new(args.width, args.height))?;

    let refresh = Duration::from_secs_f64(1.0 / 60.0);
    let started = Instant::now();
    let mut frames = 0u64;
    while started.elapsed().as_secs_f32() < args.duration {
        let tick_started = Instant::now();
        if session.tick(started.elapsed()) {
            frames += 1;
        }
        std::thread::sleep(refresh.saturating_sub(tick_started.elapsed()));
    }
    tracing::info!(frames, "live mode finished");

    if let Some(path) = &args.snapshot {
        write_snapshot(&session, path)?;
    }

    session.stop();
    Ok(())
}

fn write_snapshot(session: &VisualizerSession, path: &PathBuf) -> audio_visualiser_core::Result<()> {
    let surface = session
        .surface()
        .ok_or_else(|| VisualiserError::config("no live surface to export"))?;
    let dims = surface.dimensions();
    let image = image::RgbaImage::from_raw(dims.width, dims.height, surface.data().to_vec())
        .ok_or_else(|| VisualiserError::config("surface buffer does not match its dimensions"))?;
    image
        .save(path)
        .map_err(|err| VisualiserError::Io(std::io::Error::other(err)))?;
    tracing::info!(?path, "wrote frame snapshot");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive visualiser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the available visualization modes.
    Modes,
    /// Capture live audio and render it for a while.
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Visualization mode id; unknown ids fall back to the default mode.
    #[arg(short, long, default_value = "spectrum")]
    mode: String,
    /// How long to run, in seconds.
    #[arg(short, long, default_value_t = 10.0)]
    duration: f32,
    /// Surface width in pixels.
    #[arg(long, default_value_t = 1280)]
    width: u32,
    /// Surface height in pixels.
    #[arg(long, default_value_t = 720)]
    height: u32,
    /// Use a synthetic tone at this frequency instead of the microphone.
    #[arg(long, value_name = "HZ")]
    synthetic: Option<f32>,
    /// Seed for the renderer's random source.
    #[arg(long)]
    seed: Option<u64>,
    /// Write the final frame to this PNG file before stopping.
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,
}
