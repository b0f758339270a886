//! CLI Entry Point for m64-capture
//!
//! Provides command-line interface for:
//! - Recording a controller adapter's stream into a new `.m64` movie
//! - Inspecting a recorded movie
//!
//! # Usage
//!
//! Record until Ctrl+C or until the adapter is unplugged:
//! ```bash
//! m64-capture record --port /dev/ttyUSB0
//! ```
//!
//! Show the header and first samples of a movie:
//! ```bash
//! m64-capture inspect movies/capture_0000.m64
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use m64_capture::config::{CaptureConfig, DEFAULT_CONFIG_PATH};
use m64_capture::logging::{self, OutputFormat};
use m64_capture::movie::{read_movie, FrameCountPatch};
use m64_capture::translate::translate;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "m64-capture")]
#[command(about = "Record controller adapter input into .m64 movies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new movie from the serial adapter
    Record {
        /// Serial port (overrides serial.port from the config)
        #[arg(long)]
        port: Option<String>,

        /// Configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Output directory (overrides movie.output_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// File name stem (overrides movie.base_name)
        #[arg(long)]
        name: Option<String>,

        /// Write the real frame count into the header at close
        #[arg(long)]
        correct_frame_count: bool,

        /// Log output format: pretty, compact or json (overrides application.log_format)
        #[arg(long)]
        log_format: Option<OutputFormat>,
    },

    /// Print the header and leading samples of a movie
    Inspect {
        /// Movie file
        file: PathBuf,

        /// Number of samples to print
        #[arg(long, default_value = "8")]
        samples: usize,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Record {
            port,
            config,
            output_dir,
            name,
            correct_frame_count,
            log_format,
        } => {
            let mut config = CaptureConfig::load_from(&config)
                .with_context(|| format!("Failed to load config from {}", config.display()))?;
            if port.is_some() {
                config.serial.port = port;
            }
            if let Some(dir) = output_dir {
                config.movie.output_dir = dir;
            }
            if let Some(name) = name {
                config.movie.base_name = name;
            }
            if correct_frame_count {
                config.movie.frame_count_patch = FrameCountPatch::Corrected;
            }
            if let Some(format) = log_format {
                config.application.log_format = format;
            }
            config.validate()?;

            logging::init_from_config(&config).map_err(anyhow::Error::msg)?;
            record(config).await
        }
        Commands::Inspect { file, samples } => inspect(file, samples),
    }
}

#[cfg(feature = "instrument_serial")]
async fn record(config: CaptureConfig) -> Result<()> {
    use m64_capture::framer::PacketFramer;
    use m64_capture::hardware::SerialSampleSource;
    use m64_capture::movie::MovieWriter;
    use m64_capture::namer::SessionNamer;
    use m64_capture::session::{CaptureSession, StopReason};

    let port = config
        .serial
        .port
        .as_deref()
        .context("No serial port given. Use --port or set serial.port")?;

    let source = SerialSampleSource::open(port)
        .with_context(|| format!("Failed to open serial port '{port}'"))?;

    let path = SessionNamer::new()
        .next_path(&config.movie.output_dir, &config.movie.base_name)
        .context("Failed to choose an output path")?;
    let writer = MovieWriter::create(&path, &config.movie.header, config.movie.frame_count_patch)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    tracing::info!(port, path = %path.display(), "Recording. Press Ctrl+C to stop");

    let mut session = CaptureSession::new(PacketFramer::new(source), writer);
    let summary = session
        .run(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "Ctrl+C handler failed, stopping");
            }
        })
        .await?;

    match summary.reason {
        StopReason::Requested => println!("Stopped."),
        StopReason::Disconnected => println!("Adapter disconnected."),
    }
    println!(
        "Wrote {} samples to {}",
        summary.samples_written,
        summary.path.display()
    );
    Ok(())
}

#[cfg(not(feature = "instrument_serial"))]
async fn record(_config: CaptureConfig) -> Result<()> {
    Err(m64_capture::CaptureError::SerialFeatureDisabled.into())
}

fn inspect(file: PathBuf, shown: usize) -> Result<()> {
    let movie = read_movie(&file).with_context(|| format!("Failed to read {}", file.display()))?;
    let h = &movie.header;

    println!("{}", file.display());
    println!("  version          {}", h.version);
    println!("  uid              {}", h.uid);
    println!("  frame count      {}", h.frame_count);
    println!("  rerecords        {}", h.rerecord_count);
    println!("  fps              {}", h.fps);
    println!("  controllers      {}", h.controller_count);
    println!("  start type       {}", h.start_type);
    println!("  ROM              {} (crc {:#010x}, country {})", h.rom_name, h.rom_crc, h.country_code);
    println!("  video plugin     {}", h.video_plugin);
    println!("  audio plugin     {}", h.audio_plugin);
    println!("  input plugin     {}", h.input_plugin);
    println!("  RSP plugin       {}", h.rsp_plugin);
    println!("  author           {}", h.author);
    println!("  description      {}", h.description);
    println!("  samples          {}", movie.samples.len());

    for (i, raw) in movie.samples.iter().take(shown).enumerate() {
        let pressed: Vec<String> = translate(*raw)
            .pressed_slots()
            .map(|slot| slot.to_string())
            .collect();
        println!("  #{i:<6} {raw}  pressed [{}]", pressed.join(","));
    }
    Ok(())
}
