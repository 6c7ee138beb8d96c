//! CaptionKiln CLI — subtitle conversion and burn-in rendering.
//!
//! Usage:
//!   captionkiln convert <INPUT> -o <OUTPUT>   Convert between subtitle formats
//!   captionkiln inspect <INPUT>               Show subtitle file statistics
//!   captionkiln render -s <SUBTITLES>         Render a burned-in caption video
//!   captionkiln check                         Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "captionkiln",
    about = "Burn timed captions into video and convert between subtitle formats",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a subtitle file between SRT, WebVTT, and JSON script
    Convert {
        /// Input subtitle file; format inferred from the extension
        input: PathBuf,

        /// Output file; format inferred from the extension
        #[arg(short, long)]
        output: PathBuf,

        /// Title written into the JSON envelope
        #[arg(long, default_value = "Untitled")]
        title: String,
    },

    /// Show statistics for a subtitle file
    Inspect {
        /// Subtitle file to inspect
        input: PathBuf,
    },

    /// Render a subtitle file as a burned-in caption video over a test clip
    Render {
        /// Subtitle file to burn in
        #[arg(short, long)]
        subtitles: PathBuf,

        /// Output quality: 720p, 1080p, or 4k
        #[arg(short, long, default_value = "720p")]
        quality: String,

        /// Export without the watermark
        #[arg(long)]
        pro: bool,

        /// Title used for the output filename
        #[arg(long, default_value = "render")]
        title: String,

        /// Clip duration in seconds
        #[arg(long, default_value = "10.0")]
        duration: f64,

        /// Output directory (defaults to the configured exports dir)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Use the null encoder instead of ffmpeg (no playable output)
        #[arg(long)]
        dry_run: bool,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    captionkiln_common::logging::init_logging(&captionkiln_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Convert {
            input,
            output,
            title,
        } => commands::convert::run(input, output, title),
        Commands::Inspect { input } => commands::inspect::run(input),
        Commands::Render {
            subtitles,
            quality,
            pro,
            title,
            duration,
            output_dir,
            dry_run,
        } => {
            commands::render::run(subtitles, quality, pro, title, duration, output_dir, dry_run)
                .await
        }
        Commands::Check => commands::check::run(),
    }
}
