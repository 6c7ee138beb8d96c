//! Render a subtitle file into a burned-in caption video.
//!
//! Drives the full export pipeline over the synthetic clock source, so
//! caption timing, wrapping, and watermarking can be verified without a
//! real video asset.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use captionkiln_common::config::AppConfig;
use captionkiln_export::encoder::ffmpeg_available;
use captionkiln_export::{
    Encoder, ExportConfig, ExportController, ExportIo, FfmpegEncoder, FileSink, NullEncoder,
};
use captionkiln_media::{AudioTapRegistry, SyntheticSource};
use captionkiln_project_model::{ExportRequest, ProjectStore, QualityTier};
use captionkiln_render::SoftwareSurface;
use captionkiln_subtitles::SubtitleFormat;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    subtitles: PathBuf,
    quality: String,
    pro: bool,
    title: String,
    duration: f64,
    output_dir: Option<PathBuf>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let config = AppConfig::load();
    let quality = QualityTier::from_label(&quality)
        .ok_or_else(|| anyhow::anyhow!("unknown quality tier: {quality}"))?;
    anyhow::ensure!(duration > 0.0, "duration must be positive");

    let content = std::fs::read_to_string(&subtitles)
        .with_context(|| format!("failed to read {}", subtitles.display()))?;
    let captions = SubtitleFormat::from_path(&subtitles).parse(&content);
    anyhow::ensure!(
        !captions.is_empty(),
        "no caption lines parsed from {}",
        subtitles.display()
    );

    // Stage the clip in a project store and snapshot the request out of
    // it, the same shape the editor uses.
    let mut store = ProjectStore::new();
    let video_id = store.add_video(&title, subtitles.display().to_string());
    store.update_captions(video_id, captions);
    let entry = store
        .video(video_id)
        .ok_or_else(|| anyhow::anyhow!("project store lost the staged video"))?;

    let mut encoder: Box<dyn Encoder> = if dry_run {
        Box::new(NullEncoder::new())
    } else {
        anyhow::ensure!(
            ffmpeg_available(),
            "ffmpeg not found in PATH; install it or pass --dry-run"
        );
        Box::new(FfmpegEncoder::new())
    };

    let request = ExportRequest::new(&entry.captions, quality, pro, title);
    let mut source =
        SyntheticSource::new(format!("render:{}", subtitles.display()), duration)
            .with_frame_size(640, 360);
    let mut surface =
        SoftwareSurface::new(quality.resolution(), config.export.font_file.as_deref())?;
    let mut sink = FileSink::new(output_dir.unwrap_or_else(|| config.exports_dir.clone()));

    let controller = ExportController::new(
        Arc::new(AudioTapRegistry::new()),
        ExportConfig {
            fps: config.export.fps,
            seek_timeout: Duration::from_millis(config.export.seek_timeout_ms),
            ..ExportConfig::default()
        },
    );

    let mut progress = controller.progress();
    let export = controller.export(
        request,
        ExportIo {
            source: &mut source,
            surface: &mut surface,
            encoder: encoder.as_mut(),
            sink: &mut sink,
        },
    );
    tokio::pin!(export);

    let output = loop {
        tokio::select! {
            result = &mut export => break result?,
            changed = progress.changed() => {
                if changed.is_ok() {
                    let percent = *progress.borrow();
                    if percent > 0 {
                        tracing::info!(percent, "Rendering");
                    }
                }
            }
        }
    };

    match output.path {
        Some(path) => println!("Saved {} ({} bytes)", path.display(), output.bytes),
        None => println!("Render produced no file"),
    }
    Ok(())
}
