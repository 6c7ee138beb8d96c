//! Export session state machine.
//!
//! One controller drives at most one session at a time through
//! `Idle → Preparing → Seeking → Encoding → Finalizing → {Done | Error |
//! Cancelled} → Idle`. Whatever happens — success, failure, or
//! cancellation — the session tap is closed and the user's playback state
//! is restored before the controller returns to idle.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use captionkiln_common::error::{KilnError, KilnResult};
use captionkiln_media::{AudioTapRegistry, MediaSource, PlaybackSnapshot, SessionTap};
use captionkiln_project_model::ExportRequest;
use captionkiln_render::compositor::compose_frame;
use captionkiln_render::Surface;
use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;

use crate::encoder::{EncodedChunk, Encoder};
use crate::output::{export_filename, OutputSink};

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    Preparing,
    Seeking,
    Encoding,
    Finalizing,
    Done,
    Error,
    Cancelled,
}

/// Controller tuning.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Composite/encode tick rate.
    pub fps: u32,

    /// Bounded wait for sources that never signal seek completion.
    pub seek_timeout: Duration,

    /// Natural-end tolerance against clock jitter near the final frame.
    pub end_epsilon_secs: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            seek_timeout: Duration::from_secs(1),
            end_epsilon_secs: 0.1,
        }
    }
}

/// What one finished session produced.
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub cancelled: bool,
    pub filename: Option<String>,
    pub path: Option<PathBuf>,
    pub bytes: u64,
}

/// The collaborators a session drives. All are borrowed for the duration
/// of the call; the controller owns nothing it might forget to release.
pub struct ExportIo<'a> {
    pub source: &'a mut dyn MediaSource,
    pub surface: &'a mut dyn Surface,
    pub encoder: &'a mut dyn Encoder,
    pub sink: &'a mut dyn OutputSink,
}

struct CancelState {
    flag: AtomicBool,
    notify: Notify,
}

/// Clonable handle that cancels the running session from anywhere.
#[derive(Clone)]
pub struct CancelHandle {
    inner: Arc<CancelState>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.notify.notify_one();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct SessionResources {
    snapshot: Option<PlaybackSnapshot>,
    tap: Option<SessionTap>,
}

enum SessionEnd {
    Saved {
        path: PathBuf,
        filename: String,
        bytes: u64,
    },
    Cancelled,
}

/// Drives export sessions. One at a time, system-wide: a second `export`
/// while one is running is rejected with [`KilnError::SessionActive`].
pub struct ExportController {
    config: ExportConfig,
    registry: Arc<AudioTapRegistry>,
    state: Mutex<ExportState>,
    active: AtomicBool,
    cancel: Arc<CancelState>,
    progress_tx: watch::Sender<u8>,
}

impl ExportController {
    pub fn new(registry: Arc<AudioTapRegistry>, config: ExportConfig) -> Self {
        let (progress_tx, _) = watch::channel(0u8);
        Self {
            config,
            registry,
            state: Mutex::new(ExportState::Idle),
            active: AtomicBool::new(false),
            cancel: Arc::new(CancelState {
                flag: AtomicBool::new(false),
                notify: Notify::new(),
            }),
            progress_tx,
        }
    }

    pub fn state(&self) -> ExportState {
        *lock_state(&self.state)
    }

    /// Observable integer progress, 0–100, updated at most once per
    /// integer step and reset to 0 when a session starts and ends.
    pub fn progress(&self) -> watch::Receiver<u8> {
        self.progress_tx.subscribe()
    }

    /// Handle for cancelling the running session from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            inner: self.cancel.clone(),
        }
    }

    /// Cancel the running session. The encoder is stopped on the next
    /// suspension point and cleanup runs exactly as on natural completion.
    pub fn cancel(&self) {
        self.cancel_handle().cancel();
    }

    /// Run one export session to completion.
    pub async fn export(
        &self,
        request: ExportRequest,
        mut io: ExportIo<'_>,
    ) -> KilnResult<ExportOutput> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(KilnError::SessionActive);
        }
        self.cancel.flag.store(false, Ordering::SeqCst);
        self.progress_tx.send_if_modified(|value| {
            let changed = *value != 0;
            *value = 0;
            changed
        });
        self.set_state(ExportState::Preparing);
        tracing::info!(
            title = %request.title,
            quality = request.quality.label(),
            pro = request.pro,
            captions = request.captions.len(),
            "Starting export session"
        );

        let mut resources = SessionResources::default();
        let pipeline = self.run_pipeline(&request, &mut io, &mut resources).await;

        // Unconditional cleanup: reconnect audio, restore playback.
        self.release_resources(&mut io, resources).await;

        let result = match pipeline {
            Ok(SessionEnd::Saved {
                path,
                filename,
                bytes,
            }) => {
                self.set_state(ExportState::Done);
                tracing::info!(file = %path.display(), bytes, "Export complete");
                Ok(ExportOutput {
                    cancelled: false,
                    filename: Some(filename),
                    path: Some(path),
                    bytes,
                })
            }
            Ok(SessionEnd::Cancelled) => {
                self.set_state(ExportState::Cancelled);
                tracing::info!("Export cancelled");
                Ok(ExportOutput {
                    cancelled: true,
                    filename: None,
                    path: None,
                    bytes: 0,
                })
            }
            Err(e) => {
                self.set_state(ExportState::Error);
                tracing::error!(error = %e, "Export failed");
                Err(e)
            }
        };

        self.progress_tx.send_replace(0);
        self.set_state(ExportState::Idle);
        self.active.store(false, Ordering::SeqCst);
        result
    }

    async fn run_pipeline(
        &self,
        request: &ExportRequest,
        io: &mut ExportIo<'_>,
        resources: &mut SessionResources,
    ) -> KilnResult<SessionEnd> {
        // PREPARING: validate before acquiring anything.
        let duration = io.source.duration_secs();
        if !duration.is_finite() || duration <= 0.0 {
            return Err(KilnError::media_unavailable(
                "source reports no playable duration",
            ));
        }
        io.source
            .current_frame()
            .map_err(|e| KilnError::media_unavailable(format!("source has no frame: {e}")))?;

        let resolution = request.quality.resolution();
        let surface_resolution = io.surface.resolution();
        if surface_resolution != resolution {
            return Err(KilnError::surface_unavailable(format!(
                "surface is {surface_resolution}, export needs {resolution}"
            )));
        }

        resources.snapshot = Some(PlaybackSnapshot::capture(io.source));
        io.source.pause();

        // Audio routing failure is non-fatal: export continues video-only.
        match self.registry.acquire_source(io.source) {
            Ok(node) => resources.tap = Some(self.registry.open_session_tap(&node)),
            Err(e) => {
                tracing::warn!(error = %e, "Audio tap unavailable; exporting without audio");
            }
        }
        let track = resources.tap.as_ref().map(SessionTap::track);

        // SEEKING: rewind with a bounded wait. Sources that never signal
        // completion get a warning, not a stall.
        self.set_state(ExportState::Seeking);
        if io.source.current_time_secs() > 0.0 {
            io.source.set_position(0.0);
            match tokio::time::timeout(self.config.seek_timeout, io.source.wait_seek_complete())
                .await
            {
                Ok(result) => result?,
                Err(_) => tracing::warn!(
                    timeout_ms = self.config.seek_timeout.as_millis() as u64,
                    "Seek never signalled completion; proceeding"
                ),
            }
        }

        // ENCODING
        self.set_state(ExportState::Encoding);
        io.encoder.start(resolution, self.config.fps, track)?;
        if let Err(e) = io.source.play().await {
            let _ = io.encoder.finish().await;
            return Err(e);
        }

        let mut chunks: Vec<EncodedChunk> = Vec::new();
        let loop_outcome = self.encode_loop(request, io, duration, &mut chunks).await;

        // The encoder is stopped on natural end, cancellation, and error
        // alike, so finalization is single-sourced through its completion.
        self.set_state(ExportState::Finalizing);
        let finish_outcome = io.encoder.finish().await;
        let cancelled = loop_outcome?;
        chunks.extend(finish_outcome?);

        if cancelled {
            return Ok(SessionEnd::Cancelled);
        }

        let bytes: usize = chunks.iter().map(|c| c.data.len()).sum();
        if bytes == 0 {
            return Err(KilnError::EmptyOutput);
        }
        let mut blob = Vec::with_capacity(bytes);
        for chunk in &chunks {
            blob.extend_from_slice(&chunk.data);
        }

        let filename = export_filename(
            &request.title,
            request.quality,
            request.pro,
            io.encoder.container_ext(),
        );
        let path = io.sink.save(&filename, &blob)?;
        Ok(SessionEnd::Saved {
            path,
            filename,
            bytes: bytes as u64,
        })
    }

    /// The tick loop: one composite + encode per tick until natural end or
    /// cancellation. Returns whether the session was cancelled.
    async fn encode_loop(
        &self,
        request: &ExportRequest,
        io: &mut ExportIo<'_>,
        duration: f64,
        chunks: &mut Vec<EncodedChunk>,
    ) -> KilnResult<bool> {
        let mut ticker =
            tokio::time::interval(Duration::from_secs_f64(1.0 / self.config.fps.max(1) as f64));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_percent = 0u8;

        loop {
            tokio::select! {
                _ = self.cancel.notify.notified() => {
                    // A wakeup without the flag is a stale permit from an
                    // earlier session; only the flag cancels.
                    if self.cancel.flag.load(Ordering::SeqCst) {
                        return Ok(true);
                    }
                }
                _ = ticker.tick() => {
                    // The flag check is the secondary net behind the wakeup.
                    if self.cancel.flag.load(Ordering::SeqCst) {
                        return Ok(true);
                    }

                    let now = io.source.current_time_secs();
                    if io.source.ended() || now >= duration - self.config.end_epsilon_secs {
                        return Ok(false);
                    }

                    let frame = io.source.current_frame()?;
                    let composition = compose_frame(
                        &request.captions,
                        now,
                        request.quality,
                        request.pro,
                        io.surface.measure(),
                    );
                    io.surface.paint(&composition, &frame)?;
                    io.encoder.push_frame(io.surface.pixels(), now)?;
                    chunks.extend(io.encoder.drain_chunks());

                    let percent = progress_percent(now, duration);
                    if percent > last_percent {
                        last_percent = percent;
                        self.progress_tx.send_replace(percent);
                    }
                }
            }
        }
    }

    async fn release_resources(&self, io: &mut ExportIo<'_>, mut resources: SessionResources) {
        if let Some(tap) = resources.tap.take() {
            tap.close();
        }
        if let Some(snapshot) = resources.snapshot.take() {
            if let Err(e) = snapshot.restore(io.source).await {
                tracing::warn!(error = %e, "Failed to fully restore playback state");
            }
        }
    }

    fn set_state(&self, state: ExportState) {
        *lock_state(&self.state) = state;
        tracing::debug!(?state, "Export state");
    }
}

fn lock_state(state: &Mutex<ExportState>) -> std::sync::MutexGuard<'_, ExportState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Integer export progress: `current / duration`, clamped to `[0, 100]`,
/// floored so observers see at most one update per percentage point.
pub fn progress_percent(current_secs: f64, duration_secs: f64) -> u8 {
    if duration_secs <= 0.0 {
        return 0;
    }
    ((current_secs / duration_secs) * 100.0).clamp(0.0, 100.0).floor() as u8
}
