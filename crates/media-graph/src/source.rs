//! Playable media source contracts.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use captionkiln_common::error::{KilnError, KilnResult};

use crate::audio::{AudioEndpoint, ToneFeed};
use crate::frame::VideoFrame;

/// Stable identity of a media source, used to key the audio tap registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaSourceId(String);

impl MediaSourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MediaSourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A playable media source the export pipeline can drive.
///
/// Seeking is split in two: [`set_position`](MediaSource::set_position)
/// moves the playhead immediately, and
/// [`wait_seek_complete`](MediaSource::wait_seek_complete) resolves once
/// the source has actually landed there. Some sources never signal
/// completion, so callers must bound the wait themselves.
#[async_trait]
pub trait MediaSource: Send {
    fn id(&self) -> MediaSourceId;

    fn duration_secs(&self) -> f64;

    fn current_time_secs(&self) -> f64;

    /// Whether playback has reached the end of the media.
    fn ended(&self) -> bool;

    fn is_playing(&self) -> bool;

    fn volume(&self) -> f64;

    fn set_volume(&mut self, volume: f64);

    fn muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    /// Begin playback. Resolves once playback has actually started.
    async fn play(&mut self) -> KilnResult<()>;

    fn pause(&mut self);

    /// Move the playhead without waiting for the source to settle.
    fn set_position(&mut self, time_secs: f64);

    /// Resolve once the most recent position change has landed.
    async fn wait_seek_complete(&mut self) -> KilnResult<()>;

    /// The frame at the current playhead.
    fn current_frame(&self) -> KilnResult<VideoFrame>;

    /// Audio endpoint for tap routing. Sources that cannot expose their
    /// audio (the cross-origin case) fail here; the export pipeline treats
    /// that as non-fatal and continues video-only.
    fn audio_endpoint(&self) -> KilnResult<AudioEndpoint>;
}

/// User-visible playback state captured before an export and restored
/// afterwards on every exit path.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackSnapshot {
    pub time_secs: f64,
    pub volume: f64,
    pub muted: bool,
    pub was_playing: bool,
}

impl PlaybackSnapshot {
    pub fn capture(source: &dyn MediaSource) -> Self {
        Self {
            time_secs: source.current_time_secs(),
            volume: source.volume(),
            muted: source.muted(),
            was_playing: source.is_playing(),
        }
    }

    /// Put the source back the way the user had it. The playhead move is
    /// fire-and-forget so an unresponsive source cannot stall cleanup.
    pub async fn restore(&self, source: &mut dyn MediaSource) -> KilnResult<()> {
        source.set_volume(self.volume);
        source.set_muted(self.muted);
        if self.was_playing {
            source.set_position(self.time_secs);
            source.play().await?;
        } else {
            // Settle playback first so the playhead lands exactly.
            source.pause();
            source.set_position(self.time_secs);
        }
        Ok(())
    }
}

/// A clock-driven source producing a deterministic test pattern.
///
/// Used by the unit and integration tests and by the CLI render harness.
/// Failure modes (unresponsive seek, denied audio, play rejection) are
/// opt-in so the pipeline's fallback paths can be exercised.
pub struct SyntheticSource {
    id: MediaSourceId,
    duration_secs: f64,
    frame_width: u32,
    frame_height: u32,
    position_secs: f64,
    playing_since: Option<Instant>,
    volume: f64,
    muted: bool,
    seek_latency: Duration,
    seek_signals: bool,
    fail_play: bool,
    deny_audio: bool,
}

impl SyntheticSource {
    pub fn new(id: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            id: MediaSourceId::new(id),
            duration_secs,
            frame_width: 320,
            frame_height: 180,
            position_secs: 0.0,
            playing_since: None,
            volume: 1.0,
            muted: false,
            seek_latency: Duration::from_millis(0),
            seek_signals: true,
            fail_play: false,
            deny_audio: false,
        }
    }

    /// Source frame dimensions (independent of the export resolution; the
    /// compositor scales).
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_width = width;
        self.frame_height = height;
        self
    }

    /// Delay before a seek settles.
    pub fn with_seek_latency(mut self, latency: Duration) -> Self {
        self.seek_latency = latency;
        self
    }

    /// Never signal seek completion, like sources that drop the event.
    pub fn with_unresponsive_seek(mut self) -> Self {
        self.seek_signals = false;
        self
    }

    /// Reject `play()` calls.
    pub fn with_play_failure(mut self) -> Self {
        self.fail_play = true;
        self
    }

    /// Refuse to expose an audio endpoint (the cross-origin case).
    pub fn without_audio(mut self) -> Self {
        self.deny_audio = true;
        self
    }
}

#[async_trait]
impl MediaSource for SyntheticSource {
    fn id(&self) -> MediaSourceId {
        self.id.clone()
    }

    fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    fn current_time_secs(&self) -> f64 {
        let elapsed = self
            .playing_since
            .map(|since| since.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        (self.position_secs + elapsed).min(self.duration_secs)
    }

    fn ended(&self) -> bool {
        self.current_time_secs() >= self.duration_secs
    }

    fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    async fn play(&mut self) -> KilnResult<()> {
        if self.fail_play {
            return Err(KilnError::playback_start(
                "synthetic source is configured to reject playback",
            ));
        }
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.position_secs = self.current_time_secs();
        self.playing_since = None;
    }

    fn set_position(&mut self, time_secs: f64) {
        self.position_secs = time_secs.clamp(0.0, self.duration_secs);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }

    async fn wait_seek_complete(&mut self) -> KilnResult<()> {
        if !self.seek_signals {
            std::future::pending::<()>().await;
        }
        if !self.seek_latency.is_zero() {
            tokio::time::sleep(self.seek_latency).await;
        }
        Ok(())
    }

    fn current_frame(&self) -> KilnResult<VideoFrame> {
        let t = self.current_time_secs();
        let w = self.frame_width;
        let h = self.frame_height;

        // Background shade drifts with time; a sweeping vertical bar marks
        // the playhead so motion is visible in exported output.
        let shade = 40 + ((t * 20.0) as u32 % 160) as u8;
        let mut frame = VideoFrame::solid(w, h, [shade, shade, shade + 30, 255]);

        let progress = if self.duration_secs > 0.0 {
            (t / self.duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let bar_x = ((w.saturating_sub(1)) as f64 * progress) as u32;
        for y in 0..h {
            frame.set_pixel(bar_x, y, [240, 240, 240, 255]);
            frame.set_pixel(bar_x.saturating_add(1), y, [240, 240, 240, 255]);
        }
        Ok(frame)
    }

    fn audio_endpoint(&self) -> KilnResult<AudioEndpoint> {
        if self.deny_audio {
            return Err(KilnError::audio_routing(format!(
                "source {} does not permit audio capture",
                self.id
            )));
        }
        Ok(AudioEndpoint::new(std::sync::Arc::new(ToneFeed::default())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clock_advances_only_while_playing() {
        let mut source = SyntheticSource::new("clip", 10.0);
        assert_eq!(source.current_time_secs(), 0.0);

        source.play().await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(source.current_time_secs() > 0.0);

        source.pause();
        let paused_at = source.current_time_secs();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(source.current_time_secs(), paused_at);
    }

    #[tokio::test]
    async fn position_is_clamped_to_duration() {
        let mut source = SyntheticSource::new("clip", 5.0);
        source.set_position(99.0);
        assert_eq!(source.current_time_secs(), 5.0);
        assert!(source.ended());
        source.set_position(-1.0);
        assert_eq!(source.current_time_secs(), 0.0);
    }

    #[tokio::test]
    async fn seek_latency_delays_the_completion_signal() {
        let mut source =
            SyntheticSource::new("clip", 10.0).with_seek_latency(Duration::from_millis(20));
        source.set_position(5.0);

        let started = Instant::now();
        source.wait_seek_complete().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(source.current_time_secs(), 5.0);
    }

    #[tokio::test]
    async fn play_failure_is_reported() {
        let mut source = SyntheticSource::new("clip", 5.0).with_play_failure();
        assert!(matches!(
            source.play().await,
            Err(KilnError::PlaybackStart { .. })
        ));
    }

    #[tokio::test]
    async fn snapshot_round_trips_playback_state() {
        let mut source = SyntheticSource::new("clip", 10.0);
        source.set_volume(0.25);
        source.set_muted(true);
        source.set_position(3.0);

        let snapshot = PlaybackSnapshot::capture(&source);

        source.set_volume(1.0);
        source.set_muted(false);
        source.set_position(0.0);
        source.play().await.unwrap();

        snapshot.restore(&mut source).await.unwrap();
        assert_eq!(source.volume(), 0.25);
        assert!(source.muted());
        assert_eq!(source.current_time_secs(), 3.0);
        assert!(!source.is_playing());
    }

    #[test]
    fn frames_are_deterministic_for_a_paused_source() {
        let source = SyntheticSource::new("clip", 10.0).with_frame_size(32, 18);
        let a = source.current_frame().unwrap();
        let b = source.current_frame().unwrap();
        assert_eq!(a.data(), b.data());
        assert_eq!(a.width(), 32);
    }
}
