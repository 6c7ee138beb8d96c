//! Non-destructive audio tap routing.
//!
//! Exports need a capturable audio track from the same media source that
//! feeds the visible player, without silencing live monitoring before the
//! recording starts and without ever leaving playback disconnected after
//! it ends. The registry owns one [`SourceNode`] per media identity for
//! the life of the process; each export opens a [`SessionTap`], a scoped
//! guard that rewires the source to a fresh destination and — on close or
//! drop, on every exit path — reconnects the monitor output.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use captionkiln_common::error::KilnResult;

use crate::source::{MediaSource, MediaSourceId};

/// Pull-based PCM producer backing a source's audio endpoint.
///
/// Implementations should yield `round(to * rate) - round(from * rate)`
/// frames of interleaved samples for a `[from, to)` request.
pub trait AudioFeed: Send + Sync {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Interleaved PCM covering `[from_secs, to_secs)`.
    fn pull(&self, from_secs: f64, to_secs: f64) -> Vec<i16>;
}

/// Handle to a media source's audio output.
#[derive(Clone)]
pub struct AudioEndpoint {
    feed: Arc<dyn AudioFeed>,
}

impl AudioEndpoint {
    pub fn new(feed: Arc<dyn AudioFeed>) -> Self {
        Self { feed }
    }

    pub fn sample_rate(&self) -> u32 {
        self.feed.sample_rate()
    }

    pub fn channels(&self) -> u16 {
        self.feed.channels()
    }

    pub fn pull(&self, from_secs: f64, to_secs: f64) -> Vec<i16> {
        self.feed.pull(from_secs, to_secs)
    }
}

impl std::fmt::Debug for AudioEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEndpoint")
            .field("sample_rate", &self.sample_rate())
            .field("channels", &self.channels())
            .finish()
    }
}

/// Mono sine generator, the synthetic source's audio.
pub struct ToneFeed {
    sample_rate: u32,
    frequency_hz: f64,
    amplitude: f64,
}

impl ToneFeed {
    pub fn new(sample_rate: u32, frequency_hz: f64, amplitude: f64) -> Self {
        Self {
            sample_rate,
            frequency_hz,
            amplitude: amplitude.clamp(0.0, 1.0),
        }
    }
}

impl Default for ToneFeed {
    fn default() -> Self {
        Self::new(48_000, 440.0, 0.2)
    }
}

impl AudioFeed for ToneFeed {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        1
    }

    fn pull(&self, from_secs: f64, to_secs: f64) -> Vec<i16> {
        let rate = self.sample_rate as f64;
        let first = (from_secs.max(0.0) * rate).round() as u64;
        let last = (to_secs.max(0.0) * rate).round() as u64;
        (first..last)
            .map(|n| {
                let phase = 2.0 * std::f64::consts::PI * self.frequency_hz * n as f64 / rate;
                (phase.sin() * self.amplitude * i16::MAX as f64) as i16
            })
            .collect()
    }
}

type DestinationId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wiring {
    /// Connected to the live monitor output (the user hears it).
    Monitor,
    /// Connected to a session's capture destination.
    Tap(DestinationId),
}

/// Process-wide audio node for one media source. Outlives any single
/// export session.
pub struct SourceNode {
    media: MediaSourceId,
    endpoint: AudioEndpoint,
    wiring: Mutex<Wiring>,
}

impl SourceNode {
    pub fn media_id(&self) -> &MediaSourceId {
        &self.media
    }

    pub fn endpoint(&self) -> &AudioEndpoint {
        &self.endpoint
    }

    /// Whether the source currently feeds the live monitor output.
    pub fn is_monitoring(&self) -> bool {
        *lock(&self.wiring) == Wiring::Monitor
    }

    pub fn is_tapped(&self) -> bool {
        matches!(*lock(&self.wiring), Wiring::Tap(_))
    }

    fn connect_tap(&self, destination: DestinationId) {
        let mut wiring = lock(&self.wiring);
        if let Wiring::Tap(previous) = *wiring {
            tracing::warn!(
                media = %self.media,
                previous,
                "Source was still tapped when a new session tap opened"
            );
        }
        *wiring = Wiring::Tap(destination);
    }

    /// Reconnect the monitor output, but only if this destination still
    /// owns the wiring. Returns whether the reconnect happened.
    fn reconnect_monitor(&self, destination: DestinationId) -> bool {
        let mut wiring = lock(&self.wiring);
        if *wiring == Wiring::Tap(destination) {
            *wiring = Wiring::Monitor;
            true
        } else {
            false
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Registry of source nodes, keyed by media identity.
///
/// `acquire_source` is idempotent: the first call for a given source
/// creates the node, later calls return the same one. Entries live for the
/// registry's lifetime; only session destinations come and go.
#[derive(Default)]
pub struct AudioTapRegistry {
    sources: Mutex<HashMap<MediaSourceId, Arc<SourceNode>>>,
    next_destination: AtomicU64,
}

impl AudioTapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the source node for `media`. Creation can fail for
    /// sources that deny audio capture; callers treat that as non-fatal
    /// and export video-only.
    pub fn acquire_source(&self, media: &dyn MediaSource) -> KilnResult<Arc<SourceNode>> {
        let mut sources = lock(&self.sources);
        if let Some(existing) = sources.get(&media.id()) {
            return Ok(existing.clone());
        }

        let endpoint = media.audio_endpoint()?;
        let node = Arc::new(SourceNode {
            media: media.id(),
            endpoint,
            wiring: Mutex::new(Wiring::Monitor),
        });
        tracing::info!(media = %media.id(), "Created audio source node");
        sources.insert(media.id(), node.clone());
        Ok(node)
    }

    /// Rewire `source` into a fresh session destination and hand back the
    /// scoped tap guarding it.
    pub fn open_session_tap(&self, source: &Arc<SourceNode>) -> SessionTap {
        let destination = self.next_destination.fetch_add(1, Ordering::Relaxed) + 1;
        source.connect_tap(destination);
        tracing::debug!(media = %source.media, destination, "Opened session audio tap");
        SessionTap {
            source: source.clone(),
            destination,
            open: true,
        }
    }
}

/// Scoped session tap. While open, the source feeds the session's capture
/// destination instead of the monitor output. Closing — explicitly or by
/// drop, on any exit path — reconnects the monitor output.
pub struct SessionTap {
    source: Arc<SourceNode>,
    destination: DestinationId,
    open: bool,
}

impl SessionTap {
    /// The capturable track for this tap.
    pub fn track(&self) -> AudioTrack {
        AudioTrack {
            source: self.source.clone(),
            destination: self.destination,
        }
    }

    pub fn source(&self) -> &Arc<SourceNode> {
        &self.source
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if self.source.reconnect_monitor(self.destination) {
            tracing::debug!(media = %self.source.media, "Reconnected monitor output");
        } else {
            tracing::warn!(
                media = %self.source.media,
                "Audio wiring changed underneath the session tap"
            );
        }
    }
}

impl Drop for SessionTap {
    fn drop(&mut self) {
        self.release();
    }
}

/// Capturable PCM track fed by a session tap. Pulls yield real samples
/// only while the tap wiring is in place; afterwards they yield silence of
/// the same span, keeping downstream timelines aligned.
#[derive(Clone)]
pub struct AudioTrack {
    source: Arc<SourceNode>,
    destination: DestinationId,
}

impl AudioTrack {
    pub fn sample_rate(&self) -> u32 {
        self.source.endpoint.sample_rate()
    }

    pub fn channels(&self) -> u16 {
        self.source.endpoint.channels()
    }

    /// Interleaved PCM for `[from_secs, to_secs)`.
    pub fn pull_range(&self, from_secs: f64, to_secs: f64) -> Vec<i16> {
        if *lock(&self.source.wiring) == Wiring::Tap(self.destination) {
            self.source.endpoint.pull(from_secs, to_secs)
        } else {
            let rate = self.sample_rate() as f64;
            let first = (from_secs.max(0.0) * rate).round() as u64;
            let last = (to_secs.max(0.0) * rate).round() as u64;
            vec![0; (last.saturating_sub(first)) as usize * self.channels() as usize]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SyntheticSource;

    #[test]
    fn acquire_source_is_idempotent() {
        let registry = AudioTapRegistry::new();
        let source = SyntheticSource::new("clip", 5.0);

        let a = registry.acquire_source(&source).unwrap();
        let b = registry.acquire_source(&source).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn denied_audio_surfaces_as_routing_error() {
        let registry = AudioTapRegistry::new();
        let source = SyntheticSource::new("clip", 5.0).without_audio();
        assert!(registry.acquire_source(&source).is_err());
    }

    #[test]
    fn tap_rewires_and_close_restores_monitoring() {
        let registry = AudioTapRegistry::new();
        let source = SyntheticSource::new("clip", 5.0);
        let node = registry.acquire_source(&source).unwrap();
        assert!(node.is_monitoring());

        let tap = registry.open_session_tap(&node);
        assert!(node.is_tapped());
        assert!(!node.is_monitoring());

        tap.close();
        assert!(node.is_monitoring());
    }

    #[test]
    fn dropping_a_tap_restores_monitoring() {
        let registry = AudioTapRegistry::new();
        let source = SyntheticSource::new("clip", 5.0);
        let node = registry.acquire_source(&source).unwrap();

        {
            let _tap = registry.open_session_tap(&node);
            assert!(node.is_tapped());
        }
        assert!(node.is_monitoring());
    }

    #[test]
    fn track_goes_silent_after_close() {
        let registry = AudioTapRegistry::new();
        let source = SyntheticSource::new("clip", 5.0);
        let node = registry.acquire_source(&source).unwrap();

        let tap = registry.open_session_tap(&node);
        let track = tap.track();

        let live = track.pull_range(0.0, 0.01);
        assert!(live.iter().any(|&s| s != 0));

        tap.close();
        let silent = track.pull_range(0.01, 0.02);
        assert_eq!(live.len(), silent.len());
        assert!(silent.iter().all(|&s| s == 0));
    }

    #[test]
    fn tone_feed_sample_counts_track_the_request_span() {
        let feed = ToneFeed::default();
        assert_eq!(feed.pull(0.0, 1.0).len(), 48_000);
        assert_eq!(feed.pull(0.25, 0.5).len(), 12_000);
        assert!(feed.pull(1.0, 1.0).is_empty());
    }

    #[test]
    fn successive_taps_get_distinct_destinations() {
        let registry = AudioTapRegistry::new();
        let source = SyntheticSource::new("clip", 5.0);
        let node = registry.acquire_source(&source).unwrap();

        let first = registry.open_session_tap(&node);
        let stale_track = first.track();
        first.close();

        let second = registry.open_session_tap(&node);
        // The stale track must not read through the new session's wiring.
        assert!(stale_track.pull_range(0.0, 0.001).iter().all(|&s| s == 0));
        second.close();
    }
}
