//! CaptionKiln Media Graph
//!
//! Contracts and plumbing between the export pipeline and whatever is
//! actually playing media:
//!
//! - [`MediaSource`] — the playable source handle (play/pause/seek, clock,
//!   volume, frames, audio endpoint)
//! - [`PlaybackSnapshot`] — capture and restore of the user-visible
//!   playback state around an export
//! - [`AudioTapRegistry`] / [`SessionTap`] — non-destructive audio routing:
//!   one source node per media identity, a scoped per-session tap whose
//!   release always reconnects the monitor output
//! - [`SyntheticSource`] — a clock-driven test-pattern source for tests and
//!   the CLI render harness

pub mod audio;
pub mod frame;
pub mod source;

pub use audio::{AudioEndpoint, AudioFeed, AudioTapRegistry, AudioTrack, SessionTap, ToneFeed};
pub use frame::VideoFrame;
pub use source::{MediaSource, MediaSourceId, PlaybackSnapshot, SyntheticSource};
