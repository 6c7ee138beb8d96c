//! CaptionKiln Export Engine
//!
//! Turns a playing media source plus a caption snapshot into a saved,
//! encoded video file with the captions burned in:
//!
//! ```text
//! MediaSource ──► Compositor ──► Surface ──► Encoder ──► chunks
//!      │                                        │
//!      └── AudioTap ────────────────────────────┘
//!                                               ▼
//!                            ExportController (state machine)
//!                                               ▼
//!                                  OutputSink (named file save)
//! ```
//!
//! The controller owns the session lifecycle — Idle, Preparing, Seeking,
//! Encoding, Finalizing, then a terminal state and back to Idle — with
//! cooperative cancellation and unconditional restoration of playback and
//! audio routing.

pub mod encoder;
pub mod output;
pub mod session;

pub use encoder::{EncodedChunk, Encoder, FfmpegEncoder, NullEncoder};
pub use output::{export_filename, sanitize_title, FileSink, OutputSink};
pub use session::{
    CancelHandle, ExportConfig, ExportController, ExportIo, ExportOutput, ExportState,
};
