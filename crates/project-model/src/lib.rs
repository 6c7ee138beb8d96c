//! CaptionKiln Data Model
//!
//! The types shared by the subtitle codec, the render engine, and the
//! export pipeline: timed caption lines, quality tiers with their fixed
//! output geometry, the immutable per-session export request, and the
//! in-memory project store the editor mutates between exports.

pub mod caption;
pub mod request;
pub mod store;

pub use caption::CaptionLine;
pub use request::{ExportRequest, QualityTier, Resolution};
pub use store::{ProjectStore, VideoEntry};
