//! CaptionKiln Render Engine
//!
//! Per-tick compositing for burn-in export:
//!
//! ```text
//! source frame ────┐
//!                  ├── Scale to output resolution
//! caption list ────┤         │
//!                  │         ├── Watermark (free tier)
//! playback time ───┘         │
//!                            ├── Active caption line
//!                            │   (wrap, center, stroke+fill)
//!                            ▼
//!                     FrameComposition ──► Surface ──► RGBA pixels
//! ```
//!
//! The compositor is pure: it selects the active caption line, lays out
//! text through a caller-supplied measurer, and emits draw instructions.
//! A [`Surface`] executes them; [`SoftwareSurface`] is the built-in
//! raster.

pub mod compositor;
pub mod layout;
pub mod raster;
pub mod surface;

pub use compositor::{compose_frame, FrameComposition};
pub use layout::{wrap_text, HeuristicMeasure, TextMeasure};
pub use raster::SoftwareSurface;
pub use surface::Surface;
