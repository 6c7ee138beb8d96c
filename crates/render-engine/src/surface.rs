//! The surface seam between composition and pixels.

use captionkiln_common::error::KilnResult;
use captionkiln_media::VideoFrame;
use captionkiln_project_model::Resolution;

use crate::compositor::FrameComposition;
use crate::layout::TextMeasure;

/// A render target that can execute frame compositions.
///
/// The export controller validates a surface up front (its absence or a
/// resolution mismatch aborts before any resource is acquired), then calls
/// [`paint`](Surface::paint) once per tick and hands
/// [`pixels`](Surface::pixels) to the encoder.
pub trait Surface: Send {
    /// Fixed output resolution of this surface.
    fn resolution(&self) -> Resolution;

    /// Text measurer matching this surface's font rendering, used by the
    /// compositor for wrapping and centering.
    fn measure(&self) -> &dyn TextMeasure;

    /// Execute one composition: scale-draw the source frame, then the
    /// overlays.
    fn paint(&mut self, composition: &FrameComposition, source: &VideoFrame) -> KilnResult<()>;

    /// The most recently painted frame as packed RGBA8.
    fn pixels(&self) -> &[u8];
}
