//! Frame compositor: per-tick draw instructions for burn-in export.
//!
//! `compose_frame` is pure — given the caption snapshot, the playback
//! time, and the output tier it decides what this frame shows and where.
//! A [`Surface`](crate::surface::Surface) executes the instructions.

use captionkiln_project_model::{CaptionLine, QualityTier};

use crate::layout::{line_tops, wrap_text, TextMeasure};

/// Packed RGBA color.
pub type Rgba = [u8; 4];

/// Watermark string burned into free-tier exports.
pub const WATERMARK_TEXT: &str = "CaptionKiln Free";
/// Watermark font size in pixels.
pub const WATERMARK_FONT_PX: f64 = 24.0;
/// Watermark opacity.
pub const WATERMARK_ALPHA: f64 = 0.5;
/// Inset of the watermark from the bottom-right corner.
const WATERMARK_INSET_PX: f64 = 20.0;

/// Captions wrap at this fraction of the surface width.
const CAPTION_WIDTH_FRACTION: f64 = 0.9;
/// Bottom margin of the caption block as a fraction of surface height.
const CAPTION_MARGIN_FRACTION: f64 = 0.06;

/// Light fill over a dark outline keeps captions legible on any footage.
pub const CAPTION_FILL: Rgba = [245, 245, 245, 255];
pub const CAPTION_STROKE: Rgba = [16, 16, 16, 255];

/// Watermark instruction for a single frame.
#[derive(Debug, Clone)]
pub struct WatermarkOverlay {
    pub text: &'static str,
    pub font_px: f64,
    pub alpha: f64,
    /// Top-left position in output pixels.
    pub x: f64,
    pub y: f64,
}

/// One positioned caption line.
#[derive(Debug, Clone)]
pub struct SubtitleLine {
    pub text: String,
    /// Top-left position in output pixels.
    pub x: f64,
    pub y: f64,
}

/// Caption block instruction for a single frame.
#[derive(Debug, Clone)]
pub struct SubtitleBlock {
    pub lines: Vec<SubtitleLine>,
    pub font_px: f64,
    pub fill: Rgba,
    pub stroke: Rgba,
    pub stroke_px: f64,
}

/// A single frame's draw instructions. The source frame is always
/// scale-drawn to fill the surface first; the overlays follow in order.
#[derive(Debug, Clone)]
pub struct FrameComposition {
    pub time_secs: f64,
    pub watermark: Option<WatermarkOverlay>,
    pub subtitle: Option<SubtitleBlock>,
}

/// Select the caption line showing at `time_secs`: the first entry in
/// declaration order whose half-open interval `[start, end)` contains it.
/// When several lines overlap the same instant only the earliest-declared
/// one is shown.
pub fn active_line(captions: &[CaptionLine], time_secs: f64) -> Option<&CaptionLine> {
    captions.iter().find(|line| line.covers(time_secs))
}

/// Build the draw instructions for one tick.
pub fn compose_frame(
    captions: &[CaptionLine],
    time_secs: f64,
    quality: QualityTier,
    pro: bool,
    measure: &dyn TextMeasure,
) -> FrameComposition {
    let resolution = quality.resolution();
    let surface_w = resolution.width as f64;
    let surface_h = resolution.height as f64;

    let watermark = (!pro).then(|| {
        let text_w = measure.text_width(WATERMARK_TEXT, WATERMARK_FONT_PX);
        WatermarkOverlay {
            text: WATERMARK_TEXT,
            font_px: WATERMARK_FONT_PX,
            alpha: WATERMARK_ALPHA,
            x: surface_w - text_w - WATERMARK_INSET_PX,
            y: surface_h - WATERMARK_FONT_PX - WATERMARK_INSET_PX,
        }
    });

    let subtitle = active_line(captions, time_secs).map(|line| {
        let font_px = quality.caption_font_px();
        let wrapped = wrap_text(
            &line.text,
            surface_w * CAPTION_WIDTH_FRACTION,
            font_px,
            measure,
        );
        let tops = line_tops(
            wrapped.len(),
            font_px,
            surface_h,
            surface_h * CAPTION_MARGIN_FRACTION,
        );
        let lines = wrapped
            .into_iter()
            .zip(tops)
            .map(|(text, y)| {
                let x = (surface_w - measure.text_width(&text, font_px)) / 2.0;
                SubtitleLine { text, x, y }
            })
            .collect();
        SubtitleBlock {
            lines,
            font_px,
            fill: CAPTION_FILL,
            stroke: CAPTION_STROKE,
            stroke_px: (font_px / 12.0).max(2.0),
        }
    });

    FrameComposition {
        time_secs,
        watermark,
        subtitle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::HeuristicMeasure;

    fn measure() -> HeuristicMeasure {
        HeuristicMeasure::default()
    }

    fn lines(entries: &[(&str, f64, f64)]) -> Vec<CaptionLine> {
        entries
            .iter()
            .map(|(text, start, end)| CaptionLine::new(*text, *start, *end))
            .collect()
    }

    #[test]
    fn watermark_present_iff_free_tier() {
        let captions = lines(&[("hi", 0.0, 1.0)]);
        let free = compose_frame(&captions, 0.5, QualityTier::Hd720, false, &measure());
        let pro = compose_frame(&captions, 0.5, QualityTier::Hd720, true, &measure());
        assert!(free.watermark.is_some());
        assert!(pro.watermark.is_none());
    }

    #[test]
    fn watermark_sits_inside_bottom_right_corner() {
        let comp = compose_frame(&[], 0.0, QualityTier::Hd1080, false, &measure());
        let wm = comp.watermark.unwrap();
        assert_eq!(wm.text, WATERMARK_TEXT);
        let m = measure();
        let right_edge = wm.x + m.text_width(wm.text, wm.font_px);
        assert!((right_edge - (1920.0 - 20.0)).abs() < 1e-6);
        assert!(wm.y < 1080.0 - 20.0);
    }

    #[test]
    fn overlapping_lines_resolve_to_first_declared() {
        let captions = lines(&[
            ("late but first", 1.0, 5.0),
            ("second", 0.0, 10.0),
            ("third", 2.0, 3.0),
        ]);
        assert_eq!(active_line(&captions, 2.5).unwrap().text, "late but first");
        // Before the first entry starts, the second matches.
        assert_eq!(active_line(&captions, 0.5).unwrap().text, "second");
        assert!(active_line(&captions, 10.0).is_none());
    }

    #[test]
    fn interval_is_half_open() {
        let captions = lines(&[("a", 1.0, 2.0), ("b", 2.0, 3.0)]);
        assert_eq!(active_line(&captions, 2.0).unwrap().text, "b");
    }

    #[test]
    fn font_size_follows_quality_tier() {
        let captions = lines(&[("hello", 0.0, 1.0)]);
        for (tier, expected) in [
            (QualityTier::Hd720, 24.0),
            (QualityTier::Hd1080, 48.0),
            (QualityTier::Uhd4k, 72.0),
        ] {
            let comp = compose_frame(&captions, 0.5, tier, true, &measure());
            assert_eq!(comp.subtitle.unwrap().font_px, expected);
        }
    }

    #[test]
    fn no_subtitle_block_when_no_line_is_active() {
        let captions = lines(&[("hello", 1.0, 2.0)]);
        let comp = compose_frame(&captions, 5.0, QualityTier::Hd720, true, &measure());
        assert!(comp.subtitle.is_none());
    }

    #[test]
    fn caption_lines_are_centered() {
        let captions = lines(&[("short", 0.0, 1.0)]);
        let comp = compose_frame(&captions, 0.5, QualityTier::Hd720, true, &measure());
        let block = comp.subtitle.unwrap();
        let m = measure();
        for line in &block.lines {
            let left = line.x;
            let right = 1280.0 - (line.x + m.text_width(&line.text, block.font_px));
            assert!((left - right).abs() < 1e-6, "line {:?} not centered", line.text);
        }
    }

    #[test]
    fn long_captions_wrap_within_ninety_percent_width() {
        let text = "this caption is deliberately long enough that it must wrap onto \
                    several lines at seven hundred twenty pixels";
        let captions = lines(&[(text, 0.0, 1.0)]);
        let comp = compose_frame(&captions, 0.5, QualityTier::Hd720, true, &measure());
        let block = comp.subtitle.unwrap();
        assert!(block.lines.len() > 1);
        let m = measure();
        for line in &block.lines {
            assert!(m.text_width(&line.text, block.font_px) <= 1280.0 * 0.9);
        }
    }

    #[test]
    fn caption_block_is_bottom_anchored() {
        let one = lines(&[("one line", 0.0, 1.0)]);
        let many = lines(&[(
            "a very long caption that wraps over multiple lines when rendered at this width for sure",
            0.0,
            1.0,
        )]);
        let bottom = |caps: &[CaptionLine]| {
            let comp = compose_frame(caps, 0.5, QualityTier::Hd720, true, &measure());
            let block = comp.subtitle.unwrap();
            block.lines.last().unwrap().y + block.font_px * crate::layout::LINE_HEIGHT_FACTOR
        };
        assert!((bottom(&one) - bottom(&many)).abs() < 1e-6);
    }
}
