//! Software raster surface.
//!
//! Scales source frames with the `image` resampler and draws text by
//! rasterizing glyph coverage from a TrueType font. The caption outline is
//! a stroke pass (the glyphs re-drawn at eight offsets in the stroke
//! color) followed by the fill pass.

use std::path::{Path, PathBuf};

use captionkiln_common::error::{KilnError, KilnResult};
use captionkiln_media::VideoFrame;
use captionkiln_project_model::Resolution;
use image::imageops::FilterType;
use image::{ImageBuffer, Rgba, RgbaImage};
use rusttype::{point, Font, Scale};

use crate::compositor::FrameComposition;
use crate::layout::TextMeasure;
use crate::surface::Surface;

/// Well-known bold sans locations probed when no font file is configured.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/noto/NotoSans-Bold.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSansBold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Resolve the font file burned-in text will use.
pub fn locate_font(preferred: Option<&Path>) -> KilnResult<PathBuf> {
    if let Some(path) = preferred {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(KilnError::surface_unavailable(format!(
            "configured font file {} does not exist",
            path.display()
        )));
    }

    FONT_CANDIDATES
        .iter()
        .map(Path::new)
        .find(|p| p.is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            KilnError::surface_unavailable(
                "no usable font found; set export.font_file in the configuration",
            )
        })
}

fn load_font(preferred: Option<&Path>) -> KilnResult<Font<'static>> {
    let path = locate_font(preferred)?;
    let bytes = std::fs::read(&path)?;
    tracing::debug!(font = %path.display(), "Loaded render font");
    Font::try_from_vec(bytes).ok_or_else(|| {
        KilnError::surface_unavailable(format!("{} is not a usable font file", path.display()))
    })
}

/// CPU raster target for the export pipeline.
pub struct SoftwareSurface {
    resolution: Resolution,
    canvas: RgbaImage,
    font: Font<'static>,
}

impl SoftwareSurface {
    /// Create a surface at the given output resolution. Fails when no
    /// usable font can be found, since burned-in text would be impossible.
    pub fn new(resolution: Resolution, font_file: Option<&Path>) -> KilnResult<Self> {
        let font = load_font(font_file)?;
        Ok(Self {
            resolution,
            canvas: ImageBuffer::from_pixel(
                resolution.width,
                resolution.height,
                Rgba([0, 0, 0, 255]),
            ),
            font,
        })
    }

    fn draw_source(&mut self, source: &VideoFrame) {
        self.canvas = scale_to_fill(source, self.resolution.width, self.resolution.height);
    }

    fn draw_text(&mut self, text: &str, x: f64, y_top: f64, font_px: f64, color: [u8; 4], alpha: f64) {
        let scale = Scale::uniform(font_px as f32);
        let ascent = self.font.v_metrics(scale).ascent;
        let origin = point(x as f32, y_top as f32 + ascent);

        for glyph in self.font.layout(text, scale, origin) {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, coverage| {
                    let px = bb.min.x + gx as i32;
                    let py = bb.min.y + gy as i32;
                    blend_pixel(&mut self.canvas, px, py, color, coverage as f64 * alpha);
                });
            }
        }
    }

    fn draw_text_outlined(
        &mut self,
        text: &str,
        x: f64,
        y_top: f64,
        font_px: f64,
        fill: [u8; 4],
        stroke: [u8; 4],
        stroke_px: f64,
    ) {
        for (dx, dy) in [
            (-1.0, -1.0),
            (0.0, -1.0),
            (1.0, -1.0),
            (-1.0, 0.0),
            (1.0, 0.0),
            (-1.0, 1.0),
            (0.0, 1.0),
            (1.0, 1.0),
        ] {
            self.draw_text(
                text,
                x + dx * stroke_px,
                y_top + dy * stroke_px,
                font_px,
                stroke,
                1.0,
            );
        }
        self.draw_text(text, x, y_top, font_px, fill, 1.0);
    }
}

impl TextMeasure for SoftwareSurface {
    fn text_width(&self, text: &str, font_px: f64) -> f64 {
        let scale = Scale::uniform(font_px as f32);
        self.font
            .layout(text, scale, point(0.0, 0.0))
            .last()
            .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0) as f64
    }
}

impl Surface for SoftwareSurface {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn measure(&self) -> &dyn TextMeasure {
        self
    }

    fn paint(&mut self, composition: &FrameComposition, source: &VideoFrame) -> KilnResult<()> {
        self.draw_source(source);

        if let Some(wm) = &composition.watermark {
            let color = [255, 255, 255, 255];
            self.draw_text(wm.text, wm.x, wm.y, wm.font_px, color, wm.alpha);
        }

        if let Some(block) = &composition.subtitle {
            for line in &block.lines {
                self.draw_text_outlined(
                    &line.text,
                    line.x,
                    line.y,
                    block.font_px,
                    block.fill,
                    block.stroke,
                    block.stroke_px,
                );
            }
        }

        Ok(())
    }

    fn pixels(&self) -> &[u8] {
        self.canvas.as_raw()
    }
}

/// Scale a source frame to exactly fill `width` x `height`.
fn scale_to_fill(source: &VideoFrame, width: u32, height: u32) -> RgbaImage {
    let src: RgbaImage = match ImageBuffer::from_raw(
        source.width(),
        source.height(),
        source.data().to_vec(),
    ) {
        Some(img) => img,
        // VideoFrame guarantees a packed RGBA buffer; an empty frame is the
        // only way to get here.
        None => return ImageBuffer::from_pixel(width, height, Rgba([0, 0, 0, 255])),
    };

    if src.width() == width && src.height() == height {
        return src;
    }
    image::imageops::resize(&src, width, height, FilterType::Triangle)
}

fn blend_pixel(canvas: &mut RgbaImage, x: i32, y: i32, color: [u8; 4], alpha: f64) {
    if x < 0 || y < 0 || x >= canvas.width() as i32 || y >= canvas.height() as i32 {
        return;
    }
    let alpha = alpha.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }

    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    for channel in 0..3 {
        let src = color[channel] as f64;
        let dst = pixel[channel] as f64;
        pixel[channel] = (src * alpha + dst * (1.0 - alpha)).round() as u8;
    }
    pixel[3] = 255;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_to_fill_preserves_solid_color() {
        let frame = VideoFrame::solid(8, 4, [120, 30, 60, 255]);
        let scaled = scale_to_fill(&frame, 16, 8);
        assert_eq!(scaled.dimensions(), (16, 8));
        assert_eq!(scaled.get_pixel(0, 0).0, [120, 30, 60, 255]);
        assert_eq!(scaled.get_pixel(15, 7).0, [120, 30, 60, 255]);
    }

    #[test]
    fn scale_to_fill_passes_matching_dimensions_through() {
        let frame = VideoFrame::solid(16, 8, [1, 2, 3, 255]);
        let scaled = scale_to_fill(&frame, 16, 8);
        assert_eq!(scaled.as_raw().as_slice(), frame.data());
    }

    #[test]
    fn blend_full_alpha_replaces_and_zero_alpha_keeps() {
        let mut canvas: RgbaImage = ImageBuffer::from_pixel(2, 2, Rgba([10, 10, 10, 255]));
        blend_pixel(&mut canvas, 0, 0, [200, 100, 50, 255], 1.0);
        assert_eq!(canvas.get_pixel(0, 0).0, [200, 100, 50, 255]);

        blend_pixel(&mut canvas, 1, 1, [200, 100, 50, 255], 0.0);
        assert_eq!(canvas.get_pixel(1, 1).0, [10, 10, 10, 255]);
    }

    #[test]
    fn blend_half_alpha_mixes_channels() {
        let mut canvas: RgbaImage = ImageBuffer::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        blend_pixel(&mut canvas, 0, 0, [200, 100, 50, 255], 0.5);
        let px = canvas.get_pixel(0, 0).0;
        assert_eq!(px[0], 100);
        assert_eq!(px[1], 50);
        assert_eq!(px[2], 25);
    }

    #[test]
    fn blend_ignores_out_of_bounds() {
        let mut canvas: RgbaImage = ImageBuffer::from_pixel(2, 2, Rgba([5, 5, 5, 255]));
        blend_pixel(&mut canvas, -1, 0, [255, 255, 255, 255], 1.0);
        blend_pixel(&mut canvas, 0, 9, [255, 255, 255, 255], 1.0);
        assert!(canvas.pixels().all(|p| p.0 == [5, 5, 5, 255]));
    }
}
