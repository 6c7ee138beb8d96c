//! Text layout: greedy word wrap and bottom-anchored line stacking.

/// Line height as a multiple of font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// Measures rendered text width at a given font size.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_px: f64) -> f64;
}

/// Fixed-advance measurer for tests and headless callers: every character
/// advances the same fraction of the font size.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicMeasure {
    pub advance_em: f64,
}

impl Default for HeuristicMeasure {
    fn default() -> Self {
        Self { advance_em: 0.55 }
    }
}

impl TextMeasure for HeuristicMeasure {
    fn text_width(&self, text: &str, font_px: f64) -> f64 {
        text.chars().count() as f64 * self.advance_em * font_px
    }
}

/// Greedy word wrap.
///
/// Words accumulate onto the current line; a word that would push the line
/// past `max_width` commits the line first — unless the line is empty, in
/// which case the word is placed alone and allowed to overflow. Every
/// returned line therefore measures within `max_width` except single words
/// that alone exceed it.
pub fn wrap_text(
    text: &str,
    max_width: f64,
    font_px: f64,
    measure: &dyn TextMeasure,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
            continue;
        }

        let candidate = format!("{current} {word}");
        if measure.text_width(&candidate, font_px) > max_width {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Top y coordinate for each of `line_count` stacked lines.
///
/// Lines stack upward from a fixed bottom margin so the block's bottom
/// edge stays anchored regardless of how many lines wrapped.
pub fn line_tops(
    line_count: usize,
    font_px: f64,
    surface_height: f64,
    bottom_margin: f64,
) -> Vec<f64> {
    let line_height = font_px * LINE_HEIGHT_FACTOR;
    let block_bottom = surface_height - bottom_margin;
    (0..line_count)
        .map(|i| block_bottom - (line_count - i) as f64 * line_height)
        .collect()
}
