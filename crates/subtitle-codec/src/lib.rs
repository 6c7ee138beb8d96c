//! CaptionKiln Subtitle Codec
//!
//! Pure, synchronous parse/generate functions for the three caption
//! interchange formats the editor speaks:
//!
//! - **SRT** — blank-line-separated blocks with comma-millisecond timecodes
//! - **WebVTT** — header section, dot-millisecond timecodes, optional
//!   numeric cue identifiers
//! - **JSON script** — a `script` array wrapped in a metadata envelope
//!
//! All parsers are total: malformed blocks or cues are dropped and parsing
//! continues; a malformed JSON document yields an empty list. Generation is
//! the exact inverse to millisecond precision for well-formed lines.

pub mod json;
pub mod srt;
pub mod timecode;
pub mod vtt;

pub use json::{generate_json, parse_json};
pub use srt::{generate_srt, parse_srt};
pub use vtt::{generate_vtt, parse_vtt};

use std::path::Path;

use captionkiln_project_model::CaptionLine;

/// A caption interchange format, usually inferred from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Srt,
    Vtt,
    Json,
}

impl SubtitleFormat {
    /// Infer the format from a path's extension, defaulting to SRT.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("vtt") => SubtitleFormat::Vtt,
            Some("json") => SubtitleFormat::Json,
            _ => SubtitleFormat::Srt,
        }
    }

    /// Parse `content` as this format.
    pub fn parse(self, content: &str) -> Vec<CaptionLine> {
        match self {
            SubtitleFormat::Srt => parse_srt(content),
            SubtitleFormat::Vtt => parse_vtt(content),
            SubtitleFormat::Json => parse_json(content),
        }
    }

    /// Serialize `lines` as this format. `title` only affects the JSON
    /// envelope.
    pub fn generate(self, lines: &[CaptionLine], title: &str) -> String {
        match self {
            SubtitleFormat::Srt => generate_srt(lines),
            SubtitleFormat::Vtt => generate_vtt(lines),
            SubtitleFormat::Json => generate_json(lines, title),
        }
    }
}
