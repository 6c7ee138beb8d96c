//! Export requests and quality tiers.

use serde::{Deserialize, Serialize};

use crate::caption::CaptionLine;

/// Output pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A named resolution/fidelity preset controlling both output dimensions
/// and caption font scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// 1280x720, free tier.
    Hd720,
    /// 1920x1080.
    Hd1080,
    /// 3840x2160.
    Uhd4k,
}

impl QualityTier {
    /// Fixed output dimensions for this tier.
    pub fn resolution(self) -> Resolution {
        match self {
            QualityTier::Hd720 => Resolution::new(1280, 720),
            QualityTier::Hd1080 => Resolution::new(1920, 1080),
            QualityTier::Uhd4k => Resolution::new(3840, 2160),
        }
    }

    /// Caption font size in pixels for this tier.
    pub fn caption_font_px(self) -> f64 {
        match self {
            QualityTier::Hd720 => 24.0,
            QualityTier::Hd1080 => 48.0,
            QualityTier::Uhd4k => 72.0,
        }
    }

    /// Stable lowercase label used in filenames and the CLI.
    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Hd720 => "720p",
            QualityTier::Hd1080 => "1080p",
            QualityTier::Uhd4k => "4k",
        }
    }

    /// Parse a CLI/user label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "720p" | "720" => Some(QualityTier::Hd720),
            "1080p" | "1080" => Some(QualityTier::Hd1080),
            "4k" | "2160p" => Some(QualityTier::Uhd4k),
            _ => None,
        }
    }
}

/// Immutable description of one export session, snapshotted at request
/// time. Mutating the live caption list after the request is created must
/// not affect an in-flight export, so the lines are cloned in.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Caption lines in declaration order (significant for tie-breaks).
    pub captions: Vec<CaptionLine>,

    /// Output quality preset.
    pub quality: QualityTier,

    /// Pro exports skip the watermark.
    pub pro: bool,

    /// Title used to derive the output filename.
    pub title: String,
}

impl ExportRequest {
    pub fn new(
        captions: &[CaptionLine],
        quality: QualityTier,
        pro: bool,
        title: impl Into<String>,
    ) -> Self {
        Self {
            captions: captions.to_vec(),
            quality,
            pro,
            title: title.into(),
        }
    }
}
