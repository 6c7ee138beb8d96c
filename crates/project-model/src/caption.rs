//! Timed caption lines.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One timed subtitle entry.
///
/// `end_secs > start_secs` is expected but deliberately not enforced:
/// a malformed line is tolerated everywhere and simply never matches a
/// playback time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionLine {
    /// Opaque identifier, regenerated whenever a line is (re)parsed.
    pub id: Uuid,

    /// Caption text. May contain embedded newlines, never blank lines.
    pub text: String,

    /// Display start in seconds.
    #[serde(rename = "startTime")]
    pub start_secs: f64,

    /// Display end in seconds.
    #[serde(rename = "endTime")]
    pub end_secs: f64,
}

impl CaptionLine {
    /// Create a line with a fresh identifier.
    pub fn new(text: impl Into<String>, start_secs: f64, end_secs: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            start_secs,
            end_secs,
        }
    }

    /// Whether `time_secs` falls inside this line's half-open interval
    /// `[start, end)`.
    pub fn covers(&self, time_secs: f64) -> bool {
        time_secs >= self.start_secs && time_secs < self.end_secs
    }

    /// Display duration in seconds. Negative for malformed lines.
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}
