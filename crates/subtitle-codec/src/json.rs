//! JSON script parsing and generation.
//!
//! The JSON interchange format wraps the caption list in a metadata
//! envelope:
//!
//! ```json
//! {
//!   "metadata": { "title": "...", "createdAt": "...", "version": "1.0" },
//!   "script": [ { "id": "...", "text": "...", "startTime": 0.0, "endTime": 1.0 } ]
//! }
//! ```

use captionkiln_project_model::CaptionLine;
use serde::{Deserialize, Serialize};

/// Envelope format version emitted by [`generate_json`].
pub const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    metadata: Metadata,
    script: &'a [CaptionLine],
}

#[derive(Debug, Serialize)]
struct Metadata {
    title: String,
    #[serde(rename = "createdAt")]
    created_at: String,
    version: String,
}

/// Incoming documents accept both the emitted key names and the shorthand
/// `start`/`end` aliases, and tolerate numeric strings where numbers are
/// expected.
#[derive(Debug, Deserialize)]
struct WireDocument {
    script: Vec<WireCue>,
}

#[derive(Debug, Deserialize)]
struct WireCue {
    #[serde(alias = "startTime")]
    start: WireSeconds,
    #[serde(alias = "endTime")]
    end: WireSeconds,
    text: WireText,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireSeconds {
    Number(f64),
    Text(String),
}

impl WireSeconds {
    /// Coerce to the float domain. Unparseable strings become NaN, which
    /// yields a line that never matches a playback time — the same
    /// degradation as any other malformed interval.
    fn seconds(&self) -> f64 {
        match self {
            WireSeconds::Number(n) => *n,
            WireSeconds::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireText {
    Text(String),
    Number(f64),
}

impl WireText {
    fn into_string(self) -> String {
        match self {
            WireText::Text(s) => s,
            WireText::Number(n) => n.to_string(),
        }
    }
}

/// Parse a JSON script document into caption lines.
///
/// JSON is all-or-nothing: any structural failure yields an empty list
/// rather than a partial one.
pub fn parse_json(content: &str) -> Vec<CaptionLine> {
    match serde_json::from_str::<WireDocument>(content) {
        Ok(doc) => doc
            .script
            .into_iter()
            .map(|cue| CaptionLine::new(cue.text.into_string(), cue.start.seconds(), cue.end.seconds()))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse JSON script");
            Vec::new()
        }
    }
}

/// Generate a JSON script document wrapping `captions` in a metadata
/// envelope.
pub fn generate_json(captions: &[CaptionLine], title: &str) -> String {
    let envelope = Envelope {
        metadata: Metadata {
            title: title.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            version: FORMAT_VERSION.to_string(),
        },
        script: captions,
    };

    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize JSON script");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_envelope() {
        let original = vec![
            CaptionLine::new("first", 0.0, 1.5),
            CaptionLine::new("second", 1.5, 3.0),
        ];
        let parsed = parse_json(&generate_json(&original, "Demo"));
        assert_eq!(parsed.len(), 2);
        for (a, b) in original.iter().zip(&parsed) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.start_secs, b.start_secs);
            assert_eq!(a.end_secs, b.end_secs);
        }
    }

    #[test]
    fn envelope_carries_metadata() {
        let json = generate_json(&[], "My Title");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["title"], "My Title");
        assert_eq!(value["metadata"]["version"], FORMAT_VERSION);
        assert!(value["metadata"]["createdAt"].is_string());
        assert!(value["script"].as_array().unwrap().is_empty());
    }

    #[test]
    fn accepts_short_key_aliases() {
        let input = r#"{"script": [{"start": 1.0, "end": 2.0, "text": "aliased"}]}"#;
        let parsed = parse_json(input);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].start_secs, 1.0);
        assert_eq!(parsed[0].end_secs, 2.0);
    }

    #[test]
    fn coerces_numeric_strings() {
        let input = r#"{"script": [{"start": "1.25", "end": "2", "text": "strings"}]}"#;
        let parsed = parse_json(input);
        assert_eq!(parsed[0].start_secs, 1.25);
        assert_eq!(parsed[0].end_secs, 2.0);
    }

    #[test]
    fn unparseable_time_string_never_matches() {
        let input = r#"{"script": [{"start": "soon", "end": "later", "text": "nan"}]}"#;
        let parsed = parse_json(input);
        assert_eq!(parsed.len(), 1);
        assert!(!parsed[0].covers(0.0));
        assert!(!parsed[0].covers(1_000_000.0));
    }

    #[test]
    fn malformed_document_yields_empty_list() {
        assert!(parse_json("not json").is_empty());
        assert!(parse_json("{}").is_empty());
        assert!(parse_json(r#"{"script": "not an array"}"#).is_empty());
        // One bad entry poisons the whole document: JSON is all-or-nothing.
        assert!(parse_json(r#"{"script": [{"text": "missing times"}]}"#).is_empty());
    }
}
