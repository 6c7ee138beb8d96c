//! Round-trip properties for the textual subtitle formats.
//!
//! For any well-formed caption list (non-negative times, end > start, text
//! without blank lines or digit-only lines), parsing a generated document
//! must reproduce the same times to millisecond precision and the same
//! text.

use captionkiln_project_model::CaptionLine;
use captionkiln_subtitles::{generate_srt, generate_vtt, parse_srt, parse_vtt};
use proptest::prelude::*;

fn caption_text() -> impl Strategy<Value = String> {
    // Starts and ends on a word character so parser-side trimming is a
    // no-op; contains at least one letter so WebVTT cannot mistake the
    // line for a numeric cue identifier.
    "[A-Za-z][A-Za-z0-9 ,.!?']{0,40}[A-Za-z]"
}

fn caption_list() -> impl Strategy<Value = Vec<CaptionLine>> {
    prop::collection::vec((0u64..86_400_000, 1u64..60_000, caption_text()), 1..12).prop_map(
        |entries| {
            entries
                .into_iter()
                .map(|(start_ms, duration_ms, text)| {
                    CaptionLine::new(
                        text,
                        start_ms as f64 / 1000.0,
                        (start_ms + duration_ms) as f64 / 1000.0,
                    )
                })
                .collect()
        },
    )
}

fn assert_millisecond_equal(original: &[CaptionLine], parsed: &[CaptionLine]) {
    assert_eq!(original.len(), parsed.len());
    for (a, b) in original.iter().zip(parsed) {
        assert_eq!(a.text, b.text);
        assert!((a.start_secs - b.start_secs).abs() < 0.0005);
        assert!((a.end_secs - b.end_secs).abs() < 0.0005);
    }
}

proptest! {
    #[test]
    fn srt_round_trips(original in caption_list()) {
        let parsed = parse_srt(&generate_srt(&original));
        assert_millisecond_equal(&original, &parsed);
    }

    #[test]
    fn vtt_round_trips(original in caption_list()) {
        let parsed = parse_vtt(&generate_vtt(&original));
        assert_millisecond_equal(&original, &parsed);
    }

    #[test]
    fn srt_reserialization_is_stable(original in caption_list()) {
        let first = generate_srt(&original);
        let second = generate_srt(&parse_srt(&first));
        assert_eq!(first, second);
    }
}
