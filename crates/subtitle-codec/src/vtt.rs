//! WebVTT parsing and generation.

use captionkiln_project_model::CaptionLine;

use crate::timecode::{format_timecode, parse_timecode_range};

/// Parse WebVTT content into caption lines.
///
/// Everything up to the first blank line is treated as the header and
/// skipped. A line containing `-->` opens a new cue; a standalone line of
/// pure digits is a cue identifier and is ignored; cue text accumulates
/// until a blank line or the next cue marker. Cues that never accumulate
/// text are dropped.
pub fn parse_vtt(content: &str) -> Vec<CaptionLine> {
    let mut captions = Vec::new();
    let mut current_start = 0.0;
    let mut current_end = 0.0;
    let mut current_text: Vec<&str> = Vec::new();
    let mut in_header = true;

    for raw in content.trim().lines() {
        let line = raw.trim();

        if in_header {
            if line.is_empty() {
                in_header = false;
            }
            continue;
        }

        if line.contains("-->") {
            flush_cue(&mut captions, current_start, current_end, &mut current_text);
            match parse_timecode_range(line) {
                Some((start, end)) => {
                    current_start = start;
                    current_end = end;
                }
                None => {
                    tracing::debug!(line, "Skipping VTT cue with bad timecode");
                    current_start = 0.0;
                    current_end = 0.0;
                }
            }
        } else if !line.is_empty() && !line.bytes().all(|b| b.is_ascii_digit()) {
            current_text.push(line);
        } else if line.is_empty() {
            flush_cue(&mut captions, current_start, current_end, &mut current_text);
        }
    }
    flush_cue(&mut captions, current_start, current_end, &mut current_text);

    captions
}

/// Commit the accumulated cue text, if any.
fn flush_cue(captions: &mut Vec<CaptionLine>, start: f64, end: f64, text: &mut Vec<&str>) {
    if text.is_empty() {
        return;
    }
    let joined = text.join("\n").trim().to_string();
    captions.push(CaptionLine::new(joined, start, end));
    text.clear();
}

/// Generate WebVTT content.
pub fn generate_vtt(captions: &[CaptionLine]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for line in captions {
        output.push_str(&format!(
            "{} --> {}\n",
            format_timecode(line.start_secs, '.'),
            format_timecode(line.end_secs, '.'),
        ));
        output.push_str(&line.text);
        output.push_str("\n\n");
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_document() {
        let input = "WEBVTT\n\n00:00:01.000 --> 00:00:02.500\nHello\n";
        let captions = parse_vtt(input);
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].start_secs, 1.0);
        assert_eq!(captions[0].end_secs, 2.5);
        assert_eq!(captions[0].text, "Hello");
    }

    #[test]
    fn numeric_cue_identifiers_are_ignored() {
        let input = "WEBVTT\n\n1\n00:00:00.000 --> 00:00:01.000\nfirst\n\n2\n00:00:01.000 --> 00:00:02.000\nsecond\n";
        let captions = parse_vtt(input);
        assert_eq!(captions.len(), 2);
        assert_eq!(captions[0].text, "first");
        assert_eq!(captions[1].text, "second");
    }

    #[test]
    fn header_metadata_is_skipped() {
        let input = "WEBVTT\nKind: captions\nLanguage: en\n\n00:00:00.000 --> 00:00:01.000\ntext\n";
        let captions = parse_vtt(input);
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].text, "text");
    }

    #[test]
    fn back_to_back_cues_without_blank_line() {
        let input = "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\nfirst\n00:00:01.000 --> 00:00:02.000\nsecond\n";
        let captions = parse_vtt(input);
        assert_eq!(captions.len(), 2);
        assert_eq!(captions[1].text, "second");
    }

    #[test]
    fn multi_line_cue_text() {
        let input = "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\none\ntwo\n";
        let captions = parse_vtt(input);
        assert_eq!(captions[0].text, "one\ntwo");
    }

    #[test]
    fn cue_without_text_is_dropped() {
        let input = "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\n\n00:00:01.000 --> 00:00:02.000\nkept\n";
        let captions = parse_vtt(input);
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].text, "kept");
    }

    #[test]
    fn round_trips_through_generate() {
        let original = vec![
            CaptionLine::new("Hello there", 1.0, 2.5),
            CaptionLine::new("General caption", 61.5, 63.0),
        ];
        let parsed = parse_vtt(&generate_vtt(&original));
        assert_eq!(parsed.len(), original.len());
        for (a, b) in original.iter().zip(&parsed) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.start_secs, b.start_secs);
            assert_eq!(a.end_secs, b.end_secs);
        }
    }

    #[test]
    fn generated_output_starts_with_magic() {
        assert!(generate_vtt(&[]).starts_with("WEBVTT\n"));
        let vtt = generate_vtt(&[CaptionLine::new("One minute in", 61.5, 63.0)]);
        assert!(vtt.contains("00:01:01.500 --> 00:01:03.000"));
    }
}
