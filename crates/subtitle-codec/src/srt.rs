//! SubRip (SRT) parsing and generation.

use captionkiln_project_model::CaptionLine;

use crate::timecode::{format_timecode, parse_timecode_range};

/// Parse SRT content into caption lines.
///
/// The document is split on blank-line-separated blocks. A block needs at
/// least an index line, a timecode range, and one text line; blocks that
/// fail the grammar are skipped rather than failing the document.
pub fn parse_srt(content: &str) -> Vec<CaptionLine> {
    let mut captions = Vec::new();

    for block in split_blocks(content) {
        let lines: Vec<&str> = block.lines().collect();
        if lines.len() < 3 {
            tracing::debug!(lines = lines.len(), "Skipping short SRT block");
            continue;
        }

        let Some((start_secs, end_secs)) = parse_timecode_range(lines[1]) else {
            tracing::debug!(line = lines[1], "Skipping SRT block with bad timecode");
            continue;
        };

        let text = lines[2..].join("\n").trim().to_string();
        captions.push(CaptionLine::new(text, start_secs, end_secs));
    }

    captions
}

/// Generate SRT content with 1-based sequence numbers.
pub fn generate_srt(captions: &[CaptionLine]) -> String {
    let mut output = String::new();

    for (i, line) in captions.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_timecode(line.start_secs, ','),
            format_timecode(line.end_secs, ','),
        ));
        output.push_str(&line.text);
        output.push_str("\n\n");
    }

    output
}

/// Split a document into blank-line-separated blocks, tolerating CRLF
/// endings and whitespace-only separator lines.
pub(crate) fn split_blocks(content: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();

    for raw in content.lines() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_block() {
        let captions = parse_srt("1\n00:00:01,000 --> 00:00:02,500\nHello\n");
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].start_secs, 1.0);
        assert_eq!(captions[0].end_secs, 2.5);
        assert_eq!(captions[0].text, "Hello");
    }

    #[test]
    fn reserializes_identical_block() {
        let input = "1\n00:00:01,000 --> 00:00:02,500\nHello\n\n";
        let captions = parse_srt(input);
        assert_eq!(generate_srt(&captions), input);
    }

    #[test]
    fn multi_line_text_is_preserved() {
        let captions = parse_srt("1\n00:00:00,000 --> 00:00:01,000\nfirst\nsecond\n");
        assert_eq!(captions[0].text, "first\nsecond");
    }

    #[test]
    fn bad_blocks_are_skipped_not_fatal() {
        let input = "\
1
00:00:01,000 --> 00:00:02,000
keep me

2
not a timecode
dropped

3

4
00:00:05,000 --> 00:00:06,000
also kept
";
        let captions = parse_srt(input);
        assert_eq!(captions.len(), 2);
        assert_eq!(captions[0].text, "keep me");
        assert_eq!(captions[1].text, "also kept");
    }

    #[test]
    fn tolerates_crlf_and_spaced_separators() {
        let input = "1\r\n00:00:01,000 --> 00:00:02,000\r\nwindows\r\n   \r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nsecond\r\n";
        let captions = parse_srt(input);
        assert_eq!(captions.len(), 2);
        assert_eq!(captions[0].text, "windows");
    }

    #[test]
    fn empty_input_parses_to_nothing() {
        assert!(parse_srt("").is_empty());
        assert!(parse_srt("\n\n\n").is_empty());
    }

    #[test]
    fn generated_sequence_numbers_are_one_based() {
        let captions = vec![
            CaptionLine::new("a", 0.0, 1.0),
            CaptionLine::new("b", 1.0, 2.0),
        ];
        let srt = generate_srt(&captions);
        assert!(srt.starts_with("1\n"));
        assert!(srt.contains("\n\n2\n"));
    }
}
