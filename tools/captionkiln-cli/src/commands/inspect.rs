//! Inspect a subtitle file.

use std::path::PathBuf;

use anyhow::Context;
use captionkiln_subtitles::SubtitleFormat;

pub fn run(input: PathBuf) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let format = SubtitleFormat::from_path(&input);
    let lines = format.parse(&content);

    println!("File:     {}", input.display());
    println!("Format:   {format:?}");
    println!("Lines:    {}", lines.len());

    if lines.is_empty() {
        return Ok(());
    }

    let first = lines
        .iter()
        .map(|l| l.start_secs)
        .fold(f64::INFINITY, f64::min);
    let last = lines
        .iter()
        .map(|l| l.end_secs)
        .fold(f64::NEG_INFINITY, f64::max);
    let covered: f64 = lines.iter().map(|l| l.duration_secs().max(0.0)).sum();
    let malformed = lines.iter().filter(|l| l.duration_secs() <= 0.0).count();

    let mut overlaps = 0usize;
    for (i, a) in lines.iter().enumerate() {
        for b in &lines[i + 1..] {
            if a.start_secs < b.end_secs && b.start_secs < a.end_secs {
                overlaps += 1;
            }
        }
    }

    println!("Span:     {first:.3}s .. {last:.3}s");
    println!("Covered:  {covered:.3}s");
    if malformed > 0 {
        println!("Warning:  {malformed} line(s) with non-positive duration (never shown)");
    }
    if overlaps > 0 {
        println!("Note:     {overlaps} overlapping pair(s); the earliest-declared line wins");
    }

    Ok(())
}
