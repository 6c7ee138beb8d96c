//! Convert between subtitle formats.

use std::path::PathBuf;

use anyhow::Context;
use captionkiln_subtitles::SubtitleFormat;

pub fn run(input: PathBuf, output: PathBuf, title: String) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let from = SubtitleFormat::from_path(&input);
    let to = SubtitleFormat::from_path(&output);
    tracing::info!(?from, ?to, "Converting subtitle file");

    let lines = from.parse(&content);
    if lines.is_empty() {
        tracing::warn!("No caption lines parsed from the input");
    }

    std::fs::write(&output, to.generate(&lines, &title))
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "Converted {} caption line(s): {} -> {}",
        lines.len(),
        input.display(),
        output.display()
    );
    Ok(())
}
