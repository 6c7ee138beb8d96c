//! Output naming and saving.

use std::path::{Path, PathBuf};

use captionkiln_common::error::KilnResult;
use captionkiln_project_model::QualityTier;

/// Sanitize a user title for use in a filename: every character outside
/// `[A-Za-z0-9]` becomes `_`, the rest is lowercased.
pub fn sanitize_title(title: &str) -> String {
    let sanitized: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "untitled".to_string()
    } else {
        sanitized
    }
}

/// Deterministic export filename:
/// `{sanitized_title}_{quality}_{pro|free}_{timestamp}.{ext}`.
pub fn export_filename(title: &str, quality: QualityTier, pro: bool, ext: &str) -> String {
    format!(
        "{}_{}_{}_{}.{}",
        sanitize_title(title),
        quality.label(),
        if pro { "pro" } else { "free" },
        chrono::Utc::now().format("%Y%m%d-%H%M%S"),
        ext
    )
}

/// Receives the assembled export blob under its final name.
pub trait OutputSink: Send {
    /// Persist `data` under `filename`; returns where it landed.
    fn save(&mut self, filename: &str, data: &[u8]) -> KilnResult<PathBuf>;
}

/// Saves exports into a directory, creating it as needed.
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OutputSink for FileSink {
    fn save(&mut self, filename: &str, data: &[u8]) -> KilnResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        std::fs::write(&path, data)?;
        tracing::info!(file = %path.display(), bytes = data.len(), "Export saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_every_non_alphanumeric_character() {
        assert_eq!(sanitize_title("My Demo!"), "my_demo_");
        assert_eq!(sanitize_title("Clip (final) v2"), "clip__final__v2");
        assert_eq!(sanitize_title("ALLCAPS"), "allcaps");
        assert_eq!(sanitize_title(""), "untitled");
        assert_eq!(sanitize_title("日本語"), "___");
    }

    #[test]
    fn filename_follows_the_grammar() {
        let name = export_filename("My Demo!", QualityTier::Hd1080, false, "mkv");
        assert!(name.starts_with("my_demo__1080p_free_"), "{name}");
        assert!(name.ends_with(".mkv"));

        let timestamp = name
            .strip_prefix("my_demo__1080p_free_")
            .unwrap()
            .strip_suffix(".mkv")
            .unwrap();
        assert!(!timestamp.is_empty());
        assert!(timestamp.chars().all(|c| c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn filename_reflects_tier_and_plan() {
        let name = export_filename("t", QualityTier::Uhd4k, true, "mkv");
        assert!(name.starts_with("t_4k_pro_"));
    }

    #[test]
    fn file_sink_creates_directory_and_writes() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("exports/deep");
        let mut sink = FileSink::new(&nested);

        let path = sink.save("out.bin", b"payload").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
        assert!(path.starts_with(&nested));
    }
}
