//! In-memory project store.
//!
//! Holds the videos a user is working on and the caption list attached to
//! each. The export pipeline never reads the store directly — it receives
//! a snapshot cloned out of it at request time.

use uuid::Uuid;

use crate::caption::CaptionLine;

/// One video loaded into the project.
#[derive(Debug, Clone)]
pub struct VideoEntry {
    /// Store identifier for this entry.
    pub id: Uuid,

    /// Display title (typically the original filename).
    pub title: String,

    /// URI of the playable source backing this entry.
    pub source_uri: String,

    /// Caption lines attached to this video, in declaration order.
    pub captions: Vec<CaptionLine>,
}

/// Ordered, in-memory list of project videos.
#[derive(Debug, Default)]
pub struct ProjectStore {
    videos: Vec<VideoEntry>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a video with an empty caption list; returns its id.
    pub fn add_video(&mut self, title: impl Into<String>, source_uri: impl Into<String>) -> Uuid {
        let entry = VideoEntry {
            id: Uuid::new_v4(),
            title: title.into(),
            source_uri: source_uri.into(),
            captions: Vec::new(),
        };
        let id = entry.id;
        self.videos.push(entry);
        id
    }

    /// Remove a video by id. Returns whether an entry was removed.
    pub fn remove_video(&mut self, id: Uuid) -> bool {
        let before = self.videos.len();
        self.videos.retain(|v| v.id != id);
        self.videos.len() != before
    }

    /// Replace the caption list of a video. Returns whether the video exists.
    pub fn update_captions(&mut self, id: Uuid, captions: Vec<CaptionLine>) -> bool {
        match self.videos.iter_mut().find(|v| v.id == id) {
            Some(entry) => {
                entry.captions = captions;
                true
            }
            None => false,
        }
    }

    pub fn video(&self, id: Uuid) -> Option<&VideoEntry> {
        self.videos.iter().find(|v| v.id == id)
    }

    pub fn videos(&self) -> &[VideoEntry] {
        &self.videos
    }

    pub fn clear(&mut self) {
        self.videos.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove() {
        let mut store = ProjectStore::new();
        let a = store.add_video("a.mp4", "file:///a.mp4");
        let b = store.add_video("b.mp4", "file:///b.mp4");
        assert_eq!(store.videos().len(), 2);

        assert!(store.remove_video(a));
        assert!(!store.remove_video(a));
        assert_eq!(store.videos().len(), 1);
        assert_eq!(store.videos()[0].id, b);
    }

    #[test]
    fn update_captions_replaces_list() {
        let mut store = ProjectStore::new();
        let id = store.add_video("a.mp4", "file:///a.mp4");
        assert!(store.update_captions(id, vec![CaptionLine::new("hi", 0.0, 1.0)]));
        assert_eq!(store.video(id).unwrap().captions.len(), 1);

        let missing = Uuid::new_v4();
        assert!(!store.update_captions(missing, Vec::new()));
    }
}
