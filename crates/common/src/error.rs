//! Error types shared across CaptionKiln crates.

/// Top-level error type for CaptionKiln operations.
#[derive(Debug, thiserror::Error)]
pub enum KilnError {
    #[error("Media source unavailable: {message}")]
    MediaUnavailable { message: String },

    #[error("Render surface unavailable: {message}")]
    SurfaceUnavailable { message: String },

    #[error("Playback failed to start: {message}")]
    PlaybackStart { message: String },

    #[error("Audio routing failed: {message}")]
    AudioRouting { message: String },

    #[error("Export produced an empty output")]
    EmptyOutput,

    #[error("An export session is already active")]
    SessionActive,

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Media error: {message}")]
    Media { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using KilnError.
pub type KilnResult<T> = Result<T, KilnError>;

impl KilnError {
    pub fn media_unavailable(msg: impl Into<String>) -> Self {
        Self::MediaUnavailable {
            message: msg.into(),
        }
    }

    pub fn surface_unavailable(msg: impl Into<String>) -> Self {
        Self::SurfaceUnavailable {
            message: msg.into(),
        }
    }

    pub fn playback_start(msg: impl Into<String>) -> Self {
        Self::PlaybackStart {
            message: msg.into(),
        }
    }

    pub fn audio_routing(msg: impl Into<String>) -> Self {
        Self::AudioRouting {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media {
            message: msg.into(),
        }
    }
}
