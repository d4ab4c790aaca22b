use serde::{Deserialize, Serialize};

/// What a call carries. Audio is always captured; video is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn from_video_flag(is_video: bool) -> Self {
        if is_video { Self::Video } else { Self::Audio }
    }

    pub fn has_video(self) -> bool {
        matches!(self, Self::Video)
    }
}
