//! Scheduled-post vocabulary shared by the database layer and the API.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Lifecycle of a scheduled post. Transitions are made by hand through the
/// status endpoint; nothing in the system advances them automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl PostStatus {
    pub const ALL: [PostStatus; 5] = [
        PostStatus::Pending,
        PostStatus::Running,
        PostStatus::Completed,
        PostStatus::Failed,
        PostStatus::Cancelled,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::Running => "running",
            PostStatus::Completed => "completed",
            PostStatus::Failed => "failed",
            PostStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PostStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PostStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::InvalidPostStatus(s.to_string()))
    }
}

/// Attachment slots on a scheduled post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    pub const ALL: [MediaKind; 3] = [MediaKind::Image, MediaKind::Audio, MediaKind::Video];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }

    /// Multipart field name carrying this attachment.
    #[must_use]
    pub fn form_field(self) -> &'static str {
        match self {
            MediaKind::Image => "image_file",
            MediaKind::Audio => "audio_file",
            MediaKind::Video => "video_file",
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::InvalidMediaKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in PostStatus::ALL {
            assert_eq!(status.as_str().parse::<PostStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "sent".parse::<PostStatus>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidPostStatus(ref s) if s == "sent"));
    }

    #[test]
    fn media_kind_parses_download_segment() {
        assert_eq!("audio".parse::<MediaKind>().unwrap(), MediaKind::Audio);
        assert!("document".parse::<MediaKind>().is_err());
        assert_eq!(MediaKind::Video.form_field(), "video_file");
    }
}
