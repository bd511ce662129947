use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Sub-folder of a date directory that a report upload targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderType {
    Messages,
    Images,
    Audio,
    Video,
    Urls,
}

impl FolderType {
    pub const ALL: [FolderType; 5] = [
        FolderType::Messages,
        FolderType::Images,
        FolderType::Audio,
        FolderType::Video,
        FolderType::Urls,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FolderType::Messages => "messages",
            FolderType::Images => "images",
            FolderType::Audio => "audio",
            FolderType::Video => "video",
            FolderType::Urls => "urls",
        }
    }
}

impl std::str::FromStr for FolderType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FolderType::ALL
            .into_iter()
            .find(|ft| ft.as_str() == s)
            .ok_or_else(|| CoreError::InvalidFolderType(s.to_string()))
    }
}
