use std::{fmt, path::PathBuf};

/// What the user wants out of the video
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    /// Muxed video file as served by the platform
    Video,
    /// Best audio stream, transcoded after the fetch
    Audio,
}

impl MediaKind {
    /// Lower-case noun used in status messages
    pub fn noun(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

/// Quality tiers offered by the selector
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QualityTier {
    #[default]
    Best,
    High720,
    Medium480,
    Low360,
}

impl QualityTier {
    pub const ALL: [QualityTier; 4] = [
        QualityTier::Best,
        QualityTier::High720,
        QualityTier::Medium480,
        QualityTier::Low360,
    ];

    /// Text shown in the quality dropdown
    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Best => "Best Quality",
            QualityTier::High720 => "High (720p)",
            QualityTier::Medium480 => "Medium (480p)",
            QualityTier::Low360 => "Low (360p)",
        }
    }

    /// Parses a dropdown label. Anything unrecognised falls back to `Best`.
    pub fn from_label(label: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|q| q.label() == label)
            .unwrap_or_default()
    }

    /// yt-dlp format selector for a video download
    pub fn format_selector(self) -> String {
        match self.max_height() {
            Some(h) => format!("best[height<={}]", h),
            None => "best".to_string(),
        }
    }

    fn max_height(self) -> Option<u32> {
        match self {
            QualityTier::Best => None,
            QualityTier::High720 => Some(720),
            QualityTier::Medium480 => Some(480),
            QualityTier::Low360 => Some(360),
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sequence number handed out per started download, starting at 1
pub type RequestId = u64;

/// One download attempt, created when a download button is pressed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub media_kind: MediaKind,
    pub quality: QualityTier,
}

/// Where a request currently is in its lifetime
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Fetching,
    Downloading,
    Finished,
    Failed,
}

/// Progress reading relayed to the UI
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressSample {
    /// Percentage in `0.0..=100.0`
    pub percent: f32,
    pub phase: Phase,
}

/// Terminal result of a download attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub media_kind: MediaKind,
    pub success: bool,
    pub saved_path: Option<PathBuf>,
    pub error_message: Option<String>,
}

impl DownloadOutcome {
    pub fn saved(media_kind: MediaKind, path: PathBuf) -> Self {
        Self {
            media_kind,
            success: true,
            saved_path: Some(path),
            error_message: None,
        }
    }

    pub fn failed(media_kind: MediaKind, message: String) -> Self {
        Self {
            media_kind,
            success: false,
            saved_path: None,
            error_message: Some(message),
        }
    }
}

/// Metadata returned by the probe, before anything is downloaded
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaInfo {
    pub title: String,
    pub thumbnail: Option<String>,
}

/// Status reported by a single progress-hook invocation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookStatus {
    Downloading,
    Finished,
    Other,
}

/// Raw byte counts from the extractor's progress hook
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressHook {
    pub status: HookStatus,
    pub downloaded_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
    pub total_bytes_estimate: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_maps_to_format_selector() {
        assert_eq!(QualityTier::Best.format_selector(), "best");
        assert_eq!(QualityTier::High720.format_selector(), "best[height<=720]");
        assert_eq!(QualityTier::Medium480.format_selector(), "best[height<=480]");
        assert_eq!(QualityTier::Low360.format_selector(), "best[height<=360]");
    }

    #[test]
    fn unknown_label_falls_back_to_best() {
        assert_eq!(QualityTier::from_label("High (720p)"), QualityTier::High720);
        assert_eq!(QualityTier::from_label("Low (360p)"), QualityTier::Low360);
        assert_eq!(QualityTier::from_label("4K please"), QualityTier::Best);
        assert_eq!(QualityTier::from_label("").format_selector(), "best");
    }
}
