//! Toolkit-independent state behind the window. Only the UI thread touches it.

use eframe::egui::ColorImage;

use crate::{
    error::{InputError, StartError},
    model::{DownloadOutcome, DownloadRequest, MediaInfo, MediaKind, Phase, QualityTier, RequestId},
    progress::percent_label,
    scheduler::{StatusLine, Tone, UiEvent},
    validate::is_valid_url,
};

pub const READY_STATUS: &str = "Ready to download 🚀";

/// A modal message waiting to be shown
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dialog {
    pub title: String,
    pub message: String,
}

impl Dialog {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

pub struct AppState {
    /// URL field contents, untrimmed
    pub url_input: String,
    pub quality: QualityTier,
    /// Both download buttons share one flag
    pub buttons_enabled: bool,
    /// Progress bar value in `0.0..=100.0`
    pub progress: f32,
    pub progress_label: String,
    pub status: StatusLine,
    /// `None` while idle
    pub phase: Option<Phase>,
    /// Most recently started request, 0 before the first
    pub request_id: RequestId,
    pub dialog: Option<Dialog>,
    /// Probed metadata of the current download
    pub media: Option<MediaInfo>,
    /// Decoded thumbnail not yet uploaded as a texture
    pub thumbnail: Option<ColorImage>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            url_input: String::new(),
            quality: QualityTier::Best,
            buttons_enabled: true,
            progress: 0.0,
            progress_label: percent_label(0.0),
            status: StatusLine::new(READY_STATUS, Tone::Success),
            phase: None,
            request_id: 0,
            dialog: None,
            media: None,
            thumbnail: None,
        }
    }
}

impl AppState {
    /// Builds a request from the current inputs. On bad input a dialog is
    /// queued and nothing else changes.
    pub fn request(&mut self, media_kind: MediaKind) -> Result<DownloadRequest, InputError> {
        let url = self.url_input.trim();
        let checked = if url.is_empty() {
            Err(InputError::Empty)
        } else if !is_valid_url(url) {
            Err(InputError::Malformed)
        } else {
            Ok(DownloadRequest {
                url: url.to_string(),
                media_kind,
                quality: self.quality,
            })
        };
        if let Err(e) = checked {
            log::debug!("rejected input {:?}: {}", url, e);
            self.dialog = Some(Dialog::new(e.title(), e.to_string()));
        }
        checked
    }

    /// Called once the orchestrator accepted request `id`.
    pub fn begin(&mut self, id: RequestId) {
        self.request_id = id;
        self.buttons_enabled = false;
        self.phase = Some(Phase::Fetching);
        self.media = None;
        self.thumbnail = None;
    }

    /// Called when the orchestrator refused to start.
    pub fn reject(&mut self, err: StartError) {
        self.dialog = Some(Dialog::new("⏳ Busy", err.to_string()));
    }

    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Status(line) => self.status = line,
            UiEvent::Media(info) => self.media = Some(info),
            UiEvent::Thumbnail(id, img) => {
                if id == self.request_id {
                    self.thumbnail = Some(img);
                }
            }
            UiEvent::Progress(sample) => {
                self.set_progress(sample.percent);
                self.phase = Some(sample.phase);
            }
            UiEvent::Finished(outcome) => self.finish(outcome),
            UiEvent::Unlock => self.buttons_enabled = true,
            UiEvent::ResetProgress(id) => {
                if id != self.request_id {
                    log::debug!("ignoring reset of finished download #{}", id);
                    return;
                }
                self.set_progress(0.0);
                self.phase = None;
            }
        }
    }

    fn set_progress(&mut self, percent: f32) {
        self.progress = percent.clamp(0.0, 100.0);
        self.progress_label = percent_label(self.progress);
    }

    fn finish(&mut self, outcome: DownloadOutcome) {
        if outcome.success {
            let (icon, what) = match outcome.media_kind {
                MediaKind::Video => ("✅", "Video"),
                MediaKind::Audio => ("🎵", "Audio"),
            };
            let location = outcome
                .saved_path
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            self.status = StatusLine::new(
                format!("{icon} {what} saved successfully!\nLocation: {location}"),
                Tone::Success,
            );
            self.phase = Some(Phase::Finished);
        } else {
            let reason = outcome.error_message.unwrap_or_default();
            self.status = StatusLine::new("❌ Download failed!", Tone::Error);
            self.dialog = Some(Dialog::new("❌ Error", format!("Download failed: {reason}")));
            self.phase = Some(Phase::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProgressSample;
    use eframe::egui::Color32;
    use std::path::PathBuf;

    #[test]
    fn empty_url_asks_for_one() {
        let mut state = AppState::default();
        state.url_input = "   ".into();
        assert_eq!(state.request(MediaKind::Video), Err(InputError::Empty));
        assert_eq!(
            state.dialog,
            Some(Dialog::new("❌ Error", "Please enter a YouTube URL"))
        );
        assert!(state.buttons_enabled);
        assert_eq!(state.phase, None);
    }

    #[test]
    fn malformed_url_is_rejected() {
        let mut state = AppState::default();
        state.url_input = "not a url".into();
        assert_eq!(state.request(MediaKind::Audio), Err(InputError::Malformed));
        assert_eq!(
            state.dialog,
            Some(Dialog::new("❌ Invalid URL", "Please enter a valid YouTube URL"))
        );
        assert!(state.buttons_enabled);
    }

    #[test]
    fn request_carries_trimmed_url_and_quality() {
        let mut state = AppState::default();
        state.url_input = "\thttps://youtu.be/dQw4w9WgXcQ\n".into();
        state.quality = QualityTier::Low360;
        let req = state.request(MediaKind::Video).unwrap();
        assert_eq!(req.url, "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(req.quality, QualityTier::Low360);
        assert!(state.dialog.is_none());
    }

    #[test]
    fn audio_success_message() {
        let mut state = AppState::default();
        state.begin(1);
        state.apply(UiEvent::Finished(DownloadOutcome::saved(
            MediaKind::Audio,
            PathBuf::from("/home/u/Downloads/YouTube_Downloads"),
        )));
        assert_eq!(
            state.status.text,
            "🎵 Audio saved successfully!\nLocation: /home/u/Downloads/YouTube_Downloads"
        );
        assert!(!state.buttons_enabled);
        state.apply(UiEvent::Unlock);
        assert!(state.buttons_enabled);
    }

    #[test]
    fn progress_is_clamped_and_labelled() {
        let mut state = AppState::default();
        state.apply(UiEvent::Progress(ProgressSample {
            percent: 42.7,
            phase: Phase::Downloading,
        }));
        assert_eq!(state.progress_label, "42%");
        state.apply(UiEvent::Progress(ProgressSample {
            percent: 180.0,
            phase: Phase::Downloading,
        }));
        assert_eq!(state.progress, 100.0);
        state.apply(UiEvent::ResetProgress(0));
        assert_eq!(state.progress_label, "0%");
        assert_eq!(state.phase, None);
    }

    #[test]
    fn late_events_of_an_earlier_download_are_ignored() {
        let mut state = AppState::default();
        state.begin(1);
        state.apply(UiEvent::Finished(DownloadOutcome::saved(
            MediaKind::Video,
            PathBuf::from("/tmp/yt"),
        )));
        state.apply(UiEvent::Unlock);

        state.begin(2);
        state.apply(UiEvent::Progress(ProgressSample {
            percent: 40.0,
            phase: Phase::Downloading,
        }));
        state.apply(UiEvent::ResetProgress(1));
        state.apply(UiEvent::Thumbnail(1, ColorImage::new([2, 2], Color32::BLACK)));
        assert_eq!(state.progress_label, "40%");
        assert_eq!(state.phase, Some(Phase::Downloading));
        assert!(state.thumbnail.is_none());

        state.apply(UiEvent::Thumbnail(2, ColorImage::new([2, 2], Color32::BLACK)));
        assert!(state.thumbnail.is_some());
        state.apply(UiEvent::ResetProgress(2));
        assert_eq!(state.progress_label, "0%");
    }

    #[test]
    fn busy_rejection_opens_dialog() {
        let mut state = AppState::default();
        state.reject(StartError::Busy);
        assert_eq!(state.dialog.unwrap().message, "A download is already in progress");
    }
}
