//! Runs one download at a time on the background runtime and reports back
//! through a `UiScheduler`.

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use tokio::runtime::Handle;

use crate::{
    config::Settings,
    downloader::{ExtractOptions, Extractor},
    error::{DownloadError, StartError},
    model::{DownloadOutcome, DownloadRequest, Phase, ProgressHook, ProgressSample, RequestId},
    progress::sample_from_hook,
    scheduler::{StatusLine, Tone, UiEvent, UiScheduler},
    thumbnail::fetch_thumbnail,
};

/// Characters of the title shown in the status line
const TITLE_PREVIEW: usize = 30;

pub struct Orchestrator {
    runtime: Handle,
    extractor: Arc<dyn Extractor>,
    settings: Arc<Settings>,
    active: Arc<AtomicBool>,
    last_id: AtomicU64,
}

/// Held by the running task. Dropping it frees the slot and re-enables the
/// buttons, whichever way the task ends.
struct ActiveSlot {
    active: Arc<AtomicBool>,
    ui: UiScheduler,
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        self.ui.schedule(UiEvent::Unlock);
    }
}

impl Orchestrator {
    pub fn new(runtime: Handle, extractor: Arc<dyn Extractor>, settings: Settings) -> Self {
        Self {
            runtime,
            extractor,
            settings: Arc::new(settings),
            active: Arc::new(AtomicBool::new(false)),
            last_id: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Starts `request` on its own task. Progress, the outcome and finally an
    /// `Unlock` are delivered through `ui`. Events that can outlive the request
    /// carry the returned id.
    pub fn start(&self, request: DownloadRequest, ui: UiScheduler) -> Result<RequestId, StartError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::warn!("ignoring {} while another download runs", request.url);
            return Err(StartError::Busy);
        }

        let id = self.last_id.fetch_add(1, Ordering::Relaxed) + 1;
        let slot = ActiveSlot {
            active: Arc::clone(&self.active),
            ui: ui.clone(),
        };
        let extractor = Arc::clone(&self.extractor);
        let settings = Arc::clone(&self.settings);

        log::info!(
            "starting {} download #{} of {} ({})",
            request.media_kind.noun(),
            id,
            request.url,
            request.quality
        );

        self.runtime.spawn(async move {
            let _slot = slot;
            let kind = request.media_kind;
            let outcome = match run(id, extractor.as_ref(), &settings, &request, &ui).await {
                Ok(dir) => {
                    log::info!("{} saved to {}", request.url, dir.display());
                    ui.schedule_after(settings.reset_delay, UiEvent::ResetProgress(id));
                    DownloadOutcome::saved(kind, dir)
                }
                Err(e) => {
                    log::error!("download of {} failed: {}", request.url, e);
                    DownloadOutcome::failed(kind, e.to_string())
                }
            };
            ui.schedule(UiEvent::Finished(outcome));
        });
        Ok(id)
    }
}

async fn run(
    id: RequestId,
    extractor: &dyn Extractor,
    settings: &Settings,
    request: &DownloadRequest,
    ui: &UiScheduler,
) -> Result<PathBuf, DownloadError> {
    ui.schedule(UiEvent::Status(StatusLine::new(
        format!("🔍 Fetching {} information...", request.media_kind.noun()),
        Tone::Working,
    )));
    ui.schedule(UiEvent::Progress(ProgressSample {
        percent: 0.0,
        phase: Phase::Fetching,
    }));

    tokio::fs::create_dir_all(&settings.download_dir).await?;
    let options = ExtractOptions::for_request(request, settings);

    let info = extractor.probe(&request.url).await?;
    log::info!("probed \"{}\"", info.title);
    ui.schedule(UiEvent::Status(StatusLine::new(
        format!("⬇️ Downloading: {}...", title_preview(&info.title)),
        Tone::Downloading,
    )));
    if settings.thumbnails {
        if let Some(url) = info.thumbnail.clone() {
            spawn_thumbnail(id, url, ui.clone());
        }
    }
    ui.schedule(UiEvent::Media(info));

    let on_progress = |hook: ProgressHook| {
        if let Some(sample) = sample_from_hook(&hook) {
            ui.schedule(UiEvent::Progress(sample));
        }
    };
    extractor.download(&request.url, &options, &on_progress).await?;

    Ok(settings.download_dir.clone())
}

fn spawn_thumbnail(id: RequestId, url: String, ui: UiScheduler) {
    tokio::task::spawn_blocking(move || {
        if let Some(img) = fetch_thumbnail(&url) {
            ui.schedule(UiEvent::Thumbnail(id, img));
        }
    });
}

fn title_preview(title: &str) -> String {
    title.chars().take(TITLE_PREVIEW).collect()
}
