//! YouTube Downloader Pro: paste a link, pick a quality, get a video or mp3.

// UI state and the events that mutate it
mod app;
// Runtime settings
mod config;
// yt-dlp arguments, probing and progress streaming
mod downloader;
// Error types
mod error;
// Requests, samples and outcomes
mod model;
// Background download runner
mod orchestrator;
// Progress-hook parsing and percentage math
mod progress;
// Cross-thread delivery of UI updates
mod scheduler;
// Thumbnail preview fetching
mod thumbnail;
// URL validation
mod validate;

use std::sync::Arc;

use eframe::{App, Frame, egui};
use egui::{Color32, TextureHandle, TextureOptions, Visuals};
use once_cell::sync::OnceCell;
use rfd::{MessageButtons, MessageDialog, MessageLevel};
use tokio::{runtime::Runtime, sync::mpsc::UnboundedReceiver};

use app::{AppState, Dialog};
use config::Settings;
use downloader::YtDlp;
use model::{MediaKind, QualityTier};
use orchestrator::Orchestrator;
use scheduler::{Tone, UiEvent, UiScheduler};

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

const INFO_TEXT: &str = "Paste a YouTube URL above and select your preferred quality.\n\
                         Supports videos, playlists, and live streams.";

/// Program entry point: initializes logging and the runtime, then launches the GUI
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let rt = Arc::new(Runtime::new()?);
    RUNTIME
        .set(Arc::clone(&rt))
        .map_err(|_| "runtime initialised twice")?;

    let settings = Settings::default();
    log::info!(
        "saving to {} using {}",
        settings.download_dir.display(),
        settings.ytdlp_program.display()
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_title("YouTube Downloader Pro - by Hamza Sami"),
        ..Default::default()
    };
    eframe::run_native(
        "YouTube Downloader Pro",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(DownloaderApp::new(cc.egui_ctx.clone(), &rt, settings))
        }),
    )
    .map_err(|e| e.to_string())?;
    Ok(())
}

/// Window state: the view model plus the plumbing that feeds it
struct DownloaderApp {
    state: AppState,
    orchestrator: Orchestrator,
    scheduler: UiScheduler,
    events: UnboundedReceiver<UiEvent>,
    /// Uploaded thumbnail of the current download
    thumbnail: Option<TextureHandle>,
}

impl DownloaderApp {
    fn new(ctx: egui::Context, rt: &Runtime, settings: Settings) -> Self {
        let extractor = Arc::new(YtDlp::new(settings.ytdlp_program.clone()));
        let (scheduler, events) = UiScheduler::new(ctx);
        Self {
            state: AppState::default(),
            orchestrator: Orchestrator::new(rt.handle().clone(), extractor, settings),
            scheduler,
            events,
            thumbnail: None,
        }
    }

    fn start(&mut self, kind: MediaKind) {
        let Ok(request) = self.state.request(kind) else {
            return;
        };
        match self.orchestrator.start(request, self.scheduler.clone()) {
            Ok(id) => {
                self.state.begin(id);
                self.thumbnail = None;
            }
            Err(e) => self.state.reject(e),
        }
    }

    /// Applies everything the background side queued since the last frame
    fn drain_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.events.try_recv() {
            self.state.apply(event);
        }
        if let Some(img) = self.state.thumbnail.take() {
            self.thumbnail = Some(ctx.load_texture("thumbnail", img, TextureOptions::default()));
        }
    }

    fn open_download_folder(&self) {
        let folder = self.orchestrator.settings().download_dir.clone();
        let Some(rt) = RUNTIME.get() else {
            return;
        };
        rt.spawn_blocking(move || {
            if let Err(e) = std::fs::create_dir_all(&folder) {
                log::warn!("cannot create {}: {}", folder.display(), e);
                return;
            }
            #[cfg(target_os = "windows")]
            let opener = "explorer";
            #[cfg(target_os = "macos")]
            let opener = "open";
            #[cfg(all(unix, not(target_os = "macos")))]
            let opener = "xdg-open";
            if let Err(e) = std::process::Command::new(opener).arg(&folder).spawn() {
                log::warn!("{} {} failed: {}", opener, folder.display(), e);
            }
        });
    }
}

/// Blocks until the user dismisses the message
fn show_dialog(dialog: &Dialog) {
    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title(&dialog.title)
        .set_description(&dialog.message)
        .set_buttons(MessageButtons::Ok)
        .show();
}

fn tone_color(tone: Tone) -> Color32 {
    match tone {
        Tone::Success => Color32::from_rgb(0x4C, 0xAF, 0x50),
        Tone::Working => Color32::from_rgb(0xFF, 0x98, 0x00),
        Tone::Downloading => Color32::from_rgb(0x21, 0x96, 0xF3),
        Tone::Error => Color32::from_rgb(0xF4, 0x43, 0x36),
    }
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for DownloaderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.drain_events(ctx);

        if let Some(dialog) = self.state.dialog.take() {
            show_dialog(&dialog);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("YouTube Downloader Pro");
                ui.label(egui::RichText::new("Developed by Hamza Sami").italics());
            });
            ui.separator();

            ui.label("Enter YouTube URL:");
            ui.add(
                egui::TextEdit::singleline(&mut self.state.url_input)
                    .hint_text("https://www.youtube.com/watch?v=...")
                    .desired_width(f32::INFINITY),
            );

            ui.add_space(8.0);
            ui.label("Select Quality:");
            egui::ComboBox::from_id_source("quality")
                .selected_text(self.state.quality.label())
                .show_ui(ui, |ui| {
                    let current = self.state.quality.label();
                    for label in QualityTier::ALL.map(QualityTier::label) {
                        if ui.selectable_label(current == label, label).clicked() {
                            self.state.quality = QualityTier::from_label(label);
                        }
                    }
                });

            ui.add_space(8.0);
            let enabled = self.state.buttons_enabled && !self.orchestrator.is_busy();
            let mut clicked = None;
            ui.horizontal(|ui| {
                let video = egui::Button::new("📹 Download Video (MP4)")
                    .fill(Color32::from_rgb(0xFF, 0x57, 0x22));
                if ui.add_enabled(enabled, video).clicked() {
                    clicked = Some(MediaKind::Video);
                }
                let audio = egui::Button::new("🎵 Download Audio (MP3)")
                    .fill(Color32::from_rgb(0x4C, 0xAF, 0x50));
                if ui.add_enabled(enabled, audio).clicked() {
                    clicked = Some(MediaKind::Audio);
                }
            });
            if let Some(kind) = clicked {
                self.start(kind);
            }

            ui.add_space(8.0);
            ui.add(egui::ProgressBar::new(self.state.progress / 100.0));
            ui.label(&self.state.progress_label);

            ui.colored_label(tone_color(self.state.status.tone), &self.state.status.text);

            if let Some(media) = &self.state.media {
                ui.group(|ui| {
                    ui.horizontal(|ui| {
                        if let Some(tex) = &self.thumbnail {
                            ui.add(egui::Image::new(tex).max_width(160.0));
                        }
                        ui.label(&media.title);
                    });
                });
            }

            ui.add_space(8.0);
            if ui.button("Open Folder").clicked() {
                self.open_download_folder();
            }

            ui.separator();
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.label(INFO_TEXT);
            });
        });
    }
}
