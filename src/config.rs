use std::{path::PathBuf, time::Duration};

/// Folder created under `~/Downloads` for everything we fetch
pub const DOWNLOAD_SUBDIR: &str = "YouTube_Downloads";

/// Runtime settings. Everything is fixed at startup; there is no config file.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Directory downloads are written to (created on demand)
    pub download_dir: PathBuf,
    /// yt-dlp executable, looked up on PATH when not absolute
    pub ytdlp_program: PathBuf,
    /// Codec audio downloads are transcoded to
    pub audio_codec: String,
    /// Target audio bitrate in kbit/s
    pub audio_bitrate_kbps: u32,
    /// Delay before the progress bar resets after a successful download
    pub reset_delay: Duration,
    /// Fetch and show the video thumbnail after probing
    pub thumbnails: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let program = if cfg!(target_os = "windows") { "yt-dlp.exe" } else { "yt-dlp" };
        Self {
            download_dir: home.join("Downloads").join(DOWNLOAD_SUBDIR),
            ytdlp_program: PathBuf::from(program),
            audio_codec: "mp3".to_string(),
            audio_bitrate_kbps: 192,
            reset_delay: Duration::from_secs(3),
            thumbnails: true,
        }
    }
}
