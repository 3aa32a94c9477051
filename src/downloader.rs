//! yt-dlp invocation: building its arguments, probing metadata and
//! streaming progress out of a running download.

use std::{path::PathBuf, process::Stdio};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader},
    process::Command,
};

use crate::{
    config::Settings,
    error::DownloadError,
    model::{DownloadRequest, MediaInfo, MediaKind, ProgressHook},
    progress::{HOOK_TEMPLATE, parse_hook_line},
};

/// Format selector used for every audio download
pub const AUDIO_FORMAT: &str = "bestaudio/best";

/// Post-processing directive: transcode the fetched audio
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioTranscode {
    pub codec: String,
    pub bitrate_kbps: u32,
}

/// Everything the extractor needs to know about one download
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractOptions {
    pub format: String,
    pub output_template: PathBuf,
    pub audio: Option<AudioTranscode>,
    pub no_warnings: bool,
}

impl ExtractOptions {
    pub fn for_request(request: &DownloadRequest, settings: &Settings) -> Self {
        let (format, audio) = match request.media_kind {
            MediaKind::Video => (request.quality.format_selector(), None),
            MediaKind::Audio => (
                AUDIO_FORMAT.to_string(),
                Some(AudioTranscode {
                    codec: settings.audio_codec.clone(),
                    bitrate_kbps: settings.audio_bitrate_kbps,
                }),
            ),
        };
        Self {
            format,
            output_template: settings.download_dir.join("%(title)s.%(ext)s"),
            audio,
            no_warnings: true,
        }
    }

    /// Command line for yt-dlp, URL last
    pub fn to_args(&self, url: &str) -> Vec<String> {
        let mut args = vec!["-f".to_owned(), self.format.clone()];

        args.push("-o".to_owned());
        args.push(self.output_template.display().to_string());

        args.push("--encoding".to_owned());
        args.push("utf-8".to_owned());
        args.push("--newline".to_owned());
        args.push("--progress-template".to_owned());
        args.push(HOOK_TEMPLATE.to_owned());

        if self.no_warnings {
            args.push("--no-warnings".to_owned());
        }

        if let Some(audio) = &self.audio {
            args.push("-x".to_owned());
            args.push("--audio-format".to_owned());
            args.push(audio.codec.clone());
            args.push("--audio-quality".to_owned());
            args.push(format!("{}K", audio.bitrate_kbps));
        }

        args.push(url.to_owned());
        args
    }
}

/// The external media-extraction library.
///
/// `download` calls `on_progress` from the task it runs on, in the order the
/// library reports progress.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Reads metadata without downloading anything.
    async fn probe(&self, url: &str) -> Result<MediaInfo, DownloadError>;

    async fn download(
        &self,
        url: &str,
        options: &ExtractOptions,
        on_progress: &(dyn Fn(ProgressHook) + Send + Sync),
    ) -> Result<(), DownloadError>;
}

/// Drives the `yt-dlp` executable as a child process
pub struct YtDlp {
    program: PathBuf,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> DownloadError {
        DownloadError::Spawn {
            program: self.program.display().to_string(),
            source,
        }
    }
}

#[derive(Deserialize)]
struct ProbeJson {
    title: Option<String>,
    thumbnail: Option<String>,
}

/// Parses the output of `--dump-single-json`.
pub fn parse_probe(json: &[u8]) -> Result<MediaInfo, DownloadError> {
    let probe: ProbeJson = serde_json::from_slice(json)?;
    Ok(MediaInfo {
        title: probe.title.unwrap_or_else(|| "Unknown".to_string()),
        thumbnail: probe.thumbnail,
    })
}

/// Picks the most useful line out of yt-dlp's stderr.
pub fn exit_message(stderr: &str, code: Option<i32>) -> String {
    let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if let Some(err) = lines.iter().rev().find(|l| l.starts_with("ERROR:")) {
        return err.to_string();
    }
    match (lines.last(), code) {
        (Some(last), _) => last.to_string(),
        (None, Some(code)) => format!("yt-dlp exited with status {}", code),
        (None, None) => "yt-dlp was terminated by a signal".to_string(),
    }
}

async fn read_all(mut stream: impl AsyncRead + Unpin) -> String {
    let mut buf = Vec::new();
    if let Err(e) = stream.read_to_end(&mut buf).await {
        log::debug!("reading yt-dlp stderr failed: {}", e);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[async_trait]
impl Extractor for YtDlp {
    async fn probe(&self, url: &str) -> Result<MediaInfo, DownloadError> {
        log::debug!("probing {}", url);
        let output = self
            .command()
            .args([
                "--dump-single-json",
                "--skip-download",
                "--no-warnings",
                "--encoding",
                "utf-8",
                url,
            ])
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::Exited {
                code: output.status.code(),
                message: exit_message(&stderr, output.status.code()),
            });
        }
        parse_probe(&output.stdout)
    }

    async fn download(
        &self,
        url: &str,
        options: &ExtractOptions,
        on_progress: &(dyn Fn(ProgressHook) + Send + Sync),
    ) -> Result<(), DownloadError> {
        let args = options.to_args(url);
        log::debug!("running {} {:?}", self.program.display(), args);

        let mut child = self
            .command()
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child.stdout.take().ok_or(DownloadError::MissingOutput("yt-dlp"))?;
        let stderr = child.stderr.take().ok_or(DownloadError::MissingOutput("yt-dlp"))?;
        let stderr_task = tokio::spawn(read_all(stderr));

        // Titles in yt-dlp's own messages follow the console encoding, so
        // lines are decoded lossily rather than rejected.
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            log::trace!("yt-dlp> {}", line.trim_end());
            if let Some(hook) = parse_hook_line(&line) {
                on_progress(hook);
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();
        if status.success() {
            Ok(())
        } else {
            Err(DownloadError::Exited {
                code: status.code(),
                message: exit_message(&stderr, status.code()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HookStatus, QualityTier};

    fn settings() -> Settings {
        Settings {
            download_dir: PathBuf::from("/tmp/yt"),
            ..Settings::default()
        }
    }

    fn request(kind: MediaKind, quality: QualityTier) -> DownloadRequest {
        DownloadRequest {
            url: "https://youtu.be/dQw4w9WgXcQ".into(),
            media_kind: kind,
            quality,
        }
    }

    #[test]
    fn video_options_follow_quality() {
        let opts = ExtractOptions::for_request(&request(MediaKind::Video, QualityTier::Medium480), &settings());
        assert_eq!(opts.format, "best[height<=480]");
        assert_eq!(opts.output_template, PathBuf::from("/tmp/yt/%(title)s.%(ext)s"));
        assert!(opts.audio.is_none());

        let args = opts.to_args("https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(&args[..2], ["-f", "best[height<=480]"]);
        assert!(!args.contains(&"-x".to_string()));
        assert_eq!(args.last().unwrap(), "https://youtu.be/dQw4w9WgXcQ");
    }

    #[test]
    fn audio_ignores_quality_and_transcodes() {
        let opts = ExtractOptions::for_request(&request(MediaKind::Audio, QualityTier::Low360), &settings());
        assert_eq!(opts.format, AUDIO_FORMAT);
        assert_eq!(
            opts.audio,
            Some(AudioTranscode { codec: "mp3".into(), bitrate_kbps: 192 })
        );

        let args = opts.to_args("u");
        let joined = args.join(" ");
        assert!(joined.contains("-x --audio-format mp3 --audio-quality 192K"));
        assert!(joined.contains("--progress-template"));
    }

    #[test]
    fn probe_reads_title_and_thumbnail() {
        let info = parse_probe(br#"{"title":"Never Gonna","thumbnail":"https://i.ytimg.com/x.jpg","id":"x"}"#).unwrap();
        assert_eq!(info.title, "Never Gonna");
        assert_eq!(info.thumbnail.as_deref(), Some("https://i.ytimg.com/x.jpg"));

        let untitled = parse_probe(br#"{"id":"x"}"#).unwrap();
        assert_eq!(untitled.title, "Unknown");
        assert!(parse_probe(b"not json").is_err());
    }

    #[test]
    fn exit_message_prefers_error_lines() {
        let stderr = "WARNING: slow\nERROR: [youtube] x: Video unavailable\n";
        assert_eq!(exit_message(stderr, Some(1)), "ERROR: [youtube] x: Video unavailable");
        assert_eq!(exit_message("something odd\n", Some(2)), "something odd");
        assert_eq!(exit_message("", Some(2)), "yt-dlp exited with status 2");
    }

    /// Writes an executable stand-in for yt-dlp into `dir`.
    #[cfg(unix)]
    fn fake_ytdlp(dir: &std::path::Path, body: &str) -> YtDlp {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        YtDlp::new(path)
    }

    #[cfg(unix)]
    fn collect_hooks() -> (std::sync::Arc<std::sync::Mutex<Vec<ProgressHook>>>, impl Fn(ProgressHook) + Send + Sync) {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&seen);
        (seen, move |hook| sink.lock().unwrap().push(hook))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn download_tolerates_non_utf8_output() {
        let tmp = tempfile::tempdir().unwrap();
        let ytdlp = fake_ytdlp(
            tmp.path(),
            r##"printf '%s\n' "$@" > "$(dirname "$0")/args"
printf '[download] Destination: caf\351.mp4\n'
echo '[hook] downloading 50 100 NA'
echo '[hook] finished 100 100 NA'
exit 0
"##,
        );
        let opts = ExtractOptions::for_request(&request(MediaKind::Video, QualityTier::Best), &settings());
        let (seen, on_progress) = collect_hooks();

        ytdlp
            .download("https://youtu.be/dQw4w9WgXcQ", &opts, &on_progress)
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].status, HookStatus::Downloading);
        assert_eq!(seen[0].downloaded_bytes, Some(50));
        assert_eq!(seen[0].total_bytes, Some(100));
        assert_eq!(seen[1].status, HookStatus::Finished);

        let args = std::fs::read_to_string(tmp.path().join("args")).unwrap();
        assert!(args.contains("--encoding\nutf-8\n"));
        assert!(args.ends_with("https://youtu.be/dQw4w9WgXcQ\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn download_failure_reports_last_error_line() {
        let tmp = tempfile::tempdir().unwrap();
        let ytdlp = fake_ytdlp(
            tmp.path(),
            r##"echo '[hook] downloading 10 100 NA'
echo 'WARNING: slow' >&2
echo 'ERROR: x' >&2
echo 'cleaning up' >&2
exit 1
"##,
        );
        let opts = ExtractOptions::for_request(&request(MediaKind::Audio, QualityTier::Best), &settings());
        let (seen, on_progress) = collect_hooks();

        let err = ytdlp
            .download("https://youtu.be/dQw4w9WgXcQ", &opts, &on_progress)
            .await
            .unwrap_err();

        match err {
            DownloadError::Exited { code, message } => {
                assert_eq!(code, Some(1));
                assert_eq!(message, "ERROR: x");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probe_parses_script_output() {
        let tmp = tempfile::tempdir().unwrap();
        let ytdlp = fake_ytdlp(
            tmp.path(),
            r##"echo '{"id":"dQw4w9WgXcQ","title":"Never Gonna Give You Up","thumbnail":"https://i.ytimg.com/vi/dQw4w9WgXcQ/hq.jpg"}'
"##,
        );
        let info = ytdlp.probe("https://youtu.be/dQw4w9WgXcQ").await.unwrap();
        assert_eq!(info.title, "Never Gonna Give You Up");
        assert!(info.thumbnail.is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_probe_is_an_exit_error() {
        let tmp = tempfile::tempdir().unwrap();
        let ytdlp = fake_ytdlp(
            tmp.path(),
            r##"echo 'ERROR: [youtube] dQw4w9WgXcQ: Video unavailable' >&2
exit 1
"##,
        );
        let err = ytdlp.probe("https://youtu.be/dQw4w9WgXcQ").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "ERROR: [youtube] dQw4w9WgXcQ: Video unavailable (exit code 1)"
        );
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let ytdlp = YtDlp::new("/nonexistent/yt-dlp-binary");
        let err = ytdlp.probe("https://youtu.be/dQw4w9WgXcQ").await.unwrap_err();
        assert!(matches!(err, DownloadError::Spawn { .. }));
    }
}
