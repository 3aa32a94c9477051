use once_cell::sync::Lazy;
use regex::Regex;

/// Known YouTube host variants followed by an 11-character video id,
/// optionally preceded by `watch?v=`, `embed/`, `v/` or any path ending in `?v=`.
static YOUTUBE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(https?://)?(www\.)?(youtube|youtu|youtube-nocookie)\.(com|be)/(watch\?v=|embed/|v/|.+\?v=)?([^&=%\?]{11})",
    )
    .expect("static URL pattern compiles")
});

/// Returns true when `input` starts with a recognisable YouTube video URL.
///
/// Callers trim the input and reject empty strings before calling this.
pub fn is_valid_url(input: &str) -> bool {
    YOUTUBE_URL.is_match(input)
}
