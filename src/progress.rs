use crate::model::{HookStatus, Phase, ProgressHook, ProgressSample};

/// Marker that prefixes the progress lines yt-dlp prints for us.
pub const HOOK_PREFIX: &str = "[hook]";

/// Template handed to `--progress-template`. Fields come out space separated
/// in the order `parse_hook_line` expects.
pub const HOOK_TEMPLATE: &str = "download:[hook] %(progress.status)s %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s";

/// Percentage downloaded, preferring the exact total over the estimate.
/// Returns 0 when neither total is known.
pub fn percent_complete(downloaded: u64, total: Option<u64>, estimate: Option<u64>) -> f32 {
    let total = match total.filter(|t| *t > 0).or(estimate.filter(|t| *t > 0)) {
        Some(t) => t,
        None => return 0.0,
    };
    let pct = downloaded as f64 / total as f64 * 100.0;
    pct.clamp(0.0, 100.0) as f32
}

/// Converts one hook invocation into a sample for the UI.
/// Statuses other than downloading/finished produce nothing.
pub fn sample_from_hook(hook: &ProgressHook) -> Option<ProgressSample> {
    match hook.status {
        HookStatus::Downloading => Some(ProgressSample {
            percent: percent_complete(
                hook.downloaded_bytes.unwrap_or(0),
                hook.total_bytes,
                hook.total_bytes_estimate,
            ),
            phase: Phase::Downloading,
        }),
        HookStatus::Finished => Some(ProgressSample {
            percent: 100.0,
            phase: Phase::Finished,
        }),
        HookStatus::Other => None,
    }
}

/// Text for the label under the progress bar
pub fn percent_label(percent: f32) -> String {
    format!("{}%", percent.clamp(0.0, 100.0) as u32)
}

/// Parses a line printed through `HOOK_TEMPLATE`.
pub fn parse_hook_line(line: &str) -> Option<ProgressHook> {
    let rest = line.trim().strip_prefix(HOOK_PREFIX)?;
    let mut fields = rest.split_whitespace();
    let status = match fields.next()? {
        "downloading" => HookStatus::Downloading,
        "finished" => HookStatus::Finished,
        _ => HookStatus::Other,
    };
    Some(ProgressHook {
        status,
        downloaded_bytes: fields.next().and_then(parse_bytes),
        total_bytes: fields.next().and_then(parse_bytes),
        total_bytes_estimate: fields.next().and_then(parse_bytes),
    })
}

// yt-dlp prints "NA" for missing fields and floats for estimates
fn parse_bytes(field: &str) -> Option<u64> {
    if let Ok(v) = field.parse::<u64>() {
        return Some(v);
    }
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v as u64),
        _ => None,
    }
}
