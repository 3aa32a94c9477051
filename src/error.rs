use thiserror::Error;

/// Problems with what the user typed. Caught before any work starts.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    #[error("Please enter a YouTube URL")]
    Empty,
    #[error("Please enter a valid YouTube URL")]
    Malformed,
}

impl InputError {
    /// Dialog title for this error
    pub fn title(self) -> &'static str {
        match self {
            InputError::Empty => "❌ Error",
            InputError::Malformed => "❌ Invalid URL",
        }
    }
}

/// Why the orchestrator refused to start a request
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    #[error("A download is already in progress")]
    Busy,
}

/// Failures raised while probing or downloading. Terminal for the request.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("could not run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("unreadable metadata: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{message}{}", exit_suffix(.code))]
    Exited { code: Option<i32>, message: String },
    #[error("{0} produced no output stream")]
    MissingOutput(&'static str),
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {})", code),
        None => String::new(),
    }
}
