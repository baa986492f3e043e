use std::fmt;

/// Why a single URL failed to produce a snippet.
///
/// The kind is preserved all the way to the caller; only the serving
/// boundary flattens failures to display strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The transport itself failed: DNS, connection refused, timeout.
    Network,
    /// The response status fell outside the inclusive 2xx range.
    BadStatus(u16),
    /// The body could not be decoded into parseable text.
    ParseFailure,
    /// The page parsed fine but neither extraction rule matched.
    NotFound,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Network => write!(f, "network error"),
            FailureKind::BadStatus(code) => write!(f, "invalid status code {code}"),
            FailureKind::ParseFailure => write!(f, "failed to read html"),
            FailureKind::NotFound => write!(f, "no extractable content"),
        }
    }
}

/// A classified per-URL failure. Local to its URL and never fatal to the
/// batch; sibling URLs are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} for url {url:?}: {message}")]
pub struct FetchFailure {
    pub url: String,
    pub kind: FailureKind,
    pub message: String,
}

impl FetchFailure {
    pub(crate) fn new(url: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            message: message.into(),
        }
    }
}

/// The per-URL result of one fetch-and-extract attempt.
pub type Outcome = Result<String, FetchFailure>;

/// Aggregate result of one batch invocation.
///
/// Items appear in completion order, which is nondeterministic across runs;
/// only the 1:1 URL-to-outcome correspondence is guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub success_count: usize,
    pub success_items: Vec<String>,
    pub error_count: usize,
    pub error_items: Vec<FetchFailure>,
}

impl Report {
    /// Failures rendered as human-readable messages, for the serving
    /// boundary which does not expose structured errors.
    pub fn error_messages(&self) -> Vec<String> {
        self.error_items.iter().map(|err| err.to_string()).collect()
    }
}

/// Rejected input to the batch coordinator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("worker count must be at least 1, got {0}")]
    InvalidWorkerCount(usize),
}
