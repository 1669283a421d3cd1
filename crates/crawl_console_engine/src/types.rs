use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer};

pub type TaskId = String;

/// Event name carried by progress messages on the real-time feed.
pub const STATUS_UPDATE_EVENT: &str = "status_update";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ResourceCountsPayload {
    pub html: u64,
    pub css: u64,
    pub js: u64,
    pub images: u64,
    pub fonts: u64,
    pub other: u64,
}

/// Crawl statistics as reported by the service. Every field is optional on
/// the wire; some task kinds only report `resources`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct StatsPayload {
    pub processed_urls: u64,
    pub total_urls: u64,
    pub failed_urls: u64,
    pub resources: Option<ResourceCountsPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusPayload {
    pub status: String,
    #[serde(default)]
    pub crawled_urls: StatsPayload,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusUpdate {
    pub task_id: TaskId,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "progress_from_number")]
    pub progress: i32,
    #[serde(default)]
    pub stats: Option<StatsPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PreviewPageEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct PreviewPayload {
    #[serde(default)]
    pub pages: Vec<PreviewPageEntry>,
    #[serde(default)]
    pub total_files: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CrawlAccepted {
    pub task_id: TaskId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutput {
    pub path: PathBuf,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Connected,
    Disconnected,
    ConnectFailed { reason: String },
    Update(StatusUpdate),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    CrawlStarted(Result<TaskId, ServiceError>),
    Feed(FeedEvent),
    StatusPolled {
        task_id: TaskId,
        result: Result<StatusPayload, ServiceError>,
    },
    PreviewLoaded {
        task_id: TaskId,
        result: Result<PreviewPayload, ServiceError>,
    },
    DownloadCompleted {
        task_id: TaskId,
        result: Result<DownloadOutput, ServiceError>,
    },
    CleanupCompleted {
        task_id: TaskId,
        result: Result<(), ServiceError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub kind: FailureKind,
    pub message: String,
}

impl ServiceError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The service answered with an `{error}` body; `message` holds its text.
    pub fn is_rejection(&self) -> bool {
        matches!(self.kind, FailureKind::Rejected { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    /// Non-2xx reply carrying a JSON `error` field.
    Rejected { status: u16 },
    /// Non-2xx reply without a readable error body.
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
    Persist,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Rejected { status } => write!(f, "rejected with status {status}"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::Persist => write!(f, "could not save download"),
        }
    }
}

fn progress_from_number<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.map(|v| v.floor() as i32).unwrap_or(0))
}
