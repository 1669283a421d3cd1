use std::path::PathBuf;

use crate::{CrawlStats, ErrorId, Preview, StatusReport, TaskId};

/// Why a request to the crawl service did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFailure {
    /// The service answered with an error; the text may be empty.
    Rejected(String),
    /// The service could not be reached or its reply could not be read.
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the URL input.
    InputChanged(String),
    /// User submitted the URL form.
    CrawlSubmitted,
    /// Service accepted the crawl and assigned a task.
    CrawlStarted { task_id: TaskId },
    /// Service refused or could not be asked to start the crawl.
    CrawlFailed(RequestFailure),
    /// Real-time feed connected.
    FeedConnected,
    /// Real-time feed dropped after having been connected.
    FeedDisconnected,
    /// Real-time feed could not be established.
    FeedConnectFailed { reason: String },
    /// Progress event pushed over the real-time feed.
    StatusEvent {
        task_id: TaskId,
        message: Option<String>,
        progress: i32,
        stats: Option<CrawlStats>,
    },
    /// Result of one status poll.
    StatusPolled {
        task_id: TaskId,
        report: StatusReport,
    },
    /// A status poll failed; only logged.
    StatusPollFailed { task_id: TaskId, reason: String },
    /// User clicked Download.
    DownloadClicked,
    /// Archive saved locally.
    DownloadFinished { task_id: TaskId, path: PathBuf },
    /// Archive could not be fetched.
    DownloadFailed {
        task_id: TaskId,
        failure: RequestFailure,
    },
    /// Server released the task resources.
    CleanupFinished { task_id: TaskId },
    /// Cleanup request failed; only logged.
    CleanupFailed { task_id: TaskId, reason: String },
    /// User clicked Show Preview.
    PreviewClicked,
    /// Preview listing arrived.
    PreviewLoaded { task_id: TaskId, preview: Preview },
    /// Preview could not be loaded.
    PreviewFailed {
        task_id: TaskId,
        failure: RequestFailure,
    },
    /// User closed an error banner.
    ErrorDismissed(ErrorId),
    /// Error banner display time elapsed.
    ErrorExpired(ErrorId),
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
