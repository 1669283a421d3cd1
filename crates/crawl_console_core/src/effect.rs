use std::time::Duration;

use crate::{ErrorId, TaskId};

/// Default status polling cadence used when the real-time feed is unavailable.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Delay between a download attempt and the cleanup request for its task.
pub const CLEANUP_DELAY: Duration = Duration::from_secs(5);
/// How long an error banner stays up before it expires on its own.
pub const ERROR_DISPLAY_DURATION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartCrawl { url: String },
    /// Replaces any running poller with one for `task_id`.
    StartPolling { task_id: TaskId, interval: Duration },
    StopPolling,
    Download { task_id: TaskId },
    Cleanup { task_id: TaskId, after: Duration },
    LoadPreview { task_id: TaskId },
    ExpireError { id: ErrorId, after: Duration },
}
