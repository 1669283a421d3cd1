use std::path::PathBuf;
use std::time::Duration;

use crate::effect::POLL_INTERVAL;
use crate::view_model::{AppViewModel, ButtonView, ErrorBanner, PreviewView};

/// Server-assigned identifier for one crawl, opaque to the client.
pub type TaskId = String;
pub type ErrorId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Starting,
    Crawling,
    Completed,
    Failed,
}

impl Phase {
    /// A crawl request or a running crawl is outstanding.
    pub fn in_flight(self) -> bool {
        matches!(self, Phase::Starting | Phase::Crawling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceCounts {
    pub html: u64,
    pub css: u64,
    pub js: u64,
    pub images: u64,
    pub fonts: u64,
    pub other: u64,
}

impl ResourceCounts {
    pub fn total(&self) -> u64 {
        self.html + self.css + self.js + self.images + self.fonts + self.other
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrawlStats {
    pub processed_urls: u64,
    pub total_urls: u64,
    pub failed_urls: u64,
    pub resources: Option<ResourceCounts>,
}

impl CrawlStats {
    /// Completion percentage while a crawl is still running; 100 is reserved
    /// for the completed report.
    pub fn running_percent(&self) -> u8 {
        let total = self.total_urls.max(1);
        let percent = self.processed_urls.saturating_mul(100) / total;
        percent.min(99) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Starting,
    Processing,
    Completed,
    Failed,
    Other(String),
}

impl TaskStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "starting" | "started" | "initialized" => TaskStatus::Starting,
            "processing" | "crawling" => TaskStatus::Processing,
            "completed" => TaskStatus::Completed,
            "failed" => TaskStatus::Failed,
            other => TaskStatus::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: TaskStatus,
    pub stats: CrawlStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewPage {
    pub title: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Preview {
    pub pages: Vec<PreviewPage>,
    pub total_files: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct PreviewState {
    loading: bool,
    loaded: Option<Preview>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    input: String,
    phase: Phase,
    current_task: Option<TaskId>,
    polling: bool,
    poll_interval: Duration,
    feed_connected: bool,
    progress: u8,
    status_log: Vec<String>,
    resources: ResourceCounts,
    download_visible: bool,
    downloading: bool,
    last_download: Option<PathBuf>,
    pending_cleanups: usize,
    preview: PreviewState,
    errors: Vec<ErrorBanner>,
    next_error_id: ErrorId,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            input: String::new(),
            phase: Phase::Idle,
            current_task: None,
            polling: false,
            poll_interval: POLL_INTERVAL,
            feed_connected: false,
            progress: 0,
            status_log: Vec::new(),
            resources: ResourceCounts::default(),
            download_visible: false,
            downloading: false,
            last_download: None,
            pending_cleanups: 0,
            preview: PreviewState::default(),
            errors: Vec::new(),
            next_error_id: 1,
            dirty: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        let crawl_button = match self.phase {
            Phase::Idle => ButtonView::enabled("Crawl Website"),
            Phase::Starting => ButtonView::disabled("Starting..."),
            Phase::Crawling => ButtonView::disabled("Crawling..."),
            Phase::Completed | Phase::Failed => ButtonView::enabled("Crawl Another Website"),
        };
        let preview_button = self.download_visible.then(|| {
            if self.preview.loading {
                ButtonView::disabled("Loading preview...")
            } else {
                ButtonView::enabled("Show Preview")
            }
        });

        AppViewModel {
            input: self.input.clone(),
            phase: self.phase,
            current_task: self.current_task.clone(),
            polling: self.polling,
            feed_connected: self.feed_connected,
            progress: self.progress,
            status_log: self.status_log.clone(),
            resources: self.resources,
            crawl_button,
            download_visible: self.download_visible,
            preview_button,
            preview: self.preview.loaded.as_ref().map(PreviewView::from_preview),
            errors: self.errors.clone(),
            last_download: self.last_download.clone(),
            settled: self.is_settled(),
            dirty: self.dirty,
        }
    }

    /// Returns and clears the dirty flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// No request or crawl is outstanding for the current task.
    pub fn is_settled(&self) -> bool {
        !self.phase.in_flight()
            && !self.preview.loading
            && !self.downloading
            && self.pending_cleanups == 0
    }

    /// A download or a server-side cleanup has not finished yet; a download
    /// always ends in a cleanup.
    pub fn has_pending_cleanup(&self) -> bool {
        self.downloading || self.pending_cleanups > 0
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_task(&self) -> Option<&TaskId> {
        self.current_task.as_ref()
    }

    pub fn is_current(&self, task_id: &str) -> bool {
        self.current_task.as_deref() == Some(task_id)
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn feed_connected(&self) -> bool {
        self.feed_connected
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn input(&self) -> &str {
        &self.input
    }

    pub(crate) fn set_input(&mut self, text: String) {
        if self.input != text {
            self.input = text;
            self.mark_dirty();
        }
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub(crate) fn set_feed_connected(&mut self, connected: bool) {
        if self.feed_connected != connected {
            self.feed_connected = connected;
            self.mark_dirty();
        }
    }

    /// Clears everything tied to the previous task. Returns true when a poller
    /// was running and must be stopped.
    pub(crate) fn reset(&mut self) -> bool {
        let was_polling = self.polling;
        self.current_task = None;
        self.polling = false;
        self.phase = Phase::Idle;
        self.progress = 0;
        self.status_log.clear();
        self.resources = ResourceCounts::default();
        self.download_visible = false;
        self.last_download = None;
        self.preview = PreviewState::default();
        self.mark_dirty();
        was_polling
    }

    pub(crate) fn begin_start(&mut self) {
        self.phase = Phase::Starting;
        self.mark_dirty();
    }

    pub(crate) fn start_failed(&mut self) {
        self.phase = Phase::Idle;
        self.mark_dirty();
    }

    pub(crate) fn task_started(&mut self, task_id: TaskId) {
        self.current_task = Some(task_id);
        self.phase = Phase::Crawling;
        self.mark_dirty();
    }

    pub(crate) fn set_polling(&mut self, polling: bool) {
        if self.polling != polling {
            self.polling = polling;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_progress(&mut self, progress: u8) {
        let progress = progress.min(100);
        if self.progress != progress {
            self.progress = progress;
            self.mark_dirty();
        }
    }

    pub(crate) fn push_status_message(&mut self, message: impl Into<String>) {
        self.status_log.push(message.into());
        self.mark_dirty();
    }

    pub(crate) fn set_resources(&mut self, resources: ResourceCounts) {
        if self.resources != resources {
            self.resources = resources;
            self.mark_dirty();
        }
    }

    pub(crate) fn show_download_section(&mut self) {
        self.download_visible = true;
        self.phase = Phase::Completed;
        self.mark_dirty();
    }

    pub(crate) fn download_visible(&self) -> bool {
        self.download_visible
    }

    pub(crate) fn mark_failed(&mut self) {
        self.phase = Phase::Failed;
        self.mark_dirty();
    }

    pub(crate) fn is_downloading(&self) -> bool {
        self.downloading
    }

    pub(crate) fn set_downloading(&mut self, downloading: bool) {
        self.downloading = downloading;
        self.mark_dirty();
    }

    pub(crate) fn set_last_download(&mut self, path: PathBuf) {
        self.last_download = Some(path);
        self.mark_dirty();
    }

    pub(crate) fn cleanup_scheduled(&mut self) {
        self.pending_cleanups += 1;
    }

    pub(crate) fn cleanup_settled(&mut self) {
        self.pending_cleanups = self.pending_cleanups.saturating_sub(1);
        self.mark_dirty();
    }

    pub(crate) fn preview_loading(&self) -> bool {
        self.preview.loading
    }

    pub(crate) fn set_preview_loading(&mut self, loading: bool) {
        if self.preview.loading != loading {
            self.preview.loading = loading;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_preview(&mut self, preview: Preview) {
        self.preview.loaded = Some(preview);
        self.preview.loading = false;
        self.mark_dirty();
    }

    pub(crate) fn push_error(&mut self, message: impl Into<String>) -> ErrorId {
        let id = self.next_error_id;
        self.next_error_id += 1;
        // Newest banner first.
        self.errors.insert(
            0,
            ErrorBanner {
                id,
                message: message.into(),
            },
        );
        self.mark_dirty();
        id
    }

    pub(crate) fn remove_error(&mut self, id: ErrorId) {
        let before = self.errors.len();
        self.errors.retain(|banner| banner.id != id);
        if self.errors.len() != before {
            self.mark_dirty();
        }
    }
}
