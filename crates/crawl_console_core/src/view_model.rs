use std::path::PathBuf;

use crate::{ErrorId, Phase, Preview, PreviewPage, ResourceCounts, TaskId};

pub const NO_PAGES_NOTICE: &str = "No pages available for preview";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonView {
    pub label: &'static str,
    pub enabled: bool,
}

impl ButtonView {
    pub(crate) fn enabled(label: &'static str) -> Self {
        Self {
            label,
            enabled: true,
        }
    }

    pub(crate) fn disabled(label: &'static str) -> Self {
        Self {
            label,
            enabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBanner {
    pub id: ErrorId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewView {
    pub pages: Vec<PreviewPage>,
    pub total_files: u64,
    /// Set when the listing is empty.
    pub notice: Option<&'static str>,
}

impl PreviewView {
    pub(crate) fn from_preview(preview: &Preview) -> Self {
        Self {
            pages: preview.pages.clone(),
            total_files: preview.total_files,
            notice: preview.pages.is_empty().then_some(NO_PAGES_NOTICE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppViewModel {
    pub input: String,
    pub phase: Phase,
    pub current_task: Option<TaskId>,
    pub polling: bool,
    pub feed_connected: bool,
    pub progress: u8,
    pub status_log: Vec<String>,
    pub resources: ResourceCounts,
    pub crawl_button: ButtonView,
    pub download_visible: bool,
    /// `None` while the preview button is hidden.
    pub preview_button: Option<ButtonView>,
    /// `None` while the preview section is hidden.
    pub preview: Option<PreviewView>,
    pub errors: Vec<ErrorBanner>,
    pub last_download: Option<PathBuf>,
    pub settled: bool,
    pub dirty: bool,
}
