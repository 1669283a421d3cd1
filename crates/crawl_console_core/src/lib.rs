//! Crawl console core: pure controller state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, CLEANUP_DELAY, ERROR_DISPLAY_DURATION, POLL_INTERVAL};
pub use msg::{Msg, RequestFailure};
pub use state::{
    AppState, CrawlStats, ErrorId, Phase, Preview, PreviewPage, ResourceCounts, StatusReport,
    TaskId, TaskStatus,
};
pub use update::update;
pub use view_model::{AppViewModel, ButtonView, ErrorBanner, PreviewView, NO_PAGES_NOTICE};
