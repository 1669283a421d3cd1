use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::effect::{CLEANUP_DELAY, ERROR_DISPLAY_DURATION};
use crate::{
    AppState, CrawlStats, Effect, Msg, Phase, RequestFailure, StatusReport, TaskId, TaskStatus,
};

const SERVER_ERROR: &str = "Server error. Please try again.";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::InputChanged(text) => {
            state.set_input(text);
            Vec::new()
        }
        Msg::CrawlSubmitted => submit_crawl(&mut state),
        Msg::CrawlStarted { task_id } => {
            if state.phase() != Phase::Starting {
                engine_warn!("Ignoring crawl start for task {} outside Starting", task_id);
                return (state, Vec::new());
            }
            engine_info!("Crawl started task_id={}", task_id);
            state.task_started(task_id.clone());
            // The feed delivers progress on its own; polling is the fallback.
            if state.feed_connected() {
                Vec::new()
            } else {
                start_polling(&mut state, task_id)
            }
        }
        Msg::CrawlFailed(failure) => {
            if state.phase() != Phase::Starting {
                return (state, Vec::new());
            }
            state.start_failed();
            let message = failure_message(&failure, "Failed to start crawling");
            show_error(&mut state, message)
        }
        Msg::FeedConnected => {
            engine_info!("Status feed connected");
            state.set_feed_connected(true);
            Vec::new()
        }
        Msg::FeedDisconnected => {
            engine_info!("Status feed disconnected");
            state.set_feed_connected(false);
            Vec::new()
        }
        Msg::FeedConnectFailed { reason } => {
            engine_warn!("Status feed connection error: {}", reason);
            state.set_feed_connected(false);
            match state.current_task().cloned() {
                Some(task_id) if state.phase() == Phase::Crawling => {
                    start_polling(&mut state, task_id)
                }
                _ => Vec::new(),
            }
        }
        Msg::StatusEvent {
            task_id,
            message,
            progress,
            stats,
        } => {
            if !state.is_current(&task_id) {
                engine_debug!("Dropping status event for task {}", task_id);
                return (state, Vec::new());
            }
            apply_progress(&mut state, message, progress, stats.as_ref())
        }
        Msg::StatusPolled { task_id, report } => {
            // A poll answered after its poller was stopped is stale.
            if !state.is_current(&task_id) || !state.is_polling() {
                engine_debug!("Dropping stale status report for task {}", task_id);
                return (state, Vec::new());
            }
            apply_report(&mut state, report)
        }
        Msg::StatusPollFailed { task_id, reason } => {
            engine_warn!("Error checking status of task {}: {}", task_id, reason);
            Vec::new()
        }
        Msg::DownloadClicked => match state.current_task().cloned() {
            Some(task_id) if state.download_visible() && !state.is_downloading() => {
                engine_info!("Downloading archive for task {}", task_id);
                state.set_downloading(true);
                vec![Effect::Download { task_id }]
            }
            _ => Vec::new(),
        },
        Msg::DownloadFinished { task_id, path } => {
            engine_info!("Archive for task {} saved to {:?}", task_id, path);
            state.set_downloading(false);
            if state.is_current(&task_id) {
                state.set_last_download(path);
            }
            schedule_cleanup(&mut state, task_id)
        }
        Msg::DownloadFailed { task_id, failure } => {
            engine_warn!("Download for task {} failed: {:?}", task_id, failure);
            state.set_downloading(false);
            let message = failure_message(&failure, "Failed to download archive");
            let mut effects = show_error(&mut state, message);
            effects.extend(schedule_cleanup(&mut state, task_id));
            effects
        }
        Msg::CleanupFinished { task_id } => {
            engine_info!("Cleanup finished for task {}", task_id);
            state.cleanup_settled();
            Vec::new()
        }
        Msg::CleanupFailed { task_id, reason } => {
            engine_warn!("Error during cleanup of task {}: {}", task_id, reason);
            state.cleanup_settled();
            Vec::new()
        }
        Msg::PreviewClicked => match state.current_task().cloned() {
            Some(task_id) if state.download_visible() && !state.preview_loading() => {
                state.set_preview_loading(true);
                vec![Effect::LoadPreview { task_id }]
            }
            _ => Vec::new(),
        },
        Msg::PreviewLoaded { task_id, preview } => {
            if state.is_current(&task_id) {
                state.set_preview(preview);
            }
            Vec::new()
        }
        Msg::PreviewFailed { task_id, failure } => {
            if !state.is_current(&task_id) {
                return (state, Vec::new());
            }
            state.set_preview_loading(false);
            let message = failure_message(&failure, "Failed to load preview");
            show_error(&mut state, message)
        }
        Msg::ErrorDismissed(id) | Msg::ErrorExpired(id) => {
            state.remove_error(id);
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn submit_crawl(state: &mut AppState) -> Vec<Effect> {
    // The crawl button is disabled while a crawl is outstanding.
    if state.phase().in_flight() {
        engine_debug!("Ignoring submit while a crawl is in flight");
        return Vec::new();
    }
    let url = state.input().trim().to_string();
    if url.is_empty() {
        return show_error(state, "Please enter a valid URL");
    }

    let mut effects = Vec::with_capacity(2);
    if state.reset() {
        effects.push(Effect::StopPolling);
    }
    state.begin_start();
    engine_info!("Submitting crawl url={}", url);
    effects.push(Effect::StartCrawl { url });
    effects
}

fn apply_report(state: &mut AppState, report: StatusReport) -> Vec<Effect> {
    let stats = &report.stats;
    let message = format!(
        "Processing {} of {} URLs...",
        stats.processed_urls, stats.total_urls
    );
    let mut effects = apply_progress(
        state,
        Some(message),
        i32::from(stats.running_percent()),
        Some(stats),
    );

    match report.status {
        TaskStatus::Completed => {
            effects.extend(apply_progress(
                state,
                Some("Crawling completed!".to_string()),
                100,
                Some(stats),
            ));
        }
        TaskStatus::Failed => {
            state.push_status_message("Crawling failed");
            state.mark_failed();
            effects.extend(stop_polling(state));
        }
        TaskStatus::Starting | TaskStatus::Processing | TaskStatus::Other(_) => {}
    }
    effects
}

/// Applies one progress step. Negative progress is the server's failure
/// marker: the bar keeps its value and the crawl is marked failed.
fn apply_progress(
    state: &mut AppState,
    message: Option<String>,
    progress: i32,
    stats: Option<&CrawlStats>,
) -> Vec<Effect> {
    let mut effects = Vec::new();
    if progress >= 0 {
        let percent = progress.min(100) as u8;
        state.set_progress(percent);
        if percent == 100 {
            state.show_download_section();
            effects.extend(stop_polling(state));
        }
    } else {
        if state.phase().in_flight() {
            state.mark_failed();
        }
        effects.extend(stop_polling(state));
    }

    if let Some(message) = message.filter(|text| !text.is_empty()) {
        state.push_status_message(message);
    }
    if let Some(resources) = stats.and_then(|stats| stats.resources) {
        state.set_resources(resources);
    }
    effects
}

fn start_polling(state: &mut AppState, task_id: TaskId) -> Vec<Effect> {
    state.set_polling(true);
    vec![Effect::StartPolling {
        task_id,
        interval: state.poll_interval(),
    }]
}

fn stop_polling(state: &mut AppState) -> Option<Effect> {
    if state.is_polling() {
        state.set_polling(false);
        Some(Effect::StopPolling)
    } else {
        None
    }
}

fn schedule_cleanup(state: &mut AppState, task_id: TaskId) -> Vec<Effect> {
    state.cleanup_scheduled();
    vec![Effect::Cleanup {
        task_id,
        after: CLEANUP_DELAY,
    }]
}

fn show_error(state: &mut AppState, message: impl Into<String>) -> Vec<Effect> {
    let id = state.push_error(message);
    vec![Effect::ExpireError {
        id,
        after: ERROR_DISPLAY_DURATION,
    }]
}

fn failure_message(failure: &RequestFailure, fallback: &str) -> String {
    match failure {
        RequestFailure::Rejected(message) if !message.trim().is_empty() => message.clone(),
        RequestFailure::Rejected(_) => fallback.to_string(),
        RequestFailure::Unreachable => SERVER_ERROR.to_string(),
    }
}
