use std::sync::Once;

use crawl_console_core::{
    update, AppState, Effect, Msg, Phase, RequestFailure, ERROR_DISPLAY_DURATION, POLL_INTERVAL,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn submit(state: AppState, input: &str) -> (AppState, Vec<Effect>) {
    let (state, _) = update(state, Msg::InputChanged(input.to_string()));
    update(state, Msg::CrawlSubmitted)
}

#[test]
fn blank_input_raises_banner_without_request() {
    init_logging();
    let (mut state, effects) = submit(AppState::new(), "   ");
    let view = state.view();

    assert_eq!(view.phase, Phase::Idle);
    assert_eq!(view.errors.len(), 1);
    assert_eq!(view.errors[0].message, "Please enter a valid URL");
    assert_eq!(
        effects,
        vec![Effect::ExpireError {
            id: view.errors[0].id,
            after: ERROR_DISPLAY_DURATION,
        }]
    );
    assert!(state.consume_dirty());
}

#[test]
fn submit_trims_url_and_disables_button() {
    init_logging();
    let (state, effects) = submit(AppState::new(), "  https://example.com  ");
    let view = state.view();

    assert_eq!(
        effects,
        vec![Effect::StartCrawl {
            url: "https://example.com".to_string()
        }]
    );
    assert_eq!(view.phase, Phase::Starting);
    assert_eq!(view.crawl_button.label, "Starting...");
    assert!(!view.crawl_button.enabled);
    assert!(!view.settled);
}

#[test]
fn start_without_feed_falls_back_to_polling() {
    init_logging();
    let (state, _) = submit(AppState::new(), "https://example.com");
    let (state, effects) = update(
        state,
        Msg::CrawlStarted {
            task_id: "task-1".to_string(),
        },
    );
    let view = state.view();

    assert_eq!(view.current_task.as_deref(), Some("task-1"));
    assert_eq!(view.phase, Phase::Crawling);
    assert_eq!(view.crawl_button.label, "Crawling...");
    assert!(view.polling);
    assert_eq!(
        effects,
        vec![Effect::StartPolling {
            task_id: "task-1".to_string(),
            interval: POLL_INTERVAL,
        }]
    );
}

#[test]
fn start_with_connected_feed_does_not_poll() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::FeedConnected);
    let (state, _) = submit(state, "https://example.com");
    let (state, effects) = update(
        state,
        Msg::CrawlStarted {
            task_id: "task-1".to_string(),
        },
    );

    assert!(effects.is_empty());
    assert!(!state.view().polling);
    assert!(state.view().feed_connected);
}

#[test]
fn custom_poll_interval_is_used() {
    init_logging();
    let interval = std::time::Duration::from_millis(250);
    let (state, _) = submit(AppState::with_poll_interval(interval), "example.com");
    let (_, effects) = update(
        state,
        Msg::CrawlStarted {
            task_id: "t".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::StartPolling {
            task_id: "t".to_string(),
            interval,
        }]
    );
}

#[test]
fn rejected_start_shows_server_message_and_resets_button() {
    init_logging();
    let (state, _) = submit(AppState::new(), "not a url");
    let (state, effects) = update(
        state,
        Msg::CrawlFailed(RequestFailure::Rejected("Invalid URL".to_string())),
    );
    let view = state.view();

    assert_eq!(view.phase, Phase::Idle);
    assert_eq!(view.crawl_button.label, "Crawl Website");
    assert!(view.crawl_button.enabled);
    assert_eq!(view.errors[0].message, "Invalid URL");
    assert_eq!(effects.len(), 1);
    assert!(view.current_task.is_none());
}

#[test]
fn rejected_start_without_message_uses_fallback() {
    init_logging();
    let (state, _) = submit(AppState::new(), "https://example.com");
    let (state, _) = update(
        state,
        Msg::CrawlFailed(RequestFailure::Rejected(String::new())),
    );
    assert_eq!(state.view().errors[0].message, "Failed to start crawling");
}

#[test]
fn unreachable_service_reports_server_error() {
    init_logging();
    let (state, _) = submit(AppState::new(), "https://example.com");
    let (state, _) = update(state, Msg::CrawlFailed(RequestFailure::Unreachable));
    let view = state.view();
    assert_eq!(view.errors[0].message, "Server error. Please try again.");
    assert!(view.crawl_button.enabled);
}

#[test]
fn submit_is_ignored_while_crawl_in_flight() {
    init_logging();
    let (state, _) = submit(AppState::new(), "https://a.example.com");
    let (state, _) = update(
        state,
        Msg::CrawlStarted {
            task_id: "a".to_string(),
        },
    );
    let (state, effects) = submit(state, "https://b.example.com");

    assert!(effects.is_empty());
    assert_eq!(state.view().current_task.as_deref(), Some("a"));
}

#[test]
fn late_start_reply_is_ignored() {
    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::CrawlStarted {
            task_id: "ghost".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert!(state.view().current_task.is_none());
}

#[test]
fn new_submit_after_failure_resets_previous_task() {
    init_logging();
    let (state, _) = submit(AppState::new(), "https://a.example.com");
    let (state, _) = update(
        state,
        Msg::CrawlStarted {
            task_id: "a".to_string(),
        },
    );
    // Negative progress is the server's failure marker.
    let (state, effects) = update(
        state,
        Msg::StatusEvent {
            task_id: "a".to_string(),
            message: Some("Error: boom".to_string()),
            progress: -1,
            stats: None,
        },
    );
    assert_eq!(effects, vec![Effect::StopPolling]);
    assert_eq!(state.view().phase, Phase::Failed);
    assert_eq!(state.view().crawl_button.label, "Crawl Another Website");

    let (state, effects) = submit(state, "https://b.example.com");
    let view = state.view();
    assert_eq!(
        effects,
        vec![Effect::StartCrawl {
            url: "https://b.example.com".to_string()
        }]
    );
    assert!(view.current_task.is_none());
    assert!(view.status_log.is_empty());
    assert_eq!(view.progress, 0);
}

#[test]
fn feed_failure_restarts_polling_for_running_crawl() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::FeedConnected);
    let (state, _) = submit(state, "https://example.com");
    let (state, _) = update(
        state,
        Msg::CrawlStarted {
            task_id: "t1".to_string(),
        },
    );
    let (state, effects) = update(
        state,
        Msg::FeedConnectFailed {
            reason: "refused".to_string(),
        },
    );

    assert!(!state.view().feed_connected);
    assert!(state.view().polling);
    assert_eq!(
        effects,
        vec![Effect::StartPolling {
            task_id: "t1".to_string(),
            interval: POLL_INTERVAL,
        }]
    );
}

#[test]
fn feed_failure_without_task_only_marks_disconnected() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::FeedConnected);
    let (state, effects) = update(
        state,
        Msg::FeedConnectFailed {
            reason: "refused".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert!(!state.view().feed_connected);
}

#[test]
fn banners_are_removed_on_dismiss_or_expiry() {
    init_logging();
    let (state, _) = submit(AppState::new(), "");
    let (state, _) = submit(state, "");
    let ids: Vec<_> = state.view().errors.iter().map(|e| e.id).collect();
    assert_eq!(ids.len(), 2);

    let (state, _) = update(state, Msg::ErrorDismissed(ids[0]));
    assert_eq!(state.view().errors.len(), 1);
    let (state, _) = update(state, Msg::ErrorExpired(ids[1]));
    assert!(state.view().errors.is_empty());
}
