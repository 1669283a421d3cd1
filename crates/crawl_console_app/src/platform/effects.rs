use std::sync::mpsc;
use std::thread;

use crawl_console_core::{
    CrawlStats, Effect, Msg, Preview, PreviewPage, RequestFailure, ResourceCounts, StatusReport,
    TaskStatus,
};
use crawl_console_engine::{
    EngineCommand, EngineEvent, EngineHandle, FeedEvent, PreviewPayload, ServiceError,
    StatsPayload, StatusPayload,
};
use engine_logging::{engine_debug, engine_info, engine_warn};

use super::app::AppEvent;

pub struct EffectRunner {
    engine: EngineHandle,
    msg_tx: mpsc::Sender<AppEvent>,
}

impl EffectRunner {
    /// Forwards every engine event into the app loop as a [`Msg`].
    pub fn new(
        engine: EngineHandle,
        events: mpsc::Receiver<EngineEvent>,
        msg_tx: mpsc::Sender<AppEvent>,
    ) -> Self {
        let forward_tx = msg_tx.clone();
        thread::spawn(move || {
            while let Ok(event) = events.recv() {
                if forward_tx.send(AppEvent::Msg(map_event(event))).is_err() {
                    break;
                }
            }
        });
        Self { engine, msg_tx }
    }

    pub fn connect_feed(&self) {
        self.engine.send(EngineCommand::ConnectFeed);
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartCrawl { url } => {
                    engine_info!("StartCrawl url={}", url);
                    self.engine.send(EngineCommand::StartCrawl { url });
                }
                Effect::StartPolling { task_id, interval } => {
                    self.engine
                        .send(EngineCommand::StartPolling { task_id, interval });
                }
                Effect::StopPolling => self.engine.send(EngineCommand::StopPolling),
                Effect::Download { task_id } => {
                    engine_info!("Download task_id={}", task_id);
                    self.engine.send(EngineCommand::Download { task_id });
                }
                Effect::Cleanup { task_id, after } => {
                    engine_debug!("Cleanup task_id={} after {:?}", task_id, after);
                    self.engine.send(EngineCommand::Cleanup { task_id, after });
                }
                Effect::LoadPreview { task_id } => {
                    self.engine.send(EngineCommand::LoadPreview { task_id });
                }
                Effect::ExpireError { id, after } => {
                    let tx = self.msg_tx.clone();
                    thread::spawn(move || {
                        thread::sleep(after);
                        let _ = tx.send(AppEvent::Msg(Msg::ErrorExpired(id)));
                    });
                }
            }
        }
    }

    pub fn shutdown(&self) {
        self.engine.send(EngineCommand::StopPolling);
        self.engine.send(EngineCommand::DisconnectFeed);
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::CrawlStarted(Ok(task_id)) => Msg::CrawlStarted { task_id },
        EngineEvent::CrawlStarted(Err(err)) => {
            engine_warn!("Crawl request failed: {}", err);
            Msg::CrawlFailed(map_failure(&err))
        }
        EngineEvent::Feed(FeedEvent::Connected) => Msg::FeedConnected,
        EngineEvent::Feed(FeedEvent::Disconnected) => Msg::FeedDisconnected,
        EngineEvent::Feed(FeedEvent::ConnectFailed { reason }) => {
            Msg::FeedConnectFailed { reason }
        }
        EngineEvent::Feed(FeedEvent::Update(update)) => Msg::StatusEvent {
            task_id: update.task_id,
            message: update.message,
            progress: update.progress,
            stats: update.stats.map(map_stats),
        },
        EngineEvent::StatusPolled { task_id, result } => match result {
            Ok(payload) => Msg::StatusPolled {
                task_id,
                report: map_report(payload),
            },
            Err(err) => Msg::StatusPollFailed {
                task_id,
                reason: err.to_string(),
            },
        },
        EngineEvent::PreviewLoaded { task_id, result } => match result {
            Ok(payload) => Msg::PreviewLoaded {
                task_id,
                preview: map_preview(payload),
            },
            Err(err) => {
                engine_warn!("Preview for task {} failed: {}", task_id, err);
                Msg::PreviewFailed {
                    task_id,
                    failure: map_failure(&err),
                }
            }
        },
        EngineEvent::DownloadCompleted { task_id, result } => match result {
            Ok(output) => Msg::DownloadFinished {
                task_id,
                path: output.path,
            },
            Err(err) => {
                engine_warn!("Download for task {} failed: {}", task_id, err);
                Msg::DownloadFailed {
                    task_id,
                    failure: map_failure(&err),
                }
            }
        },
        EngineEvent::CleanupCompleted { task_id, result } => match result {
            Ok(()) => Msg::CleanupFinished { task_id },
            Err(err) => Msg::CleanupFailed {
                task_id,
                reason: err.to_string(),
            },
        },
    }
}

fn map_failure(err: &ServiceError) -> RequestFailure {
    if err.is_rejection() {
        RequestFailure::Rejected(err.message.clone())
    } else {
        RequestFailure::Unreachable
    }
}

fn map_stats(stats: StatsPayload) -> CrawlStats {
    CrawlStats {
        processed_urls: stats.processed_urls,
        total_urls: stats.total_urls,
        failed_urls: stats.failed_urls,
        resources: stats.resources.map(|r| ResourceCounts {
            html: r.html,
            css: r.css,
            js: r.js,
            images: r.images,
            fonts: r.fonts,
            other: r.other,
        }),
    }
}

fn map_report(payload: StatusPayload) -> StatusReport {
    StatusReport {
        status: TaskStatus::parse(&payload.status),
        stats: map_stats(payload.crawled_urls),
    }
}

fn map_preview(payload: PreviewPayload) -> Preview {
    Preview {
        pages: payload
            .pages
            .into_iter()
            .map(|page| PreviewPage {
                title: page.title,
                path: page.path,
            })
            .collect(),
        total_files: payload.total_files,
    }
}
