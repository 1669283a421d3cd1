use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

use crawl_console_engine::{
    CrawlService, DownloadOutput, EngineCommand, EngineEvent, EngineHandle, PreviewPageEntry,
    PreviewPayload, ServiceError, StatsPayload, StatusPayload, TaskId,
};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct FakeService {
    polls: AtomicU64,
    cleaned: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl CrawlService for FakeService {
    async fn start_crawl(&self, url: &str) -> Result<TaskId, ServiceError> {
        Ok(format!("task-for-{url}"))
    }

    async fn status(&self, _task_id: &str) -> Result<StatusPayload, ServiceError> {
        let processed = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(StatusPayload {
            status: "processing".to_string(),
            crawled_urls: StatsPayload {
                processed_urls: processed,
                total_urls: 100,
                ..StatsPayload::default()
            },
        })
    }

    async fn preview(&self, _task_id: &str) -> Result<PreviewPayload, ServiceError> {
        Ok(PreviewPayload {
            pages: vec![PreviewPageEntry {
                title: "Home".to_string(),
                path: "index.html".to_string(),
            }],
            total_files: 3,
        })
    }

    async fn download(
        &self,
        task_id: &str,
        output_dir: &Path,
    ) -> Result<DownloadOutput, ServiceError> {
        Ok(DownloadOutput {
            path: output_dir.join(format!("{task_id}.zip")),
            byte_len: 42,
        })
    }

    async fn cleanup(&self, task_id: &str) -> Result<(), ServiceError> {
        self.cleaned.lock().unwrap().push(task_id.to_string());
        Ok(())
    }
}

fn start() -> (EngineHandle, mpsc::Receiver<EngineEvent>, Arc<FakeService>) {
    let service = Arc::new(FakeService::default());
    let (engine, events) =
        EngineHandle::spawn_with(service.clone(), None, PathBuf::from("out")).expect("engine");
    (engine, events, service)
}

fn next(events: &mpsc::Receiver<EngineEvent>) -> EngineEvent {
    events
        .recv_timeout(Duration::from_secs(2))
        .expect("engine event")
}

fn drain(events: &mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.recv_timeout(Duration::from_millis(100)) {
        drained.push(event);
    }
    drained
}

fn polled_task(event: &EngineEvent) -> Option<&str> {
    match event {
        EngineEvent::StatusPolled { task_id, .. } => Some(task_id.as_str()),
        _ => None,
    }
}

#[test]
fn start_crawl_reports_task_id() {
    let (engine, events, _) = start();
    engine.send(EngineCommand::StartCrawl {
        url: "example.com".to_string(),
    });
    assert_eq!(
        next(&events),
        EngineEvent::CrawlStarted(Ok("task-for-example.com".to_string()))
    );
}

#[test]
fn poller_repeats_until_stopped() {
    let (engine, events, service) = start();
    engine.send(EngineCommand::StartPolling {
        task_id: "t1".to_string(),
        interval: Duration::from_millis(20),
    });

    for _ in 0..3 {
        assert_eq!(polled_task(&next(&events)), Some("t1"));
    }

    engine.send(EngineCommand::StopPolling);
    drain(&events);
    let polls = service.polls.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(service.polls.load(Ordering::SeqCst), polls);
    assert!(events.try_recv().is_err());
}

#[test]
fn starting_a_poller_replaces_the_previous_one() {
    let (engine, events, _) = start();
    engine.send(EngineCommand::StartPolling {
        task_id: "old".to_string(),
        interval: Duration::from_millis(20),
    });
    assert_eq!(polled_task(&next(&events)), Some("old"));

    engine.send(EngineCommand::StartPolling {
        task_id: "new".to_string(),
        interval: Duration::from_millis(20),
    });
    // Skip results of the old poller that were already in flight.
    while polled_task(&next(&events)) != Some("new") {}
    for _ in 0..3 {
        assert_eq!(polled_task(&next(&events)), Some("new"));
    }
}

#[test]
fn cleanup_waits_for_its_delay() {
    let (engine, events, service) = start();
    let started = Instant::now();
    engine.send(EngineCommand::Cleanup {
        task_id: "t1".to_string(),
        after: Duration::from_millis(80),
    });

    assert_eq!(
        next(&events),
        EngineEvent::CleanupCompleted {
            task_id: "t1".to_string(),
            result: Ok(()),
        }
    );
    assert!(started.elapsed() >= Duration::from_millis(80));
    assert_eq!(*service.cleaned.lock().unwrap(), vec!["t1".to_string()]);
}

#[test]
fn preview_and_download_results_are_forwarded() {
    let (engine, events, _) = start();
    engine.send(EngineCommand::LoadPreview {
        task_id: "t1".to_string(),
    });
    match next(&events) {
        EngineEvent::PreviewLoaded { task_id, result } => {
            assert_eq!(task_id, "t1");
            assert_eq!(result.unwrap().total_files, 3);
        }
        other => panic!("unexpected event {other:?}"),
    }

    engine.send(EngineCommand::Download {
        task_id: "t1".to_string(),
    });
    assert_eq!(
        next(&events),
        EngineEvent::DownloadCompleted {
            task_id: "t1".to_string(),
            result: Ok(DownloadOutput {
                path: PathBuf::from("out").join("t1.zip"),
                byte_len: 42,
            }),
        }
    );
}

#[test]
fn feed_commands_without_feed_are_ignored() {
    let (engine, events, _) = start();
    engine.send(EngineCommand::ConnectFeed);
    engine.send(EngineCommand::DisconnectFeed);
    assert!(drain(&events).is_empty());
}
