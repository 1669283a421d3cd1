use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::poller::run_poller;
use crate::sink::{ChannelEventSink, EventSink};
use crate::{
    CrawlService, EngineEvent, HttpCrawlService, ServiceError, ServiceSettings, StatusFeed, TaskId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    StartCrawl { url: String },
    /// Replaces the running poller, if any.
    StartPolling { task_id: TaskId, interval: Duration },
    StopPolling,
    ConnectFeed,
    DisconnectFeed,
    Download { task_id: TaskId },
    Cleanup { task_id: TaskId, after: Duration },
    LoadPreview { task_id: TaskId },
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("engine runtime: {0}")]
    Runtime(#[from] io::Error),
}

/// Command side of the engine. Cloning shares the same background worker,
/// which shuts down once every handle is dropped.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    /// Starts the engine against the HTTP crawl service described by
    /// `settings`. `with_feed` controls whether the real-time feed is usable.
    pub fn spawn(
        settings: &ServiceSettings,
        with_feed: bool,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>), EngineError> {
        let service = Arc::new(HttpCrawlService::new(settings)?);
        let feed = if with_feed {
            Some(StatusFeed::new(settings)?)
        } else {
            None
        };
        Self::spawn_with(service, feed, settings.output_dir.clone())
    }

    pub fn spawn_with(
        service: Arc<dyn CrawlService>,
        feed: Option<StatusFeed>,
        output_dir: PathBuf,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>), EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = Runtime::new()?;

        let mut worker = Worker {
            runtime,
            service,
            feed: feed.map(Arc::new),
            sink: Arc::new(ChannelEventSink::new(event_tx)),
            output_dir,
            poller: None,
            feed_cancel: None,
        };
        thread::Builder::new()
            .name("crawl-engine".to_string())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    worker.handle(command);
                }
                worker.shutdown();
            })?;

        Ok((Self { cmd_tx }, event_rx))
    }

    pub fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }
}

struct Worker {
    runtime: Runtime,
    service: Arc<dyn CrawlService>,
    feed: Option<Arc<StatusFeed>>,
    sink: Arc<dyn EventSink>,
    output_dir: PathBuf,
    poller: Option<(TaskId, CancellationToken)>,
    feed_cancel: Option<CancellationToken>,
}

impl Worker {
    fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::StartCrawl { url } => {
                let service = self.service.clone();
                let sink = self.sink.clone();
                self.runtime.spawn(async move {
                    let result = service.start_crawl(&url).await;
                    sink.emit(EngineEvent::CrawlStarted(result));
                });
            }
            EngineCommand::StartPolling { task_id, interval } => {
                self.stop_polling();
                engine_info!("Polling status of task {} every {:?}", task_id, interval);
                let cancel = CancellationToken::new();
                self.runtime.spawn(run_poller(
                    self.service.clone(),
                    task_id.clone(),
                    interval,
                    self.sink.clone(),
                    cancel.clone(),
                ));
                self.poller = Some((task_id, cancel));
            }
            EngineCommand::StopPolling => self.stop_polling(),
            EngineCommand::ConnectFeed => {
                let Some(feed) = self.feed.clone() else {
                    engine_debug!("Status feed disabled; not connecting");
                    return;
                };
                if self.feed_cancel.is_some() {
                    return;
                }
                let cancel = CancellationToken::new();
                let sink = self.sink.clone();
                let token = cancel.clone();
                self.runtime.spawn(async move {
                    feed.run(token, sink.as_ref()).await;
                });
                self.feed_cancel = Some(cancel);
            }
            EngineCommand::DisconnectFeed => {
                if let Some(cancel) = self.feed_cancel.take() {
                    cancel.cancel();
                }
            }
            EngineCommand::Download { task_id } => {
                let service = self.service.clone();
                let sink = self.sink.clone();
                let output_dir = self.output_dir.clone();
                self.runtime.spawn(async move {
                    let result = service.download(&task_id, &output_dir).await;
                    sink.emit(EngineEvent::DownloadCompleted { task_id, result });
                });
            }
            EngineCommand::Cleanup { task_id, after } => {
                let service = self.service.clone();
                let sink = self.sink.clone();
                self.runtime.spawn(async move {
                    tokio::time::sleep(after).await;
                    let result = service.cleanup(&task_id).await;
                    sink.emit(EngineEvent::CleanupCompleted { task_id, result });
                });
            }
            EngineCommand::LoadPreview { task_id } => {
                let service = self.service.clone();
                let sink = self.sink.clone();
                self.runtime.spawn(async move {
                    let result = service.preview(&task_id).await;
                    sink.emit(EngineEvent::PreviewLoaded { task_id, result });
                });
            }
        }
    }

    fn stop_polling(&mut self) {
        if let Some((task_id, cancel)) = self.poller.take() {
            engine_debug!("Stopping status poller for task {}", task_id);
            cancel.cancel();
        }
    }

    fn shutdown(mut self) {
        self.stop_polling();
        if let Some(cancel) = self.feed_cancel.take() {
            cancel.cancel();
        }
        self.runtime.shutdown_timeout(Duration::from_secs(1));
    }
}
