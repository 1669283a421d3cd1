//! Crawl console engine: crawl service client, status feed and effect execution.
mod engine;
mod feed;
mod filename;
mod persist;
mod poller;
mod service;
mod settings;
mod sink;
mod sse;
mod types;

pub use engine::{EngineCommand, EngineError, EngineHandle};
pub use feed::StatusFeed;
pub use filename::archive_filename;
pub use persist::{ensure_output_dir, AtomicFileWriter, PendingFile, PersistError};
pub use poller::run_poller;
pub use service::{CrawlService, HttpCrawlService};
pub use settings::ServiceSettings;
pub use sink::{ChannelEventSink, EventSink};
pub use sse::{SseEvent, SseParser};
pub use types::{
    DownloadOutput, EngineEvent, FailureKind, FeedEvent, PreviewPageEntry, PreviewPayload,
    ResourceCountsPayload, ServiceError, StatsPayload, StatusPayload, StatusUpdate, TaskId,
    STATUS_UPDATE_EVENT,
};
