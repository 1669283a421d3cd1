use std::time::Duration;

use engine_logging::{engine_info, engine_trace, engine_warn};
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::Response;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::service::{endpoint, map_reqwest_error};
use crate::sink::EventSink;
use crate::sse::{SseEvent, SseParser};
use crate::{
    EngineEvent, FailureKind, FeedEvent, ServiceError, ServiceSettings, StatusUpdate,
    STATUS_UPDATE_EVENT,
};

/// Real-time status channel: a server-sent events stream carrying
/// `status_update` events for every task.
#[derive(Debug, Clone)]
pub struct StatusFeed {
    client: reqwest::Client,
    url: Url,
    reconnect_attempts: u32,
    reconnect_delay: Duration,
}

impl StatusFeed {
    pub fn new(settings: &ServiceSettings) -> Result<Self, ServiceError> {
        let segments: Vec<&str> = settings
            .feed_path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        let url = endpoint(&settings.base_url, &segments)?;
        // The stream is long-lived; only connecting is bounded.
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| ServiceError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            client,
            url,
            reconnect_attempts: settings.feed_reconnect_attempts,
            reconnect_delay: settings.feed_reconnect_delay,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Keeps the feed connected until `cancel` fires or more than
    /// `reconnect_attempts` consecutive connection attempts have failed.
    pub async fn run(&self, cancel: CancellationToken, sink: &dyn EventSink) {
        let mut failures = 0u32;
        loop {
            let connected = tokio::select! {
                _ = cancel.cancelled() => return,
                connected = self.connect() => connected,
            };
            match connected {
                Ok(response) => {
                    failures = 0;
                    engine_info!("Connected to status feed {}", self.url);
                    sink.emit(EngineEvent::Feed(FeedEvent::Connected));
                    let outcome = self.pump(response, &cancel, sink).await;
                    if cancel.is_cancelled() {
                        return;
                    }
                    match outcome {
                        Ok(()) => engine_info!("Status feed closed by server"),
                        Err(err) => engine_warn!("Status feed interrupted: {}", err),
                    }
                    sink.emit(EngineEvent::Feed(FeedEvent::Disconnected));
                }
                Err(err) => {
                    failures += 1;
                    engine_warn!(
                        "Status feed connection error (attempt {}): {}",
                        failures,
                        err
                    );
                    sink.emit(EngineEvent::Feed(FeedEvent::ConnectFailed {
                        reason: err.to_string(),
                    }));
                    if failures > self.reconnect_attempts {
                        engine_warn!("Giving up on status feed after {} attempts", failures);
                        return;
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    async fn connect(&self) -> Result<Response, ServiceError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        Ok(response)
    }

    async fn pump(
        &self,
        response: Response,
        cancel: &CancellationToken,
        sink: &dyn EventSink,
    ) -> Result<(), ServiceError> {
        let mut parser = SseParser::new();
        let mut stream = response.bytes_stream();
        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                chunk = stream.next() => chunk,
            };
            match chunk {
                Some(Ok(bytes)) => {
                    for event in parser.feed(&bytes) {
                        dispatch(event, sink);
                    }
                }
                Some(Err(err)) => return Err(map_reqwest_error(err)),
                None => {
                    if let Some(event) = parser.finish() {
                        dispatch(event, sink);
                    }
                    return Ok(());
                }
            }
        }
    }
}

fn dispatch(event: SseEvent, sink: &dyn EventSink) {
    if event.event != STATUS_UPDATE_EVENT {
        engine_trace!("Ignoring feed event {}", event.event);
        return;
    }
    match serde_json::from_str::<StatusUpdate>(&event.data) {
        Ok(update) => sink.emit(EngineEvent::Feed(FeedEvent::Update(update))),
        Err(err) => engine_warn!("Malformed status_update event: {}", err),
    }
}
