use std::sync::Arc;
use std::time::Duration;

use engine_logging::engine_debug;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::sink::EventSink;
use crate::{CrawlService, EngineEvent, TaskId};

const MIN_PERIOD: Duration = Duration::from_millis(10);

/// Polls `/status` for one task every `period` until cancelled. The first
/// request goes out one period after start; requests never overlap.
pub async fn run_poller(
    service: Arc<dyn CrawlService>,
    task_id: TaskId,
    period: Duration,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
) {
    let period = period.max(MIN_PERIOD);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = service.status(&task_id) => result,
        };
        sink.emit(EngineEvent::StatusPolled {
            task_id: task_id.clone(),
            result,
        });
    }
    engine_debug!("Status poller for task {} stopped", task_id);
}
