//! Progress event bus: fan-out of pipeline progress to live observers.
//!
//! The bus holds no backlog. A subscriber that connects after an event was
//! published never sees it, and a subscriber that stops reading only loses
//! its own messages.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Pipeline step a progress event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStep {
    Queued,
    Metadata,
    Transcript,
    Summarizing,
    Done,
    Error,
}

impl ProgressStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStep::Queued => "queued",
            ProgressStep::Metadata => "metadata",
            ProgressStep::Transcript => "transcript",
            ProgressStep::Summarizing => "summarizing",
            ProgressStep::Done => "done",
            ProgressStep::Error => "error",
        }
    }
}

/// Transient notification describing a job's current pipeline step.
/// Broadcast once, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: String,
    pub video_title: String,
    pub step: ProgressStep,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(
        job_id: impl Into<String>,
        video_title: impl Into<String>,
        step: ProgressStep,
        message: impl Into<String>,
    ) -> Self {
        ProgressEvent {
            job_id: job_id.into(),
            video_title: video_title.into(),
            step,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// What a subscriber receives: a real progress event, or a synthetic
/// keep-alive marker so idle connections are not reaped by intermediaries.
/// Transports render keep-alives as heartbeat/comment frames.
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    Event(ProgressEvent),
    KeepAlive,
}

/// In-process broadcaster. Cloning shares the underlying channel; dropping a
/// receiver is the unsubscribe.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BusMessage>,
}

impl EventBus {
    pub const KEEPALIVE_PERIOD: Duration = Duration::from_secs(15);

    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        EventBus { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.tx.subscribe()
    }

    /// Delivers to every currently-registered subscriber. A send error only
    /// means nobody is listening, which is fine for a fire-and-forget bus.
    pub fn publish(&self, event: ProgressEvent) {
        let _ = self.tx.send(BusMessage::Event(event));
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Spawns a task that pushes a keep-alive marker every `period`.
    /// Runs until the returned handle is aborted.
    pub fn spawn_keepalive(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let _ = tx.send(BusMessage::KeepAlive);
            }
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(step: ProgressStep, message: &str) -> ProgressEvent {
        ProgressEvent::new("job_1", "Some Video", step, message)
    }

    #[tokio::test]
    async fn delivers_to_all_subscribers() {
        let bus = EventBus::default();
        let mut rx_a = bus.subscribe();
        let mut rx_b = bus.subscribe();

        bus.publish(event(ProgressStep::Queued, "In Warteschlange..."));

        for rx in [&mut rx_a, &mut rx_b] {
            let BusMessage::Event(got) = rx.recv().await.unwrap() else {
                panic!("expected an event");
            };
            assert_eq!(got.step, ProgressStep::Queued);
            assert_eq!(got.job_id, "job_1");
        }
    }

    #[tokio::test]
    async fn late_subscriber_gets_no_backlog() {
        let bus = EventBus::default();
        bus.publish(event(ProgressStep::Metadata, "early"));

        let mut rx = bus.subscribe();
        bus.publish(event(ProgressStep::Done, "Fertig!"));

        let BusMessage::Event(got) = rx.recv().await.unwrap() else {
            panic!("expected an event");
        };
        assert_eq!(got.step, ProgressStep::Done);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(event(ProgressStep::Error, "nobody listening"));
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_markers_are_pushed_periodically() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let handle = bus.spawn_keepalive(Duration::from_secs(15));

        tokio::time::sleep(Duration::from_secs(31)).await;
        handle.abort();

        let mut keepalives = 0;
        while let Ok(msg) = rx.try_recv() {
            assert_eq!(msg, BusMessage::KeepAlive);
            keepalives += 1;
        }
        assert_eq!(keepalives, 2);
    }

    #[test]
    fn step_serializes_lowercase() {
        let json = serde_json::to_string(&ProgressStep::Summarizing).unwrap();
        assert_eq!(json, r#""summarizing""#);
    }
}
