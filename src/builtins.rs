//! Default consumers for the well-known server event types.
//!
//! These are ordinary registry subscribers installed at client construction,
//! so a frame of a built-in type fires them and any page-specific subscribers
//! through the same dispatch. Payload reads are defensive: a bad payload is
//! logged and skipped by that consumer alone.

use crate::charts::ChartFeed;
use crate::messaging::registry::EventRegistry;
use crate::messaging::{FlagSubmittedFrame, NotificationFrame, PresenceFrame, TeamStatusFrame};
use crate::notifications::{NotificationCenter, NotificationKind, NotificationSpec};
use crate::types::constants::server_events;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Running team score, advanced by `team_flag_submitted` frames.
#[derive(Debug, Default)]
pub struct TeamScore(AtomicI64);

impl TeamScore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, points: i64) {
        self.0.fetch_add(points, Ordering::Relaxed);
    }

    pub fn total(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Online-user counter, set from presence frames.
#[derive(Debug, Default)]
pub struct PresenceCounter(AtomicU64);

impl PresenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, count: u64) {
        self.0.store(count, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

fn parse_frame<T: DeserializeOwned>(event: &'static str, value: &Value) -> Option<T> {
    match serde_json::from_value(value.clone()) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::warn!(event, "ignoring frame with unusable payload: {}", e);
            None
        }
    }
}

pub(crate) fn register(
    registry: &EventRegistry,
    score: &Arc<TeamScore>,
    presence: &Arc<PresenceCounter>,
    notifications: &Arc<NotificationCenter>,
    charts: &Arc<ChartFeed>,
) {
    {
        let score = Arc::clone(score);
        let charts = Arc::clone(charts);
        registry.on(server_events::TEAM_FLAG_SUBMITTED, move |value| {
            let Some(frame) =
                parse_frame::<FlagSubmittedFrame>(server_events::TEAM_FLAG_SUBMITTED, value)
            else {
                return;
            };
            if let Some(points) = frame.points {
                score.add(points);
            }
            charts.record_submission(frame.points);
        });
    }

    {
        let notifications = Arc::clone(notifications);
        registry.on(server_events::NOTIFICATION, move |value| {
            let Some(frame) = parse_frame::<NotificationFrame>(server_events::NOTIFICATION, value)
            else {
                return;
            };
            let incoming = frame.notification;
            let mut spec = NotificationSpec::new(incoming.message)
                .kind(incoming.kind.unwrap_or(NotificationKind::Info));
            if let Some(title) = incoming.title {
                spec = spec.title(title);
            }
            notifications.show(spec);
        });
    }

    for event in [server_events::USER_CONNECTED, server_events::USER_DISCONNECTED] {
        let presence = Arc::clone(presence);
        registry.on(event, move |value| {
            if let Some(frame) = parse_frame::<PresenceFrame>(event, value) {
                presence.set(frame.connection_count);
            }
        });
    }

    {
        let charts = Arc::clone(charts);
        registry.on(server_events::TEAM_STATUS, move |value| {
            if let Some(frame) = parse_frame::<TeamStatusFrame>(server_events::TEAM_STATUS, value) {
                charts.set_category_stats(frame.status.category_stats);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::MessageRouter;
    use crate::notifications::LogRenderer;
    use std::sync::Mutex;

    struct Fixture {
        registry: Arc<EventRegistry>,
        router: MessageRouter,
        score: Arc<TeamScore>,
        presence: Arc<PresenceCounter>,
        notifications: Arc<NotificationCenter>,
        charts: Arc<ChartFeed>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(EventRegistry::new());
        let score = Arc::new(TeamScore::new());
        let presence = Arc::new(PresenceCounter::new());
        let notifications = Arc::new(NotificationCenter::new(Arc::new(LogRenderer)));
        let charts = Arc::new(ChartFeed::new());
        register(&registry, &score, &presence, &notifications, &charts);
        Fixture {
            router: MessageRouter::new(Arc::clone(&registry)),
            registry,
            score,
            presence,
            notifications,
            charts,
        }
    }

    #[tokio::test]
    async fn flag_submission_reaches_builtin_and_external_subscribers() {
        let fx = fixture();
        let first = Arc::new(Mutex::new(0));
        let second = Arc::new(Mutex::new(0));
        for counter in [&first, &second] {
            let counter = Arc::clone(counter);
            fx.registry.on(server_events::TEAM_FLAG_SUBMITTED, move |_| {
                *counter.lock().unwrap() += 1;
            });
        }

        fx.router
            .handle_frame("{\"type\":\"team_flag_submitted\",\"points\":300}")
            .unwrap();

        // One frame, three effects: two external subscribers and the
        // built-in score update.
        assert_eq!(*first.lock().unwrap(), 1);
        assert_eq!(*second.lock().unwrap(), 1);
        assert_eq!(fx.score.total(), 300);
        assert_eq!(fx.charts.score_progression().len(), 1);
        assert_eq!(fx.charts.submission_timeline().len(), 1);
    }

    #[tokio::test]
    async fn notification_frames_feed_the_queue() {
        let fx = fixture();
        fx.router
            .handle_frame(
                "{\"type\":\"notification\",\"notification\":{\"title\":\"First blood\",\"message\":\"web-100 solved\",\"type\":\"success\"}}",
            )
            .unwrap();
        assert_eq!(fx.notifications.len(), 1);
    }

    #[tokio::test]
    async fn presence_frames_set_the_online_count() {
        let fx = fixture();
        fx.router
            .handle_frame("{\"type\":\"user_connected\",\"connection_count\":17}")
            .unwrap();
        assert_eq!(fx.presence.count(), 17);

        fx.router
            .handle_frame("{\"type\":\"user_disconnected\",\"connection_count\":16}")
            .unwrap();
        assert_eq!(fx.presence.count(), 16);
    }

    #[tokio::test]
    async fn team_status_updates_category_distribution() {
        let fx = fixture();
        fx.router
            .handle_frame(
                "{\"type\":\"team_status\",\"status\":{\"category_stats\":{\"crypto\":4,\"misc\":1}}}",
            )
            .unwrap();
        let stats = fx.charts.category_distribution();
        assert_eq!(stats.crypto, 4);
        assert_eq!(stats.misc, 1);
    }

    #[tokio::test]
    async fn unusable_payloads_skip_only_the_builtin() {
        let fx = fixture();
        let seen = Arc::new(Mutex::new(0));
        {
            let seen = Arc::clone(&seen);
            fx.registry.on(server_events::USER_CONNECTED, move |_| {
                *seen.lock().unwrap() += 1;
            });
        }

        fx.router
            .handle_frame("{\"type\":\"user_connected\",\"connection_count\":\"many\"}")
            .unwrap();
        assert_eq!(fx.presence.count(), 0);
        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
