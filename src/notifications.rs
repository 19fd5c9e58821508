use crate::types::constants::{
    ERROR_NOTIFICATION_DURATION, NOTIFICATION_DURATION, NOTIFICATION_REPLAY_WINDOW,
};
use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

/// Severity of a toast notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn default_title(self) -> &'static str {
        match self {
            Self::Info => "Information",
            Self::Success => "Success",
            Self::Warning => "Warning",
            Self::Error => "Error",
        }
    }

    fn default_duration(self) -> Duration {
        match self {
            Self::Error => ERROR_NOTIFICATION_DURATION,
            _ => NOTIFICATION_DURATION,
        }
    }
}

/// Session-unique notification id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationId(String);

impl NotificationId {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Optional action button attached to a notification.
#[derive(Clone)]
pub struct NotificationAction {
    pub label: String,
    pub callback: Arc<dyn Fn() + Send + Sync>,
}

impl NotificationAction {
    pub fn new(label: impl Into<String>, callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            callback: Arc::new(callback),
        }
    }
}

impl fmt::Debug for NotificationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// One tracked notification, owned by the [`NotificationCenter`] from creation
/// until removal.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Zero means the notification persists until explicitly removed.
    pub duration: Duration,
    pub action: Option<NotificationAction>,
    pub created_at: Instant,
}

/// Request to show a notification. Unset fields fall back to per-kind
/// defaults: title from [`NotificationKind::default_title`], duration 5s
/// (errors 8s).
#[derive(Debug, Clone, Default)]
pub struct NotificationSpec {
    kind: Option<NotificationKind>,
    title: Option<String>,
    message: String,
    duration: Option<Duration>,
    action: Option<NotificationAction>,
}

impl NotificationSpec {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn kind(mut self, kind: NotificationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn action(mut self, action: NotificationAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// Visual patch applied by [`NotificationCenter::update`]. Does not touch the
/// dismissal timer.
#[derive(Debug, Clone, Default)]
pub struct NotificationPatch {
    pub kind: Option<NotificationKind>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub action: Option<NotificationAction>,
}

/// Display collaborator. The center calls `render` when a notification should
/// become visible (again) and `evict` when it should leave the display.
pub trait NotificationRenderer: Send + Sync {
    fn render(&self, notification: &Notification);
    fn evict(&self, id: &NotificationId);
}

/// Default renderer that only logs, for headless use.
pub struct LogRenderer;

impl NotificationRenderer for LogRenderer {
    fn render(&self, notification: &Notification) {
        tracing::info!(
            id = %notification.id,
            kind = ?notification.kind,
            title = %notification.title,
            "{}",
            notification.message
        );
    }

    fn evict(&self, id: &NotificationId) {
        tracing::debug!(%id, "notification evicted");
    }
}

struct Entry {
    notification: Notification,
    dismiss: Option<JoinHandle<()>>,
}

/// Stateful queue of visible transient notifications.
///
/// Each notification with a non-zero duration owns its own dismissal task;
/// removing the notification aborts that task, and a stray timer firing after
/// removal is absorbed by the idempotence of [`remove`](Self::remove).
pub struct NotificationCenter {
    renderer: Arc<dyn NotificationRenderer>,
    entries: Mutex<Vec<Entry>>,
}

impl NotificationCenter {
    pub fn new(renderer: Arc<dyn NotificationRenderer>) -> Self {
        Self {
            renderer,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Creates, renders and schedules auto-dismissal of a notification.
    /// Returns its session-unique id.
    pub fn show(self: &Arc<Self>, spec: NotificationSpec) -> NotificationId {
        let id = NotificationId::generate();
        let kind = spec.kind.unwrap_or(NotificationKind::Info);
        let duration = spec.duration.unwrap_or_else(|| kind.default_duration());

        let notification = Notification {
            id: id.clone(),
            kind,
            title: spec
                .title
                .unwrap_or_else(|| kind.default_title().to_owned()),
            message: spec.message,
            duration,
            action: spec.action,
            created_at: Instant::now(),
        };

        let dismiss = (!duration.is_zero()).then(|| {
            let center = Arc::clone(self);
            let id = id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                center.remove(&id);
            })
        });

        self.lock().push(Entry {
            notification: notification.clone(),
            dismiss,
        });
        self.renderer.render(&notification);
        tracing::debug!(%id, ?kind, "notification shown");
        id
    }

    /// Removes a notification from the live list and the display. Idempotent:
    /// returns `false` when the id is already gone.
    pub fn remove(&self, id: &NotificationId) -> bool {
        let entry = {
            let mut entries = self.lock();
            entries
                .iter()
                .position(|e| &e.notification.id == id)
                .map(|index| entries.remove(index))
        };
        let Some(entry) = entry else {
            return false;
        };

        if let Some(handle) = entry.dismiss {
            handle.abort();
        }
        self.renderer.evict(id);
        true
    }

    /// Removes every tracked notification.
    pub fn remove_all(&self) {
        let drained: Vec<Entry> = self.lock().drain(..).collect();
        for entry in drained {
            if let Some(handle) = entry.dismiss {
                handle.abort();
            }
            self.renderer.evict(&entry.notification.id);
        }
    }

    /// Merges a patch into an existing notification and re-renders it.
    /// Unknown ids are a no-op.
    pub fn update(&self, id: &NotificationId, patch: NotificationPatch) -> bool {
        let updated = {
            let mut entries = self.lock();
            let Some(entry) = entries.iter_mut().find(|e| &e.notification.id == id) else {
                return false;
            };
            if let Some(kind) = patch.kind {
                entry.notification.kind = kind;
            }
            if let Some(title) = patch.title {
                entry.notification.title = title;
            }
            if let Some(message) = patch.message {
                entry.notification.message = message;
            }
            if let Some(action) = patch.action {
                entry.notification.action = Some(action);
            }
            entry.notification.clone()
        };

        self.renderer.evict(id);
        self.renderer.render(&updated);
        true
    }

    /// Re-renders notifications created within the replay window.
    ///
    /// Visibility-recovery operation: dismissal timers keep running while the
    /// page is hidden, but the display may have evicted the elements, so the
    /// still-live recent ones are replayed with their stable ids.
    pub fn replay_recent(&self) -> usize {
        let recent: Vec<Notification> = {
            self.lock()
                .iter()
                .filter(|e| e.notification.created_at.elapsed() < NOTIFICATION_REPLAY_WINDOW)
                .map(|e| e.notification.clone())
                .collect()
        };
        for notification in &recent {
            self.renderer.render(notification);
        }
        recent.len()
    }

    pub fn info(self: &Arc<Self>, message: impl Into<String>) -> NotificationId {
        self.show(NotificationSpec::new(message).kind(NotificationKind::Info))
    }

    pub fn success(self: &Arc<Self>, message: impl Into<String>) -> NotificationId {
        self.show(NotificationSpec::new(message).kind(NotificationKind::Success))
    }

    pub fn warning(self: &Arc<Self>, message: impl Into<String>) -> NotificationId {
        self.show(NotificationSpec::new(message).kind(NotificationKind::Warning))
    }

    pub fn error(self: &Arc<Self>, message: impl Into<String>) -> NotificationId {
        self.show(NotificationSpec::new(message).kind(NotificationKind::Error))
    }

    /// Ids of the currently tracked notifications, oldest first.
    pub fn active_ids(&self) -> Vec<NotificationId> {
        self.lock().iter().map(|e| e.notification.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
