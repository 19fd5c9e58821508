use crate::charts::CategoryStats;
use crate::notifications::NotificationKind;
use serde::{Deserialize, Serialize};

/// Outbound actions, serialized with a `type` discriminator.
///
/// These are fire-and-forget signals: the transport drops them with an
/// explicit [`SendOutcome::NotConnected`](crate::client::SendOutcome) while
/// the connection is not open.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientAction {
    FlagSubmission { challenge_id: i64, flag: String },
    ChatMessage { message: String },
    GetTeamStatus,
    Ping,
}

impl ClientAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FlagSubmission { .. } => "flag_submission",
            Self::ChatMessage { .. } => "chat_message",
            Self::GetTeamStatus => "get_team_status",
            Self::Ping => "ping",
        }
    }
}

/// Payload of a `notification` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationFrame {
    pub notification: IncomingNotification,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingNotification {
    #[serde(default)]
    pub title: Option<String>,
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<NotificationKind>,
}

/// Payload of a `team_flag_submitted` frame. Points may be absent on
/// broadcast-only submissions; consumers treat that defensively.
#[derive(Debug, Clone, Deserialize)]
pub struct FlagSubmittedFrame {
    #[serde(default)]
    pub points: Option<i64>,
}

/// Payload of `user_connected` / `user_disconnected` frames.
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceFrame {
    pub connection_count: u64,
}

/// Payload of a `team_status` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamStatusFrame {
    pub status: TeamStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamStatus {
    #[serde(default)]
    pub category_stats: CategoryStats,
}
