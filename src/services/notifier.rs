//! Fire-and-forget notifications about room lifecycle events.

use tracing::info;

use crate::state::{
    round::FinishReason,
    session::{CloseReason, TeamId},
};

/// Room lifecycle event handed to a [`NotificationSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A room was opened.
    RoomCreated { room_code: String, host_name: String },
    /// A round was committed.
    RoundFinished {
        room_code: String,
        team_id: TeamId,
        round_score: u32,
        reason: FinishReason,
    },
    /// A room was torn down.
    RoomClosed { room_code: String, reason: CloseReason },
}

/// Receiver of [`Notification`]s. Implementations must not block.
pub trait NotificationSink: Send + Sync {
    /// Handle one notification.
    fn notify(&self, notification: Notification);
}

/// [`NotificationSink`] that writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification {
            Notification::RoomCreated {
                room_code,
                host_name,
            } => info!(room = %room_code, host = %host_name, "notify: room created"),
            Notification::RoundFinished {
                room_code,
                team_id,
                round_score,
                reason,
            } => info!(
                room = %room_code,
                team = %team_id,
                round_score,
                reason = ?reason,
                "notify: round finished"
            ),
            Notification::RoomClosed { room_code, reason } => {
                info!(room = %room_code, reason = ?reason, "notify: room closed")
            }
        }
    }
}
