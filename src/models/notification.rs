use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Stored as SMALLINT in `notifications.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info = 0,
    Error = 1,
}

impl NotificationKind {
    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: i16,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
