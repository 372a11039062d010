use anyhow::Result;
use tracing::info;

use crate::db::{queries, DbPool};
use crate::models::notification::NotificationKind;

/// Stores a notification for the user. The web frontend picks these up,
/// the pipeline only ever appends.
pub async fn create(
    pool: &DbPool,
    user_id: i64,
    kind: NotificationKind,
    title: &str,
    content: &str,
) -> Result<()> {
    sqlx::query(queries::INSERT_NOTIFICATION)
        .bind(user_id)
        .bind(kind.as_i16())
        .bind(title)
        .bind(content)
        .execute(pool)
        .await?;
    info!("Notification for user {}: {}", user_id, title);
    Ok(())
}
