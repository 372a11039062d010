use tracing::info;
use uuid::Uuid;

/// Receives cumulative progress updates while an import's points are being
/// written. The web layer subscribes a websocket broadcaster here, the
/// worker binary just logs. Implementations must be `Send + Sync` so they
/// can be shared across spawned tasks.
pub trait ProgressBroadcaster: Send + Sync {
    /// Called after each persisted batch with the number of candidate
    /// points processed so far.
    fn report(&self, import_id: Uuid, processed: u64);
}

/// Logs progress through tracing.
pub struct LogProgress;

impl ProgressBroadcaster for LogProgress {
    fn report(&self, import_id: Uuid, processed: u64) {
        info!("Import {} progress: {} points processed", import_id, processed);
    }
}

/// Ignores all progress updates. Used for live tracker submissions and in
/// tests.
pub struct NullProgress;

impl ProgressBroadcaster for NullProgress {
    fn report(&self, _import_id: Uuid, _processed: u64) {}
}
