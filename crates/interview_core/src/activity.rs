//! crates/interview_core/src/activity.rs
//!
//! Append-only audit trail for the admin dashboard.

use std::sync::Arc;
use tracing::warn;

use crate::domain::{ActivityEntry, ActivityKind};
use crate::error::InterviewResult;
use crate::ports::DatabaseService;

/// Largest page `recent` will return.
pub const MAX_RECENT: u32 = 50;

#[derive(Clone)]
pub struct ActivityLog {
    db: Arc<dyn DatabaseService>,
}

impl ActivityLog {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Appends an entry on a background task. Failures are logged and dropped,
    /// so the triggering operation never waits on or fails because of the log.
    pub fn record(&self, kind: ActivityKind, description: impl Into<String>) {
        let db = self.db.clone();
        let description = description.into();
        tokio::spawn(async move {
            if let Err(e) = db.append_activity(kind.as_str(), &description).await {
                warn!("Failed to record '{}' activity: {}", kind.as_str(), e);
            }
        });
    }

    /// Most recent entries first. `limit` is clamped to `1..=50`.
    pub async fn recent(&self, limit: u32) -> InterviewResult<Vec<ActivityEntry>> {
        let limit = limit.clamp(1, MAX_RECENT);
        Ok(self.db.recent_activity(limit).await?)
    }
}
