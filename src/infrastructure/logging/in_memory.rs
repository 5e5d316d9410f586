use crate::constants::constants::MAX_ACTIVITY_ENTRIES;
use crate::core::errors::GeoLensError;
use crate::core::models::activity::ActivityEntry;
use crate::infrastructure::logging::LoggingService;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Bounded activity log; once full, the oldest entries are dropped.
#[derive(Clone)]
pub struct InMemoryLogging {
    logs: Arc<RwLock<VecDeque<ActivityEntry>>>,
    capacity: usize,
}

impl InMemoryLogging {
    pub fn new() -> Self {
        Self::with_capacity(MAX_ACTIVITY_ENTRIES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        InMemoryLogging {
            logs: Arc::new(RwLock::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }
}

impl Default for InMemoryLogging {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoggingService for InMemoryLogging {
    async fn log_action(
        &self,
        action: &str,
        details: serde_json::Value,
        user_id: Option<i64>,
    ) -> Result<(), GeoLensError> {
        let details = serde_json::from_value(details)
            .map_err(|e| GeoLensError::LoggingError(format!("Failed to serialize log details: {}", e)))?;
        let mut logs = self.logs.write().await;
        while logs.len() >= self.capacity {
            logs.pop_front();
        }
        logs.push_back(ActivityEntry {
            id: Uuid::new_v4().to_string(),
            action: action.to_string(),
            user_id,
            details,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    async fn get_user_logs(&self, user_id: i64) -> Result<Vec<ActivityEntry>, GeoLensError> {
        let logs = self.logs.read().await;
        Ok(logs.iter().rev().filter(|l| l.user_id == Some(user_id)).cloned().collect())
    }
}
