pub mod in_memory;

use crate::core::errors::GeoLensError;
use crate::core::models::activity::ActivityEntry;
use async_trait::async_trait;

#[async_trait]
pub trait LoggingService: Send + Sync {
    async fn log_action(
        &self,
        action: &str,
        details: serde_json::Value,
        user_id: Option<i64>,
    ) -> Result<(), GeoLensError>;
    /// Entries for one user, newest first.
    async fn get_user_logs(&self, user_id: i64) -> Result<Vec<ActivityEntry>, GeoLensError>;
}
