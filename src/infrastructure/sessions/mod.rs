pub mod in_memory;

use crate::core::errors::GeoLensError;
use crate::core::models::session::Session;
use async_trait::async_trait;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_session(&self, session: Session) -> Result<(), GeoLensError>;
    /// Returns `None` for unknown or expired sessions.
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, GeoLensError>;
    async fn delete_session(&self, session_id: &str) -> Result<(), GeoLensError>;
    async fn delete_user_sessions(&self, user_id: i64) -> Result<(), GeoLensError>;
}
