use crate::core::errors::GeoLensError;
use crate::core::models::session::Session;
use crate::infrastructure::sessions::SessionStore;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct InMemorySessions {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessions {
    pub fn new() -> Self {
        InMemorySessions {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySessions {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessions {
    async fn save_session(&self, session: Session) -> Result<(), GeoLensError> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        sessions.retain(|_, s| !s.is_expired(now));
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, GeoLensError> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(session_id) {
                None => return Ok(None),
                Some(session) if !session.is_expired(now) => return Ok(Some(session.clone())),
                Some(_) => {}
            }
        }
        self.sessions.write().await.remove(session_id);
        Ok(None)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), GeoLensError> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: i64) -> Result<(), GeoLensError> {
        self.sessions.write().await.retain(|_, s| s.user_id != user_id);
        Ok(())
    }
}
