use crate::core::errors::GeoLensError;
use crate::core::models::{
    land_use::LandUseClass,
    prediction::{ClassCount, NewPrediction, Prediction, PredictionStats},
    user::{NewUser, User},
};
use crate::infrastructure::storage::Storage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct InMemoryStorage {
    users: Arc<RwLock<HashMap<i64, User>>>,
    predictions: Arc<RwLock<Vec<Prediction>>>,
    next_user_id: Arc<AtomicI64>,
    next_prediction_id: Arc<AtomicI64>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage {
            users: Arc::new(RwLock::new(HashMap::new())),
            predictions: Arc::new(RwLock::new(Vec::new())),
            next_user_id: Arc::new(AtomicI64::new(1)),
            next_prediction_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_user(&self, user: NewUser) -> Result<User, GeoLensError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(GeoLensError::UsernameTaken(user.username));
        }
        if let Some(email) = &user.email {
            if users.values().any(|u| u.email.as_deref() == Some(email.as_str())) {
                return Err(GeoLensError::EmailAlreadyRegistered(email.clone()));
            }
        }
        let created = User {
            id: self.next_user_id.fetch_add(1, Ordering::SeqCst),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: user.created_at,
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>, GeoLensError> {
        let users = self.users.read().await;
        Ok(users.get(&user_id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, GeoLensError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, GeoLensError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email.as_deref() == Some(email)).cloned())
    }

    async fn update_password(&self, user_id: i64, password_hash: &str) -> Result<(), GeoLensError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| GeoLensError::UserNotFound(user_id.to_string()))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn save_prediction(&self, prediction: NewPrediction) -> Result<Prediction, GeoLensError> {
        // Held until the push so the owner cannot vanish in between. Lock order: users, then predictions.
        let users = self.users.read().await;
        if !users.contains_key(&prediction.user_id) {
            return Err(GeoLensError::UserNotFound(prediction.user_id.to_string()));
        }
        let saved = Prediction {
            id: self.next_prediction_id.fetch_add(1, Ordering::SeqCst),
            user_id: prediction.user_id,
            image_name: prediction.image_name,
            predicted_class: prediction.predicted_class,
            confidence: prediction.confidence,
            timestamp: prediction.timestamp,
        };
        self.predictions.write().await.push(saved.clone());
        drop(users);
        Ok(saved)
    }

    async fn get_user_predictions(&self, user_id: i64, limit: Option<usize>) -> Result<Vec<Prediction>, GeoLensError> {
        let predictions = self.predictions.read().await;
        let mut owned: Vec<Prediction> = predictions.iter().filter(|p| p.user_id == user_id).cloned().collect();
        owned.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        if let Some(limit) = limit {
            owned.truncate(limit);
        }
        Ok(owned)
    }

    async fn get_prediction_stats(&self, user_id: i64) -> Result<PredictionStats, GeoLensError> {
        let predictions = self.predictions.read().await;
        let mut counts: HashMap<LandUseClass, u64> = HashMap::new();
        for prediction in predictions.iter().filter(|p| p.user_id == user_id) {
            *counts.entry(prediction.predicted_class).or_default() += 1;
        }
        Ok(PredictionStats::from_counts(
            counts
                .into_iter()
                .map(|(class, count)| ClassCount { class, count })
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn new_prediction(user_id: i64) -> NewPrediction {
        NewPrediction {
            user_id,
            image_name: "tile.png".to_string(),
            predicted_class: LandUseClass::Forest,
            confidence: 0.9,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn predictions_need_an_owner() {
        let storage = InMemoryStorage::new();
        let result = storage.save_prediction(new_prediction(7)).await;
        assert!(matches!(result, Err(GeoLensError::UserNotFound(_))));
        assert!(storage.get_user_predictions(7, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_saves_get_distinct_ids() {
        let storage = InMemoryStorage::new();
        let user = storage
            .create_user(NewUser {
                username: "alice".to_string(),
                email: None,
                password_hash: "hash".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let storage = storage.clone();
                tokio::spawn(async move { storage.save_prediction(new_prediction(user.id)).await })
            })
            .collect();
        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap().id);
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 20);
        assert_eq!(storage.get_prediction_stats(user.id).await.unwrap().total_predictions, 20);
    }
}
