use crate::core::errors::GeoLensError;
use crate::core::models::{
    prediction::{NewPrediction, Prediction, PredictionStats},
    user::{NewUser, User},
};
use async_trait::async_trait;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Fails with `UsernameTaken` / `EmailAlreadyRegistered` on a uniqueness clash.
    async fn create_user(&self, user: NewUser) -> Result<User, GeoLensError>;
    async fn get_user(&self, user_id: i64) -> Result<Option<User>, GeoLensError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, GeoLensError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, GeoLensError>;
    async fn update_password(&self, user_id: i64, password_hash: &str) -> Result<(), GeoLensError>;
    /// Fails with `UserNotFound` if the owning user does not exist.
    async fn save_prediction(&self, prediction: NewPrediction) -> Result<Prediction, GeoLensError>;
    /// Newest first; ties broken by id, newest first.
    async fn get_user_predictions(&self, user_id: i64, limit: Option<usize>) -> Result<Vec<Prediction>, GeoLensError>;
    async fn get_prediction_stats(&self, user_id: i64) -> Result<PredictionStats, GeoLensError>;
}

pub mod in_memory;
pub mod sqlite;
