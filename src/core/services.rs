use crate::auth::jwt::JwtService;
use crate::auth::password::{hash_password, verify_password};
use crate::constants::constants::{
    ADMIN_USERNAME, MAX_EMAIL_LENGTH, MAX_SESSION_TTL_SECS, MAX_USERNAME_LENGTH, MIN_PASSWORD_LENGTH, PASSWORD_CHANGED, PASSWORD_RESET,
    PREDICTION_CREATED, RECENT_PREDICTIONS, USER_LOGGED_IN, USER_LOGGED_OUT, USER_REGISTERED,
};
use crate::core::errors::{FieldError, GeoLensError};
use crate::core::models::{
    activity::ActivityEntry,
    land_use::LandUseClass,
    prediction::{NewPrediction, Prediction, PredictionStats},
    session::Session,
    user::{NewUser, User, UserSummary},
};
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::model::{Classification, Classifier};
use crate::infrastructure::sessions::SessionStore;
use crate::infrastructure::storage::Storage;
use crate::infrastructure::uploads::{PendingImage, UploadStore};
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is a valid regex")
});

/// Knobs the service takes from the process configuration.
#[derive(Clone, Debug)]
pub struct ServiceSettings {
    pub session_ttl: Duration,
    pub bcrypt_cost: u32,
    pub allow_unverified_reset: bool,
}

impl ServiceSettings {
    /// Session lifetime from a configured number of seconds; must be positive and at most a year.
    pub fn session_ttl_from_secs(secs: i64) -> Result<Duration, GeoLensError> {
        if secs <= 0 || secs > MAX_SESSION_TTL_SECS {
            return Err(GeoLensError::InvalidConfig(format!(
                "SESSION_TTL_SECS must be between 1 and {}, got {}",
                MAX_SESSION_TTL_SECS, secs
            )));
        }
        Duration::try_seconds(secs)
            .ok_or_else(|| GeoLensError::InvalidConfig(format!("SESSION_TTL_SECS out of range: {}", secs)))
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        ServiceSettings {
            session_ttl: Duration::seconds(3600),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            allow_unverified_reset: false,
        }
    }
}

/// An image as it arrives at the predict endpoint.
pub enum ImageUpload {
    File { file_name: String, bytes: Vec<u8> },
    Base64(String),
}

#[derive(Clone, Debug)]
pub struct LoginOutcome {
    pub token: String,
    pub user: UserSummary,
    pub session: Session,
}

#[derive(Clone, Debug)]
pub struct PredictionOutcome {
    pub prediction: Prediction,
    pub classification: Classification,
}

#[derive(Serialize, Deserialize, Debug, ToSchema, Clone)]
pub struct DashboardSummary {
    pub total_predictions: u64,
    pub most_common_class: Option<LandUseClass>,
    pub active: bool,
    pub recent: Vec<Prediction>,
}

pub struct GeoLensService<L: LoggingService, S: Storage, C: SessionStore> {
    storage: S,
    logging: L,
    sessions: C,
    classifier: Arc<dyn Classifier>,
    uploads: UploadStore,
    jwt_service: JwtService,
    settings: ServiceSettings,
}

impl<L: LoggingService, S: Storage, C: SessionStore> GeoLensService<L, S, C> {
    pub fn new(
        storage: S,
        logging: L,
        sessions: C,
        classifier: Arc<dyn Classifier>,
        uploads: UploadStore,
        jwt_secret: String,
        settings: ServiceSettings,
    ) -> Self {
        GeoLensService {
            storage,
            logging,
            sessions,
            classifier,
            uploads,
            jwt_service: JwtService::new(jwt_secret),
            settings,
        }
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    async fn record(&self, action: &str, details: serde_json::Value, user_id: Option<i64>) -> Result<(), GeoLensError> {
        info!(action, user_id, "Recorded activity");
        debug!(action, user_id, %details, "Activity details");
        self.logging.log_action(action, details, user_id).await
    }

    fn validate_string_input(&self, field: &str, value: &str, max_length: usize) -> Result<(), GeoLensError> {
        if value.trim().is_empty() {
            return Err(GeoLensError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: format!("Invalid {}", field),
                    description: format!("{} cannot be empty", field),
                },
            ));
        }
        if value.chars().count() > max_length {
            return Err(GeoLensError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: format!("{} Too Long", field),
                    description: format!("{} cannot exceed {} characters", field, max_length),
                },
            ));
        }
        if value.chars().any(|c| c.is_control()) {
            return Err(GeoLensError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: format!("Invalid {}", field),
                    description: format!("{} contains invalid characters", field),
                },
            ));
        }
        Ok(())
    }

    fn validate_password(&self, password: &str) -> Result<(), GeoLensError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(GeoLensError::PasswordTooShort(MIN_PASSWORD_LENGTH));
        }
        Ok(())
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User, GeoLensError> {
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(GeoLensError::MissingFields("username, email and password".to_string()));
        }
        self.validate_password(password)?;
        if email.len() > MAX_EMAIL_LENGTH || !EMAIL_RE.is_match(email) {
            return Err(GeoLensError::InvalidEmail(email.to_string()));
        }
        self.validate_string_input("username", username, MAX_USERNAME_LENGTH)?;

        if self.storage.get_user_by_username(username).await?.is_some() {
            return Err(GeoLensError::UsernameTaken(username.to_string()));
        }
        if self.storage.get_user_by_email(email).await?.is_some() {
            return Err(GeoLensError::EmailAlreadyRegistered(email.to_string()));
        }

        let user = self
            .storage
            .create_user(NewUser {
                username: username.to_string(),
                email: Some(email.to_string()),
                password_hash: hash_password(password, self.settings.bcrypt_cost)?,
                created_at: Utc::now(),
            })
            .await?;

        self.record(
            USER_REGISTERED,
            json!({ "username": user.username, "email": user.email }),
            Some(user.id),
        )
        .await?;
        Ok(user)
    }

    /// Creates the `admin` account if it is missing. Returns whether it was created.
    pub async fn seed_admin(&self, password: &str) -> Result<bool, GeoLensError> {
        if self.storage.get_user_by_username(ADMIN_USERNAME).await?.is_some() {
            return Ok(false);
        }
        self.validate_password(password)?;
        let admin = self
            .storage
            .create_user(NewUser {
                username: ADMIN_USERNAME.to_string(),
                email: None,
                password_hash: hash_password(password, self.settings.bcrypt_cost)?,
                created_at: Utc::now(),
            })
            .await?;
        self.record(USER_REGISTERED, json!({ "username": admin.username, "seeded": true }), Some(admin.id))
            .await?;
        Ok(true)
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<LoginOutcome, GeoLensError> {
        if username.is_empty() || password.is_empty() {
            return Err(GeoLensError::MissingFields("username and password".to_string()));
        }
        let user = match self.storage.get_user_by_username(username).await? {
            Some(user) if verify_password(password, &user.password_hash)? => user,
            _ => {
                warn!(username, "Rejected login attempt");
                return Err(GeoLensError::InvalidCredentials);
            }
        };

        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id,
            username: user.username.clone(),
            expires_at: Utc::now() + self.settings.session_ttl,
        };
        let token = self
            .jwt_service
            .generate_token(user.id, &session.id, session.expires_at.timestamp())?;
        self.sessions.save_session(session.clone()).await?;

        self.record(USER_LOGGED_IN, json!({ "username": user.username }), Some(user.id))
            .await?;
        Ok(LoginOutcome {
            token,
            user: UserSummary::from(&user),
            session,
        })
    }

    /// Maps a bearer token to its live session.
    pub async fn resolve_session(&self, token: &str) -> Result<Session, GeoLensError> {
        let claims = self.jwt_service.validate_token(token)?;
        let session = self
            .sessions
            .get_session(&claims.sid)
            .await?
            .ok_or_else(|| GeoLensError::Unauthorized("Session expired or logged out".to_string()))?;
        if session.user_id.to_string() != claims.sub {
            return Err(GeoLensError::Unauthorized("Token does not match session".to_string()));
        }
        Ok(session)
    }

    pub async fn logout(&self, session: &Session) -> Result<(), GeoLensError> {
        self.sessions.delete_session(&session.id).await?;
        self.record(USER_LOGGED_OUT, json!({ "username": session.username }), Some(session.user_id))
            .await
    }

    pub async fn reset_password_by_username(&self, username: &str, new_password: &str) -> Result<(), GeoLensError> {
        if !self.settings.allow_unverified_reset {
            return Err(GeoLensError::ResetDisabled);
        }
        if username.is_empty() || new_password.is_empty() {
            return Err(GeoLensError::MissingFields("username and new_password".to_string()));
        }
        self.validate_password(new_password)?;
        let user = self
            .storage
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| GeoLensError::UserNotFound(username.to_string()))?;

        self.storage
            .update_password(user.id, &hash_password(new_password, self.settings.bcrypt_cost)?)
            .await?;
        self.sessions.delete_user_sessions(user.id).await?;
        self.record(PASSWORD_RESET, json!({ "username": user.username }), Some(user.id))
            .await
    }

    pub async fn change_password(
        &self,
        session: &Session,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), GeoLensError> {
        if current_password.is_empty() || new_password.is_empty() {
            return Err(GeoLensError::MissingFields("current_password and new_password".to_string()));
        }
        let user = self
            .storage
            .get_user(session.user_id)
            .await?
            .ok_or_else(|| GeoLensError::UserNotFound(session.user_id.to_string()))?;
        if !verify_password(current_password, &user.password_hash)? {
            return Err(GeoLensError::IncorrectPassword);
        }
        self.validate_password(new_password)?;
        self.storage
            .update_password(user.id, &hash_password(new_password, self.settings.bcrypt_cost)?)
            .await?;
        self.record(PASSWORD_CHANGED, json!({ "username": user.username }), Some(user.id))
            .await
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>, GeoLensError> {
        self.storage.get_user(user_id).await
    }

    /// Classifies the upload, then stores it and appends the result to the prediction log.
    pub async fn predict(&self, session: &Session, upload: ImageUpload) -> Result<PredictionOutcome, GeoLensError> {
        let PendingImage { name, image, encoded } = match upload {
            ImageUpload::File { file_name, bytes } => self.uploads.prepare_file(&file_name, bytes).await?,
            ImageUpload::Base64(payload) => self.uploads.prepare_base64(&payload).await?,
        };

        let classifier = Arc::clone(&self.classifier);
        let classification = tokio::task::spawn_blocking(move || classifier.classify(&image))
            .await
            .map_err(|e| GeoLensError::InferenceFailed(format!("Inference task failed: {}", e)))??;

        // Only classified images reach the upload directory.
        self.uploads.store(&name, &encoded).await?;
        let saved = self
            .storage
            .save_prediction(NewPrediction {
                user_id: session.user_id,
                image_name: name.clone(),
                predicted_class: classification.class,
                confidence: f64::from(classification.confidence),
                timestamp: Utc::now(),
            })
            .await;
        let prediction = match saved {
            Ok(prediction) => prediction,
            Err(e) => {
                if let Err(cleanup) = self.uploads.remove(&name).await {
                    error!("Failed to discard unrecorded upload: {}", cleanup);
                }
                return Err(e);
            }
        };

        self.record(
            PREDICTION_CREATED,
            json!({
                "prediction_id": prediction.id,
                "image_name": prediction.image_name,
                "predicted_class": prediction.predicted_class,
                "confidence": prediction.confidence,
            }),
            Some(session.user_id),
        )
        .await?;
        Ok(PredictionOutcome {
            prediction,
            classification,
        })
    }

    pub async fn get_history(&self, user_id: i64, limit: Option<usize>) -> Result<Vec<Prediction>, GeoLensError> {
        self.storage.get_user_predictions(user_id, limit).await
    }

    pub async fn get_stats(&self, user_id: i64) -> Result<PredictionStats, GeoLensError> {
        self.storage.get_prediction_stats(user_id).await
    }

    pub async fn get_dashboard(&self, user_id: i64) -> Result<DashboardSummary, GeoLensError> {
        let (stats, recent) = futures::future::try_join(
            self.storage.get_prediction_stats(user_id),
            self.storage.get_user_predictions(user_id, Some(RECENT_PREDICTIONS)),
        )
        .await?;
        Ok(DashboardSummary {
            total_predictions: stats.total_predictions,
            most_common_class: stats.most_common(),
            active: stats.total_predictions > 0,
            recent,
        })
    }

    pub async fn get_activity(&self, user_id: i64) -> Result<Vec<ActivityEntry>, GeoLensError> {
        self.logging.get_user_logs(user_id).await
    }
}
