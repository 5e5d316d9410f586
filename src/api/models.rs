use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::core::errors::GeoLensError;
use crate::core::models::{
    land_use::LandUseClass,
    prediction::{Prediction, PredictionStats},
    user::UserSummary,
};
use crate::infrastructure::uploads::UploadStore;

// Request structs for JSON payloads. Fields are optional so that a missing
// field yields our own 400 message instead of a deserialisation rejection.
#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub username: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// JSON alternative to a multipart upload.
#[derive(Deserialize, ToSchema)]
pub struct PredictRequest {
    pub image_data: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Json<Self> {
        Json(MessageResponse {
            message: message.to_string(),
        })
    }
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserSummary,
}

#[derive(Serialize, ToSchema)]
pub struct ResetPasswordResponse {
    pub message: String,
    pub username: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserInfoResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

/// Confidence as a percentage rounded to two decimals.
pub fn as_percent(confidence: f64) -> f64 {
    (confidence * 10_000.0).round() / 100.0
}

#[derive(Serialize, ToSchema)]
pub struct PredictResponse {
    pub class: LandUseClass,
    pub description: String,
    pub confidence: f64,
    pub image_url: String,
    pub timestamp: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub probabilities: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryItem {
    pub image_name: String,
    pub predicted_class: LandUseClass,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub image_url: String,
    pub description: String,
}

impl From<Prediction> for HistoryItem {
    fn from(p: Prediction) -> Self {
        HistoryItem {
            image_url: UploadStore::url_for(&p.image_name),
            description: p.predicted_class.description().to_string(),
            confidence: as_percent(p.confidence),
            image_name: p.image_name,
            predicted_class: p.predicted_class,
            timestamp: p.timestamp,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub total_predictions: u64,
    /// Label to count, most frequent first.
    #[schema(value_type = Object)]
    pub class_distribution: serde_json::Map<String, serde_json::Value>,
}

impl From<PredictionStats> for StatsResponse {
    fn from(stats: PredictionStats) -> Self {
        let class_distribution = stats
            .class_distribution
            .iter()
            .map(|c| (c.class.label().to_string(), serde_json::Value::from(c.count)))
            .collect();
        StatsResponse {
            total_predictions: stats.total_predictions,
            class_distribution,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    pub total_predictions: u64,
    pub most_common_class: Option<LandUseClass>,
    pub active: bool,
    pub recent: Vec<HistoryItem>,
}

#[derive(Serialize, ToSchema)]
pub struct ClassInfo {
    pub index: usize,
    pub name: LandUseClass,
    pub description: String,
}

// Error response struct
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

// Newtype wrapper for GeoLensError to implement IntoResponse
pub struct ApiError(pub GeoLensError);

impl From<GeoLensError> for ApiError {
    fn from(err: GeoLensError) -> Self {
        ApiError(err)
    }
}

/// Maps an extractor rejection onto the error taxonomy, keeping its status where it matters.
pub fn rejection_error(status: StatusCode, message: String) -> GeoLensError {
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => GeoLensError::PayloadTooLarge,
        StatusCode::UNSUPPORTED_MEDIA_TYPE => GeoLensError::UnsupportedMediaType(message),
        _ => GeoLensError::MalformedRequest(message),
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(rejection_error(rejection.status(), rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(rejection_error(rejection.status(), rejection.body_text()))
    }
}

/// `Json` whose rejections use the `{"error": ...}` body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// `Query` whose rejections use the `{"error": ...}` body.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self.0 {
            GeoLensError::MissingFields(fields) => (StatusCode::BAD_REQUEST, format!("Required: {}", fields)),
            GeoLensError::InvalidInput(_, detail) => (StatusCode::BAD_REQUEST, detail.description),
            GeoLensError::InvalidEmail(_) => (StatusCode::BAD_REQUEST, "Invalid email address".to_string()),
            GeoLensError::PasswordTooShort(min) => (
                StatusCode::BAD_REQUEST,
                format!("Password must be at least {} characters", min),
            ),
            GeoLensError::UsernameTaken(_) => (StatusCode::BAD_REQUEST, "Username already taken".to_string()),
            GeoLensError::EmailAlreadyRegistered(_) => {
                (StatusCode::BAD_REQUEST, "Email address already in use".to_string())
            }
            GeoLensError::UserNotFound(_) => (StatusCode::NOT_FOUND, "Username not found".to_string()),
            GeoLensError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid username or password".to_string())
            }
            GeoLensError::IncorrectPassword => (StatusCode::UNAUTHORIZED, "Current password is incorrect".to_string()),
            GeoLensError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Authentication required".to_string()),
            GeoLensError::ResetDisabled => (
                StatusCode::FORBIDDEN,
                "Password reset by username is disabled".to_string(),
            ),
            GeoLensError::MalformedRequest(message) => (StatusCode::BAD_REQUEST, message),
            GeoLensError::UnsupportedMediaType(message) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, message),
            GeoLensError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string()),
            GeoLensError::MissingImage => (StatusCode::BAD_REQUEST, "No image provided".to_string()),
            GeoLensError::EmptyFilename => (StatusCode::BAD_REQUEST, "No file selected".to_string()),
            GeoLensError::UnsupportedImageFormat(ext) => (
                StatusCode::BAD_REQUEST,
                format!("Unsupported image format `{}`; use PNG or JPEG", ext),
            ),
            GeoLensError::InvalidImage(_) => (StatusCode::BAD_REQUEST, "Invalid image".to_string()),
            err @ (GeoLensError::ModelLoad(_) | GeoLensError::ModelUnavailable | GeoLensError::InferenceFailed(_)) => {
                error!("Prediction failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Prediction failed".to_string())
            }
            err @ GeoLensError::UploadError(_) => {
                error!("{}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to process image".to_string())
            }
            err @ (GeoLensError::DatabaseError(_)
            | GeoLensError::LoggingError(_)
            | GeoLensError::InvalidConfig(_)
            | GeoLensError::InternalServerError(_)) => {
                error!("{}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };
        (status, Json(ErrorResponse { error: error_message })).into_response()
    }
}
