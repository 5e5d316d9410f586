use crate::{
    api::models::*,
    core::{
        errors::GeoLensError,
        models::{activity::ActivityEntry, land_use::LandUseClass, session::Session, user::UserSummary},
        services::{GeoLensService, ImageUpload},
    },
    infrastructure::{
        logging::in_memory::InMemoryLogging, sessions::in_memory::InMemorySessions, storage::sqlite::SqliteStorage,
        uploads::UploadStore,
    },
};
use axum::{
    Extension, Json, Router,
    extract::{FromRequest, Multipart, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post},
};
use http::header;

use std::sync::Arc;

pub type AppState = Arc<GeoLensService<InMemoryLogging, SqliteStorage, InMemorySessions>>;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Session of the caller, if they sent a valid bearer token.
async fn optional_session(service: &AppState, headers: &HeaderMap) -> Result<Option<Session>, ApiError> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };
    match service.resolve_session(token).await {
        Ok(session) => Ok(Some(session)),
        Err(GeoLensError::Unauthorized(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// Middleware to resolve the bearer token into a live session
async fn auth_middleware(
    State(service): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| GeoLensError::Unauthorized("Missing or malformed Authorization header".to_string()))?;
    let session = service.resolve_session(token).await?;
    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

// Define API routes
pub fn api_routes(service: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/change-password", post(change_password))
        .route("/predict", post(predict))
        .route("/history", get(get_history))
        .route("/stats", get(get_stats))
        .route("/dashboard", get(get_dashboard))
        .route("/activity", get(get_activity))
        .route_layer(middleware::from_fn_with_state(service.clone(), auth_middleware));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/user-info", get(get_user_info))
        .route("/reset-password-by-username", post(reset_password_by_username))
        .route("/classes", get(get_classes))
        .merge(protected_routes)
        .with_state(service)
}

#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = MessageResponse),
        (status = 400, description = "Missing fields, invalid email, short password or duplicate account", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn register(
    State(service): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    service
        .register(
            req.username.as_deref().unwrap_or_default(),
            req.email.as_deref().unwrap_or_default(),
            req.password.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok((StatusCode::CREATED, MessageResponse::new("Account created successfully")))
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn login(
    State(service): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = service
        .authenticate(
            req.username.as_deref().unwrap_or_default(),
            req.password.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token: outcome.token,
        expires_at: outcome.session.expires_at,
        user: outcome.user,
    }))
}

#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Logged out (also when no session was active)", body = MessageResponse)
    ),
    security((), ("Bearer" = []))
)]
pub async fn logout(State(service): State<AppState>, headers: HeaderMap) -> Result<Json<MessageResponse>, ApiError> {
    if let Some(session) = optional_session(&service, &headers).await? {
        service.logout(&session).await?;
    }
    Ok(MessageResponse::new("Logged out successfully"))
}

#[utoipa::path(
    get,
    path = "/api/user-info",
    responses(
        (status = 200, description = "Whether the caller is authenticated, and as whom", body = UserInfoResponse)
    ),
    security((), ("Bearer" = []))
)]
pub async fn get_user_info(
    State(service): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserInfoResponse>, ApiError> {
    let user = optional_session(&service, &headers).await?.map(|s| UserSummary {
        id: s.user_id,
        username: s.username,
    });
    Ok(Json(UserInfoResponse {
        authenticated: user.is_some(),
        user,
    }))
}

#[utoipa::path(
    post,
    path = "/api/reset-password-by-username",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = ResetPasswordResponse),
        (status = 400, description = "Missing fields or short password", body = ErrorResponse),
        (status = 403, description = "Unverified reset is disabled", body = ErrorResponse),
        (status = 404, description = "Username not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn reset_password_by_username(
    State(service): State<AppState>,
    AppJson(req): AppJson<ResetPasswordRequest>,
) -> Result<Json<ResetPasswordResponse>, ApiError> {
    let username = req.username.unwrap_or_default();
    service
        .reset_password_by_username(&username, req.new_password.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(ResetPasswordResponse {
        message: "Password reset successfully".to_string(),
        username,
    }))
}

#[utoipa::path(
    post,
    path = "/api/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Missing fields or short password", body = ErrorResponse),
        (status = 401, description = "Not authenticated or wrong current password", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn change_password(
    State(service): State<AppState>,
    Extension(session): Extension<Session>,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    service
        .change_password(
            &session,
            req.current_password.as_deref().unwrap_or_default(),
            req.new_password.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(MessageResponse::new("Password changed successfully"))
}

fn multipart_error(status: StatusCode, message: String) -> GeoLensError {
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => GeoLensError::PayloadTooLarge,
        _ => GeoLensError::InvalidImage(message),
    }
}

async fn read_upload(req: Request) -> Result<ImageUpload, GeoLensError> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if is_multipart {
        let mut multipart = Multipart::from_request(req, &())
            .await
            .map_err(|e| multipart_error(e.status(), e.body_text()))?;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e.status(), e.body_text()))?
        {
            if field.name() != Some("image") {
                continue;
            }
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| multipart_error(e.status(), e.body_text()))?;
            return Ok(ImageUpload::File {
                file_name,
                bytes: bytes.to_vec(),
            });
        }
        return Err(GeoLensError::MissingImage);
    }

    let Json(body) = Json::<PredictRequest>::from_request(req, &())
        .await
        .map_err(|e| match e.status() {
            StatusCode::PAYLOAD_TOO_LARGE => GeoLensError::PayloadTooLarge,
            _ => GeoLensError::MissingImage,
        })?;
    body.image_data
        .filter(|data| !data.trim().is_empty())
        .map(ImageUpload::Base64)
        .ok_or(GeoLensError::MissingImage)
}

#[utoipa::path(
    post,
    path = "/api/predict",
    request_body(
        content = PredictRequest,
        description = "Either multipart/form-data with an `image` file field, or JSON with base64 `image_data`"
    ),
    responses(
        (status = 200, description = "Image classified and recorded", body = PredictResponse),
        (status = 400, description = "Missing, unsupported or undecodable image", body = ErrorResponse),
        (status = 413, description = "Upload exceeds the body limit", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Model unavailable or inference failed", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn predict(
    State(service): State<AppState>,
    Extension(session): Extension<Session>,
    req: Request,
) -> Result<Json<PredictResponse>, ApiError> {
    let upload = read_upload(req).await?;
    let outcome = service.predict(&session, upload).await?;
    let prediction = outcome.prediction;

    let probabilities = LandUseClass::ALL
        .iter()
        .zip(outcome.classification.probabilities.iter())
        .map(|(class, p)| (class.label().to_string(), serde_json::Value::from(as_percent(f64::from(*p)))))
        .collect();

    Ok(Json(PredictResponse {
        class: prediction.predicted_class,
        description: prediction.predicted_class.description().to_string(),
        confidence: as_percent(prediction.confidence),
        image_url: UploadStore::url_for(&prediction.image_name),
        timestamp: prediction.timestamp,
        probabilities,
    }))
}

#[utoipa::path(
    get,
    path = "/api/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Caller's predictions, newest first", body = Vec<HistoryItem>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_history(
    State(service): State<AppState>,
    Extension(session): Extension<Session>,
    AppQuery(query): AppQuery<HistoryQuery>,
) -> Result<Json<Vec<HistoryItem>>, ApiError> {
    let history = service.get_history(session.user_id, query.limit).await?;
    Ok(Json(history.into_iter().map(HistoryItem::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Prediction count and class distribution", body = StatsResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_stats(
    State(service): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = service.get_stats(session.user_id).await?;
    Ok(Json(StatsResponse::from(stats)))
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Totals, most common class and recent activity", body = DashboardResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_dashboard(
    State(service): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let summary = service.get_dashboard(session.user_id).await?;
    Ok(Json(DashboardResponse {
        total_predictions: summary.total_predictions,
        most_common_class: summary.most_common_class,
        active: summary.active,
        recent: summary.recent.into_iter().map(HistoryItem::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/activity",
    responses(
        (status = 200, description = "Caller's activity log, newest first", body = Vec<ActivityEntry>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_activity(
    State(service): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
    let logs = service.get_activity(session.user_id).await?;
    Ok(Json(logs))
}

#[utoipa::path(
    get,
    path = "/api/classes",
    responses(
        (status = 200, description = "The fixed land-use label set", body = Vec<ClassInfo>)
    )
)]
pub async fn get_classes() -> Json<Vec<ClassInfo>> {
    Json(
        LandUseClass::ALL
            .iter()
            .map(|class| ClassInfo {
                index: class.index(),
                name: *class,
                description: class.description().to_string(),
            })
            .collect(),
    )
}
