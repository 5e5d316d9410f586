use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

#[derive(Error, Debug, Serialize)]
pub enum GeoLensError {
    #[error("Missing required fields: {0}")]
    MissingFields(String),
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),
    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),
    #[error("Username {0} already taken")]
    UsernameTaken(String),
    #[error("Email {0} already registered")]
    EmailAlreadyRegistered(String),
    #[error("User {0} not found")]
    UserNotFound(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Current password is incorrect")]
    IncorrectPassword,
    #[error("Authentication required: {0}")]
    Unauthorized(String),
    #[error("Password reset by username is disabled")]
    ResetDisabled,
    #[error("No image provided")]
    MissingImage,
    #[error("No file selected")]
    EmptyFilename,
    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("Failed to load model: {0}")]
    ModelLoad(String),
    #[error("Model is not loaded")]
    ModelUnavailable,
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("Request body too large")]
    PayloadTooLarge,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Upload error: {0}")]
    UploadError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Logging error: {0}")]
    LoggingError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl From<sqlx::Error> for GeoLensError {
    fn from(err: sqlx::Error) -> Self {
        GeoLensError::DatabaseError(err.to_string())
    }
}
