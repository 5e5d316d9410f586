use geolens::api;
use geolens::config::CONFIG;
use geolens::core::services::{GeoLensService, ServiceSettings};
use geolens::infrastructure::{
    logging::in_memory::InMemoryLogging, model::onnx::OnnxClassifier, sessions::in_memory::InMemorySessions,
    storage::sqlite::SqliteStorage, uploads::UploadStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&CONFIG.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("Starting with {:?}", *CONFIG);
    if CONFIG.session_secret_generated {
        warn!("SESSION_SECRET not set; using a random secret, sessions will not survive a restart");
    }
    if CONFIG.allow_unverified_reset {
        warn!("ALLOW_UNVERIFIED_RESET is on: anyone knowing a username can reset its password");
    }

    let settings = ServiceSettings {
        session_ttl: ServiceSettings::session_ttl_from_secs(CONFIG.session_ttl_secs)?,
        bcrypt_cost: CONFIG.bcrypt_cost,
        allow_unverified_reset: CONFIG.allow_unverified_reset,
    };

    // Initialize storage, sessions, logging and the model
    let storage = SqliteStorage::connect(&CONFIG.database_url).await?;
    let logging = InMemoryLogging::new();
    let sessions = InMemorySessions::new();
    let classifier = Arc::new(OnnxClassifier::load_or_unavailable(&CONFIG.model_path));
    let uploads = UploadStore::new(&CONFIG.upload_dir);
    uploads.ensure_dir().await?;

    let service = Arc::new(GeoLensService::new(
        storage,
        logging,
        sessions,
        classifier,
        uploads,
        CONFIG.session_secret.clone(),
        settings,
    ));

    if let Some(password) = &CONFIG.seed_admin_password {
        if service.seed_admin(password).await? {
            info!("Seeded admin account");
        }
    }

    let app = api::app(service, CONFIG.max_upload_bytes);

    // Start server
    let addr: SocketAddr = format!("{}:{}", CONFIG.host, CONFIG.port).parse()?;
    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
