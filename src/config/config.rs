use dotenv::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub log_level: String,
    pub session_secret: String,
    pub session_secret_generated: bool,
    pub session_ttl_secs: i64,
    pub model_path: String,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub bcrypt_cost: u32,
    pub seed_admin_password: Option<String>,
    pub allow_unverified_reset: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &"<redacted>")
            .field("log_level", &self.log_level)
            .field("session_secret", &"<redacted>")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("model_path", &self.model_path)
            .field("upload_dir", &self.upload_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("seed_admin_password", &self.seed_admin_password.as_ref().map(|_| "<redacted>"))
            .field("allow_unverified_reset", &self.allow_unverified_reset)
            .finish()
    }
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    fn from_env() -> Self {
        dotenv().ok();

        let (session_secret, session_secret_generated) = match env::var("SESSION_SECRET") {
            Ok(secret) if !secret.is_empty() => (secret, false),
            _ => (Uuid::new_v4().simple().to_string(), true), // sessions won't survive a restart
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parsed("PORT", 5000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://geolens.db".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            session_secret,
            session_secret_generated,
            session_ttl_secs: parsed("SESSION_TTL_SECS", 3600),
            model_path: env::var("MODEL_PATH").unwrap_or_else(|_| "resnet50_fast_model.onnx".to_string()),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "static/uploads".to_string()),
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES", 16 * 1024 * 1024),
            bcrypt_cost: parsed("BCRYPT_COST", bcrypt::DEFAULT_COST),
            seed_admin_password: env::var("SEED_ADMIN_PASSWORD").ok().filter(|p| !p.is_empty()),
            allow_unverified_reset: parsed("ALLOW_UNVERIFIED_RESET", false),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);
