use crate::core::errors::GeoLensError;
use crate::core::models::{
    land_use::LandUseClass,
    prediction::{ClassCount, NewPrediction, Prediction, PredictionRow, PredictionStats},
    user::{NewUser, User},
};
use crate::infrastructure::storage::Storage;
use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT UNIQUE NOT NULL,
        password TEXT NOT NULL,
        email TEXT UNIQUE,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS predictions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        image_name TEXT NOT NULL,
        predicted_class TEXT NOT NULL,
        confidence REAL NOT NULL,
        timestamp TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
    )",
    "CREATE INDEX IF NOT EXISTS idx_predictions_user_timestamp ON predictions (user_id, timestamp)",
];

#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Opens (creating if needed) the database and makes sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, GeoLensError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is its own database, so keep exactly one alive.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().max_connections(5).connect_with(options).await?
        };

        let storage = SqliteStorage { pool };
        storage.init_schema().await?;
        info!("SQLite storage ready at {}", database_url);
        Ok(storage)
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> Result<(), GeoLensError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn map_user_insert_error(err: sqlx::Error, user: &NewUser) -> GeoLensError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            if db.message().contains("users.email") {
                return GeoLensError::EmailAlreadyRegistered(user.email.clone().unwrap_or_default());
            }
            return GeoLensError::UsernameTaken(user.username.clone());
        }
    }
    err.into()
}

fn map_prediction_insert_error(err: sqlx::Error, user_id: i64) -> GeoLensError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            return GeoLensError::UserNotFound(user_id.to_string());
        }
    }
    err.into()
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_user(&self, user: NewUser) -> Result<User, GeoLensError> {
        let result = sqlx::query("INSERT INTO users (username, password, email, created_at) VALUES (?, ?, ?, ?)")
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.email)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_user_insert_error(e, &user))?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: user.created_at,
        })
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>, GeoLensError> {
        let user = sqlx::query_as::<_, User>("SELECT id, username, email, password, created_at FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, GeoLensError> {
        let user =
            sqlx::query_as::<_, User>("SELECT id, username, email, password, created_at FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, GeoLensError> {
        let user =
            sqlx::query_as::<_, User>("SELECT id, username, email, password, created_at FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn update_password(&self, user_id: i64, password_hash: &str) -> Result<(), GeoLensError> {
        let result = sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(GeoLensError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    async fn save_prediction(&self, prediction: NewPrediction) -> Result<Prediction, GeoLensError> {
        let result = sqlx::query(
            "INSERT INTO predictions (user_id, image_name, predicted_class, confidence, timestamp) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(prediction.user_id)
        .bind(&prediction.image_name)
        .bind(prediction.predicted_class.label())
        .bind(prediction.confidence)
        .bind(prediction.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| map_prediction_insert_error(e, prediction.user_id))?;

        Ok(Prediction {
            id: result.last_insert_rowid(),
            user_id: prediction.user_id,
            image_name: prediction.image_name,
            predicted_class: prediction.predicted_class,
            confidence: prediction.confidence,
            timestamp: prediction.timestamp,
        })
    }

    async fn get_user_predictions(&self, user_id: i64, limit: Option<usize>) -> Result<Vec<Prediction>, GeoLensError> {
        // LIMIT -1 means no limit in SQLite
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let rows = sqlx::query_as::<_, PredictionRow>(
            "SELECT id, user_id, image_name, predicted_class, confidence, timestamp
             FROM predictions WHERE user_id = ? ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Prediction::try_from).collect()
    }

    async fn get_prediction_stats(&self, user_id: i64) -> Result<PredictionStats, GeoLensError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT predicted_class, COUNT(*) AS count FROM predictions WHERE user_id = ? GROUP BY predicted_class",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let counts = rows
            .into_iter()
            .map(|(label, count)| {
                let class = label.parse::<LandUseClass>().map_err(GeoLensError::DatabaseError)?;
                Ok(ClassCount {
                    class,
                    count: count as u64,
                })
            })
            .collect::<Result<Vec<_>, GeoLensError>>()?;
        Ok(PredictionStats::from_counts(counts))
    }
}
