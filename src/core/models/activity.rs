use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ActivityEntry {
    pub id: String,
    pub action: String,
    pub user_id: Option<i64>,
    #[schema(value_type = Object)]
    pub details: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}
