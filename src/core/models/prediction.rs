use super::land_use::LandUseClass;
use crate::core::errors::GeoLensError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Prediction {
    pub id: i64,
    pub user_id: i64,
    pub image_name: String,
    pub predicted_class: LandUseClass,
    pub confidence: f64, // 0.0..=1.0
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewPrediction {
    pub user_id: i64,
    pub image_name: String,
    pub predicted_class: LandUseClass,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// Raw `predictions` row; the class is stored as its label.
#[derive(Debug, sqlx::FromRow)]
pub struct PredictionRow {
    pub id: i64,
    pub user_id: i64,
    pub image_name: String,
    pub predicted_class: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl TryFrom<PredictionRow> for Prediction {
    type Error = GeoLensError;

    fn try_from(row: PredictionRow) -> Result<Self, Self::Error> {
        let predicted_class = row
            .predicted_class
            .parse::<LandUseClass>()
            .map_err(GeoLensError::DatabaseError)?;
        Ok(Prediction {
            id: row.id,
            user_id: row.user_id,
            image_name: row.image_name,
            predicted_class,
            confidence: row.confidence,
            timestamp: row.timestamp,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ClassCount {
    pub class: LandUseClass,
    pub count: u64,
}

/// Per-user aggregate. `class_distribution` is ordered by count descending, then label.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PredictionStats {
    pub total_predictions: u64,
    pub class_distribution: Vec<ClassCount>,
}

impl PredictionStats {
    pub fn from_counts(mut counts: Vec<ClassCount>) -> Self {
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.class.label().cmp(b.class.label())));
        PredictionStats {
            total_predictions: counts.iter().map(|c| c.count).sum(),
            class_distribution: counts,
        }
    }

    pub fn most_common(&self) -> Option<LandUseClass> {
        self.class_distribution.first().map(|c| c.class)
    }

    pub fn count_for(&self, class: LandUseClass) -> u64 {
        self.class_distribution
            .iter()
            .find(|c| c.class == class)
            .map(|c| c.count)
            .unwrap_or(0)
    }
}
