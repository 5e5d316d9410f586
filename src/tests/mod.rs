mod session_tests;
mod user_tests;

use crate::api::handlers::AppState;
use crate::core::errors::GeoLensError;
use crate::core::models::land_use::LandUseClass;
use crate::core::services::{GeoLensService, ServiceSettings};
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::model::{Classification, Classifier, top_class};
use crate::infrastructure::sessions::in_memory::InMemorySessions;
use crate::infrastructure::storage::in_memory::InMemoryStorage;
use crate::infrastructure::storage::sqlite::SqliteStorage;
use crate::infrastructure::uploads::UploadStore;
use chrono::Duration;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use tempfile::TempDir;

pub type TestService = GeoLensService<InMemoryLogging, InMemoryStorage, InMemorySessions>;

/// Picks the class from the red channel of the top-left pixel, so tests choose the
/// outcome through the image they upload.
pub struct ColourClassifier;

impl Classifier for ColourClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Classification, GeoLensError> {
        let index = image.to_rgb8().get_pixel(0, 0).0[0] as usize % LandUseClass::ALL.len();
        let mut scores = vec![0.05; LandUseClass::ALL.len()];
        scores[index] = 0.55;
        top_class(&scores)
    }
}

/// Behaves like a model that failed to load.
pub struct UnavailableClassifier;

impl Classifier for UnavailableClassifier {
    fn classify(&self, _image: &DynamicImage) -> Result<Classification, GeoLensError> {
        Err(GeoLensError::ModelUnavailable)
    }
}

pub fn test_settings() -> ServiceSettings {
    ServiceSettings {
        session_ttl: Duration::seconds(3600),
        bcrypt_cost: 4,
        allow_unverified_reset: true,
    }
}

pub fn create_test_service_with(classifier: Arc<dyn Classifier>, settings: ServiceSettings) -> (TestService, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let service = GeoLensService::new(
        InMemoryStorage::new(),
        InMemoryLogging::new(),
        InMemorySessions::new(),
        classifier,
        UploadStore::new(dir.path()),
        "test-secret".to_string(),
        settings,
    );
    (service, dir)
}

pub fn create_test_service() -> (TestService, TempDir) {
    create_test_service_with(Arc::new(ColourClassifier), test_settings())
}

pub async fn create_test_state(classifier: Arc<dyn Classifier>, settings: ServiceSettings) -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::connect("sqlite::memory:").await.unwrap();
    let service = GeoLensService::new(
        storage,
        InMemoryLogging::new(),
        InMemorySessions::new(),
        classifier,
        UploadStore::new(dir.path()),
        "test-secret".to_string(),
        settings,
    );
    (Arc::new(service), dir)
}

/// A small PNG whose top-left pixel selects `class` under `ColourClassifier`.
pub fn png_for(class: LandUseClass) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([class.index() as u8, 90, 40])));
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
    buf
}
