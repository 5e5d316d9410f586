pub mod logging;
pub mod model;
pub mod sessions;
pub mod storage;
pub mod uploads;
