pub mod activity;
pub mod land_use;
pub mod prediction;
pub mod session;
pub mod user;
