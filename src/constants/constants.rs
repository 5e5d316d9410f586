// Activity log actions
pub const USER_REGISTERED: &str = "USER_REGISTERED";
pub const USER_LOGGED_IN: &str = "USER_LOGGED_IN";
pub const USER_LOGGED_OUT: &str = "USER_LOGGED_OUT";
pub const PASSWORD_RESET: &str = "PASSWORD_RESET";
pub const PASSWORD_CHANGED: &str = "PASSWORD_CHANGED";
pub const PREDICTION_CREATED: &str = "PREDICTION_CREATED";

// Credential rules
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MAX_EMAIL_LENGTH: usize = 100;

pub const ADMIN_USERNAME: &str = "admin";

// Number of history items shown on the dashboard
pub const RECENT_PREDICTIONS: usize = 5;

// Session lifetime bounds, in seconds
pub const MAX_SESSION_TTL_SECS: i64 = 365 * 24 * 3600;

// Oldest activity entries are dropped past this many
pub const MAX_ACTIVITY_ENTRIES: usize = 10_000;
