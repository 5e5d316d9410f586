use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::{
    api::models::{
        ChangePasswordRequest, ClassInfo, DashboardResponse, ErrorResponse, HistoryItem, LoginRequest, LoginResponse,
        MessageResponse, PredictRequest, PredictResponse, RegisterRequest, ResetPasswordRequest,
        ResetPasswordResponse, StatsResponse, UserInfoResponse,
    },
    core::models::{activity::ActivityEntry, land_use::LandUseClass, user::UserSummary},
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::register,
        super::handlers::login,
        super::handlers::logout,
        super::handlers::get_user_info,
        super::handlers::reset_password_by_username,
        super::handlers::change_password,
        super::handlers::predict,
        super::handlers::get_history,
        super::handlers::get_stats,
        super::handlers::get_dashboard,
        super::handlers::get_activity,
        super::handlers::get_classes
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        LoginResponse,
        ResetPasswordRequest,
        ResetPasswordResponse,
        ChangePasswordRequest,
        PredictRequest,
        PredictResponse,
        HistoryItem,
        StatsResponse,
        DashboardResponse,
        ClassInfo,
        MessageResponse,
        UserInfoResponse,
        ErrorResponse,
        UserSummary,
        LandUseClass,
        ActivityEntry
    )),
    modifiers(&BearerAuth),
    info(
        title = "GeoLens API",
        description = "Land-use classification of satellite imagery with per-user history",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
