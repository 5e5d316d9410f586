use crate::auth::jwt::JwtService;
use crate::constants::constants::USER_LOGGED_OUT;
use crate::core::errors::GeoLensError;
use crate::core::services::ServiceSettings;
use crate::tests::{ColourClassifier, create_test_service, create_test_service_with};
use chrono::{Duration, Utc};
use std::sync::Arc;

#[tokio::test]
async fn test_token_resolves_to_session() {
    let (service, _dir) = create_test_service();
    let user = service.register("alice", "alice@example.com", "secret1").await.unwrap();
    let outcome = service.authenticate("alice", "secret1").await.unwrap();

    let session = service.resolve_session(&outcome.token).await.unwrap();
    assert_eq!(session.user_id, user.id);
    assert_eq!(session.username, "alice");
    assert_eq!(session.id, outcome.session.id);
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let (service, _dir) = create_test_service();
    let user = service.register("alice", "alice@example.com", "secret1").await.unwrap();
    let first = service.authenticate("alice", "secret1").await.unwrap();
    let second = service.authenticate("alice", "secret1").await.unwrap();

    service.logout(&first.session).await.unwrap();

    assert!(matches!(
        service.resolve_session(&first.token).await,
        Err(GeoLensError::Unauthorized(_))
    ));
    // Other sessions of the same user stay valid.
    assert!(service.resolve_session(&second.token).await.is_ok());

    let logs = service.get_activity(user.id).await.unwrap();
    assert_eq!(logs[0].action, USER_LOGGED_OUT);
}

#[tokio::test]
async fn test_expired_session_is_rejected() {
    let (service, _dir) = create_test_service_with(Arc::new(ColourClassifier), ServiceSettings {
        session_ttl: Duration::seconds(-5),
        bcrypt_cost: 4,
        allow_unverified_reset: false,
    });
    service.register("alice", "alice@example.com", "secret1").await.unwrap();
    let outcome = service.authenticate("alice", "secret1").await.unwrap();

    assert!(matches!(
        service.resolve_session(&outcome.token).await,
        Err(GeoLensError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_forged_tokens_are_rejected() {
    let (service, _dir) = create_test_service();
    let user = service.register("alice", "alice@example.com", "secret1").await.unwrap();
    let outcome = service.authenticate("alice", "secret1").await.unwrap();
    let expires_at = (Utc::now() + Duration::hours(1)).timestamp();

    let other_key = JwtService::new("another-secret".to_string());
    let token = other_key
        .generate_token(user.id, &outcome.session.id, expires_at)
        .unwrap();
    assert!(matches!(
        service.resolve_session(&token).await,
        Err(GeoLensError::Unauthorized(_))
    ));

    // Right key and session id, but claiming to be someone else.
    let same_key = JwtService::new("test-secret".to_string());
    let token = same_key
        .generate_token(user.id + 1, &outcome.session.id, expires_at)
        .unwrap();
    assert!(matches!(
        service.resolve_session(&token).await,
        Err(GeoLensError::Unauthorized(_))
    ));

    assert!(matches!(
        service.resolve_session("not-a-token").await,
        Err(GeoLensError::Unauthorized(_))
    ));
}

#[test]
fn test_session_ttl_bounds() {
    assert_eq!(ServiceSettings::session_ttl_from_secs(3600).unwrap(), Duration::hours(1));
    assert!(ServiceSettings::session_ttl_from_secs(365 * 24 * 3600).is_ok());

    for secs in [0, -5, 365 * 24 * 3600 + 1, i64::MAX] {
        assert!(
            matches!(ServiceSettings::session_ttl_from_secs(secs), Err(GeoLensError::InvalidConfig(_))),
            "{}",
            secs
        );
    }
}
