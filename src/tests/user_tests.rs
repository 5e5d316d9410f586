use crate::constants::constants::{PASSWORD_RESET, USER_LOGGED_IN, USER_REGISTERED};
use crate::core::errors::GeoLensError;
use crate::core::services::ServiceSettings;
use crate::tests::{ColourClassifier, create_test_service, create_test_service_with, test_settings};
use std::sync::Arc;

#[tokio::test]
async fn test_register_user() {
    let (service, _dir) = create_test_service();
    let user = service.register("alice", "alice@example.com", "secret1").await.unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.email.as_deref(), Some("alice@example.com"));
    assert_ne!(user.password_hash, "secret1");

    let stored = service.get_user(user.id).await.unwrap().unwrap();
    assert_eq!(stored.username, "alice");

    let logs = service.get_activity(user.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, USER_REGISTERED);
}

#[tokio::test]
async fn test_register_rejects_duplicates() {
    let (service, _dir) = create_test_service();
    service.register("alice", "alice@example.com", "secret1").await.unwrap();

    let result = service.register("alice", "other@example.com", "secret1").await;
    assert!(matches!(result, Err(GeoLensError::UsernameTaken(_))));

    let result = service.register("bob", "alice@example.com", "secret1").await;
    assert!(matches!(result, Err(GeoLensError::EmailAlreadyRegistered(_))));
}

#[tokio::test]
async fn test_register_validates_input() {
    let (service, _dir) = create_test_service();

    let result = service.register("", "alice@example.com", "secret1").await;
    assert!(matches!(result, Err(GeoLensError::MissingFields(_))));

    let result = service.register("alice", "alice@example.com", "12345").await;
    assert!(matches!(result, Err(GeoLensError::PasswordTooShort(6))));

    let result = service.register("alice", "not-an-email", "secret1").await;
    assert!(matches!(result, Err(GeoLensError::InvalidEmail(_))));

    let long_name = "a".repeat(51);
    let result = service.register(&long_name, "alice@example.com", "secret1").await;
    assert!(matches!(result, Err(GeoLensError::InvalidInput(field, _)) if field == "username"));
}

#[tokio::test]
async fn test_login_requires_matching_password() {
    let (service, _dir) = create_test_service();
    let user = service.register("alice", "alice@example.com", "secret1").await.unwrap();

    let outcome = service.authenticate("alice", "secret1").await.unwrap();
    assert_eq!(outcome.user.id, user.id);
    assert_eq!(outcome.session.user_id, user.id);
    assert!(!outcome.token.is_empty());

    let result = service.authenticate("alice", "wrong-password").await;
    assert!(matches!(result, Err(GeoLensError::InvalidCredentials)));

    let result = service.authenticate("nobody", "secret1").await;
    assert!(matches!(result, Err(GeoLensError::InvalidCredentials)));

    let result = service.authenticate("alice", "").await;
    assert!(matches!(result, Err(GeoLensError::MissingFields(_))));

    let logs = service.get_activity(user.id).await.unwrap();
    assert_eq!(logs[0].action, USER_LOGGED_IN);
}

#[tokio::test]
async fn test_reset_password_disabled_by_default() {
    let (service, _dir) = create_test_service_with(Arc::new(ColourClassifier), ServiceSettings {
        bcrypt_cost: 4,
        ..ServiceSettings::default()
    });
    service.register("alice", "alice@example.com", "secret1").await.unwrap();

    let result = service.reset_password_by_username("alice", "newsecret").await;
    assert!(matches!(result, Err(GeoLensError::ResetDisabled)));
    assert!(service.authenticate("alice", "secret1").await.is_ok());
}

#[tokio::test]
async fn test_reset_password_by_username() {
    let (service, _dir) = create_test_service_with(Arc::new(ColourClassifier), test_settings());
    let user = service.register("alice", "alice@example.com", "secret1").await.unwrap();
    let before = service.authenticate("alice", "secret1").await.unwrap();

    service.reset_password_by_username("alice", "newsecret").await.unwrap();

    assert!(matches!(
        service.authenticate("alice", "secret1").await,
        Err(GeoLensError::InvalidCredentials)
    ));
    assert!(service.authenticate("alice", "newsecret").await.is_ok());
    // Sessions opened with the old password are revoked.
    assert!(matches!(
        service.resolve_session(&before.token).await,
        Err(GeoLensError::Unauthorized(_))
    ));

    let logs = service.get_activity(user.id).await.unwrap();
    assert!(logs.iter().any(|l| l.action == PASSWORD_RESET));
}

#[tokio::test]
async fn test_reset_password_errors() {
    let (service, _dir) = create_test_service();
    service.register("alice", "alice@example.com", "secret1").await.unwrap();

    let result = service.reset_password_by_username("ghost", "newsecret").await;
    assert!(matches!(result, Err(GeoLensError::UserNotFound(_))));

    let result = service.reset_password_by_username("alice", "abc").await;
    assert!(matches!(result, Err(GeoLensError::PasswordTooShort(_))));

    let result = service.reset_password_by_username("", "newsecret").await;
    assert!(matches!(result, Err(GeoLensError::MissingFields(_))));
}

#[tokio::test]
async fn test_change_password() {
    let (service, _dir) = create_test_service();
    service.register("alice", "alice@example.com", "secret1").await.unwrap();
    let outcome = service.authenticate("alice", "secret1").await.unwrap();

    let result = service.change_password(&outcome.session, "wrong", "newsecret").await;
    assert!(matches!(result, Err(GeoLensError::IncorrectPassword)));

    let result = service.change_password(&outcome.session, "secret1", "short").await;
    assert!(matches!(result, Err(GeoLensError::PasswordTooShort(_))));

    service
        .change_password(&outcome.session, "secret1", "newsecret")
        .await
        .unwrap();
    assert!(service.authenticate("alice", "newsecret").await.is_ok());
    assert!(service.authenticate("alice", "secret1").await.is_err());
}

#[tokio::test]
async fn test_seed_admin_is_idempotent() {
    let (service, _dir) = create_test_service();
    assert!(service.seed_admin("admin123").await.unwrap());
    assert!(!service.seed_admin("different").await.unwrap());

    let outcome = service.authenticate("admin", "admin123").await.unwrap();
    assert_eq!(outcome.user.username, "admin");
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_info_logs_omit_activity_details() {
    let captured = CapturedLogs::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (service, _dir) = create_test_service();
    service.register("alice", "alice@example.com", "secret1").await.unwrap();

    let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains(USER_REGISTERED));
    assert!(!output.contains("alice@example.com"));
}
