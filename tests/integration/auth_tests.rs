//! Credentials, token lifetime and the revocation ledger

use std::time::Duration;

use libris_server::{error::AppError, models::user::Role, services::auth::AuthService};

use crate::common::{new_user, spawn_app, ADMIN_PASSWORD, MEMBER_PASSWORD};

#[tokio::test]
async fn test_login_with_valid_credentials() {
    let app = spawn_app().await;

    let token = app
        .services
        .auth
        .login("mel@example.org", MEMBER_PASSWORD)
        .await
        .unwrap();
    let user = app.services.auth.authenticate(&token).await.unwrap();

    assert_eq!(user.id, app.member.id);
    assert_eq!(user.role, Role::User);
}

#[tokio::test]
async fn test_login_rejects_bad_password_and_unknown_email() {
    let app = spawn_app().await;

    let wrong_password = app.services.auth.login("mel@example.org", "nope").await;
    assert!(matches!(wrong_password, Err(AppError::InvalidCredentials)));

    let unknown = app.services.auth.login("ghost@example.org", "nope").await;
    assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
}

#[tokio::test]
async fn test_token_carries_configured_lifetime() {
    let app = spawn_app().await;
    let token = app
        .services
        .auth
        .login("ada@example.org", ADMIN_PASSWORD)
        .await
        .unwrap();

    let claims = app.services.auth.tokens().decode(&token).unwrap();
    assert_eq!(claims.sub, "ada@example.org");
    assert_eq!(claims.role, Role::Admin);
    assert_eq!(claims.exp - claims.iat, 30 * 60);
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let app = spawn_app().await;
    let token = app
        .services
        .auth
        .tokens()
        .issue_with_ttl(&app.member.email, app.member.role, chrono::Duration::seconds(1))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2100)).await;

    let result = app.services.auth.authenticate(&token).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn test_revoked_token_is_refused() {
    let app = spawn_app().await;
    let token = app
        .services
        .auth
        .login("mel@example.org", MEMBER_PASSWORD)
        .await
        .unwrap();

    app.services.auth.logout(&token, &app.member).await.unwrap();

    let result = app.services.auth.authenticate(&token).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn test_double_revoke_is_rejected_and_stored_once() {
    let app = spawn_app().await;
    let token = app
        .services
        .auth
        .login("mel@example.org", MEMBER_PASSWORD)
        .await
        .unwrap();
    let ledger = app.services.auth.ledger();

    ledger.revoke(&token, app.member.id).await.unwrap();
    let second = ledger.revoke(&token, app.member.id).await;

    assert!(matches!(second, Err(AppError::AlreadyRevoked)));
    assert_eq!(ledger.count_for_user(app.member.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_login_purges_users_ledger_entries() {
    let app = spawn_app().await;
    let auth: &AuthService = &app.services.auth;
    let ledger = auth.ledger();

    ledger.revoke("stale-token-1", app.member.id).await.unwrap();
    ledger.revoke("stale-token-2", app.member.id).await.unwrap();
    ledger.revoke("admin-token", app.admin.id).await.unwrap();

    auth.login("mel@example.org", MEMBER_PASSWORD).await.unwrap();

    assert_eq!(ledger.count_for_user(app.member.id).await.unwrap(), 0);
    assert_eq!(ledger.count_for_user(app.admin.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_logout_on_one_device_keeps_the_other() {
    let app = spawn_app().await;
    let auth = &app.services.auth;

    let phone = auth.login("mel@example.org", MEMBER_PASSWORD).await.unwrap();
    let laptop = auth.login("mel@example.org", MEMBER_PASSWORD).await.unwrap();
    assert_ne!(phone, laptop);

    auth.logout(&phone, &app.member).await.unwrap();

    assert!(matches!(
        auth.authenticate(&phone).await,
        Err(AppError::Unauthorized(_))
    ));
    assert_eq!(auth.authenticate(&laptop).await.unwrap().id, app.member.id);
}

#[tokio::test]
async fn test_login_purge_revives_unexpired_revoked_token() {
    let app = spawn_app().await;
    let auth = &app.services.auth;

    let old = auth.login("mel@example.org", MEMBER_PASSWORD).await.unwrap();
    auth.logout(&old, &app.member).await.unwrap();
    assert!(auth.authenticate(&old).await.is_err());

    // The next login clears the ledger rows, not the old token's signature
    auth.login("mel@example.org", MEMBER_PASSWORD).await.unwrap();

    assert_eq!(auth.authenticate(&old).await.unwrap().id, app.member.id);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = spawn_app().await;

    let same_email = app
        .services
        .users
        .register(new_user("Other", "other", "MEL@example.org", "other-pass"))
        .await;
    assert!(matches!(same_email, Err(AppError::Conflict(_))));

    let same_username = app
        .services
        .users
        .register(new_user("Other", "mel", "other@example.org", "other-pass"))
        .await;
    assert!(matches!(same_username, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_second_admin_is_refused() {
    let app = spawn_app().await;

    let result = app
        .services
        .users
        .create_admin(new_user("Bob", "bob", "bob@example.org", "bob-pass"))
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

/// The store itself refuses emails differing only by case, so concurrent
/// registrations cannot both slip past the service check.
/// Needs TEST_DATABASE_URL pointing at a disposable database.
#[tokio::test]
#[ignore]
async fn test_postgres_email_uniqueness_ignores_case() {
    use libris_server::{models::user::NewUser, repository::Repository};

    use crate::common::{pg_pool, unique_suffix};

    let repository = Repository::new(pg_pool().await);
    let suffix = unique_suffix();
    let row = |username: String, email: String| NewUser {
        name: "Case".to_string(),
        username,
        email,
        password_hash: "x".to_string(),
        address: String::new(),
        phone: String::new(),
        role: Role::User,
    };

    repository
        .users
        .create(&row(format!("lower{}", suffix), format!("case{}@example.org", suffix)))
        .await
        .unwrap();
    let upper = repository
        .users
        .create(&row(format!("upper{}", suffix), format!("CASE{}@example.org", suffix)))
        .await;

    assert!(matches!(upper, Err(AppError::Conflict(_))));
}
