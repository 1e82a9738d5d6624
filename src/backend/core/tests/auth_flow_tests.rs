//! End-to-end tests for the credential/token flow: registration, login,
//! issuance, validation, and the live-user re-check.

mod common;

use common::*;
use taskhive_core::auth::{AuthError, RegisterRequest};
use taskhive_core::prelude::*;

fn register_request(email: &str, organization_id: OrganizationId) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        name: "New User".to_string(),
        organization_id,
    }
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn register_then_login_round_trip() {
    let env = env();
    let org = seed_org(&env, "acme").await;

    let session = env
        .issuer
        .register(register_request("new@example.com", org.id))
        .await
        .expect("registration");

    // Self-service registration is always least-privilege.
    assert_eq!(session.user.role, Role::Viewer);
    assert_eq!(session.user.organization_id, org.id);

    // The token from registration validates to a matching principal.
    let principal = env
        .validator
        .authenticate(&session.token)
        .await
        .expect("token from registration");
    assert_eq!(principal.user_id, session.user.id);
    assert_eq!(principal.organization_id, org.id);
    assert_eq!(principal.role, Role::Viewer);

    // And plain login works with the registered password.
    let login = env
        .issuer
        .login("new@example.com", PASSWORD)
        .await
        .expect("login");
    assert_eq!(login.user.id, session.user.id);
}

#[tokio::test]
async fn duplicate_email_conflicts_and_issues_no_token() {
    let env = env();
    let org = seed_org(&env, "acme").await;
    seed_user(&env, "taken@example.com", org.id, Role::Viewer).await;

    let err = env
        .issuer
        .register(register_request("taken@example.com", org.id))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::EmailTaken));
    assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn registration_requires_an_existing_organization() {
    let env = env();

    let err = env
        .issuer
        .register(register_request("lost@example.com", OrganizationId::generate()))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::UnknownOrganization));
    assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
}

// ============================================================================
// Credential validation
// ============================================================================

#[tokio::test]
async fn wrong_password_and_unknown_email_are_indistinguishable() {
    let env = env();
    let org = seed_org(&env, "acme").await;
    seed_user(&env, "known@example.com", org.id, Role::Viewer).await;

    let wrong_password = env
        .issuer
        .login("known@example.com", "not the password")
        .await
        .unwrap_err();
    let unknown_email = env
        .issuer
        .login("ghost@example.com", PASSWORD)
        .await
        .unwrap_err();

    // Same variant, same message: no account enumeration.
    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert!(matches!(unknown_email, AuthError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

#[tokio::test]
async fn disabled_account_cannot_log_in() {
    let env = env();
    let org = seed_org(&env, "acme").await;
    let (mut user, _) = seed_user(&env, "gone@example.com", org.id, Role::Editor).await;

    user.deactivate();
    UserStore::update(env.store.as_ref(), &user).await.unwrap();

    let err = env
        .issuer
        .login("gone@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AccountDisabled));
}

// ============================================================================
// Token validation
// ============================================================================

#[tokio::test]
async fn issue_then_authenticate_matches_user_record() {
    let env = env();
    let org = seed_org(&env, "acme").await;
    let (user, principal) = seed_user(&env, "round@example.com", org.id, Role::Admin).await;

    let token = env.issuer.issue_token(&principal).expect("token");
    assert_eq!(token.split('.').count(), 3);

    let authenticated = env.validator.authenticate(&token).await.expect("validate");
    assert_eq!(authenticated.user_id, user.id);
    assert_eq!(authenticated.email, user.email);
    assert_eq!(authenticated.organization_id, user.organization_id);
    assert_eq!(authenticated.role, user.role);
}

#[tokio::test]
async fn token_expiring_now_fails_closed() {
    // A zero TTL makes exp == iat == now; the inclusive boundary must
    // already reject it.
    let env = env_with_ttl(chrono::Duration::zero());
    let org = seed_org(&env, "acme").await;
    let (_, principal) = seed_user(&env, "brief@example.com", org.id, Role::Viewer).await;

    let token = env.issuer.issue_token(&principal).expect("token");
    let err = env.validator.authenticate(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenExpired));
}

#[tokio::test]
async fn tampered_token_is_rejected() {
    let env = env();
    let org = seed_org(&env, "acme").await;
    let (_, principal) = seed_user(&env, "tamper@example.com", org.id, Role::Viewer).await;

    let token = env.issuer.issue_token(&principal).expect("token");

    // Flip a character in the signature segment.
    let mut parts: Vec<String> = token.split('.').map(String::from).collect();
    let sig = parts[2].clone();
    parts[2] = if sig.starts_with('A') {
        format!("B{}", &sig[1..])
    } else {
        format!("A{}", &sig[1..])
    };
    let forged = parts.join(".");

    let err = env.validator.authenticate(&forged).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let env = env();
    let err = env.validator.authenticate("not.a.token").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));
}

// ============================================================================
// Live-user re-check (claims are a cache, not a source of truth)
// ============================================================================

#[tokio::test]
async fn deactivation_invalidates_outstanding_tokens() {
    let env = env();
    let org = seed_org(&env, "acme").await;
    let (mut user, principal) = seed_user(&env, "left@example.com", org.id, Role::Editor).await;

    let token = env.issuer.issue_token(&principal).expect("token");
    assert!(env.validator.authenticate(&token).await.is_ok());

    user.deactivate();
    UserStore::update(env.store.as_ref(), &user).await.unwrap();

    // Still unexpired, but the live check fails.
    let err = env.validator.authenticate(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::AccountDisabled));
}

#[tokio::test]
async fn email_change_forces_relogin() {
    let env = env();
    let org = seed_org(&env, "acme").await;
    let (mut user, principal) = seed_user(&env, "old@example.com", org.id, Role::Viewer).await;

    let token = env.issuer.issue_token(&principal).expect("token");

    user.email = "renamed@example.com".to_string();
    UserStore::update(env.store.as_ref(), &user).await.unwrap();

    let err = env.validator.authenticate(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::ClaimsMismatch));
}

#[tokio::test]
async fn role_change_applies_without_reissue() {
    // Role is not part of the mismatch check: the principal is rebuilt
    // from the live record, so a promotion applies on the next request.
    let env = env();
    let org = seed_org(&env, "acme").await;
    let (mut user, principal) = seed_user(&env, "promo@example.com", org.id, Role::Viewer).await;

    let token = env.issuer.issue_token(&principal).expect("token");

    user.role = Role::Admin;
    UserStore::update(env.store.as_ref(), &user).await.unwrap();

    let authenticated = env.validator.authenticate(&token).await.expect("validate");
    assert_eq!(authenticated.role, Role::Admin);
}

#[tokio::test]
async fn deleted_subject_is_rejected() {
    // A token whose subject never existed in this store.
    let env = env();
    let other = env_with_ttl(chrono::Duration::hours(1));
    let org = seed_org(&other, "elsewhere").await;
    let (_, principal) = seed_user(&other, "alien@example.com", org.id, Role::Viewer).await;

    let token = other.issuer.issue_token(&principal).expect("token");
    let err = env.validator.authenticate(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::UserNotFound));
}
