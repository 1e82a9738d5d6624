//! Credential validation and token issuance.

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{encode, Header};
use serde::Deserialize;

use super::claims::Claims;
use super::keys::KeyMaterial;
use super::password;
use super::AuthError;
use crate::observability::HiveEvent;
use crate::rbac::{OrganizationId, Principal, Role};
use crate::repository::{OrganizationStore, UserStore};
use crate::users::models::User;

/// Result of a successful login or registration: the live user record plus
/// a freshly minted token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

impl AuthSession {
    pub fn principal(&self) -> Principal {
        self.user.to_principal()
    }
}

/// Self-service registration input. Registration always joins an existing
/// organization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub organization_id: OrganizationId,
}

/// Verifies passwords and mints signed identity tokens.
///
/// Issuance is stateless: no session table, no revocation list. A token is
/// good until it expires or the validator's live-user check rejects it.
pub struct TokenIssuer {
    keys: Arc<KeyMaterial>,
    users: Arc<dyn UserStore>,
    orgs: Arc<dyn OrganizationStore>,
    token_ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer with a fixed token time-to-live.
    pub fn new(
        keys: Arc<KeyMaterial>,
        users: Arc<dyn UserStore>,
        orgs: Arc<dyn OrganizationStore>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            keys,
            users,
            orgs,
            token_ttl,
        }
    }

    /// Look up the user by email and verify the password.
    ///
    /// Unknown email and wrong password both collapse to
    /// `InvalidCredentials`; only logs keep the distinction.
    pub async fn validate_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                HiveEvent::LoginFailed {
                    email: email.to_string(),
                    reason: "unknown email".to_string(),
                }
                .log();
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !user.is_active {
            HiveEvent::LoginFailed {
                email: email.to_string(),
                reason: "account disabled".to_string(),
            }
            .log();
            return Err(AuthError::AccountDisabled);
        }

        if !password::verify_password(password, &user.password_hash)? {
            HiveEvent::LoginFailed {
                email: email.to_string(),
                reason: "password mismatch".to_string(),
            }
            .log();
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Sign a token for a principal.
    pub fn issue_token(&self, principal: &Principal) -> Result<String, AuthError> {
        let claims = Claims::for_principal(principal, self.token_ttl);
        let header = Header::new(self.keys.algorithm());

        encode(&header, &claims, self.keys.encoding_key()?)
            .map_err(|e| AuthError::Internal(format!("failed to sign token: {}", e)))
    }

    /// Authenticate with email/password and mint a token.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let user = self.validate_credentials(email, password).await?;
        let token = self.issue_token(&user.to_principal())?;

        HiveEvent::LoginSucceeded {
            user_id: user.id.to_string(),
        }
        .log();
        Ok(AuthSession { user, token })
    }

    /// Register a new user in an existing organization and log them in.
    ///
    /// Policy: self-service registration always grants the least-privileged
    /// role, Viewer. Elevation is an administrative action after the fact.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthSession, AuthError> {
        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        // Registration joins an existing, active organization.
        self.orgs
            .find_by_id(&request.organization_id)
            .await?
            .filter(|o| o.is_active)
            .ok_or(AuthError::UnknownOrganization)?;

        let password_hash = password::hash_password(&request.password)?;
        let user = User::new(
            request.email,
            request.name,
            password_hash,
            request.organization_id,
            Role::Viewer,
        );

        // A concurrent registration can still lose the race on the unique
        // email constraint, which surfaces as EmailTaken via From<HiveError>.
        self.users.insert(&user).await?;

        let token = self.issue_token(&user.to_principal())?;
        HiveEvent::UserRegistered {
            user_id: user.id.to_string(),
            organization_id: user.organization_id.to_string(),
        }
        .log();

        Ok(AuthSession { user, token })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("keys", &self.keys)
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}
