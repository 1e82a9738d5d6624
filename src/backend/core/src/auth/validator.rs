//! Token validation and principal reconstruction.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, Validation};
use tracing::debug;

use super::claims::Claims;
use super::keys::KeyMaterial;
use super::AuthError;
use crate::rbac::{Principal, UserId};
use crate::repository::UserStore;

/// Verifies tokens and rebuilds the authenticated principal.
///
/// Claims are treated as a cache, not a source of truth: after the
/// signature and expiry check, the validator re-fetches the user by subject
/// id so that deactivation or an organization change since issuance
/// invalidates the token. Staleness here is a security property, so
/// nothing is cached across requests.
pub struct TokenValidator {
    keys: Arc<KeyMaterial>,
    users: Arc<dyn UserStore>,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(keys: Arc<KeyMaterial>, users: Arc<dyn UserStore>) -> Self {
        let mut validation = Validation::new(keys.algorithm());
        // Expiry is enforced by hand below: the library's check is
        // exclusive with leeway, while this API treats `exp == now` as
        // already expired (fails closed).
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Self {
            keys,
            users,
            validation,
        }
    }

    /// Verify a raw token and reconstruct its principal.
    pub async fn authenticate(&self, raw_token: &str) -> Result<Principal, AuthError> {
        let token_data = decode::<Claims>(raw_token, self.keys.decoding_key(), &self.validation)
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                AuthError::InvalidToken
            })?;
        let claims = token_data.claims;

        if claims.is_expired_at(Utc::now()) {
            return Err(AuthError::TokenExpired);
        }

        let user_id: UserId = claims
            .sub
            .parse()
            .map_err(|_| AuthError::InvalidToken)?;

        // Live lookup: catches deletion, deactivation, and drift between
        // the claims and the current record.
        let user = self
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        if user.email != claims.email
            || user.organization_id.to_string() != claims.organization_id
        {
            debug!(
                user_id = %user.id,
                "Token rejected: claims no longer match the live record"
            );
            return Err(AuthError::ClaimsMismatch);
        }

        // The principal is built from the live row, so a role change takes
        // effect immediately without waiting for token expiry.
        Ok(user.to_principal())
    }
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("keys", &self.keys)
            .finish()
    }
}
