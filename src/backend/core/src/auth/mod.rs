//! Authentication: credentials, tokens, and their verification.
//!
//! This module provides:
//! - Password hashing and verification (argon2id)
//! - JWT claims with an RS256-signed (HS256 for dev/tests) token issuer
//! - A token validator that reconstructs the principal from claims plus a
//!   live user lookup
//!
//! Issuance is stateless: there is no server-side session table, and the
//! public verification key can be distributed to any service that needs to
//! validate tokens without holding the private signing key.

pub mod claims;
pub mod issuer;
pub mod keys;
pub mod password;
pub mod validator;

pub use claims::Claims;
pub use issuer::{AuthSession, RegisterRequest, TokenIssuer};
pub use keys::KeyMaterial;
pub use validator::TokenValidator;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use thiserror::Error;

/// Authentication errors.
///
/// Credential failures that would let a caller enumerate accounts
/// (unknown email vs wrong password) share the `InvalidCredentials`
/// variant and one generic client message; the distinction survives only
/// in logs and the audit trail.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication credentials")]
    MissingCredentials,

    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Token subject no longer exists")]
    UserNotFound,

    #[error("Token claims no longer match account state")]
    ClaimsMismatch,

    #[error("A user with this email already exists")]
    EmailTaken,

    #[error("The specified organization does not exist")]
    UnknownOrganization,

    #[error("Internal authentication error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "MISSING_CREDENTIALS",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountDisabled => "ACCOUNT_DISABLED",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::ClaimsMismatch => "TOKEN_MISMATCH",
            Self::EmailTaken => "EMAIL_TAKEN",
            Self::UnknownOrganization => "ORGANIZATION_NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredentials
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::InvalidCredentials
            | Self::UserNotFound
            | Self::ClaimsMismatch => StatusCode::UNAUTHORIZED,
            Self::AccountDisabled => StatusCode::FORBIDDEN,
            Self::EmailTaken => StatusCode::CONFLICT,
            Self::UnknownOrganization => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn client_message(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "Authentication credentials are required",
            Self::InvalidToken => "The provided token is invalid",
            Self::TokenExpired => "The authentication token has expired",
            Self::InvalidCredentials => "Invalid email or password",
            Self::AccountDisabled => "This account has been disabled",
            // Both map to a re-login, and neither should confirm why.
            Self::UserNotFound | Self::ClaimsMismatch => {
                "The provided token is no longer valid; please log in again"
            }
            Self::EmailTaken => "A user with this email already exists",
            Self::UnknownOrganization => "The specified organization does not exist",
            Self::Internal(_) => "An authentication error occurred",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        counter!(
            "taskhive_auth_errors_total",
            "error_type" => self.code().to_string()
        )
        .increment(1);

        tracing::debug!(error = %self, code = self.code(), "Authentication failed");

        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": self.client_message(),
            }
        });

        (self.status(), Json(body)).into_response()
    }
}

impl From<crate::error::HiveError> for AuthError {
    fn from(error: crate::error::HiveError) -> Self {
        match error.code() {
            crate::error::ErrorCode::DuplicateRecord => Self::EmailTaken,
            _ => Self::Internal(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::AccountDisabled.status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::EmailTaken.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_credential_errors_share_generic_message() {
        // Unknown email and wrong password are indistinguishable to callers.
        assert_eq!(
            AuthError::InvalidCredentials.client_message(),
            "Invalid email or password"
        );
    }
}
