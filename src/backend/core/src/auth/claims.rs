//! JWT claims.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rbac::{Principal, Role};

/// The signed payload of a Taskhive token.
///
/// Claims describe the principal *at issuance time*; the validator treats
/// them as a cache and re-checks the live user record on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id.
    pub sub: String,

    /// User email at issuance.
    pub email: String,

    /// Display name at issuance.
    pub name: String,

    /// Organization (tenant) id.
    #[serde(rename = "organizationId")]
    pub organization_id: String,

    /// Role at issuance.
    pub role: Role,

    /// Token id, unique per issued token.
    pub jti: String,

    /// Issued-at, unix seconds.
    pub iat: i64,

    /// Expiry, unix seconds. The boundary is inclusive: a token is expired
    /// when `exp <= now`.
    pub exp: i64,
}

impl Claims {
    /// Build claims for a principal with a fixed time-to-live.
    pub fn for_principal(principal: &Principal, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: principal.user_id.to_string(),
            email: principal.email.clone(),
            name: principal.name.clone(),
            organization_id: principal.organization_id.to_string(),
            role: principal.role,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// Expiry as a timestamp.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    /// Inclusive expiry check: `exp == now` is already expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }

    /// Inclusive expiry check against the current clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
