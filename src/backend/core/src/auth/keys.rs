//! Signing key material.
//!
//! Loaded once at startup and shared read-only across requests. RS256 is
//! the production configuration: the private key stays with the issuer,
//! while the public half can be handed to any service that validates
//! tokens. HS256 is supported for development and tests.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};

use super::AuthError;
use crate::config::AuthSettings;

/// Immutable signing/verification key material.
pub struct KeyMaterial {
    algorithm: Algorithm,
    encoding_key: Option<EncodingKey>,
    decoding_key: DecodingKey,
}

impl KeyMaterial {
    /// Symmetric key material (HS256). Both sides share the secret.
    pub fn hs256(secret: &str) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            encoding_key: Some(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Asymmetric key material (RS256).
    ///
    /// The private key is optional: validator-only deployments hold just
    /// the public half and cannot mint tokens.
    pub fn rs256(private_pem: Option<&str>, public_pem: &str) -> Result<Self, AuthError> {
        let encoding_key = private_pem
            .map(|pem| {
                EncodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| AuthError::Internal(format!("invalid RSA private key: {}", e)))
            })
            .transpose()?;

        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| AuthError::Internal(format!("invalid RSA public key: {}", e)))?;

        Ok(Self {
            algorithm: Algorithm::RS256,
            encoding_key,
            decoding_key,
        })
    }

    /// Build key material from configuration, reading PEM files from disk.
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, AuthError> {
        match settings.algorithm.as_str() {
            "RS256" => {
                let public_path = settings.public_key_path.as_deref().ok_or_else(|| {
                    AuthError::Internal("RS256 requires auth.public_key_path".into())
                })?;
                let public_pem = std::fs::read_to_string(public_path).map_err(|e| {
                    AuthError::Internal(format!("cannot read public key {}: {}", public_path, e))
                })?;

                let private_pem = settings
                    .private_key_path
                    .as_deref()
                    .map(|path| {
                        std::fs::read_to_string(path).map_err(|e| {
                            AuthError::Internal(format!("cannot read private key {}: {}", path, e))
                        })
                    })
                    .transpose()?;

                Self::rs256(private_pem.as_deref(), &public_pem)
            }
            "HS256" => {
                let secret = settings.hmac_secret.as_deref().ok_or_else(|| {
                    AuthError::Internal("HS256 requires auth.hmac_secret".into())
                })?;
                Ok(Self::hs256(secret))
            }
            other => Err(AuthError::Internal(format!(
                "unsupported JWT algorithm: {}",
                other
            ))),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The signing key, if this deployment holds one.
    pub fn encoding_key(&self) -> Result<&EncodingKey, AuthError> {
        self.encoding_key
            .as_ref()
            .ok_or_else(|| AuthError::Internal("no signing key configured".into()))
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("algorithm", &self.algorithm)
            .field("can_sign", &self.encoding_key.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hs256_can_sign_and_verify() {
        let keys = KeyMaterial::hs256("test-secret");
        assert_eq!(keys.algorithm(), Algorithm::HS256);
        assert!(keys.encoding_key().is_ok());
    }

    #[test]
    fn test_rs256_rejects_garbage_pem() {
        assert!(KeyMaterial::rs256(None, "not a pem").is_err());
    }

    #[test]
    fn test_unsupported_algorithm_rejected() {
        let settings = AuthSettings {
            algorithm: "ES384".into(),
            ..Default::default()
        };
        assert!(KeyMaterial::from_settings(&settings).is_err());
    }
}
