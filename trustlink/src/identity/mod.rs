//! Bearer credential verification
//!
//! The services never see passwords. An external identity provider issues
//! signed JWTs; [`JwtIdentityProvider`] verifies them and yields the stable
//! subject identifier plus the optional profile claims.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::IdentityConfig;

/// Error type for credential verification
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No credential was presented
    #[error("Missing credential")]
    MissingCredential,

    /// The credential failed verification
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Key material could not be loaded
    #[error("Key error: {0}")]
    KeyError(String),
}

/// The verified caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable subject identifier
    pub uid: String,

    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            name: None,
            picture: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = Some(picture.into());
        self
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Issued at timestamp
    pub iat: u64,
    /// Expiration timestamp
    pub exp: u64,
}

/// Turns a bearer credential into a verified [`Identity`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError>;
}

/// Verifies HS256 or RS256 JWTs locally.
#[derive(Clone)]
pub struct JwtIdentityProvider {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtIdentityProvider")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl JwtIdentityProvider {
    /// Verify HS256 tokens signed with a shared secret.
    pub fn hs256(secret: &str) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::KeyError("JWT secret is empty".to_string()));
        }
        Ok(Self::with_key(
            DecodingKey::from_secret(secret.as_bytes()),
            Algorithm::HS256,
        ))
    }

    /// Verify RS256 tokens against a PEM encoded public key.
    pub fn rs256_pem(pem: &[u8]) -> Result<Self, AuthError> {
        let key = DecodingKey::from_rsa_pem(pem)
            .map_err(|e| AuthError::KeyError(format!("Invalid RSA public key: {}", e)))?;
        Ok(Self::with_key(key, Algorithm::RS256))
    }

    fn with_key(key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_aud = false;
        Self { key, validation }
    }

    /// Require the `iss` claim to equal `issuer`.
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    /// Require the `aud` claim to equal `audience`.
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.validation.set_audience(&[audience]);
        self.validation.validate_aud = true;
        self
    }

    /// Tolerated clock skew when checking expiry.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.validation.leeway = leeway.as_secs();
        self
    }

    /// Build a provider from configuration; the public key wins over the secret.
    pub fn from_config(config: &IdentityConfig) -> Result<Self, AuthError> {
        let provider = match &config.public_key_path {
            Some(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    AuthError::KeyError(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::rs256_pem(&pem)?
            }
            None => Self::hs256(&config.jwt_secret)?,
        };

        let mut provider = provider.with_leeway(config.leeway);
        if let Some(issuer) = &config.issuer {
            provider = provider.with_issuer(issuer);
        }
        if let Some(audience) = &config.audience {
            provider = provider.with_audience(audience);
        }
        Ok(provider)
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError> {
        if credential.trim().is_empty() {
            return Err(AuthError::MissingCredential);
        }

        let token_data = decode::<Claims>(credential, &self.key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let claims = token_data.claims;

        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken("Token has an empty subject".to_string()));
        }

        Ok(Identity {
            uid: claims.sub,
            email: claims.email,
            name: claims.name,
            picture: claims.picture,
        })
    }
}

/// Issue an HS256 token for an identity.
///
/// Meant for tests and local tooling; production tokens come from the
/// external identity provider.
pub fn issue_token(identity: &Identity, secret: &str, ttl: Duration) -> Result<String, AuthError> {
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    let claims = Claims {
        sub: identity.uid.clone(),
        email: identity.email.clone(),
        name: identity.name.clone(),
        picture: identity.picture.clone(),
        iss: None,
        aud: None,
        iat: now,
        exp: now + ttl.as_secs(),
    };
    sign_claims(&claims, secret)
}

/// Sign arbitrary claims with HS256.
pub fn sign_claims(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::KeyError(format!("Failed to sign token: {}", e)))
}
