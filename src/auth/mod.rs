use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

pub mod resolver;

pub use resolver::{ProfileRoleResolver, RoleResolver};

/// Raw claims carried by a platform-issued access token.
///
/// `exp` and the signature are enforced by the decode step; `role` is only a
/// hint and is overwritten by the role resolver before any authorization
/// decision is made.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub app_metadata: Option<Value>,
    #[serde(default)]
    pub user_metadata: Option<Value>,
    pub exp: i64,
}

/// The authenticated caller's resolved claims for one request.
///
/// Created from a verified token, discarded when the request ends; never
/// persisted.
#[derive(Debug, Clone)]
pub struct Identity {
    pub sub: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<Value>,
    pub user_metadata: Option<Value>,
}

impl Identity {
    /// Subject id as a UUID; the platform issues UUID subjects, anything
    /// else means the token was not meant for this service.
    pub fn user_id(&self) -> Result<uuid::Uuid, ApiError> {
        uuid::Uuid::parse_str(&self.sub)
            .map_err(|_| ApiError::authentication("Invalid user data"))
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            sub: claims.sub,
            email: claims.email,
            role: claims.role,
            app_metadata: claims.app_metadata,
            user_metadata: claims.user_metadata,
        }
    }
}

/// Verify and decode an access token into an [`Identity`].
///
/// Tokens are HS256-signed with the platform's shared secret. Audience
/// checking is disabled (the platform issues tokens for several audiences);
/// expiry and signature are still enforced. Pure function of the secret and
/// the token.
pub fn verify_token(token: &str, secret: &str) -> Result<Identity, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<Claims>(token, &key, &validation).map_err(|e| {
        tracing::warn!(error = %e, "JWT verification failed");
        ApiError::authentication("Invalid token")
    })?;

    Ok(Identity::from(data.claims))
}
