//! WebSocket authentication. Validates the upgrade token issued by the
//! external auth service.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use callhub_core::config::AuthConfig;
use callhub_core::error::AppError;
use callhub_core::types::UserId;

/// Claims carried by tokens from the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub id: i64,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

/// Authenticates WebSocket upgrades using HS256 tokens.
#[derive(Clone)]
pub struct WsAuthenticator {
    required: bool,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for WsAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsAuthenticator")
            .field("required", &self.required)
            .finish()
    }
}

impl WsAuthenticator {
    /// Creates an authenticator from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;

        Self {
            required: config.require_token,
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Whether upgrades must carry a token.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Checks the upgrade token.
    ///
    /// Returns `Ok(None)` when tokens are not required (any supplied token is
    /// ignored), and the proven user id otherwise.
    pub fn authenticate(&self, token: Option<&str>) -> Result<Option<UserId>, AppError> {
        if !self.required {
            return Ok(None);
        }

        let token = token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::authentication("Missing token"))?;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::authentication("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::authentication("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::authentication("Invalid token signature")
                    }
                    _ => AppError::authentication(format!("Token validation failed: {e}")),
                }
            })?;

        let user_id = UserId(token_data.claims.id);
        if !user_id.is_valid() {
            return Err(AppError::authentication("Token carries an invalid user id"));
        }
        Ok(Some(user_id))
    }
}
