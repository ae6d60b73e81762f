//! Bearer credentials for the berth API.
//!
//! Clients authenticate with an HS256 JWT whose `sub` claim is their user id. Tokens are handed
//! out as API keys of the form `berth_<payload>.<signature>`, which is the JWT with its fixed
//! header replaced by the prefix. Both the raw JWT and the API key form are accepted.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use berth_core::models::UserId;

use crate::{
    config::{API_KEY_PREFIX, DEFAULT_JWT_HEADER},
    ServerError, ServerResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Claims carried by an API token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The user the token was issued to
    pub sub: String,

    /// Expiration time (seconds since the epoch)
    pub exp: u64,

    /// Issued-at time (seconds since the epoch)
    pub iat: u64,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Issues an API key for `user_id` that expires after `expire`.
pub fn generate_api_key(key: &str, user_id: UserId, expire: Duration) -> ServerResult<String> {
    let now = Utc::now();
    let expiry = now + expire;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiry.timestamp().max(0) as u64,
        iat: now.timestamp().max(0) as u64,
    };

    let jwt_token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(key.as_bytes()),
    )
    .map_err(|e| ServerError::InternalError(format!("Failed to generate token: {}", e)))?;

    tracing::info!("generated API key for user {} expiring {}", user_id, expiry.to_rfc3339());
    convert_jwt_to_api_key(&jwt_token)
}

/// Converts a JWT into the API key format by replacing its header with the key prefix.
pub fn convert_jwt_to_api_key(jwt_token: &str) -> ServerResult<String> {
    let parts: Vec<&str> = jwt_token.split('.').collect();
    if parts.len() != 3 {
        return Err(ServerError::InternalError(
            "Invalid JWT token format".to_string(),
        ));
    }

    Ok(format!("{}{}.{}", API_KEY_PREFIX, parts[1], parts[2]))
}

/// Validates a bearer credential and returns the user it was issued to.
pub fn authenticate(key: &str, credential: &str) -> ServerResult<UserId> {
    let jwt_token = match credential.strip_prefix(API_KEY_PREFIX) {
        Some(rest) => format!("{}.{}", &*DEFAULT_JWT_HEADER, rest),
        None => credential.to_string(),
    };

    let data = decode::<Claims>(
        &jwt_token,
        &DecodingKey::from_secret(key.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| ServerError::AuthenticationError(format!("invalid token: {}", e)))?;

    data.claims.sub.parse::<UserId>().map_err(|_| {
        ServerError::AuthenticationError(format!("invalid subject '{}'", data.claims.sub))
    })
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "test-secret";

    #[test]
    fn test_api_key_roundtrip() {
        let api_key = generate_api_key(KEY, 42, Duration::hours(1)).unwrap();
        assert!(api_key.starts_with(API_KEY_PREFIX));
        assert_eq!(authenticate(KEY, &api_key).unwrap(), 42);
    }

    #[test]
    fn test_raw_jwt_is_accepted() {
        let claims = Claims {
            sub: "7".to_string(),
            exp: (Utc::now() + Duration::minutes(5)).timestamp() as u64,
            iat: Utc::now().timestamp() as u64,
        };
        let jwt = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(KEY.as_bytes()),
        )
        .unwrap();

        assert_eq!(authenticate(KEY, &jwt).unwrap(), 7);
    }

    #[test]
    fn test_rejects_wrong_key_and_expired_tokens() {
        let api_key = generate_api_key(KEY, 1, Duration::hours(1)).unwrap();
        assert!(matches!(
            authenticate("other-secret", &api_key),
            Err(ServerError::AuthenticationError(_))
        ));

        let expired = generate_api_key(KEY, 1, Duration::hours(-2)).unwrap();
        assert!(matches!(
            authenticate(KEY, &expired),
            Err(ServerError::AuthenticationError(_))
        ));

        assert!(authenticate(KEY, "berth_garbage").is_err());
    }

    #[test]
    fn test_convert_rejects_malformed_jwt() {
        assert!(convert_jwt_to_api_key("only.two").is_err());
    }
}
