/// JWT validation for post-service
///
/// Access tokens are minted by the identity service; this service only
/// validates them. RS256 only, no symmetric algorithms, to prevent
/// algorithm-confusion attacks. The decoding key is loaded once at startup
/// and immutable thereafter.
use anyhow::{anyhow, Result};
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// JWT algorithm - MUST be RS256
const JWT_ALGORITHM: Algorithm = Algorithm::RS256;

/// JWT claims carried by access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token type: "access" or "refresh"
    pub token_type: String,
}

static JWT_DECODING_KEY: OnceCell<DecodingKey> = OnceCell::new();

/// Install the RS256 public key used for token validation.
///
/// Must be called during startup before any request is served. Calling it
/// twice is an error.
pub fn initialize_validation(public_key_pem: &str) -> Result<()> {
    let key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
        .map_err(|e| anyhow!("invalid JWT public key: {}", e))?;

    JWT_DECODING_KEY
        .set(key)
        .map_err(|_| anyhow!("JWT validation key already initialized"))
}

/// Validate a bearer token and return its claims.
///
/// Rejects expired tokens, non-RS256 tokens, and refresh tokens presented as
/// access tokens.
pub fn validate_token(token: &str) -> Result<TokenData<Claims>> {
    let key = JWT_DECODING_KEY
        .get()
        .ok_or_else(|| anyhow!("JWT validation key not initialized"))?;

    let mut validation = Validation::new(JWT_ALGORITHM);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, key, &validation)
        .map_err(|e| anyhow!("token validation failed: {}", e))?;

    if data.claims.token_type != "access" {
        return Err(anyhow!("expected access token"));
    }

    Ok(data)
}
