use serde::Deserialize;

use crate::error::AuthError;

/// Claims read from a Cognito id or access token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
    #[serde(default)]
    pub token_use: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Present on id tokens.
    #[serde(rename = "cognito:username", default)]
    pub cognito_username: Option<String>,
    /// Present on access tokens.
    #[serde(default)]
    pub username: Option<String>,
}

impl TokenClaims {
    pub fn display_name(&self) -> &str {
        self.cognito_username
            .as_deref()
            .or(self.username.as_deref())
            .or(self.email.as_deref())
            .unwrap_or(&self.sub)
    }

    /// Whether the token expires within `skew_secs` of `now` (unix seconds).
    pub fn expires_within(&self, now: i64, skew_secs: i64) -> bool {
        self.exp <= now + skew_secs
    }
}

/// Read the claims of a JWT without verifying its signature.
///
/// The API gateway verifies signatures; the client only needs the expiry
/// and the identity for display.
pub fn peek_claims(token: &str) -> Result<TokenClaims, AuthError> {
    let claims = jsonwebtoken::dangerous::insecure_decode::<TokenClaims>(token)?.claims;

    // Refresh tokens are opaque; anything else must be an id or access token
    let token_use = &claims.token_use;
    if token_use != "id" && token_use != "access" && !token_use.is_empty() {
        return Err(AuthError::InvalidToken(format!(
            "unexpected token_use: {token_use}"
        )));
    }

    Ok(claims)
}

/// Whether `token` is expired (or unreadable) at `now`, allowing `skew_secs` of slack.
pub fn is_expired(token: &str, now: i64, skew_secs: i64) -> bool {
    peek_claims(token)
        .map(|claims| claims.expires_within(now, skew_secs))
        .unwrap_or(true)
}
