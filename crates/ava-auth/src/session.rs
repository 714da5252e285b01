//! Session state behind outbound API calls.
//!
//! The API client asks a [`TokenProvider`] for an id token before every
//! request and never keeps the answer. [`CognitoSession`] is the real
//! provider: it owns the signed-in user's tokens and refreshes them
//! through Cognito once the id token is about to expire.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use aws_sdk_cognitoidentityprovider::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::AuthError;
use crate::flows::{self, AuthResult};
use crate::jwt;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Seconds before expiry at which a token is treated as already expired.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// Supplies a current identity token on demand.
pub trait TokenProvider: Send + Sync {
    /// Resolve the id token to send as the bearer credential.
    fn id_token(&self) -> BoxFuture<'_, Result<String, AuthError>>;
}

/// Tokens issued to a signed-in user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"<redacted>")
            .field("id_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// A Cognito user-pool session.
pub struct CognitoSession {
    client: Client,
    user_pool_client_id: String,
    tokens: Mutex<Option<SessionTokens>>,
}

impl CognitoSession {
    pub fn new(client: Client, user_pool_client_id: impl Into<String>) -> Self {
        Self {
            client,
            user_pool_client_id: user_pool_client_id.into(),
            tokens: Mutex::new(None),
        }
    }

    /// Resume a session from previously issued tokens.
    pub fn with_tokens(self, tokens: SessionTokens) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
            ..self
        }
    }

    /// Sign in with username and password.
    ///
    /// Returns [`AuthError::MfaRequired`] carrying the challenge session when
    /// the pool asks for a TOTP code; finish with [`Self::sign_in_with_mfa`].
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<(), AuthError> {
        match flows::initiate_auth(&self.client, &self.user_pool_client_id, username, password)
            .await?
        {
            AuthResult::Success(tokens) => {
                *self.tokens.lock().await = Some(tokens);
                info!(username, "signed in");
                Ok(())
            }
            AuthResult::MfaChallenge { session } => Err(AuthError::MfaRequired { session }),
        }
    }

    pub async fn sign_in_with_mfa(
        &self,
        username: &str,
        session: &str,
        mfa_code: &str,
    ) -> Result<(), AuthError> {
        let tokens = flows::respond_to_mfa(
            &self.client,
            &self.user_pool_client_id,
            username,
            session,
            mfa_code,
        )
        .await?;
        *self.tokens.lock().await = Some(tokens);
        info!(username, "signed in with MFA");
        Ok(())
    }

    /// Forget the local tokens, handing back what was held so the caller
    /// can revoke it.
    pub async fn sign_out(&self) -> Option<SessionTokens> {
        self.tokens.lock().await.take()
    }

    /// Current tokens, for persisting between runs.
    pub async fn snapshot(&self) -> Option<SessionTokens> {
        self.tokens.lock().await.clone()
    }

    /// Tokens valid for at least [`EXPIRY_SKEW_SECS`], refreshing if needed.
    pub async fn fresh_tokens(&self) -> Result<SessionTokens, AuthError> {
        let mut guard = self.tokens.lock().await;
        let current = guard.as_ref().ok_or(AuthError::NoSession)?;

        let now = jiff::Timestamp::now().as_second();
        if !jwt::is_expired(&current.id_token, now, EXPIRY_SKEW_SECS) {
            return Ok(current.clone());
        }

        if current.refresh_token.is_empty() {
            return Err(AuthError::TokenExpired);
        }

        debug!("id token expired, refreshing session");
        let refreshed =
            flows::refresh_auth(&self.client, &self.user_pool_client_id, &current.refresh_token)
                .await?;
        *guard = Some(refreshed.clone());
        Ok(refreshed)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl TokenProvider for CognitoSession {
    fn id_token(&self) -> BoxFuture<'_, Result<String, AuthError>> {
        Box::pin(async move { Ok(self.fresh_tokens().await?.id_token) })
    }
}

/// A provider that always returns the same token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenProvider for StaticToken {
    fn id_token(&self) -> BoxFuture<'_, Result<String, AuthError>> {
        let token = self.0.clone();
        Box::pin(async move {
            if token.is_empty() {
                Err(AuthError::NoSession)
            } else {
                Ok(token)
            }
        })
    }
}
