use std::collections::HashMap;

use aws_sdk_cognitoidentityprovider::Client;
use aws_sdk_cognitoidentityprovider::types::{AuthFlowType, ChallengeNameType};
use tracing::info;

use crate::error::AuthError;
use crate::session::SessionTokens;

/// Result of an initial authentication attempt.
pub enum AuthResult {
    /// Authentication succeeded, tokens returned.
    Success(SessionTokens),
    /// MFA challenge required — caller must provide TOTP code.
    MfaChallenge { session: String },
}

/// The signed-in user as Cognito reports it.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
    pub email: Option<String>,
}

fn tokens_from(
    result: &aws_sdk_cognitoidentityprovider::types::AuthenticationResultType,
    fallback_refresh: Option<&str>,
) -> SessionTokens {
    SessionTokens {
        access_token: result.access_token().unwrap_or_default().to_string(),
        id_token: result.id_token().unwrap_or_default().to_string(),
        refresh_token: result
            .refresh_token()
            .or(fallback_refresh)
            .unwrap_or_default()
            .to_string(),
    }
}

/// Initiate username/password authentication with Cognito.
pub async fn initiate_auth(
    client: &Client,
    user_pool_client_id: &str,
    username: &str,
    password: &str,
) -> Result<AuthResult, AuthError> {
    info!(username = username, "initiating auth");

    let mut auth_params = HashMap::new();
    auth_params.insert("USERNAME".to_string(), username.to_string());
    auth_params.insert("PASSWORD".to_string(), password.to_string());

    let resp = client
        .initiate_auth()
        .auth_flow(AuthFlowType::UserPasswordAuth)
        .client_id(user_pool_client_id)
        .set_auth_parameters(Some(auth_params))
        .send()
        .await
        .map_err(|e| {
            let err = e.into_service_error();
            if err.is_not_authorized_exception() || err.is_user_not_found_exception() {
                AuthError::AuthFailed(err.to_string())
            } else {
                AuthError::Cognito(err.to_string())
            }
        })?;

    if let Some(result) = resp.authentication_result() {
        Ok(AuthResult::Success(tokens_from(result, None)))
    } else if resp.challenge_name() == Some(&ChallengeNameType::SoftwareTokenMfa) {
        let session = resp.session().unwrap_or_default().to_string();
        Ok(AuthResult::MfaChallenge { session })
    } else if let Some(challenge) = resp.challenge_name() {
        Err(AuthError::AuthFailed(format!(
            "unsupported challenge: {}",
            challenge.as_str()
        )))
    } else {
        Err(AuthError::AuthFailed("unexpected response".to_string()))
    }
}

/// Respond to an MFA challenge with a TOTP code.
pub async fn respond_to_mfa(
    client: &Client,
    user_pool_client_id: &str,
    username: &str,
    session: &str,
    mfa_code: &str,
) -> Result<SessionTokens, AuthError> {
    info!(username = username, "responding to MFA challenge");

    let mut challenge_responses = HashMap::new();
    challenge_responses.insert("USERNAME".to_string(), username.to_string());
    challenge_responses.insert("SOFTWARE_TOKEN_MFA_CODE".to_string(), mfa_code.to_string());

    let resp = client
        .respond_to_auth_challenge()
        .client_id(user_pool_client_id)
        .challenge_name(ChallengeNameType::SoftwareTokenMfa)
        .set_challenge_responses(Some(challenge_responses))
        .session(session)
        .send()
        .await
        .map_err(|e| AuthError::MfaFailed(e.into_service_error().to_string()))?;

    resp.authentication_result()
        .map(|result| tokens_from(result, None))
        .ok_or_else(|| AuthError::MfaFailed("MFA response did not return tokens".to_string()))
}

/// Refresh tokens using a refresh token.
///
/// An expired or revoked refresh token surfaces as [`AuthError::TokenExpired`].
pub async fn refresh_auth(
    client: &Client,
    user_pool_client_id: &str,
    refresh_token: &str,
) -> Result<SessionTokens, AuthError> {
    let mut auth_params = HashMap::new();
    auth_params.insert("REFRESH_TOKEN".to_string(), refresh_token.to_string());

    let resp = client
        .initiate_auth()
        .auth_flow(AuthFlowType::RefreshTokenAuth)
        .client_id(user_pool_client_id)
        .set_auth_parameters(Some(auth_params))
        .send()
        .await
        .map_err(|e| {
            let err = e.into_service_error();
            if err.is_not_authorized_exception() {
                AuthError::TokenExpired
            } else {
                AuthError::Cognito(err.to_string())
            }
        })?;

    // Refresh token is not returned on refresh; keep the one we have.
    resp.authentication_result()
        .map(|result| tokens_from(result, Some(refresh_token)))
        .ok_or_else(|| AuthError::AuthFailed("refresh failed".to_string()))
}

/// Look up the user an access token belongs to.
pub async fn get_user(client: &Client, access_token: &str) -> Result<CurrentUser, AuthError> {
    let resp = client
        .get_user()
        .access_token(access_token)
        .send()
        .await
        .map_err(|e| {
            let err = e.into_service_error();
            if err.is_not_authorized_exception() {
                AuthError::TokenExpired
            } else {
                AuthError::Cognito(err.to_string())
            }
        })?;

    let email = resp
        .user_attributes()
        .iter()
        .find(|attr| attr.name() == "email")
        .and_then(|attr| attr.value())
        .map(str::to_string);

    Ok(CurrentUser {
        username: resp.username().to_string(),
        email,
    })
}

/// Revoke every token issued to the user, on all devices.
pub async fn global_sign_out(client: &Client, access_token: &str) -> Result<(), AuthError> {
    client
        .global_sign_out()
        .access_token(access_token)
        .send()
        .await
        .map_err(|e| AuthError::Cognito(e.into_service_error().to_string()))?;

    info!("signed out globally");
    Ok(())
}
