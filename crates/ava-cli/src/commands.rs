use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ava_api::{ApiClient, ApiError};
use ava_auth::client::build_client_with_region;
use ava_auth::error::AuthError;
use ava_auth::flows;
use ava_auth::session::CognitoSession;
use ava_core::models::chat_request::{ChatRequest, TextInferenceConfig};
use ava_core::models::chat_response::ChatResponse;
use tokio_util::sync::CancellationToken;

use ava_cli::config::{AuthConfig, CliConfig};
use ava_cli::prompt;
use ava_cli::session_store::{self, StoredSession};

/// A restored session plus what is needed to write it back.
struct Signed {
    session: Arc<CognitoSession>,
    username: String,
}

async fn new_session(auth: &AuthConfig) -> CognitoSession {
    let client = build_client_with_region(&auth.region).await;
    CognitoSession::new(client, auth.user_pool_client_id.clone())
}

/// Resume the stored session, or fail asking the user to sign in.
async fn require_session(auth: &AuthConfig, dir: &Path) -> eyre::Result<Signed> {
    let stored = session_store::load(dir, &auth.user_pool_client_id)?
        .ok_or_else(|| eyre::eyre!("not signed in; run `ava login` first"))?;

    let session = new_session(auth).await.with_tokens(stored.tokens);
    Ok(Signed {
        session: Arc::new(session),
        username: stored.username,
    })
}

/// Write refreshed tokens back so the next run starts from them.
async fn persist(auth: &AuthConfig, dir: &Path, signed: &Signed) -> eyre::Result<()> {
    if let Some(tokens) = signed.session.snapshot().await {
        session_store::save(
            dir,
            &StoredSession::new(&auth.user_pool_client_id, &signed.username, tokens),
        )?;
    }
    Ok(())
}

fn signed_out_hint(e: ApiError) -> eyre::Report {
    match e {
        ApiError::Auth(AuthError::NoSession | AuthError::TokenExpired) => {
            eyre::eyre!("session expired; run `ava login` again")
        }
        other => other.into(),
    }
}

pub async fn login(
    auth: &AuthConfig,
    dir: &Path,
    username: &str,
    password: Option<String>,
) -> eyre::Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt::ask("Password", true).await?,
    };

    let session = new_session(auth).await;
    match session.sign_in(username, &password).await {
        Ok(()) => {}
        Err(AuthError::MfaRequired { session: challenge }) => {
            let code = prompt::ask("MFA code", false).await?;
            session.sign_in_with_mfa(username, &challenge, &code).await?;
        }
        Err(e) => return Err(e.into()),
    }

    let tokens = session
        .snapshot()
        .await
        .ok_or_else(|| eyre::eyre!("sign-in returned no tokens"))?;
    session_store::save(dir, &StoredSession::new(&auth.user_pool_client_id, username, tokens))?;

    println!("Signed in as {username}");
    Ok(())
}

pub async fn logout(auth: &AuthConfig, dir: &Path) -> eyre::Result<()> {
    if let Some(stored) = session_store::load(dir, &auth.user_pool_client_id)? {
        let session = new_session(auth).await.with_tokens(stored.tokens);
        if let Some(tokens) = session.sign_out().await {
            if let Err(e) = flows::global_sign_out(session.client(), &tokens.access_token).await {
                tracing::warn!(error = %e, "global sign-out failed; removing local session anyway");
            }
        }
    }
    session_store::delete(dir)?;
    println!("Signed out");
    Ok(())
}

pub async fn whoami(auth: &AuthConfig, dir: &Path) -> eyre::Result<()> {
    let signed = require_session(auth, dir).await?;
    let tokens = signed
        .session
        .fresh_tokens()
        .await
        .map_err(|e| signed_out_hint(e.into()))?;
    let user = flows::get_user(signed.session.client(), &tokens.access_token).await?;
    persist(auth, dir, &signed).await?;

    match user.email {
        Some(email) => println!("{} <{email}>", user.username),
        None => println!("{}", user.username),
    }
    Ok(())
}

pub async fn models(config: &CliConfig, dir: &Path, json: bool) -> eyre::Result<()> {
    let signed = require_session(&config.auth, dir).await?;
    let api = ApiClient::new(config.api.clone(), signed.session.clone())?;
    let models = api.list_models().await.map_err(signed_out_hint)?;
    persist(&config.auth, dir, &signed).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&models)?);
    } else {
        for m in &models {
            println!("{}\t{}", m.model_name, m.model_arn);
        }
    }
    Ok(())
}

pub async fn knowledge_bases(config: &CliConfig, dir: &Path, json: bool) -> eyre::Result<()> {
    let signed = require_session(&config.auth, dir).await?;
    let api = ApiClient::new(config.api.clone(), signed.session.clone())?;
    let kbs = api.list_knowledge_bases().await.map_err(signed_out_hint)?;
    persist(&config.auth, dir, &signed).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&kbs)?);
    } else {
        for kb in &kbs {
            println!("{}\t{}", kb.id, kb.name);
        }
    }
    Ok(())
}

pub struct AskOptions {
    pub knowledge_base: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub stop: Vec<String>,
    pub template_file: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub json: bool,
    pub message: String,
}

pub async fn ask(config: &CliConfig, dir: &Path, opts: AskOptions) -> eyre::Result<()> {
    let mut request = ChatRequest::new(opts.message, opts.knowledge_base, opts.model)
        .with_inference_config(
            TextInferenceConfig::new(opts.max_tokens, opts.temperature, opts.top_p)
                .with_stop_sequences(opts.stop),
        );
    if let Some(path) = &opts.template_file {
        let template = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("failed to read template {}: {e}", path.display()))?;
        request = request.with_prompt_template(template);
    }
    request.validate()?;

    let signed = require_session(&config.auth, dir).await?;
    let api = ApiClient::new(config.api.clone(), signed.session.clone())?;

    let mut policy = api.poll_policy().clone();
    if let Some(timeout) = opts.timeout {
        policy = policy.with_max_wait(timeout);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let result = ava_api::ask(&api, &request, &policy, &cancel).await;
    persist(&config.auth, dir, &signed).await?;
    let response = result.map_err(signed_out_hint)?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(response.as_value())?);
    } else {
        print_answer(&response);
    }
    Ok(())
}

fn print_answer(response: &ChatResponse) {
    println!("{}", response.text());
    let sources = response.source_uris();
    if !sources.is_empty() {
        println!();
        println!("Sources:");
        for uri in sources {
            println!("  {uri}");
        }
    }
}
