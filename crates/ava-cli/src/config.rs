use ava_api::ApiConfig;
use ava_auth::client::region_from_user_pool_id;

pub const USER_POOL_ID_VAR: &str = "AVA_COGNITO_USER_POOL_ID";
pub const CLIENT_ID_VAR: &str = "AVA_COGNITO_CLIENT_ID";
pub const IDENTITY_POOL_ID_VAR: &str = "AVA_COGNITO_IDENTITY_POOL_ID";
pub const REGION_VAR: &str = "AWS_REGION";

/// Identity-provider settings needed to sign users in.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub user_pool_id: String,
    pub user_pool_client_id: String,
    /// Carried for completeness; API calls only need user-pool tokens.
    pub identity_pool_id: Option<String>,
    pub region: String,
}

impl AuthConfig {
    pub fn from_env() -> eyre::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> eyre::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| eyre::eyre!("{key} is not defined in environment variables"))
        };

        let user_pool_id = required(USER_POOL_ID_VAR)?;
        let user_pool_client_id = required(CLIENT_ID_VAR)?;
        let identity_pool_id = lookup(IDENTITY_POOL_ID_VAR).filter(|v| !v.trim().is_empty());

        let region = match lookup(REGION_VAR).filter(|v| !v.trim().is_empty()) {
            Some(region) => region,
            None => region_from_user_pool_id(&user_pool_id)
                .ok_or_else(|| {
                    eyre::eyre!("cannot derive a region from user pool id {user_pool_id:?}; set {REGION_VAR}")
                })?
                .to_string(),
        };

        Ok(Self {
            user_pool_id,
            user_pool_client_id,
            identity_pool_id,
            region,
        })
    }
}

/// Everything the CLI reads from the environment at startup.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
}

impl CliConfig {
    /// Fails fast when the API URL or identity-provider ids are missing.
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            api: ApiConfig::from_env()?,
            auth: AuthConfig::from_env()?,
        })
    }
}
