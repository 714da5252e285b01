//! Persisted sign-in state between CLI runs.

use std::io::Write;
use std::path::{Path, PathBuf};

use ava_auth::session::SessionTokens;
use serde::{Deserialize, Serialize};

/// Bump when the stored shape changes; older files are discarded.
const CURRENT_VERSION: u32 = 1;

const FILE_NAME: &str = "session.json";

/// Overrides the directory the session file lives in.
pub const CONFIG_DIR_VAR: &str = "AVA_CONFIG_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(default)]
    pub version: u32,
    /// App client the tokens were issued to.
    pub user_pool_client_id: String,
    pub username: String,
    pub tokens: SessionTokens,
    pub saved_at: jiff::Timestamp,
}

impl StoredSession {
    pub fn new(user_pool_client_id: &str, username: &str, tokens: SessionTokens) -> Self {
        Self {
            version: CURRENT_VERSION,
            user_pool_client_id: user_pool_client_id.to_string(),
            username: username.to_string(),
            tokens,
            saved_at: jiff::Timestamp::now(),
        }
    }
}

pub fn default_dir() -> eyre::Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_VAR) {
        return Ok(PathBuf::from(dir));
    }
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join("ava"))
}

/// Load the stored session for `user_pool_client_id`.
///
/// Returns `None` when there is no file, the file is from another version,
/// or it belongs to a different app client.
pub fn load(dir: &Path, user_pool_client_id: &str) -> eyre::Result<Option<StoredSession>> {
    let path = dir.join(FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| eyre::eyre!("failed to read session at {}: {e}", path.display()))?;
    let stored: StoredSession = match serde_json::from_str(&contents) {
        Ok(stored) => stored,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable session file");
            return Ok(None);
        }
    };

    if stored.version != CURRENT_VERSION {
        tracing::info!(version = stored.version, "ignoring session file from another version");
        return Ok(None);
    }
    if stored.user_pool_client_id != user_pool_client_id {
        tracing::info!("ignoring session issued to a different app client");
        return Ok(None);
    }

    Ok(Some(stored))
}

pub fn save(dir: &Path, session: &StoredSession) -> eyre::Result<()> {
    std::fs::create_dir_all(dir)?;

    let mut stamped = session.clone();
    stamped.version = CURRENT_VERSION;
    stamped.saved_at = jiff::Timestamp::now();

    let path = dir.join(FILE_NAME);
    let json = serde_json::to_string_pretty(&stamped)?;

    // Write to a temp file then rename for atomicity
    let tmp_path = dir.join(format!("{FILE_NAME}.tmp"));
    if tmp_path.exists() {
        std::fs::remove_file(&tmp_path)?;
    }
    let mut file = open_private(&tmp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&tmp_path, &path)?;

    tracing::debug!(path = %path.display(), "session saved");
    Ok(())
}

/// Create `path` readable only by the owner from the first byte written.
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

pub fn delete(dir: &Path) -> eyre::Result<()> {
    let path = dir.join(FILE_NAME);
    if path.exists() {
        std::fs::remove_file(&path)?;
        tracing::debug!(path = %path.display(), "session deleted");
    }
    Ok(())
}
