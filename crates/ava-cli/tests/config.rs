use ava_auth::session::SessionTokens;
use ava_cli::config::AuthConfig;
use ava_cli::session_store::{self, StoredSession};

fn tokens() -> SessionTokens {
    SessionTokens {
        access_token: "access".to_string(),
        id_token: "id".to_string(),
        refresh_token: "refresh".to_string(),
    }
}

#[test]
fn region_is_derived_from_user_pool() {
    let auth = AuthConfig::from_lookup(|key| match key {
        "AVA_COGNITO_USER_POOL_ID" => Some("eu-west-1_Pool1".to_string()),
        "AVA_COGNITO_CLIENT_ID" => Some("client-1".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(auth.region, "eu-west-1");
    assert!(auth.identity_pool_id.is_none());
}

#[test]
fn explicit_region_wins() {
    let auth = AuthConfig::from_lookup(|key| match key {
        "AVA_COGNITO_USER_POOL_ID" => Some("eu-west-1_Pool1".to_string()),
        "AVA_COGNITO_CLIENT_ID" => Some("client-1".to_string()),
        "AWS_REGION" => Some("us-east-2".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(auth.region, "us-east-2");
}

#[test]
fn missing_client_id_is_fatal() {
    let err = AuthConfig::from_lookup(|key| match key {
        "AVA_COGNITO_USER_POOL_ID" => Some("eu-west-1_Pool1".to_string()),
        _ => None,
    })
    .unwrap_err();
    assert!(err.to_string().contains("AVA_COGNITO_CLIENT_ID"));
}

#[test]
fn session_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    assert!(session_store::load(dir.path(), "client-1").unwrap().is_none());

    session_store::save(dir.path(), &StoredSession::new("client-1", "ada", tokens())).unwrap();
    let loaded = session_store::load(dir.path(), "client-1").unwrap().unwrap();
    assert_eq!(loaded.username, "ada");
    assert_eq!(loaded.tokens, tokens());

    session_store::delete(dir.path()).unwrap();
    assert!(session_store::load(dir.path(), "client-1").unwrap().is_none());
}

#[test]
fn session_for_another_client_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    session_store::save(dir.path(), &StoredSession::new("client-1", "ada", tokens())).unwrap();
    assert!(session_store::load(dir.path(), "client-2").unwrap().is_none());
}

#[cfg(unix)]
#[test]
fn session_file_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    session_store::save(dir.path(), &StoredSession::new("client-1", "ada", tokens())).unwrap();
    let mode = std::fs::metadata(dir.path().join("session.json"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[cfg(unix)]
#[test]
fn stale_temp_file_is_replaced_privately() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    // A stale temp file left world-readable by an interrupted save
    let stale = dir.path().join("session.json.tmp");
    std::fs::write(&stale, "{}").unwrap();
    std::fs::set_permissions(&stale, std::fs::Permissions::from_mode(0o644)).unwrap();

    session_store::save(dir.path(), &StoredSession::new("client-1", "ada", tokens())).unwrap();
    let mode = std::fs::metadata(dir.path().join("session.json"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
    assert!(!stale.exists());
}
