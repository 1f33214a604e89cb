//! Account and session provisioning used by the command line.

use flagdraw_core::storage::{NewUser, SessionRecord, Storage, StorageError, StorageResult, UserRecord};

pub async fn add_user(
    storage: &dyn Storage,
    username: &str,
    email: &str,
    name: Option<&str>,
) -> StorageResult<UserRecord> {
    storage
        .create_user(NewUser {
            username: username.to_string(),
            password_hash: String::new(),
            email: email.to_string(),
            name: name.unwrap_or(username).to_string(),
        })
        .await
}

/// Returns whether the user existed.
pub async fn delete_user(storage: &dyn Storage, username: &str) -> StorageResult<bool> {
    match storage.user_by_username(username).await? {
        Some(user) => storage.delete_user(user.id).await,
        None => Ok(false),
    }
}

pub async fn issue_session(
    storage: &dyn Storage,
    username: &str,
    ttl: chrono::Duration,
) -> StorageResult<SessionRecord> {
    let user = storage
        .user_by_username(username)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("user {:?}", username)))?;
    storage.create_session(user.id, ttl).await
}

/// Make sure `username` exists and open a session for it.
///
/// An existing account is reused, so restarting against file storage doesn't
/// fail on the unique username.
pub async fn bootstrap_dev_user(
    storage: &dyn Storage,
    username: &str,
    ttl: chrono::Duration,
) -> StorageResult<SessionRecord> {
    if storage.user_by_username(username).await?.is_none() {
        let email = format!("{}@localhost", username);
        add_user(storage, username, &email, None).await?;
    }
    issue_session(storage, username, ttl).await
}
