//! Storage abstraction for users, saved flags and sessions.

mod file;
mod memory;
mod records;
mod tables;

pub use file::{DATA_FILE, FileStorage};
pub use memory::MemoryStorage;
pub use records::{
    FlagId, FlagPatch, FlagRecord, MAX_NAME_LEN, NewFlag, NewUser, SessionRecord, UserId,
    UserRecord, ValidationError,
};
pub use tables::Tables;

use chrono::Duration;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for storage operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for storage backends.
///
/// Every flag operation is scoped to an owner. A flag owned by someone else
/// is reported exactly like a missing one, and is never modified.
pub trait Storage: Send + Sync {
    /// Create a user. Username and email must be unique.
    fn create_user(&self, user: NewUser) -> BoxFuture<'_, StorageResult<UserRecord>>;

    /// Look up a user by id.
    fn user(&self, id: UserId) -> BoxFuture<'_, StorageResult<Option<UserRecord>>>;

    /// Look up a user by username.
    fn user_by_username(&self, username: &str)
    -> BoxFuture<'_, StorageResult<Option<UserRecord>>>;

    /// Delete a user together with their flags and sessions.
    fn delete_user(&self, id: UserId) -> BoxFuture<'_, StorageResult<bool>>;

    /// All flags of `owner`, in no particular order.
    fn list_flags(&self, owner: UserId) -> BoxFuture<'_, StorageResult<Vec<FlagRecord>>>;

    /// A flag, if it exists and belongs to `owner`.
    fn get_flag(&self, id: FlagId, owner: UserId)
    -> BoxFuture<'_, StorageResult<Option<FlagRecord>>>;

    /// Create a flag with a fresh id and timestamps.
    fn create_flag(&self, owner: UserId, flag: NewFlag)
    -> BoxFuture<'_, StorageResult<FlagRecord>>;

    /// Apply `patch` and refresh `updated_at`, if the flag belongs to `owner`.
    fn update_flag(
        &self,
        id: FlagId,
        owner: UserId,
        patch: FlagPatch,
    ) -> BoxFuture<'_, StorageResult<Option<FlagRecord>>>;

    /// Delete a flag if it belongs to `owner`. Returns whether one was removed.
    fn delete_flag(&self, id: FlagId, owner: UserId) -> BoxFuture<'_, StorageResult<bool>>;

    /// Open a session for `user` lasting `ttl`.
    fn create_session(
        &self,
        user: UserId,
        ttl: Duration,
    ) -> BoxFuture<'_, StorageResult<SessionRecord>>;

    /// The user a live session token belongs to.
    fn session_user(&self, token: &str) -> BoxFuture<'_, StorageResult<Option<UserId>>>;

    /// End a session. Returns whether it existed.
    fn delete_session(&self, token: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

/// Backends that keep a [`Tables`] value behind some lock.
///
/// Implementing this gives a [`Storage`] implementation for free.
pub trait TableStore: Send + Sync {
    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> StorageResult<T>;

    /// Run a mutation. On error nothing is applied.
    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> StorageResult<T>) -> StorageResult<T>;
}

impl<B: TableStore> Storage for B {
    fn create_user(&self, user: NewUser) -> BoxFuture<'_, StorageResult<UserRecord>> {
        Box::pin(async move { self.write(|t| t.create_user(user, chrono::Utc::now())) })
    }

    fn user(&self, id: UserId) -> BoxFuture<'_, StorageResult<Option<UserRecord>>> {
        Box::pin(async move { self.read(|t| t.user(id).cloned()) })
    }

    fn user_by_username(
        &self,
        username: &str,
    ) -> BoxFuture<'_, StorageResult<Option<UserRecord>>> {
        let username = username.to_string();
        Box::pin(async move { self.read(|t| t.user_by_username(&username).cloned()) })
    }

    fn delete_user(&self, id: UserId) -> BoxFuture<'_, StorageResult<bool>> {
        Box::pin(async move { self.write(|t| Ok(t.delete_user(id))) })
    }

    fn list_flags(&self, owner: UserId) -> BoxFuture<'_, StorageResult<Vec<FlagRecord>>> {
        Box::pin(async move { self.read(|t| t.list_flags(owner)) })
    }

    fn get_flag(
        &self,
        id: FlagId,
        owner: UserId,
    ) -> BoxFuture<'_, StorageResult<Option<FlagRecord>>> {
        Box::pin(async move { self.read(|t| t.get_flag(id, owner).cloned()) })
    }

    fn create_flag(
        &self,
        owner: UserId,
        flag: NewFlag,
    ) -> BoxFuture<'_, StorageResult<FlagRecord>> {
        Box::pin(async move { self.write(|t| t.create_flag(owner, flag, chrono::Utc::now())) })
    }

    fn update_flag(
        &self,
        id: FlagId,
        owner: UserId,
        patch: FlagPatch,
    ) -> BoxFuture<'_, StorageResult<Option<FlagRecord>>> {
        Box::pin(async move {
            // Skip the write path for misses so the file backend doesn't
            // rewrite its data file.
            if self.read(|t| t.get_flag(id, owner).is_none())? {
                return Ok(None);
            }
            self.write(|t| Ok(t.update_flag(id, owner, patch, chrono::Utc::now())))
        })
    }

    fn delete_flag(&self, id: FlagId, owner: UserId) -> BoxFuture<'_, StorageResult<bool>> {
        Box::pin(async move {
            if self.read(|t| t.get_flag(id, owner).is_none())? {
                return Ok(false);
            }
            self.write(|t| Ok(t.delete_flag(id, owner)))
        })
    }

    fn create_session(
        &self,
        user: UserId,
        ttl: Duration,
    ) -> BoxFuture<'_, StorageResult<SessionRecord>> {
        Box::pin(async move { self.write(|t| t.create_session(user, ttl, chrono::Utc::now())) })
    }

    fn session_user(&self, token: &str) -> BoxFuture<'_, StorageResult<Option<UserId>>> {
        let token = token.to_string();
        Box::pin(async move { self.read(|t| t.session_user(&token, chrono::Utc::now())) })
    }

    fn delete_session(&self, token: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let token = token.to_string();
        Box::pin(async move { self.write(|t| Ok(t.delete_session(&token))) })
    }
}
