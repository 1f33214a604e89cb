//! The stored tables and the operations on them.

use super::records::{
    FlagId, FlagPatch, FlagRecord, NewFlag, NewUser, SessionRecord, UserId, UserRecord,
};
use super::{StorageError, StorageResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Users, flags and sessions, with id counters.
///
/// Flags reference users; deleting a user deletes their flags and sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tables {
    next_user_id: UserId,
    next_flag_id: FlagId,
    users: BTreeMap<UserId, UserRecord>,
    flags: BTreeMap<FlagId, FlagRecord>,
    #[serde(default)]
    sessions: HashMap<String, SessionRecord>,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            next_user_id: 1,
            next_flag_id: 1,
            users: BTreeMap::new(),
            flags: BTreeMap::new(),
            sessions: HashMap::new(),
        }
    }
}

impl Tables {
    pub fn create_user(&mut self, user: NewUser, now: DateTime<Utc>) -> StorageResult<UserRecord> {
        if self.user_by_username(&user.username).is_some() {
            return Err(StorageError::Conflict(format!(
                "username {:?} is taken",
                user.username
            )));
        }
        if self.users.values().any(|u| u.email == user.email) {
            return Err(StorageError::Conflict(format!(
                "email {:?} is taken",
                user.email
            )));
        }

        let id = self.next_user_id;
        self.next_user_id += 1;
        let record = UserRecord {
            id,
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
            name: user.name,
            created_at: now,
        };
        self.users.insert(id, record.clone());
        Ok(record)
    }

    pub fn user(&self, id: UserId) -> Option<&UserRecord> {
        self.users.get(&id)
    }

    pub fn user_by_username(&self, username: &str) -> Option<&UserRecord> {
        self.users.values().find(|u| u.username == username)
    }

    pub fn delete_user(&mut self, id: UserId) -> bool {
        if self.users.remove(&id).is_none() {
            return false;
        }
        self.flags.retain(|_, flag| flag.owner_id != id);
        self.sessions.retain(|_, session| session.user_id != id);
        true
    }

    pub fn list_flags(&self, owner: UserId) -> Vec<FlagRecord> {
        self.flags
            .values()
            .filter(|flag| flag.owner_id == owner)
            .cloned()
            .collect()
    }

    pub fn get_flag(&self, id: FlagId, owner: UserId) -> Option<&FlagRecord> {
        self.flags.get(&id).filter(|flag| flag.owner_id == owner)
    }

    pub fn create_flag(
        &mut self,
        owner: UserId,
        flag: NewFlag,
        now: DateTime<Utc>,
    ) -> StorageResult<FlagRecord> {
        if !self.users.contains_key(&owner) {
            return Err(StorageError::NotFound(format!("user {}", owner)));
        }

        let id = self.next_flag_id;
        self.next_flag_id += 1;
        let record = FlagRecord {
            id,
            owner_id: owner,
            name: flag.name,
            image_data: flag.image_data,
            created_at: now,
            updated_at: now,
        };
        self.flags.insert(id, record.clone());
        Ok(record)
    }

    pub fn update_flag(
        &mut self,
        id: FlagId,
        owner: UserId,
        patch: FlagPatch,
        now: DateTime<Utc>,
    ) -> Option<FlagRecord> {
        let flag = self
            .flags
            .get_mut(&id)
            .filter(|flag| flag.owner_id == owner)?;
        if let Some(name) = patch.name {
            flag.name = name;
        }
        if let Some(image_data) = patch.image_data {
            flag.image_data = image_data;
        }
        flag.updated_at = now;
        Some(flag.clone())
    }

    pub fn delete_flag(&mut self, id: FlagId, owner: UserId) -> bool {
        match self.flags.get(&id) {
            Some(flag) if flag.owner_id == owner => self.flags.remove(&id).is_some(),
            _ => false,
        }
    }

    pub fn create_session(
        &mut self,
        user: UserId,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> StorageResult<SessionRecord> {
        if !self.users.contains_key(&user) {
            return Err(StorageError::NotFound(format!("user {}", user)));
        }
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| StorageError::Other(format!("session lifetime {} out of range", ttl)))?;

        self.sessions.retain(|_, session| session.expires_at > now);
        let record = SessionRecord {
            token: Uuid::new_v4().simple().to_string(),
            user_id: user,
            expires_at,
        };
        self.sessions.insert(record.token.clone(), record.clone());
        Ok(record)
    }

    pub fn session_user(&self, token: &str, now: DateTime<Utc>) -> Option<UserId> {
        self.sessions
            .get(token)
            .filter(|session| session.expires_at > now)
            .map(|session| session.user_id)
    }

    pub fn delete_session(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }
}
