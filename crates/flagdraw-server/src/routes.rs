//! Route handlers.

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult, StorageContext};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use flagdraw_core::storage::{FlagId, FlagPatch, FlagRecord, NewFlag, UserId, UserRecord};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Health check
pub async fn health() -> &'static str {
    "ok"
}

/// Account details, without credentials.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for UserView {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

pub async fn current_user(
    user: CurrentUser,
    State(state): State<AppState>,
) -> ApiResult<Json<UserView>> {
    let record = state
        .storage
        .user(user.id)
        .await
        .context("Failed to fetch user")?
        // Session outlived its account.
        .ok_or(ApiError::Unauthenticated)?;
    Ok(Json(record.into()))
}

pub async fn list_flags(
    user: CurrentUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<FlagRecord>>> {
    let flags = state
        .storage
        .list_flags(user.id)
        .await
        .context("Failed to fetch flags")?;
    Ok(Json(flags))
}

pub async fn create_flag(
    user: CurrentUser,
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<FlagRecord>)> {
    let flag = parse_body::<NewFlag>(&body)?
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let record = state
        .storage
        .create_flag(user.id, flag)
        .await
        .context("Failed to create flag")?;
    tracing::info!("User {} created flag {}", user.id, record.id);
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_flag(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<FlagRecord>> {
    let id = parse_id(&id)?;
    state
        .storage
        .get_flag(id, user.id)
        .await
        .context("Failed to fetch flag")?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub async fn update_flag(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<FlagRecord>> {
    let patch = parse_body::<FlagPatch>(&body)?
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let id = parse_id(&id)?;
    state
        .storage
        .update_flag(id, user.id, patch)
        .await
        .context("Failed to update flag")?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub async fn delete_flag(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    let deleted = state
        .storage
        .delete_flag(id, user.id)
        .await
        .context("Failed to delete flag")?;
    if !deleted {
        return Err(ApiError::NotFound);
    }
    tracing::info!("User {} deleted flag {}", user.id, id);
    Ok(StatusCode::NO_CONTENT)
}

/// Ids that aren't numbers can't name a flag.
fn parse_id(raw: &str) -> ApiResult<FlagId> {
    raw.parse().map_err(|_| ApiError::NotFound)
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| ApiError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(matches!(parse_id("abc"), Err(ApiError::NotFound)));
        assert!(matches!(parse_id("-1"), Err(ApiError::NotFound)));
    }

    #[test]
    fn test_parse_body_rejects_non_objects() {
        assert!(matches!(
            parse_body::<NewFlag>(b"[1, 2]"),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            parse_body::<FlagPatch>(b"{\"name\": 5}"),
            Err(ApiError::Validation(_))
        ));
        assert!(parse_body::<FlagPatch>(b"{}").is_ok());
    }
}
