//! Stored records and their validated inputs.

use crate::export::{DataUrl, DataUrlError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type UserId = u64;
pub type FlagId = u64;

/// Longest allowed flag name, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// Why a flag payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Flag name is empty")]
    EmptyName,
    #[error("Flag name is longer than {} characters", MAX_NAME_LEN)]
    NameTooLong,
    #[error("Invalid image data: {0}")]
    ImageData(#[from] DataUrlError),
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    #[serde(default)]
    pub password_hash: String,
    pub email: String,
    pub name: String,
}

/// A saved flag design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagRecord {
    pub id: FlagId,
    pub owner_id: UserId,
    pub name: String,
    /// The image as a data URL.
    pub image_data: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFlag {
    pub name: String,
    #[serde(alias = "canvasData")]
    pub image_data: String,
}

impl NewFlag {
    pub fn new(name: impl Into<String>, image_data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_data: image_data.into(),
        }
    }

    /// Trim the name and check both fields.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.name = validate_name(&self.name)?;
        DataUrl::parse(&self.image_data)?;
        Ok(self)
    }
}

/// Partial update of a flag. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, alias = "canvasData", skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

impl FlagPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn image_data(image_data: impl Into<String>) -> Self {
        Self {
            image_data: Some(image_data.into()),
            ..Self::default()
        }
    }

    /// Trim the name and check whichever fields are present.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        if let Some(name) = &self.name {
            self.name = Some(validate_name(name)?);
        }
        if let Some(image_data) = &self.image_data {
            DataUrl::parse(image_data)?;
        }
        Ok(self)
    }
}

/// A login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }
    Ok(trimmed.to_string())
}
