use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{BugChanges, BugStatus, NewBug, Priority};
use crate::error::ApiError;

pub const DEFAULT_CATEGORY: &str = "general";

#[derive(Debug, Deserialize)]
pub struct CreateBugRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<BugStatus>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
}

impl CreateBugRequest {
    pub fn validate(self) -> Result<NewBug, ApiError> {
        let title = non_blank(self.title).ok_or_else(|| ApiError::validation("Title is required"))?;
        let description = non_blank(self.description)
            .ok_or_else(|| ApiError::validation("Description is required"))?;
        Ok(NewBug {
            title,
            description,
            status: self.status.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            category: non_blank(self.category).unwrap_or_else(|| DEFAULT_CATEGORY.into()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBugRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<BugStatus>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
}

impl UpdateBugRequest {
    /// Present text fields must not be blank.
    pub fn validate(self) -> Result<BugChanges, ApiError> {
        fn present(value: Option<String>, field: &str) -> Result<Option<String>, ApiError> {
            match value {
                None => Ok(None),
                Some(v) if v.trim().is_empty() => {
                    Err(ApiError::validation(format!("{field} cannot be empty")))
                }
                Some(v) => Ok(Some(v.trim().to_string())),
            }
        }
        Ok(BugChanges {
            title: present(self.title, "Title")?,
            description: present(self.description, "Description")?,
            status: self.status,
            priority: self.priority,
            category: present(self.category, "Category")?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: &'static str,
    #[serde(rename = "_id")]
    pub id: Uuid,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
