use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::StoreError;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BugStatus {
    #[default]
    Open,
    #[serde(alias = "in_progress")]
    InProgress,
    Resolved,
    Closed,
}

impl BugStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BugStatus::Open => "open",
            BugStatus::InProgress => "in-progress",
            BugStatus::Resolved => "resolved",
            BugStatus::Closed => "closed",
        }
    }
}

impl FromStr for BugStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(BugStatus::Open),
            "in-progress" | "in_progress" => Ok(BugStatus::InProgress),
            "resolved" => Ok(BugStatus::Resolved),
            "closed" => Ok(BugStatus::Closed),
            other => Err(format!("unknown bug status {other:?}")),
        }
    }
}

impl fmt::Display for BugStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            other => Err(format!("unknown priority {other:?}")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bug as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bug {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: BugStatus,
    pub priority: Priority,
    pub category: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Raw `bugs` row; enums are stored as text.
#[derive(Debug, FromRow)]
pub struct BugRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub category: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<BugRow> for Bug {
    type Error = StoreError;

    fn try_from(r: BugRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            title: r.title,
            description: r.description,
            status: r.status.parse().map_err(StoreError::Corrupt)?,
            priority: r.priority.parse().map_err(StoreError::Corrupt)?,
            category: r.category,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Validated fields for a new bug.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBug {
    pub title: String,
    pub description: String,
    pub status: BugStatus,
    pub priority: Priority,
    pub category: String,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BugChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<BugStatus>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
}

/// In-memory counterpart of the `COALESCE` update in `repo.rs`.
#[cfg(test)]
impl BugChanges {
    pub fn apply_to(&self, bug: &mut Bug) {
        if let Some(title) = &self.title {
            bug.title = title.clone();
        }
        if let Some(description) = &self.description {
            bug.description = description.clone();
        }
        if let Some(status) = self.status {
            bug.status = status;
        }
        if let Some(priority) = self.priority {
            bug.priority = priority;
        }
        if let Some(category) = &self.category {
            bug.category = category.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_roundtrips_through_storage_form() {
        for s in [BugStatus::Open, BugStatus::InProgress, BugStatus::Resolved, BugStatus::Closed] {
            assert_eq!(s.as_str().parse::<BugStatus>().unwrap(), s);
            assert_eq!(serde_json::to_value(s).unwrap(), s.as_str());
        }
        assert_eq!(serde_json::from_str::<BugStatus>("\"in_progress\"").unwrap(), BugStatus::InProgress);
        assert!("reopened".parse::<BugStatus>().is_err());
    }

    #[test]
    fn corrupt_row_is_reported() {
        let now = OffsetDateTime::now_utc();
        let row = BugRow {
            id: Uuid::new_v4(),
            title: "t".into(),
            description: "d".into(),
            status: "weird".into(),
            priority: "high".into(),
            category: "backend".into(),
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(Bug::try_from(row), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn bug_serializes_with_document_id_and_camel_case() {
        let now = OffsetDateTime::now_utc();
        let bug = Bug {
            id: Uuid::new_v4(),
            title: "Crash on save".into(),
            description: "...".into(),
            status: BugStatus::Open,
            priority: Priority::High,
            category: "backend".into(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&bug).unwrap();
        assert_eq!(json["_id"], serde_json::json!(bug.id));
        assert_eq!(json["priority"], "high");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
    }
}
