use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Bug, BugChanges, BugRow, NewBug};
use crate::db::StoreError;

#[async_trait]
pub trait BugRepo: Send + Sync {
    async fn create_bug(&self, bug: NewBug) -> Result<Bug, StoreError>;

    /// Every bug, newest first. No paging.
    async fn list_bugs(&self) -> Result<Vec<Bug>, StoreError>;

    async fn get_bug(&self, id: Uuid) -> Result<Option<Bug>, StoreError>;

    /// `None` when no bug has this id.
    async fn update_bug(&self, id: Uuid, changes: BugChanges) -> Result<Option<Bug>, StoreError>;

    /// `false` when no bug has this id.
    async fn delete_bug(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
impl BugRepo for PgPool {
    async fn create_bug(&self, bug: NewBug) -> Result<Bug, StoreError> {
        let row = sqlx::query_as::<_, BugRow>(
            r#"
            INSERT INTO bugs (id, title, description, status, priority, category)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, status, priority, category, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&bug.title)
        .bind(&bug.description)
        .bind(bug.status.as_str())
        .bind(bug.priority.as_str())
        .bind(&bug.category)
        .fetch_one(self)
        .await?;
        row.try_into()
    }

    async fn list_bugs(&self) -> Result<Vec<Bug>, StoreError> {
        let rows = sqlx::query_as::<_, BugRow>(
            r#"
            SELECT id, title, description, status, priority, category, created_at, updated_at
            FROM bugs
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(self)
        .await?;
        rows.into_iter().map(Bug::try_from).collect()
    }

    async fn get_bug(&self, id: Uuid) -> Result<Option<Bug>, StoreError> {
        let row = sqlx::query_as::<_, BugRow>(
            r#"
            SELECT id, title, description, status, priority, category, created_at, updated_at
            FROM bugs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self)
        .await?;
        row.map(Bug::try_from).transpose()
    }

    async fn update_bug(&self, id: Uuid, changes: BugChanges) -> Result<Option<Bug>, StoreError> {
        let row = sqlx::query_as::<_, BugRow>(
            r#"
            UPDATE bugs
               SET title       = COALESCE($2, title),
                   description = COALESCE($3, description),
                   status      = COALESCE($4, status),
                   priority    = COALESCE($5, priority),
                   category    = COALESCE($6, category),
                   updated_at  = now()
             WHERE id = $1
            RETURNING id, title, description, status, priority, category, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(changes.priority.map(|p| p.as_str()))
        .bind(changes.category)
        .fetch_optional(self)
        .await?;
        row.map(Bug::try_from).transpose()
    }

    async fn delete_bug(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM bugs WHERE id = $1")
            .bind(id)
            .execute(self)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
