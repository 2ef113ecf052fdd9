//! In-memory store and request helpers for handler tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use axum::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use crate::bugs::{
    repo::BugRepo,
    repo_types::{Bug, BugChanges, NewBug},
};
use crate::db::{Database, StoreError};
use crate::users::{
    repo::UserRepo,
    repo_types::{NewUser, User},
};

#[derive(Default)]
pub struct MemoryDb {
    users: Mutex<Vec<User>>,
    bugs: Mutex<Vec<Bug>>,
    offline: AtomicBool,
    blind_lookup: AtomicBool,
}

impl MemoryDb {
    /// Makes every later `ping` fail.
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    /// Makes `find_user_conflict` report nothing, so only the insert's
    /// uniqueness check can catch a duplicate (a lost registration race).
    pub fn blind_conflict_lookup(&self) {
        self.blind_lookup.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserRepo for MemoryDb {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_conflict(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        if self.blind_lookup.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.username == username || u.email == email)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate("users_username_key".into()));
        }
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("users_email_key".into()));
        }
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl BugRepo for MemoryDb {
    async fn create_bug(&self, bug: NewBug) -> Result<Bug, StoreError> {
        let now = OffsetDateTime::now_utc();
        let created = Bug {
            id: Uuid::new_v4(),
            title: bug.title,
            description: bug.description,
            status: bug.status,
            priority: bug.priority,
            category: bug.category,
            created_at: now,
            updated_at: now,
        };
        self.bugs.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn list_bugs(&self) -> Result<Vec<Bug>, StoreError> {
        let mut bugs = self.bugs.lock().unwrap().clone();
        bugs.reverse();
        Ok(bugs)
    }

    async fn get_bug(&self, id: Uuid) -> Result<Option<Bug>, StoreError> {
        let bugs = self.bugs.lock().unwrap();
        Ok(bugs.iter().find(|b| b.id == id).cloned())
    }

    async fn update_bug(&self, id: Uuid, changes: BugChanges) -> Result<Option<Bug>, StoreError> {
        let mut bugs = self.bugs.lock().unwrap();
        Ok(bugs.iter_mut().find(|b| b.id == id).map(|bug| {
            changes.apply_to(bug);
            bug.updated_at = OffsetDateTime::now_utc();
            bug.clone()
        }))
    }

    async fn delete_bug(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut bugs = self.bugs.lock().unwrap();
        let before = bugs.len();
        bugs.retain(|b| b.id != id);
        Ok(bugs.len() < before)
    }
}

#[async_trait]
impl Database for MemoryDb {
    async fn ping(&self) -> Result<String, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok("memory".into())
    }
}

/// Sends one request through the router and returns status, headers and raw body.
pub async fn send_request(app: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    (status, headers, bytes.to_vec())
}

/// JSON request with an optional bearer token; the response body is parsed as JSON
/// (`Value::Null` when it is not JSON).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let (status, _, bytes) = send_request(app, req).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Sends `raw` verbatim as an `application/json` body.
pub async fn send_raw_json(app: &Router, method: &str, uri: &str, raw: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(raw.to_string()))
        .unwrap();
    let (status, _, bytes) = send_request(app, req).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Registers a user and returns its token.
pub async fn register_user(app: &Router, username: &str, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/users/register",
        None,
        Some(serde_json::json!({ "username": username, "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body["token"].as_str().expect("token").to_string()
}
