//! Client side of the hosted identity, table and storage service.
//!
//! Everything durable (accounts, songs, likes, profiles, file blobs) lives in
//! the external service. Handlers and services only talk to it through the
//! [`Backend`] trait so the test suite can swap in [`memory::MemoryBackend`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod supabase;

#[cfg(test)]
pub mod memory;

pub type BackendResult<T> = core::result::Result<T, BackendError>;

#[derive(Debug, Clone, strum_macros::AsRefStr)]
pub enum BackendError {
    /// The service answered with a non-success status.
    Http { status: u16, message: String },
    /// Credentials or tokens were rejected.
    Unauthorized(String),
    /// A unique constraint was violated.
    Conflict(String),
    Transport(String),
    Decode(String),
}

impl core::fmt::Display for BackendError {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        match self {
            Self::Http { status, message } => write!(fmt, "http {status}: {message}"),
            Self::Unauthorized(msg) => write!(fmt, "unauthorized: {msg}"),
            Self::Conflict(msg) => write!(fmt, "conflict: {msg}"),
            Self::Transport(msg) => write!(fmt, "transport: {msg}"),
            Self::Decode(msg) => write!(fmt, "decode: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

// -- Auth types.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: Value,
    #[serde(default)]
    pub user_metadata: Value,
}

impl AuthUser {
    pub fn role_claim(&self) -> Option<&str> {
        self.app_metadata.get("role").and_then(Value::as_str)
    }

    pub fn username_attribute(&self) -> Option<&str> {
        self.user_metadata.get("username").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) at which the access token expires.
    pub expires_at: i64,
    pub user: AuthUser,
}

#[derive(Debug, Clone)]
pub struct SignUpResult {
    pub user: AuthUser,
    /// `None` when the service requires email confirmation first.
    pub session: Option<AuthSession>,
}

// -- Table types.

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, String),
    /// SQL `ILIKE` pattern, `%` and `_` wildcards.
    ILike(String, String),
    In(String, Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableQuery {
    pub columns: Option<String>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.columns = Some(columns.to_string());
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn ilike(mut self, column: &str, pattern: impl Into<String>) -> Self {
        self.filters
            .push(Filter::ILike(column.to_string(), pattern.into()));
        self
    }

    pub fn is_in(mut self, column: &str, values: Vec<String>) -> Self {
        self.filters.push(Filter::In(column.to_string(), values));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            descending: true,
        });
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            descending: false,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

// -- Storage types.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignedUpload {
    pub path: String,
    pub signed_url: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageObject {
    pub name: String,
    /// Folders come back from a listing without an id.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl StorageObject {
    pub fn is_folder(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ListOptions {
    pub search: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            search: None,
            limit: 100,
            offset: 0,
        }
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str, attributes: Value)
        -> BackendResult<SignUpResult>;

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<AuthSession>;

    async fn sign_out(&self, access_token: &str) -> BackendResult<()>;

    async fn refresh_session(&self, refresh_token: &str) -> BackendResult<AuthSession>;

    async fn reset_password_email(&self, email: &str, redirect_to: Option<&str>)
        -> BackendResult<()>;

    async fn select(&self, table: &str, query: &TableQuery) -> BackendResult<Vec<Value>>;

    /// Inserts one row and returns it as stored.
    async fn insert(&self, table: &str, row: Value) -> BackendResult<Value>;

    async fn update(&self, table: &str, patch: Value, filters: &[Filter]) -> BackendResult<()>;

    /// Returns how many rows were removed.
    async fn delete(&self, table: &str, filters: &[Filter]) -> BackendResult<usize>;

    async fn call_procedure(&self, name: &str, args: Value) -> BackendResult<Value>;

    /// `expires_in_secs` is a hint; the storage service may apply its own fixed expiry.
    async fn create_signed_upload_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in_secs: u64,
    ) -> BackendResult<SignedUpload>;

    /// Lists the direct children of `folder` ("" for the bucket root).
    async fn list_objects(
        &self,
        bucket: &str,
        folder: &str,
        options: &ListOptions,
    ) -> BackendResult<Vec<StorageObject>>;

    fn public_url(&self, bucket: &str, path: &str) -> String;

    async fn remove_objects(&self, bucket: &str, paths: &[String]) -> BackendResult<()>;
}

/// Maps a public URL produced by [`Backend::public_url`] back to its storage path.
pub fn path_from_public_url(backend: &dyn Backend, bucket: &str, url: &str) -> Option<String> {
    let prefix = backend.public_url(bucket, "");
    let path = url.strip_prefix(&prefix)?;
    let path = path.split(['?', '#']).next().unwrap_or(path);

    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

/// Rows requested per page by [`select_all`]. Matches the service's default row cap.
pub const SELECT_PAGE_SIZE: usize = 1000;

/// Reads every row matching `query`, one page at a time.
///
/// The service silently truncates large responses, so a single unbounded
/// `select` is not a complete read. Pages follow the query's order (`id`
/// ascending when none is set) and stop at the first empty page, which keeps
/// the walk correct even when the server cap is below [`SELECT_PAGE_SIZE`].
pub async fn select_all(
    backend: &dyn Backend,
    table: &str,
    query: &TableQuery,
) -> BackendResult<Vec<Value>> {
    let mut base = query.clone();
    if base.order.is_none() {
        base = base.order_asc("id");
    }

    let mut rows = Vec::new();
    loop {
        let page_query = base.clone().limit(SELECT_PAGE_SIZE).offset(rows.len());
        let page = backend.select(table, &page_query).await?;
        if page.is_empty() {
            break;
        }
        rows.extend(page);
    }

    Ok(rows)
}

/// Deserializes every row, failing on the first malformed one.
pub fn rows_into<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> BackendResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(BackendError::from))
        .collect()
}
