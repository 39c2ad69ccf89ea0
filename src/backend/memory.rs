//! In-memory stand-in for the hosted service, used by the test suite.
//!
//! It keeps just enough behaviour to exercise the handlers: password sign-in
//! with rotating refresh tokens, JSON rows with the schema's unique
//! constraints, the counter and dashboard procedures, and folder-style listing.
//! Every trait call is recorded so tests can assert on collaborator traffic.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{
    AuthSession, AuthUser, Backend, BackendError, BackendResult, Filter, ListOptions,
    SignUpResult, SignedUpload, StorageObject, TableQuery,
};

const PUBLIC_BASE: &str = "https://storage.test/public";

#[derive(Debug, Clone)]
struct MemoryUser {
    user: AuthUser,
    password: String,
}

#[derive(Default)]
struct MemoryState {
    users: Vec<MemoryUser>,
    refresh_tokens: HashMap<String, String>,
    tables: HashMap<String, Vec<Value>>,
    objects: HashMap<String, BTreeMap<String, DateTime<Utc>>>,
    failing_removals: HashSet<String>,
    select_cap: Option<usize>,
    calls: Vec<String>,
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn add_user(&self, email: &str, password: &str, role: Option<&str>) -> AuthUser {
        let app_metadata = match role {
            Some(role) => json!({ "role": role }),
            None => json!({}),
        };
        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            app_metadata,
            user_metadata: json!({ "username": email.split('@').next().unwrap_or(email) }),
        };
        self.state.lock().unwrap().users.push(MemoryUser {
            user: user.clone(),
            password: password.to_string(),
        });
        user
    }

    /// Issues a session for an existing user without recording a call.
    pub fn issue_session(&self, user: &AuthUser, expires_at: i64) -> AuthSession {
        let mut state = self.state.lock().unwrap();
        Self::new_session(&mut state, user.clone(), expires_at)
    }

    fn new_session(state: &mut MemoryState, user: AuthUser, expires_at: i64) -> AuthSession {
        let refresh_token = format!("rt-{}", Uuid::new_v4());
        state
            .refresh_tokens
            .insert(refresh_token.clone(), user.id.clone());

        AuthSession {
            access_token: format!("at-{}", Uuid::new_v4()),
            refresh_token,
            expires_at,
            user,
        }
    }

    pub fn seed_row(&self, table: &str, row: Value) {
        let mut state = self.state.lock().unwrap();
        state.tables.entry(table.to_string()).or_default().push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        let state = self.state.lock().unwrap();
        state.tables.get(table).cloned().unwrap_or_default()
    }

    /// Stands in for the browser's direct upload to a signed URL.
    pub fn put_object(&self, bucket: &str, path: &str, created_at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        state
            .objects
            .entry(bucket.to_string())
            .or_default()
            .insert(path.to_string(), created_at);
    }

    pub fn object_paths(&self, bucket: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Truncates every `select` response to `cap` rows, like the service's max-rows setting.
    pub fn cap_selects(&self, cap: usize) {
        self.state.lock().unwrap().select_cap = Some(cap);
    }

    pub fn fail_removal_of(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_removals
            .insert(path.to_string());
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

enum LikeToken {
    Any,
    One,
    Lit(char),
}

/// Case-insensitive SQL `LIKE` with `\` escapes. An unescaped `*` reads as `%`,
/// as it does in the service's query-string filters.
fn like_matches(pattern: &str, text: &str) -> bool {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' | '*' => tokens.push(LikeToken::Any),
            '_' => tokens.push(LikeToken::One),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    tokens.push(LikeToken::Lit(escaped));
                }
            }
            other => tokens.push(LikeToken::Lit(other)),
        }
    }

    let text: Vec<char> = text.to_lowercase().chars().collect();
    // matches[j]: tokens so far match text[..j]
    let mut matches = vec![false; text.len() + 1];
    matches[0] = true;
    for token in &tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            LikeToken::Any => {
                let mut reachable = false;
                for j in 0..=text.len() {
                    reachable |= matches[j];
                    next[j] = reachable;
                }
            }
            LikeToken::One => {
                for j in 1..=text.len() {
                    next[j] = matches[j - 1];
                }
            }
            LikeToken::Lit(expected) => {
                let expected: Vec<char> = expected.to_lowercase().collect();
                for j in 1..=text.len() {
                    next[j] = matches[j - 1] && expected.first() == Some(&text[j - 1]);
                }
            }
        }
        matches = next;
    }
    matches[text.len()]
}

fn row_matches(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq(column, expected) => row
            .get(column)
            .map(|v| value_as_text(v) == *expected)
            .unwrap_or(false),
        Filter::ILike(column, pattern) => row
            .get(column)
            .map(|v| like_matches(pattern, &value_as_text(v)))
            .unwrap_or(false),
        Filter::In(column, values) => row
            .get(column)
            .map(|v| values.contains(&value_as_text(v)))
            .unwrap_or(false),
    })
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(std::cmp::Ordering::Equal),
        (Some(x), Some(y)) => value_as_text(x).cmp(&value_as_text(y)),
        (None, Some(_)) => std::cmp::Ordering::Less,
        (Some(_), None) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

fn unique_keys(table: &str) -> &'static [&'static [&'static str]] {
    match table {
        "likes" => &[&["user_id", "song_id"]],
        "songs" => &[&["id"], &["upload_id"]],
        "profiles" => &[&["id"]],
        _ => &[],
    }
}

impl MemoryBackend {
    fn adjust_counter(&self, song_id: &str, column: &str, delta: i64) -> BackendResult<Value> {
        let mut state = self.state.lock().unwrap();
        let songs = state.tables.entry("songs".to_string()).or_default();
        let song = songs
            .iter_mut()
            .find(|row| row.get("id").map(value_as_text).as_deref() == Some(song_id))
            .ok_or_else(|| BackendError::Http {
                status: 404,
                message: format!("song {song_id} not found"),
            })?;

        let current = song.get(column).and_then(Value::as_i64).unwrap_or(0);
        let updated = (current + delta).max(0);
        song[column] = json!(updated);
        Ok(json!(updated))
    }

    /// Aggregates over whole tables; the select cap does not apply to procedures.
    fn dashboard_totals(&self) -> Value {
        let state = self.state.lock().unwrap();
        let count = |table: &str| state.tables.get(table).map_or(0, Vec::len);
        let sum = |column: &str| -> i64 {
            state.tables.get("songs").map_or(0, |songs| {
                songs
                    .iter()
                    .filter_map(|song| song.get(column).and_then(Value::as_i64))
                    .sum()
            })
        };

        json!([{
            "users_count": count("profiles"),
            "songs_count": count("songs"),
            "total_streams": sum("streams"),
            "total_likes": sum("likes"),
        }])
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        attributes: Value,
    ) -> BackendResult<SignUpResult> {
        self.record(format!("sign_up:{email}"));
        let mut state = self.state.lock().unwrap();
        if state
            .users
            .iter()
            .any(|u| u.user.email.as_deref() == Some(email))
        {
            return Err(BackendError::Http {
                status: 422,
                message: "user already registered".to_string(),
            });
        }

        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            app_metadata: json!({}),
            user_metadata: attributes,
        };
        state.users.push(MemoryUser {
            user: user.clone(),
            password: password.to_string(),
        });
        let session = Self::new_session(&mut state, user.clone(), Utc::now().timestamp() + 3600);

        Ok(SignUpResult {
            user,
            session: Some(session),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<AuthSession> {
        self.record(format!("sign_in:{email}"));
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .iter()
            .find(|u| u.user.email.as_deref() == Some(email) && u.password == password)
            .map(|u| u.user.clone())
            .ok_or_else(|| BackendError::Unauthorized("invalid login credentials".to_string()))?;

        Ok(Self::new_session(
            &mut state,
            user,
            Utc::now().timestamp() + 3600,
        ))
    }

    async fn sign_out(&self, _access_token: &str) -> BackendResult<()> {
        self.record("sign_out".to_string());
        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &str) -> BackendResult<AuthSession> {
        self.record("refresh_session".to_string());
        let mut state = self.state.lock().unwrap();
        let user_id = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| BackendError::Unauthorized("invalid refresh token".to_string()))?;
        let user = state
            .users
            .iter()
            .find(|u| u.user.id == user_id)
            .map(|u| u.user.clone())
            .ok_or_else(|| BackendError::Unauthorized("user not found".to_string()))?;

        Ok(Self::new_session(
            &mut state,
            user,
            Utc::now().timestamp() + 3600,
        ))
    }

    async fn reset_password_email(
        &self,
        email: &str,
        _redirect_to: Option<&str>,
    ) -> BackendResult<()> {
        self.record(format!("reset_password_email:{email}"));
        Ok(())
    }

    async fn select(&self, table: &str, query: &TableQuery) -> BackendResult<Vec<Value>> {
        self.record(format!("select:{table}"));
        let state = self.state.lock().unwrap();
        let mut rows: Vec<Value> = state
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row_matches(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        let offset = query.offset.unwrap_or(0);
        let limit = match (query.limit, state.select_cap) {
            (Some(limit), Some(cap)) => limit.min(cap),
            (limit, cap) => limit.or(cap).unwrap_or(usize::MAX),
        };

        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn insert(&self, table: &str, mut row: Value) -> BackendResult<Value> {
        self.record(format!("insert:{table}"));
        let mut state = self.state.lock().unwrap();

        if table == "songs" && row.get("id").is_none() {
            row["id"] = json!(Uuid::new_v4().to_string());
        }
        if row.get("created_at").is_none() {
            row["created_at"] = json!(Utc::now());
        }

        let rows = state.tables.entry(table.to_string()).or_default();
        for key in unique_keys(table) {
            let clash = rows.iter().any(|existing| {
                key.iter().all(|column| match (existing.get(*column), row.get(*column)) {
                    (Some(a), Some(b)) if !a.is_null() && !b.is_null() => a == b,
                    _ => false,
                })
            });
            if clash {
                return Err(BackendError::Conflict(format!(
                    "duplicate key on {table}({})",
                    key.join(", ")
                )));
            }
        }

        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, patch: Value, filters: &[Filter]) -> BackendResult<()> {
        self.record(format!("update:{table}"));
        let mut state = self.state.lock().unwrap();
        if let (Some(rows), Some(patch)) = (state.tables.get_mut(table), patch.as_object()) {
            for row in rows.iter_mut().filter(|row| row_matches(row, filters)) {
                for (key, value) in patch {
                    row[key] = value.clone();
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> BackendResult<usize> {
        self.record(format!("delete:{table}"));
        let mut state = self.state.lock().unwrap();
        let Some(rows) = state.tables.get_mut(table) else {
            return Ok(0);
        };

        let before = rows.len();
        rows.retain(|row| !row_matches(row, filters));
        Ok(before - rows.len())
    }

    async fn call_procedure(&self, name: &str, args: Value) -> BackendResult<Value> {
        self.record(format!("rpc:{name}"));
        let song_id = args
            .get("p_song_id")
            .map(value_as_text)
            .unwrap_or_default();

        match name {
            "increment_song_streams" => self.adjust_counter(&song_id, "streams", 1),
            "adjust_song_likes" => {
                let delta = args.get("p_delta").and_then(Value::as_i64).unwrap_or(0);
                self.adjust_counter(&song_id, "likes", delta)
            }
            "dashboard_totals" => Ok(self.dashboard_totals()),
            other => Err(BackendError::Http {
                status: 404,
                message: format!("procedure {other} not found"),
            }),
        }
    }

    async fn create_signed_upload_url(
        &self,
        bucket: &str,
        path: &str,
        _expires_in_secs: u64,
    ) -> BackendResult<SignedUpload> {
        self.record(format!("create_signed_upload_url:{bucket}:{path}"));
        let token = Uuid::new_v4().to_string();
        Ok(SignedUpload {
            path: path.to_string(),
            signed_url: format!("https://storage.test/upload/{bucket}/{path}?token={token}"),
            token,
        })
    }

    async fn list_objects(
        &self,
        bucket: &str,
        folder: &str,
        options: &ListOptions,
    ) -> BackendResult<Vec<StorageObject>> {
        self.record(format!("list_objects:{bucket}:{folder}"));
        let state = self.state.lock().unwrap();
        let Some(objects) = state.objects.get(bucket) else {
            return Ok(Vec::new());
        };

        let prefix = if folder.is_empty() {
            String::new()
        } else {
            format!("{}/", folder.trim_end_matches('/'))
        };

        let mut folders = Vec::new();
        let mut entries = Vec::new();
        for (path, created_at) in objects {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((sub_folder, _)) => {
                    if !folders.iter().any(|f: &StorageObject| f.name == sub_folder) {
                        folders.push(StorageObject {
                            name: sub_folder.to_string(),
                            id: None,
                            created_at: None,
                        });
                    }
                }
                None => entries.push(StorageObject {
                    name: rest.to_string(),
                    id: Some(format!("obj-{path}")),
                    created_at: Some(*created_at),
                }),
            }
        }

        folders.extend(entries);
        let listed = folders
            .into_iter()
            .filter(|entry| {
                options
                    .search
                    .as_deref()
                    .map_or(true, |search| entry.name.contains(search))
            })
            .skip(options.offset)
            .take(options.limit)
            .collect();

        Ok(listed)
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{PUBLIC_BASE}/{bucket}/{path}")
    }

    async fn remove_objects(&self, bucket: &str, paths: &[String]) -> BackendResult<()> {
        self.record(format!("remove_objects:{bucket}:{}", paths.join(",")));
        let mut state = self.state.lock().unwrap();
        if let Some(failing) = paths.iter().find(|p| state.failing_removals.contains(*p)) {
            return Err(BackendError::Http {
                status: 500,
                message: format!("could not remove {failing}"),
            });
        }

        if let Some(objects) = state.objects.get_mut(bucket) {
            for path in paths {
                objects.remove(path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_like_matching() {
        assert!(like_matches("%rock%", "Classic ROCK anthem"));
        assert!(like_matches("a_c", "abc"));
        assert!(!like_matches("a_c", "abbc"));
        assert!(like_matches("100\\%", "100%"));
        assert!(!like_matches("100\\%", "1000"));
        assert!(like_matches("a*c", "abbbc"));
    }

    #[tokio::test]
    async fn test_select_pages_respect_cap() {
        let backend = MemoryBackend::new();
        for id in 0..5 {
            backend.seed_row("songs", json!({ "id": format!("s{id}") }));
        }
        backend.cap_selects(2);

        let page = backend
            .select("songs", &TableQuery::new().order_asc("id").offset(3).limit(10))
            .await
            .unwrap();
        let ids: Vec<_> = page.iter().map(|row| row["id"].clone()).collect();
        assert_eq!(ids, vec![json!("s3"), json!("s4")]);

        let all = crate::backend::select_all(&backend, "songs", &TableQuery::new())
            .await
            .unwrap();
        assert_eq!(all.len(), 5);
    }

    #[tokio::test]
    async fn test_listing_separates_folders_and_files() {
        let backend = MemoryBackend::new();
        let now = Utc::now();
        backend.put_object("music", "audios/a.mp3", now);
        backend.put_object("music", "audios/b.mp3", now);
        backend.put_object("music", "root.mp3", now);

        let root = backend
            .list_objects("music", "", &ListOptions::default())
            .await
            .unwrap();
        assert_eq!(root.len(), 2);
        assert!(root[0].is_folder());
        assert_eq!(root[1].name, "root.mp3");

        let options = ListOptions {
            search: Some("b.mp3".to_string()),
            ..ListOptions::default()
        };
        let audios = backend.list_objects("music", "audios", &options).await.unwrap();
        assert_eq!(audios.len(), 1);
        assert_eq!(audios[0].name, "b.mp3");
    }
}
