use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{
    AuthSession, AuthUser, Backend, BackendError, BackendResult, Filter, ListOptions,
    SignUpResult, SignedUpload, StorageObject, TableQuery,
};

/// HTTP client for a Supabase project: GoTrue under `/auth/v1`, PostgREST
/// under `/rest/v1` and the storage API under `/storage/v1`.
///
/// The key decides the privilege level: the anon key is subject to row-level
/// security, the service key bypasses it.
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> AuthSession {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| Utc::now().timestamp() + self.expires_in.unwrap_or(3600));

        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SignedUploadResponse {
    url: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, api_key: &str) -> BackendResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("music-share-rust/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(builder: RequestBuilder) -> BackendResult<Response> {
        let response = builder.send().await?;
        check_status(response).await
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> BackendResult<AuthSession> {
        let builder = self
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", grant_type)])
            .json(&body);

        let response = Self::send(builder).await.map_err(|err| match err {
            // GoTrue answers 400 invalid_grant for bad credentials or refresh tokens.
            BackendError::Http {
                status: 400,
                message,
            } => BackendError::Unauthorized(message),
            other => other,
        })?;

        let token: TokenResponse = response.json().await?;
        Ok(token.into_session())
    }
}

async fn check_status(response: Response) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    debug!("backend responded {} - {}", status, message);

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
        StatusCode::CONFLICT => BackendError::Conflict(message),
        _ => BackendError::Http {
            status: status.as_u16(),
            message,
        },
    })
}

fn quote_list_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// PostgREST encodes filters as `column=operator.value` query parameters.
fn filter_pairs(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq(column, value) => (column.clone(), format!("eq.{value}")),
            Filter::ILike(column, pattern) => (column.clone(), format!("ilike.{pattern}")),
            Filter::In(column, values) => {
                let list = values
                    .iter()
                    .map(|v| quote_list_value(v))
                    .collect::<Vec<_>>()
                    .join(",");
                (column.clone(), format!("in.({list})"))
            }
        })
        .collect()
}

fn query_pairs(query: &TableQuery) -> Vec<(String, String)> {
    let mut pairs = vec![(
        "select".to_string(),
        query.columns.clone().unwrap_or_else(|| "*".to_string()),
    )];
    pairs.extend(filter_pairs(&query.filters));

    if let Some(order) = &query.order {
        let direction = if order.descending { "desc" } else { "asc" };
        pairs.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    if let Some(limit) = query.limit {
        pairs.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(offset) = query.offset {
        pairs.push(("offset".to_string(), offset.to_string()));
    }

    pairs
}

fn sign_up_result(body: Value) -> BackendResult<SignUpResult> {
    if body.get("access_token").is_some() {
        let token: TokenResponse = serde_json::from_value(body)?;
        let session = token.into_session();
        return Ok(SignUpResult {
            user: session.user.clone(),
            session: Some(session),
        });
    }

    // Email confirmation pending: the user comes back bare or under `user`.
    let user_value = body.get("user").cloned().unwrap_or(body);
    let user: AuthUser = serde_json::from_value(user_value)?;
    Ok(SignUpResult {
        user,
        session: None,
    })
}

/// The signed upload endpoint answers with a storage-relative URL carrying the token.
fn signed_upload_from_response(
    base_url: &str,
    path: &str,
    relative_url: &str,
) -> BackendResult<SignedUpload> {
    let signed_url = format!("{base_url}/storage/v1{relative_url}");
    let parsed = reqwest::Url::parse(&signed_url)
        .map_err(|err| BackendError::Decode(format!("signed url: {err}")))?;
    let token = parsed
        .query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| BackendError::Decode("signed url without token".to_string()))?;

    Ok(SignedUpload {
        path: path.to_string(),
        signed_url,
        token,
    })
}

#[async_trait]
impl Backend for SupabaseClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        attributes: Value,
    ) -> BackendResult<SignUpResult> {
        let builder = self.request(Method::POST, "/auth/v1/signup").json(&json!({
            "email": email,
            "password": password,
            "data": attributes,
        }));

        let body: Value = Self::send(builder).await?.json().await?;
        sign_up_result(body)
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<AuthSession> {
        self.token_grant(
            "password",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        let builder = self
            .client
            .post(format!("{}/auth/v1/logout", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token);

        Self::send(builder).await?;
        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &str) -> BackendResult<AuthSession> {
        if refresh_token.is_empty() {
            return Err(BackendError::Unauthorized("missing refresh token".to_string()));
        }

        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn reset_password_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> BackendResult<()> {
        let mut builder = self
            .request(Method::POST, "/auth/v1/recover")
            .json(&json!({ "email": email }));
        if let Some(redirect_to) = redirect_to {
            builder = builder.query(&[("redirect_to", redirect_to)]);
        }

        Self::send(builder).await?;
        Ok(())
    }

    async fn select(&self, table: &str, query: &TableQuery) -> BackendResult<Vec<Value>> {
        let builder = self
            .request(Method::GET, &format!("/rest/v1/{table}"))
            .query(&query_pairs(query));

        let rows: Vec<Value> = Self::send(builder).await?.json().await?;
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> BackendResult<Value> {
        let builder = self
            .request(Method::POST, &format!("/rest/v1/{table}"))
            .header("Prefer", "return=representation")
            .json(&row);

        let mut rows: Vec<Value> = Self::send(builder).await?.json().await?;
        if rows.is_empty() {
            return Err(BackendError::Decode(format!(
                "insert into {table} returned no row"
            )));
        }
        Ok(rows.swap_remove(0))
    }

    async fn update(&self, table: &str, patch: Value, filters: &[Filter]) -> BackendResult<()> {
        let builder = self
            .request(Method::PATCH, &format!("/rest/v1/{table}"))
            .query(&filter_pairs(filters))
            .json(&patch);

        Self::send(builder).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> BackendResult<usize> {
        let builder = self
            .request(Method::DELETE, &format!("/rest/v1/{table}"))
            .header("Prefer", "return=representation")
            .query(&filter_pairs(filters));

        let removed: Vec<Value> = Self::send(builder).await?.json().await?;
        Ok(removed.len())
    }

    async fn call_procedure(&self, name: &str, args: Value) -> BackendResult<Value> {
        let builder = self
            .request(Method::POST, &format!("/rest/v1/rpc/{name}"))
            .json(&args);

        let response = Self::send(builder).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn create_signed_upload_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in_secs: u64,
    ) -> BackendResult<SignedUpload> {
        let builder = self
            .request(
                Method::POST,
                &format!("/storage/v1/object/upload/sign/{bucket}/{path}"),
            )
            .json(&json!({ "expiresIn": expires_in_secs }));

        let response: SignedUploadResponse = Self::send(builder).await?.json().await?;
        signed_upload_from_response(&self.base_url, path, &response.url)
    }

    async fn list_objects(
        &self,
        bucket: &str,
        folder: &str,
        options: &ListOptions,
    ) -> BackendResult<Vec<StorageObject>> {
        let mut body = json!({
            "prefix": folder,
            "limit": options.limit,
            "offset": options.offset,
            "sortBy": { "column": "name", "order": "asc" },
        });
        if let Some(search) = &options.search {
            body["search"] = Value::String(search.clone());
        }

        let builder = self
            .request(Method::POST, &format!("/storage/v1/object/list/{bucket}"))
            .json(&body);

        let objects: Vec<StorageObject> = Self::send(builder).await?.json().await?;
        Ok(objects)
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, path)
    }

    async fn remove_objects(&self, bucket: &str, paths: &[String]) -> BackendResult<()> {
        let builder = self
            .request(Method::DELETE, &format!("/storage/v1/object/{bucket}"))
            .json(&json!({ "prefixes": paths }));

        Self::send(builder).await?;
        Ok(())
    }
}
