//! Lendrate API client
//!
//! One authenticated client for the admin and dealer endpoints. A single
//! [`TokenSource`] decides where the bearer token comes from, and every
//! request goes through [`ApiClient::request`] which attaches it.
//!
//! Responses are decoded from the `{success, data}` envelope; failures
//! become [`ClientError`], with overlap rejections carrying the
//! conflicting terms. Nothing is retried: the caller fixes the input and
//! resubmits.

use async_trait::async_trait;
use lendrate_common::errors::{ErrorCode, ErrorResponse};
use lendrate_common::rates::api::{
    ApiResponse, DeleteResponse, LegacyRateInput, QuoteRequest, QuoteResponse, ResolveQuery,
    ResolvedRate, TermRangeInput,
};
use lendrate_common::rates::{Category, LegacyRate, RangeGroup, RangeKey, RateRange};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Environment variable read by [`EnvToken::default`]
pub const TOKEN_ENV_VAR: &str = "LENDRATE_TOKEN";

/// Client-side failures
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Overlap detected in terms: {}", join_terms(.terms))]
    Overlap { terms: Vec<u32> },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("API error {status} ({code:?}): {message}")]
    Api {
        status: u16,
        code: Option<ErrorCode>,
        message: String,
    },

    #[error("No token available: {0}")]
    MissingToken(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

fn join_terms(terms: &[u32]) -> String {
    terms
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Where the bearer token comes from
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String>;
}

/// A fixed token, e.g. minted by an operator
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Token read from an environment variable on every request
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::new(TOKEN_ENV_VAR)
    }
}

#[async_trait]
impl TokenSource for EnvToken {
    async fn token(&self) -> Result<String> {
        std::env::var(&self.var)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ClientError::MissingToken(format!("{} is not set", self.var)))
    }
}

/// Typed client for the Lendrate API
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl ApiClient {
    /// Create a client with a 30s request timeout
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_http(http, base_url, tokens))
    }

    /// Create a client over an existing `reqwest::Client`
    pub fn with_http(
        http: reqwest::Client,
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            tokens,
        }
    }

    /// Start an authenticated request to `path`
    pub async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.tokens.token().await?;
        let url = format!("{}{}", self.base_url, path);

        tracing::debug!(%method, %url, "Sending API request");

        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            return serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()));
        }

        Err(decode_failure(status, &bytes))
    }

    async fn fetch<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T> {
        let builder = self.request(method, path).await?;
        let envelope: ApiResponse<T> = self.execute(builder).await?;
        Ok(envelope.data)
    }

    async fn submit<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(method, path).await?.json(body);
        let envelope: ApiResponse<T> = self.execute(builder).await?;
        Ok(envelope.data)
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let builder = self.request(Method::DELETE, path).await?;
        let response: DeleteResponse = self.execute(builder).await?;
        if response.success {
            Ok(())
        } else {
            Err(ClientError::Decode("delete answered success=false".to_string()))
        }
    }

    // ------------------------------------------------------------------
    // Term-bucketed rate tables
    // ------------------------------------------------------------------

    pub async fn list_ranges(&self, category: Category) -> Result<Vec<RateRange>> {
        self.fetch(Method::GET, &format!("/api/admin/rates/{}", category))
            .await
    }

    pub async fn list_groups(&self, category: Category) -> Result<Vec<RangeGroup>> {
        self.fetch(Method::GET, &format!("/api/admin/rates/{}?view=groups", category))
            .await
    }

    pub async fn get_range(&self, category: Category, key: RangeKey) -> Result<RangeGroup> {
        self.fetch(Method::GET, &format!("/api/admin/rates/{}/{}", category, key))
            .await
    }

    pub async fn create_range(&self, category: Category, input: &TermRangeInput) -> Result<RangeGroup> {
        self.submit(Method::POST, &format!("/api/admin/rates/{}", category), input)
            .await
    }

    pub async fn update_range(
        &self,
        category: Category,
        key: RangeKey,
        input: &TermRangeInput,
    ) -> Result<RangeGroup> {
        self.submit(Method::PATCH, &format!("/api/admin/rates/{}/{}", category, key), input)
            .await
    }

    pub async fn delete_range(&self, category: Category, key: RangeKey) -> Result<()> {
        self.remove(&format!("/api/admin/rates/{}/{}", category, key)).await
    }

    // ------------------------------------------------------------------
    // Single-rate table
    // ------------------------------------------------------------------

    pub async fn list_legacy(&self) -> Result<Vec<LegacyRate>> {
        self.fetch(Method::GET, "/api/admin/rates").await
    }

    pub async fn get_legacy(&self, id: Uuid) -> Result<LegacyRate> {
        self.fetch(Method::GET, &format!("/api/admin/rates/{}", id)).await
    }

    pub async fn create_legacy(&self, input: &LegacyRateInput) -> Result<LegacyRate> {
        self.submit(Method::POST, "/api/admin/rates", input).await
    }

    pub async fn update_legacy(&self, id: Uuid, input: &LegacyRateInput) -> Result<LegacyRate> {
        self.submit(Method::PATCH, &format!("/api/admin/rates/{}", id), input)
            .await
    }

    pub async fn delete_legacy(&self, id: Uuid) -> Result<()> {
        self.remove(&format!("/api/admin/rates/{}", id)).await
    }

    // ------------------------------------------------------------------
    // Dealer lookups
    // ------------------------------------------------------------------

    pub async fn resolve(&self, category: Category, year: i32, term: u32) -> Result<ResolvedRate> {
        let query = ResolveQuery {
            category,
            year,
            term,
        };
        let builder = self
            .request(Method::GET, "/api/rates/resolve")
            .await?
            .query(&query);
        let envelope: ApiResponse<ResolvedRate> = self.execute(builder).await?;
        Ok(envelope.data)
    }

    pub async fn quote(&self, request: &QuoteRequest) -> Result<QuoteResponse> {
        self.submit(Method::POST, "/api/calculator/quote", request)
            .await
    }
}

/// Turn a non-2xx answer into a `ClientError`
fn decode_failure(status: StatusCode, bytes: &[u8]) -> ClientError {
    let parsed: Option<ErrorResponse> = serde_json::from_slice(bytes).ok();

    if let Some(terms) = parsed
        .as_ref()
        .and_then(|body| body.overlaps.as_ref())
        .map(|entries| entries.iter().map(|entry| entry.term).collect::<Vec<_>>())
    {
        return ClientError::Overlap { terms };
    }

    let message = parsed
        .as_ref()
        .map(|body| body.error.clone())
        .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned());

    if status == StatusCode::UNAUTHORIZED {
        return ClientError::Unauthorized { message };
    }

    tracing::warn!(status = status.as_u16(), %message, "API request failed");

    ClientError::Api {
        status: status.as_u16(),
        code: parsed.map(|body| body.code),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::BTreeMap;
    use tokio::net::TcpListener;
    use tokio_test::{assert_err, assert_ok};

    const TOKEN: &str = "test-token";
    const LEGACY_ID: &str = "5d0e3c1a-2b4f-4e6a-8c9d-0f1e2a3b4c5d";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {}", TOKEN))
            .unwrap_or(false)
    }

    fn unauthorized() -> (AxumStatus, Json<Value>) {
        (
            AxumStatus::UNAUTHORIZED,
            Json(json!({"success": false, "error": "Unauthorized: bad token", "code": "UNAUTHORIZED"})),
        )
    }

    fn group(key: &str) -> Value {
        json!({
            "key": key,
            "category": "auto",
            "name": key,
            "yearFrom": 2015,
            "yearTo": 2020,
            "isActive": true,
            "terms": {"6": 0.45, "12": 0.45, "24": 0.45, "48": 0.45},
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        })
    }

    async fn serve() -> String {
        let app = Router::new()
            .route(
                "/api/admin/rates/auto",
                get(|headers: HeaderMap| async move {
                    if !authorized(&headers) {
                        return unauthorized();
                    }
                    (AxumStatus::OK, Json(json!({"success": true, "data": []})))
                })
                .post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                    if !authorized(&headers) {
                        return unauthorized();
                    }
                    if body["yearFrom"] == 2018 {
                        return (
                            AxumStatus::CONFLICT,
                            Json(json!({
                                "success": false,
                                "error": "Overlap detected in terms: 12, 24",
                                "code": "RATE_OVERLAP",
                                "overlaps": [{"term": 12}, {"term": 24}]
                            })),
                        );
                    }
                    (AxumStatus::CREATED, Json(json!({"success": true, "data": group("2015-2020")})))
                }),
            )
            .route(
                "/api/admin/rates/auto/{key}",
                get(|| async {
                    (
                        AxumStatus::NOT_FOUND,
                        Json(json!({
                            "success": false,
                            "error": "Range auto/2000-2001 not found",
                            "code": "RANGE_NOT_FOUND"
                        })),
                    )
                })
                .delete(|| async { Json(json!({"success": true})) }),
            )
            .route(
                &format!("/api/admin/rates/{}", LEGACY_ID),
                get(|headers: HeaderMap| async move {
                    if !authorized(&headers) {
                        return unauthorized();
                    }
                    (
                        AxumStatus::OK,
                        Json(json!({
                            "success": true,
                            "data": {
                                "id": LEGACY_ID,
                                "name": "Base",
                                "yearFrom": 2000,
                                "yearTo": 2030,
                                "interestRate": 0.6,
                                "isActive": true,
                                "priority": 0,
                                "createdAt": "2024-01-01T00:00:00Z",
                                "updatedAt": "2024-01-01T00:00:00Z"
                            }
                        })),
                    )
                }),
            )
            .route(
                "/api/rates/resolve",
                get(|Query(query): Query<BTreeMap<String, String>>| async move {
                    Json(json!({
                        "success": true,
                        "data": {
                            "source": "term",
                            "rangeId": "7b8c2f3e-8a42-4c7e-9a0f-3c1d2e4f5a6b",
                            "rangeName": format!("{} {}", query["category"], query["year"]),
                            "yearFrom": 2015,
                            "yearTo": 2020,
                            "interestRate": 0.455,
                            "display": "45.5"
                        }
                    }))
                }),
            )
            .route(
                "/api/calculator/quote",
                post(|| async { "not json" }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/", addr)
    }

    fn client(base: &str, token: &str) -> ApiClient {
        ApiClient::new(base, Arc::new(StaticToken::new(token))).unwrap()
    }

    fn input(from: i32) -> TermRangeInput {
        TermRangeInput {
            name: "Late models".into(),
            description: None,
            year_from: from,
            year_to: 2022,
            is_active: true,
            terms: [(6, 0.45), (12, 0.45), (24, 0.45), (48, 0.45)].into_iter().collect(),
        }
    }

    #[tokio::test]
    async fn test_token_attached_to_requests() {
        let base = serve().await;

        let ranges = assert_ok!(client(&base, TOKEN).list_ranges(Category::Auto).await);
        assert!(ranges.is_empty());

        let err = assert_err!(client(&base, "stale").list_ranges(Category::Auto).await);
        assert!(matches!(err, ClientError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_create_and_overlap() {
        let base = serve().await;
        let api = client(&base, TOKEN);

        let group = api.create_range(Category::Auto, &input(2015)).await.unwrap();
        assert_eq!(group.key, "2015-2020");
        assert_eq!(group.terms[&48], 0.45);

        let err = api.create_range(Category::Auto, &input(2018)).await.unwrap_err();
        match err {
            ClientError::Overlap { ref terms } => assert_eq!(terms, &vec![12, 24]),
            other => panic!("expected overlap, got {:?}", other),
        }
        assert_eq!(err.to_string(), "Overlap detected in terms: 12, 24");
    }

    #[tokio::test]
    async fn test_not_found_and_delete() {
        let base = serve().await;
        let api = client(&base, TOKEN);

        let err = api
            .get_range(Category::Auto, RangeKey::new(2000, 2001))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Api { status: 404, code: Some(ErrorCode::RangeNotFound), .. }
        ));

        assert_ok!(api.delete_range(Category::Auto, RangeKey::new(2015, 2020)).await);
    }

    #[tokio::test]
    async fn test_get_legacy_by_id() {
        let base = serve().await;
        let id: Uuid = LEGACY_ID.parse().unwrap();

        let rate = client(&base, TOKEN).get_legacy(id).await.unwrap();
        assert_eq!(rate.id, id);
        assert_eq!(rate.interest_rate, 0.6);
        assert_eq!(rate.description, None);
    }

    #[tokio::test]
    async fn test_resolve_sends_query() {
        let base = serve().await;
        let rate = client(&base, TOKEN)
            .resolve(Category::Moto, 2017, 6)
            .await
            .unwrap();
        assert_eq!(rate.range_name, "moto 2017");
        assert_eq!(rate.display, "45.5");
    }

    #[tokio::test]
    async fn test_undecodable_success_body() {
        let base = serve().await;
        let request = QuoteRequest {
            category: Category::Auto,
            vehicle_year: 2018,
            vehicle_price: 10_000.0,
            down_payment: 0.0,
            term_months: 12,
        };
        let err = client(&base, TOKEN).quote(&request).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn test_env_token() {
        let var = "LENDRATE_CLIENT_TEST_TOKEN";
        let source = EnvToken::new(var);

        std::env::remove_var(var);
        assert!(matches!(source.token().await, Err(ClientError::MissingToken(_))));

        std::env::set_var(var, "from-env");
        assert_eq!(source.token().await.unwrap(), "from-env");
        std::env::remove_var(var);
    }
}
