//! API handlers module

pub mod health;
pub mod legacy_rates;
pub mod quotes;
pub mod term_rates;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use std::str::FromStr;
use uuid::Uuid;

use crate::extract::{ApiPath, ApiQuery};
use crate::AppState;
use lendrate_common::{
    auth::AuthContext,
    errors::{AppError, Result},
    rates::{api::ListQuery, Category},
};

/// What `/api/admin/rates/{segment}` names: a category's term table or
/// one single-rate row by id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateTable {
    Term(Category),
    Legacy(Uuid),
}

impl FromStr for RateTable {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(category) = s.parse::<Category>() {
            return Ok(RateTable::Term(category));
        }
        Uuid::parse_str(s)
            .map(RateTable::Legacy)
            .map_err(|_| AppError::InvalidFormat {
                message: format!("'{}' is neither a vehicle category nor a rate id", s),
            })
    }
}

/// `GET /api/admin/rates/{segment}`
pub async fn get_rate_table(
    state: State<AppState>,
    auth: AuthContext,
    ApiPath(segment): ApiPath<String>,
    query: ApiQuery<ListQuery>,
) -> Result<Response> {
    match segment.parse::<RateTable>()? {
        RateTable::Term(category) => term_rates::list_ranges(state, auth, ApiPath(category), query)
            .await
            .map(IntoResponse::into_response),
        RateTable::Legacy(id) => legacy_rates::get_rate(state, auth, ApiPath(id))
            .await
            .map(IntoResponse::into_response),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_table_segment() {
        assert_eq!("moto".parse::<RateTable>().unwrap(), RateTable::Term(Category::Moto));

        let id = Uuid::new_v4();
        assert_eq!(id.to_string().parse::<RateTable>().unwrap(), RateTable::Legacy(id));

        assert!(matches!(
            "trucks".parse::<RateTable>(),
            Err(AppError::InvalidFormat { .. })
        ));
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Router harness over the in-memory store

    use crate::{create_router, AppState};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use lendrate_common::{
        auth::{SCOPE_ADMIN, SCOPE_DEALER},
        config::AppConfig,
        MemoryRateStore,
    };
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    pub struct TestApp {
        pub router: Router,
        pub admin: String,
        pub dealer: String,
    }

    pub fn app_with(mut config: AppConfig) -> TestApp {
        config.auth.jwt_secret = Some("gateway-test-secret".to_string());

        let state = AppState::new(Arc::new(config), Arc::new(MemoryRateStore::new())).unwrap();
        let admin = state
            .jwt
            .generate_token(Uuid::new_v4(), vec![SCOPE_ADMIN.to_string()])
            .unwrap();
        let dealer = state
            .jwt
            .generate_token(Uuid::new_v4(), vec![SCOPE_DEALER.to_string()])
            .unwrap();

        TestApp {
            router: create_router(state),
            admin,
            dealer,
        }
    }

    pub fn app() -> TestApp {
        app_with(AppConfig::default())
    }

    impl TestApp {
        pub async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }

            let request = match body {
                Some(json) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            self.send_request(request).await
        }

        pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, json)
        }

        pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            self.send(method, uri, Some(&self.admin), body).await
        }

        pub async fn dealer(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            self.send(method, uri, Some(&self.dealer), body).await
        }
    }
}
