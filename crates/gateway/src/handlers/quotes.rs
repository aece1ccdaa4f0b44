//! Dealer-facing lookups: rate resolution and the loan calculator

use axum::{extract::State, Json};

use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;
use lendrate_common::{
    auth::{AuthContext, SCOPE_DEALER},
    errors::Result,
    rates::api::{ApiResponse, QuoteRequest, QuoteResponse, ResolveQuery, ResolvedRate},
};
use validator::Validate;

/// `GET /api/rates/resolve?category=&year=&term=`
pub async fn resolve_rate(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<ResolveQuery>,
) -> Result<Json<ApiResponse<ResolvedRate>>> {
    auth.require_scope(SCOPE_DEALER)?;

    let rate = state
        .rates
        .quote_rate(query.category, query.year, query.term)
        .await?;
    Ok(Json(ApiResponse::ok(rate)))
}

/// `POST /api/calculator/quote`
pub async fn quote_loan(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(request): ApiJson<QuoteRequest>,
) -> Result<Json<ApiResponse<QuoteResponse>>> {
    auth.require_scope(SCOPE_DEALER)?;
    request.validate()?;

    let response = state.rates.quote(request).await?;
    Ok(Json(ApiResponse::ok(response)))
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::{app, app_with};
    use axum::http::{Method, StatusCode};
    use lendrate_common::config::AppConfig;
    use serde_json::json;

    async fn seed(app: &crate::handlers::testing::TestApp) {
        let (status, _) = app
            .admin(
                Method::POST,
                "/api/admin/rates/moto",
                Some(json!({
                    "name": "2015-2020",
                    "yearFrom": 2015,
                    "yearTo": 2020,
                    "isActive": true,
                    "terms": {"6": 0.455, "12": 0.12, "24": 0.5}
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_resolve_rate() {
        let app = app();
        seed(&app).await;

        let (status, body) = app
            .dealer(Method::GET, "/api/rates/resolve?category=moto&year=2017&term=6", None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["source"], "term");
        assert_eq!(body["data"]["interestRate"], 0.455);
        assert_eq!(body["data"]["display"], "45.5");

        let (status, body) = app
            .dealer(Method::GET, "/api/rates/resolve?category=moto&year=2030&term=6", None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "RATE_NOT_CONFIGURED");

        let (status, body) = app
            .dealer(Method::GET, "/api/rates/resolve?category=moto&year=2017&term=48", None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_TERM");
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_legacy() {
        let app = app();
        app.admin(
            Method::POST,
            "/api/admin/rates",
            Some(json!({
                "name": "Base",
                "yearFrom": 2000,
                "yearTo": 2030,
                "interestRate": 0.6
            })),
        )
        .await;

        let (status, body) = app
            .dealer(Method::GET, "/api/rates/resolve?category=auto&year=2010&term=12", None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["source"], "legacy");
        assert_eq!(body["data"]["display"], "60");
    }

    #[tokio::test]
    async fn test_quote_loan() {
        let app = app();
        seed(&app).await;

        let (status, body) = app
            .dealer(
                Method::POST,
                "/api/calculator/quote",
                Some(json!({
                    "category": "moto",
                    "vehicleYear": 2018,
                    "vehiclePrice": 12000.0,
                    "downPayment": 2000.0,
                    "termMonths": 12
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["rate"]["interestRate"], 0.12);
        assert_eq!(body["data"]["quote"]["monthlyPayment"], 888.49);
        assert_eq!(body["data"]["quote"]["schedule"].as_array().unwrap().len(), 12);

        let (status, _) = app
            .dealer(
                Method::POST,
                "/api/calculator/quote",
                Some(json!({
                    "category": "moto",
                    "vehicleYear": 2018,
                    "vehiclePrice": -5.0,
                    "termMonths": 12
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_dealer_routes_need_token() {
        let app = app();
        let (status, _) = app
            .send(Method::GET, "/api/rates/resolve?category=auto&year=2017&term=12", None, None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Admin implies dealer
        let (status, _) = app
            .admin(Method::GET, "/api/rates/resolve?category=auto&year=2017&term=12", None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rate_limit_returns_envelope() {
        let mut config = AppConfig::default();
        config.rate_limit.requests_per_second = 1;
        config.rate_limit.burst = 1;
        let app = app_with(config);

        let uri = "/api/rates/resolve?category=auto&year=2017&term=12";
        let (first, _) = app.dealer(Method::GET, uri, None).await;
        assert_eq!(first, StatusCode::NOT_FOUND);

        let (second, body) = app.dealer(Method::GET, uri, None).await;
        assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["code"], "RATE_LIMITED");
    }
}
