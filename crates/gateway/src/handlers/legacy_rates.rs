//! Single-rate table: `/api/admin/rates[/{id}]`

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::extract::{ApiJson, ApiPath};
use crate::AppState;
use lendrate_common::{
    auth::{AuthContext, SCOPE_ADMIN},
    errors::Result,
    rates::{
        api::{ApiResponse, DeleteResponse, LegacyRateInput},
        LegacyRate,
    },
};

pub async fn list_rates(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<LegacyRate>>>> {
    auth.require_scope(SCOPE_ADMIN)?;

    let rates = state.rates.list_legacy().await?;
    Ok(Json(ApiResponse::ok(rates)))
}

pub async fn get_rate(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<LegacyRate>>> {
    auth.require_scope(SCOPE_ADMIN)?;

    let rate = state.rates.get_legacy(id).await?;
    Ok(Json(ApiResponse::ok(rate)))
}

pub async fn create_rate(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(input): ApiJson<LegacyRateInput>,
) -> Result<(StatusCode, Json<ApiResponse<LegacyRate>>)> {
    auth.require_scope(SCOPE_ADMIN)?;

    tracing::info!(user_id = %auth.user_id, request_id = %auth.request_id, "Creating legacy rate");

    let rate = state.rates.create_legacy(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(rate))))
}

pub async fn update_rate(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<LegacyRateInput>,
) -> Result<Json<ApiResponse<LegacyRate>>> {
    auth.require_scope(SCOPE_ADMIN)?;

    let rate = state.rates.update_legacy(id, input).await?;
    Ok(Json(ApiResponse::ok(rate)))
}

pub async fn delete_rate(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DeleteResponse>> {
    auth.require_scope(SCOPE_ADMIN)?;

    state.rates.delete_legacy(id).await?;
    Ok(Json(DeleteResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::app;
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    fn body(from: i32, to: i32, rate: f64, priority: i32) -> Value {
        json!({
            "name": "Base",
            "description": "",
            "yearFrom": from,
            "yearTo": to,
            "interestRate": rate,
            "isActive": true,
            "priority": priority
        })
    }

    #[tokio::test]
    async fn test_overlapping_legacy_rates_allowed() {
        let app = app();

        let (status, first) = app
            .admin(Method::POST, "/api/admin/rates", Some(body(2000, 2030, 0.6, 0)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["data"]["interestRate"], 0.6);

        let (status, _) = app
            .admin(Method::POST, "/api/admin/rates", Some(body(2015, 2020, 0.4, 5)))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, list) = app.admin(Method::GET, "/api/admin/rates", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete_by_id() {
        let app = app();
        let (_, created) = app
            .admin(Method::POST, "/api/admin/rates", Some(body(2000, 2030, 0.6, 0)))
            .await;
        let id = created["data"]["id"].as_str().unwrap().to_string();
        let uri = format!("/api/admin/rates/{}", id);

        let (status, updated) = app.admin(Method::PATCH, &uri, Some(body(2000, 2030, 0.55, 2))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["data"]["id"], id.as_str());
        assert_eq!(updated["data"]["priority"], 2);

        let (status, fetched) = app.admin(Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["data"]["id"], id.as_str());
        assert_eq!(fetched["data"]["interestRate"], 0.55);

        let (status, deleted) = app.admin(Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["success"], true);

        let (status, missing) = app.admin(Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(missing["code"], "NOT_FOUND");

        let (status, missing) = app.admin(Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(missing["success"], false);

        // Anything else in the segment is neither a table nor a row
        let (status, body) = app.admin(Method::GET, "/api/admin/rates/trucks", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_FORMAT");
    }

    #[tokio::test]
    async fn test_invalid_legacy_input() {
        let app = app();

        let (status, _) = app
            .admin(Method::POST, "/api/admin/rates", Some(body(2030, 2000, 0.6, 0)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .admin(Method::POST, "/api/admin/rates", Some(body(2000, 2030, 0.0, 0)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .admin(Method::PATCH, "/api/admin/rates/not-a-uuid", Some(body(2000, 2030, 0.6, 0)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}
