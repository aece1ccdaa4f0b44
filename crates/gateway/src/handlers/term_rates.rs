//! Term-bucketed rate tables: `/api/admin/rates/{category}[/{key}]`

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;
use lendrate_common::{
    auth::{AuthContext, SCOPE_ADMIN},
    errors::{AppError, Result},
    rates::{
        api::{ApiResponse, DeleteResponse, ListQuery, TermRangeInput},
        Category, RangeGroup, RangeKey, RateRange,
    },
};

/// Rows or their grouped projection, depending on `?view=`
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RateListing {
    Rows(Vec<RateRange>),
    Groups(Vec<RangeGroup>),
}

fn parse_key(raw: &str) -> Result<RangeKey> {
    raw.parse()
}

/// List a category's rate table
pub async fn list_ranges(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(category): ApiPath<Category>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ApiResponse<RateListing>>> {
    auth.require_scope(SCOPE_ADMIN)?;

    let listing = match query.view.as_deref() {
        None | Some("rows") => RateListing::Rows(state.rates.list_ranges(category).await?),
        Some("groups") => RateListing::Groups(state.rates.list_groups(category).await?),
        Some(other) => {
            return Err(AppError::InvalidFormat {
                message: format!("unknown view '{}', expected rows or groups", other),
            })
        }
    };

    Ok(Json(ApiResponse::ok(listing)))
}

/// Fetch one range group by its `yearFrom-yearTo` key
pub async fn get_range(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((category, key)): ApiPath<(Category, String)>,
) -> Result<Json<ApiResponse<RangeGroup>>> {
    auth.require_scope(SCOPE_ADMIN)?;

    let group = state.rates.get_group(category, parse_key(&key)?).await?;
    Ok(Json(ApiResponse::ok(group)))
}

/// Create a range: one row per term, all or nothing
pub async fn create_range(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(category): ApiPath<Category>,
    ApiJson(input): ApiJson<TermRangeInput>,
) -> Result<(StatusCode, Json<ApiResponse<RangeGroup>>)> {
    auth.require_scope(SCOPE_ADMIN)?;

    tracing::info!(
        user_id = %auth.user_id,
        request_id = %auth.request_id,
        category = %category,
        "Creating rate range"
    );

    let group = state.rates.create_range(category, input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(group))))
}

/// Rewrite the group under `key`
pub async fn update_range(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((category, key)): ApiPath<(Category, String)>,
    ApiJson(input): ApiJson<TermRangeInput>,
) -> Result<Json<ApiResponse<RangeGroup>>> {
    auth.require_scope(SCOPE_ADMIN)?;

    let key = parse_key(&key)?;
    tracing::info!(
        user_id = %auth.user_id,
        request_id = %auth.request_id,
        category = %category,
        key = %key,
        "Updating rate range"
    );

    let group = state.rates.update_range(category, key, input).await?;
    Ok(Json(ApiResponse::ok(group)))
}

/// Remove every term row under `key`
pub async fn delete_range(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((category, key)): ApiPath<(Category, String)>,
) -> Result<Json<DeleteResponse>> {
    auth.require_scope(SCOPE_ADMIN)?;

    let key = parse_key(&key)?;
    tracing::info!(
        user_id = %auth.user_id,
        request_id = %auth.request_id,
        category = %category,
        key = %key,
        "Deleting rate range"
    );

    state.rates.delete_range(category, key).await?;
    Ok(Json(DeleteResponse { success: true }))
}
