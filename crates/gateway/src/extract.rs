//! Extractors that report rejections in the API error envelope

use axum::extract::FromRequest;
use axum::extract::FromRequestParts;
use lendrate_common::errors::AppError;

/// JSON body; malformed or unknown fields answer 400 `{success: false, ...}`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path parameters, rejected the same way
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query string, rejected the same way
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
