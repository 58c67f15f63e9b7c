use std::collections::BTreeMap;

use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

use super::common::{created_response, success_response, validate_input};
use crate::auth::TokenPair;
use crate::errors::{ApiError, ServiceError};
use crate::services::accounts::{LoginInput, RegisterInput};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/register/",
    request_body = RegisterInput,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 400, description = "Validation failed or username taken")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    match state.services.accounts.register(payload).await {
        Ok(user) => {
            info!("User {} registered", user.username);
            Ok(created_response(json!({
                "message": "User created successfully"
            })))
        }
        // Duplicate usernames surface the way field validation does.
        Err(ServiceError::Conflict(message)) => {
            let mut fields = BTreeMap::new();
            fields.insert("username".to_string(), vec![message]);
            Err(ApiError::FieldErrors(fields))
        }
        Err(err) => Err(err.into()),
    }
}

/// Log in with username and password
#[utoipa::path(
    post,
    path = "/api/login/",
    request_body = LoginInput,
    responses(
        (status = 200, description = "Token pair issued", body = TokenPair),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let user = state.services.accounts.verify_credentials(&payload).await?;
    let tokens = state
        .services
        .auth
        .issue_tokens(&user)
        .await
        .map_err(ServiceError::from)?;

    info!("User {} logged in", user.username);
    Ok(success_response(tokens))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/api/token/refresh/",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token pair rotated", body = TokenPair),
        (status = 401, description = "Expired, revoked, or malformed token", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state
        .services
        .auth
        .refresh(&payload.refresh)
        .await
        .map_err(ServiceError::from)?;

    Ok(success_response(tokens))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register/", post(register))
        .route("/login/", post(login))
        .route("/token/refresh/", post(refresh_token))
}
