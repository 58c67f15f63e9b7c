use axum::{extract::State, response::IntoResponse, routing::get, Router};

use super::common::success_response;
use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::services::accounts::{ProfileView, RoleView};
use crate::AppState;

/// The caller's account summary
#[utoipa::path(
    get,
    path = "/api/profile/",
    responses(
        (status = 200, description = "Profile returned", body = ProfileView),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse)
    ),
    tag = "account"
)]
pub async fn profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.services.accounts.profile(user.id).await?;
    Ok(success_response(profile))
}

/// The caller's username and staff flag
#[utoipa::path(
    get,
    path = "/api/user-role/",
    responses(
        (status = 200, description = "Role returned", body = RoleView),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse)
    ),
    tag = "account"
)]
pub async fn user_role(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let role = state.services.accounts.user_role(user.id).await?;
    Ok(success_response(role))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/profile/", get(profile))
        .route("/user-role/", get(user_role))
}
