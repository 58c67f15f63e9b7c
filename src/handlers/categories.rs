use std::collections::BTreeMap;

use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::auth::AuthUser;
use crate::errors::{ApiError, ServiceError};
use crate::services::catalog::{CategoryInput, CategoryView};
use crate::AppState;

fn require_staff(user: &AuthUser) -> Result<(), ApiError> {
    if user.is_staff {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("Staff access required".to_string()).into())
    }
}

// Name clashes surface the way field validation does.
fn name_conflict_to_field_errors(err: ServiceError) -> ApiError {
    match err {
        ServiceError::Conflict(message) => {
            let mut fields = BTreeMap::new();
            fields.insert("name".to_string(), vec![message]);
            ApiError::FieldErrors(fields)
        }
        other => other.into(),
    }
}

/// List categories with product counts
#[utoipa::path(
    get,
    path = "/api/categories/",
    responses(
        (status = 200, description = "Categories returned", body = [CategoryView])
    ),
    tag = "categories"
)]
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(success_response(categories))
}

/// Fetch a single category
#[utoipa::path(
    get,
    path = "/api/categories/:id/",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category returned", body = CategoryView),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.services.catalog.get_category(id).await?;
    Ok(success_response(category))
}

/// Create a category (staff only)
#[utoipa::path(
    post,
    path = "/api/categories/",
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Category created", body = CategoryView),
        (status = 400, description = "Validation failed or name already in use"),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not staff", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    require_staff(&user)?;
    validate_input(&payload)?;
    let category = state
        .services
        .catalog
        .create_category(payload)
        .await
        .map_err(name_conflict_to_field_errors)?;
    Ok(created_response(category))
}

/// Rename a category (staff only)
#[utoipa::path(
    put,
    path = "/api/categories/:id/",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = CategoryInput,
    responses(
        (status = 200, description = "Category updated", body = CategoryView),
        (status = 400, description = "Validation failed or name already in use"),
        (status = 403, description = "Not staff", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    require_staff(&user)?;
    validate_input(&payload)?;
    let category = state
        .services
        .catalog
        .update_category(id, payload)
        .await
        .map_err(name_conflict_to_field_errors)?;
    Ok(success_response(category))
}

/// Delete a category and its products (staff only)
#[utoipa::path(
    delete,
    path = "/api/categories/:id/",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 403, description = "Not staff", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_staff(&user)?;
    state.services.catalog.delete_category(id).await?;
    Ok(no_content_response())
}

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories/", get(list_categories).post(create_category))
        .route(
            "/categories/:id/",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}
