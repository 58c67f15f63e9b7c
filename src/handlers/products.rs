use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::services::catalog::{CreateProductInput, ProductFilter, ProductView, UpdateProductInput};
use crate::AppState;

/// List products with optional filtering and ordering
#[utoipa::path(
    get,
    path = "/api/products/",
    params(ProductFilter),
    responses(
        (status = 200, description = "Products returned", body = [ProductView]),
        (status = 400, description = "Malformed filter or unknown ordering field")
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state.services.catalog.list_products(&filter).await?;
    Ok(success_response(products))
}

/// Fetch a single product
#[utoipa::path(
    get,
    path = "/api/products/:id/",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product returned", body = ProductView),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.services.catalog.get_product(id).await?;
    Ok(success_response(product))
}

/// Create a product (any authenticated user)
#[utoipa::path(
    post,
    path = "/api/products/",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created", body = ProductView),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let product = state.services.catalog.create_product(payload).await?;
    Ok(created_response(product))
}

/// Update a product (any authenticated user)
#[utoipa::path(
    put,
    path = "/api/products/:id/",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductInput,
    responses(
        (status = 200, description = "Product updated", body = ProductView),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let product = state.services.catalog.update_product(id, payload).await?;
    Ok(success_response(product))
}

/// Delete a product (any authenticated user)
#[utoipa::path(
    delete,
    path = "/api/products/:id/",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.catalog.delete_product(id).await?;
    Ok(no_content_response())
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products/", get(list_products).post(create_product))
        .route(
            "/products/:id/",
            get(get_product).put(update_product).delete(delete_product),
        )
}
