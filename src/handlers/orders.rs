use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde_json::json;
use uuid::Uuid;

use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::auth::AuthUser;
use crate::errors::{ApiError, ServiceError};
use crate::services::orders::{AddressInput, CreateOrderInput, OrderView, PlaceOrderInput};
use crate::AppState;

/// List the caller's orders
#[utoipa::path(
    get,
    path = "/api/orders/",
    responses(
        (status = 200, description = "Orders returned", body = [OrderView]),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state.services.orders.list_orders(user.id).await?;
    Ok(success_response(orders))
}

/// Create an order; line prices come from the current product rows
#[utoipa::path(
    post,
    path = "/api/orders/",
    request_body = CreateOrderInput,
    responses(
        (status = 201, description = "Order created", body = OrderView),
        (status = 400, description = "Empty order or unknown product"),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let order = state.services.orders.create_order(user.id, payload).await?;
    Ok(created_response(order))
}

/// Fetch one of the caller's orders
#[utoipa::path(
    get,
    path = "/api/orders/:id/",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order returned", body = OrderView),
        (status = 404, description = "Not found or owned by another user", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.services.orders.get_order(user.id, id).await?;
    Ok(success_response(order))
}

/// Delete one of the caller's orders
#[utoipa::path(
    delete,
    path = "/api/orders/:id/",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 404, description = "Not found or owned by another user", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.orders.delete_order(user.id, id).await?;
    Ok(no_content_response())
}

/// Checkout: save the delivery address and create the order atomically
#[utoipa::path(
    post,
    path = "/api/place-order/",
    request_body = PlaceOrderInput,
    responses(
        (status = 200, description = "Order placed"),
        (status = 400, description = "Validation failed or unknown product"),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PlaceOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    state.services.orders.place_order(user.id, payload).await?;
    Ok(success_response(json!({ "success": "Order created!" })))
}

/// Fetch the caller's delivery address; `{}` when none is saved
#[utoipa::path(
    get,
    path = "/api/address/",
    responses(
        (status = 200, description = "Address or empty object"),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn get_address(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    match state.services.orders.get_address(user.id).await? {
        Some(address) => Ok(success_response(address)),
        None => Ok(success_response(json!({}))),
    }
}

/// Create or replace the caller's delivery address
#[utoipa::path(
    post,
    path = "/api/address/",
    request_body = AddressInput,
    responses(
        (status = 200, description = "Address saved"),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn save_address(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddressInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let address = state.services.orders.upsert_address(user.id, payload).await?;
    Ok(success_response(address))
}

/// All orders across users, newest first (staff only)
#[utoipa::path(
    get,
    path = "/api/admin-orders/",
    responses(
        (status = 200, description = "Orders returned", body = [OrderView]),
        (status = 401, description = "Unauthenticated", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not staff", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn admin_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    if !user.is_staff {
        return Err(ServiceError::Forbidden("Staff access required".to_string()).into());
    }
    let orders = state.services.orders.list_all_orders().await?;
    Ok(success_response(orders))
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders/", get(list_orders).post(create_order))
        .route("/orders/:id/", get(get_order).delete(delete_order))
        .route("/place-order/", axum::routing::post(place_order))
        .route("/address/", get(get_address).post(save_address))
        .route("/admin-orders/", get(admin_orders))
}
