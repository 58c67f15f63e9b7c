/*!
Storefront API: a REST backend for a small e-commerce storefront.

Products and categories are publicly readable; catalog writes, orders,
and account endpoints require a JWT access token. Orders are always
scoped to their owner, with a staff-only listing across users.
*/

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::{AccountService, CatalogService, OrderService};

/// Services shared by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub auth: AuthService,
    pub accounts: AccountService,
    pub catalog: CatalogService,
    pub orders: OrderService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, auth: AuthService) -> Self {
        Self {
            accounts: AccountService::new(db.clone(), auth.clone()),
            catalog: CatalogService::new(db.clone()),
            orders: OrderService::new(db),
            auth,
        }
    }
}

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: AppConfig,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: AppConfig) -> Self {
        let auth = AuthService::new(config.auth_config(), db.clone());
        let services = AppServices::new(db.clone(), auth);
        Self {
            db,
            config,
            services,
        }
    }
}

/// All `/api/*` routes. The API root answers the same liveness message
/// as `/`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::get(handlers::health::home))
        .merge(handlers::auth::auth_routes())
        .merge(handlers::products::product_routes())
        .merge(handlers::categories::category_routes())
        .merge(handlers::orders::order_routes())
        .merge(handlers::account::account_routes())
}

/// The complete application router: liveness, the API, and Swagger UI,
/// wrapped in HTTP tracing. CORS is layered on by the caller since it
/// depends on deployment configuration.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::health::health_routes())
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
