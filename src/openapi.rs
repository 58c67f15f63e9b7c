use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = r#"
REST backend for a small e-commerce storefront: a product catalog with
filtering and search, category management, JWT-authenticated accounts,
and per-user orders with delivery addresses.

## Authentication

Obtain a token pair from `/api/login/` and send the access token as:

```
Authorization: Bearer <access-token>
```

Refresh tokens are single use; exchange them at `/api/token/refresh/`.
"#
    ),
    tags(
        (name = "auth", description = "Registration, login, and token refresh"),
        (name = "products", description = "Product catalog"),
        (name = "categories", description = "Category management"),
        (name = "orders", description = "Orders, checkout, and delivery addresses"),
        (name = "account", description = "Profile and role lookups"),
        (name = "health", description = "Liveness")
    ),
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh_token,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::categories::list_categories,
        crate::handlers::categories::get_category,
        crate::handlers::categories::create_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::delete_order,
        crate::handlers::orders::place_order,
        crate::handlers::orders::get_address,
        crate::handlers::orders::save_address,
        crate::handlers::orders::admin_orders,
        crate::handlers::account::profile,
        crate::handlers::account::user_role,
        crate::handlers::health::home,
        crate::handlers::health::health,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::auth::TokenPair,
        crate::handlers::auth::RefreshRequest,
        crate::handlers::auth::MessageResponse,
        crate::services::accounts::RegisterInput,
        crate::services::accounts::LoginInput,
        crate::services::accounts::ProfileView,
        crate::services::accounts::RoleView,
        crate::services::catalog::ProductView,
        crate::services::catalog::CreateProductInput,
        crate::services::catalog::UpdateProductInput,
        crate::services::catalog::CategoryView,
        crate::services::catalog::CategoryInput,
        crate::services::orders::OrderView,
        crate::services::orders::OrderItemView,
        crate::services::orders::OrderItemInput,
        crate::services::orders::CreateOrderInput,
        crate::services::orders::AddressInput,
        crate::services::orders::PlaceOrderInput,
    ))
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
