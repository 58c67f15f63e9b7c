use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde_json::{json, Value};
use storefront_api::{
    config::AppConfig,
    db,
    entities::{category, product, user},
    AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

/// Test harness: the full application router backed by a throwaway
/// file-based SQLite database, one per instance so tests can run in
/// parallel.
pub struct TestApp {
    pub state: AppState,
    router: Router,
    db_file: String,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_file = format!("storefront_test_{}.db", Uuid::new_v4().simple());
        let _ = std::fs::remove_file(&db_file);

        let cfg = AppConfig::new(
            format!("sqlite://{db_file}?mode=rwc"),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
        );

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = storefront_api::app_router(state.clone());

        Self {
            state,
            router,
            db_file,
        }
    }

    /// Issue a request against the in-process router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error")
    }

    /// Register a user and log in, returning `(access, refresh)`.
    pub async fn register_and_login(&self, username: &str, password: &str) -> (String, String) {
        let response = self
            .request(
                Method::POST,
                "/api/register/",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": password,
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        self.login(username, password).await
    }

    pub async fn login(&self, username: &str, password: &str) -> (String, String) {
        let response = self
            .request(
                Method::POST,
                "/api/login/",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let tokens = read_json(response).await;
        (
            tokens["access"].as_str().expect("access token").to_string(),
            tokens["refresh"]
                .as_str()
                .expect("refresh token")
                .to_string(),
        )
    }

    /// Flip the staff flag on an existing user.
    pub async fn make_staff(&self, username: &str) {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.state.db)
            .await
            .expect("query user")
            .expect("user exists");

        let mut model: user::ActiveModel = found.into();
        model.is_staff = Set(true);
        model.update(&*self.state.db).await.expect("update user");
    }

    pub async fn seed_category(&self, name: &str) -> Uuid {
        let created = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
        }
        .insert(&*self.state.db)
        .await
        .expect("insert category");
        created.id
    }

    pub async fn seed_product(
        &self,
        title: &str,
        company: &str,
        price: Decimal,
        rating: i32,
        category_id: Uuid,
    ) -> Uuid {
        let created = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            image_url: Set(String::new()),
            new_price: Set(price),
            prev_price: Set(None),
            company: Set(company.to_string()),
            category_id: Set(category_id),
            reviews: Set(String::new()),
            rating: Set(rating),
            quantity: Set(10),
            is_new: Set(false),
            has_discount: Set(false),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("insert product");
        created.id
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_file);
    }
}

/// Read and parse a JSON response body.
pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
}
