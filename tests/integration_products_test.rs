mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use common::{read_json, TestApp};

async fn seed_catalog(app: &TestApp) {
    let electronics = app.seed_category("Electronics").await;
    let books = app.seed_category("Books").await;

    app.seed_product("Laptop", "Lenovo", dec!(999.00), 5, electronics)
        .await;
    app.seed_product("Headphones", "Sony", dec!(199.00), 4, electronics)
        .await;
    app.seed_product("Rust in Action", "Manning", dec!(39.00), 5, books)
        .await;
}

fn titles(body: &Value) -> Vec<String> {
    body.as_array()
        .expect("array body")
        .iter()
        .map(|p| p["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn products_are_publicly_listable() {
    let app = TestApp::new().await;
    seed_catalog(&app).await;

    let response = app.request(Method::GET, "/api/products/", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    // Every product carries its resolved category name.
    let laptop = body
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["title"] == "Laptop")
        .unwrap();
    assert_eq!(laptop["category_name"], "Electronics");
}

#[tokio::test]
async fn price_bounds_filter_inclusively() {
    let app = TestApp::new().await;
    seed_catalog(&app).await;

    let response = app
        .request(
            Method::GET,
            "/api/products/?price_min=39&price_max=199",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let mut found = titles(&body);
    found.sort();
    assert_eq!(found, vec!["Headphones", "Rust in Action"]);
}

#[tokio::test]
async fn category_filter_is_case_insensitive() {
    let app = TestApp::new().await;
    seed_catalog(&app).await;

    for query in ["electronics", "ELECTRONICS", "Electronics"] {
        let response = app
            .request(
                Method::GET,
                &format!("/api/products/?category={query}"),
                None,
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 2, "category={query}");
    }

    let response = app
        .request(Method::GET, "/api/products/?category=nonexistent", None, None)
        .await;
    let body = read_json(response).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn search_matches_title_and_company() {
    let app = TestApp::new().await;
    seed_catalog(&app).await;

    let response = app
        .request(Method::GET, "/api/products/?search=laptop", None, None)
        .await;
    let body = read_json(response).await;
    assert_eq!(titles(&body), vec!["Laptop"]);

    let response = app
        .request(Method::GET, "/api/products/?search=sony", None, None)
        .await;
    let body = read_json(response).await;
    assert_eq!(titles(&body), vec!["Headphones"]);
}

#[tokio::test]
async fn search_treats_like_metacharacters_literally() {
    let app = TestApp::new().await;
    let category = app.seed_category("Clothing").await;
    app.seed_product("100% Cotton Shirt", "Plainwear", dec!(25.00), 4, category)
        .await;
    app.seed_product("100 Days Planner", "Paperco", dec!(15.00), 5, category)
        .await;

    // "%" in the query must not act as a wildcard.
    let response = app
        .request(Method::GET, "/api/products/?search=100%25", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(titles(&body), vec!["100% Cotton Shirt"]);
}

#[tokio::test]
async fn ordering_sorts_by_whitelisted_fields() {
    let app = TestApp::new().await;
    seed_catalog(&app).await;

    let response = app
        .request(Method::GET, "/api/products/?ordering=new_price", None, None)
        .await;
    let body = read_json(response).await;
    assert_eq!(titles(&body), vec!["Rust in Action", "Headphones", "Laptop"]);

    let response = app
        .request(Method::GET, "/api/products/?ordering=-new_price", None, None)
        .await;
    let body = read_json(response).await;
    assert_eq!(titles(&body), vec!["Laptop", "Headphones", "Rust in Action"]);
}

#[tokio::test]
async fn malformed_numeric_filters_are_rejected() {
    let app = TestApp::new().await;
    seed_catalog(&app).await;

    let response = app
        .request(Method::GET, "/api/products/?price_min=abc", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(Method::GET, "/api/products/?price_max=12..5", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_ordering_field_is_rejected() {
    let app = TestApp::new().await;
    seed_catalog(&app).await;

    let response = app
        .request(
            Method::GET,
            "/api/products/?ordering=password_hash",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn product_writes_require_authentication() {
    let app = TestApp::new().await;
    let category = app.seed_category("Electronics").await;

    let payload = json!({
        "title": "Keyboard",
        "new_price": "49.00",
        "category": category.to_string(),
    });

    let response = app
        .request(Method::POST, "/api/products/", None, Some(payload.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Any authenticated user may write to the catalog.
    let (access, _) = app.register_and_login("gina", "pw-pw-pw-pw").await;
    let response = app
        .request(Method::POST, "/api/products/", Some(&access), Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["title"], "Keyboard");
    assert_eq!(body["category_name"], "Electronics");
}

#[tokio::test]
async fn product_crud_round_trip() {
    let app = TestApp::new().await;
    let category = app.seed_category("Electronics").await;
    let (access, _) = app.register_and_login("hank", "pw-pw-pw-pw").await;

    let response = app
        .request(
            Method::POST,
            "/api/products/",
            Some(&access),
            Some(json!({
                "title": "Monitor",
                "new_price": "299.00",
                "category": category.to_string(),
                "rating": 4,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/products/{id}/"),
            Some(&access),
            Some(json!({ "new_price": "249.00", "has_discount": true })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await;
    let new_price: rust_decimal::Decimal = updated["new_price"].as_str().unwrap().parse().unwrap();
    assert_eq!(new_price, dec!(249.00));
    assert_eq!(updated["has_discount"], true);
    assert_eq!(updated["title"], "Monitor");

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/products/{id}/"),
            Some(&access),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(Method::GET, &format!("/api/products/{id}/"), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_create_rejects_unknown_category_and_bad_rating() {
    let app = TestApp::new().await;
    let (access, _) = app.register_and_login("iris", "pw-pw-pw-pw").await;

    let response = app
        .request(
            Method::POST,
            "/api/products/",
            Some(&access),
            Some(json!({
                "title": "Ghost",
                "new_price": "10.00",
                "category": uuid::Uuid::new_v4().to_string(),
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let category = app.seed_category("Electronics").await;
    let response = app
        .request(
            Method::POST,
            "/api/products/",
            Some(&access),
            Some(json!({
                "title": "Overrated",
                "new_price": "10.00",
                "category": category.to_string(),
                "rating": 9,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["rating"].is_array());
}
