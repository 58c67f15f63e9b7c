mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use storefront_api::entities::{delivery_address, order};
use uuid::Uuid;

use common::{read_json, TestApp};

#[tokio::test]
async fn order_prices_come_from_the_product_row() {
    let app = TestApp::new().await;
    let category = app.seed_category("Electronics").await;
    let product = app
        .seed_product("Laptop", "Lenovo", dec!(999.00), 5, category)
        .await;

    let (access, _) = app.register_and_login("nina", "pw-pw-pw-pw").await;

    // The client-supplied price is ignored.
    let response = app
        .request(
            Method::POST,
            "/api/orders/",
            Some(&access),
            Some(json!({
                "items": [
                    { "product": product.to_string(), "quantity": 2, "price": "0.01" }
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    let price: rust_decimal::Decimal = body["items"][0]["price"].as_str().unwrap().parse().unwrap();
    assert_eq!(price, dec!(999.00));
    assert_eq!(body["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn empty_orders_and_unknown_products_are_rejected() {
    let app = TestApp::new().await;
    let (access, _) = app.register_and_login("omar", "pw-pw-pw-pw").await;

    let response = app
        .request(
            Method::POST,
            "/api/orders/",
            Some(&access),
            Some(json!({ "items": [] })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::POST,
            "/api/orders/",
            Some(&access),
            Some(json!({
                "items": [
                    { "product": Uuid::new_v4().to_string(), "quantity": 1 }
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was committed.
    let count = order::Entity::find().count(&*app.state.db).await.unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn orders_are_scoped_to_their_owner() {
    let app = TestApp::new().await;
    let category = app.seed_category("Electronics").await;
    let product = app
        .seed_product("Mouse", "Logitech", dec!(29.00), 4, category)
        .await;

    let (owner, _) = app.register_and_login("pam", "pw-pw-pw-pw").await;
    let (intruder, _) = app.register_and_login("quinn", "pw-pw-pw-pw").await;

    let response = app
        .request(
            Method::POST,
            "/api/orders/",
            Some(&owner),
            Some(json!({
                "items": [{ "product": product.to_string(), "quantity": 1 }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order_id = read_json(response).await["id"].as_str().unwrap().to_string();

    // Owner sees it.
    let response = app
        .request(Method::GET, "/api/orders/", Some(&owner), None)
        .await;
    let body = read_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    // The other user sees an empty list and a 404 on direct access.
    let response = app
        .request(Method::GET, "/api/orders/", Some(&intruder), None)
        .await;
    let body = read_json(response).await;
    assert!(body.as_array().unwrap().is_empty());

    let response = app
        .request(
            Method::GET,
            &format!("/api/orders/{order_id}/"),
            Some(&intruder),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/orders/{order_id}/"),
            Some(&intruder),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The owner can delete it.
    let response = app
        .request(
            Method::DELETE,
            &format!("/api/orders/{order_id}/"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn place_order_saves_address_and_order_together() {
    let app = TestApp::new().await;
    let category = app.seed_category("Electronics").await;
    let product = app
        .seed_product("Laptop", "Lenovo", dec!(999.00), 5, category)
        .await;

    let (access, _) = app.register_and_login("rita", "pw-pw-pw-pw").await;

    let response = app
        .request(
            Method::POST,
            "/api/place-order/",
            Some(&access),
            Some(json!({
                "address": "1 Main St",
                "city": "Kyiv",
                "postal_code": "01001",
                "phone": "+380501234567",
                "items": [{ "product": product.to_string(), "quantity": 1 }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], "Order created!");

    // Address is saved and visible.
    let response = app
        .request(Method::GET, "/api/address/", Some(&access), None)
        .await;
    let body = read_json(response).await;
    assert_eq!(body["address"], "1 Main St");
    assert_eq!(body["city"], "Kyiv");

    // Exactly one order landed.
    let response = app
        .request(Method::GET, "/api/orders/", Some(&access), None)
        .await;
    let body = read_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_place_order_rolls_back_the_address() {
    let app = TestApp::new().await;
    let (access, _) = app.register_and_login("sven", "pw-pw-pw-pw").await;

    let response = app
        .request(
            Method::POST,
            "/api/place-order/",
            Some(&access),
            Some(json!({
                "address": "2 Side St",
                "city": "Lviv",
                "postal_code": "79000",
                "phone": "+380501112233",
                "items": [{ "product": Uuid::new_v4().to_string(), "quantity": 1 }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The address upsert rolled back with the order.
    let saved = delivery_address::Entity::find()
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(saved, 0);
}

#[tokio::test]
async fn address_endpoint_upserts_a_single_row() {
    let app = TestApp::new().await;
    let (access, _) = app.register_and_login("tara", "pw-pw-pw-pw").await;

    // No address yet: an empty object, not a 404.
    let response = app
        .request(Method::GET, "/api/address/", Some(&access), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body, json!({}));

    let first = json!({
        "address": "1 Old Rd",
        "city": "Odesa",
        "postal_code": "65000",
        "phone": "+380671234567",
    });
    let response = app
        .request(Method::POST, "/api/address/", Some(&access), Some(first))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let second = json!({
        "address": "9 New Ave",
        "city": "Odesa",
        "postal_code": "65001",
        "phone": "+380671234567",
    });
    let response = app
        .request(Method::POST, "/api/address/", Some(&access), Some(second))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(
        app.request(Method::GET, "/api/address/", Some(&access), None)
            .await,
    )
    .await;
    assert_eq!(body["address"], "9 New Ave");
    assert_eq!(body["postal_code"], "65001");

    let rows = delivery_address::Entity::find()
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn address_validation_returns_field_errors() {
    let app = TestApp::new().await;
    let (access, _) = app.register_and_login("uma", "pw-pw-pw-pw").await;

    let response = app
        .request(
            Method::POST,
            "/api/address/",
            Some(&access),
            Some(json!({
                "address": "",
                "city": "",
                "postal_code": "",
                "phone": "",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["address"].is_array());
    assert!(body["city"].is_array());
}

#[tokio::test]
async fn admin_orders_lists_everything_newest_first_for_staff_only() {
    let app = TestApp::new().await;
    let category = app.seed_category("Electronics").await;
    let product = app
        .seed_product("Mouse", "Logitech", dec!(29.00), 4, category)
        .await;

    let (first_user, _) = app.register_and_login("vera", "pw-pw-pw-pw").await;
    let (second_user, _) = app.register_and_login("wade", "pw-pw-pw-pw").await;

    for token in [&first_user, &second_user] {
        let response = app
            .request(
                Method::POST,
                "/api/orders/",
                Some(token),
                Some(json!({
                    "items": [{ "product": product.to_string(), "quantity": 1 }]
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    // Non-staff is refused.
    let response = app
        .request(Method::GET, "/api/admin-orders/", Some(&first_user), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Staff status is baked into the token, so log in again.
    app.make_staff("vera").await;
    let (staff_token, _) = app.login("vera", "pw-pw-pw-pw").await;
    let response = app
        .request(Method::GET, "/api/admin-orders/", Some(&staff_token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 2);

    // Newest first.
    let first_created = orders[0]["created_at"].as_str().unwrap();
    let last_created = orders[1]["created_at"].as_str().unwrap();
    assert!(first_created >= last_created);
}

#[tokio::test]
async fn profile_counts_orders() {
    let app = TestApp::new().await;
    let category = app.seed_category("Electronics").await;
    let product = app
        .seed_product("Mouse", "Logitech", dec!(29.00), 4, category)
        .await;

    let (access, _) = app.register_and_login("xena", "pw-pw-pw-pw").await;

    for _ in 0..2 {
        let response = app
            .request(
                Method::POST,
                "/api/orders/",
                Some(&access),
                Some(json!({
                    "items": [{ "product": product.to_string(), "quantity": 1 }]
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let body = read_json(
        app.request(Method::GET, "/api/profile/", Some(&access), None)
            .await,
    )
    .await;
    assert_eq!(body["orders_count"], 2);
}
