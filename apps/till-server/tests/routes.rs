//! Router tests driving the full middleware stack with `oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use till_core::Role;
use till_db::{Database, DbConfig, NewProduct};
use till_server::{router, AppState, JwtManager};

const SECRET: &str = "router-test-secret";

struct TestApp {
    app: Router,
    jwt: JwtManager,
    db: Database,
    cash: i64,
    burger: i64,
    cheese: i64,
}

async fn app() -> TestApp {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let catalog = db.catalog();

    let cash = catalog.insert_payment_method("Cash").await.unwrap().id;
    let burger = catalog
        .insert_product(&NewProduct::fixed("Burger", 1000).stock(5))
        .await
        .unwrap()
        .id;
    let toppings = catalog.insert_additional_category("Toppings").await.unwrap().id;
    let cheese = catalog.insert_additional("Extra cheese", 200, toppings).await.unwrap().id;
    catalog.allow_category(burger, toppings).await.unwrap();

    TestApp {
        app: router(AppState::new(db.clone(), JwtManager::new(SECRET, 3600))),
        jwt: JwtManager::new(SECRET, 3600),
        db,
        cash,
        burger,
        cheese,
    }
}

impl TestApp {
    fn token(&self, user_id: i64, role: Role) -> String {
        self.jwt.issue_token(user_id, role).unwrap()
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn burger_sale(&self) -> Value {
        json!({
            "paymentMethodId": self.cash,
            "items": [{
                "productId": self.burger,
                "quantity": 2,
                "additionals": [{ "additionalId": self.cheese, "unitPrice": 2.0 }]
            }]
        })
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = app().await;

    let (status, body) = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "database": "ok" }));
}

#[tokio::test]
async fn test_sales_require_token() {
    let app = app().await;

    let (status, body) = app.send(Method::GET, "/api/sales", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.send(Method::GET, "/api/sales", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_post_edit_void_flow() {
    let app = app().await;
    let cashier = app.token(7, Role::Cashier);
    let admin = app.token(1, Role::Admin);

    let (status, sale) = app
        .send(Method::POST, "/api/sales", Some(&cashier), Some(app.burger_sale()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sale["totalCents"], 2200);
    assert_eq!(sale["userId"], 7);
    let sale_id = sale["id"].as_i64().unwrap();
    let item_id = sale["items"][0]["id"].as_i64().unwrap();

    let (status, edited) = app
        .send(
            Method::PUT,
            &format!("/api/sales/{sale_id}"),
            Some(&cashier),
            Some(json!({ "items": [{ "itemId": item_id, "quantity": 1 }] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["totalCents"], 1200);

    let (status, body) = app
        .send(Method::DELETE, &format!("/api/sales/{sale_id}"), Some(&cashier), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/sales/{sale_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .send(Method::GET, &format!("/api/sales/{sale_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let stock = app.db.catalog().product_stock(app.burger).await.unwrap();
    assert_eq!(stock, till_core::StockLevel::Tracked(5));
}

#[tokio::test]
async fn test_rule_violations_map_to_status_codes() {
    let app = app().await;
    let cashier = app.token(7, Role::Cashier);

    let too_many = json!({
        "paymentMethodId": app.cash,
        "items": [{ "productId": app.burger, "quantity": 9 }]
    });
    let (status, body) = app.send(Method::POST, "/api/sales", Some(&cashier), Some(too_many)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    let bad_quantity = json!({
        "paymentMethodId": app.cash,
        "items": [{ "productId": app.burger, "quantity": "two" }]
    });
    let (status, body) = app
        .send(Method::POST, "/api/sales", Some(&cashier), Some(bad_quantity))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let unknown_product = json!({
        "paymentMethodId": app.cash,
        "items": [{ "productId": 999, "quantity": 1 }]
    });
    let (status, body) = app
        .send(Method::POST, "/api/sales", Some(&cashier), Some(unknown_product))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_json_is_validation_error() {
    let app = app().await;
    let cashier = app.token(7, Role::Cashier);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/sales")
        .header(header::AUTHORIZATION, format!("Bearer {cashier}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().contains_key("x-request-id"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_list_is_scoped_to_cashier() {
    let app = app().await;
    let first = app.token(7, Role::Cashier);
    let second = app.token(8, Role::Cashier);
    let admin = app.token(1, Role::Admin);

    for token in [&first, &second] {
        let (status, _) = app
            .send(Method::POST, "/api/sales", Some(token), Some(app.burger_sale()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, own) = app.send(Method::GET, "/api/sales", Some(&first), None).await;
    assert_eq!(own.as_array().unwrap().len(), 1);
    assert_eq!(own[0]["userId"], 7);

    let (_, all) = app.send(Method::GET, "/api/sales", Some(&admin), None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let uri = format!("/api/sales?paymentMethodId={}&productId={}", app.cash, app.burger);
    let (status, filtered) = app.send(Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(filtered.as_array().unwrap().len(), 2);

    let (status, body) = app
        .send(Method::GET, "/api/sales?start=yesterday", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
