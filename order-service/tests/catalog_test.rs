mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::{json, Value};

fn product(name: &str, category: &str, price: Value) -> Value {
    json!({
        "name": name,
        "description": "Everyday staple",
        "price": price,
        "category": category,
        "stock": 25,
        "weight": "5kg",
        "image": "https://cdn.example.com/rice.png"
    })
}

#[tokio::test]
async fn creates_and_fetches_products() {
    let app = TestApp::new();

    let (status, created) = app
        .post("/products", product("Rice 5kg", "staples", json!(250)))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["price"], "250.00");
    assert_eq!(created["category"], "staples");

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = app.get(&format!("/products/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Rice 5kg");
}

#[tokio::test]
async fn duplicate_name_conflicts() {
    let app = TestApp::new();
    app.post("/products", product("Milk 1L", "dairy", json!("58")))
        .await;

    let (status, body) = app
        .post("/products", product("Milk 1L", "dairy", json!("60")))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Product with this name already exists");
}

#[tokio::test]
async fn rejects_invalid_category_and_price() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/products", product("Laptop", "electronics", json!(999)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid category. Must be one of: fruits"));

    let (status, _) = app
        .post("/products", product("Free Bread", "bakery", json!(0)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/products", product("Odd Bread", "bakery", json!(-3)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn filters_by_category() {
    let app = TestApp::new();
    app.post("/products", product("Apples 1kg", "fruits", json!(180)))
        .await;
    app.post("/products", product("Bananas 1 dozen", "fruits", json!(60)))
        .await;
    app.post("/products", product("Curd 400g", "dairy", json!(45)))
        .await;

    let (status, all) = app.get("/products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 3);
    assert_eq!(all[0]["name"], "Curd 400g");

    let (_, fruits) = app.get("/products?category=fruits").await;
    assert_eq!(fruits.as_array().unwrap().len(), 2);

    let (status, _) = app.get("/products?category=toys").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lists_categories() {
    let app = TestApp::new();

    let (status, body) = app.get("/products/categories").await;

    assert_eq!(status, StatusCode::OK);
    let categories: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap())
        .collect();
    assert_eq!(categories.len(), 13);
    assert!(categories.contains(&"personal-care"));
}

#[tokio::test]
async fn updates_and_deletes_products() {
    let app = TestApp::new();
    let (_, created) = app
        .post("/products", product("Atta 10kg", "staples", json!(420)))
        .await;
    let uri = format!("/products/{}", created["id"].as_str().unwrap());

    let (status, updated) = app.put(&uri, json!({ "price": "399.999", "stock": 0 })).await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["price"], "400.00");
    assert_eq!(updated["stock"], 0);
    assert_eq!(updated["name"], "Atta 10kg");

    let (status, _) = app.put(&uri, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.delete(&uri).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn confirmed_orders_project_live_catalog_entries() {
    let app = TestApp::new();
    app.create_user(common::BUYER, "ext-1").await;
    let (_, rice) = app
        .post("/products", product("Rice 5kg", "staples", json!(250)))
        .await;

    let mut order = common::rice_order("razorpay");
    order["products"][0]["productId"] = rice["id"].clone();
    let (_, placed) = app.post("/order/create", order).await;
    let razorpay_order_id = placed["razorpayOrder"]["id"].as_str().unwrap().to_string();
    app.post(
        "/order/verify",
        json!({
            "razorpay_order_id": razorpay_order_id,
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": app.gateway.sign(&razorpay_order_id, "pay_1"),
        }),
    )
    .await;

    // Later price changes do not rewrite the captured line item.
    let uri = format!("/products/{}", rice["id"].as_str().unwrap());
    app.put(&uri, json!({ "price": 275 })).await;

    let (status, orders) = app.get(&format!("/order/user/{}", common::BUYER)).await;
    assert_eq!(status, StatusCode::OK, "{}", orders);
    let item = &orders[0]["products"][0];
    assert_eq!(item["price"], "250.00");
    assert_eq!(item["product"]["name"], "Rice 5kg");
    assert_eq!(item["product"]["price"], "275.00");
}
