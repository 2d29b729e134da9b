mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn creates_user_with_address_ids() {
    let app = TestApp::new();

    let user = app.create_user("+919876543210", "firebase-uid-1").await;

    assert_eq!(user["number"], "+919876543210");
    assert_eq!(user["externalId"], "firebase-uid-1");
    let address_id = user["addresses"][0]["id"].as_str().unwrap();
    assert!(!address_id.is_empty());
}

#[tokio::test]
async fn duplicate_number_or_external_id_conflicts() {
    let app = TestApp::new();
    app.create_user("+919876543210", "uid-1").await;

    let body = json!({ "externalId": "uid-2", "number": "+919876543210", "name": "Second" });
    let (status, _) = app.post("/user/create", body).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let body = json!({ "externalId": "uid-1", "number": "+910000000001", "name": "Third" });
    let (status, _) = app.post("/user/create", body).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn rejects_short_phone_number() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/user/create",
            json!({ "externalId": "uid-1", "number": "12345", "name": "Short" }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Validation error");
}

#[tokio::test]
async fn fetches_and_lists_users() {
    let app = TestApp::new();
    app.create_user("+919876543210", "uid-1").await;
    app.create_user("+919876543211", "uid-2").await;

    let (status, user) = app.get("/user/uid-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["number"], "+919876543210");

    let (status, users) = app.get("/user").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);

    let (status, body) = app.get("/user/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn update_replaces_addresses_and_keeps_other_fields() {
    let app = TestApp::new();
    let created = app.create_user("+919876543210", "uid-1").await;

    let (status, updated) = app
        .put(
            "/user/uid-1",
            json!({
                "name": "Asha R.",
                "addresses": [
                    { "line1": "1 Park St", "city": "Kolkata", "state": "WB", "pincode": "700016" },
                    { "line1": "9 Marine Dr", "landmark": "Near pier", "city": "Mumbai", "state": "MH", "pincode": "400002" }
                ]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["name"], "Asha R.");
    assert_eq!(updated["number"], created["number"]);
    let addresses = updated["addresses"].as_array().unwrap();
    assert_eq!(addresses.len(), 2);
    assert_ne!(addresses[0]["id"], addresses[1]["id"]);
    assert_eq!(addresses[1]["landmark"], "Near pier");

    let (status, _) = app.put("/user/uid-404", json!({ "name": "Ghost" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn changing_number_to_a_taken_one_conflicts() {
    let app = TestApp::new();
    app.create_user("+919876543210", "uid-1").await;
    app.create_user("+919876543211", "uid-2").await;

    let (status, _) = app
        .put("/user/uid-2", json!({ "number": "+919876543210" }))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
}
