use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use shareit_api::{app, AppState};
use shareit_core::memory::MemoryStore;
use shareit_core::FixedClock;
use tower::ServiceExt;

// All scenarios run at 2025-06-01 12:00 UTC.
fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = MemoryStore::new();
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let state = AppState::new(store.repositories(), Arc::new(FixedClock(now)));
    (app(state), store)
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-Sharer-User-Id", user.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn create_user(app: &Router, name: &str) -> i64 {
    let (status, body) = call(
        app,
        "POST",
        "/users",
        None,
        Some(json!({ "name": name, "email": format!("{}@example.com", name.to_lowercase()) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["id"].as_i64().unwrap()
}

async fn create_item(app: &Router, owner: i64, name: &str, available: bool) -> i64 {
    let (status, body) = call(
        app,
        "POST",
        "/items",
        Some(owner),
        Some(json!({ "name": name, "description": format!("{} for rent", name), "available": available })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["id"].as_i64().unwrap()
}

async fn book(app: &Router, booker: i64, item: i64, start: &str, end: &str) -> (StatusCode, Value) {
    call(app, "POST", "/bookings", Some(booker), Some(json!({ "itemId": item, "start": start, "end": end }))).await
}

#[tokio::test]
async fn test_booking_approval_flow() {
    let (app, _) = test_app();
    let owner = create_user(&app, "Alice").await;
    let booker = create_user(&app, "Bob").await;
    let stranger = create_user(&app, "Carol").await;
    let item = create_item(&app, owner, "Ladder", true).await;

    let (status, booking) = book(&app, booker, item, "2025-06-01T13:00:00", "2025-06-01T14:00:00").await;
    assert_eq!(status, StatusCode::OK, "{}", booking);
    assert_eq!(booking["status"], "WAITING");
    assert_eq!(booking["item"]["id"], item);
    assert_eq!(booking["booker"]["id"], booker);
    let id = booking["id"].as_i64().unwrap();

    // The booker cannot decide on their own booking.
    let (status, _) = call(&app, "PATCH", &format!("/bookings/{}?approved=true", id), Some(booker), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, "PATCH", &format!("/bookings/{}?approved=true", id), Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "APPROVED");

    let (status, body) = call(&app, "GET", &format!("/bookings/{}", id), Some(booker), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "APPROVED");

    let (status, body) = call(&app, "GET", &format!("/bookings/{}", id), Some(stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    // Decisions are final.
    let (status, _) = call(&app, "PATCH", &format!("/bookings/{}?approved=false", id), Some(owner), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, body) = call(&app, "GET", &format!("/bookings/{}", id), Some(owner), None).await;
    assert_eq!(body["status"], "APPROVED");
}

#[tokio::test]
async fn test_unavailable_item_cannot_be_booked() {
    let (app, store) = test_app();
    let owner = create_user(&app, "Alice").await;
    let booker = create_user(&app, "Bob").await;
    let item = create_item(&app, owner, "Tent", false).await;

    let (status, body) = book(&app, booker, item, "2025-06-02T10:00:00Z", "2025-06-03T10:00:00Z").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "NOT_AVAILABLE");
    assert_eq!(store.booking_count(), 0);
}

#[tokio::test]
async fn test_reversed_range_is_forbidden() {
    let (app, store) = test_app();
    let owner = create_user(&app, "Alice").await;
    let booker = create_user(&app, "Bob").await;
    let item = create_item(&app, owner, "Tent", true).await;

    let (status, _) = book(&app, booker, item, "2025-06-03T10:00:00", "2025-06-02T10:00:00").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(store.booking_count(), 0);
}

#[tokio::test]
async fn test_search_returns_only_available_items() {
    let (app, _) = test_app();
    let owner = create_user(&app, "Alice").await;
    let available = create_item(&app, owner, "Drill", true).await;
    create_item(&app, owner, "Drill", false).await;
    create_item(&app, owner, "Hammer", true).await;

    let (status, body) = call(&app, "GET", "/items/search?text=dRiLl", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body.as_array().unwrap().iter().map(|i| i["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![available]);

    let (_, body) = call(&app, "GET", "/items/search?text=", None, None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_owner_sees_booking_neighbours() {
    let (app, _) = test_app();
    let owner = create_user(&app, "Alice").await;
    let booker = create_user(&app, "Bob").await;
    let item = create_item(&app, owner, "Kayak", true).await;

    let (_, past) = book(&app, booker, item, "2025-06-01T07:00:00", "2025-06-01T11:00:00").await;
    let (_, next) = book(&app, booker, item, "2025-06-01T14:00:00", "2025-06-01T16:00:00").await;
    for booking in [&past, &next] {
        let uri = format!("/bookings/{}?approved=true", booking["id"]);
        let (status, _) = call(&app, "PATCH", &uri, Some(owner), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(&app, "GET", &format!("/items/{}", item), Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lastBooking"]["id"], past["id"]);
    assert_eq!(body["lastBooking"]["bookerId"], booker);
    assert_eq!(body["nextBooking"]["id"], next["id"]);
    assert!(body.get("ownerId").is_none());

    let (_, body) = call(&app, "GET", &format!("/items/{}", item), Some(booker), None).await;
    assert!(body["lastBooking"].is_null());
    assert!(body["nextBooking"].is_null());

    let (_, body) = call(&app, "GET", "/items", Some(owner), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["nextBooking"]["id"], next["id"]);
}

#[tokio::test]
async fn test_comment_requires_completed_rental() {
    let (app, _) = test_app();
    let owner = create_user(&app, "Alice").await;
    let booker = create_user(&app, "Bob").await;
    let item = create_item(&app, owner, "Saw", true).await;
    let uri = format!("/items/{}/comment", item);

    let (_, future) = book(&app, booker, item, "2025-06-02T10:00:00", "2025-06-02T12:00:00").await;
    call(&app, "PATCH", &format!("/bookings/{}?approved=true", future["id"]), Some(owner), None).await;
    let (status, _) = call(&app, "POST", &uri, Some(booker), Some(json!({ "text": "Great saw" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, past) = book(&app, booker, item, "2025-05-20T10:00:00", "2025-05-21T10:00:00").await;
    call(&app, "PATCH", &format!("/bookings/{}?approved=true", past["id"]), Some(owner), None).await;
    let (status, comment) = call(&app, "POST", &uri, Some(booker), Some(json!({ "text": "Great saw" }))).await;
    assert_eq!(status, StatusCode::OK, "{}", comment);
    assert_eq!(comment["authorName"], "Bob");
    assert_eq!(comment["text"], "Great saw");

    let (_, body) = call(&app, "GET", &format!("/items/{}", item), Some(owner), None).await;
    assert_eq!(body["comments"][0]["id"], comment["id"]);
}

#[tokio::test]
async fn test_booking_lists_filter_by_state() {
    let (app, _) = test_app();
    let owner = create_user(&app, "Alice").await;
    let booker = create_user(&app, "Bob").await;
    let item = create_item(&app, owner, "Bike", true).await;

    let (_, past) = book(&app, booker, item, "2025-05-01T10:00:00", "2025-05-02T10:00:00").await;
    let (_, current) = book(&app, booker, item, "2025-06-01T10:00:00", "2025-06-01T18:00:00").await;
    let (_, future) = book(&app, booker, item, "2025-07-01T10:00:00", "2025-07-02T10:00:00").await;

    let (_, all) = call(&app, "GET", "/bookings", Some(booker), None).await;
    let ids: Vec<&Value> = all.as_array().unwrap().iter().map(|b| &b["id"]).collect();
    assert_eq!(ids, vec![&future["id"], &current["id"], &past["id"]]);

    let (_, body) = call(&app, "GET", "/bookings?state=current", Some(booker), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], current["id"]);

    let (_, body) = call(&app, "GET", "/bookings/owner?state=PAST", Some(owner), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], past["id"]);

    let (_, body) = call(&app, "GET", "/bookings/owner?state=nonsense", Some(owner), None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (_, body) = call(&app, "GET", "/bookings/owner?state=WAITING", Some(booker), None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_requests_and_answers() {
    let (app, _) = test_app();
    let alice = create_user(&app, "Alice").await;
    let bob = create_user(&app, "Bob").await;

    let (status, request) =
        call(&app, "POST", "/requests", Some(alice), Some(json!({ "description": "Need a ladder" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(request["items"], json!([]));
    let request_id = request["id"].as_i64().unwrap();

    let (status, item) = call(
        &app,
        "POST",
        "/items",
        Some(bob),
        Some(json!({ "name": "Ladder", "description": "3m", "available": true, "requestId": request_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["requestId"], request_id);

    let (_, own) = call(&app, "GET", "/requests", Some(alice), None).await;
    assert_eq!(own[0]["items"][0]["name"], "Ladder");
    assert_eq!(own[0]["items"][0]["ownerId"], bob);

    let (_, others) = call(&app, "GET", "/requests/all", Some(bob), None).await;
    assert_eq!(others.as_array().unwrap().len(), 1);
    let (_, others) = call(&app, "GET", "/requests/all", Some(alice), None).await;
    assert_eq!(others, json!([]));

    let (status, _) = call(&app, "GET", "/requests/999", Some(alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_lifecycle() {
    let (app, _) = test_app();
    let id = create_user(&app, "Alice").await;

    let (status, body) =
        call(&app, "POST", "/users", None, Some(json!({ "name": "Other", "email": "alice@example.com" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ALREADY_EXISTS");

    let (status, body) =
        call(&app, "PATCH", &format!("/users/{}", id), None, Some(json!({ "name": "Alicia" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Alicia");
    assert_eq!(body["email"], "alice@example.com");

    let (status, body) = call(&app, "DELETE", &format!("/users/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Alicia");

    let (status, body) = call(&app, "GET", &format!("/users/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_identity_header_is_required() {
    let (app, _) = test_app();

    let (status, body) = call(&app, "GET", "/items", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");

    let (status, _) = call(&app, "GET", "/bookings", Some(404), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_bodies_use_error_contract() {
    let (app, store) = test_app();
    let owner = create_user(&app, "Alice").await;
    let booker = create_user(&app, "Bob").await;
    let item = create_item(&app, owner, "Drill", true).await;

    let (status, body) =
        call(&app, "POST", "/items", Some(owner), Some(json!({ "name": "Drill", "description": "d" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert!(body["message"].as_str().unwrap().contains("available"));

    let (status, body) = call(&app, "POST", "/users", None, Some(json!({ "name": "B" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, body) = book(&app, booker, item, "soon", "2025-06-02T10:00:00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(store.booking_count(), 0);
}

#[tokio::test]
async fn test_malformed_query_and_path_use_error_contract() {
    let (app, _) = test_app();
    let owner = create_user(&app, "Alice").await;

    let (status, body) = call(&app, "PATCH", "/bookings/1?approved=maybe", Some(owner), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");

    let (status, body) = call(&app, "GET", "/items/abc", Some(owner), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
}
