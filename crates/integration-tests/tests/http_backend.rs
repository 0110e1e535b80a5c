//! Wire-level tests for `HttpBackend`.
//!
//! Each test mounts the endpoint it needs on a fresh `wiremock` server and
//! checks the request shape, the status handling, or both.

#![allow(clippy::unwrap_used)]

use doorstep_checkout::{ApiError, DeliveryBackend};
use doorstep_core::{
    AddressId, CartLine, CartState, Coordinate, DeliverySelection, OrderSubmission, Price,
    ProductId, SavedAddress, UserInfo,
};
use doorstep_integration_tests::{TEST_TOKEN, backend, saved_address_json, session_json};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn metropolis_body() -> doorstep_core::NewAddress {
    doorstep_checkout::testing::metropolis_input().to_new_address()
}

fn submission(coordinates: Option<Coordinate>) -> OrderSubmission {
    let address: SavedAddress = serde_json::from_value(saved_address_json("addr_1")).unwrap();
    OrderSubmission {
        cart: CartState::from_lines(vec![CartLine {
            id: ProductId::new("p1"),
            title: "Pineapple".to_string(),
            price: Price::from_cents(500),
            quantity: 2,
        }]),
        user_info: Some(UserInfo::new("user_1")),
        delivery_location: DeliverySelection::new(address, coordinates),
    }
}

// ---------------------------------------------------------------------------
// POST /address
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_address_sends_normalized_body_and_parses_created() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/address"))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .and(body_json(json!({
            "addressLine1": "123 Main St",
            "addressLine2": "Apt 4",
            "landmark": "",
            "city": "Metropolis",
            "state": "NY",
            "postalCode": "10001",
            "country": "US"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(saved_address_json("addr_1")))
        .expect(1)
        .mount(&server)
        .await;

    let saved = backend(&server)
        .create_address(&metropolis_body())
        .await
        .unwrap();

    assert_eq!(saved.id, AddressId::new("addr_1"));
    assert_eq!(saved.city, "Metropolis");
    assert!(saved.is_complete());
}

#[tokio::test]
async fn test_create_address_rejects_non_created_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/address"))
        .respond_with(ResponseTemplate::new(200).set_body_json(saved_address_json("addr_1")))
        .mount(&server)
        .await;

    let err = backend(&server)
        .create_address(&metropolis_body())
        .await
        .unwrap_err();

    assert!(
        matches!(err, ApiError::Api { status: 200, .. }),
        "expected status error, got: {err:?}"
    );
}

#[tokio::test]
async fn test_create_address_surfaces_server_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/address"))
        .respond_with(ResponseTemplate::new(422).set_body_string("postalCode invalid"))
        .mount(&server)
        .await;

    let err = backend(&server)
        .create_address(&metropolis_body())
        .await
        .unwrap_err();

    match err {
        ApiError::Api { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "postalCode invalid");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_create_address_reports_unparseable_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/address"))
        .respond_with(ResponseTemplate::new(201).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = backend(&server)
        .create_address(&metropolis_body())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Parse(_)), "got: {err:?}");
}

// ---------------------------------------------------------------------------
// POST /coordinates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_coordinates_posts_lat_lng() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/coordinates"))
        .and(body_json(json!({"lat": 12.34, "lng": 56.78})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"_id": "c1"})))
        .expect(1)
        .mount(&server)
        .await;

    backend(&server)
        .create_coordinates(Coordinate::new(12.34, 56.78))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_coordinates_fails_on_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/coordinates"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = backend(&server)
        .create_coordinates(Coordinate::new(1.0, 2.0))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Api { status: 503, .. }));
}

// ---------------------------------------------------------------------------
// POST /order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_order_spreads_cart_and_sends_null_coordinates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/order"))
        .and(body_partial_json(json!({
            "ordersCount": 2,
            "addedProducts": [{"id": "p1", "title": "Pineapple", "quantity": 2}],
            "userInfo": {"_id": "user_1"},
            "deliveryLocation": {
                "_id": "addr_1",
                "addressLine1": "123 Main St",
                "coordinates": null
            }
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"_id": "order_9", "message": "Order created"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let confirmation = backend(&server)
        .create_order(&submission(None))
        .await
        .unwrap();

    assert_eq!(confirmation.id.unwrap().as_str(), "order_9");
    assert_eq!(confirmation.message.as_deref(), Some("Order created"));
}

#[tokio::test]
async fn test_create_order_sends_confirmed_coordinates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/order"))
        .and(body_partial_json(json!({
            "deliveryLocation": {"coordinates": {"lat": 12.34, "lng": 56.78}}
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    backend(&server)
        .create_order(&submission(Some(Coordinate::new(12.34, 56.78))))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_order_tolerates_empty_or_unreadable_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/order"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let confirmation = backend(&server)
        .create_order(&submission(None))
        .await
        .unwrap();

    assert!(confirmation.id.is_none());
}

#[tokio::test]
async fn test_create_order_fails_on_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/order"))
        .respond_with(ResponseTemplate::new(400).set_body_string("cart empty"))
        .mount(&server)
        .await;

    let err = backend(&server)
        .create_order(&submission(None))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Api { status: 400, .. }));
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_fetch_session_reads_user_info() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json()))
        .mount(&server)
        .await;

    let session = backend(&server).fetch_session().await.unwrap();

    assert!(session.status);
    let user = session.user_info.unwrap();
    assert_eq!(user.id.as_str(), "user_1");
    assert_eq!(user.username.as_deref(), Some("lois"));
    assert_eq!(user.extra.get("role"), Some(&json!("customer")));
}

#[tokio::test]
async fn test_fetch_session_anonymous() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": false})))
        .mount(&server)
        .await;

    let session = backend(&server).fetch_session().await.unwrap();

    assert!(!session.status);
    assert!(session.user_info.is_none());
}
