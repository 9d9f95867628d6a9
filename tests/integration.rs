use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;
use village_eats::api::rest::router;
use village_eats::notify::OrderEvent;
use village_eats::state::AppState;

fn setup() -> (axum::Router, Arc<AppState>, mpsc::Receiver<OrderEvent>) {
    let (state, rx) = AppState::new(1024);
    let shared = Arc::new(state);
    (router(shared.clone()), shared, rx)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn json_request_as(
    method: &str,
    uri: &str,
    body: Value,
    headers: &[(&str, &str)],
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn seed_vendor(app: &axum::Router, min_order: f64, delivery_fee: f64) -> (String, String) {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/vendors",
            json!({
                "name": "Annapurna Kitchen",
                "email": "annapurna@example.com",
                "restaurant": {
                    "name": "Annapurna Kitchen",
                    "address": "Main Road, Rampur",
                    "location": { "lat": 26.45, "lng": 80.33 },
                    "minOrder": min_order,
                    "deliveryFee": delivery_fee
                }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = body_json(res).await;
    (
        body["vendor"]["id"].as_str().unwrap().to_string(),
        body["restaurant"]["id"].as_str().unwrap().to_string(),
    )
}

async fn seed_delivery_person(app: &axum::Router, commission_rate: f64) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/delivery",
            json!({
                "name": "Ravi",
                "phone": "9000000001",
                "location": { "lat": 26.46, "lng": 80.34 },
                "commissionRate": commission_rate
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = body_json(res).await;
    body["id"].as_str().unwrap().to_string()
}

fn order_payload(restaurant_id: &str, subtotal: f64, total: f64) -> Value {
    json!({
        "restaurantId": restaurant_id,
        "customerInfo": {
            "name": "Sita",
            "email": "sita@example.com",
            "phone": "9000000002",
            "address": "House 4, Rampur"
        },
        "items": [
            { "name": "Thali", "unitPrice": subtotal, "quantity": 1, "lineTotal": subtotal }
        ],
        "subtotal": subtotal,
        "totalAmount": total,
        "paymentMethod": "cod"
    })
}

/// Places an order and returns (order_id, otp code).
async fn place_order(
    app: &axum::Router,
    restaurant_id: &str,
    subtotal: f64,
    total: f64,
) -> (String, String) {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            order_payload(restaurant_id, subtotal, total),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = body_json(res).await;
    (
        body["orderId"].as_str().unwrap().to_string(),
        body["otp"].as_str().unwrap().to_string(),
    )
}

async fn set_status(app: &axum::Router, order_id: &str, status: &str) -> axum::response::Response {
    app.clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/orders/{order_id}/status"),
            json!({ "status": status }),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state, _rx) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["vendors"], 0);
    assert_eq!(body["orders"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _state, _rx) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("orders_placed_total"));
}

#[tokio::test]
async fn create_order_returns_id_total_and_otp() {
    let (app, _state, _rx) = setup();
    let (_, restaurant_id) = seed_vendor(&app, 50.0, 20.0).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            order_payload(&restaurant_id, 100.0, 120.0),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = body_json(res).await;
    assert!(body["orderId"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(body["totalAmount"], 120.0);
    assert!(body["estimatedDeliveryTime"].is_null());

    let otp = body["otp"].as_str().unwrap();
    assert_eq!(otp.len(), 4);
    assert!(otp.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn create_order_unknown_restaurant_returns_404() {
    let (app, _state, _rx) = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";

    let res = app
        .oneshot(json_request(
            "POST",
            "/orders",
            order_payload(fake_id, 100.0, 120.0),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn min_order_gate_reports_shortfall() {
    let (app, _state, _rx) = setup();
    let (_, restaurant_id) = seed_vendor(&app, 100.0, 20.0).await;

    let res = app
        .oneshot(json_request(
            "POST",
            "/orders",
            order_payload(&restaurant_id, 80.0, 100.0),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = body_json(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errorType"], "MIN_ORDER_NOT_MET");
    assert_eq!(body["shortfall"], 20.0);
}

#[tokio::test]
async fn offline_vendor_rejects_orders() {
    let (app, _state, _rx) = setup();
    let (vendor_id, restaurant_id) = seed_vendor(&app, 0.0, 20.0).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/vendors/{vendor_id}/go-offline"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(json_request(
            "POST",
            "/orders",
            order_payload(&restaurant_id, 100.0, 120.0),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn offline_vendor_gate_holds_even_if_restaurant_flag_is_stale() {
    let (app, state, _rx) = setup();
    let (vendor_id, restaurant_id) = seed_vendor(&app, 0.0, 20.0).await;

    // force drift that the toggle operation normally prevents
    let vendor_uuid: Uuid = vendor_id.parse().unwrap();
    state.vendors.get_mut(&vendor_uuid).unwrap().is_live = false;
    let restaurant_uuid: Uuid = restaurant_id.parse().unwrap();
    assert!(state.restaurants.get(&restaurant_uuid).unwrap().is_open);

    let res = app
        .oneshot(json_request(
            "POST",
            "/orders",
            order_payload(&restaurant_id, 100.0, 120.0),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mismatched_total_amount_is_rejected() {
    let (app, _state, _rx) = setup();
    let (_, restaurant_id) = seed_vendor(&app, 0.0, 20.0).await;

    let res = app
        .oneshot(json_request(
            "POST",
            "/orders",
            order_payload(&restaurant_id, 100.0, 150.0),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_update_returns_new_status() {
    let (app, _state, _rx) = setup();
    let (_, restaurant_id) = seed_vendor(&app, 0.0, 20.0).await;
    let (order_id, _) = place_order(&app, &restaurant_id, 100.0, 120.0).await;

    let res = set_status(&app, &order_id, "Accepted").await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["orderId"], order_id.as_str());
    assert_eq!(body["status"], "Accepted");
}

#[tokio::test]
async fn out_for_delivery_assigns_available_rider_and_sets_eta() {
    let (app, _state, _rx) = setup();
    let (_, restaurant_id) = seed_vendor(&app, 0.0, 20.0).await;
    let rider_id = seed_delivery_person(&app, 15.0).await;
    let (order_id, _) = place_order(&app, &restaurant_id, 100.0, 120.0).await;

    let res = set_status(&app, &order_id, "Out for Delivery").await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert!(!body["estimatedDeliveryTime"].is_null());

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let order = body_json(res).await;
    assert_eq!(order["status"], "Out for Delivery");
    assert_eq!(order["deliveryPersonId"], rider_id.as_str());

    let res = app.oneshot(get_request("/delivery")).await.unwrap();
    let riders = body_json(res).await;
    assert_eq!(riders[0]["isAvailable"], false);
}

#[tokio::test]
async fn out_for_delivery_without_riders_stays_unassigned() {
    let (app, _state, _rx) = setup();
    let (_, restaurant_id) = seed_vendor(&app, 0.0, 20.0).await;
    let (order_id, _) = place_order(&app, &restaurant_id, 100.0, 120.0).await;

    let res = set_status(&app, &order_id, "Out for Delivery").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let order = body_json(res).await;
    assert_eq!(order["status"], "Out for Delivery");
    assert!(order["deliveryPersonId"].is_null());
}

#[tokio::test]
async fn otp_verification_delivers_and_credits_rider() {
    let (app, _state, _rx) = setup();
    let (_, restaurant_id) = seed_vendor(&app, 0.0, 20.0).await;
    let _rider_id = seed_delivery_person(&app, 15.0).await;
    let (order_id, otp) = place_order(&app, &restaurant_id, 480.0, 500.0).await;

    set_status(&app, &order_id, "Out for Delivery").await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/verify-otp"),
            json!({ "otp": "0000" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/verify-otp"),
            json!({ "otp": otp }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["status"], "Delivered");
    assert!(!body["actualDeliveryTime"].is_null());

    let res = app.oneshot(get_request("/delivery")).await.unwrap();
    let riders = body_json(res).await;
    assert_eq!(riders[0]["earnings"]["total"], 75.0);
    assert_eq!(riders[0]["stats"]["completedDeliveries"], 1);
    assert_eq!(riders[0]["isAvailable"], true);
}

#[tokio::test]
async fn resend_otp_is_throttled_while_code_is_valid() {
    let (app, _state, _rx) = setup();
    let (_, restaurant_id) = seed_vendor(&app, 0.0, 20.0).await;
    let (order_id, _) = place_order(&app, &restaurant_id, 100.0, 120.0).await;

    // placement already issued a fresh code
    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/delivery/{order_id}/resend-otp"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = body_json(res).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn generated_otp_replaces_previous_code() {
    let (app, _state, _rx) = setup();
    let (_, restaurant_id) = seed_vendor(&app, 0.0, 20.0).await;
    let (order_id, _) = place_order(&app, &restaurant_id, 100.0, 120.0).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/delivery/{order_id}/generate-otp"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    let fresh = body["otp"].as_str().unwrap().to_string();

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/delivery/{order_id}/verify-otp"),
            json!({ "otp": fresh }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["status"], "Delivered");
}

#[tokio::test]
async fn cancel_requires_matching_customer_email() {
    let (app, _state, _rx) = setup();
    let (_, restaurant_id) = seed_vendor(&app, 0.0, 20.0).await;
    let (order_id, _) = place_order(&app, &restaurant_id, 100.0, 120.0).await;

    let res = app
        .clone()
        .oneshot(json_request_as(
            "PATCH",
            &format!("/orders/{order_id}/cancel"),
            json!({}),
            &[
                ("x-actor-role", "customer"),
                ("x-actor-email", "mallory@example.com"),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .clone()
        .oneshot(json_request_as(
            "PATCH",
            &format!("/orders/{order_id}/cancel"),
            json!({ "reason": "changed my mind" }),
            &[
                ("x-actor-role", "customer"),
                ("x-actor-email", "sita@example.com"),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["status"], "Cancelled");
    assert_eq!(body["cancellationReason"], "changed my mind");

    // already terminal
    let res = app
        .oneshot(json_request_as(
            "PATCH",
            &format!("/orders/{order_id}/cancel"),
            json!({}),
            &[
                ("x-actor-role", "customer"),
                ("x-actor-email", "sita@example.com"),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn owning_vendor_can_cancel_via_status_endpoint() {
    let (app, _state, _rx) = setup();
    let (vendor_id, restaurant_id) = seed_vendor(&app, 0.0, 20.0).await;
    let (order_id, _) = place_order(&app, &restaurant_id, 100.0, 120.0).await;

    // no actor claims: the cancellation gate applies on this endpoint too
    let res = set_status(&app, &order_id, "Cancelled").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .oneshot(json_request_as(
            "PATCH",
            &format!("/orders/{order_id}/status"),
            json!({ "status": "Cancelled" }),
            &[("x-actor-role", "vendor"), ("x-actor-id", &vendor_id)],
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["status"], "Cancelled");
}

#[tokio::test]
async fn terminal_orders_reject_further_updates() {
    let (app, _state, _rx) = setup();
    let (_, restaurant_id) = seed_vendor(&app, 0.0, 20.0).await;
    let (order_id, otp) = place_order(&app, &restaurant_id, 100.0, 120.0).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/verify-otp"),
            json!({ "otp": otp }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = set_status(&app, &order_id, "Preparing").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = body_json(res).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn rating_only_after_delivery_and_only_once() {
    let (app, _state, _rx) = setup();
    let (_, restaurant_id) = seed_vendor(&app, 0.0, 20.0).await;
    let (order_id, otp) = place_order(&app, &restaurant_id, 100.0, 120.0).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/rate"),
            json!({ "rating": 5 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/verify-otp"),
            json!({ "otp": otp }),
        ))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/rate"),
            json!({ "rating": 4, "review": "quick delivery" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["rating"], 4);

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/rate"),
            json!({ "rating": 5 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn earnings_report_sums_commission_and_delivery_charges() {
    let (app, _state, _rx) = setup();
    let (_, restaurant_id) = seed_vendor(&app, 0.0, 0.0).await;
    place_order(&app, &restaurant_id, 1000.0, 1000.0).await;
    place_order(&app, &restaurant_id, 2000.0, 2000.0).await;

    let res = app
        .clone()
        .oneshot(get_request("/admin/earnings?period=all"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["summary"]["totalOrders"], 2);
    assert_eq!(body["summary"]["totalEarnings"], 316.0);
    assert_eq!(body["summary"]["totalCommission"], 300.0);
    assert_eq!(body["summary"]["totalDeliveryCharges"], 16.0);
    assert_eq!(body["summary"]["averageOrderValue"], 1500.0);
    assert_eq!(body["restaurants"][0]["orderCount"], 2);
    assert_eq!(body["restaurants"][0]["totalEarnings"], 316.0);

    // today window includes freshly placed orders
    let res = app
        .oneshot(get_request("/admin/earnings?period=today"))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["summary"]["totalOrders"], 2);
}

#[tokio::test]
async fn cancelled_orders_drop_out_of_earnings() {
    let (app, _state, _rx) = setup();
    let (_, restaurant_id) = seed_vendor(&app, 0.0, 0.0).await;
    let (order_id, _) = place_order(&app, &restaurant_id, 1000.0, 1000.0).await;
    place_order(&app, &restaurant_id, 2000.0, 2000.0).await;

    let res = app
        .clone()
        .oneshot(json_request_as(
            "PATCH",
            &format!("/orders/{order_id}/cancel"),
            json!({}),
            &[
                ("x-actor-role", "customer"),
                ("x-actor-email", "sita@example.com"),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(get_request("/admin/earnings"))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["summary"]["totalOrders"], 1);
    assert_eq!(body["summary"]["totalEarnings"], 208.0);
}

#[tokio::test]
async fn vendor_toggle_keeps_restaurant_flag_mirrored() {
    let (app, _state, _rx) = setup();
    let (vendor_id, _) = seed_vendor(&app, 0.0, 20.0).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/vendors/{vendor_id}/toggle-live"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["isLive"], false);
    assert_eq!(body["isOpen"], false);

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/vendors/{vendor_id}/go-live"),
            json!({}),
        ))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["isLive"], true);
    assert_eq!(body["isOpen"], true);
}
