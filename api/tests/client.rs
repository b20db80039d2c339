//! HTTP-level tests for `VenueClient` against a mock server.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use serde_json::json;
use std::time::Duration;
use ticketdesk_api::types::{
    AdminCredentials, SlotRef, TicketEmail, VoucherValidationRequest,
};
use ticketdesk_api::{ApiError, CheckoutPayload, Money, VenueClient};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> VenueClient {
    VenueClient::new(server.uri(), Duration::from_secs(5)).expect("client builds")
}

/// Test 1: every request carries the tunnel bypass and accept headers
#[tokio::test]
async fn test_requests_carry_required_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ticketbundels"))
        .and(header("ngrok-skip-browser-warning", "true"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let bundles = client_for(&server).await.fetch_bundles().await.unwrap();
    assert!(bundles.is_empty());
}

/// Test 2: settings arrive as an array and the first element is used
#[tokio::test]
async fn test_settings_array_uses_first_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"_id": "a", "locationName": "Mega Jump", "ticketPrice": 15, "socksPrice": 5, "cancellationFee": 3},
            {"_id": "b", "locationName": "Other", "ticketPrice": 99}
        ])))
        .mount(&server)
        .await;

    let settings = client_for(&server).await.fetch_settings().await.unwrap().unwrap();
    assert_eq!(settings.id.as_deref(), Some("a"));
    assert_eq!(settings.ticket_price, Money::from_euros(15));
    assert_eq!(settings.cancellation_fee, Money::from_euros(3));
}

/// Test 3: bundle lists wrapped in `data` are unwrapped
#[tokio::test]
async fn test_bundles_wrapped_in_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ticketbundels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"_id": "b1", "name": "Family", "price": 50, "discountPercent": 20, "tickets": 4}]
        })))
        .mount(&server)
        .await;

    let bundles = client_for(&server).await.fetch_bundles().await.unwrap();
    assert_eq!(bundles.len(), 1);
    assert_eq!(bundles[0].net_price(), Money::from_euros(40));
}

/// Test 4: voucher validation sends the upper-cased code and amount
#[tokio::test]
async fn test_voucher_validation_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/discount-vouchers/validate"))
        .and(body_json(json!({"code": "SUMMER10", "amount": 43.5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "voucher": {"code": "SUMMER10", "discountType": "percentage", "discountValue": 10},
                "discountAmount": 4.35,
                "originalAmount": 43.5,
                "finalAmount": 39.15
            }
        })))
        .mount(&server)
        .await;

    let request = VoucherValidationRequest {
        code: "SUMMER10".to_string(),
        amount: Money::from_cents(4350),
    };
    let validation = client_for(&server).await.validate_voucher(&request).await.unwrap();
    assert_eq!(validation.discount_amount, Money::from_cents(435));
    assert_eq!(validation.final_amount, Money::from_cents(3915));
}

/// Test 5: a rejected voucher keeps the server's message verbatim
#[tokio::test]
async fn test_voucher_rejection_message_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/discount-vouchers/validate"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"success": false, "message": "Voucher usage limit reached"})),
        )
        .mount(&server)
        .await;

    let request = VoucherValidationRequest {
        code: "USED".to_string(),
        amount: Money::from_euros(20),
    };
    let error = client_for(&server).await.validate_voucher(&request).await.unwrap_err();
    assert_eq!(error.server_message(), Some("Voucher usage limit reached"));
}

/// Test 6: a session response without a checkout URL is invalid
#[tokio::test]
async fn test_payment_session_requires_both_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/payment/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sessionId": "cs_1"})))
        .mount(&server)
        .await;

    let error = client_for(&server)
        .await
        .create_payment_session(&CheckoutPayload::default())
        .await
        .unwrap_err();
    assert_eq!(error.server_message(), Some("Invalid payment session response."));
}

/// Test 7: login status codes map to typed errors
#[tokio::test]
async fn test_admin_login_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "bad"})))
        .mount(&server)
        .await;

    let credentials = AdminCredentials {
        username: "desk".to_string(),
        password: "wrong".to_string(),
    };
    let error = client_for(&server).await.admin_login(&credentials).await.unwrap_err();
    assert!(matches!(error, ApiError::Unauthorized { .. }));
}

/// Test 8: verify-payment passes the session id as a query parameter
#[tokio::test]
async fn test_verify_payment_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/payment/verify-payment"))
        .and(query_param("sessionId", "cs_42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client_for(&server).await.verify_payment("cs_42").await.is_ok());
}

/// Test 9: the email call honours its own timeout
#[tokio::test]
async fn test_email_timeout_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tickets/send-email"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_json(json!({"success": true})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server)
        .await
        .with_email_timeout(Duration::from_millis(50));
    let email = TicketEmail {
        email: "guest@example.com".to_string(),
        ticket_id: "TKT-1".to_string(),
        pdf_base64: "JVBERi0=".to_string(),
    };
    let error = client.send_ticket_email(&email).await.unwrap_err();
    assert_eq!(error, ApiError::Timeout);
}

/// Test 10: mass refund report decodes refunded and failed lists
#[tokio::test]
async fn test_mass_refund_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/refund/mass-cancel-refund"))
        .and(body_json(json!({"date": "2025-07-12", "startTime": "10:00", "endTime": "11:00"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "refunded": [{"ticketId": "A"}],
            "failed": [],
            "totalTicketsProcessed": 1
        })))
        .mount(&server)
        .await;

    let slot = SlotRef {
        date: "2025-07-12".to_string(),
        start_time: "10:00".to_string(),
        end_time: "11:00".to_string(),
    };
    let report = client_for(&server).await.mass_refund(&slot).await.unwrap();
    assert_eq!(report.refunded.len(), 1);
    assert_eq!(report.total_tickets_processed, 1);
}
