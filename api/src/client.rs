//! Venue API client implementation

use crate::{
    error::ApiError,
    types::{
        Acknowledgement, AdminCredentials, BulkSlotRequest, Bundle, CancelRequest,
        CancelRequestInput, CheckoutPayload, DeletedCount, LoginResponse, MassRefundReport,
        PaymentSession, SessionResult, Settings, SlotRef, TicketAnalytics, TicketEmail,
        TicketRecord, TimeSlot, TimeSlotInput, UnusedTicketsReport, VoucherDefinition,
        VoucherValidation, VoucherValidationRequest, WalkInBooking,
    },
};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Production API host
pub const DEFAULT_BASE_URL: &str = "https://api.megajumpparktickets.eu";

/// Header that skips the tunnelling proxy's interstitial page
pub const TUNNEL_BYPASS_HEADER: &str = "ngrok-skip-browser-warning";

/// Validated hosted-checkout redirect
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutRedirect {
    /// Hosted checkout session id
    pub session_id: String,
    /// Page to navigate to
    pub checkout_url: String,
}

/// Venue API client
#[derive(Clone, Debug)]
pub struct VenueClient {
    client: Client,
    base_url: String,
    email_timeout: Duration,
}

impl VenueClient {
    /// Create a client from `TICKETDESK_API_BASE_URL` (or the production host)
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` if the HTTP client cannot be built
    pub fn from_env() -> Result<Self, ApiError> {
        let base_url = std::env::var("TICKETDESK_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url, Duration::from_secs(30))
    }

    /// Create a client for `base_url` with a default per-request timeout
    ///
    /// Every request carries `Accept: application/json` and the tunnel bypass header.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` if the HTTP client cannot be built
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(TUNNEL_BYPASS_HEADER, HeaderValue::from_static("true"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            email_timeout: Duration::from_secs(300),
        })
    }

    /// Timeout for the ticket email call, which renders and mails server-side
    #[must_use]
    pub const fn with_email_timeout(mut self, timeout: Duration) -> Self {
        self.email_timeout = timeout;
        self
    }

    /// Base URL without trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{path}", self.base_url))
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(self.request(Method::GET, path)).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(self.request(method, path).json(body)).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(self.request(Method::DELETE, path)).await
    }

    async fn list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let value: Value = self.get(path).await?;
        list_records(value)
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// `GET /api/settings` (object, or array whose first element is used)
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    #[tracing::instrument(skip(self))]
    pub async fn fetch_settings(&self) -> Result<Option<Settings>, ApiError> {
        let value: Value = self.get("/api/settings").await?;
        first_record(value)
            .map(|record| serde_json::from_value(record).map_err(parse_error))
            .transpose()
    }

    /// `POST /api/settings`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn create_settings(&self, settings: &Settings) -> Result<Value, ApiError> {
        self.send_json(Method::POST, "/api/settings", settings).await
    }

    /// `PUT /api/settings/:id`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn update_settings(&self, id: &str, settings: &Settings) -> Result<Value, ApiError> {
        self.send_json(Method::PUT, &format!("/api/settings/{}", segment(id)), settings)
            .await
    }

    // ========================================================================
    // Bundles
    // ========================================================================

    /// `GET /api/ticketbundels`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    #[tracing::instrument(skip(self))]
    pub async fn fetch_bundles(&self) -> Result<Vec<Bundle>, ApiError> {
        self.list("/api/ticketbundels").await
    }

    /// `POST /api/ticketbundels`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn create_bundle(&self, bundle: &Bundle) -> Result<Value, ApiError> {
        self.send_json(Method::POST, "/api/ticketbundels", bundle).await
    }

    /// `PUT /api/ticketbundels/:id`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn update_bundle(&self, id: &str, bundle: &Bundle) -> Result<Value, ApiError> {
        self.send_json(Method::PUT, &format!("/api/ticketbundels/{}", segment(id)), bundle)
            .await
    }

    /// `DELETE /api/ticketbundels/:id`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn delete_bundle(&self, id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/api/ticketbundels/{}", segment(id))).await
    }

    // ========================================================================
    // Time slots
    // ========================================================================

    /// `GET /api/timeslots/:date`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    #[tracing::instrument(skip(self))]
    pub async fn fetch_slots(&self, date: &str) -> Result<Vec<TimeSlot>, ApiError> {
        self.list(&format!("/api/timeslots/{}", segment(date))).await
    }

    /// `GET /api/timeslots`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    pub async fn fetch_all_slots(&self) -> Result<Vec<TimeSlot>, ApiError> {
        self.list("/api/timeslots").await
    }

    /// `POST /api/timeslots`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn create_slot(&self, slot: &TimeSlotInput) -> Result<Value, ApiError> {
        self.send_json(Method::POST, "/api/timeslots", slot).await
    }

    /// `PUT /api/timeslots/:id`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn update_slot(&self, id: &str, slot: &TimeSlotInput) -> Result<Value, ApiError> {
        self.send_json(Method::PUT, &format!("/api/timeslots/{}", segment(id)), slot)
            .await
    }

    /// `DELETE /api/timeslots/:id`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn delete_slot(&self, id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/api/timeslots/{}", segment(id))).await
    }

    /// `POST /api/timeslots/bulk-create`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn bulk_create_slots(&self, request: &BulkSlotRequest) -> Result<Value, ApiError> {
        self.send_json(Method::POST, "/api/timeslots/bulk-create", request)
            .await
    }

    /// `DELETE /api/timeslots/date/:date`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn delete_slots_on(&self, date: &str) -> Result<DeletedCount, ApiError> {
        self.delete(&format!("/api/timeslots/date/{}", segment(date))).await
    }

    /// `DELETE /api/timeslots/all`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn delete_all_slots(&self) -> Result<DeletedCount, ApiError> {
        self.delete("/api/timeslots/all").await
    }

    // ========================================================================
    // Vouchers
    // ========================================================================

    /// `POST /api/discount-vouchers/validate`
    ///
    /// A 2xx answer with `success: false` becomes `ApiError::Unsuccessful`
    /// carrying the server message.
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, rejected codes, or parsing failures
    #[tracing::instrument(skip(self), fields(code = %request.code))]
    pub async fn validate_voucher(
        &self,
        request: &VoucherValidationRequest,
    ) -> Result<VoucherValidation, ApiError> {
        #[derive(serde::Deserialize, Default)]
        #[serde(default)]
        struct Envelope {
            success: bool,
            data: Option<VoucherValidation>,
            message: Option<String>,
        }

        let envelope: Envelope = self
            .send_json(Method::POST, "/api/discount-vouchers/validate", request)
            .await?;

        match envelope {
            Envelope { success: true, data: Some(data), .. } => Ok(data),
            Envelope { message, .. } => Err(ApiError::Unsuccessful {
                message: message.unwrap_or_else(|| "Failed to validate voucher".to_string()),
            }),
        }
    }

    /// `GET /api/discount-vouchers[?active=true|false]`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    pub async fn fetch_vouchers(&self, active: Option<bool>) -> Result<Vec<VoucherDefinition>, ApiError> {
        let path = match active {
            Some(active) => format!("/api/discount-vouchers?active={active}"),
            None => "/api/discount-vouchers".to_string(),
        };
        self.list(&path).await
    }

    /// `POST /api/discount-vouchers`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn create_voucher(&self, voucher: &VoucherDefinition) -> Result<Value, ApiError> {
        self.send_json(Method::POST, "/api/discount-vouchers", voucher).await
    }

    /// `PUT /api/discount-vouchers/:id`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn update_voucher(&self, id: &str, voucher: &VoucherDefinition) -> Result<Value, ApiError> {
        self.send_json(Method::PUT, &format!("/api/discount-vouchers/{}", segment(id)), voucher)
            .await
    }

    /// `DELETE /api/discount-vouchers/:id`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn delete_voucher(&self, id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/api/discount-vouchers/{}", segment(id))).await
    }

    // ========================================================================
    // Payment and booking
    // ========================================================================

    /// `POST /api/payment/session`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unsuccessful` with "Invalid payment session response."
    /// when either the session id or the checkout URL is missing.
    #[tracing::instrument(skip(self, payload))]
    pub async fn create_payment_session(
        &self,
        payload: &CheckoutPayload,
    ) -> Result<CheckoutRedirect, ApiError> {
        let session: PaymentSession = self
            .send_json(Method::POST, "/api/payment/session", payload)
            .await?;
        match (session.session_id, session.checkout_url) {
            (Some(session_id), Some(checkout_url))
                if !session_id.is_empty() && !checkout_url.is_empty() =>
            {
                Ok(CheckoutRedirect { session_id, checkout_url })
            },
            _ => Err(ApiError::Unsuccessful {
                message: "Invalid payment session response.".to_string(),
            }),
        }
    }

    /// `GET /api/payment/session-result/:id`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    #[tracing::instrument(skip(self))]
    pub async fn session_result(&self, session_id: &str) -> Result<SessionResult, ApiError> {
        self.get(&format!("/api/payment/session-result/{}", segment(session_id)))
            .await
    }

    /// `GET /api/payment/verify-payment?sessionId=`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    #[tracing::instrument(skip(self))]
    pub async fn verify_payment(&self, session_id: &str) -> Result<Value, ApiError> {
        self.get(&format!(
            "/api/payment/verify-payment?sessionId={}",
            segment(session_id)
        ))
        .await
    }

    /// `POST /api/walkin/book`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    #[tracing::instrument(skip(self, payload), fields(method = ?payload.payment_method))]
    pub async fn book_walk_in(&self, payload: &CheckoutPayload) -> Result<WalkInBooking, ApiError> {
        self.send_json(Method::POST, "/api/walkin/book", payload).await
    }

    // ========================================================================
    // Tickets
    // ========================================================================

    /// `POST /api/tickets/send-email` (uses the long email timeout)
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, timeouts, or API errors
    #[tracing::instrument(skip(self, email), fields(ticket_id = %email.ticket_id))]
    pub async fn send_ticket_email(&self, email: &TicketEmail) -> Result<Acknowledgement, ApiError> {
        let request = self
            .request(Method::POST, "/api/tickets/send-email")
            .timeout(self.email_timeout)
            .json(email);
        self.execute(request).await
    }

    /// `GET /api/tickets`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    pub async fn fetch_tickets(&self) -> Result<Vec<TicketRecord>, ApiError> {
        self.list("/api/tickets").await
    }

    /// `GET /api/tickets/analytics` (payload under `data`)
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    pub async fn ticket_analytics(&self) -> Result<TicketAnalytics, ApiError> {
        let value: Value = self.get("/api/tickets/analytics").await?;
        serde_json::from_value(unwrap_data(value)).map_err(parse_error)
    }

    /// `DELETE /api/tickets/:id`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn delete_ticket(&self, id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/api/tickets/{}", segment(id))).await
    }

    /// `DELETE /api/tickets/delete-all-with-auth`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors (401 on bad credentials)
    pub async fn delete_all_tickets(&self, email: &str, password: &str) -> Result<DeletedCount, ApiError> {
        #[derive(Serialize)]
        struct Body<'a> {
            email: &'a str,
            password: &'a str,
        }

        self.send_json(
            Method::DELETE,
            "/api/tickets/delete-all-with-auth",
            &Body { email, password },
        )
        .await
    }

    /// `GET /api/tickets/unused-today`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    pub async fn unused_tickets_today(&self) -> Result<UnusedTicketsReport, ApiError> {
        let value: Value = self.get("/api/tickets/unused-today").await?;
        serde_json::from_value(unwrap_data(value)).map_err(parse_error)
    }

    /// `POST /api/tickets/bulk-delete-unused-today`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` on wrong credentials
    pub async fn bulk_delete_unused_today(
        &self,
        credentials: &AdminCredentials,
    ) -> Result<DeletedCount, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body<'a> {
            admin_credentials: &'a AdminCredentials,
        }

        self.send_json(
            Method::POST,
            "/api/tickets/bulk-delete-unused-today",
            &Body { admin_credentials: credentials },
        )
        .await
    }

    // ========================================================================
    // Cancellation and refunds
    // ========================================================================

    /// `POST /api/cancel-request`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn request_cancellation(&self, input: &CancelRequestInput) -> Result<Acknowledgement, ApiError> {
        self.send_json(Method::POST, "/api/cancel-request", input).await
    }

    /// `GET /api/cancel-request`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    pub async fn fetch_cancel_requests(&self) -> Result<Vec<CancelRequest>, ApiError> {
        self.list("/api/cancel-request").await
    }

    /// `POST /api/refund/cancel-refund/:ticketId`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn refund_ticket(&self, ticket_id: &str) -> Result<Acknowledgement, ApiError> {
        self.send_json(
            Method::POST,
            &format!("/api/refund/cancel-refund/{}", segment(ticket_id)),
            &serde_json::json!({}),
        )
        .await
    }

    /// `POST /api/refund/mass-cancel-refund`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API errors
    pub async fn mass_refund(&self, slot: &SlotRef) -> Result<MassRefundReport, ApiError> {
        self.send_json(Method::POST, "/api/refund/mass-cancel-refund", slot)
            .await
    }

    // ========================================================================
    // Admin
    // ========================================================================

    /// `POST /api/admin/login`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` (401) or `ApiError::Forbidden` (403)
    /// with the server message, or network errors
    #[tracing::instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn admin_login(&self, credentials: &AdminCredentials) -> Result<LoginResponse, ApiError> {
        self.send_json(Method::POST, "/api/admin/login", credentials).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();

    if status.is_success() {
        let bytes = response.bytes().await?;
        let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
        return serde_json::from_slice(body).map_err(parse_error);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    tracing::debug!(status = status.as_u16(), ?message, "API returned an error");

    Err(match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized { message },
        StatusCode::FORBIDDEN => ApiError::Forbidden { message },
        status => ApiError::Rejected { status: status.as_u16(), message },
    })
}

/// `message` (or `error`) of a JSON error body
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

fn parse_error(error: serde_json::Error) -> ApiError {
    ApiError::ResponseParseFailed(error.to_string())
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// `{data: X}` → `X`, anything else unchanged
fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        },
        other => other,
    }
}

/// Array, `{data: [...]}`, or nothing
fn list_records<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, ApiError> {
    match unwrap_data(value) {
        array @ Value::Array(_) => serde_json::from_value(array).map_err(parse_error),
        _ => Ok(Vec::new()),
    }
}

/// Object, first element of an array, or the same under `data`
fn first_record(value: Value) -> Option<Value> {
    match unwrap_data(value) {
        Value::Array(items) => items.into_iter().next(),
        object @ Value::Object(_) => Some(object),
        _ => None,
    }
}
