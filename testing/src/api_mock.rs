//! In-memory double of the `BookingApi` seam.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use ticketdesk_api::types::{
    Acknowledgement, AdminCredentials, Bundle, CancelRequestInput, CheckoutPayload, LoginResponse,
    SessionResult, Settings, TicketEmail, TimeSlot, VoucherValidation, VoucherValidationRequest,
    WalkInBooking,
};
use ticketdesk_api::{ApiError, ApiFuture, BookingApi, CheckoutRedirect};

/// A call recorded by [`MockBookingApi`]
#[derive(Clone, Debug, PartialEq)]
pub enum ApiCall {
    /// `settings()`
    Settings,
    /// `bundles()`
    Bundles,
    /// `slots(date)`
    Slots(String),
    /// `validate_voucher(request)`
    ValidateVoucher(VoucherValidationRequest),
    /// `create_payment_session(payload)`
    CreatePaymentSession(Box<CheckoutPayload>),
    /// `book_walk_in(payload)`
    BookWalkIn(Box<CheckoutPayload>),
    /// `session_result(id)`
    SessionResult(String),
    /// `verify_payment(id)`
    VerifyPayment(String),
    /// `send_ticket_email(email)`
    SendTicketEmail(TicketEmail),
    /// `request_cancellation(input)`
    RequestCancellation(CancelRequestInput),
    /// `admin_login(credentials)`, username only
    AdminLogin(String),
}

struct Responses {
    settings: Result<Option<Settings>, ApiError>,
    bundles: Result<Vec<Bundle>, ApiError>,
    slots: Result<Vec<TimeSlot>, ApiError>,
    voucher: Result<VoucherValidation, ApiError>,
    voucher_delay: Duration,
    payment_session: Result<CheckoutRedirect, ApiError>,
    walk_in: Result<WalkInBooking, ApiError>,
    session_results: VecDeque<Result<SessionResult, ApiError>>,
    verify: Result<(), ApiError>,
    email: Result<Acknowledgement, ApiError>,
    cancellation: Result<Acknowledgement, ApiError>,
    login: Result<LoginResponse, ApiError>,
}

impl Default for Responses {
    fn default() -> Self {
        let unconfigured = || ApiError::RequestFailed("not configured in mock".to_string());
        Self {
            settings: Ok(None),
            bundles: Ok(Vec::new()),
            slots: Ok(Vec::new()),
            voucher: Err(unconfigured()),
            voucher_delay: Duration::ZERO,
            payment_session: Err(unconfigured()),
            walk_in: Err(unconfigured()),
            session_results: VecDeque::new(),
            verify: Ok(()),
            email: Ok(Acknowledgement {
                success: true,
                message: None,
            }),
            cancellation: Err(unconfigured()),
            login: Err(unconfigured()),
        }
    }
}

/// Scripted venue API
///
/// Each endpoint answers with a configured result and every call is recorded.
/// Session results form a queue so retry loops can be driven through a
/// sequence of answers; the last one repeats once the queue is drained.
///
/// # Example
///
/// ```
/// use ticketdesk_api::types::Settings;
/// use ticketdesk_api::{BookingApi, Money};
/// use ticketdesk_testing::{ApiCall, MockBookingApi};
///
/// let api = MockBookingApi::new().with_settings(Settings {
///     ticket_price: Money::from_euros(15),
///     ..Settings::default()
/// });
/// let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// let settings = runtime.block_on(api.settings()).unwrap();
/// assert_eq!(settings.unwrap().ticket_price, Money::from_euros(15));
/// assert_eq!(api.calls(), vec![ApiCall::Settings]);
/// ```
#[derive(Default)]
pub struct MockBookingApi {
    responses: Mutex<Responses>,
    calls: Mutex<Vec<ApiCall>>,
}

impl MockBookingApi {
    /// Mock with empty settings, bundles and slots, every other call failing
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn configure(self, apply: impl FnOnce(&mut Responses)) -> Self {
        apply(&mut self.responses.lock().unwrap_or_else(PoisonError::into_inner));
        self
    }

    /// Answer `settings()` with this record
    #[must_use]
    pub fn with_settings(self, settings: Settings) -> Self {
        self.configure(|r| r.settings = Ok(Some(settings)))
    }

    /// Answer `bundles()`
    #[must_use]
    pub fn with_bundles(self, bundles: Vec<Bundle>) -> Self {
        self.configure(|r| r.bundles = Ok(bundles))
    }

    /// Answer every `slots(date)` call with these slots
    #[must_use]
    pub fn with_slots(self, slots: Vec<TimeSlot>) -> Self {
        self.configure(|r| r.slots = Ok(slots))
    }

    /// Fail `slots(date)`
    #[must_use]
    pub fn with_slots_error(self, error: ApiError) -> Self {
        self.configure(|r| r.slots = Err(error))
    }

    /// Answer `validate_voucher`
    #[must_use]
    pub fn with_voucher(self, result: Result<VoucherValidation, ApiError>) -> Self {
        self.configure(|r| r.voucher = result)
    }

    /// Delay voucher answers (for stale-response scenarios)
    #[must_use]
    pub fn with_voucher_delay(self, delay: Duration) -> Self {
        self.configure(|r| r.voucher_delay = delay)
    }

    /// Answer `create_payment_session`
    #[must_use]
    pub fn with_payment_session(self, result: Result<CheckoutRedirect, ApiError>) -> Self {
        self.configure(|r| r.payment_session = result)
    }

    /// Answer `book_walk_in`
    #[must_use]
    pub fn with_walk_in(self, result: Result<WalkInBooking, ApiError>) -> Self {
        self.configure(|r| r.walk_in = result)
    }

    /// Queue one `session_result` answer
    #[must_use]
    pub fn push_session_result(self, result: Result<SessionResult, ApiError>) -> Self {
        self.configure(|r| r.session_results.push_back(result))
    }

    /// Answer `verify_payment`
    #[must_use]
    pub fn with_verify(self, result: Result<(), ApiError>) -> Self {
        self.configure(|r| r.verify = result)
    }

    /// Answer `send_ticket_email`
    #[must_use]
    pub fn with_email(self, result: Result<Acknowledgement, ApiError>) -> Self {
        self.configure(|r| r.email = result)
    }

    /// Answer `request_cancellation`
    #[must_use]
    pub fn with_cancellation(self, result: Result<Acknowledgement, ApiError>) -> Self {
        self.configure(|r| r.cancellation = result)
    }

    /// Answer `admin_login`
    #[must_use]
    pub fn with_login(self, result: Result<LoginResponse, ApiError>) -> Self {
        self.configure(|r| r.login = result)
    }

    /// Every call made so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls matching `predicate`
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&ApiCall) -> bool) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    fn record(&self, call: ApiCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn answer<T>(&self, pick: impl FnOnce(&mut Responses) -> T) -> T {
        pick(&mut self.responses.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl BookingApi for MockBookingApi {
    fn settings(&self) -> ApiFuture<'_, Option<Settings>> {
        self.record(ApiCall::Settings);
        let result = self.answer(|r| r.settings.clone());
        Box::pin(async move { result })
    }

    fn bundles(&self) -> ApiFuture<'_, Vec<Bundle>> {
        self.record(ApiCall::Bundles);
        let result = self.answer(|r| r.bundles.clone());
        Box::pin(async move { result })
    }

    fn slots<'a>(&'a self, date: &'a str) -> ApiFuture<'a, Vec<TimeSlot>> {
        self.record(ApiCall::Slots(date.to_string()));
        let result = self.answer(|r| r.slots.clone());
        Box::pin(async move { result })
    }

    fn validate_voucher<'a>(
        &'a self,
        request: &'a VoucherValidationRequest,
    ) -> ApiFuture<'a, VoucherValidation> {
        self.record(ApiCall::ValidateVoucher(request.clone()));
        let (result, delay) = self.answer(|r| (r.voucher.clone(), r.voucher_delay));
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }

    fn create_payment_session<'a>(
        &'a self,
        payload: &'a CheckoutPayload,
    ) -> ApiFuture<'a, CheckoutRedirect> {
        self.record(ApiCall::CreatePaymentSession(Box::new(payload.clone())));
        let result = self.answer(|r| r.payment_session.clone());
        Box::pin(async move { result })
    }

    fn book_walk_in<'a>(&'a self, payload: &'a CheckoutPayload) -> ApiFuture<'a, WalkInBooking> {
        self.record(ApiCall::BookWalkIn(Box::new(payload.clone())));
        let result = self.answer(|r| r.walk_in.clone());
        Box::pin(async move { result })
    }

    fn session_result<'a>(&'a self, session_id: &'a str) -> ApiFuture<'a, SessionResult> {
        self.record(ApiCall::SessionResult(session_id.to_string()));
        let result = self.answer(|r| {
            if r.session_results.len() > 1 {
                r.session_results
                    .pop_front()
                    .unwrap_or_else(|| Ok(SessionResult::default()))
            } else {
                r.session_results
                    .front()
                    .cloned()
                    .unwrap_or_else(|| Ok(SessionResult::default()))
            }
        });
        Box::pin(async move { result })
    }

    fn verify_payment<'a>(&'a self, session_id: &'a str) -> ApiFuture<'a, ()> {
        self.record(ApiCall::VerifyPayment(session_id.to_string()));
        let result = self.answer(|r| r.verify.clone());
        Box::pin(async move { result })
    }

    fn send_ticket_email<'a>(&'a self, email: &'a TicketEmail) -> ApiFuture<'a, Acknowledgement> {
        self.record(ApiCall::SendTicketEmail(email.clone()));
        let result = self.answer(|r| r.email.clone());
        Box::pin(async move { result })
    }

    fn request_cancellation<'a>(
        &'a self,
        input: &'a CancelRequestInput,
    ) -> ApiFuture<'a, Acknowledgement> {
        self.record(ApiCall::RequestCancellation(input.clone()));
        let result = self.answer(|r| r.cancellation.clone());
        Box::pin(async move { result })
    }

    fn admin_login<'a>(&'a self, credentials: &'a AdminCredentials) -> ApiFuture<'a, LoginResponse> {
        self.record(ApiCall::AdminLogin(credentials.username.clone()));
        let result = self.answer(|r| r.login.clone());
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketdesk_api::Money;

    #[tokio::test]
    async fn session_results_drain_then_repeat_last() {
        let ticket_less = SessionResult::default();
        let with_ticket = SessionResult {
            success: true,
            ticket: Some(ticketdesk_api::TicketRecord {
                ticket_id: "TKT-9".to_string(),
                ..Default::default()
            }),
            message: None,
        };
        let api = MockBookingApi::new()
            .push_session_result(Err(ApiError::Timeout))
            .push_session_result(Ok(ticket_less))
            .push_session_result(Ok(with_ticket.clone()));

        assert_eq!(api.session_result("cs").await, Err(ApiError::Timeout));
        assert!(api.session_result("cs").await.is_ok_and(|r| r.ticket.is_none()));
        assert_eq!(api.session_result("cs").await, Ok(with_ticket.clone()));
        assert_eq!(api.session_result("cs").await, Ok(with_ticket));
        assert_eq!(api.count(|c| matches!(c, ApiCall::SessionResult(_))), 4);
    }

    #[tokio::test]
    async fn unconfigured_calls_fail() {
        let api = MockBookingApi::new();
        let request = VoucherValidationRequest {
            code: "X".to_string(),
            amount: Money::from_euros(1),
        };
        assert!(api.validate_voucher(&request).await.is_err());
        assert!(api.settings().await.is_ok_and(|s| s.is_none()));
    }
}
