//! Booking-flow seam over the venue API.
//!
//! Reducers depend on [`BookingApi`] rather than on [`VenueClient`] so that
//! screens can run against an in-memory double in tests.

use crate::client::{CheckoutRedirect, VenueClient};
use crate::error::ApiError;
use crate::types::{
    Acknowledgement, AdminCredentials, Bundle, CancelRequestInput, CheckoutPayload,
    LoginResponse, SessionResult, Settings, TicketEmail, TimeSlot, VoucherValidation,
    VoucherValidationRequest, WalkInBooking,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by [`BookingApi`] methods
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Remote calls made by the storefront, walk-in, cash register and login screens
pub trait BookingApi: Send + Sync {
    /// Venue settings (first record)
    fn settings(&self) -> ApiFuture<'_, Option<Settings>>;

    /// Bundles on sale
    fn bundles(&self) -> ApiFuture<'_, Vec<Bundle>>;

    /// Slots for one day (`YYYY-MM-DD`)
    fn slots<'a>(&'a self, date: &'a str) -> ApiFuture<'a, Vec<TimeSlot>>;

    /// Server-side voucher validation
    fn validate_voucher<'a>(
        &'a self,
        request: &'a VoucherValidationRequest,
    ) -> ApiFuture<'a, VoucherValidation>;

    /// Card checkout session
    fn create_payment_session<'a>(
        &'a self,
        payload: &'a CheckoutPayload,
    ) -> ApiFuture<'a, CheckoutRedirect>;

    /// Walk-in or cash booking
    fn book_walk_in<'a>(&'a self, payload: &'a CheckoutPayload) -> ApiFuture<'a, WalkInBooking>;

    /// Ticket for a completed checkout session
    fn session_result<'a>(&'a self, session_id: &'a str) -> ApiFuture<'a, SessionResult>;

    /// Ask the server to reconcile a checkout session
    fn verify_payment<'a>(&'a self, session_id: &'a str) -> ApiFuture<'a, ()>;

    /// Mail the ticket document
    fn send_ticket_email<'a>(&'a self, email: &'a TicketEmail) -> ApiFuture<'a, Acknowledgement>;

    /// Customer cancellation request
    fn request_cancellation<'a>(
        &'a self,
        input: &'a CancelRequestInput,
    ) -> ApiFuture<'a, Acknowledgement>;

    /// Admin login
    fn admin_login<'a>(&'a self, credentials: &'a AdminCredentials) -> ApiFuture<'a, LoginResponse>;
}

/// Shared handle used in reducer environments
pub type SharedBookingApi = Arc<dyn BookingApi>;

impl BookingApi for VenueClient {
    fn settings(&self) -> ApiFuture<'_, Option<Settings>> {
        Box::pin(self.fetch_settings())
    }

    fn bundles(&self) -> ApiFuture<'_, Vec<Bundle>> {
        Box::pin(self.fetch_bundles())
    }

    fn slots<'a>(&'a self, date: &'a str) -> ApiFuture<'a, Vec<TimeSlot>> {
        Box::pin(self.fetch_slots(date))
    }

    fn validate_voucher<'a>(
        &'a self,
        request: &'a VoucherValidationRequest,
    ) -> ApiFuture<'a, VoucherValidation> {
        Box::pin(VenueClient::validate_voucher(self, request))
    }

    fn create_payment_session<'a>(
        &'a self,
        payload: &'a CheckoutPayload,
    ) -> ApiFuture<'a, CheckoutRedirect> {
        Box::pin(VenueClient::create_payment_session(self, payload))
    }

    fn book_walk_in<'a>(&'a self, payload: &'a CheckoutPayload) -> ApiFuture<'a, WalkInBooking> {
        Box::pin(VenueClient::book_walk_in(self, payload))
    }

    fn session_result<'a>(&'a self, session_id: &'a str) -> ApiFuture<'a, SessionResult> {
        Box::pin(VenueClient::session_result(self, session_id))
    }

    fn verify_payment<'a>(&'a self, session_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            VenueClient::verify_payment(self, session_id).await?;
            Ok(())
        })
    }

    fn send_ticket_email<'a>(&'a self, email: &'a TicketEmail) -> ApiFuture<'a, Acknowledgement> {
        Box::pin(VenueClient::send_ticket_email(self, email))
    }

    fn request_cancellation<'a>(
        &'a self,
        input: &'a CancelRequestInput,
    ) -> ApiFuture<'a, Acknowledgement> {
        Box::pin(VenueClient::request_cancellation(self, input))
    }

    fn admin_login<'a>(&'a self, credentials: &'a AdminCredentials) -> ApiFuture<'a, LoginResponse> {
        Box::pin(VenueClient::admin_login(self, credentials))
    }
}
