//! # Venue API Client
//!
//! Rust client for the venue booking API: settings, time slots, bundles,
//! vouchers, payment sessions, walk-in bookings, ticket delivery and the
//! admin endpoints.
//!
//! ## Example
//!
//! ```no_run
//! use ticketdesk_api::VenueClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = VenueClient::from_env()?;
//!
//!     let slots = client.fetch_slots("2025-07-12").await?;
//!     for slot in slots {
//!         println!("{} - {}: {:?}", slot.start_time, slot.end_time, slot.status());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Every request carries `Accept: application/json` and the
//! `ngrok-skip-browser-warning` header. Amounts are [`Money`] in cents and
//! travel as decimal euros.

pub mod client;
pub mod error;
pub mod gateway;
pub mod money;
pub mod types;

// Re-export main types for convenience
pub use client::{CheckoutRedirect, DEFAULT_BASE_URL, VenueClient};
pub use error::ApiError;
pub use gateway::{ApiFuture, BookingApi, SharedBookingApi};
pub use money::Money;
pub use types::{
    AddOnData, AdminCredentials, AppliedVoucher, Bundle, CheckoutPayload, DiscountType,
    PaymentMethod, Settings, SlotStatus, TicketRecord, TimeSlot, VoucherValidation,
};
