//! Dependencies injected into every booking reducer.

use crate::document::TicketDispatcher;
use std::sync::Arc;
use std::time::Duration;
use ticketdesk_api::{Money, SharedBookingApi};
use ticketdesk_core::environment::Clock;
use ticketdesk_runtime::retry::RetryPolicy;

/// Tunables of the booking flows
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSettings {
    /// Reservation countdown in the checkout form
    pub reservation: Duration,
    /// Ticket fetch after the payment redirect
    pub session_retry: RetryPolicy,
    /// Placeholder email on cash register bookings
    pub cash_email: String,
    /// Unit price of a half-time ticket
    pub half_time_price: Money,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            reservation: Duration::from_secs(600),
            session_retry: RetryPolicy::default(),
            cash_email: "megajump08@gmail.com".to_string(),
            half_time_price: Money::from_euros(9),
        }
    }
}

/// Environment shared by the storefront, walk-in and cash register reducers
///
/// Child reducers take the same environment as their parent so that
/// `reduce_child` can hand it down unchanged.
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Venue API
    pub api: SharedBookingApi,
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Flow tunables
    pub settings: FlowSettings,
    /// Renders and delivers confirmed tickets
    pub tickets: Arc<TicketDispatcher>,
}

impl BookingEnvironment {
    /// Create an environment
    #[must_use]
    pub fn new(
        api: SharedBookingApi,
        clock: Arc<dyn Clock>,
        settings: FlowSettings,
        tickets: Arc<TicketDispatcher>,
    ) -> Self {
        Self {
            api,
            clock,
            settings,
            tickets,
        }
    }
}

impl std::fmt::Debug for BookingEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingEnvironment")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
