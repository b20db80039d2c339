//! Mega Jump ticket desk.
//!
//! Client side of the venue's booking system: the public storefront, the
//! walk-in desk, the cash register and the admin console, all talking to
//! the venue REST API through [`ticketdesk_api`].
//!
//! # Architecture
//!
//! ```text
//!   Storefront ──┐
//!   Walk-in ─────┼──► reducers (Selection, AddOns, Voucher, Checkout)
//!   Cash desk ───┘            │
//!                             ▼
//!                     BookingEnvironment ──► BookingApi (HTTP)
//!                             │
//!                             ▼
//!                     TicketDispatcher ──► PDF ─► file / printer / email
//!
//!   Admin console ──► AdminConsole ──► VenueClient (HTTP)
//! ```
//!
//! Every screen is a [`Reducer`](ticketdesk_core::reducer::Reducer) driven
//! by a [`Store`](ticketdesk_runtime::Store). Side effects (HTTP calls,
//! timers, document rendering) are returned as effects and their results
//! come back as actions, so the flows can be exercised with a mock API and
//! a manual clock.
//!
//! # Flows
//!
//! - **Storefront**: date and slot, tickets or bundle, add-ons, customer
//!   details under a reservation countdown, hosted card checkout, then the
//!   ticket is fetched with retries, rendered and emailed.
//! - **Walk-in**: same-day booking on one screen, always card checkout.
//! - **Cash register**: cashier-only, cash payment, thermal print.
//! - **Admin console**: settings, slots, bundles, vouchers, tickets,
//!   cancellations and refunds.

pub mod addons;
pub mod admin;
pub mod cash_register;
pub mod checkout;
pub mod config;
pub mod delivery;
pub mod document;
pub mod environment;
pub mod payment_return;
pub mod pricing;
pub mod selection;
pub mod session;
pub mod storefront;
pub mod voucher;
pub mod walk_in;

pub use admin::{AdminConsole, AdminError, Dashboard, SalesSummary};
pub use cash_register::{CashRegisterAction, CashRegisterReducer, CashRegisterState};
pub use config::Config;
pub use document::{TicketDispatcher, TicketSource};
pub use environment::{BookingEnvironment, FlowSettings};
pub use pricing::{PriceBreakdown, price_breakdown};
pub use session::{AdminSession, Role, Route};
pub use storefront::{StorefrontAction, StorefrontReducer, StorefrontState};
pub use walk_in::{WalkInAction, WalkInReducer, WalkInState};
