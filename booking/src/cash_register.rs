//! Cash register for the `cashier` role.
//!
//! Sells regular tickets, half-time tickets, socks and bundles paid in cash
//! at the counter. There is no admin fee, no voucher and no customer data:
//! bookings carry a fixed placeholder customer. A confirmed sale resets the
//! counters and the ticket is printed on the thermal layout.

use thiserror::Error;
use ticketdesk_api::{CheckoutPayload, Money, PaymentMethod, TicketRecord};
use ticketdesk_core::{SmallVec, composition::reduce_child, effect::Effect, reducer::Reducer, smallvec};

use crate::document::{DispatchReport, DocumentError, TicketSource};
use crate::environment::BookingEnvironment;
use crate::pricing::{AddOnSelection, PriceBreakdown, cash_register_breakdown};
use crate::selection::{DecrementFloor, SelectionAction, SelectionReducer, SelectionState};

/// Customer name and surname on cash bookings
pub const CASH_CUSTOMER: &str = "cash payment";

/// Why a cash sale was refused
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CashRegisterError {
    /// Date or slot missing
    #[error("Please select a date and time slot.")]
    MissingSlot,

    /// Nothing to sell
    #[error("Please select at least one ticket type (Full-Time, Half-Time, or Bundle)")]
    NothingSelected,

    /// The server refused the booking
    #[error("{0}")]
    Rejected(String),

    /// No usable answer
    #[error("Payment failed. Please try again.")]
    PaymentFailed,
}

/// Cash register state
#[derive(Clone, Debug)]
pub struct CashRegisterState {
    /// Date, slot, regular tickets and bundle
    pub selection: SelectionState,
    /// Half-time tickets
    pub half_time_tickets: u32,
    /// Pairs of socks
    pub socks: u32,
    /// Print the ticket after the sale
    pub print_tickets: bool,
    /// Booking request in flight
    pub submitting: bool,
    /// Last confirmed sale
    pub last_ticket: Option<Box<TicketRecord>>,
    /// Last failure
    pub last_error: Option<CashRegisterError>,
    /// Outcome of rendering, printing and emailing the last ticket
    pub dispatch: Option<Result<DispatchReport, DocumentError>>,
}

impl Default for CashRegisterState {
    fn default() -> Self {
        Self {
            selection: SelectionState::with_floor(DecrementFloor::Zero),
            half_time_tickets: 0,
            socks: 0,
            print_tickets: true,
            submitting: false,
            last_ticket: None,
            last_error: None,
            dispatch: None,
        }
    }
}

impl CashRegisterState {
    /// Sale total at `half_time_price` per half-time ticket
    #[must_use]
    pub fn breakdown(&self, half_time_price: Money) -> PriceBreakdown {
        let settings = self.selection.settings.clone().unwrap_or_default();
        cash_register_breakdown(
            &settings,
            self.selection.tickets,
            self.half_time_tickets,
            half_time_price,
            self.socks,
            self.selection.bundle.as_ref(),
        )
    }

    fn validate(&self) -> Result<(), CashRegisterError> {
        if self.selection.date.is_none() || self.selection.selected_slot().is_none() {
            return Err(CashRegisterError::MissingSlot);
        }
        if self.selection.tickets == 0 && self.half_time_tickets == 0 && self.selection.bundle.is_none() {
            return Err(CashRegisterError::NothingSelected);
        }
        Ok(())
    }

    /// The `POST /api/walkin/book` body for a cash sale
    #[must_use]
    pub fn payload(&self, env: &BookingEnvironment) -> CheckoutPayload {
        let settings = self.selection.settings.clone().unwrap_or_default();
        let breakdown = self.breakdown(env.settings.half_time_price);
        let add_ons = AddOnSelection::socks_only(&settings, self.socks);
        let slot = self.selection.selected_slot();
        let base = breakdown.ticket_amount + breakdown.half_time_amount;

        CheckoutPayload {
            date: slot.map(|s| s.date.clone()).unwrap_or_default(),
            start_time: slot.map(|s| s.start_time.clone()).unwrap_or_default(),
            end_time: slot.map(|s| s.end_time.clone()).unwrap_or_default(),
            tickets: self.selection.tickets,
            half_time_tickets: Some(self.half_time_tickets),
            amount: base,
            total_base_amount: base,
            bundle_selected: self.selection.bundle.is_some(),
            selected_bundle: self.selection.bundle.clone(),
            socks_count: self.socks,
            cancellation_enabled: false,
            cancellation_fee: Money::ZERO,
            total_add_on_amount: add_ons.total_add_on_amount,
            add_on_data: add_ons.to_data(),
            name: CASH_CUSTOMER.to_string(),
            surname: CASH_CUSTOMER.to_string(),
            email: env.settings.cash_email.clone(),
            total_amount: breakdown.total,
            subtotal: breakdown.total,
            payment_method: PaymentMethod::Cash,
            is_cash_payment: true,
            ..CheckoutPayload::default()
        }
    }

    fn reset_counters(&mut self) {
        self.selection.reset_choices();
        self.half_time_tickets = 0;
        self.socks = 0;
    }
}

/// Cash register actions
#[derive(Clone, Debug)]
pub enum CashRegisterAction {
    /// Load prices and today's slots
    Load,
    /// Calendar, regular ticket and bundle action
    Selection(SelectionAction),
    /// One more half-time ticket
    IncrementHalfTime,
    /// One half-time ticket less
    DecrementHalfTime,
    /// One more pair of socks
    IncrementSocks,
    /// One pair less
    DecrementSocks,
    /// Print tickets after each sale
    SetPrint(bool),
    /// Book the sale
    Pay,
    /// Booking response
    Booked(Result<Box<TicketRecord>, CashRegisterError>),
    /// Rendering, printing and emailing finished
    TicketDispatched(Result<DispatchReport, DocumentError>),
    /// Dismiss the confirmation
    Dismiss,
}

/// Reducer for the cash register
#[derive(Clone, Copy, Debug, Default)]
pub struct CashRegisterReducer;

fn selection(
    state: &mut CashRegisterState,
    action: SelectionAction,
    env: &BookingEnvironment,
) -> SmallVec<[Effect<CashRegisterAction>; 4]> {
    reduce_child(
        &SelectionReducer,
        &mut state.selection,
        action,
        env,
        CashRegisterAction::Selection,
    )
}

impl Reducer for CashRegisterReducer {
    type State = CashRegisterState;
    type Action = CashRegisterAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CashRegisterAction::Load => {
                let today = env.clock.now().date_naive();
                let mut effects = selection(state, SelectionAction::Load, env);
                effects.extend(selection(state, SelectionAction::SelectDate(today), env));
                effects
            },

            CashRegisterAction::Selection(action) => selection(state, action, env),

            CashRegisterAction::IncrementHalfTime => {
                state.half_time_tickets = state.half_time_tickets.saturating_add(1);
                SmallVec::new()
            },
            CashRegisterAction::DecrementHalfTime => {
                state.half_time_tickets = state.half_time_tickets.saturating_sub(1);
                SmallVec::new()
            },
            CashRegisterAction::IncrementSocks => {
                state.socks = state.socks.saturating_add(1);
                SmallVec::new()
            },
            CashRegisterAction::DecrementSocks => {
                state.socks = state.socks.saturating_sub(1);
                SmallVec::new()
            },
            CashRegisterAction::SetPrint(print) => {
                state.print_tickets = print;
                SmallVec::new()
            },

            CashRegisterAction::Pay => {
                if state.submitting {
                    return SmallVec::new();
                }
                if let Err(error) = state.validate() {
                    state.last_error = Some(error);
                    return SmallVec::new();
                }
                state.last_error = None;
                state.submitting = true;

                let payload = state.payload(env);
                tracing::info!(
                    total = %payload.subtotal,
                    tickets = payload.tickets,
                    half_time = ?payload.half_time_tickets,
                    "Booking cash sale"
                );
                let api = env.api.clone();
                smallvec![Effect::task(async move {
                    let result = match api.book_walk_in(&payload).await {
                        Ok(booking) if booking.success => Ok(Box::new(
                            booking
                                .ticket
                                .unwrap_or_else(|| TicketRecord::from_payload(&payload)),
                        )),
                        Ok(booking) => Err(booking
                            .message
                            .map_or(CashRegisterError::PaymentFailed, CashRegisterError::Rejected)),
                        Err(error) => {
                            tracing::error!(%error, "Cash sale failed");
                            Err(error
                                .server_message()
                                .map_or(CashRegisterError::PaymentFailed, |m| {
                                    CashRegisterError::Rejected(m.to_string())
                                }))
                        },
                    };
                    Some(CashRegisterAction::Booked(result))
                })]
            },

            CashRegisterAction::Booked(result) => {
                if !state.submitting {
                    return SmallVec::new();
                }
                state.submitting = false;
                match result {
                    Ok(ticket) => {
                        tracing::info!(ticket_id = %ticket.ticket_id, "Cash sale confirmed");
                        state.reset_counters();
                        state.last_ticket = Some(ticket.clone());
                        state.dispatch = None;
                        let tickets = env.tickets.clone();
                        let print = state.print_tickets;
                        let today = env.clock.now().date_naive();
                        let mut effects = smallvec![Effect::task(async move {
                            let result = tickets
                                .dispatch(&ticket, TicketSource::AdminCashPayment, print)
                                .await;
                            Some(CashRegisterAction::TicketDispatched(result))
                        })];
                        if state.selection.date != Some(today) {
                            effects.extend(selection(state, SelectionAction::SelectDate(today), env));
                        }
                        effects
                    },
                    Err(error) => {
                        state.last_error = Some(error);
                        SmallVec::new()
                    },
                }
            },

            CashRegisterAction::TicketDispatched(result) => {
                state.dispatch = Some(result);
                SmallVec::new()
            },

            CashRegisterAction::Dismiss => {
                state.last_ticket = None;
                state.dispatch = None;
                SmallVec::new()
            },
        }
    }
}
