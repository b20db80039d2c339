//! Walk-in desk booking.
//!
//! A single screen for customers buying at the venue: today's slots, a
//! ticket counter, socks, an optional bundle and a voucher. Payment always
//! goes through the hosted card checkout via `POST /api/walkin/book`, which
//! redirects back to `/walkinTickets/:sessionId`.

use thiserror::Error;
use ticketdesk_api::{ApiError, CheckoutPayload, PaymentMethod, TicketRecord};
use ticketdesk_core::{SmallVec, composition::reduce_child, effect::Effect, reducer::Reducer, smallvec};

use crate::document::{DispatchReport, DocumentError, TicketSource};
use crate::environment::BookingEnvironment;
use crate::payment_return::{self, PaymentReturnError, ReturnParams};
use crate::pricing::{AddOnSelection, PriceBreakdown, walk_in_breakdown};
use crate::selection::{DecrementFloor, SelectionAction, SelectionReducer, SelectionState};
use crate::voucher::{VoucherAction, VoucherReducer, VoucherState};

/// Why a walk-in booking did not go through
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalkInError {
    /// Date, slot or a customer field is missing
    #[error("Please fill in all required fields.")]
    MissingFields,

    /// The server refused the booking
    #[error("{0}")]
    Rejected(String),

    /// No usable answer
    #[error("Payment failed. Please try again.")]
    PaymentFailed,
}

/// Customer fields of the walk-in form
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkInField {
    /// First name
    Name,
    /// Surname
    Surname,
    /// Email
    Email,
}

/// Where the walk-in booking stands
#[derive(Clone, Debug, Default, PartialEq)]
pub enum WalkInPhase {
    /// Form shown
    #[default]
    Editing,
    /// Booking request in flight
    Submitting,
    /// Navigate to the hosted checkout page
    Redirect {
        /// Hosted checkout page
        checkout_url: String,
    },
    /// Fetching the ticket after the redirect back
    AwaitingTicket,
    /// Ticket shown
    Confirmed(Box<TicketRecord>),
}

/// Walk-in form state
#[derive(Clone, Debug)]
pub struct WalkInState {
    /// Where the booking stands
    pub phase: WalkInPhase,
    /// Date, slot, tickets and bundle
    pub selection: SelectionState,
    /// Pairs of socks
    pub socks: u32,
    /// First name
    pub name: String,
    /// Surname
    pub surname: String,
    /// Email
    pub email: String,
    /// Discount code field
    pub voucher: VoucherState,
    /// Last booking failure
    pub last_error: Option<WalkInError>,
    /// Ticket fetch failure after the redirect
    pub return_error: Option<PaymentReturnError>,
    /// Outcome of rendering and emailing the ticket
    pub dispatch: Option<Result<DispatchReport, DocumentError>>,
}

impl Default for WalkInState {
    fn default() -> Self {
        Self {
            phase: WalkInPhase::Editing,
            selection: SelectionState::with_floor(DecrementFloor::Zero),
            socks: 0,
            name: String::new(),
            surname: String::new(),
            email: String::new(),
            voucher: VoucherState::default(),
            last_error: None,
            return_error: None,
            dispatch: None,
        }
    }
}

impl WalkInState {
    /// Current order total, voucher included
    #[must_use]
    pub fn breakdown(&self) -> PriceBreakdown {
        let settings = self.selection.settings.clone().unwrap_or_default();
        let voucher = self.voucher.applied_voucher();
        walk_in_breakdown(
            &settings,
            self.selection.tickets,
            self.socks,
            self.selection.bundle.as_ref(),
            voucher.as_ref(),
        )
    }

    fn validate(&self) -> Result<(), WalkInError> {
        let customer_filled = [&self.name, &self.surname, &self.email]
            .iter()
            .all(|value| !value.trim().is_empty());
        if self.selection.date.is_none() || self.selection.selected_slot().is_none() || !customer_filled {
            return Err(WalkInError::MissingFields);
        }
        Ok(())
    }

    /// The `POST /api/walkin/book` body
    ///
    /// `amount` carries the unit ticket price, which is what the walk-in
    /// desk has always sent; the server prices from `subtotal`.
    #[must_use]
    pub fn payload(&self) -> CheckoutPayload {
        let settings = self.selection.settings.clone().unwrap_or_default();
        let breakdown = self.breakdown();
        let add_ons = AddOnSelection::socks_only(&settings, self.socks);
        let slot = self.selection.selected_slot();

        CheckoutPayload {
            date: slot.map(|s| s.date.clone()).unwrap_or_default(),
            start_time: slot.map(|s| s.start_time.clone()).unwrap_or_default(),
            end_time: slot.map(|s| s.end_time.clone()).unwrap_or_default(),
            tickets: self.selection.tickets,
            amount: settings.ticket_price,
            total_base_amount: breakdown.ticket_amount,
            bundle_selected: self.selection.bundle.is_some(),
            selected_bundle: self.selection.bundle.clone(),
            socks_count: self.socks,
            cancellation_enabled: false,
            cancellation_fee: add_ons.cancellation_fee,
            total_add_on_amount: add_ons.total_add_on_amount,
            add_on_data: add_ons.to_data(),
            name: self.name.trim().to_string(),
            surname: self.surname.trim().to_string(),
            email: self.email.trim().to_string(),
            voucher_data: self.voucher.applied_voucher(),
            total_amount: breakdown.total,
            subtotal: breakdown.total,
            payment_method: PaymentMethod::Card,
            is_cash_payment: false,
            ..CheckoutPayload::default()
        }
    }
}

/// Walk-in form actions
#[derive(Clone, Debug)]
pub enum WalkInAction {
    /// Load prices and today's slots
    Load,
    /// Calendar action
    Selection(SelectionAction),
    /// One more pair of socks
    IncrementSocks,
    /// One pair less
    DecrementSocks,
    /// Edit a customer field
    SetField(WalkInField, String),
    /// Validate the typed code against the current total
    ApplyVoucher,
    /// Voucher field action
    Voucher(VoucherAction),
    /// Book and go to card checkout
    Pay,
    /// Booking response: the hosted checkout page
    Booked(Result<String, WalkInError>),
    /// The page was opened with a query string
    Returned {
        /// Raw query string
        query: String,
    },
    /// Ticket fetch after the redirect back
    TicketFetched(Result<Box<TicketRecord>, PaymentReturnError>),
    /// Rendering and emailing finished
    TicketDispatched(Result<DispatchReport, DocumentError>),
    /// Clear the form for the next customer
    Reset,
}

/// Reducer for the walk-in desk
#[derive(Clone, Copy, Debug, Default)]
pub struct WalkInReducer;

fn selection(
    state: &mut WalkInState,
    action: SelectionAction,
    env: &BookingEnvironment,
) -> SmallVec<[Effect<WalkInAction>; 4]> {
    reduce_child(&SelectionReducer, &mut state.selection, action, env, WalkInAction::Selection)
}

impl Reducer for WalkInReducer {
    type State = WalkInState;
    type Action = WalkInAction;
    type Environment = BookingEnvironment;

    #[allow(clippy::too_many_lines)] // one arm per form event
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            WalkInAction::Load => {
                let today = env.clock.now().date_naive();
                let mut effects = selection(state, SelectionAction::Load, env);
                effects.extend(selection(state, SelectionAction::SelectDate(today), env));
                effects
            },

            WalkInAction::Selection(action) => selection(state, action, env),

            WalkInAction::IncrementSocks => {
                state.socks = state.socks.saturating_add(1);
                SmallVec::new()
            },

            WalkInAction::DecrementSocks => {
                state.socks = state.socks.saturating_sub(1);
                SmallVec::new()
            },

            WalkInAction::SetField(field, value) => {
                match field {
                    WalkInField::Name => state.name = value,
                    WalkInField::Surname => state.surname = value,
                    WalkInField::Email => state.email = value,
                }
                SmallVec::new()
            },

            WalkInAction::ApplyVoucher => {
                let amount = state.breakdown().total_before_voucher;
                reduce_child(
                    &VoucherReducer,
                    &mut state.voucher,
                    VoucherAction::Apply { amount },
                    env,
                    WalkInAction::Voucher,
                )
            },

            WalkInAction::Voucher(action) => {
                reduce_child(&VoucherReducer, &mut state.voucher, action, env, WalkInAction::Voucher)
            },

            WalkInAction::Pay => {
                if state.phase != WalkInPhase::Editing {
                    return SmallVec::new();
                }
                if let Err(error) = state.validate() {
                    state.last_error = Some(error);
                    return SmallVec::new();
                }
                state.last_error = None;
                state.phase = WalkInPhase::Submitting;

                let payload = state.payload();
                tracing::info!(total = %payload.subtotal, tickets = payload.tickets, "Booking walk-in ticket");
                let api = env.api.clone();
                smallvec![Effect::task(async move {
                    let result = match api.book_walk_in(&payload).await {
                        Ok(booking) if booking.success => booking.checkout_url.ok_or_else(|| {
                            WalkInError::Rejected("No checkout page returned".to_string())
                        }),
                        Ok(booking) => Err(booking
                            .message
                            .map_or(WalkInError::PaymentFailed, WalkInError::Rejected)),
                        Err(error) => {
                            tracing::error!(%error, "Walk-in booking failed");
                            Err(match error {
                                ApiError::Unsuccessful { message } => WalkInError::Rejected(message),
                                _ => WalkInError::PaymentFailed,
                            })
                        },
                    };
                    Some(WalkInAction::Booked(result))
                })]
            },

            WalkInAction::Booked(result) => {
                if state.phase != WalkInPhase::Submitting {
                    return SmallVec::new();
                }
                match result {
                    Ok(checkout_url) => state.phase = WalkInPhase::Redirect { checkout_url },
                    Err(error) => {
                        state.phase = WalkInPhase::Editing;
                        state.last_error = Some(error);
                    },
                }
                SmallVec::new()
            },

            WalkInAction::Returned { query } => {
                let params = ReturnParams::parse(&query);
                let Some(session_id) = params.successful_session().map(str::to_string) else {
                    return SmallVec::new();
                };
                state.phase = WalkInPhase::AwaitingTicket;
                let verify_api = env.api.clone();
                let verify_id = session_id.clone();
                let fetch_api = env.api.clone();
                smallvec![
                    Effect::task(async move {
                        payment_return::verify_payment(verify_api.as_ref(), &verify_id).await;
                        None
                    }),
                    Effect::task(async move {
                        let result = payment_return::fetch_ticket_once(fetch_api.as_ref(), &session_id)
                            .await
                            .map(Box::new);
                        Some(WalkInAction::TicketFetched(result))
                    }),
                ]
            },

            WalkInAction::TicketFetched(result) => match result {
                Ok(ticket) => {
                    state.phase = WalkInPhase::Confirmed(ticket.clone());
                    let tickets = env.tickets.clone();
                    smallvec![Effect::task(async move {
                        let result = tickets.dispatch(&ticket, TicketSource::WalkIn, false).await;
                        Some(WalkInAction::TicketDispatched(result))
                    })]
                },
                Err(error) => {
                    tracing::error!(%error, "Walk-in ticket not retrieved");
                    state.phase = WalkInPhase::Editing;
                    state.return_error = Some(error);
                    SmallVec::new()
                },
            },

            WalkInAction::TicketDispatched(result) => {
                state.dispatch = Some(result);
                SmallVec::new()
            },

            WalkInAction::Reset => {
                let settings = state.selection.settings.take();
                let bundles = std::mem::take(&mut state.selection.bundles);
                *state = WalkInState::default();
                state.selection.settings = settings;
                state.selection.bundles = bundles;
                let today = env.clock.now().date_naive();
                selection(state, SelectionAction::SelectDate(today), env)
            },
        }
    }
}
