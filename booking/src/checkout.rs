//! Customer details, reservation countdown and order submission.
//!
//! The checkout form opens with a frozen [`Selection`] and
//! [`AddOnSelection`] and starts a countdown of one-second ticks. Submission
//! is checked locally in a fixed order (required fields, email repeat,
//! countdown, terms) before a single request is made:
//!
//! - card: `POST /api/payment/session`, which yields the hosted checkout page
//! - cash: `POST /api/walkin/book`, which yields the confirmed ticket
//!
//! A failed submission is not retried; the customer submits again.

use std::time::Duration;
use thiserror::Error;
use ticketdesk_api::{
    ApiError, CheckoutPayload, CheckoutRedirect, PaymentMethod, Settings, TicketRecord,
};
use ticketdesk_core::{SmallVec, composition::reduce_child, effect::Effect, reducer::Reducer, smallvec};

use crate::environment::BookingEnvironment;
use crate::pricing::{AddOnSelection, PriceBreakdown, price_breakdown};
use crate::selection::Selection;
use crate::voucher::{VoucherAction, VoucherReducer, VoucherState};

const TICK: Duration = Duration::from_secs(1);

/// Why a submission did not go through
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// A required customer field is blank
    #[error("Please fill all required fields before submitting the ticket.")]
    MissingFields,

    /// Email and repeated email differ
    #[error("Emails do not match.")]
    EmailMismatch,

    /// The countdown reached zero
    #[error("The ticket you selected is no more reserved for you.")]
    ReservationExpired,

    /// A terms checkbox is unticked
    #[error("Please accept all terms to continue.")]
    TermsNotAccepted,

    /// The server refused the order
    #[error("{0}")]
    Rejected(String),

    /// Anything else
    #[error("Something went wrong during payment.")]
    Failed,
}

impl From<ApiError> for CheckoutError {
    fn from(error: ApiError) -> Self {
        match error.server_message() {
            Some(message) => Self::Rejected(message.to_string()),
            None => Self::Failed,
        }
    }
}

/// Customer form fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CustomerField {
    /// First name
    Name,
    /// Surname
    Surname,
    /// Email
    Email,
    /// Email, typed again
    RepeatEmail,
    /// Phone
    Phone,
    /// Postal code
    PostalCode,
}

/// Customer details as typed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CustomerForm {
    /// First name
    pub name: String,
    /// Surname
    pub surname: String,
    /// Email
    pub email: String,
    /// Email, typed again
    pub repeat_email: String,
    /// Phone
    pub phone: String,
    /// Postal code
    pub postal_code: String,
}

impl CustomerForm {
    fn field_mut(&mut self, field: CustomerField) -> &mut String {
        match field {
            CustomerField::Name => &mut self.name,
            CustomerField::Surname => &mut self.surname,
            CustomerField::Email => &mut self.email,
            CustomerField::RepeatEmail => &mut self.repeat_email,
            CustomerField::Phone => &mut self.phone,
            CustomerField::PostalCode => &mut self.postal_code,
        }
    }

    /// Name, email twice, phone and postal code are filled in
    #[must_use]
    pub fn has_required_fields(&self) -> bool {
        [
            &self.name,
            &self.email,
            &self.repeat_email,
            &self.phone,
            &self.postal_code,
        ]
        .iter()
        .all(|value| !value.trim().is_empty())
    }
}

/// Where the checkout stands
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CheckoutPhase {
    /// Form not shown
    #[default]
    Closed,
    /// Customer is filling in the form
    Editing,
    /// Request in flight
    Submitting,
    /// Card order accepted; navigate to the hosted page
    Redirect(CheckoutRedirect),
    /// Cash order booked
    Confirmed(Box<TicketRecord>),
}

/// Checkout form state
#[derive(Clone, Debug, PartialEq)]
pub struct CheckoutState {
    /// Where the checkout stands
    pub phase: CheckoutPhase,
    /// Frozen slot, tickets and bundle
    pub selection: Option<Selection>,
    /// Frozen add-ons
    pub add_ons: AddOnSelection,
    /// Venue prices
    pub settings: Settings,
    /// Card or cash
    pub method: PaymentMethod,
    /// Customer details
    pub form: CustomerForm,
    /// Terms checkboxes
    pub terms_accepted: Vec<bool>,
    /// Discount code field
    pub voucher: VoucherState,
    /// Countdown
    pub seconds_remaining: u64,
    /// Bumped on every start so ticks of an older countdown are ignored
    pub timer_generation: u64,
    /// The reservation lapsed; the flow must start over
    pub restart_required: bool,
    /// Last submission failure
    pub last_error: Option<CheckoutError>,
}

impl Default for CheckoutState {
    fn default() -> Self {
        Self {
            phase: CheckoutPhase::Closed,
            selection: None,
            add_ons: AddOnSelection::default(),
            settings: Settings::default(),
            method: PaymentMethod::Card,
            form: CustomerForm::default(),
            terms_accepted: vec![false],
            voucher: VoucherState::default(),
            seconds_remaining: 0,
            timer_generation: 0,
            restart_required: false,
            last_error: None,
        }
    }
}

impl CheckoutState {
    /// Current order total, voucher included
    #[must_use]
    pub fn breakdown(&self) -> PriceBreakdown {
        let voucher = self.voucher.applied_voucher();
        price_breakdown(
            &self.settings,
            self.selection.as_ref().map_or(0, |s| s.tickets),
            &self.add_ons,
            self.selection.as_ref().and_then(|s| s.bundle.as_ref()),
            voucher.as_ref(),
            self.method,
        )
    }

    /// Countdown as `MM:SS`
    #[must_use]
    pub fn countdown(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.seconds_remaining / 60,
            self.seconds_remaining % 60
        )
    }

    /// The request body for the current form
    #[must_use]
    pub fn payload(&self) -> CheckoutPayload {
        let breakdown = self.breakdown();
        let mut payload = CheckoutPayload {
            socks_count: self.add_ons.socks_count,
            cancellation_enabled: self.add_ons.cancellation_enabled,
            cancellation_fee: self.add_ons.cancellation_fee,
            total_add_on_amount: self.add_ons.total_add_on_amount,
            add_on_data: self.add_ons.to_data(),
            name: self.form.name.trim().to_string(),
            surname: self.form.surname.trim().to_string(),
            email: self.form.email.trim().to_string(),
            phone: self.form.phone.trim().to_string(),
            postal_code: self.form.postal_code.trim().to_string(),
            voucher_data: self.voucher.applied_voucher(),
            total_amount: breakdown.total,
            subtotal: breakdown.total,
            payment_method: self.method,
            is_cash_payment: self.method == PaymentMethod::Cash,
            ..CheckoutPayload::default()
        };
        if let Some(selection) = &self.selection {
            selection.fill(&mut payload);
        }
        payload
    }

    fn validate(&mut self) -> Result<(), CheckoutError> {
        if !self.form.has_required_fields() {
            return Err(CheckoutError::MissingFields);
        }
        if self.form.email != self.form.repeat_email {
            return Err(CheckoutError::EmailMismatch);
        }
        if self.seconds_remaining == 0 {
            self.restart_required = true;
            return Err(CheckoutError::ReservationExpired);
        }
        if !self.terms_accepted.iter().all(|accepted| *accepted) {
            return Err(CheckoutError::TermsNotAccepted);
        }
        Ok(())
    }
}

/// Checkout form actions
#[derive(Clone, Debug, PartialEq)]
pub enum CheckoutAction {
    /// Open the form and start the countdown
    Start {
        /// Frozen selection
        selection: Selection,
        /// Frozen add-ons
        add_ons: AddOnSelection,
        /// Venue prices
        settings: Settings,
        /// Card or cash
        method: PaymentMethod,
    },
    /// One second of the countdown elapsed
    Tick {
        /// Countdown the tick belongs to
        generation: u64,
    },
    /// Edit a customer field
    SetField(CustomerField, String),
    /// Tick or untick a terms checkbox
    SetTerm {
        /// Checkbox index
        index: usize,
        /// New value
        accepted: bool,
    },
    /// Validate the typed code against the current pre-discount total
    ApplyVoucher,
    /// Voucher field action
    Voucher(VoucherAction),
    /// Check the form and send the order
    Submit,
    /// Card session response
    SessionCreated(Result<CheckoutRedirect, CheckoutError>),
    /// Cash booking response
    CashBooked(Result<Box<TicketRecord>, CheckoutError>),
    /// Close the form and stop the countdown
    Close,
}

/// Reducer for the checkout form
#[derive(Clone, Copy, Debug, Default)]
pub struct CheckoutReducer;

impl CheckoutReducer {
    fn submit(
        state: &mut CheckoutState,
        env: &BookingEnvironment,
    ) -> SmallVec<[Effect<CheckoutAction>; 4]> {
        match state.phase {
            CheckoutPhase::Editing => {},
            CheckoutPhase::Submitting => {
                tracing::debug!("Submission already in flight");
                return SmallVec::new();
            },
            _ => {
                tracing::warn!(phase = ?state.phase, "Submit outside the checkout form");
                return SmallVec::new();
            },
        }

        if let Err(error) = state.validate() {
            tracing::debug!(%error, "Checkout blocked");
            state.last_error = Some(error);
            return SmallVec::new();
        }

        state.last_error = None;
        state.phase = CheckoutPhase::Submitting;
        let payload = state.payload();
        let api = env.api.clone();
        tracing::info!(
            method = ?payload.payment_method,
            total = %payload.total_amount,
            "Submitting checkout"
        );

        match state.method {
            PaymentMethod::Card => smallvec![Effect::task(async move {
                let result = api
                    .create_payment_session(&payload)
                    .await
                    .map_err(CheckoutError::from);
                Some(CheckoutAction::SessionCreated(result))
            })],
            PaymentMethod::Cash => smallvec![Effect::task(async move {
                let result = match api.book_walk_in(&payload).await {
                    Ok(booking) if booking.success || booking.ticket.is_some() => {
                        Ok(Box::new(booking.ticket.unwrap_or_else(|| {
                            TicketRecord::from_payload(&payload)
                        })))
                    },
                    Ok(booking) => Err(booking
                        .message
                        .map_or(CheckoutError::Failed, CheckoutError::Rejected)),
                    Err(error) => Err(error.into()),
                };
                Some(CheckoutAction::CashBooked(result))
            })],
        }
    }
}

impl Reducer for CheckoutReducer {
    type State = CheckoutState;
    type Action = CheckoutAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CheckoutAction::Start {
                selection,
                add_ons,
                settings,
                method,
            } => {
                let generation = state.timer_generation + 1;
                *state = CheckoutState {
                    phase: CheckoutPhase::Editing,
                    selection: Some(selection),
                    add_ons,
                    settings,
                    method,
                    seconds_remaining: env.settings.reservation.as_secs(),
                    timer_generation: generation,
                    ..CheckoutState::default()
                };
                tracing::debug!(seconds = state.seconds_remaining, "Reservation countdown started");
                smallvec![Effect::after(TICK, CheckoutAction::Tick { generation })]
            },

            CheckoutAction::Tick { generation } => {
                let counting = matches!(
                    state.phase,
                    CheckoutPhase::Editing | CheckoutPhase::Submitting
                );
                if generation != state.timer_generation || !counting || state.seconds_remaining == 0 {
                    return SmallVec::new();
                }
                state.seconds_remaining -= 1;
                if state.seconds_remaining == 0 {
                    tracing::info!("Reservation countdown expired");
                    return SmallVec::new();
                }
                smallvec![Effect::after(TICK, CheckoutAction::Tick { generation })]
            },

            CheckoutAction::SetField(field, value) => {
                *state.form.field_mut(field) = value;
                SmallVec::new()
            },

            CheckoutAction::SetTerm { index, accepted } => {
                if let Some(term) = state.terms_accepted.get_mut(index) {
                    *term = accepted;
                }
                SmallVec::new()
            },

            CheckoutAction::ApplyVoucher => {
                let amount = state.breakdown().total_before_voucher;
                reduce_child(
                    &VoucherReducer,
                    &mut state.voucher,
                    VoucherAction::Apply { amount },
                    env,
                    CheckoutAction::Voucher,
                )
            },

            CheckoutAction::Voucher(action) => reduce_child(
                &VoucherReducer,
                &mut state.voucher,
                action,
                env,
                CheckoutAction::Voucher,
            ),

            CheckoutAction::Submit => Self::submit(state, env),

            CheckoutAction::SessionCreated(result) => {
                if state.phase != CheckoutPhase::Submitting {
                    return SmallVec::new();
                }
                match result {
                    Ok(redirect) => {
                        tracing::info!(session_id = %redirect.session_id, "Payment session created");
                        state.phase = CheckoutPhase::Redirect(redirect);
                    },
                    Err(error) => {
                        tracing::error!(%error, "Payment session creation failed");
                        state.phase = CheckoutPhase::Editing;
                        state.last_error = Some(error);
                    },
                }
                SmallVec::new()
            },

            CheckoutAction::CashBooked(result) => {
                if state.phase != CheckoutPhase::Submitting {
                    return SmallVec::new();
                }
                match result {
                    Ok(ticket) => {
                        tracing::info!(ticket_id = %ticket.ticket_id, "Cash booking confirmed");
                        state.phase = CheckoutPhase::Confirmed(ticket);
                    },
                    Err(error) => {
                        tracing::error!(%error, "Cash booking failed");
                        state.phase = CheckoutPhase::Editing;
                        state.last_error = Some(error);
                    },
                }
                SmallVec::new()
            },

            CheckoutAction::Close => {
                state.phase = CheckoutPhase::Closed;
                state.timer_generation += 1;
                SmallVec::new()
            },
        }
    }
}
