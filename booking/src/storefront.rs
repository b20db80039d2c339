//! Public booking wizard.
//!
//! Landing, then date/slot/tickets, then add-ons, then customer details and
//! the hosted card checkout. The return from the hosted page lands back here
//! with the session id, after which the ticket is fetched, rendered and
//! emailed. A confirmed ticket can be followed by a cancellation request.

use ticketdesk_api::types::CancelRequestInput;
use ticketdesk_api::{PaymentMethod, TicketRecord};
use ticketdesk_core::{SmallVec, composition::reduce_child, effect::Effect, reducer::Reducer, smallvec};

use crate::addons::{AddOnAction, AddOnReducer, AddOnState};
use crate::checkout::{CheckoutAction, CheckoutPhase, CheckoutReducer, CheckoutState};
use crate::document::{DispatchReport, DocumentError, TicketSource};
use crate::environment::BookingEnvironment;
use crate::payment_return::{self, PaymentReturnError, ReturnParams};
use crate::selection::{DecrementFloor, Selection, SelectionAction, SelectionReducer, SelectionState};

/// Reason sent with customer cancellation requests
pub const CANCELLATION_REASON: &str = "User requested cancellation";

/// Which screen the wizard shows
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StorefrontStage {
    /// Venue card with the buy button
    #[default]
    Landing,
    /// Calendar, slots and counters
    Choosing,
    /// Add-on picker
    AddOns,
    /// Customer details and countdown
    Checkout,
    /// Leaving for the hosted checkout page
    Redirecting {
        /// Hosted checkout page
        checkout_url: String,
    },
    /// Waiting for the ticket after the payment redirect
    AwaitingTicket,
    /// Ticket shown
    Confirmed,
    /// Cancellation request form
    Cancelling,
}

/// Progress of a customer cancellation request
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CancellationState {
    /// Ticket the request is for
    pub ticket_id: Option<String>,
    /// Email of the booking
    pub email: Option<String>,
    /// Request in flight
    pub submitting: bool,
    /// The server accepted the request
    pub sent: bool,
    /// Last failure
    pub error: Option<String>,
}

/// Storefront state
#[derive(Clone, Debug)]
pub struct StorefrontState {
    /// Current screen
    pub stage: StorefrontStage,
    /// Calendar and counters
    pub selection: SelectionState,
    /// Latest announced selection; checkout reads the live one in `selection`
    pub chosen: Option<Selection>,
    /// Add-on picker
    pub add_ons: AddOnState,
    /// Checkout form
    pub checkout: CheckoutState,
    /// Ticket after a completed payment
    pub confirmed: Option<Box<TicketRecord>>,
    /// Outcome of rendering and emailing the ticket
    pub dispatch: Option<Result<DispatchReport, DocumentError>>,
    /// Ticket fetch failure after the redirect
    pub return_error: Option<PaymentReturnError>,
    /// Cancellation request form
    pub cancellation: CancellationState,
}

impl Default for StorefrontState {
    fn default() -> Self {
        Self {
            stage: StorefrontStage::Landing,
            selection: SelectionState::with_floor(DecrementFloor::ResetToOne),
            chosen: None,
            add_ons: AddOnState::default(),
            checkout: CheckoutState::default(),
            confirmed: None,
            dispatch: None,
            return_error: None,
            cancellation: CancellationState::default(),
        }
    }
}

/// Storefront actions
#[derive(Clone, Debug)]
pub enum StorefrontAction {
    /// Leave the landing card and load prices
    BuyTicket,
    /// Calendar action
    Selection(SelectionAction),
    /// Open the add-on picker for the current selection
    ProceedToPayment,
    /// Add-on picker action
    AddOns(AddOnAction),
    /// Checkout form action
    Checkout(CheckoutAction),
    /// The page was opened with a query string
    Returned {
        /// Raw query string
        query: String,
    },
    /// Ticket fetch after the payment redirect finished
    TicketFetched(Result<Box<TicketRecord>, PaymentReturnError>),
    /// Rendering and emailing finished
    TicketDispatched(Result<DispatchReport, DocumentError>),
    /// Show the cancellation form for the confirmed ticket
    OpenCancellation,
    /// Send the cancellation request
    SubmitCancellation,
    /// Cancellation response
    CancellationSent(Result<(), String>),
    /// Back to the landing card with everything cleared
    ReturnToHome,
}

/// Reducer for the storefront wizard
#[derive(Clone, Copy, Debug, Default)]
pub struct StorefrontReducer;

impl StorefrontReducer {
    fn open_checkout(state: &mut StorefrontState, env: &BookingEnvironment) -> SmallVec<[Effect<StorefrontAction>; 4]> {
        let (Some(selection), Some(add_ons), Some(settings)) = (
            state.selection.current.clone(),
            state.add_ons.confirmed.clone(),
            state.selection.settings.clone(),
        ) else {
            return SmallVec::new();
        };
        state.stage = StorefrontStage::Checkout;
        reduce_child(
            &CheckoutReducer,
            &mut state.checkout,
            CheckoutAction::Start {
                selection,
                add_ons,
                settings,
                method: PaymentMethod::Card,
            },
            env,
            StorefrontAction::Checkout,
        )
    }

    fn after_checkout(state: &mut StorefrontState) {
        match &state.checkout.phase {
            CheckoutPhase::Redirect(redirect) => {
                state.stage = StorefrontStage::Redirecting {
                    checkout_url: redirect.checkout_url.clone(),
                };
            },
            CheckoutPhase::Closed if state.stage == StorefrontStage::Checkout => {
                state.stage = StorefrontStage::Choosing;
            },
            _ => {},
        }
        if state.checkout.restart_required {
            tracing::info!("Reservation expired, restarting the booking");
            let settings = state.selection.settings.clone();
            let bundles = std::mem::take(&mut state.selection.bundles);
            *state = StorefrontState {
                stage: StorefrontStage::Choosing,
                ..StorefrontState::default()
            };
            state.selection.settings = settings;
            state.selection.bundles = bundles;
        }
    }

    fn returned(state: &mut StorefrontState, query: &str, env: &BookingEnvironment) -> SmallVec<[Effect<StorefrontAction>; 4]> {
        let params = ReturnParams::parse(query);

        if params.cancel {
            state.stage = StorefrontStage::Cancelling;
            state.cancellation = CancellationState {
                ticket_id: params.ticket_id,
                ..CancellationState::default()
            };
            return SmallVec::new();
        }

        let Some(session_id) = params.successful_session().map(str::to_string) else {
            return SmallVec::new();
        };
        if state.confirmed.is_some() {
            return SmallVec::new();
        }

        state.stage = StorefrontStage::AwaitingTicket;
        state.return_error = None;
        let verify_api = env.api.clone();
        let verify_id = session_id.clone();
        let fetch_api = env.api.clone();
        let policy = env.settings.session_retry.clone();

        smallvec![
            Effect::task(async move {
                payment_return::verify_payment(verify_api.as_ref(), &verify_id).await;
                None
            }),
            Effect::task(async move {
                let result = payment_return::fetch_ticket_with_retry(fetch_api.as_ref(), &session_id, &policy)
                    .await
                    .map(Box::new);
                Some(StorefrontAction::TicketFetched(result))
            }),
        ]
    }
}

impl Reducer for StorefrontReducer {
    type State = StorefrontState;
    type Action = StorefrontAction;
    type Environment = BookingEnvironment;

    #[allow(clippy::too_many_lines)] // one arm per screen transition
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            StorefrontAction::BuyTicket => {
                state.stage = StorefrontStage::Choosing;
                reduce_child(
                    &SelectionReducer,
                    &mut state.selection,
                    SelectionAction::Load,
                    env,
                    StorefrontAction::Selection,
                )
            },

            StorefrontAction::Selection(action) => {
                if let SelectionAction::Changed(selection) = &action {
                    state.chosen = Some(selection.clone());
                }
                reduce_child(
                    &SelectionReducer,
                    &mut state.selection,
                    action,
                    env,
                    StorefrontAction::Selection,
                )
            },

            StorefrontAction::ProceedToPayment => {
                let (Some(selection), Some(settings)) = (&state.selection.current, &state.selection.settings) else {
                    tracing::debug!("Nothing selected yet");
                    return SmallVec::new();
                };
                let open = AddOnAction::Open {
                    ticket_count: selection.tickets.max(1),
                    socks_price: settings.socks_price,
                    cancellation_fee: settings.cancellation_fee,
                };
                state.stage = StorefrontStage::AddOns;
                reduce_child(&AddOnReducer, &mut state.add_ons, open, env, StorefrontAction::AddOns)
            },

            StorefrontAction::AddOns(action) => {
                let continuing = action == AddOnAction::Continue;
                let cancelling = action == AddOnAction::Cancel;
                let mut effects =
                    reduce_child(&AddOnReducer, &mut state.add_ons, action, env, StorefrontAction::AddOns);
                if continuing {
                    effects.extend(Self::open_checkout(state, env));
                } else if cancelling {
                    state.stage = StorefrontStage::Choosing;
                }
                effects
            },

            StorefrontAction::Checkout(action) => {
                let effects = reduce_child(
                    &CheckoutReducer,
                    &mut state.checkout,
                    action,
                    env,
                    StorefrontAction::Checkout,
                );
                Self::after_checkout(state);
                effects
            },

            StorefrontAction::Returned { query } => Self::returned(state, &query, env),

            StorefrontAction::TicketFetched(result) => match result {
                Ok(ticket) => {
                    state.stage = StorefrontStage::Confirmed;
                    state.confirmed = Some(ticket.clone());
                    let tickets = env.tickets.clone();
                    smallvec![Effect::task(async move {
                        let result = tickets.dispatch(&ticket, TicketSource::Regular, false).await;
                        Some(StorefrontAction::TicketDispatched(result))
                    })]
                },
                Err(error) => {
                    tracing::error!(%error, "Ticket not retrieved after payment");
                    state.stage = StorefrontStage::Landing;
                    state.return_error = Some(error);
                    SmallVec::new()
                },
            },

            StorefrontAction::TicketDispatched(result) => {
                if let Err(error) = &result {
                    tracing::warn!(%error, "Ticket document not delivered");
                }
                state.dispatch = Some(result);
                SmallVec::new()
            },

            StorefrontAction::OpenCancellation => {
                let Some(ticket) = &state.confirmed else {
                    return SmallVec::new();
                };
                state.cancellation = CancellationState {
                    ticket_id: Some(ticket.ticket_id.clone()),
                    email: Some(ticket.email.clone()),
                    ..CancellationState::default()
                };
                state.stage = StorefrontStage::Cancelling;
                SmallVec::new()
            },

            StorefrontAction::SubmitCancellation => {
                let cancellation = &mut state.cancellation;
                if cancellation.submitting || cancellation.sent {
                    return SmallVec::new();
                }
                let Some(ticket_id) = cancellation.ticket_id.clone() else {
                    cancellation.error = Some("No ticket to cancel".to_string());
                    return SmallVec::new();
                };
                cancellation.submitting = true;
                cancellation.error = None;

                let input = CancelRequestInput {
                    ticket_id,
                    email: cancellation.email.clone().unwrap_or_default(),
                    reason: CANCELLATION_REASON.to_string(),
                };
                let api = env.api.clone();
                smallvec![Effect::task(async move {
                    let result = api.request_cancellation(&input).await.map(|_| ()).map_err(|error| {
                        tracing::error!(ticket_id = %input.ticket_id, %error, "Cancel request failed");
                        error.user_message("Cancel request failed. Please try again.")
                    });
                    Some(StorefrontAction::CancellationSent(result))
                })]
            },

            StorefrontAction::CancellationSent(result) => {
                state.cancellation.submitting = false;
                match result {
                    Ok(()) => {
                        tracing::info!(ticket_id = ?state.cancellation.ticket_id, "Cancel request sent");
                        state.cancellation.sent = true;
                    },
                    Err(message) => state.cancellation.error = Some(message),
                }
                SmallVec::new()
            },

            StorefrontAction::ReturnToHome => {
                *state = StorefrontState::default();
                SmallVec::new()
            },
        }
    }
}
