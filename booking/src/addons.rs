//! Socks and cancellation insurance picker.
//!
//! The composer previews the add-on total while the customer edits it.
//! `Continue` freezes the result; the parent reads
//! [`AddOnState::confirmed`] and moves on to checkout.

use ticketdesk_api::Money;
use ticketdesk_core::{SmallVec, effect::Effect, reducer::Reducer};

use crate::environment::BookingEnvironment;
use crate::pricing::AddOnSelection;

/// Add-on composer state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddOnState {
    /// Whether the picker is shown
    pub open: bool,
    /// Tickets the insurance fee is multiplied by
    pub ticket_count: u32,
    /// Unit socks price
    pub socks_price: Money,
    /// Insurance fee per ticket
    pub cancellation_fee_per_ticket: Money,
    /// Pairs of socks
    pub socks_count: u32,
    /// Insurance toggle
    pub cancellation_enabled: bool,
    /// Frozen choice after `Continue`
    pub confirmed: Option<AddOnSelection>,
}

impl AddOnState {
    /// Live preview of the add-on total
    #[must_use]
    pub const fn preview(&self) -> AddOnSelection {
        AddOnSelection::from_prices(
            self.socks_price,
            self.cancellation_fee_per_ticket,
            self.socks_count,
            self.cancellation_enabled,
            self.ticket_count,
        )
    }
}

/// Add-on composer actions
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddOnAction {
    /// Show the picker for `ticket_count` tickets at the given prices
    Open {
        /// Tickets in the order
        ticket_count: u32,
        /// Unit socks price
        socks_price: Money,
        /// Insurance fee per ticket
        cancellation_fee: Money,
    },
    /// One more pair
    IncrementSocks,
    /// One pair less (never below zero)
    DecrementSocks,
    /// Turn insurance on or off
    SetCancellation(bool),
    /// Freeze the current choice
    Continue,
    /// Close without a choice
    Cancel,
}

/// Reducer for the add-on composer
#[derive(Clone, Copy, Debug, Default)]
pub struct AddOnReducer;

impl Reducer for AddOnReducer {
    type State = AddOnState;
    type Action = AddOnAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AddOnAction::Open {
                ticket_count,
                socks_price,
                cancellation_fee,
            } => {
                *state = AddOnState {
                    open: true,
                    ticket_count,
                    socks_price,
                    cancellation_fee_per_ticket: cancellation_fee,
                    ..AddOnState::default()
                };
            },
            AddOnAction::IncrementSocks => state.socks_count = state.socks_count.saturating_add(1),
            AddOnAction::DecrementSocks => state.socks_count = state.socks_count.saturating_sub(1),
            AddOnAction::SetCancellation(enabled) => state.cancellation_enabled = enabled,
            AddOnAction::Continue => {
                let selection = state.preview();
                tracing::debug!(
                    socks = selection.socks_count,
                    cancellation = selection.cancellation_enabled,
                    total = %selection.total_add_on_amount,
                    "Add-ons confirmed"
                );
                state.confirmed = Some(selection);
                state.open = false;
            },
            AddOnAction::Cancel => {
                state.open = false;
                state.confirmed = None;
            },
        }
        SmallVec::new()
    }
}
