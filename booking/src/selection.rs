//! Date, time slot, ticket count and bundle selection.
//!
//! The accumulator loads settings and bundles once, fetches the slots of the
//! chosen date, and derives a [`Selection`] whenever a slot is chosen and the
//! settings are known. A new selection is announced to the parent with
//! [`SelectionAction::Changed`] only when its timestamp, ticket count or
//! bundle presence differs from the previous announcement.

use chrono::NaiveDate;
use ticketdesk_api::types::format_date;
use ticketdesk_api::{ApiError, Bundle, CheckoutPayload, Money, Settings, TimeSlot};
use ticketdesk_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

use crate::environment::BookingEnvironment;

/// What decrementing a ticket counter at zero does
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecrementFloor {
    /// Stays at zero
    #[default]
    Zero,
    /// Jumps back to one (storefront calendar counter)
    ResetToOne,
}

impl DecrementFloor {
    /// Apply one decrement to `count`
    #[must_use]
    pub const fn decrement(self, count: u32) -> u32 {
        match (count, self) {
            (0, Self::Zero) => 0,
            (0, Self::ResetToOne) => 1,
            (n, _) => n - 1,
        }
    }
}

/// A priced choice of slot, ticket count and bundle
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    /// Day (`YYYY-MM-DD`)
    pub date: String,
    /// Slot start (`HH:MM`)
    pub start_time: String,
    /// Slot end (`HH:MM`)
    pub end_time: String,
    /// Slot start in epoch milliseconds
    pub timestamp: i64,
    /// Regular tickets
    pub tickets: u32,
    /// Chosen bundle
    pub bundle: Option<Bundle>,
    /// Tickets plus bundle net
    pub amount: Money,
    /// Tickets only
    pub total_base_amount: Money,
}

impl Selection {
    /// Price `tickets` for `slot` with an optional bundle
    #[must_use]
    pub fn price(slot: &TimeSlot, settings: &Settings, tickets: u32, bundle: Option<&Bundle>) -> Self {
        let total_base_amount = settings.ticket_price.times(tickets);
        let bundle_net = bundle.map_or(Money::ZERO, Bundle::net_price);
        Self {
            date: slot.date.clone(),
            start_time: slot.start_time.clone(),
            end_time: slot.end_time.clone(),
            timestamp: slot
                .starts_at()
                .map_or(0, |start| start.and_utc().timestamp_millis()),
            tickets,
            bundle: bundle.cloned(),
            amount: total_base_amount + bundle_net,
            total_base_amount,
        }
    }

    /// Whether a bundle is part of the selection
    #[must_use]
    pub const fn bundle_selected(&self) -> bool {
        self.bundle.is_some()
    }

    /// The fields compared before announcing a new selection
    #[must_use]
    pub const fn key(&self) -> SelectionKey {
        SelectionKey {
            timestamp: self.timestamp,
            tickets: self.tickets,
            bundle_selected: self.bundle_selected(),
        }
    }

    /// Copy slot, ticket and bundle fields into a payload
    pub fn fill(&self, payload: &mut CheckoutPayload) {
        payload.date.clone_from(&self.date);
        payload.start_time.clone_from(&self.start_time);
        payload.end_time.clone_from(&self.end_time);
        payload.timestamp = Some(self.timestamp);
        payload.tickets = self.tickets;
        payload.amount = self.amount;
        payload.total_base_amount = self.total_base_amount;
        payload.bundle_selected = self.bundle_selected();
        payload.selected_bundle.clone_from(&self.bundle);
    }
}

/// Identity of a selection for deduplication
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionKey {
    /// Slot start in epoch milliseconds
    pub timestamp: i64,
    /// Regular tickets
    pub tickets: u32,
    /// Bundle present
    pub bundle_selected: bool,
}

/// Selection accumulator state
#[derive(Clone, Debug, Default)]
pub struct SelectionState {
    /// Venue settings, once loaded
    pub settings: Option<Settings>,
    /// Bundles on sale
    pub bundles: Vec<Bundle>,
    /// Chosen day
    pub date: Option<NaiveDate>,
    /// Slots of the chosen day
    pub slots: Vec<TimeSlot>,
    /// Start time of the chosen slot
    pub start_time: Option<String>,
    /// Regular tickets
    pub tickets: u32,
    /// Chosen bundle
    pub bundle: Option<Bundle>,
    /// Decrement behaviour of the ticket counter
    pub floor: DecrementFloor,
    /// Latest derived selection
    pub current: Option<Selection>,
    /// Last announced selection key
    pub last_emitted: Option<SelectionKey>,
    /// Sequence number of the latest slot request
    pub slots_request: u64,
    /// Last load failure
    pub last_error: Option<String>,
}

impl SelectionState {
    /// Empty state with the given counter floor
    #[must_use]
    pub fn with_floor(floor: DecrementFloor) -> Self {
        Self {
            floor,
            ..Self::default()
        }
    }

    /// The chosen slot, resolved by start time among the loaded slots
    #[must_use]
    pub fn selected_slot(&self) -> Option<&TimeSlot> {
        let start = self.start_time.as_deref()?;
        self.slots.iter().find(|slot| slot.start_time == start)
    }

    /// Clear counters and choices, keeping loaded settings, bundles and slots
    pub fn reset_choices(&mut self) {
        self.start_time = None;
        self.tickets = 0;
        self.bundle = None;
        self.current = None;
        self.last_emitted = None;
    }
}

/// Selection accumulator actions
#[derive(Clone, Debug)]
pub enum SelectionAction {
    /// Fetch settings and bundles
    Load,
    /// Settings response
    SettingsLoaded(Result<Option<Settings>, ApiError>),
    /// Bundles response
    BundlesLoaded(Result<Vec<Bundle>, ApiError>),
    /// Choose a day and fetch its slots
    SelectDate(NaiveDate),
    /// Slots response for request `request`
    SlotsLoaded {
        /// Sequence number of the request
        request: u64,
        /// Requested day
        date: NaiveDate,
        /// Slots or failure
        result: Result<Vec<TimeSlot>, ApiError>,
    },
    /// Choose a slot by start time
    SelectSlot {
        /// `HH:MM`
        start_time: String,
    },
    /// One more ticket
    IncrementTickets,
    /// One ticket less
    DecrementTickets,
    /// Choose a bundle by id
    SelectBundle {
        /// Bundle `_id`
        id: String,
    },
    /// Remove the bundle
    ClearBundle,
    /// A new selection for the parent (no effect on this reducer)
    Changed(Selection),
}

/// Reducer for the selection accumulator
#[derive(Clone, Copy, Debug, Default)]
pub struct SelectionReducer;

impl SelectionReducer {
    fn announce(state: &mut SelectionState) -> SmallVec<[Effect<SelectionAction>; 4]> {
        state.current = match (state.selected_slot(), state.settings.as_ref()) {
            (Some(slot), Some(settings)) => Some(Selection::price(
                slot,
                settings,
                state.tickets,
                state.bundle.as_ref(),
            )),
            _ => None,
        };

        let Some(selection) = state.current.clone() else {
            return SmallVec::new();
        };
        let key = selection.key();
        if state.last_emitted == Some(key) {
            return SmallVec::new();
        }

        tracing::debug!(
            timestamp = key.timestamp,
            tickets = key.tickets,
            bundle = key.bundle_selected,
            "Selection changed"
        );
        state.last_emitted = Some(key);
        smallvec![Effect::task(async move { Some(SelectionAction::Changed(selection)) })]
    }
}

impl Reducer for SelectionReducer {
    type State = SelectionState;
    type Action = SelectionAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            SelectionAction::Load => {
                let settings_api = env.api.clone();
                let bundles_api = env.api.clone();
                smallvec![
                    Effect::task(async move {
                        Some(SelectionAction::SettingsLoaded(settings_api.settings().await))
                    }),
                    Effect::task(async move {
                        Some(SelectionAction::BundlesLoaded(bundles_api.bundles().await))
                    }),
                ]
            },

            SelectionAction::SettingsLoaded(result) => {
                match result {
                    Ok(settings) => state.settings = settings,
                    Err(error) => {
                        tracing::warn!(%error, "Failed to fetch settings");
                        state.last_error = Some(error.user_message("Failed to load settings"));
                    },
                }
                Self::announce(state)
            },

            SelectionAction::BundlesLoaded(result) => {
                match result {
                    Ok(bundles) => state.bundles = bundles,
                    Err(error) => tracing::warn!(%error, "Failed to fetch bundles"),
                }
                SmallVec::new()
            },

            SelectionAction::SelectDate(date) => {
                state.date = Some(date);
                state.slots.clear();
                state.current = None;
                state.slots_request += 1;

                let request = state.slots_request;
                let api = env.api.clone();
                smallvec![Effect::task(async move {
                    let day = format_date(date);
                    let result = api.slots(&day).await;
                    Some(SelectionAction::SlotsLoaded { request, date, result })
                })]
            },

            SelectionAction::SlotsLoaded { request, date, result } => {
                if request != state.slots_request {
                    tracing::debug!(request, latest = state.slots_request, "Dropping stale slots");
                    return SmallVec::new();
                }
                match result {
                    Ok(slots) => {
                        state.slots = slots.into_iter().filter(|slot| slot.is_on(date)).collect();
                    },
                    Err(error) => {
                        tracing::warn!(%error, %date, "Failed to fetch time slots");
                        state.slots.clear();
                    },
                }
                Self::announce(state)
            },

            SelectionAction::SelectSlot { start_time } => {
                state.start_time = Some(start_time);
                Self::announce(state)
            },

            SelectionAction::IncrementTickets => {
                state.tickets = state.tickets.saturating_add(1);
                Self::announce(state)
            },

            SelectionAction::DecrementTickets => {
                state.tickets = state.floor.decrement(state.tickets);
                Self::announce(state)
            },

            SelectionAction::SelectBundle { id } => {
                let Some(bundle) = state
                    .bundles
                    .iter()
                    .find(|bundle| bundle.id.as_deref() == Some(id.as_str()))
                else {
                    tracing::warn!(bundle_id = %id, "Unknown bundle");
                    return SmallVec::new();
                };
                state.bundle = Some(bundle.clone());
                Self::announce(state)
            },

            SelectionAction::ClearBundle => {
                state.bundle = None;
                Self::announce(state)
            },

            SelectionAction::Changed(_) => SmallVec::new(),
        }
    }
}
