//! Discount code validation.
//!
//! The server decides eligibility and computes the discount. The client
//! only checks that a code was typed, upper-cases it, and keeps at most one
//! result: applying another code or removing the current one discards the
//! previous result before anything else happens.

use thiserror::Error;
use ticketdesk_api::types::VoucherValidationRequest;
use ticketdesk_api::{ApiError, AppliedVoucher, BookingApi, Money, VoucherValidation};
use ticketdesk_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

use crate::environment::BookingEnvironment;

/// Why a code was not applied
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VoucherError {
    /// Nothing was typed
    #[error("Please enter a coupon code")]
    EmptyCode,

    /// The server refused the code
    #[error("{0}")]
    Rejected(String),

    /// Network failure, timeout or an answer without a message
    #[error("Failed to validate voucher")]
    Unavailable,
}

impl From<ApiError> for VoucherError {
    fn from(error: ApiError) -> Self {
        match error.server_message() {
            Some(message) => Self::Rejected(message.to_string()),
            None => Self::Unavailable,
        }
    }
}

/// Validate `code` against the pre-discount `amount`
///
/// # Errors
///
/// Returns [`VoucherError::EmptyCode`] without calling the API when `code`
/// is blank, otherwise the server's verdict.
pub async fn validate(
    api: &dyn BookingApi,
    code: &str,
    amount: Money,
) -> Result<VoucherValidation, VoucherError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(VoucherError::EmptyCode);
    }
    let request = VoucherValidationRequest {
        code: code.to_uppercase(),
        amount,
    };
    match api.validate_voucher(&request).await {
        Ok(validation) => {
            tracing::info!(code = %request.code, discount = %validation.discount_amount, "Voucher applied");
            Ok(validation)
        },
        Err(error) => {
            tracing::warn!(code = %request.code, %error, "Voucher validation failed");
            Err(error.into())
        },
    }
}

/// A validation in flight
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingVoucher {
    /// Sequence number
    pub request: u64,
    /// Code as typed
    pub code: String,
}

/// Voucher field state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VoucherState {
    /// Text in the code field
    pub code_input: String,
    /// Validation in flight
    pub pending: Option<PendingVoucher>,
    /// Accepted voucher
    pub applied: Option<VoucherValidation>,
    /// Last failure
    pub error: Option<VoucherError>,
    next_request: u64,
}

impl VoucherState {
    /// The `voucherData` block of a checkout payload
    #[must_use]
    pub fn applied_voucher(&self) -> Option<AppliedVoucher> {
        self.applied.as_ref().map(AppliedVoucher::from)
    }

    /// Discount of the applied voucher
    #[must_use]
    pub fn discount(&self) -> Money {
        self.applied
            .as_ref()
            .map_or(Money::ZERO, |validation| validation.discount_amount)
    }

    /// Whether a validation is in flight
    #[must_use]
    pub const fn is_validating(&self) -> bool {
        self.pending.is_some()
    }
}

/// Voucher field actions
#[derive(Clone, Debug, PartialEq)]
pub enum VoucherAction {
    /// The code field was edited; an empty field clears the voucher
    CodeChanged(String),
    /// Validate the typed code against `amount`
    Apply {
        /// Pre-discount total
        amount: Money,
    },
    /// Validation response
    Validated {
        /// Sequence number of the request
        request: u64,
        /// Verdict
        result: Result<VoucherValidation, VoucherError>,
    },
    /// Drop the applied voucher and clear the field
    Remove,
}

/// Reducer for the voucher field
#[derive(Clone, Copy, Debug, Default)]
pub struct VoucherReducer;

impl Reducer for VoucherReducer {
    type State = VoucherState;
    type Action = VoucherAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            VoucherAction::CodeChanged(code) => {
                if code.trim().is_empty() {
                    state.applied = None;
                    state.error = None;
                    state.pending = None;
                }
                state.code_input = code;
                SmallVec::new()
            },

            VoucherAction::Apply { amount } => {
                state.applied = None;
                state.error = None;

                if state.code_input.trim().is_empty() {
                    state.pending = None;
                    state.error = Some(VoucherError::EmptyCode);
                    return SmallVec::new();
                }

                state.next_request += 1;
                let request = state.next_request;
                let code = state.code_input.clone();
                state.pending = Some(PendingVoucher {
                    request,
                    code: code.clone(),
                });

                let api = env.api.clone();
                smallvec![Effect::task(async move {
                    let result = validate(api.as_ref(), &code, amount).await;
                    Some(VoucherAction::Validated { request, result })
                })]
            },

            VoucherAction::Validated { request, result } => {
                if state.pending.as_ref().map(|p| p.request) != Some(request) {
                    tracing::debug!(request, "Dropping stale voucher response");
                    return SmallVec::new();
                }
                state.pending = None;
                match result {
                    Ok(validation) => state.applied = Some(validation),
                    Err(error) => state.error = Some(error),
                }
                SmallVec::new()
            },

            VoucherAction::Remove => {
                state.applied = None;
                state.error = None;
                state.pending = None;
                state.code_input.clear();
                SmallVec::new()
            },
        }
    }
}
