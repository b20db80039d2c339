//! Landing after the hosted checkout page redirects back.
//!
//! The payment webhook may not have been processed yet when the customer
//! lands, so the storefront polls the session result a bounded number of
//! times. This is the only automatic retry in the client.

use thiserror::Error;
use ticketdesk_api::{ApiError, BookingApi, TicketRecord};
use ticketdesk_runtime::retry::{RetryPolicy, retry_with_backoff};

/// Why no ticket could be shown
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaymentReturnError {
    /// The return URL carries no session id
    #[error("Your session has expired. Please start your booking again.")]
    SessionExpired,

    /// Polling gave up
    #[error("Ticket not available after multiple retries.")]
    TicketUnavailable,

    /// The server answered without a ticket
    #[error("{0}")]
    NotRetrieved(String),

    /// Network failure on a single fetch
    #[error("Failed to fetch ticket details.")]
    FetchFailed,
}

/// Query parameters of a return URL
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReturnParams {
    /// `session` (`success` after a completed payment)
    pub session: Option<String>,
    /// `sessionId`
    pub session_id: Option<String>,
    /// `cancel=true` opens the cancellation form
    pub cancel: bool,
    /// `ticketId` for the cancellation form
    pub ticket_id: Option<String>,
}

impl ReturnParams {
    /// Parse a query string, with or without the leading `?`
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let mut params = Self::default();
        let query = query.split_once('?').map_or(query, |(_, q)| q);

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(&value.replace('+', " "))
                .map(std::borrow::Cow::into_owned)
                .unwrap_or_else(|_| value.to_string());
            match key {
                "session" => params.session = Some(value),
                "sessionId" if !value.is_empty() => params.session_id = Some(value),
                "cancel" => params.cancel = value == "true",
                "ticketId" if !value.is_empty() => params.ticket_id = Some(value),
                _ => {},
            }
        }
        params
    }

    /// A completed payment with a session to look up
    #[must_use]
    pub fn successful_session(&self) -> Option<&str> {
        match (self.session.as_deref(), self.session_id.as_deref()) {
            (Some("success"), Some(id)) => Some(id),
            _ => None,
        }
    }
}

/// Poll the session result until it carries a ticket
///
/// # Errors
///
/// Returns [`PaymentReturnError::SessionExpired`] without a request when
/// `session_id` is blank, and [`PaymentReturnError::TicketUnavailable`] once
/// the policy's attempts are used up.
pub async fn fetch_ticket_with_retry(
    api: &dyn BookingApi,
    session_id: &str,
    policy: &RetryPolicy,
) -> Result<TicketRecord, PaymentReturnError> {
    if session_id.trim().is_empty() {
        return Err(PaymentReturnError::SessionExpired);
    }

    let ticket = retry_with_backoff(policy, move || async move {
        let result = api.session_result(session_id).await?;
        result.ticket.ok_or_else(|| ApiError::Unsuccessful {
            message: result
                .message
                .unwrap_or_else(|| "Ticket not ready yet".to_string()),
        })
    })
    .await
    .map_err(|error| {
        tracing::error!(%session_id, %error, "Ticket not available after retries");
        PaymentReturnError::TicketUnavailable
    })?;

    tracing::info!(%session_id, ticket_id = %ticket.ticket_id, "Ticket retrieved");
    Ok(ticket)
}

/// Fetch the session result once (walk-in return page)
///
/// # Errors
///
/// Returns [`PaymentReturnError::SessionExpired`] for a blank id,
/// [`PaymentReturnError::NotRetrieved`] when the server has no ticket, and
/// [`PaymentReturnError::FetchFailed`] on network failures.
pub async fn fetch_ticket_once(
    api: &dyn BookingApi,
    session_id: &str,
) -> Result<TicketRecord, PaymentReturnError> {
    if session_id.trim().is_empty() {
        return Err(PaymentReturnError::SessionExpired);
    }
    match api.session_result(session_id).await {
        Ok(result) => match result.ticket {
            Some(ticket) if result.success => Ok(ticket),
            _ => Err(PaymentReturnError::NotRetrieved(
                result
                    .message
                    .unwrap_or_else(|| "Ticket could not be retrieved.".to_string()),
            )),
        },
        Err(error) => {
            tracing::error!(%session_id, %error, "Error fetching ticket");
            Err(PaymentReturnError::FetchFailed)
        },
    }
}

/// Ask the server to reconcile the session; the outcome is only logged
pub async fn verify_payment(api: &dyn BookingApi, session_id: &str) {
    match api.verify_payment(session_id).await {
        Ok(()) => tracing::info!(%session_id, "Payment verified"),
        Err(error) => tracing::warn!(%session_id, %error, "Payment verification failed or incomplete"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_success_return() {
        let params = ReturnParams::parse("?session=success&sessionId=cs_test%5F42");
        assert_eq!(params.successful_session(), Some("cs_test_42"));
        assert!(!params.cancel);
    }

    #[test]
    fn cancelled_return_has_no_session() {
        let params = ReturnParams::parse("session=cancelled&sessionId=cs_1");
        assert_eq!(params.successful_session(), None);
    }

    #[test]
    fn cancel_request_link() {
        let params = ReturnParams::parse("/ticket-booking?cancel=true&ticketId=TKT-9");
        assert!(params.cancel);
        assert_eq!(params.ticket_id.as_deref(), Some("TKT-9"));
    }

    #[test]
    fn missing_id_is_not_a_session() {
        let params = ReturnParams::parse("session=success&sessionId=");
        assert_eq!(params.successful_session(), None);
    }
}
