//! Ticket email delivery.
//!
//! The server renders and mails the ticket asynchronously and frequently
//! completes even when the client sees a timeout, a dropped connection or a
//! 5xx. Those outcomes
//! are reported as [`DeliveryOutcome::PresumedDelayed`] with the same
//! customer message as a confirmed delivery. Only other failures surface as
//! [`DeliveryOutcome::Failed`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use thiserror::Error;
use ticketdesk_api::types::{Acknowledgement, TicketEmail};
use ticketdesk_api::{ApiError, BookingApi};

/// A delivery failure the customer should not be told was a success
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The server refused the request
    #[error("Email rejected (status {status}): {message}")]
    Rejected {
        /// HTTP status
        status: u16,
        /// Server message
        message: String,
    },

    /// No answer, or an answer that could not be read
    #[error("Email request failed: {0}")]
    Unexpected(String),
}

/// Why a delivery is only presumed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelayReason {
    /// The server answered `success: false`
    Unconfirmed,
    /// The request timed out
    Timeout,
    /// The server answered 5xx
    ServerBusy,
    /// The connection failed before an answer arrived
    Network,
}

/// Classified result of the email call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The server confirmed the email
    Confirmed,
    /// The email will most likely arrive later
    PresumedDelayed(DelayReason),
    /// The email was not sent
    Failed(DeliveryError),
}

/// Outcome plus what to tell the customer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Classified result
    pub outcome: DeliveryOutcome,
    /// Customer message, absent for failures
    pub message: Option<String>,
}

impl DeliveryReport {
    /// Whether the customer is told the ticket was emailed
    #[must_use]
    pub const fn reported_as_sent(&self) -> bool {
        !matches!(self.outcome, DeliveryOutcome::Failed(_))
    }
}

fn emailed_message(email: &str) -> String {
    format!("Ticket emailed to: {email}\n\nPlease check your email (including spam folder).")
}

/// Classify the answer of `POST /api/tickets/send-email`
#[must_use]
pub fn classify(email: &str, result: Result<Acknowledgement, ApiError>) -> DeliveryReport {
    let (outcome, note) = match result {
        Ok(ack) if ack.success => (DeliveryOutcome::Confirmed, None),
        Ok(ack) => {
            tracing::warn!(message = ?ack.message, "Email response indicates failure");
            (DeliveryOutcome::PresumedDelayed(DelayReason::Unconfirmed), None)
        },
        Err(ApiError::Timeout) => (
            DeliveryOutcome::PresumedDelayed(DelayReason::Timeout),
            Some("Note: Email delivery may take a few minutes."),
        ),
        Err(error) if error.is_transient() => match error.status() {
            Some(_) => (
                DeliveryOutcome::PresumedDelayed(DelayReason::ServerBusy),
                Some("Note: Server was busy, but email should arrive shortly."),
            ),
            None => (
                DeliveryOutcome::PresumedDelayed(DelayReason::Network),
                Some("Note: Email delivery may take a few minutes."),
            ),
        },
        Err(error) => match error.status() {
            Some(status) => (
                DeliveryOutcome::Failed(DeliveryError::Rejected {
                    status,
                    message: error.user_message("no message"),
                }),
                None,
            ),
            None => (
                DeliveryOutcome::Failed(DeliveryError::Unexpected(error.to_string())),
                None,
            ),
        },
    };

    let message = match (&outcome, note) {
        (DeliveryOutcome::Failed(_), _) => None,
        (_, Some(note)) => Some(format!("{}\n\n{note}", emailed_message(email))),
        (_, None) => Some(emailed_message(email)),
    };
    DeliveryReport { outcome, message }
}

/// The JSON body of the email call
#[must_use]
pub fn email_payload(email: &str, ticket_id: &str, pdf: &[u8]) -> TicketEmail {
    TicketEmail {
        email: email.to_string(),
        ticket_id: if ticket_id.is_empty() {
            "ticket".to_string()
        } else {
            ticket_id.to_string()
        },
        pdf_base64: BASE64_STANDARD.encode(pdf),
    }
}

/// Send the ticket and classify the answer
pub async fn deliver(api: &dyn BookingApi, email: &str, ticket_id: &str, pdf: &[u8]) -> DeliveryReport {
    let payload = email_payload(email, ticket_id, pdf);
    let report = classify(email, api.send_ticket_email(&payload).await);
    match &report.outcome {
        DeliveryOutcome::Confirmed => tracing::info!(ticket_id = %payload.ticket_id, "Ticket emailed"),
        DeliveryOutcome::PresumedDelayed(reason) => {
            tracing::warn!(ticket_id = %payload.ticket_id, ?reason, "Ticket email presumed delayed");
        },
        DeliveryOutcome::Failed(error) => {
            tracing::error!(ticket_id = %payload.ticket_id, %error, "Ticket email failed");
        },
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMAIL: &str = "guest@example.com";

    #[test]
    fn success_is_confirmed() {
        let report = classify(
            EMAIL,
            Ok(Acknowledgement {
                success: true,
                message: None,
            }),
        );
        assert_eq!(report.outcome, DeliveryOutcome::Confirmed);
        assert_eq!(
            report.message.as_deref(),
            Some("Ticket emailed to: guest@example.com\n\nPlease check your email (including spam folder).")
        );
    }

    #[test]
    fn unconfirmed_body_is_presumed_delayed() {
        let report = classify(EMAIL, Ok(Acknowledgement::default()));
        assert_eq!(
            report.outcome,
            DeliveryOutcome::PresumedDelayed(DelayReason::Unconfirmed)
        );
        assert!(report.reported_as_sent());
    }

    #[test]
    fn timeout_adds_note() {
        let report = classify(EMAIL, Err(ApiError::Timeout));
        assert_eq!(report.outcome, DeliveryOutcome::PresumedDelayed(DelayReason::Timeout));
        assert!(
            report
                .message
                .is_some_and(|m| m.ends_with("Note: Email delivery may take a few minutes."))
        );
    }

    #[test]
    fn server_error_is_presumed_delayed() {
        let report = classify(EMAIL, Err(ApiError::Rejected { status: 503, message: None }));
        assert_eq!(
            report.outcome,
            DeliveryOutcome::PresumedDelayed(DelayReason::ServerBusy)
        );
    }

    #[test]
    fn client_error_fails_without_message() {
        let report = classify(
            EMAIL,
            Err(ApiError::Rejected {
                status: 400,
                message: Some("Invalid email".to_string()),
            }),
        );
        assert!(matches!(
            report.outcome,
            DeliveryOutcome::Failed(DeliveryError::Rejected { status: 400, .. })
        ));
        assert_eq!(report.message, None);
        assert!(!report.reported_as_sent());
    }

    #[test]
    fn dropped_connection_is_presumed_delayed() {
        let report = classify(EMAIL, Err(ApiError::RequestFailed("connection reset".to_string())));
        assert_eq!(report.outcome, DeliveryOutcome::PresumedDelayed(DelayReason::Network));
        assert!(report.reported_as_sent());
        assert!(
            report
                .message
                .is_some_and(|m| m.starts_with("Ticket emailed to: guest@example.com"))
        );
    }

    #[test]
    fn unreadable_answer_fails() {
        let report = classify(EMAIL, Err(ApiError::ResponseParseFailed("expected value".to_string())));
        assert!(matches!(
            report.outcome,
            DeliveryOutcome::Failed(DeliveryError::Unexpected(_))
        ));
        assert!(!report.reported_as_sent());
    }

    #[test]
    fn payload_is_base64_with_fallback_id() {
        let payload = email_payload(EMAIL, "", b"%PDF-");
        assert_eq!(payload.ticket_id, "ticket");
        assert_eq!(payload.pdf_base64, "JVBERi0=");
    }
}
