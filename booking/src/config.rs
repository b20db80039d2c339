//! Configuration management for the booking client.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Unlike a missing key, a key that is present but unparsable is an error.

use crate::document::DocumentOptions;
use crate::environment::FlowSettings;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use ticketdesk_api::{ApiError, DEFAULT_BASE_URL, Money, VenueClient};
use ticketdesk_runtime::retry::RetryPolicy;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A key is set but its value does not parse
    #[error("Invalid value for {key}: {value:?}")]
    Invalid {
        /// Environment variable name
        key: &'static str,
        /// Raw value
        value: String,
    },
}

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Venue API configuration
    pub api: ApiConfig,
    /// Booking flow configuration
    pub booking: BookingConfig,
    /// Ticket document output configuration
    pub documents: DocumentConfig,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
}

/// Venue API configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Timeout for the ticket email call
    pub email_timeout: Duration,
}

/// Booking flow configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BookingConfig {
    /// Attempts when fetching a ticket after the payment redirect
    pub session_retry_attempts: usize,
    /// Delay between those attempts
    pub session_retry_delay: Duration,
    /// Reservation countdown shown in the checkout form
    pub reservation: Duration,
    /// Placeholder email for cash register bookings
    pub cash_email: String,
    /// Unit price of a half-time ticket
    pub half_time_price: Money,
}

/// Ticket document output configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentConfig {
    /// Where downloaded tickets are written
    pub download_dir: PathBuf,
    /// File name of the downloaded ticket
    pub file_name: String,
    /// Command that spools a file to the receipt printer
    pub print_command: String,
    /// How long a spooled print file is kept
    pub print_cleanup: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric or money key does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric or money key does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            api: ApiConfig {
                base_url: text("TICKETDESK_API_BASE_URL", DEFAULT_BASE_URL)
                    .trim_end_matches('/')
                    .to_string(),
                request_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "TICKETDESK_REQUEST_TIMEOUT_SECS",
                    30,
                )?),
                email_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "TICKETDESK_EMAIL_TIMEOUT_SECS",
                    300,
                )?),
            },
            booking: BookingConfig {
                session_retry_attempts: parse_or(&lookup, "TICKETDESK_SESSION_RETRY_ATTEMPTS", 5)?,
                session_retry_delay: Duration::from_millis(parse_or(
                    &lookup,
                    "TICKETDESK_SESSION_RETRY_DELAY_MS",
                    1000,
                )?),
                reservation: Duration::from_secs(parse_or(
                    &lookup,
                    "TICKETDESK_RESERVATION_SECS",
                    600,
                )?),
                cash_email: text("TICKETDESK_CASH_EMAIL", "megajump08@gmail.com"),
                half_time_price: Money::from_decimal(parse_or(
                    &lookup,
                    "TICKETDESK_HALF_TIME_PRICE",
                    9.0,
                )?),
            },
            documents: DocumentConfig {
                download_dir: PathBuf::from(text("TICKETDESK_DOWNLOAD_DIR", ".")),
                file_name: text("TICKETDESK_TICKET_FILE_NAME", "MegaJump_Ticket.pdf"),
                print_command: text("TICKETDESK_PRINT_COMMAND", "lp"),
                print_cleanup: Duration::from_secs(parse_or(
                    &lookup,
                    "TICKETDESK_PRINT_CLEANUP_SECS",
                    70,
                )?),
            },
            log_level: text("TICKETDESK_LOG_LEVEL", "info"),
        })
    }

    /// Retry policy for the post-redirect ticket fetch
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.booking.session_retry_attempts,
            self.booking.session_retry_delay,
        )
    }

    /// Settings shared by the booking reducers
    #[must_use]
    pub fn flow_settings(&self) -> FlowSettings {
        FlowSettings {
            reservation: self.booking.reservation,
            session_retry: self.retry_policy(),
            cash_email: self.booking.cash_email.clone(),
            half_time_price: self.booking.half_time_price,
        }
    }

    /// Options for the ticket dispatcher
    #[must_use]
    pub fn document_options(&self) -> DocumentOptions {
        DocumentOptions {
            download_dir: self.documents.download_dir.clone(),
            file_name: self.documents.file_name.clone(),
            print_command: self.documents.print_command.clone(),
            print_cleanup: self.documents.print_cleanup,
        }
    }

    /// HTTP client for the configured API
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` if the HTTP client cannot be built.
    pub fn client(&self) -> Result<VenueClient, ApiError> {
        Ok(VenueClient::new(&self.api.base_url, self.api.request_timeout)?
            .with_email_timeout(self.api.email_timeout))
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|_| ConfigError::Invalid { key, value })
        },
    }
}
