//! Shared fixtures for the booking integration tests.

#![allow(dead_code)] // Not every test file uses every fixture

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use ticketdesk::document::{DocumentOptions, TicketDispatcher};
use ticketdesk::environment::{BookingEnvironment, FlowSettings};
use ticketdesk_api::types::SessionResult;
use ticketdesk_api::{Bundle, Money, Settings, TicketRecord, TimeSlot};
use ticketdesk_core::environment::Clock;
use ticketdesk_runtime::retry::RetryPolicy;
use ticketdesk_testing::{MockBookingApi, test_clock};

static OUTPUT_DIRS: AtomicUsize = AtomicUsize::new(0);

/// €15 tickets, €3 socks, €1.50 insurance per ticket
pub fn settings() -> Settings {
    Settings {
        id: Some("settings-1".to_string()),
        location_name: "Mega Jump".to_string(),
        address: "Sportlaan 1".to_string(),
        start_date: Some("2025-07-01".to_string()),
        end_date: Some("2025-08-31".to_string()),
        ticket_price: Money::from_euros(15),
        socks_price: Money::from_euros(3),
        cancellation_fee: Money::from_cents(150),
    }
}

/// A slot with room on the test day
pub fn slot(start_time: &str, end_time: &str) -> TimeSlot {
    TimeSlot {
        id: Some(format!("slot-{start_time}")),
        date: "2025-07-12".to_string(),
        start_time: start_time.to_string(),
        end_time: end_time.to_string(),
        max_tickets: 30,
        total_booked: 4,
        available_tickets: 26,
        is_fully_booked: false,
    }
}

/// Family bundle: €60 for four, 10% off
pub fn bundle() -> Bundle {
    Bundle {
        id: Some("bundle-family".to_string()),
        name: "Family".to_string(),
        description: "Four jumpers".to_string(),
        price: Money::from_euros(60),
        discount_percent: 10.0,
        tickets: 4,
    }
}

/// A paid ticket
pub fn ticket(ticket_id: &str) -> TicketRecord {
    TicketRecord {
        id: Some(format!("id-{ticket_id}")),
        ticket_id: ticket_id.to_string(),
        name: "Anna".to_string(),
        surname: "Jansen".to_string(),
        email: "anna@example.com".to_string(),
        date: "2025-07-12".to_string(),
        start_time: "10:00".to_string(),
        end_time: "11:00".to_string(),
        tickets: 2,
        amount: Money::from_euros(30),
        total_base_amount: Money::from_euros(30),
        subtotal: Money::from_cents(3250),
        payment_status: Some("completed".to_string()),
        ..TicketRecord::default()
    }
}

/// Session result carrying `ticket`
pub fn ready(ticket: TicketRecord) -> SessionResult {
    SessionResult {
        success: true,
        ticket: Some(ticket),
        message: None,
    }
}

/// Mock answering settings, bundles and today's slots
pub fn venue_api() -> MockBookingApi {
    MockBookingApi::new()
        .with_settings(settings())
        .with_bundles(vec![bundle()])
        .with_slots(vec![slot("10:00", "11:00"), slot("11:00", "12:00")])
}

/// Fresh directory for downloaded tickets
pub fn output_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "ticketdesk-test-{}-{}",
        std::process::id(),
        OUTPUT_DIRS.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Environment over `api` with a fixed clock and fast retries
pub fn environment(api: Arc<MockBookingApi>) -> BookingEnvironment {
    environment_with_clock(api, Arc::new(test_clock()))
}

/// Environment over `api` and `clock`
pub fn environment_with_clock(api: Arc<MockBookingApi>, clock: Arc<dyn Clock>) -> BookingEnvironment {
    let options = DocumentOptions {
        download_dir: output_dir(),
        print_command: "true".to_string(),
        print_cleanup: Duration::from_millis(10),
        ..DocumentOptions::default()
    };
    let settings = FlowSettings {
        session_retry: RetryPolicy::fixed(3, Duration::from_millis(5)),
        ..FlowSettings::default()
    };
    let tickets = Arc::new(TicketDispatcher::new(api.clone(), options));
    BookingEnvironment::new(api, clock, settings, tickets)
}
