//! # Ticketdesk Testing
//!
//! Testing utilities for the Ticketdesk booking client.
//!
//! This crate provides:
//! - Deterministic clocks (`FixedClock`, `ManualClock`)
//! - `MockBookingApi`, an in-memory double of the venue API seam
//! - `ReducerTest`, a given/when/then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use ticketdesk_testing::{MockBookingApi, test_clock};
//! use ticketdesk_runtime::Store;
//!
//! #[tokio::test]
//! async fn loads_settings() {
//!     let api = MockBookingApi::new().with_settings(settings());
//!     let store = Store::new(StorefrontState::default(), StorefrontReducer, env(api));
//!
//!     store.send(StorefrontAction::Load).await?;
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use ticketdesk_core::environment::Clock;

mod api_mock;
pub mod reducer_test;

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, Duration, Utc};
    use std::sync::{Mutex, PoisonError};

    pub use crate::api_mock::{ApiCall, MockBookingApi};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use ticketdesk_testing::mocks::FixedClock;
    /// use ticketdesk_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to
    #[derive(Debug)]
    pub struct ManualClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Start at `time`
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-07-12 09:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_time())
    }

    /// The instant used by [`test_clock`]
    #[must_use]
    pub fn test_time() -> DateTime<Utc> {
        DateTime::from_timestamp(1_752_310_800, 0).unwrap_or_default()
    }
}

// Re-export commonly used items
pub use mocks::{ApiCall, FixedClock, ManualClock, MockBookingApi, test_clock, test_time};
pub use reducer_test::{ReducerTest, assertions};
