//! # Ticketdesk Runtime
//!
//! The Store runtime that coordinates reducer execution and effect handling
//! for the booking client screens.
//!
//! ## Core Components
//!
//! - **Store**: Holds screen state and executes effects
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to reducers
//! - **Retry**: Bounded retry helpers for remote calls
//!
//! ## Example
//!
//! ```ignore
//! use ticketdesk_runtime::Store;
//!
//! let store = Store::new(CheckoutState::default(), CheckoutReducer, environment);
//!
//! store.send(CheckoutAction::Open).await?;
//! let seconds = store.state(|s| s.seconds_remaining).await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use ticketdesk_core::{effect::Effect, reducer::Reducer};
use tokio::sync::{RwLock, watch};

/// Retry logic for transient failures
pub mod retry;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a matching action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;
pub use store::Store;

/// Handle for waiting on the effects started by one `send`
///
/// Only the effects returned directly by the reducer for that action are
/// tracked; actions they feed back start their own effects.
pub struct EffectHandle {
    remaining: Arc<AtomicUsize>,
    done: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, watch::Sender<()>) {
        let (tx, rx) = watch::channel(());
        (
            Self {
                remaining: Arc::new(AtomicUsize::new(0)),
                done: rx,
            },
            tx,
        )
    }

    /// A handle with nothing to wait for
    #[must_use]
    pub fn completed() -> Self {
        Self::new().0
    }

    /// Wait until every tracked effect has finished
    pub async fn wait(&mut self) {
        while self.remaining.load(Ordering::SeqCst) > 0 {
            if self.done.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait with an upper bound
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the effects are still running when
    /// `timeout` elapses.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("remaining", &self.remaining.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
struct Tracking {
    remaining: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl Tracking {
    fn start(&self) -> TrackingGuard {
        self.remaining.fetch_add(1, Ordering::SeqCst);
        TrackingGuard(self.clone())
    }
}

/// Decrements the tracked count on drop, even if the effect task panics
struct TrackingGuard(Tracking);

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        if self.0.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.0.notifier.send(());
        }
    }
}

/// Store module - runtime coordinator for a reducer
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicUsize, Duration, Effect, EffectHandle, Ordering, Reducer, RwLock,
        StoreError, Tracking, TrackingGuard,
    };
    use tokio::sync::broadcast;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (screen logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Every action fed back by an effect, published after it was reduced.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + std::fmt::Debug + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(initial_state, reducer, environment, 64)
        }

        /// Create a store with a custom action broadcast capacity
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }
        }

        /// Send an action to the store
        ///
        /// Runs the reducer under the state write lock, then starts the
        /// returned effects.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            if self.shutdown.load(Ordering::SeqCst) {
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.commands.total").increment(1);
            tracing::trace!(?action, "Reducing action");

            let started = std::time::Instant::now();
            let effects = {
                let mut state = self.state.write().await;
                self.reducer.reduce(&mut state, action, &self.environment)
            };
            metrics::histogram!("store.reducer.duration_seconds")
                .record(started.elapsed().as_secs_f64());

            let (handle, notifier) = EffectHandle::new();
            let tracking = Tracking {
                remaining: Arc::clone(&handle.remaining),
                notifier: Arc::new(notifier),
            };

            for effect in effects {
                self.execute_effect(effect, &tracking);
            }

            Ok(handle)
        }

        /// Send an action and wait for a matching action fed back by its effects
        ///
        /// Subscribes before sending, so a fast effect cannot be missed. The
        /// matching action has already been reduced when it is returned.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: Timeout expired before matching action received
        /// - [`StoreError::ChannelClosed`]: Action broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: Store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to every action fed back by effects
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read state via a closure
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Number of effects currently running
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::SeqCst)
        }

        /// Stop accepting actions and wait for running effects
        ///
        /// Delay effects (countdown ticks) still sleeping when the store shuts
        /// down are counted as running; their actions are rejected on wake.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
        /// after `timeout`.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            self.shutdown.store(true, Ordering::SeqCst);
            tracing::info!("Store shutdown initiated");

            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                let pending = self.pending_effects.load(Ordering::SeqCst);
                if pending == 0 {
                    return Ok(());
                }
                if tokio::time::Instant::now() >= deadline {
                    tracing::warn!(pending, "Shutdown timed out");
                    return Err(StoreError::ShutdownTimeout(pending));
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }

        async fn feed_back(&self, action: A) {
            match self.send(action.clone()).await {
                Ok(_) => {
                    let _ = self.action_broadcast.send(action);
                },
                Err(error) => {
                    tracing::debug!(%error, "Dropping action fed back during shutdown");
                },
            }
        }

        fn spawn_tracked<F>(&self, tracking: &Tracking, task: F)
        where
            F: std::future::Future<Output = ()> + Send + 'static,
        {
            let guard: TrackingGuard = tracking.start();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            let pending = Arc::clone(&self.pending_effects);

            tokio::spawn(async move {
                let _guard = guard;
                task.await;
                pending.fetch_sub(1, Ordering::SeqCst);
            });
        }

        /// Execute an effect
        ///
        /// - `None`: No-op
        /// - `Future`: Executes async computation, sends resulting action if `Some`
        /// - `Delay`: Waits for duration, then sends action
        /// - `Parallel`: Executes effects concurrently
        /// - `Sequential`: Executes effects in order, waiting for each to complete
        fn execute_effect(&self, effect: Effect<A>, tracking: &Tracking) {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    let store = self.clone();
                    self.spawn_tracked(tracking, async move {
                        if let Some(action) = fut.await {
                            store.feed_back(action).await;
                        }
                    });
                },
                Effect::Delay { duration, action } => {
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    let store = self.clone();
                    self.spawn_tracked(tracking, async move {
                        tokio::time::sleep(duration).await;
                        store.feed_back(*action).await;
                    });
                },
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    for effect in effects {
                        self.execute_effect(effect, tracking);
                    }
                },
                Effect::Sequential(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "sequential").increment(1);
                    let store = self.clone();
                    self.spawn_tracked(tracking, async move {
                        for effect in effects {
                            let (mut handle, notifier) = EffectHandle::new();
                            let step = Tracking {
                                remaining: Arc::clone(&handle.remaining),
                                notifier: Arc::new(notifier),
                            };
                            store.execute_effect(effect, &step);
                            handle.wait().await;
                        }
                    });
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketdesk_core::{SmallVec, smallvec};

    #[derive(Debug, Clone, Default)]
    struct CounterState {
        count: i32,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum CounterAction {
        Increment,
        IncrementLater,
        IncrementTwiceInOrder,
        Loaded(i32),
        Load,
    }

    #[derive(Clone)]
    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = CounterState;
        type Action = CounterAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut CounterState,
            action: CounterAction,
            _env: &(),
        ) -> SmallVec<[Effect<CounterAction>; 4]> {
            match action {
                CounterAction::Increment => {
                    state.count += 1;
                    smallvec![Effect::None]
                },
                CounterAction::IncrementLater => smallvec![Effect::after(
                    Duration::from_millis(10),
                    CounterAction::Increment
                )],
                CounterAction::IncrementTwiceInOrder => smallvec![Effect::chain(vec![
                    Effect::task(async { Some(CounterAction::Increment) }),
                    Effect::task(async { Some(CounterAction::Increment) }),
                ])],
                CounterAction::Load => {
                    smallvec![Effect::task(async { Some(CounterAction::Loaded(41)) })]
                },
                CounterAction::Loaded(value) => {
                    state.count = value;
                    smallvec![Effect::None]
                },
            }
        }
    }

    #[tokio::test]
    async fn test_send_updates_state() {
        let store = Store::new(CounterState::default(), CounterReducer, ());
        store.send(CounterAction::Increment).await.ok();
        assert_eq!(store.state(|s| s.count).await, 1);
    }

    #[tokio::test]
    async fn test_feedback_is_reduced_before_broadcast() {
        let store = Store::new(CounterState::default(), CounterReducer, ());
        let result = store
            .send_and_wait_for(
                CounterAction::Load,
                |a| matches!(a, CounterAction::Loaded(_)),
                Duration::from_secs(1),
            )
            .await;

        assert!(matches!(result, Ok(CounterAction::Loaded(41))));
        assert_eq!(store.state(|s| s.count).await, 41);
    }

    #[tokio::test]
    async fn test_delay_effect_handle_waits() {
        let store = Store::new(CounterState::default(), CounterReducer, ());
        let Ok(mut handle) = store.send(CounterAction::IncrementLater).await else {
            panic!("send failed");
        };
        handle.wait().await;
        assert_eq!(store.state(|s| s.count).await, 1);
    }

    #[tokio::test]
    async fn test_sequential_effects_complete() {
        let store = Store::new(CounterState::default(), CounterReducer, ());
        let Ok(mut handle) = store.send(CounterAction::IncrementTwiceInOrder).await else {
            panic!("send failed");
        };
        assert!(handle.wait_with_timeout(Duration::from_secs(1)).await.is_ok());
        assert_eq!(store.state(|s| s.count).await, 2);
    }

    #[tokio::test]
    async fn test_send_after_shutdown_is_rejected() {
        let store = Store::new(CounterState::default(), CounterReducer, ());
        assert!(store.shutdown(Duration::from_millis(50)).await.is_ok());
        let result = store.send(CounterAction::Increment).await;
        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
    }
}
