//! Reducer composition utilities
//!
//! - **`reduce_child`**: Run a child reducer with its own state and action
//!   types inside a parent reducer, lifting the child's effects
//!
//! The checkout screen uses `reduce_child` to embed the voucher validator,
//! and the storefront uses it to embed the selection accumulator.

use crate::SmallVec;
use crate::effect::Effect;
use crate::reducer::Reducer;

/// Run a child reducer on a slice of parent state.
///
/// The child's effects are mapped through `embed` so that every action they
/// produce comes back to the parent reducer, which forwards it down again.
pub fn reduce_child<R, ParentAction>(
    child: &R,
    state: &mut R::State,
    action: R::Action,
    env: &R::Environment,
    embed: fn(R::Action) -> ParentAction,
) -> SmallVec<[Effect<ParentAction>; 4]>
where
    R: Reducer,
    R::Action: Send + 'static,
    ParentAction: 'static,
{
    child
        .reduce(state, action, env)
        .into_iter()
        .filter(|effect| !effect.is_none())
        .map(|effect| effect.map(embed))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smallvec;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct TestState {
        counter: i32,
        name: String,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Increment,
        SetName(String),
    }

    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            if matches!(action, TestAction::Increment) {
                state.counter += 1;
                return smallvec![Effect::after(Duration::from_millis(5), TestAction::Increment)];
            }
            smallvec![Effect::None]
        }
    }

    struct NameReducer;

    impl Reducer for NameReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            if let TestAction::SetName(name) = action {
                state.name = name;
            }
            smallvec![Effect::None]
        }
    }

    #[derive(Debug, PartialEq)]
    enum ParentAction {
        Counter(TestAction),
    }

    #[test]
    fn test_reduce_child_lifts_effects() {
        let mut state = TestState::default();

        let effects = reduce_child(
            &CounterReducer,
            &mut state,
            TestAction::Increment,
            &(),
            ParentAction::Counter,
        );

        assert_eq!(state.counter, 1);
        assert_eq!(effects.len(), 1);
        match &effects[0] {
            Effect::Delay { action, .. } => {
                assert_eq!(**action, ParentAction::Counter(TestAction::Increment));
            },
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn test_reduce_child_drops_noops() {
        let mut state = TestState::default();
        let effects = reduce_child(
            &NameReducer,
            &mut state,
            TestAction::SetName("x".to_string()),
            &(),
            ParentAction::Counter,
        );
        assert!(effects.is_empty());
    }
}
