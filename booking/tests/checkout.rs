//! Checkout form: local checks, voucher field and the cash branch.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use std::sync::Arc;
use std::time::Duration;
use ticketdesk::checkout::{
    CheckoutAction, CheckoutError, CheckoutPhase, CheckoutReducer, CheckoutState, CustomerForm,
};
use ticketdesk::selection::Selection;
use ticketdesk::voucher::{self, VoucherAction, VoucherError};
use ticketdesk::BookingEnvironment;
use ticketdesk_api::types::{VoucherSummary, WalkInBooking};
use ticketdesk_api::{Money, PaymentMethod, VoucherValidation};
use ticketdesk_core::reducer::Reducer;
use ticketdesk_runtime::Store;
use ticketdesk_testing::{ApiCall, MockBookingApi, ReducerTest, assertions};

const WAIT: Duration = Duration::from_secs(5);

fn filled_form() -> CustomerForm {
    CustomerForm {
        name: "Anna".to_string(),
        surname: "Jansen".to_string(),
        email: "anna@example.com".to_string(),
        repeat_email: "anna@example.com".to_string(),
        phone: "0470123456".to_string(),
        postal_code: "2000".to_string(),
    }
}

/// Two tickets at 10:00, form open with five minutes left
fn editing(method: PaymentMethod) -> CheckoutState {
    let settings = common::settings();
    CheckoutState {
        phase: CheckoutPhase::Editing,
        selection: Some(Selection::price(
            &common::slot("10:00", "11:00"),
            &settings,
            2,
            None,
        )),
        settings,
        method,
        seconds_remaining: 300,
        timer_generation: 1,
        ..CheckoutState::default()
    }
}

fn ready_to_submit(method: PaymentMethod) -> CheckoutState {
    CheckoutState {
        form: filled_form(),
        terms_accepted: vec![true],
        ..editing(method)
    }
}

fn validation(code: &str, discount: Money, amount: Money) -> VoucherValidation {
    VoucherValidation {
        voucher: VoucherSummary {
            code: code.to_string(),
            discount_value: 10.0,
            ..VoucherSummary::default()
        },
        discount_amount: discount,
        original_amount: amount,
        final_amount: amount.saturating_sub(discount),
    }
}

fn reduce(state: &mut CheckoutState, action: CheckoutAction, env: &BookingEnvironment) -> usize {
    CheckoutReducer.reduce(state, action, env).len()
}

fn pending_request(state: &CheckoutState) -> u64 {
    state.voucher.pending.as_ref().unwrap().request
}

#[test]
fn blank_fields_block_submission() {
    let env = common::environment(Arc::new(common::venue_api()));
    ReducerTest::new(CheckoutReducer)
        .with_env(env)
        .given_state(CheckoutState {
            form: CustomerForm {
                phone: "   ".to_string(),
                ..filled_form()
            },
            terms_accepted: vec![true],
            ..editing(PaymentMethod::Card)
        })
        .when_action(CheckoutAction::Submit)
        .then_state(|state| {
            assert_eq!(state.last_error, Some(CheckoutError::MissingFields));
            assert_eq!(state.phase, CheckoutPhase::Editing);
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn unticked_terms_block_submission() {
    let env = common::environment(Arc::new(common::venue_api()));
    ReducerTest::new(CheckoutReducer)
        .with_env(env)
        .given_state(CheckoutState {
            form: filled_form(),
            ..editing(PaymentMethod::Card)
        })
        .when_action(CheckoutAction::Submit)
        .then_state(|state| {
            assert_eq!(state.last_error, Some(CheckoutError::TermsNotAccepted));
            assert_eq!(state.phase, CheckoutPhase::Editing);
            assert!(!state.restart_required);
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn missing_fields_are_reported_before_terms() {
    let env = common::environment(Arc::new(common::venue_api()));
    ReducerTest::new(CheckoutReducer)
        .with_env(env)
        .given_state(editing(PaymentMethod::Card))
        .when_action(CheckoutAction::Submit)
        .then_state(|state| assert_eq!(state.last_error, Some(CheckoutError::MissingFields)))
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn cash_submission_waits_for_booking() {
    let env = common::environment(Arc::new(common::venue_api()));
    ReducerTest::new(CheckoutReducer)
        .with_env(env)
        .given_state(CheckoutState {
            last_error: Some(CheckoutError::TermsNotAccepted),
            ..ready_to_submit(PaymentMethod::Cash)
        })
        .when_action(CheckoutAction::Submit)
        .then_state(|state| {
            assert_eq!(state.phase, CheckoutPhase::Submitting);
            assert!(state.last_error.is_none());
            assert_eq!(state.breakdown().admin_fee, Money::ZERO);
            assert!(state.payload().is_cash_payment);
        })
        .then_effects(|effects| {
            assertions::assert_effects_count(effects, 1);
            assertions::assert_has_future_effect(effects);
        })
        .run();
}

#[test]
fn cash_booking_confirms_the_ticket() {
    let env = common::environment(Arc::new(common::venue_api()));
    ReducerTest::new(CheckoutReducer)
        .with_env(env)
        .given_state(CheckoutState {
            phase: CheckoutPhase::Submitting,
            ..ready_to_submit(PaymentMethod::Cash)
        })
        .when_action(CheckoutAction::CashBooked(Ok(Box::new(common::ticket("MJ-CASH-1")))))
        .then_state(|state| match &state.phase {
            CheckoutPhase::Confirmed(ticket) => assert_eq!(ticket.ticket_id, "MJ-CASH-1"),
            other => panic!("expected a confirmed ticket, got {other:?}"),
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn cash_refusal_reopens_the_form() {
    let env = common::environment(Arc::new(common::venue_api()));
    ReducerTest::new(CheckoutReducer)
        .with_env(env)
        .given_state(CheckoutState {
            phase: CheckoutPhase::Submitting,
            ..ready_to_submit(PaymentMethod::Cash)
        })
        .when_action(CheckoutAction::CashBooked(Err(CheckoutError::Rejected(
            "Slot is fully booked".to_string(),
        ))))
        .then_state(|state| {
            assert_eq!(state.phase, CheckoutPhase::Editing);
            assert_eq!(
                state.last_error,
                Some(CheckoutError::Rejected("Slot is fully booked".to_string()))
            );
        })
        .run();
}

#[test]
fn late_cash_answer_after_close_is_ignored() {
    let env = common::environment(Arc::new(common::venue_api()));
    ReducerTest::new(CheckoutReducer)
        .with_env(env)
        .given_state(CheckoutState {
            phase: CheckoutPhase::Closed,
            ..ready_to_submit(PaymentMethod::Cash)
        })
        .when_action(CheckoutAction::CashBooked(Ok(Box::new(common::ticket("MJ-CASH-2")))))
        .then_state(|state| assert_eq!(state.phase, CheckoutPhase::Closed))
        .run();
}

#[tokio::test]
async fn cash_booking_without_ticket_uses_the_order() {
    let api = Arc::new(common::venue_api().with_walk_in(Ok(WalkInBooking {
        success: true,
        ..WalkInBooking::default()
    })));
    let store = Store::new(
        ready_to_submit(PaymentMethod::Cash),
        CheckoutReducer,
        common::environment(api.clone()),
    );

    store
        .send_and_wait_for(
            CheckoutAction::Submit,
            |action| matches!(action, CheckoutAction::CashBooked(_)),
            WAIT,
        )
        .await
        .unwrap();

    let phase = store.state(|s| s.phase.clone()).await;
    let CheckoutPhase::Confirmed(ticket) = phase else {
        panic!("expected a confirmed ticket, got {phase:?}");
    };
    assert_eq!(ticket.name, "Anna");
    assert_eq!(ticket.email, "anna@example.com");
    assert_eq!(ticket.tickets, 2);
    assert_eq!(ticket.start_time, "10:00");
    assert_eq!(ticket.payment_method, Some(PaymentMethod::Cash));
    assert!(ticket.is_cash_payment);

    let payload = api
        .calls()
        .into_iter()
        .find_map(|call| match call {
            ApiCall::BookWalkIn(payload) => Some(payload),
            _ => None,
        })
        .expect("walk-in booking requested");
    assert_eq!(payload.total_amount, Money::from_euros(30));
    assert_eq!(api.count(|call| matches!(call, ApiCall::CreatePaymentSession(_))), 0);
}

#[tokio::test]
async fn cash_booking_without_success_shows_server_message() {
    let api = Arc::new(common::venue_api().with_walk_in(Ok(WalkInBooking {
        success: false,
        message: Some("Register is closed".to_string()),
        ..WalkInBooking::default()
    })));
    let store = Store::new(
        ready_to_submit(PaymentMethod::Cash),
        CheckoutReducer,
        common::environment(api),
    );

    store
        .send_and_wait_for(
            CheckoutAction::Submit,
            |action| matches!(action, CheckoutAction::CashBooked(_)),
            WAIT,
        )
        .await
        .unwrap();

    assert_eq!(store.state(|s| s.phase.clone()).await, CheckoutPhase::Editing);
    assert_eq!(
        store.state(|s| s.last_error.clone()).await,
        Some(CheckoutError::Rejected("Register is closed".to_string()))
    );
}

#[tokio::test]
async fn blank_code_never_reaches_the_server() {
    let api = MockBookingApi::new();
    let result = voucher::validate(&api, "   ", Money::from_euros(30)).await;
    assert_eq!(result, Err(VoucherError::EmptyCode));
    assert_eq!(api.count(|call| matches!(call, ApiCall::ValidateVoucher(_))), 0);

    let env = common::environment(Arc::new(common::venue_api()));
    ReducerTest::new(CheckoutReducer)
        .with_env(env)
        .given_state(editing(PaymentMethod::Card))
        .when_action(CheckoutAction::Voucher(VoucherAction::CodeChanged("  ".to_string())))
        .then_state(|state| assert!(state.voucher.applied.is_none()))
        .run();

    let env = common::environment(Arc::new(common::venue_api()));
    ReducerTest::new(CheckoutReducer)
        .with_env(env)
        .given_state(editing(PaymentMethod::Card))
        .when_action(CheckoutAction::ApplyVoucher)
        .then_state(|state| {
            assert_eq!(state.voucher.error, Some(VoucherError::EmptyCode));
            assert!(!state.voucher.is_validating());
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn second_code_discards_the_first_result() {
    let env = common::environment(Arc::new(common::venue_api()));
    let mut state = editing(PaymentMethod::Card);
    let before = state.breakdown().total_before_voucher;

    reduce(&mut state, CheckoutAction::Voucher(VoucherAction::CodeChanged("summer".to_string())), &env);
    assert_eq!(reduce(&mut state, CheckoutAction::ApplyVoucher, &env), 1);
    let first = pending_request(&state);
    reduce(
        &mut state,
        CheckoutAction::Voucher(VoucherAction::Validated {
            request: first,
            result: Ok(validation("SUMMER", Money::from_euros(5), before)),
        }),
        &env,
    );
    assert_eq!(state.breakdown().voucher_discount, Money::from_euros(5));

    reduce(&mut state, CheckoutAction::Voucher(VoucherAction::CodeChanged("winter".to_string())), &env);
    assert_eq!(reduce(&mut state, CheckoutAction::ApplyVoucher, &env), 1);
    assert!(state.voucher.applied.is_none());
    assert_eq!(state.breakdown().total, before);
    let second = pending_request(&state);
    assert_ne!(first, second);

    // An answer for the first code arriving late changes nothing
    reduce(
        &mut state,
        CheckoutAction::Voucher(VoucherAction::Validated {
            request: first,
            result: Ok(validation("SUMMER", Money::from_euros(5), before)),
        }),
        &env,
    );
    assert!(state.voucher.applied.is_none());
    assert!(state.voucher.is_validating());

    reduce(
        &mut state,
        CheckoutAction::Voucher(VoucherAction::Validated {
            request: second,
            result: Err(VoucherError::Rejected("Voucher has expired".to_string())),
        }),
        &env,
    );
    assert!(state.voucher.applied.is_none());
    assert_eq!(
        state.voucher.error,
        Some(VoucherError::Rejected("Voucher has expired".to_string()))
    );
    assert_eq!(state.breakdown().total, before);
}

#[test]
fn removing_a_voucher_restores_the_total() {
    let env = common::environment(Arc::new(common::venue_api()));
    let mut state = editing(PaymentMethod::Card);
    let before = state.breakdown().total_before_voucher;
    // 2 × €15 + €2.50 card fee
    assert_eq!(before, Money::from_cents(3250));

    for discount in [Money::from_euros(5), Money::from_cents(325), Money::from_euros(100)] {
        reduce(&mut state, CheckoutAction::Voucher(VoucherAction::CodeChanged("jump".to_string())), &env);
        reduce(&mut state, CheckoutAction::ApplyVoucher, &env);
        assert_eq!(state.voucher.pending.as_ref().unwrap().code, "jump");
        let request = pending_request(&state);
        reduce(
            &mut state,
            CheckoutAction::Voucher(VoucherAction::Validated {
                request,
                result: Ok(validation("JUMP", discount, before)),
            }),
            &env,
        );

        let applied = state.breakdown();
        assert_eq!(applied.total_before_voucher, before);
        assert_eq!(applied.total, before.saturating_sub(discount));
        assert_eq!(state.payload().voucher_data.unwrap().code, "JUMP");

        assert_eq!(reduce(&mut state, CheckoutAction::Voucher(VoucherAction::Remove), &env), 0);
        let removed = state.breakdown();
        assert_eq!(removed.total_before_voucher, before);
        assert_eq!(removed.voucher_discount, Money::ZERO);
        assert_eq!(removed.total, before);
        assert!(state.voucher.code_input.is_empty());
        assert!(state.payload().voucher_data.is_none());
    }
}

#[tokio::test]
async fn applied_code_is_sent_upper_cased_with_pre_discount_total() {
    let api = Arc::new(common::venue_api().with_voucher(Ok(validation(
        "SUMMER",
        Money::from_euros(3),
        Money::from_cents(3250),
    ))));
    let store = Store::new(
        editing(PaymentMethod::Card),
        CheckoutReducer,
        common::environment(api.clone()),
    );
    store
        .send(CheckoutAction::Voucher(VoucherAction::CodeChanged(" summer ".to_string())))
        .await
        .unwrap();

    store
        .send_and_wait_for(
            CheckoutAction::ApplyVoucher,
            |action| matches!(action, CheckoutAction::Voucher(VoucherAction::Validated { .. })),
            WAIT,
        )
        .await
        .unwrap();

    let request = api
        .calls()
        .into_iter()
        .find_map(|call| match call {
            ApiCall::ValidateVoucher(request) => Some(request),
            _ => None,
        })
        .expect("voucher validated");
    assert_eq!(request.code, "SUMMER");
    assert_eq!(request.amount, Money::from_cents(3250));
    assert_eq!(store.state(|s| s.breakdown().total).await, Money::from_cents(2950));
}
