// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use repairhub_domain::{BookingStatus, Payment, PaymentRecordStatus, PaymentStatus, RefundStatus};

use super::{create_test_booking, create_test_now, create_test_persistence};
use crate::{
    BOOKING_CANCELLED_REASON, BookingGuard, BookingPatch, HistoryNote, NewPayment,
    PaymentCompletion, Persistence, PersistenceError,
};

fn cancel(persistence: &mut Persistence, booking_id: i64) {
    let guard = BookingGuard::new(booking_id, &[BookingStatus::Pending]);
    let patch = BookingPatch {
        status: Some(BookingStatus::Cancelled),
        history: vec![HistoryNote::new(BookingStatus::Cancelled.as_str(), 11, None)],
        ..BookingPatch::default()
    };
    persistence
        .update_booking(&guard, &patch, create_test_now())
        .expect("Update should succeed")
        .expect("Guard should match");
}

fn create_test_payment(booking_id: i64, amount: i64) -> NewPayment {
    NewPayment {
        booking_id,
        user_id: 11,
        amount,
        currency: String::from("INR"),
        method: Some(String::from("upi")),
        gateway: String::from("mock"),
        gateway_order_id: format!("order_{booking_id}"),
    }
}

/// Inserts a booking and a completed payment of `amount` against it.
fn setup_completed_payment(persistence: &mut Persistence, amount: i64) -> Payment {
    let booking = persistence
        .insert_booking(&create_test_booking(11, None))
        .expect("Insert should succeed");
    let payment = persistence
        .insert_payment(
            &create_test_payment(booking.booking_id, amount),
            create_test_now(),
        )
        .expect("Insert should succeed");
    persistence
        .claim_payment(payment.payment_id, create_test_now())
        .expect("Claim failed")
        .expect("Payment should be claimable");
    persistence
        .complete_payment(payment.payment_id, "pay_1", create_test_now())
        .expect("Complete failed")
        .completed()
        .expect("Payment should be processing")
}

#[test]
fn test_second_in_flight_payment_is_rejected() {
    let mut persistence = create_test_persistence();
    let booking = persistence
        .insert_booking(&create_test_booking(11, None))
        .expect("Insert should succeed");

    persistence
        .insert_payment(
            &create_test_payment(booking.booking_id, 4500),
            create_test_now(),
        )
        .expect("First payment should insert");
    let second = persistence.insert_payment(
        &create_test_payment(booking.booking_id, 4500),
        create_test_now(),
    );
    assert!(matches!(second, Err(PersistenceError::UniqueViolation(_))));
}

#[test]
fn test_new_payment_allowed_after_failure() {
    let mut persistence = create_test_persistence();
    let booking = persistence
        .insert_booking(&create_test_booking(11, None))
        .expect("Insert should succeed");
    let first = persistence
        .insert_payment(
            &create_test_payment(booking.booking_id, 4500),
            create_test_now(),
        )
        .expect("Insert should succeed");
    persistence
        .claim_payment(first.payment_id, create_test_now())
        .expect("Claim failed")
        .expect("Payment should be claimable");
    let failed = persistence
        .fail_payment(first.payment_id, "signature mismatch", create_test_now())
        .expect("Fail failed")
        .expect("Payment should be processing");
    assert_eq!(failed.status, PaymentRecordStatus::Failed);
    assert_eq!(failed.failure_reason.as_deref(), Some("signature mismatch"));

    let booking = persistence
        .get_booking(booking.booking_id)
        .expect("Query failed")
        .expect("Booking should exist");
    assert_eq!(booking.payment_status, PaymentStatus::Failed);

    assert!(
        persistence
            .insert_payment(
                &create_test_payment(booking.booking_id, 4500),
                create_test_now(),
            )
            .is_ok()
    );
    assert_eq!(
        persistence
            .list_payments_for_booking(booking.booking_id)
            .expect("Query failed")
            .len(),
        2
    );
}

#[test]
fn test_complete_requires_claim_and_marks_booking_paid() {
    let mut persistence = create_test_persistence();
    let booking = persistence
        .insert_booking(&create_test_booking(11, None))
        .expect("Insert should succeed");
    let payment = persistence
        .insert_payment(
            &create_test_payment(booking.booking_id, 4500),
            create_test_now(),
        )
        .expect("Insert should succeed");

    assert_eq!(
        persistence
            .complete_payment(payment.payment_id, "pay_1", create_test_now())
            .expect("Complete failed"),
        PaymentCompletion::NotProcessing
    );

    persistence
        .claim_payment(payment.payment_id, create_test_now())
        .expect("Claim failed")
        .expect("Payment should be claimable");
    let completed = persistence
        .complete_payment(payment.payment_id, "pay_1", create_test_now())
        .expect("Complete failed")
        .completed()
        .expect("Payment should be processing");
    assert_eq!(completed.status, PaymentRecordStatus::Completed);
    assert_eq!(completed.gateway_payment_id.as_deref(), Some("pay_1"));

    // A completed payment can no longer be claimed or failed.
    assert!(
        persistence
            .claim_payment(payment.payment_id, create_test_now())
            .expect("Claim failed")
            .is_none()
    );
    assert!(
        persistence
            .fail_payment(payment.payment_id, "late", create_test_now())
            .expect("Fail failed")
            .is_none()
    );

    let booking = persistence
        .get_booking(booking.booking_id)
        .expect("Query failed")
        .expect("Booking should exist");
    assert_eq!(booking.payment_status, PaymentStatus::Paid);
    assert!(booking.is_paid);

    let latest = persistence
        .latest_payment_for_booking(booking.booking_id, &PaymentRecordStatus::REFUNDABLE)
        .expect("Query failed")
        .expect("Completed payment should be found");
    assert_eq!(latest.payment_id, payment.payment_id);
}

#[test]
fn test_refund_reservation_is_capped_by_amount() {
    let mut persistence = create_test_persistence();
    let payment = setup_completed_payment(&mut persistence, 1000);

    let (reserved, first_refund) = persistence
        .reserve_refund(payment.payment_id, 600, "partial", 1, create_test_now())
        .expect("Reserve failed")
        .expect("Reservation should fit");
    assert_eq!(reserved.refunded_amount, 600);

    assert!(
        persistence
            .reserve_refund(payment.payment_id, 500, "too much", 1, create_test_now())
            .expect("Reserve failed")
            .is_none()
    );

    let settled = persistence
        .finalize_refund(first_refund, "rfnd_1", create_test_now())
        .expect("Finalize failed");
    assert_eq!(settled.status, PaymentRecordStatus::PartiallyRefunded);
    assert_eq!(settled.completed_refund_total(), 600);

    let (_, second_refund) = persistence
        .reserve_refund(payment.payment_id, 400, "rest", 1, create_test_now())
        .expect("Reserve failed")
        .expect("Remaining balance should fit");
    let settled = persistence
        .finalize_refund(second_refund, "rfnd_2", create_test_now())
        .expect("Finalize failed");
    assert_eq!(settled.status, PaymentRecordStatus::Refunded);
    assert_eq!(settled.refunded_amount, 1000);
    assert_eq!(settled.refundable_balance(), 0);

    let booking = persistence
        .get_booking(settled.booking_id)
        .expect("Query failed")
        .expect("Booking should exist");
    assert_eq!(booking.payment_status, PaymentStatus::Refunded);

    assert!(
        persistence
            .reserve_refund(payment.payment_id, 1, "none left", 1, create_test_now())
            .expect("Reserve failed")
            .is_none()
    );
}

#[test]
fn test_released_refund_returns_capacity() {
    let mut persistence = create_test_persistence();
    let payment = setup_completed_payment(&mut persistence, 1000);

    let (_, refund_id) = persistence
        .reserve_refund(payment.payment_id, 1000, "full", 1, create_test_now())
        .expect("Reserve failed")
        .expect("Reservation should fit");

    let released = persistence
        .release_refund(refund_id, create_test_now())
        .expect("Release failed");
    assert_eq!(released.refunded_amount, 0);
    assert_eq!(released.status, PaymentRecordStatus::Completed);
    assert_eq!(released.refunds.len(), 1);
    assert_eq!(released.refunds[0].status, RefundStatus::Failed);

    // Settling an already released entry is rejected.
    assert!(matches!(
        persistence.finalize_refund(refund_id, "rfnd_x", create_test_now()),
        Err(PersistenceError::NotFound(_))
    ));

    assert!(
        persistence
            .reserve_refund(payment.payment_id, 1000, "retry", 1, create_test_now())
            .expect("Reserve failed")
            .is_some()
    );
}

#[test]
fn test_refund_requires_completed_payment() {
    let mut persistence = create_test_persistence();
    let booking = persistence
        .insert_booking(&create_test_booking(11, None))
        .expect("Insert should succeed");
    let payment = persistence
        .insert_payment(
            &create_test_payment(booking.booking_id, 1000),
            create_test_now(),
        )
        .expect("Insert should succeed");

    assert!(
        persistence
            .reserve_refund(payment.payment_id, 100, "early", 1, create_test_now())
            .expect("Reserve failed")
            .is_none()
    );
}

#[test]
fn test_claimed_payment_is_not_completed_for_cancelled_booking() {
    let mut persistence = create_test_persistence();
    let booking = persistence
        .insert_booking(&create_test_booking(11, None))
        .expect("Insert should succeed");
    let payment = persistence
        .insert_payment(
            &create_test_payment(booking.booking_id, 4500),
            create_test_now(),
        )
        .expect("Insert should succeed");
    persistence
        .claim_payment(payment.payment_id, create_test_now())
        .expect("Claim failed")
        .expect("Payment should be claimable");

    cancel(&mut persistence, booking.booking_id);

    let outcome = persistence
        .complete_payment(payment.payment_id, "pay_1", create_test_now())
        .expect("Complete failed");
    let PaymentCompletion::BookingCancelled(failed) = outcome else {
        panic!("Expected the payment to be refused, got {outcome:?}");
    };
    assert_eq!(failed.status, PaymentRecordStatus::Failed);
    assert_eq!(
        failed.failure_reason.as_deref(),
        Some(BOOKING_CANCELLED_REASON)
    );

    let booking = persistence
        .get_booking(booking.booking_id)
        .expect("Query failed")
        .expect("Booking should exist");
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert!(!booking.is_paid);
    assert_ne!(booking.payment_status, PaymentStatus::Paid);
}

#[test]
fn test_void_in_flight_payments() {
    let mut persistence = create_test_persistence();
    let booking = persistence
        .insert_booking(&create_test_booking(11, None))
        .expect("Insert should succeed");
    let failed = persistence
        .insert_payment(
            &create_test_payment(booking.booking_id, 4500),
            create_test_now(),
        )
        .expect("Insert should succeed");
    persistence
        .claim_payment(failed.payment_id, create_test_now())
        .expect("Claim failed")
        .expect("Payment should be claimable");
    persistence
        .fail_payment(failed.payment_id, "declined", create_test_now())
        .expect("Fail failed")
        .expect("Payment should be processing");
    let pending = persistence
        .insert_payment(
            &create_test_payment(booking.booking_id, 4500),
            create_test_now(),
        )
        .expect("Insert should succeed");

    let voided = persistence
        .void_in_flight_payments(
            booking.booking_id,
            BOOKING_CANCELLED_REASON,
            create_test_now(),
        )
        .expect("Void failed");
    assert_eq!(voided, vec![pending.payment_id]);

    let stored = persistence
        .get_payment(pending.payment_id)
        .expect("Query failed")
        .expect("Payment should exist");
    assert_eq!(stored.status, PaymentRecordStatus::Failed);
    assert_eq!(
        stored.failure_reason.as_deref(),
        Some(BOOKING_CANCELLED_REASON)
    );

    // The earlier failure keeps its own reason.
    let earlier = persistence
        .get_payment(failed.payment_id)
        .expect("Query failed")
        .expect("Payment should exist");
    assert_eq!(earlier.failure_reason.as_deref(), Some("declined"));

    assert!(
        persistence
            .void_in_flight_payments(
                booking.booking_id,
                BOOKING_CANCELLED_REASON,
                create_test_now(),
            )
            .expect("Void failed")
            .is_empty()
    );
}
