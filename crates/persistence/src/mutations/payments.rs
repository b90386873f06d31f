// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Payment mutations.
//!
//! Confirmation is two-phase: `claim_payment` locks the record in
//! `processing`, then exactly one of `complete_payment` or `fail_payment`
//! finishes it. Refunds reserve capacity with a single guarded increment of
//! `refunded_amount` before the gateway is called, and either finalize or
//! release that reservation afterwards.

use diesel::SqliteConnection;
use diesel::prelude::*;
use repairhub_domain::{BookingStatus, Payment, PaymentRecordStatus, PaymentStatus, RefundStatus};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::data_models::{NewPaymentRow, NewRefundRow, format_timestamp, to_flag};
use crate::diesel_schema::{bookings, payment_refunds, payments};
use crate::error::PersistenceError;
use crate::queries;

/// A payment to record after the gateway created its order.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub booking_id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub currency: String,
    pub method: Option<String>,
    pub gateway: String,
    pub gateway_order_id: String,
}

fn status_strings(statuses: &[PaymentRecordStatus]) -> Vec<&'static str> {
    statuses.iter().map(PaymentRecordStatus::as_str).collect()
}

fn load_required(
    conn: &mut SqliteConnection,
    payment_id: i64,
) -> Result<Payment, PersistenceError> {
    queries::payments::get_payment(conn, payment_id)?
        .ok_or_else(|| PersistenceError::NotFound(format!("payment {payment_id}")))
}

/// Inserts a `pending` payment.
///
/// # Errors
///
/// Returns `UniqueViolation` if the booking already has an in-flight payment.
pub fn insert_payment(
    conn: &mut SqliteConnection,
    payment: &NewPayment,
    at: OffsetDateTime,
) -> Result<Payment, PersistenceError> {
    let now: String = format_timestamp(at)?;
    let row = NewPaymentRow {
        booking_id: payment.booking_id,
        user_id: payment.user_id,
        amount: payment.amount,
        currency: payment.currency.clone(),
        refunded_amount: 0,
        status: PaymentRecordStatus::Pending.as_str().to_string(),
        method: payment.method.clone(),
        gateway: payment.gateway.clone(),
        gateway_order_id: Some(payment.gateway_order_id.clone()),
        created_at: now.clone(),
        updated_at: now,
    };

    let payment_id: i64 = diesel::insert_into(payments::table)
        .values(&row)
        .returning(payments::payment_id)
        .get_result(conn)?;

    info!(
        payment_id,
        booking_id = payment.booking_id,
        "Recorded pending payment"
    );
    load_required(conn, payment_id)
}

/// Claims a `pending` or `processing` payment for confirmation by moving it
/// to `processing`.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn claim_payment(
    conn: &mut SqliteConnection,
    payment_id: i64,
    at: OffsetDateTime,
) -> Result<Option<Payment>, PersistenceError> {
    let affected: usize = diesel::update(
        payments::table
            .filter(payments::payment_id.eq(payment_id))
            .filter(payments::status.eq_any(status_strings(&PaymentRecordStatus::IN_FLIGHT))),
    )
    .set((
        payments::status.eq(PaymentRecordStatus::Processing.as_str()),
        payments::updated_at.eq(format_timestamp(at)?),
    ))
    .execute(conn)?;

    if affected == 0 {
        return Ok(None);
    }
    load_required(conn, payment_id).map(Some)
}

/// Result of finishing a claimed payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentCompletion {
    /// The payment is `completed` and the booking is paid.
    Completed(Payment),
    /// The booking was cancelled while the payment was in flight. The
    /// payment is now `failed` and the booking was left untouched.
    BookingCancelled(Payment),
    /// The payment was no longer `processing`.
    NotProcessing,
}

impl PaymentCompletion {
    /// The completed payment, if the completion went through.
    #[must_use]
    pub fn completed(self) -> Option<Payment> {
        match self {
            Self::Completed(payment) => Some(payment),
            Self::BookingCancelled(_) | Self::NotProcessing => None,
        }
    }
}

/// Failure reason recorded on payments voided by a booking cancellation.
pub const BOOKING_CANCELLED_REASON: &str = "Booking was cancelled";

/// Marks a `processing` payment `completed` and the booking paid, in one
/// transaction.
///
/// The booking's status is re-read inside the transaction. A payment for a
/// cancelled booking is failed instead of completed, so a cancelled booking
/// never becomes paid.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn complete_payment(
    conn: &mut SqliteConnection,
    payment_id: i64,
    gateway_payment_id: &str,
    at: OffsetDateTime,
) -> Result<PaymentCompletion, PersistenceError> {
    let now: String = format_timestamp(at)?;

    conn.transaction::<_, PersistenceError, _>(|conn| {
        let Some(current) = queries::payments::get_payment(conn, payment_id)? else {
            return Ok(PaymentCompletion::NotProcessing);
        };
        if current.status != PaymentRecordStatus::Processing {
            return Ok(PaymentCompletion::NotProcessing);
        }

        let booking_status: String = bookings::table
            .filter(bookings::booking_id.eq(current.booking_id))
            .select(bookings::status)
            .first(conn)?;
        if booking_status == BookingStatus::Cancelled.as_str() {
            diesel::update(
                payments::table
                    .filter(payments::payment_id.eq(payment_id))
                    .filter(payments::status.eq(PaymentRecordStatus::Processing.as_str())),
            )
            .set((
                payments::status.eq(PaymentRecordStatus::Failed.as_str()),
                payments::gateway_payment_id.eq(gateway_payment_id),
                payments::failure_reason.eq(BOOKING_CANCELLED_REASON),
                payments::updated_at.eq(&now),
            ))
            .execute(conn)?;

            warn!(
                payment_id,
                booking_id = current.booking_id,
                "Refused to complete payment for cancelled booking"
            );
            return load_required(conn, payment_id).map(PaymentCompletion::BookingCancelled);
        }

        let affected: usize = diesel::update(
            payments::table
                .filter(payments::payment_id.eq(payment_id))
                .filter(payments::status.eq(PaymentRecordStatus::Processing.as_str())),
        )
        .set((
            payments::status.eq(PaymentRecordStatus::Completed.as_str()),
            payments::gateway_payment_id.eq(gateway_payment_id),
            payments::failure_reason.eq(None::<String>),
            payments::updated_at.eq(&now),
        ))
        .execute(conn)?;

        if affected == 0 {
            return Ok(PaymentCompletion::NotProcessing);
        }

        let payment: Payment = load_required(conn, payment_id)?;
        diesel::update(bookings::table.filter(bookings::booking_id.eq(payment.booking_id)))
            .set((
                bookings::payment_status.eq(PaymentStatus::Paid.as_str()),
                bookings::is_paid.eq(to_flag(true)),
                bookings::updated_at.eq(&now),
            ))
            .execute(conn)?;

        info!(
            payment_id,
            booking_id = payment.booking_id,
            "Payment completed"
        );
        Ok(PaymentCompletion::Completed(payment))
    })
}

/// Fails every `pending` or `processing` payment of a booking and returns
/// their ids. The booking's payment status moves to `failed` only if it is
/// still `pending`.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn void_in_flight_payments(
    conn: &mut SqliteConnection,
    booking_id: i64,
    reason: &str,
    at: OffsetDateTime,
) -> Result<Vec<i64>, PersistenceError> {
    let now: String = format_timestamp(at)?;

    conn.transaction::<_, PersistenceError, _>(|conn| {
        let voided: Vec<i64> = diesel::update(
            payments::table
                .filter(payments::booking_id.eq(booking_id))
                .filter(payments::status.eq_any(status_strings(&PaymentRecordStatus::IN_FLIGHT))),
        )
        .set((
            payments::status.eq(PaymentRecordStatus::Failed.as_str()),
            payments::failure_reason.eq(reason),
            payments::updated_at.eq(&now),
        ))
        .returning(payments::payment_id)
        .get_results(conn)?;

        if voided.is_empty() {
            return Ok(voided);
        }

        diesel::update(
            bookings::table
                .filter(bookings::booking_id.eq(booking_id))
                .filter(bookings::payment_status.eq(PaymentStatus::Pending.as_str())),
        )
        .set((
            bookings::payment_status.eq(PaymentStatus::Failed.as_str()),
            bookings::updated_at.eq(&now),
        ))
        .execute(conn)?;

        warn!(booking_id, ?voided, reason, "Voided in-flight payments");
        Ok(voided)
    })
}

/// Marks a `processing` payment `failed`. The booking's payment status
/// moves to `failed` only if it is still `pending`.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn fail_payment(
    conn: &mut SqliteConnection,
    payment_id: i64,
    reason: &str,
    at: OffsetDateTime,
) -> Result<Option<Payment>, PersistenceError> {
    let now: String = format_timestamp(at)?;

    conn.transaction::<_, PersistenceError, _>(|conn| {
        let affected: usize = diesel::update(
            payments::table
                .filter(payments::payment_id.eq(payment_id))
                .filter(payments::status.eq(PaymentRecordStatus::Processing.as_str())),
        )
        .set((
            payments::status.eq(PaymentRecordStatus::Failed.as_str()),
            payments::failure_reason.eq(reason),
            payments::updated_at.eq(&now),
        ))
        .execute(conn)?;

        if affected == 0 {
            return Ok(None);
        }

        let payment: Payment = load_required(conn, payment_id)?;
        diesel::update(
            bookings::table
                .filter(bookings::booking_id.eq(payment.booking_id))
                .filter(bookings::payment_status.eq(PaymentStatus::Pending.as_str())),
        )
        .set((
            bookings::payment_status.eq(PaymentStatus::Failed.as_str()),
            bookings::updated_at.eq(&now),
        ))
        .execute(conn)?;

        warn!(
            payment_id,
            booking_id = payment.booking_id,
            reason,
            "Payment failed"
        );
        Ok(Some(payment))
    })
}

/// Atomically checks and reserves refund capacity.
///
/// The update matches only if the payment is `completed` or
/// `partially_refunded` and `refunded_amount + amount <= amount`. On a
/// match, a `pending` refund entry is inserted in the same transaction and
/// its id returned alongside the payment.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn reserve_refund(
    conn: &mut SqliteConnection,
    payment_id: i64,
    amount: i64,
    reason: &str,
    processed_by: i64,
    at: OffsetDateTime,
) -> Result<Option<(Payment, i64)>, PersistenceError> {
    let now: String = format_timestamp(at)?;

    conn.transaction::<_, PersistenceError, _>(|conn| {
        let affected: usize = diesel::update(
            payments::table
                .filter(payments::payment_id.eq(payment_id))
                .filter(payments::status.eq_any(status_strings(&PaymentRecordStatus::REFUNDABLE)))
                .filter((payments::refunded_amount + amount).le(payments::amount)),
        )
        .set((
            payments::refunded_amount.eq(payments::refunded_amount + amount),
            payments::updated_at.eq(&now),
        ))
        .execute(conn)?;

        if affected == 0 {
            debug!(payment_id, amount, "Refund reservation matched no payment");
            return Ok(None);
        }

        let entry = NewRefundRow {
            payment_id,
            amount,
            reason: reason.to_string(),
            status: RefundStatus::Pending.as_str().to_string(),
            processed_by,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        let refund_id: i64 = diesel::insert_into(payment_refunds::table)
            .values(&entry)
            .returning(payment_refunds::refund_id)
            .get_result(conn)?;

        let payment: Payment = load_required(conn, payment_id)?;
        Ok(Some((payment, refund_id)))
    })
}

/// Marks a reserved refund `completed` and settles the payment and booking
/// statuses (`refunded` when fully refunded, else `partially_refunded`).
///
/// # Errors
///
/// Returns an error if the refund entry is not pending or the update fails.
pub fn finalize_refund(
    conn: &mut SqliteConnection,
    refund_id: i64,
    gateway_refund_id: &str,
    at: OffsetDateTime,
) -> Result<Payment, PersistenceError> {
    let now: String = format_timestamp(at)?;

    conn.transaction::<_, PersistenceError, _>(|conn| {
        let affected: usize = diesel::update(
            payment_refunds::table
                .filter(payment_refunds::refund_id.eq(refund_id))
                .filter(payment_refunds::status.eq(RefundStatus::Pending.as_str())),
        )
        .set((
            payment_refunds::status.eq(RefundStatus::Completed.as_str()),
            payment_refunds::gateway_refund_id.eq(gateway_refund_id),
            payment_refunds::updated_at.eq(&now),
        ))
        .execute(conn)?;

        if affected == 0 {
            return Err(PersistenceError::NotFound(format!(
                "pending refund {refund_id}"
            )));
        }

        let payment_id: i64 = queries::payments::payment_id_for_refund(conn, refund_id)?
            .ok_or_else(|| PersistenceError::NotFound(format!("refund {refund_id}")))?;
        let payment: Payment = load_required(conn, payment_id)?;

        let record_status: PaymentRecordStatus = payment.status_after_refund();
        let booking_status: PaymentStatus = match record_status {
            PaymentRecordStatus::Refunded => PaymentStatus::Refunded,
            _ => PaymentStatus::PartiallyRefunded,
        };

        diesel::update(payments::table.filter(payments::payment_id.eq(payment_id)))
            .set((
                payments::status.eq(record_status.as_str()),
                payments::updated_at.eq(&now),
            ))
            .execute(conn)?;

        diesel::update(bookings::table.filter(bookings::booking_id.eq(payment.booking_id)))
            .set((
                bookings::payment_status.eq(booking_status.as_str()),
                bookings::updated_at.eq(&now),
            ))
            .execute(conn)?;

        info!(
            payment_id,
            refund_id,
            status = record_status.as_str(),
            "Refund completed"
        );
        load_required(conn, payment_id)
    })
}

/// Marks a reserved refund `failed` and gives its capacity back.
///
/// # Errors
///
/// Returns an error if the refund entry is not pending or the update fails.
pub fn release_refund(
    conn: &mut SqliteConnection,
    refund_id: i64,
    at: OffsetDateTime,
) -> Result<Payment, PersistenceError> {
    let now: String = format_timestamp(at)?;

    conn.transaction::<_, PersistenceError, _>(|conn| {
        let (payment_id, amount): (i64, i64) = payment_refunds::table
            .filter(payment_refunds::refund_id.eq(refund_id))
            .filter(payment_refunds::status.eq(RefundStatus::Pending.as_str()))
            .select((payment_refunds::payment_id, payment_refunds::amount))
            .first(conn)
            .optional()?
            .ok_or_else(|| PersistenceError::NotFound(format!("pending refund {refund_id}")))?;

        diesel::update(payment_refunds::table.filter(payment_refunds::refund_id.eq(refund_id)))
            .set((
                payment_refunds::status.eq(RefundStatus::Failed.as_str()),
                payment_refunds::updated_at.eq(&now),
            ))
            .execute(conn)?;

        diesel::update(payments::table.filter(payments::payment_id.eq(payment_id)))
            .set((
                payments::refunded_amount.eq(payments::refunded_amount - amount),
                payments::updated_at.eq(&now),
            ))
            .execute(conn)?;

        warn!(payment_id, refund_id, amount, "Released refund reservation");
        load_required(conn, payment_id)
    })
}
