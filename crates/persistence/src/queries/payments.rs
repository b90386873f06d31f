// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Payment queries. Refund entries are embedded in the returned payment.

use diesel::SqliteConnection;
use diesel::prelude::*;
use repairhub_domain::{Payment, PaymentRecordStatus};

use crate::data_models::{PaymentRow, RefundRow};
use crate::diesel_schema::{payment_refunds, payments};
use crate::error::PersistenceError;

fn hydrate(conn: &mut SqliteConnection, row: PaymentRow) -> Result<Payment, PersistenceError> {
    let refunds: Vec<RefundRow> = payment_refunds::table
        .filter(payment_refunds::payment_id.eq(row.payment_id))
        .order(payment_refunds::refund_id.asc())
        .select(RefundRow::as_select())
        .load(conn)?;
    row.into_domain(refunds)
}

fn status_strings(statuses: &[PaymentRecordStatus]) -> Vec<&'static str> {
    statuses.iter().map(PaymentRecordStatus::as_str).collect()
}

/// Loads a payment by id.
///
/// # Errors
///
/// Returns an error if the query fails.
/// Returns `Ok(None)` if the payment does not exist.
pub fn get_payment(
    conn: &mut SqliteConnection,
    payment_id: i64,
) -> Result<Option<Payment>, PersistenceError> {
    let row: Option<PaymentRow> = payments::table
        .filter(payments::payment_id.eq(payment_id))
        .select(PaymentRow::as_select())
        .first(conn)
        .optional()?;
    row.map(|row| hydrate(conn, row)).transpose()
}

/// Returns the most recent payment for a booking in any of `statuses`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn latest_payment_for_booking(
    conn: &mut SqliteConnection,
    booking_id: i64,
    statuses: &[PaymentRecordStatus],
) -> Result<Option<Payment>, PersistenceError> {
    let row: Option<PaymentRow> = payments::table
        .filter(payments::booking_id.eq(booking_id))
        .filter(payments::status.eq_any(status_strings(statuses)))
        .order(payments::payment_id.desc())
        .select(PaymentRow::as_select())
        .first(conn)
        .optional()?;
    row.map(|row| hydrate(conn, row)).transpose()
}

/// Lists every payment for a booking, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_payments_for_booking(
    conn: &mut SqliteConnection,
    booking_id: i64,
) -> Result<Vec<Payment>, PersistenceError> {
    let rows: Vec<PaymentRow> = payments::table
        .filter(payments::booking_id.eq(booking_id))
        .order(payments::payment_id.asc())
        .select(PaymentRow::as_select())
        .load(conn)?;
    rows.into_iter().map(|row| hydrate(conn, row)).collect()
}

/// Returns the payment a refund entry belongs to.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn payment_id_for_refund(
    conn: &mut SqliteConnection,
    refund_id: i64,
) -> Result<Option<i64>, PersistenceError> {
    Ok(payment_refunds::table
        .filter(payment_refunds::refund_id.eq(refund_id))
        .select(payment_refunds::payment_id)
        .first(conn)
        .optional()?)
}
