// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Booking queries.
//!
//! A booking is always loaded together with its full status and reschedule
//! history, ordered by insertion.

use diesel::SqliteConnection;
use diesel::prelude::*;
use repairhub_domain::{Booking, BookingStatus};
use time::Date;
use tracing::debug;

use crate::data_models::{BookingRow, RescheduleRow, StatusHistoryRow, format_date};
use crate::diesel_schema::{booking_reschedule_history, booking_status_history, bookings};
use crate::error::PersistenceError;

fn hydrate(conn: &mut SqliteConnection, row: BookingRow) -> Result<Booking, PersistenceError> {
    let history: Vec<StatusHistoryRow> = booking_status_history::table
        .filter(booking_status_history::booking_id.eq(row.booking_id))
        .order(booking_status_history::history_id.asc())
        .select(StatusHistoryRow::as_select())
        .load(conn)?;

    let reschedules: Vec<RescheduleRow> = booking_reschedule_history::table
        .filter(booking_reschedule_history::booking_id.eq(row.booking_id))
        .order(booking_reschedule_history::reschedule_id.asc())
        .select(RescheduleRow::as_select())
        .load(conn)?;

    row.into_domain(history, reschedules)
}

/// Loads a booking by id.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is corrupt.
/// Returns `Ok(None)` if the booking does not exist.
pub fn get_booking(
    conn: &mut SqliteConnection,
    booking_id: i64,
) -> Result<Option<Booking>, PersistenceError> {
    debug!(booking_id, "Loading booking");

    let row: Option<BookingRow> = bookings::table
        .filter(bookings::booking_id.eq(booking_id))
        .select(BookingRow::as_select())
        .first(conn)
        .optional()?;

    row.map(|row| hydrate(conn, row)).transpose()
}

fn load_many(
    conn: &mut SqliteConnection,
    rows: Vec<BookingRow>,
) -> Result<Vec<Booking>, PersistenceError> {
    rows.into_iter().map(|row| hydrate(conn, row)).collect()
}

/// Lists the bookings owned by a user, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_bookings_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<Booking>, PersistenceError> {
    let rows: Vec<BookingRow> = bookings::table
        .filter(bookings::user_id.eq(user_id))
        .order(bookings::booking_id.desc())
        .select(BookingRow::as_select())
        .load(conn)?;
    load_many(conn, rows)
}

/// Lists the bookings assigned to a technician, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_bookings_for_technician(
    conn: &mut SqliteConnection,
    technician_id: i64,
) -> Result<Vec<Booking>, PersistenceError> {
    let rows: Vec<BookingRow> = bookings::table
        .filter(bookings::technician_id.eq(technician_id))
        .order(bookings::booking_id.desc())
        .select(BookingRow::as_select())
        .load(conn)?;
    load_many(conn, rows)
}

/// Lists every booking, optionally narrowed to one status, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_all_bookings(
    conn: &mut SqliteConnection,
    status: Option<BookingStatus>,
) -> Result<Vec<Booking>, PersistenceError> {
    let mut query = bookings::table.select(BookingRow::as_select()).into_boxed();
    if let Some(status) = status {
        query = query.filter(bookings::status.eq(status.as_str()));
    }
    let rows: Vec<BookingRow> = query.order(bookings::booking_id.desc()).load(conn)?;
    load_many(conn, rows)
}

/// Returns the technicians holding an active (`assigned` or `in_progress`)
/// booking on `date` that overlaps `time_slot`.
///
/// Slots overlap when they are equal or when either side has no slot.
/// `exclude_booking` is left out of the check.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn busy_technicians(
    conn: &mut SqliteConnection,
    date: Date,
    time_slot: Option<&str>,
    exclude_booking: i64,
) -> Result<Vec<i64>, PersistenceError> {
    let active: Vec<&str> = vec![
        BookingStatus::Assigned.as_str(),
        BookingStatus::InProgress.as_str(),
    ];

    let mut query = bookings::table
        .filter(bookings::preferred_date.eq(format_date(date)?))
        .filter(bookings::status.eq_any(active))
        .filter(bookings::booking_id.ne(exclude_booking))
        .filter(bookings::technician_id.is_not_null())
        .select(bookings::technician_id.assume_not_null())
        .into_boxed();

    if let Some(slot) = time_slot {
        query = query.filter(
            bookings::time_slot
                .is_null()
                .or(bookings::time_slot.eq(slot.to_string())),
        );
    }

    let mut ids: Vec<i64> = query.load(conn)?;
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}
