// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use diesel::SqliteConnection;
use diesel::prelude::*;
use repairhub_domain::Earning;

use crate::data_models::EarningRow;
use crate::diesel_schema::earnings;
use crate::error::PersistenceError;

/// Loads an earning by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_earning(
    conn: &mut SqliteConnection,
    earning_id: i64,
) -> Result<Option<Earning>, PersistenceError> {
    earnings::table
        .filter(earnings::earning_id.eq(earning_id))
        .select(EarningRow::as_select())
        .first(conn)
        .optional()?
        .map(EarningRow::into_domain)
        .transpose()
}

/// Loads the earning generated for a booking.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_earning_for_booking(
    conn: &mut SqliteConnection,
    booking_id: i64,
) -> Result<Option<Earning>, PersistenceError> {
    earnings::table
        .filter(earnings::booking_id.eq(booking_id))
        .select(EarningRow::as_select())
        .first(conn)
        .optional()?
        .map(EarningRow::into_domain)
        .transpose()
}

/// Counts earnings for a booking. Used to check the one-per-booking rule.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_earnings_for_booking(
    conn: &mut SqliteConnection,
    booking_id: i64,
) -> Result<i64, PersistenceError> {
    Ok(earnings::table
        .filter(earnings::booking_id.eq(booking_id))
        .count()
        .get_result(conn)?)
}
