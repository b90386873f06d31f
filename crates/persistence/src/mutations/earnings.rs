// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Earning mutations.
//!
//! Creation is an insert-or-ignore keyed by the unique `booking_id`; only a
//! genuinely inserted row bumps the technician's completed-repair count.

use diesel::SqliteConnection;
use diesel::prelude::*;
use repairhub_domain::{CommissionBreakdown, Earning, EarningStatus};
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::data_models::{NewEarningRow, format_timestamp};
use crate::diesel_schema::{earnings, technicians};
use crate::error::PersistenceError;
use crate::queries;

/// An earning to create for a completed booking.
#[derive(Debug, Clone)]
pub struct NewEarning {
    pub booking_id: i64,
    pub technician_id: i64,
    pub technician_user_id: i64,
    pub breakdown: CommissionBreakdown,
}

fn load_for_booking(
    conn: &mut SqliteConnection,
    booking_id: i64,
) -> Result<Earning, PersistenceError> {
    queries::earnings::get_earning_for_booking(conn, booking_id)?
        .ok_or_else(|| PersistenceError::NotFound(format!("earning for booking {booking_id}")))
}

/// Inserts the earning unless one already exists for the booking.
///
/// Returns the stored earning and whether this call created it.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn insert_earning_if_absent(
    conn: &mut SqliteConnection,
    earning: &NewEarning,
    at: OffsetDateTime,
) -> Result<(Earning, bool), PersistenceError> {
    let now: String = format_timestamp(at)?;
    let row = NewEarningRow {
        booking_id: earning.booking_id,
        technician_id: earning.technician_id,
        technician_user_id: earning.technician_user_id,
        booking_amount: earning.breakdown.booking_amount,
        commission_rate: earning.breakdown.commission_rate,
        commission_amount: earning.breakdown.commission_amount,
        net_earning: earning.breakdown.net_earning,
        bonus: earning.breakdown.bonus,
        deductions: earning.breakdown.deductions,
        status: EarningStatus::Pending.as_str().to_string(),
        created_at: now.clone(),
        updated_at: now.clone(),
    };

    conn.transaction::<_, PersistenceError, _>(|conn| {
        let inserted: usize = diesel::insert_into(earnings::table)
            .values(&row)
            .on_conflict(earnings::booking_id)
            .do_nothing()
            .execute(conn)?;

        let created: bool = inserted == 1;
        if created {
            diesel::update(
                technicians::table.filter(technicians::technician_id.eq(earning.technician_id)),
            )
            .set((
                technicians::completed_repairs.eq(technicians::completed_repairs + 1),
                technicians::updated_at.eq(&now),
            ))
            .execute(conn)?;
            info!(
                booking_id = earning.booking_id,
                technician_id = earning.technician_id,
                net_earning = earning.breakdown.net_earning,
                "Earning created"
            );
        } else {
            debug!(booking_id = earning.booking_id, "Earning already exists");
        }

        Ok((load_for_booking(conn, earning.booking_id)?, created))
    })
}

/// Reverses the booking's earning if it is `pending` or `approved`, and
/// decrements the technician's completed-repair count.
///
/// Returns `None` when there is no reversible earning.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn reverse_earning(
    conn: &mut SqliteConnection,
    booking_id: i64,
    note: &str,
    at: OffsetDateTime,
) -> Result<Option<Earning>, PersistenceError> {
    let now: String = format_timestamp(at)?;
    let sources: Vec<&'static str> = EarningStatus::REVERSIBLE
        .iter()
        .map(EarningStatus::as_str)
        .collect();

    conn.transaction::<_, PersistenceError, _>(|conn| {
        let affected: usize = diesel::update(
            earnings::table
                .filter(earnings::booking_id.eq(booking_id))
                .filter(earnings::status.eq_any(sources)),
        )
        .set((
            earnings::status.eq(EarningStatus::Reversed.as_str()),
            earnings::note.eq(note),
            earnings::updated_at.eq(&now),
        ))
        .execute(conn)?;

        if affected == 0 {
            return Ok(None);
        }

        let earning: Earning = load_for_booking(conn, booking_id)?;
        diesel::update(
            technicians::table
                .filter(technicians::technician_id.eq(earning.technician_id))
                .filter(technicians::completed_repairs.gt(0)),
        )
        .set((
            technicians::completed_repairs.eq(technicians::completed_repairs - 1),
            technicians::updated_at.eq(&now),
        ))
        .execute(conn)?;

        info!(
            booking_id,
            earning_id = earning.earning_id,
            "Earning reversed"
        );
        Ok(Some(earning))
    })
}

/// Moves an earning from one of `from` to `to`.
///
/// Returns `None` if the earning is missing or not in one of `from`.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn transition_earning(
    conn: &mut SqliteConnection,
    earning_id: i64,
    from: &[EarningStatus],
    to: EarningStatus,
    note: Option<&str>,
    at: OffsetDateTime,
) -> Result<Option<Earning>, PersistenceError> {
    let sources: Vec<&'static str> = from.iter().map(EarningStatus::as_str).collect();
    let target = earnings::table
        .filter(earnings::earning_id.eq(earning_id))
        .filter(earnings::status.eq_any(sources));
    let now: String = format_timestamp(at)?;

    let affected: usize = match note {
        Some(note) => diesel::update(target)
            .set((
                earnings::status.eq(to.as_str()),
                earnings::note.eq(note),
                earnings::updated_at.eq(&now),
            ))
            .execute(conn)?,
        None => diesel::update(target)
            .set((
                earnings::status.eq(to.as_str()),
                earnings::updated_at.eq(&now),
            ))
            .execute(conn)?,
    };

    if affected == 0 {
        return Ok(None);
    }
    info!(earning_id, status = to.as_str(), "Earning status changed");
    queries::earnings::get_earning(conn, earning_id)
}
