// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Technician profile queries.

use diesel::SqliteConnection;
use diesel::prelude::*;
use repairhub_domain::{Technician, VerificationStatus};
use tracing::debug;

use crate::data_models::TechnicianRow;
use crate::diesel_schema::technicians;
use crate::error::PersistenceError;

/// Loads a technician profile by id.
///
/// # Errors
///
/// Returns an error if the query fails.
/// Returns `Ok(None)` if the technician does not exist.
pub fn get_technician(
    conn: &mut SqliteConnection,
    technician_id: i64,
) -> Result<Option<Technician>, PersistenceError> {
    technicians::table
        .filter(technicians::technician_id.eq(technician_id))
        .select(TechnicianRow::as_select())
        .first(conn)
        .optional()?
        .map(TechnicianRow::into_domain)
        .transpose()
}

/// Loads the technician profile owned by a user account.
///
/// # Errors
///
/// Returns an error if the query fails.
/// Returns `Ok(None)` if the user has no technician profile.
pub fn get_technician_by_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Option<Technician>, PersistenceError> {
    debug!(user_id, "Looking up technician profile for user");

    technicians::table
        .filter(technicians::user_id.eq(user_id))
        .select(TechnicianRow::as_select())
        .first(conn)
        .optional()?
        .map(TechnicianRow::into_domain)
        .transpose()
}

/// Lists technicians that are approved, available, and online, in id order.
///
/// Specialization and distance filtering happen in the matcher.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_match_candidates(
    conn: &mut SqliteConnection,
) -> Result<Vec<Technician>, PersistenceError> {
    let rows: Vec<TechnicianRow> = technicians::table
        .filter(technicians::verification_status.eq(VerificationStatus::Approved.as_str()))
        .filter(technicians::is_available.eq(1))
        .filter(technicians::is_online.eq(1))
        .order(technicians::technician_id.asc())
        .select(TechnicianRow::as_select())
        .load(conn)?;

    debug!(count = rows.len(), "Loaded match candidates");
    rows.into_iter().map(TechnicianRow::into_domain).collect()
}
