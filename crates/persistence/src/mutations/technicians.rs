// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Technician profile mutations.

use diesel::SqliteConnection;
use diesel::prelude::*;
use repairhub_domain::{GeoPoint, Technician, VerificationStatus};
use time::OffsetDateTime;
use tracing::info;

use crate::data_models::{
    NewTechnicianRow, TechnicianChangeset, format_timestamp, to_count, to_flag,
};
use crate::diesel_schema::technicians;
use crate::error::PersistenceError;
use crate::queries;

/// A technician profile to register for a user account.
#[derive(Debug, Clone)]
pub struct NewTechnician {
    pub user_id: i64,
    pub specializations: Vec<String>,
    pub experience_years: u32,
    pub location: Option<GeoPoint>,
    pub commission_rate: Option<f64>,
}

/// Self-service profile edits. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct TechnicianProfileUpdate {
    pub specializations: Option<Vec<String>>,
    pub experience_years: Option<u32>,
    pub is_online: Option<bool>,
    pub location: Option<GeoPoint>,
}

fn load_required(
    conn: &mut SqliteConnection,
    technician_id: i64,
) -> Result<Technician, PersistenceError> {
    queries::technicians::get_technician(conn, technician_id)?
        .ok_or_else(|| PersistenceError::NotFound(format!("technician {technician_id}")))
}

/// Registers a technician profile. New profiles start unverified,
/// available, and offline.
///
/// # Errors
///
/// Returns `UniqueViolation` if the user already has a profile.
pub fn insert_technician(
    conn: &mut SqliteConnection,
    technician: &NewTechnician,
    at: OffsetDateTime,
) -> Result<Technician, PersistenceError> {
    let now: String = format_timestamp(at)?;
    let row = NewTechnicianRow {
        user_id: technician.user_id,
        specializations: serde_json::to_string(&technician.specializations)?,
        experience_years: to_count(technician.experience_years, "experience_years")?,
        completed_repairs: 0,
        average_rating: 0.0,
        total_reviews: 0,
        is_available: 1,
        is_online: 0,
        verification_status: VerificationStatus::Pending.as_str().to_string(),
        commission_rate: technician.commission_rate,
        latitude: technician.location.map(|l| l.latitude),
        longitude: technician.location.map(|l| l.longitude),
        created_at: now.clone(),
        updated_at: now,
    };

    let technician_id: i64 = diesel::insert_into(technicians::table)
        .values(&row)
        .returning(technicians::technician_id)
        .get_result(conn)?;

    info!(
        technician_id,
        user_id = technician.user_id,
        "Registered technician"
    );
    load_required(conn, technician_id)
}

/// Applies self-service profile edits.
///
/// # Errors
///
/// Returns `NotFound` if the technician does not exist.
pub fn update_technician_profile(
    conn: &mut SqliteConnection,
    technician_id: i64,
    update: &TechnicianProfileUpdate,
    at: OffsetDateTime,
) -> Result<Technician, PersistenceError> {
    let changes = TechnicianChangeset {
        specializations: update
            .specializations
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?,
        experience_years: update
            .experience_years
            .map(|y| to_count(y, "experience_years"))
            .transpose()?,
        is_online: update.is_online.map(to_flag),
        latitude: update.location.map(|l| l.latitude),
        longitude: update.location.map(|l| l.longitude),
        updated_at: format_timestamp(at)?,
    };

    let affected: usize =
        diesel::update(technicians::table.filter(technicians::technician_id.eq(technician_id)))
            .set(&changes)
            .execute(conn)?;
    if affected == 0 {
        return Err(PersistenceError::NotFound(format!(
            "technician {technician_id}"
        )));
    }
    load_required(conn, technician_id)
}

/// Sets the availability flag.
///
/// Returns `false` if the technician does not exist.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn set_technician_availability(
    conn: &mut SqliteConnection,
    technician_id: i64,
    is_available: bool,
    at: OffsetDateTime,
) -> Result<bool, PersistenceError> {
    let affected: usize =
        diesel::update(technicians::table.filter(technicians::technician_id.eq(technician_id)))
            .set((
                technicians::is_available.eq(to_flag(is_available)),
                technicians::updated_at.eq(format_timestamp(at)?),
            ))
            .execute(conn)?;
    Ok(affected == 1)
}

/// Moves verification from one of `from` to `to`.
///
/// Returns `None` if the technician is missing or not in one of `from`.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn update_verification_status(
    conn: &mut SqliteConnection,
    technician_id: i64,
    from: &[VerificationStatus],
    to: VerificationStatus,
    at: OffsetDateTime,
) -> Result<Option<Technician>, PersistenceError> {
    let sources: Vec<&'static str> = from.iter().map(VerificationStatus::as_str).collect();

    let affected: usize = diesel::update(
        technicians::table
            .filter(technicians::technician_id.eq(technician_id))
            .filter(technicians::verification_status.eq_any(sources)),
    )
    .set((
        technicians::verification_status.eq(to.as_str()),
        technicians::updated_at.eq(format_timestamp(at)?),
    ))
    .execute(conn)?;

    if affected == 0 {
        return Ok(None);
    }
    info!(
        technician_id,
        status = to.as_str(),
        "Technician verification changed"
    );
    load_required(conn, technician_id).map(Some)
}
