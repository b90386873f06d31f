// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Technician profile management.

use repairhub_domain::{ActorRole, Technician, VerificationStatus};
use repairhub_persistence::{NewTechnician, PersistenceError, TechnicianProfileUpdate};
use tracing::info;

use crate::auth::{AuthenticatedActor, AuthorizationService};
use crate::context::AppContext;
use crate::error::ApiError;
use crate::request_response::{
    AvailabilityRequest, RegisterTechnicianRequest, UpdateTechnicianProfileRequest,
    VerificationRequest,
};

fn normalize_specializations(raw: Vec<String>) -> Result<Vec<String>, ApiError> {
    let specializations: Vec<String> = raw
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if specializations.is_empty() {
        return Err(ApiError::validation(
            "specializations",
            "At least one specialization is required",
        ));
    }
    Ok(specializations)
}

/// Loads the calling technician's own profile.
///
/// # Errors
///
/// Returns `Forbidden` if the caller is not a technician or has no profile.
pub async fn own_profile(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
) -> Result<Technician, ApiError> {
    AuthorizationService::require_role(actor, &[ActorRole::Technician], "technician_profile")?;
    let profile: Option<Technician> = ctx.store().await.get_technician_by_user(actor.user_id)?;
    profile.ok_or_else(|| ApiError::forbidden("Technician profile not found for this user"))
}

/// Registers a technician profile for the calling user.
///
/// New profiles await verification and are offline until the technician
/// goes online.
///
/// # Errors
///
/// Returns `Forbidden` for non-technicians, `Validation` for an empty
/// specialization list, and `Conflict` if the user already has a profile.
pub async fn register_technician(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    request: RegisterTechnicianRequest,
) -> Result<Technician, ApiError> {
    AuthorizationService::require_role(actor, &[ActorRole::Technician], "register_technician")?;

    let new_technician = NewTechnician {
        user_id: actor.user_id,
        specializations: normalize_specializations(request.specializations)?,
        experience_years: request.experience_years,
        location: request.location,
        commission_rate: None,
    };

    let result = ctx
        .store()
        .await
        .insert_technician(&new_technician, AppContext::now());
    let technician: Technician = match result {
        Ok(technician) => technician,
        Err(PersistenceError::UniqueViolation(_)) => {
            return Err(ApiError::conflict(
                "A technician profile already exists for this user",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        technician_id = technician.technician_id,
        actor_id = actor.user_id,
        "Technician registered"
    );
    Ok(technician)
}

/// Self-service profile edit. Verification fields are never touched.
///
/// # Errors
///
/// Returns `Forbidden` if the caller has no profile and `Validation` for an
/// empty specialization list.
pub async fn update_profile(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    request: UpdateTechnicianProfileRequest,
) -> Result<Technician, ApiError> {
    let profile: Technician = own_profile(ctx, actor).await?;

    let update = TechnicianProfileUpdate {
        specializations: request
            .specializations
            .map(normalize_specializations)
            .transpose()?,
        experience_years: request.experience_years,
        is_online: request.is_online,
        location: request.location,
    };
    let technician: Technician = ctx.store().await.update_technician_profile(
        profile.technician_id,
        &update,
        AppContext::now(),
    )?;

    info!(
        technician_id = technician.technician_id,
        "Technician profile updated"
    );
    Ok(technician)
}

/// Toggles the calling technician's availability for new jobs.
///
/// # Errors
///
/// Returns `Forbidden` if the caller has no profile.
pub async fn set_availability(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    request: AvailabilityRequest,
) -> Result<Technician, ApiError> {
    let profile: Technician = own_profile(ctx, actor).await?;
    let technician_id: i64 = profile.technician_id;

    let updated: bool = ctx.store().await.set_technician_availability(
        technician_id,
        request.is_available,
        AppContext::now(),
    )?;
    if !updated {
        return Err(ApiError::not_found("Technician", technician_id));
    }

    info!(
        technician_id,
        is_available = request.is_available,
        "Technician availability changed"
    );
    let technician: Option<Technician> = ctx.store().await.get_technician(technician_id)?;
    technician.ok_or_else(|| ApiError::not_found("Technician", technician_id))
}

/// Admin: approve or reject a technician.
///
/// # Errors
///
/// Returns `Forbidden` for non-admins, `NotFound`, and `Conflict` if the
/// verification change is not allowed or lost a race.
pub async fn verify_technician(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    technician_id: i64,
    request: VerificationRequest,
) -> Result<Technician, ApiError> {
    AuthorizationService::require_admin(actor, "verify_technician")?;

    let current: Technician = ctx
        .store()
        .await
        .get_technician(technician_id)?
        .ok_or_else(|| ApiError::not_found("Technician", technician_id))?;
    current
        .verification_status
        .validate_transition(request.status)?;

    let updated: Option<Technician> = ctx.store().await.update_verification_status(
        technician_id,
        &[current.verification_status],
        request.status,
        AppContext::now(),
    )?;
    let Some(technician) = updated else {
        let latest: VerificationStatus = ctx
            .store()
            .await
            .get_technician(technician_id)?
            .map_or(current.verification_status, |t| t.verification_status);
        return Err(ApiError::conflict(format!(
            "Technician verification changed concurrently (now {})",
            latest.as_str()
        )));
    };

    info!(
        technician_id,
        actor_id = actor.user_id,
        status = request.status.as_str(),
        "Technician verification changed"
    );
    Ok(technician)
}
