// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Earnings engine: commission, idempotent creation, reversal, and admin
//! payout actions.

use repairhub_domain::{
    Booking, BookingStatus, CommissionBreakdown, Earning, EarningStatus, Technician,
    compute_commission,
};
use repairhub_persistence::NewEarning;
use tracing::{info, warn};

use crate::auth::{AuthenticatedActor, AuthorizationService};
use crate::context::AppContext;
use crate::error::ApiError;

/// Creates the earning for a completed booking, or returns the existing one.
///
/// Repeated or concurrent calls for the same booking store exactly one
/// earning; only the call that actually inserts it bumps the technician's
/// completed-repair count.
///
/// # Errors
///
/// Returns `Unprocessable` if the booking is not completed or has no
/// technician, `Validation` if the billable amount is not positive, and
/// `NotFound` if the technician profile is gone.
pub async fn generate_earning(ctx: &AppContext, booking: &Booking) -> Result<Earning, ApiError> {
    if booking.status != BookingStatus::Completed {
        return Err(ApiError::Unprocessable {
            rule: String::from("earning_requires_completion"),
            message: format!(
                "Booking {} is {}, earnings are only generated for completed bookings",
                booking.booking_id, booking.status
            ),
        });
    }
    let Some(technician_id) = booking.technician_id else {
        return Err(ApiError::Unprocessable {
            rule: String::from("earning_requires_technician"),
            message: format!("Booking {} has no technician", booking.booking_id),
        });
    };

    let technician: Technician = ctx
        .store()
        .await
        .get_technician(technician_id)?
        .ok_or_else(|| ApiError::not_found("Technician", technician_id))?;

    let rate: f64 = ctx
        .config()
        .commission_policy()
        .rate_for(technician.commission_rate, technician.completed_repairs);
    let breakdown: CommissionBreakdown = compute_commission(booking.billable_amount(), rate, 0, 0)?;

    let new_earning = NewEarning {
        booking_id: booking.booking_id,
        technician_id,
        technician_user_id: technician.user_id,
        breakdown,
    };
    let (earning, created) = ctx
        .store()
        .await
        .insert_earning_if_absent(&new_earning, AppContext::now())?;

    if created {
        info!(
            booking_id = booking.booking_id,
            technician_id,
            earning_id = earning.earning_id,
            commission_rate = rate,
            "Generated earning"
        );
    }
    Ok(earning)
}

/// Reverses the booking's `pending`/`approved` earning.
///
/// Returns `None` when there is nothing reversible. A `paid` earning is left
/// alone and logged for manual handling.
///
/// # Errors
///
/// Returns `Internal` if storage fails.
pub async fn reverse_earning_for_booking(
    ctx: &AppContext,
    booking_id: i64,
    note: &str,
) -> Result<Option<Earning>, ApiError> {
    let reversed: Option<Earning> =
        ctx.store()
            .await
            .reverse_earning(booking_id, note, AppContext::now())?;

    if reversed.is_none() {
        let existing: Option<Earning> = ctx.store().await.get_earning_for_booking(booking_id)?;
        if let Some(earning) = existing.filter(|e| e.status == EarningStatus::Paid) {
            warn!(
                booking_id,
                earning_id = earning.earning_id,
                "Earning already paid out; manual reversal required"
            );
        }
    }
    Ok(reversed)
}

/// Admin: approve an earning for payout.
///
/// # Errors
///
/// Returns `Forbidden` for non-admins, `NotFound` for unknown earnings, and
/// `Conflict` if the earning cannot move to `approved`.
pub async fn approve_earning(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    earning_id: i64,
    note: Option<&str>,
) -> Result<Earning, ApiError> {
    transition(ctx, actor, earning_id, EarningStatus::Approved, note).await
}

/// Admin: hold an earning pending review.
///
/// # Errors
///
/// Same as [`approve_earning`].
pub async fn hold_earning(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    earning_id: i64,
    note: Option<&str>,
) -> Result<Earning, ApiError> {
    transition(ctx, actor, earning_id, EarningStatus::Held, note).await
}

/// Admin: record that an approved earning was paid out.
///
/// # Errors
///
/// Same as [`approve_earning`].
pub async fn mark_earning_paid(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    earning_id: i64,
    note: Option<&str>,
) -> Result<Earning, ApiError> {
    transition(ctx, actor, earning_id, EarningStatus::Paid, note).await
}

async fn transition(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    earning_id: i64,
    target: EarningStatus,
    note: Option<&str>,
) -> Result<Earning, ApiError> {
    AuthorizationService::require_admin(actor, "transition_earning")?;

    let sources: Vec<EarningStatus> = EarningStatus::sources_reaching(target);
    let updated: Option<Earning> = ctx.store().await.transition_earning(
        earning_id,
        &sources,
        target,
        note,
        AppContext::now(),
    )?;

    if let Some(earning) = updated {
        info!(
            earning_id,
            actor_id = actor.user_id,
            status = target.as_str(),
            "Earning transitioned"
        );
        return Ok(earning);
    }

    let current: Earning = ctx
        .store()
        .await
        .get_earning(earning_id)?
        .ok_or_else(|| ApiError::not_found("Earning", earning_id))?;
    Err(ApiError::conflict(format!(
        "Cannot transition earning from {} to {}",
        current.status.as_str(),
        target.as_str()
    )))
}
