// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Booking lifecycle orchestration.
//!
//! Every transition is one conditional update whose guard encodes all of
//! its preconditions. When the guard misses, the booking is read exactly
//! once more to report the most specific reason: existence first, then
//! authorization and ownership, then the operation's own precondition, and
//! finally a generic status conflict.

use repairhub_domain::{
    ActorRole, Booking, BookingStatus, DomainError, Earning, MatchCriteria, PaymentStatus,
    PriceQuote, ScoredTechnician, Technician, VerificationStatus, parse_schedule_date,
    sources_reaching,
};
use repairhub_persistence::{BookingGuard, BookingPatch, HistoryNote, NewBooking};
use tracing::{error, info, warn};

use crate::auth::{AuthenticatedActor, AuthorizationService};
use crate::context::AppContext;
use crate::earnings::generate_earning;
use crate::error::ApiError;
use crate::events::{BookingEvent, BookingEventKind};
use crate::matcher::find_best_match;
use crate::pricing::quote_price;
use crate::request_response::{
    AssignTechnicianRequest, AssignTechnicianResult, CompleteBookingRequest,
    CompleteBookingResult, CreateBookingRequest, CreateBookingResult, UpdateStatusRequest,
};
use crate::technicians::own_profile;

const AUTO_ASSIGN_NOTE: &str = "auto-assigned by matching engine";

fn require_text(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed: &str = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Loads a booking or fails with `NotFound`.
pub(crate) async fn load_booking(ctx: &AppContext, booking_id: i64) -> Result<Booking, ApiError> {
    let booking: Option<Booking> = ctx.store().await.get_booking(booking_id)?;
    booking.ok_or_else(|| ApiError::not_found("Booking", booking_id))
}

/// Resolves the user account behind a technician, best effort.
pub(crate) async fn technician_user_id(
    ctx: &AppContext,
    technician_id: Option<i64>,
) -> Option<i64> {
    let technician_id: i64 = technician_id?;
    let lookup = ctx.store().await.get_technician(technician_id);
    match lookup {
        Ok(technician) => technician.map(|t| t.user_id),
        Err(e) => {
            warn!(technician_id, error = %e, "Failed to resolve technician user");
            None
        }
    }
}

/// Marks a technician available again, best effort.
pub(crate) async fn release_technician(ctx: &AppContext, technician_id: i64) -> bool {
    let result = ctx
        .store()
        .await
        .set_technician_availability(technician_id, true, AppContext::now());
    match result {
        Ok(released) => released,
        Err(e) => {
            error!(technician_id, error = %e, "Failed to release technician availability");
            false
        }
    }
}

/// Generates the earning after a completion, logging instead of failing.
async fn earning_after_completion(ctx: &AppContext, booking: &Booking) -> Option<Earning> {
    match generate_earning(ctx, booking).await {
        Ok(earning) => Some(earning),
        Err(e) => {
            error!(
                booking_id = booking.booking_id,
                error = %e,
                "Earning generation failed after completion"
            );
            None
        }
    }
}

/// Creates a booking, pricing it and trying to auto-assign a technician.
///
/// # Errors
///
/// Returns `Forbidden` if the caller is not a user, and `Validation` for
/// empty fields or a date that is not strictly in the future.
pub async fn create_booking(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    request: CreateBookingRequest,
) -> Result<CreateBookingResult, ApiError> {
    AuthorizationService::require_role(actor, &[ActorRole::User], "create_booking")?;

    let service_type: String = require_text("service_type", &request.service_type)?;
    let issue_type: String = require_text("issue_type", &request.issue_type)?;
    let description: String = require_text("description", &request.description)?;
    let now = AppContext::now();
    let preferred_date = parse_schedule_date(&request.preferred_date, now.date())?;

    let quote: PriceQuote = quote_price(ctx, &service_type, &issue_type, request.urgency).await?;

    let attempt = auto_match(ctx, &service_type, &request, preferred_date).await;
    let matched: Option<ScoredTechnician> = match attempt {
        Ok(matched) => matched,
        Err(e) => {
            warn!(error = %e, service_type = %service_type, "Auto-assignment failed");
            None
        }
    };

    let mut history: Vec<HistoryNote> = vec![HistoryNote::new(
        BookingStatus::Pending.as_str(),
        actor.user_id,
        None,
    )];
    let status: BookingStatus = if matched.is_some() {
        history.push(HistoryNote::new(
            BookingStatus::Assigned.as_str(),
            actor.user_id,
            Some(AUTO_ASSIGN_NOTE.to_string()),
        ));
        BookingStatus::Assigned
    } else {
        BookingStatus::Pending
    };

    let new_booking = NewBooking {
        user_id: actor.user_id,
        technician_id: matched.as_ref().map(|m| m.technician.technician_id),
        service_type,
        issue_type,
        urgency: request.urgency,
        description,
        device: request.device,
        location: request.location,
        preferred_date,
        time_slot: request.time_slot,
        status,
        pricing: quote.snapshot,
        notes: request.notes,
        history,
        created_at: now,
    };
    let booking: Booking = ctx.store().await.insert_booking(&new_booking)?;

    info!(
        booking_id = booking.booking_id,
        actor_id = actor.user_id,
        technician_id = ?booking.technician_id,
        estimated_cost = booking.estimated_cost,
        "Booking created"
    );

    ctx.publish(BookingEvent::new(
        BookingEventKind::Created,
        &booking,
        matched.as_ref().map(|m| m.technician.user_id),
        actor.user_id,
        None,
    ));

    Ok(CreateBookingResult {
        auto_assigned: matched.is_some(),
        technician: matched.map(|m| m.technician.summary()),
        booking,
    })
}

async fn auto_match(
    ctx: &AppContext,
    service_type: &str,
    request: &CreateBookingRequest,
    date: time::Date,
) -> Result<Option<ScoredTechnician>, ApiError> {
    let busy: Vec<i64> =
        ctx.store()
            .await
            .busy_technicians(date, request.time_slot.as_deref(), 0)?;
    let criteria: MatchCriteria = busy.into_iter().fold(
        MatchCriteria::for_service(service_type, ctx.config().match_radius_meters)
            .near(request.location),
        MatchCriteria::excluding,
    );
    find_best_match(ctx, &criteria).await
}

/// Reports a missing booking ahead of a caller rejection.
async fn existence_first(ctx: &AppContext, booking_id: i64, rejection: ApiError) -> ApiError {
    match load_booking(ctx, booking_id).await {
        Ok(_) => rejection,
        Err(e) => e,
    }
}

/// Technician: start an assigned, paid booking.
///
/// # Errors
///
/// `NotFound` for an unknown booking, then `Forbidden` if the caller has no
/// technician profile. On a miss: `NotFound`, `Forbidden` if the caller is
/// not the assigned technician, `PaymentRequired` if unpaid, else `Conflict`.
pub async fn start_booking(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    booking_id: i64,
) -> Result<Booking, ApiError> {
    let technician_id: i64 = match own_profile(ctx, actor).await {
        Ok(profile) => profile.technician_id,
        Err(e) => return Err(existence_first(ctx, booking_id, e).await),
    };
    let now = AppContext::now();

    let guard = BookingGuard::new(booking_id, &[BookingStatus::Assigned])
        .assigned_to(technician_id)
        .with_payment_status(PaymentStatus::Paid);
    let patch = BookingPatch {
        status: Some(BookingStatus::InProgress),
        started_at: Some(now),
        history: vec![HistoryNote::new(
            BookingStatus::InProgress.as_str(),
            actor.user_id,
            None,
        )],
        ..BookingPatch::default()
    };

    let updated: Option<Booking> = ctx.store().await.update_booking(&guard, &patch, now)?;
    let Some(booking) = updated else {
        let current: Booking = load_booking(ctx, booking_id).await?;
        return Err(if current.technician_id != Some(technician_id) {
            ApiError::forbidden("You are not assigned to this booking")
        } else if current.payment_status != PaymentStatus::Paid {
            ApiError::PaymentRequired {
                message: format!(
                    "Booking {booking_id} must be paid before work starts (payment status {})",
                    current.payment_status.as_str()
                ),
            }
        } else {
            ApiError::conflict(format!(
                "Cannot start booking in status {}",
                current.status
            ))
        });
    };

    info!(booking_id, technician_id, "Booking started");
    ctx.publish(BookingEvent::new(
        BookingEventKind::Started,
        &booking,
        Some(actor.user_id),
        actor.user_id,
        Some(BookingStatus::Assigned.as_str().to_string()),
    ));
    Ok(booking)
}

/// Technician (assigned) or admin: complete an in-progress booking, then
/// generate the earning.
///
/// A failed earning generation is logged and reported as `earning: None`;
/// the completion stands.
///
/// # Errors
///
/// `NotFound` for an unknown booking, then `Forbidden` for other roles;
/// `Validation` for a non-positive final cost. On a miss: `NotFound`,
/// `Forbidden` if the caller is not the assigned technician, else
/// `Conflict`.
pub async fn complete_booking(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    booking_id: i64,
    request: CompleteBookingRequest,
) -> Result<CompleteBookingResult, ApiError> {
    if let Err(e) =
        BookingStatus::InProgress.validate_transition(BookingStatus::Completed, actor.role)
    {
        return Err(existence_first(ctx, booking_id, e.into()).await);
    }
    if let Some(cost) = request.final_cost.filter(|c| *c <= 0) {
        return Err(DomainError::NonPositiveAmount {
            field: "final cost",
            amount: cost,
        }
        .into());
    }

    let caller_technician: Option<i64> = if actor.role == ActorRole::Technician {
        match own_profile(ctx, actor).await {
            Ok(profile) => Some(profile.technician_id),
            Err(e) => return Err(existence_first(ctx, booking_id, e).await),
        }
    } else {
        None
    };

    let now = AppContext::now();
    let mut guard = BookingGuard::new(booking_id, &[BookingStatus::InProgress]);
    if let Some(technician_id) = caller_technician {
        guard = guard.assigned_to(technician_id);
    }
    let patch = BookingPatch {
        status: Some(BookingStatus::Completed),
        completed_at: Some(now),
        final_cost: request.final_cost,
        notes: request.notes.clone(),
        history: vec![HistoryNote::new(
            BookingStatus::Completed.as_str(),
            actor.user_id,
            request.notes,
        )],
        ..BookingPatch::default()
    };

    let updated: Option<Booking> = ctx.store().await.update_booking(&guard, &patch, now)?;
    let Some(booking) = updated else {
        let current: Booking = load_booking(ctx, booking_id).await?;
        return Err(match caller_technician {
            Some(technician_id) if current.technician_id != Some(technician_id) => {
                ApiError::forbidden("You are not assigned to this booking")
            }
            _ => ApiError::conflict(format!(
                "Cannot complete booking in status {}",
                current.status
            )),
        });
    };

    info!(
        booking_id,
        actor_id = actor.user_id,
        final_cost = booking.billable_amount(),
        "Booking completed"
    );
    let technician_user: Option<i64> = technician_user_id(ctx, booking.technician_id).await;
    ctx.publish(BookingEvent::new(
        BookingEventKind::Completed,
        &booking,
        technician_user,
        actor.user_id,
        Some(BookingStatus::InProgress.as_str().to_string()),
    ));

    let earning = earning_after_completion(ctx, &booking).await;
    Ok(CompleteBookingResult { booking, earning })
}

/// Admin: assign an approved, available technician to a pending booking.
///
/// # Errors
///
/// `Forbidden` for non-admins; `NotFound` for an unknown technician;
/// `Conflict` if the technician is unavailable; `Unprocessable` if not
/// approved. On a miss: `NotFound`, `Conflict` if a technician is already
/// assigned, else `Conflict` for the wrong status.
pub async fn assign_technician(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    booking_id: i64,
    request: AssignTechnicianRequest,
) -> Result<AssignTechnicianResult, ApiError> {
    AuthorizationService::require_admin(actor, "assign_technician")?;
    let technician_id: i64 = request.technician_id;

    let technician: Technician = ctx
        .store()
        .await
        .get_technician(technician_id)?
        .ok_or_else(|| ApiError::not_found("Technician", technician_id))?;
    if !technician.is_available {
        return Err(ApiError::conflict(format!(
            "Technician {technician_id} is not available"
        )));
    }
    if technician.verification_status != VerificationStatus::Approved {
        return Err(ApiError::Unprocessable {
            rule: String::from("technician_verification"),
            message: format!(
                "Technician {technician_id} is {} and cannot take bookings",
                technician.verification_status.as_str()
            ),
        });
    }

    let now = AppContext::now();
    let guard = BookingGuard::new(booking_id, &[BookingStatus::Pending]).unassigned();
    let patch = BookingPatch {
        status: Some(BookingStatus::Assigned),
        technician_id: Some(technician_id),
        history: vec![HistoryNote::new(
            BookingStatus::Assigned.as_str(),
            actor.user_id,
            Some(format!("Assigned technician {technician_id}")),
        )],
        ..BookingPatch::default()
    };

    let updated: Option<Booking> = ctx.store().await.update_booking(&guard, &patch, now)?;
    let Some(booking) = updated else {
        let current: Booking = load_booking(ctx, booking_id).await?;
        return Err(if current.technician_id.is_some() {
            ApiError::conflict("Booking already has a technician assigned")
        } else {
            ApiError::conflict(format!(
                "Cannot assign a technician to a booking in status {}",
                current.status
            ))
        });
    };

    info!(
        booking_id,
        technician_id,
        actor_id = actor.user_id,
        "Technician assigned"
    );
    ctx.publish(BookingEvent::new(
        BookingEventKind::Assigned,
        &booking,
        Some(technician.user_id),
        actor.user_id,
        Some(BookingStatus::Pending.as_str().to_string()),
    ));

    Ok(AssignTechnicianResult {
        booking,
        technician: technician.summary(),
    })
}

/// Admin: move a booking to `request.status` from any status the
/// transition table lets an admin reach it from.
///
/// This is narrower than the transition table: the table lets an admin move
/// `pending -> assigned`, but a forced status carries no technician and an
/// assigned booking must have one, so `assigned` is refused here in favour
/// of [`assign_technician`]. Completion still generates the earning.
///
/// # Errors
///
/// `Forbidden` for non-admins; `Validation` for an unknown or unreachable
/// target; `Unprocessable` for `assigned`. On a miss: `NotFound`, else
/// `Conflict` naming the current and target status.
pub async fn update_status(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    booking_id: i64,
    request: UpdateStatusRequest,
) -> Result<Booking, ApiError> {
    AuthorizationService::require_admin(actor, "update_booking_status")?;

    let target: BookingStatus = request.status.trim().parse()?;
    let sources: Vec<BookingStatus> = sources_reaching(target, actor.role);
    if sources.is_empty() {
        return Err(DomainError::UnreachableStatus {
            target: target.as_str().to_string(),
            role: actor.role.as_str().to_string(),
        }
        .into());
    }
    if target == BookingStatus::Assigned {
        return Err(ApiError::Unprocessable {
            rule: String::from("assignment_requires_technician"),
            message: String::from("Use technician assignment to move a booking to assigned"),
        });
    }

    let now = AppContext::now();
    let mut patch = BookingPatch {
        status: Some(target),
        history: vec![HistoryNote::new(
            target.as_str(),
            actor.user_id,
            request.reason.clone(),
        )],
        ..BookingPatch::default()
    };
    match target {
        BookingStatus::Completed => patch.completed_at = Some(now),
        BookingStatus::Cancelled => {
            patch.cancelled_at = Some(now);
            patch.cancellation_reason = request.reason;
        }
        BookingStatus::InProgress => patch.started_at = Some(now),
        BookingStatus::Pending | BookingStatus::Assigned => {}
    }

    let guard = BookingGuard::new(booking_id, &sources);
    let updated: Option<Booking> = ctx.store().await.update_booking(&guard, &patch, now)?;
    let Some(booking) = updated else {
        let current: Booking = load_booking(ctx, booking_id).await?;
        return Err(ApiError::conflict(format!(
            "Cannot change status from {} to {target}",
            current.status
        )));
    };

    info!(
        booking_id,
        actor_id = actor.user_id,
        status = target.as_str(),
        "Booking status forced"
    );
    let technician_user: Option<i64> = technician_user_id(ctx, booking.technician_id).await;
    ctx.publish(BookingEvent::new(
        BookingEventKind::StatusChanged,
        &booking,
        technician_user,
        actor.user_id,
        booking.previous_status().map(str::to_string),
    ));

    if target == BookingStatus::Completed {
        earning_after_completion(ctx, &booking).await;
    }
    Ok(booking)
}

/// Reads one booking: its owner, its assigned technician, or an admin.
///
/// # Errors
///
/// Returns `NotFound` or `Forbidden`.
pub async fn get_booking(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    booking_id: i64,
) -> Result<Booking, ApiError> {
    let booking: Booking = load_booking(ctx, booking_id).await?;
    if actor.is_admin() || booking.user_id == actor.user_id {
        return Ok(booking);
    }
    if actor.role == ActorRole::Technician {
        let profile: Option<Technician> = ctx.store().await.get_technician_by_user(actor.user_id)?;
        if profile.is_some_and(|p| booking.technician_id == Some(p.technician_id)) {
            return Ok(booking);
        }
    }
    Err(ApiError::forbidden("Not authorized to view this booking"))
}

/// Lists bookings visible to the caller, newest first, optionally filtered
/// by status. Users see their own, technicians their assignments, admins
/// everything.
///
/// # Errors
///
/// Returns `Forbidden` for the system role or a technician without a profile.
pub async fn list_bookings(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    status: Option<BookingStatus>,
) -> Result<Vec<Booking>, ApiError> {
    let bookings: Vec<Booking> = match actor.role {
        ActorRole::Admin => return Ok(ctx.store().await.list_all_bookings(status)?),
        ActorRole::User => ctx.store().await.list_bookings_for_user(actor.user_id)?,
        ActorRole::Technician => {
            let profile: Technician = own_profile(ctx, actor).await?;
            ctx.store()
                .await
                .list_bookings_for_technician(profile.technician_id)?
        }
        ActorRole::System => {
            return Err(ApiError::forbidden("The system role cannot list bookings"));
        }
    };
    Ok(bookings
        .into_iter()
        .filter(|b| status.is_none_or(|s| b.status == s))
        .collect())
}
