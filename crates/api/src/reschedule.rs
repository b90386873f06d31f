// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Reschedule saga.
//!
//! Re-pricing is best effort. Finding a replacement for a technician who is
//! busy on the new date is the one hard-failure step before the update.

use repairhub_domain::{
    ActorRole, Booking, BookingStatus, DomainError, MatchCriteria, PriceQuote, PricingSnapshot,
    ScheduleSlot, ScoredTechnician, ensure_reschedule_capacity, parse_schedule_date,
    reschedulable_statuses,
};
use repairhub_persistence::{BookingGuard, BookingPatch, HistoryNote, RescheduleNote};
use time::Date;
use tracing::{info, warn};

use crate::auth::AuthenticatedActor;
use crate::bookings::{load_booking, release_technician, technician_user_id};
use crate::context::AppContext;
use crate::error::ApiError;
use crate::events::{BookingEvent, BookingEventKind};
use crate::matcher::find_best_match;
use crate::pricing::quote_price;
use crate::request_response::{RescheduleBookingRequest, RescheduleResult};

/// Moves a booking to a new date and slot.
///
/// # Errors
///
/// `Forbidden` for roles that may not reschedule or another user's
/// booking; `Validation` for a bad date or an exhausted reschedule
/// allowance; `NotFound`; `Conflict` if the booking is not reschedulable,
/// no replacement technician is free, or the booking changed concurrently.
pub async fn reschedule_booking(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    booking_id: i64,
    request: RescheduleBookingRequest,
) -> Result<RescheduleResult, ApiError> {
    let statuses: Vec<BookingStatus> = reschedulable_statuses(actor.role);
    if statuses.is_empty() {
        return Err(ApiError::forbidden(format!(
            "Role '{}' may not reschedule bookings",
            actor.role
        )));
    }
    let new_date: Date = parse_schedule_date(&request.new_date, AppContext::now().date())?;
    let max: u32 = ctx.config().max_reschedules;

    let booking: Booking = load_booking(ctx, booking_id).await?;
    if actor.role == ActorRole::User && booking.user_id != actor.user_id {
        return Err(ApiError::forbidden(
            "Not authorized to reschedule this booking",
        ));
    }
    if !statuses.contains(&booking.status) {
        return Err(ApiError::conflict(format!(
            "Cannot reschedule a booking in status {}",
            booking.status
        )));
    }
    ensure_reschedule_capacity(booking.reschedule_count, max)?;

    let new_slot = ScheduleSlot {
        date: new_date,
        time_slot: request.time_slot.clone(),
    };

    // Step 1: re-price.
    let repriced: Option<PricingSnapshot> = reprice(ctx, &booking).await;
    let price_changed: bool = repriced.is_some();

    // Step 2: resolve technician conflicts on the new date.
    let replacement: Option<i64> = resolve_conflict(ctx, &booking, &new_slot).await?;

    // Step 3: conditional update.
    let now = AppContext::now();
    let mut guard = BookingGuard::new(booking_id, &statuses).reschedule_below(max);
    if actor.role == ActorRole::User {
        guard = guard.owned_by(actor.user_id);
    }
    guard = match booking.technician_id {
        Some(technician_id) => guard.assigned_to(technician_id),
        None => guard.unassigned(),
    };

    let change_note: String = format!(
        "Rescheduled from {} to {}",
        describe(&booking.schedule()),
        describe(&new_slot)
    );
    let patch = BookingPatch {
        technician_id: replacement,
        schedule: Some(new_slot.clone()),
        pricing: repriced,
        increment_reschedule: true,
        history: vec![HistoryNote::new(
            booking.status.as_str(),
            actor.user_id,
            Some(change_note),
        )],
        reschedule: Some(RescheduleNote {
            from: booking.schedule(),
            to: new_slot,
            reason: request.reason,
            rescheduled_by: actor.user_id,
        }),
        ..BookingPatch::default()
    };

    let updated: Option<Booking> = ctx.store().await.update_booking(&guard, &patch, now)?;
    let Some(updated) = updated else {
        let current: Booking = load_booking(ctx, booking_id).await?;
        return Err(if current.reschedule_count >= max {
            DomainError::RescheduleLimitReached { max }.into()
        } else {
            ApiError::conflict("Booking changed while rescheduling; please try again")
        });
    };

    if let (Some(_), Some(previous)) = (replacement, booking.technician_id) {
        release_technician(ctx, previous).await;
    }

    info!(
        booking_id,
        actor_id = actor.user_id,
        reschedule_count = updated.reschedule_count,
        price_changed,
        technician_reassigned = replacement.is_some(),
        "Booking rescheduled"
    );

    // Step 4: event.
    let technician_user: Option<i64> = technician_user_id(ctx, updated.technician_id).await;
    ctx.publish(
        BookingEvent::new(
            BookingEventKind::StatusChanged,
            &updated,
            technician_user,
            actor.user_id,
            Some(booking.status.as_str().to_string()),
        )
        .with_status_label(format!("rescheduled ({})", updated.status)),
    );

    Ok(RescheduleResult {
        booking: updated,
        price_changed,
        technician_reassigned: replacement.is_some(),
        previous_technician_id: replacement.and(booking.technician_id),
    })
}

fn describe(slot: &ScheduleSlot) -> String {
    slot.time_slot.as_ref().map_or_else(
        || slot.date.to_string(),
        |time_slot| format!("{} {time_slot}", slot.date),
    )
}

/// Re-quotes the booking; `Some` only when the estimate changed.
async fn reprice(ctx: &AppContext, booking: &Booking) -> Option<PricingSnapshot> {
    let attempt = quote_price(
        ctx,
        &booking.service_type,
        &booking.issue_type,
        booking.urgency,
    )
    .await;
    let quote: PriceQuote = match attempt {
        Ok(quote) => quote,
        Err(e) => {
            warn!(
                booking_id = booking.booking_id,
                error = %e,
                "Re-pricing failed; keeping existing price"
            );
            return None;
        }
    };

    (quote.snapshot.estimated_cost != booking.pricing.estimated_cost).then_some(quote.snapshot)
}

/// Returns a replacement technician when the assigned one is busy on the
/// new slot, `None` when no change is needed.
async fn resolve_conflict(
    ctx: &AppContext,
    booking: &Booking,
    slot: &ScheduleSlot,
) -> Result<Option<i64>, ApiError> {
    let Some(current) = booking.technician_id else {
        return Ok(None);
    };
    if booking.status != BookingStatus::Assigned {
        return Ok(None);
    }

    let busy: Vec<i64> = ctx.store().await.busy_technicians(
        slot.date,
        slot.time_slot.as_deref(),
        booking.booking_id,
    )?;
    if !busy.contains(&current) {
        return Ok(None);
    }

    let criteria: MatchCriteria = busy.into_iter().fold(
        MatchCriteria::for_service(&booking.service_type, ctx.config().match_radius_meters)
            .near(booking.location)
            .excluding(current),
        MatchCriteria::excluding,
    );
    let replacement: Option<ScoredTechnician> = find_best_match(ctx, &criteria).await?;
    match replacement {
        Some(scored) => {
            info!(
                booking_id = booking.booking_id,
                previous_technician_id = current,
                technician_id = scored.technician.technician_id,
                "Reassigning technician for reschedule"
            );
            Ok(Some(scored.technician.technician_id))
        }
        None => Err(ApiError::conflict(format!(
            "Technician is already booked on {} and no replacement is available",
            describe(slot)
        ))),
    }
}
