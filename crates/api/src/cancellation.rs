// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Cancellation saga.
//!
//! Step 1 (the status flip) is the only step that can fail the operation.
//! Voiding in-flight payments, the refund, earning reversal, and technician
//! release each run on their own; a failure is logged and shows up as an
//! empty field in the result.

use repairhub_domain::{
    ActorRole, Booking, BookingStatus, Payment, PaymentRecordStatus, cancellable_statuses,
};
use repairhub_persistence::{BOOKING_CANCELLED_REASON, BookingGuard, BookingPatch, HistoryNote};
use tracing::{error, info, warn};

use crate::auth::AuthenticatedActor;
use crate::bookings::{load_booking, release_technician, technician_user_id};
use crate::context::AppContext;
use crate::earnings::reverse_earning_for_booking;
use crate::error::ApiError;
use crate::events::{BookingEvent, BookingEventKind};
use crate::payments::process_refund;
use crate::request_response::{CancelBookingRequest, CancellationResult};

const DEFAULT_REASON: &str = "No reason provided";

/// Cancels a booking and unwinds its financial and assignment state.
///
/// # Errors
///
/// Only the status flip can fail: `Forbidden` for roles that may not
/// cancel, and on a miss `NotFound`, `Forbidden` for another user's
/// booking, or `Conflict` if it is already cancelled or in a status the
/// caller cannot cancel from.
pub async fn cancel_booking(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    booking_id: i64,
    request: CancelBookingRequest,
) -> Result<CancellationResult, ApiError> {
    let statuses: Vec<BookingStatus> = cancellable_statuses(actor.role);
    if statuses.is_empty() {
        return Err(ApiError::forbidden(format!(
            "Role '{}' may not cancel bookings",
            actor.role
        )));
    }
    let reason: String = request
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_REASON.to_string());

    // Step 1: status flip.
    let booking: Booking = flip_to_cancelled(ctx, actor, booking_id, &statuses, &reason).await?;
    info!(
        booking_id,
        actor_id = actor.user_id,
        reason = %reason,
        "Booking cancelled"
    );

    // Step 2: payments still pending or processing can no longer complete.
    let voided_payments: Vec<i64> = void_in_flight_payments(ctx, booking_id).await;

    // Step 3: refund.
    let refund: Option<Payment> = if booking.is_paid {
        refund_for_cancellation(ctx, booking_id, &reason, actor.user_id).await
    } else {
        None
    };

    // Step 4: earning reversal.
    let reversal_note: String = format!("Reversed on cancellation: {reason}");
    let earning_reversed: bool =
        match reverse_earning_for_booking(ctx, booking_id, &reversal_note).await {
            Ok(reversed) => reversed.is_some(),
            Err(e) => {
                error!(booking_id, error = %e, "Earning reversal failed");
                false
            }
        };

    // Step 5: technician release.
    let technician_released: bool = match booking.technician_id {
        Some(technician_id) => release_technician(ctx, technician_id).await,
        None => false,
    };

    // Step 6: event.
    let technician_user: Option<i64> = technician_user_id(ctx, booking.technician_id).await;
    let latest: Booking = match load_booking(ctx, booking_id).await {
        Ok(latest) => latest,
        Err(e) => {
            warn!(booking_id, error = %e, "Could not re-read cancelled booking");
            booking
        }
    };
    ctx.publish(BookingEvent::new(
        BookingEventKind::Cancelled,
        &latest,
        technician_user,
        actor.user_id,
        latest.previous_status().map(str::to_string),
    ));

    Ok(CancellationResult {
        booking: latest,
        voided_payments,
        refund,
        earning_reversed,
        technician_released,
    })
}

async fn flip_to_cancelled(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    booking_id: i64,
    statuses: &[BookingStatus],
    reason: &str,
) -> Result<Booking, ApiError> {
    let now = AppContext::now();
    let mut guard = BookingGuard::new(booking_id, statuses);
    if actor.role == ActorRole::User {
        guard = guard.owned_by(actor.user_id);
    }
    let patch = BookingPatch {
        status: Some(BookingStatus::Cancelled),
        cancelled_at: Some(now),
        cancellation_reason: Some(reason.to_string()),
        history: vec![HistoryNote::new(
            BookingStatus::Cancelled.as_str(),
            actor.user_id,
            Some(reason.to_string()),
        )],
        ..BookingPatch::default()
    };

    let updated: Option<Booking> = ctx.store().await.update_booking(&guard, &patch, now)?;
    if let Some(booking) = updated {
        return Ok(booking);
    }

    let current: Booking = load_booking(ctx, booking_id).await?;
    Err(if actor.role == ActorRole::User && current.user_id != actor.user_id {
        ApiError::forbidden("Not authorized to cancel this booking")
    } else if current.status == BookingStatus::Cancelled {
        ApiError::conflict("Booking is already cancelled")
    } else {
        ApiError::conflict(format!(
            "Cannot cancel a booking in status {} as {}",
            current.status, actor.role
        ))
    })
}

async fn void_in_flight_payments(ctx: &AppContext, booking_id: i64) -> Vec<i64> {
    let result = ctx.store().await.void_in_flight_payments(
        booking_id,
        BOOKING_CANCELLED_REASON,
        AppContext::now(),
    );
    match result {
        Ok(voided) => voided,
        Err(e) => {
            error!(booking_id, error = %e, "Failed to void in-flight payments");
            Vec::new()
        }
    }
}

/// Refunds whatever balance remains on the booking's completed payment.
async fn refund_for_cancellation(
    ctx: &AppContext,
    booking_id: i64,
    reason: &str,
    actor_id: i64,
) -> Option<Payment> {
    let lookup = ctx
        .store()
        .await
        .latest_payment_for_booking(booking_id, &PaymentRecordStatus::REFUNDABLE);
    let payment: Payment = match lookup {
        Ok(Some(payment)) => payment,
        Ok(None) => {
            warn!(
                booking_id,
                "Booking is marked paid but has no refundable payment"
            );
            return None;
        }
        Err(e) => {
            error!(booking_id, error = %e, "Failed to load payment for refund");
            return None;
        }
    };

    let amount: i64 = payment.refundable_balance();
    if amount <= 0 {
        return None;
    }

    let refund_reason: String = format!("Cancellation refund: {reason}");
    match process_refund(ctx, payment.payment_id, amount, &refund_reason, actor_id).await {
        Ok(result) => Some(result.payment),
        Err(e) => {
            error!(
                booking_id,
                payment_id = payment.payment_id,
                amount,
                error = %e,
                "Cancellation refund failed; booking stays cancelled"
            );
            None
        }
    }
}
