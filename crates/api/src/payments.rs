// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Payment service: initiation, two-phase confirmation, and refunds.
//!
//! Every state change of a payment record is a conditional update. Gateway
//! calls happen between storage calls, never while the store is locked.

use repairhub_domain::{Booking, BookingStatus, Payment, PaymentRecordStatus};
use repairhub_persistence::{NewPayment, PaymentCompletion, PersistenceError};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::{AuthenticatedActor, AuthorizationService};
use crate::context::AppContext;
use crate::error::ApiError;
use crate::gateway::{
    GatewayError, GatewayOrder, OrderRequest, PaymentGateway, RefundRequest, VerifyRequest,
};
use crate::request_response::{
    ConfirmPaymentRequest, InitiatePaymentRequest, PaymentInitiation, RefundPaymentRequest,
    RefundResult,
};

/// Creates a gateway order and a pending payment for a booking.
///
/// # Errors
///
/// Returns `NotFound` for an unknown booking, `Forbidden` if the actor is
/// neither the owner nor an admin, `Conflict` if the booking is cancelled,
/// already paid, or has a payment in flight, and `Gateway` if the provider
/// is not configured or declines the order.
pub async fn initiate_payment(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    request: InitiatePaymentRequest,
) -> Result<PaymentInitiation, ApiError> {
    let booking_id: i64 = request.booking_id;
    let booking: Booking = ctx
        .store()
        .await
        .get_booking(booking_id)?
        .ok_or_else(|| ApiError::not_found("Booking", booking_id))?;

    if booking.user_id != actor.user_id && !actor.is_admin() {
        return Err(ApiError::forbidden(
            "Not authorized to pay for this booking",
        ));
    }
    if booking.status == BookingStatus::Cancelled {
        return Err(ApiError::conflict("Cannot pay for a cancelled booking"));
    }
    if booking.is_paid {
        return Err(ApiError::conflict("Booking is already paid"));
    }
    let in_flight: Option<Payment> = ctx
        .store()
        .await
        .latest_payment_for_booking(booking_id, &PaymentRecordStatus::IN_FLIGHT)?;
    if let Some(existing) = in_flight {
        return Err(ApiError::conflict(format!(
            "Payment {} is already in progress for this booking",
            existing.payment_id
        )));
    }

    let gateway: Arc<dyn PaymentGateway> = ctx.gateways().resolve(request.gateway.as_deref())?;
    let currency: String = ctx.config().default_currency.clone();
    let order: GatewayOrder = gateway
        .create_order(&OrderRequest {
            amount: booking.billable_amount(),
            currency: currency.clone(),
            booking_ref: format!("booking_{booking_id}"),
        })
        .await?;

    let new_payment = NewPayment {
        booking_id,
        user_id: booking.user_id,
        amount: order.amount,
        currency,
        method: request.method,
        gateway: gateway.name().to_string(),
        gateway_order_id: order.order_ref.clone(),
    };
    let now = AppContext::now();
    let inserted = ctx.store().await.insert_payment(&new_payment, now);
    let payment: Payment = match inserted {
        Ok(payment) => payment,
        Err(PersistenceError::UniqueViolation(_)) => {
            return Err(ApiError::conflict(
                "A payment is already in progress for this booking",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        booking_id,
        payment_id = payment.payment_id,
        amount = payment.amount,
        gateway = %payment.gateway,
        "Payment initiated"
    );
    Ok(PaymentInitiation { payment, order })
}

/// Confirms a payment against the gateway and marks the booking paid.
///
/// The payment is first claimed (`pending|processing -> processing`) so a
/// concurrent confirmation of the same payment loses with `Conflict`.
///
/// # Errors
///
/// Returns `NotFound`, `Forbidden`, `Conflict` if the payment is no longer
/// confirmable or its booking was cancelled, `Unprocessable` if the
/// signature does not verify, and `Gateway` if the provider fails.
pub async fn confirm_payment(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    payment_id: i64,
    request: ConfirmPaymentRequest,
) -> Result<Payment, ApiError> {
    let payment: Payment = ctx
        .store()
        .await
        .get_payment(payment_id)?
        .ok_or_else(|| ApiError::not_found("Payment", payment_id))?;
    if payment.user_id != actor.user_id && !actor.is_admin() {
        return Err(ApiError::forbidden(
            "Not authorized to confirm this payment",
        ));
    }

    let now = AppContext::now();
    let Some(claimed) = ctx.store().await.claim_payment(payment_id, now)? else {
        return Err(ApiError::conflict(format!(
            "Payment {payment_id} is {} and cannot be confirmed",
            payment.status.as_str()
        )));
    };

    let gateway: Arc<dyn PaymentGateway> = ctx.gateways().resolve(Some(&claimed.gateway))?;
    let verify = VerifyRequest {
        payment_ref: request.gateway_payment_id.clone(),
        order_ref: claimed.gateway_order_id.clone().unwrap_or_default(),
        signature: request.signature,
    };

    let verified: bool = match gateway.verify_payment(&verify).await {
        Ok(verification) => verification.verified,
        Err(e) => {
            mark_failed(ctx, payment_id, &e.to_string()).await;
            return Err(e.into());
        }
    };
    if !verified {
        mark_failed(ctx, payment_id, "signature verification failed").await;
        return Err(ApiError::Unprocessable {
            rule: String::from("payment_verification"),
            message: String::from("Payment signature could not be verified"),
        });
    }

    let completion: PaymentCompletion = ctx.store().await.complete_payment(
        payment_id,
        &request.gateway_payment_id,
        AppContext::now(),
    )?;
    let completed: Payment = match completion {
        PaymentCompletion::Completed(payment) => payment,
        PaymentCompletion::BookingCancelled(voided) => {
            warn!(
                payment_id,
                booking_id = voided.booking_id,
                "Booking cancelled during confirmation; payment voided"
            );
            return Err(ApiError::conflict(format!(
                "Booking {} was cancelled; payment {payment_id} was voided",
                voided.booking_id
            )));
        }
        PaymentCompletion::NotProcessing => {
            return Err(ApiError::conflict(format!(
                "Payment {payment_id} changed during confirmation"
            )));
        }
    };

    info!(
        payment_id,
        booking_id = completed.booking_id,
        actor_id = actor.user_id,
        "Payment completed"
    );
    Ok(completed)
}

async fn mark_failed(ctx: &AppContext, payment_id: i64, reason: &str) {
    match ctx
        .store()
        .await
        .fail_payment(payment_id, reason, AppContext::now())
    {
        Ok(Some(_)) => warn!(payment_id, reason, "Payment failed"),
        Ok(None) => warn!(
            payment_id,
            "Payment was no longer processing when marking failed"
        ),
        Err(e) => error!(payment_id, error = %e, "Failed to mark payment failed"),
    }
}

/// Admin: refund part or all of a completed payment.
///
/// # Errors
///
/// Returns `Forbidden` for non-admins, `Validation` for a non-positive
/// amount, `NotFound`, `Conflict` if the payment is not refundable,
/// `Unprocessable` if the amount exceeds the refundable balance, and
/// `Gateway` if the provider fails.
pub async fn refund_payment(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    payment_id: i64,
    request: RefundPaymentRequest,
) -> Result<RefundResult, ApiError> {
    AuthorizationService::require_admin(actor, "refund_payment")?;
    process_refund(
        ctx,
        payment_id,
        request.amount,
        &request.reason,
        actor.user_id,
    )
    .await
}

/// Reserves refund capacity, calls the gateway, then finalizes or releases
/// the reservation.
pub(crate) async fn process_refund(
    ctx: &AppContext,
    payment_id: i64,
    amount: i64,
    reason: &str,
    processed_by: i64,
) -> Result<RefundResult, ApiError> {
    if amount <= 0 {
        return Err(ApiError::validation(
            "amount",
            format!("must be positive, got {amount}"),
        ));
    }

    let reserved: Option<(Payment, i64)> = ctx.store().await.reserve_refund(
        payment_id,
        amount,
        reason,
        processed_by,
        AppContext::now(),
    )?;
    let Some((payment, refund_id)) = reserved else {
        return Err(diagnose_refund_miss(ctx, payment_id, amount).await);
    };

    let gateway: Arc<dyn PaymentGateway> = ctx.gateways().resolve(Some(&payment.gateway))?;
    let refund_request = RefundRequest {
        payment_ref: payment.gateway_payment_id.clone().unwrap_or_default(),
        amount,
    };

    match gateway.process_refund(&refund_request).await {
        Ok(refund) => {
            let payment: Payment = ctx.store().await.finalize_refund(
                refund_id,
                &refund.refund_ref,
                AppContext::now(),
            )?;
            info!(
                payment_id,
                refund_id,
                amount,
                refunded_amount = payment.refunded_amount,
                "Refund processed"
            );
            Ok(RefundResult {
                payment,
                refund_id,
                gateway_refund_id: refund.refund_ref,
            })
        }
        Err(gateway_error) => {
            release_reservation(ctx, refund_id).await;
            warn!(payment_id, refund_id, error = %gateway_error, "Gateway refund failed");
            Err(gateway_error_for_refund(gateway_error))
        }
    }
}

async fn release_reservation(ctx: &AppContext, refund_id: i64) {
    let now = AppContext::now();
    if let Err(e) = ctx.store().await.release_refund(refund_id, now) {
        error!(refund_id, error = %e, "Failed to release refund reservation");
    }
}

fn gateway_error_for_refund(err: GatewayError) -> ApiError {
    ApiError::Gateway {
        message: format!("Refund failed: {err}"),
    }
}

async fn diagnose_refund_miss(ctx: &AppContext, payment_id: i64, amount: i64) -> ApiError {
    let current: Option<Payment> = match ctx.store().await.get_payment(payment_id) {
        Ok(current) => current,
        Err(e) => return e.into(),
    };
    let Some(payment) = current else {
        return ApiError::not_found("Payment", payment_id);
    };
    if !PaymentRecordStatus::REFUNDABLE.contains(&payment.status) {
        return ApiError::conflict(format!(
            "Payment {payment_id} is {} and cannot be refunded",
            payment.status.as_str()
        ));
    }
    ApiError::Unprocessable {
        rule: String::from("refund_balance"),
        message: format!(
            "Refund of {amount} exceeds refundable balance {}",
            payment.refundable_balance()
        ),
    }
}
