// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Test helper functions and fixtures.

use repairhub_domain::{
    ActorRole, Booking, BookingStatus, DeviceInfo, Payment, PaymentStatus, PricingSnapshot,
    StatusHistoryEntry, Technician, Urgency, VerificationStatus,
};
use repairhub_persistence::Persistence;
use std::sync::Arc;
use time::macros::{date, datetime};
use time::{Duration, OffsetDateTime};

use crate::{
    AppContext, AuthenticatedActor, BroadcastPublisher, ConfirmPaymentRequest,
    CreateBookingRequest, GatewayRegistry, InitiatePaymentRequest, MockGateway,
    RegisterTechnicianRequest, ServiceConfig, UpdateTechnicianProfileRequest, VerificationRequest,
    confirm_payment, create_booking, initiate_payment, register_technician, update_profile,
    verify_technician,
};

pub const ADMIN_ID: i64 = 1;

/// An isolated context over an in-memory store, with handles to the mock
/// gateway and the event stream.
pub struct TestContext {
    pub ctx: AppContext,
    pub gateway: Arc<MockGateway>,
    pub events: BroadcastPublisher,
}

pub fn create_test_context() -> TestContext {
    create_test_context_with(ServiceConfig::default())
}

pub fn create_test_context_with(config: ServiceConfig) -> TestContext {
    let persistence: Persistence =
        Persistence::new_in_memory().expect("Failed to create in-memory persistence");
    let gateway: Arc<MockGateway> = Arc::new(MockGateway::new());
    let mut gateways: GatewayRegistry = GatewayRegistry::new(&config.default_gateway);
    gateways.register(gateway.clone());
    let events: BroadcastPublisher = BroadcastPublisher::new();

    TestContext {
        ctx: AppContext::new(persistence, config, gateways, Arc::new(events.clone())),
        gateway,
        events,
    }
}

pub const fn create_test_admin() -> AuthenticatedActor {
    AuthenticatedActor::new(ADMIN_ID, ActorRole::Admin)
}

pub const fn create_test_user(user_id: i64) -> AuthenticatedActor {
    AuthenticatedActor::new(user_id, ActorRole::User)
}

pub const fn create_test_technician_actor(user_id: i64) -> AuthenticatedActor {
    AuthenticatedActor::new(user_id, ActorRole::Technician)
}

/// `YYYY-MM-DD`, `days` after today.
pub fn future_date(days: i64) -> String {
    (OffsetDateTime::now_utc().date() + Duration::days(days)).to_string()
}

pub fn create_booking_request(service_type: &str) -> CreateBookingRequest {
    CreateBookingRequest {
        service_type: service_type.to_string(),
        issue_type: String::from("screen_repair"),
        urgency: Urgency::Urgent,
        description: String::from("Cracked screen"),
        device: DeviceInfo {
            brand: Some(String::from("Acme")),
            model: Some(String::from("X1")),
        },
        location: None,
        preferred_date: future_date(7),
        time_slot: None,
        notes: None,
    }
}

/// Registers a technician for `user_id`; approves and brings it online.
pub async fn create_online_technician(
    ctx: &AppContext,
    user_id: i64,
    specializations: &[&str],
) -> Technician {
    let actor = create_test_technician_actor(user_id);
    let technician = register_technician(
        ctx,
        &actor,
        RegisterTechnicianRequest {
            specializations: specializations.iter().map(ToString::to_string).collect(),
            experience_years: 5,
            location: None,
        },
    )
    .await
    .expect("Technician registration should succeed");

    verify_technician(
        ctx,
        &create_test_admin(),
        technician.technician_id,
        VerificationRequest {
            status: VerificationStatus::Approved,
        },
    )
    .await
    .expect("Technician approval should succeed");

    update_profile(
        ctx,
        &actor,
        UpdateTechnicianProfileRequest {
            is_online: Some(true),
            ..UpdateTechnicianProfileRequest::default()
        },
    )
    .await
    .expect("Going online should succeed")
}

/// Creates a booking for `user_id` and returns it.
pub async fn create_test_booking(ctx: &AppContext, user_id: i64, service_type: &str) -> Booking {
    create_booking(
        ctx,
        &create_test_user(user_id),
        create_booking_request(service_type),
    )
    .await
    .expect("Booking creation should succeed")
    .booking
}

/// Pays the booking's billable amount through the mock gateway.
pub async fn pay_for_booking(ctx: &AppContext, user_id: i64, booking_id: i64) -> Payment {
    let actor = create_test_user(user_id);
    let initiation = initiate_payment(
        ctx,
        &actor,
        InitiatePaymentRequest {
            booking_id,
            method: Some(String::from("card")),
            gateway: None,
        },
    )
    .await
    .expect("Payment initiation should succeed");

    let payment_ref = format!("pay_for_{booking_id}");
    confirm_payment(
        ctx,
        &actor,
        initiation.payment.payment_id,
        ConfirmPaymentRequest {
            signature: MockGateway::signature_for(&initiation.order.order_ref, &payment_ref),
            gateway_payment_id: payment_ref,
        },
    )
    .await
    .expect("Payment confirmation should succeed")
}

/// A standalone booking value for tests that never touch storage.
pub fn create_test_booking_snapshot() -> Booking {
    let created_at = datetime!(2026-03-01 09:00 UTC);
    Booking {
        booking_id: 1,
        user_id: 10,
        technician_id: None,
        service_type: String::from("mobile"),
        issue_type: String::from("screen_repair"),
        urgency: Urgency::Normal,
        description: String::from("Cracked screen"),
        device: DeviceInfo::default(),
        location: None,
        preferred_date: date!(2026-03-10),
        time_slot: None,
        status: BookingStatus::Pending,
        payment_status: PaymentStatus::Pending,
        is_paid: false,
        estimated_cost: 500,
        final_cost: None,
        pricing: PricingSnapshot {
            base_price: 500,
            urgency: Urgency::Normal,
            multiplier: 1.0,
            estimated_cost: 500,
            rule_id: None,
        },
        status_history: vec![StatusHistoryEntry {
            status: String::from("pending"),
            changed_at: created_at,
            changed_by: 10,
            note: None,
        }],
        reschedule_history: Vec::new(),
        reschedule_count: 0,
        notes: None,
        cancellation_reason: None,
        started_at: None,
        completed_at: None,
        cancelled_at: None,
        created_at,
        updated_at: created_at,
    }
}
