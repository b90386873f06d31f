// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Orchestration layer for the RepairHub repair marketplace.
//!
//! Operations take an `AppContext` and an `AuthenticatedActor`, apply one
//! conditional update per lifecycle change, and sequence the side effects
//! (pricing, matching, payments, earnings, availability, events) around it.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

mod auth;
mod bookings;
mod cancellation;
mod config;
mod context;
mod earnings;
mod error;
mod events;
mod gateway;
mod matcher;
mod payments;
mod pricing;
mod request_response;
mod reschedule;
mod technicians;

#[cfg(test)]
mod tests;

pub use auth::{AuthenticatedActor, AuthorizationService, authenticate};
pub use bookings::{
    assign_technician, complete_booking, create_booking, get_booking, list_bookings,
    start_booking, update_status,
};
pub use cancellation::cancel_booking;
pub use config::ServiceConfig;
pub use context::AppContext;
pub use earnings::{
    approve_earning, generate_earning, hold_earning, mark_earning_paid,
    reverse_earning_for_booking,
};
pub use error::{ApiError, translate_domain_error};
pub use events::{BookingEvent, BookingEventKind, BookingEventPublisher, BroadcastPublisher};
pub use gateway::{
    GatewayError, GatewayOrder, GatewayRefund, GatewayRegistry, MockGateway, OrderRequest,
    PaymentGateway, RefundRequest, Verification, VerifyRequest,
};
pub use matcher::{find_best_match, rank_candidates};
pub use payments::{confirm_payment, initiate_payment, refund_payment};
pub use pricing::{quote_price, upsert_pricing_rule};
pub use request_response::{
    AssignTechnicianRequest, AssignTechnicianResult, AvailabilityRequest, CancelBookingRequest,
    CancellationResult, CompleteBookingRequest, CompleteBookingResult, ConfirmPaymentRequest,
    CreateBookingRequest, CreateBookingResult, EarningActionRequest, InitiatePaymentRequest,
    PaymentInitiation, PricingRuleRequest, QuoteRequest, QuoteResponse, RefundPaymentRequest,
    RefundResult, RegisterTechnicianRequest, RescheduleBookingRequest, RescheduleResult,
    UpdateStatusRequest, UpdateTechnicianProfileRequest, VerificationRequest,
};
pub use reschedule::reschedule_booking;
pub use technicians::{
    own_profile, register_technician, set_availability, update_profile, verify_technician,
};
