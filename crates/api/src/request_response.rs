// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API request and response data transfer objects.

use repairhub_domain::{
    Booking, DeviceInfo, Earning, GeoPoint, Payment, PriceQuote, TechnicianSummary, Urgency,
    UrgencyMultipliers, VerificationStatus,
};
use serde::{Deserialize, Serialize};

use crate::gateway::GatewayOrder;

/// API request to create a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub service_type: String,
    pub issue_type: String,
    #[serde(default)]
    pub urgency: Urgency,
    pub description: String,
    #[serde(default)]
    pub device: DeviceInfo,
    pub location: Option<GeoPoint>,
    /// `YYYY-MM-DD`, strictly in the future.
    pub preferred_date: String,
    pub time_slot: Option<String>,
    pub notes: Option<String>,
}

/// API response for a created booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBookingResult {
    pub booking: Booking,
    /// True if the matcher assigned a technician at creation.
    pub auto_assigned: bool,
    pub technician: Option<TechnicianSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignTechnicianRequest {
    pub technician_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignTechnicianResult {
    pub booking: Booking,
    pub technician: TechnicianSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CompleteBookingRequest {
    pub final_cost: Option<i64>,
    pub notes: Option<String>,
}

/// API response for a completed booking.
///
/// `earning` is `None` when earning generation failed; the completion
/// itself still stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteBookingResult {
    pub booking: Booking,
    pub earning: Option<Earning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

/// Outcome of every cancellation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationResult {
    pub booking: Booking,
    /// Payments that were still pending or processing and are now failed.
    pub voided_payments: Vec<i64>,
    /// The refunded payment, or `None` if nothing was refunded.
    pub refund: Option<Payment>,
    pub earning_reversed: bool,
    pub technician_released: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleBookingRequest {
    /// `YYYY-MM-DD`, strictly in the future.
    pub new_date: String,
    pub time_slot: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescheduleResult {
    pub booking: Booking,
    pub price_changed: bool,
    pub technician_reassigned: bool,
    pub previous_technician_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiatePaymentRequest {
    pub booking_id: i64,
    pub method: Option<String>,
    /// Gateway adapter name; the configured default when absent.
    pub gateway: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInitiation {
    pub payment: Payment,
    pub order: GatewayOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub gateway_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundPaymentRequest {
    pub amount: i64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundResult {
    pub payment: Payment,
    pub refund_id: i64,
    pub gateway_refund_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterTechnicianRequest {
    pub specializations: Vec<String>,
    #[serde(default)]
    pub experience_years: u32,
    pub location: Option<GeoPoint>,
}

/// Self-service profile edits. Verification fields are not editable here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UpdateTechnicianProfileRequest {
    pub specializations: Option<Vec<String>>,
    pub experience_years: Option<u32>,
    pub is_online: Option<bool>,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub is_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub status: VerificationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRuleRequest {
    pub service_type: String,
    pub issue_type: Option<String>,
    pub base_price: i64,
    #[serde(default)]
    pub multipliers: UrgencyMultipliers,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub service_type: String,
    pub issue_type: String,
    #[serde(default)]
    pub urgency: Urgency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub quote: PriceQuote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EarningActionRequest {
    pub note: Option<String>,
}
