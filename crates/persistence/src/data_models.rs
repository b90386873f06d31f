// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Row types and the conversions between stored rows and domain values.
//!
//! Timestamps are stored as RFC 3339 text and calendar dates as
//! `YYYY-MM-DD`. Booleans are stored as `0`/`1` integers.

use crate::diesel_schema::{
    booking_reschedule_history, booking_status_history, bookings, earnings, payment_refunds,
    payments, pricing_rules, technicians,
};
use crate::error::PersistenceError;
use diesel::prelude::*;
use repairhub_domain::{
    Booking, BookingStatus, DeviceInfo, Earning, EarningStatus, GeoPoint, Payment,
    PaymentRecordStatus, PaymentStatus, PricingRule, PricingSnapshot, RefundEntry, RefundStatus,
    RescheduleEntry, ScheduleSlot, StatusHistoryEntry, Technician, Urgency, UrgencyMultipliers,
    VerificationStatus,
};
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn format_timestamp(ts: OffsetDateTime) -> Result<String, PersistenceError> {
    Ok(ts.format(&Rfc3339)?)
}

pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, PersistenceError> {
    Ok(OffsetDateTime::parse(raw, &Rfc3339)?)
}

fn parse_optional_timestamp(raw: Option<&str>) -> Result<Option<OffsetDateTime>, PersistenceError> {
    raw.map(parse_timestamp).transpose()
}

pub fn format_date(date: Date) -> Result<String, PersistenceError> {
    Ok(date.format(DATE_FORMAT)?)
}

pub fn parse_date(raw: &str) -> Result<Date, PersistenceError> {
    Ok(Date::parse(raw, DATE_FORMAT)?)
}

pub const fn to_flag(value: bool) -> i32 {
    if value { 1 } else { 0 }
}

const fn from_flag(value: i32) -> bool {
    value != 0
}

pub fn to_count(value: u32, field: &str) -> Result<i32, PersistenceError> {
    i32::try_from(value)
        .map_err(|_| PersistenceError::SerializationError(format!("{field} out of range: {value}")))
}

fn from_count(value: i32, field: &str) -> Result<u32, PersistenceError> {
    u32::try_from(value)
        .map_err(|_| PersistenceError::ReconstructionError(format!("{field} is negative: {value}")))
}

fn location(latitude: Option<f64>, longitude: Option<f64>) -> Option<GeoPoint> {
    match (latitude, longitude) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
        _ => None,
    }
}

// ============================================================================
// Bookings
// ============================================================================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BookingRow {
    pub booking_id: i64,
    pub user_id: i64,
    pub technician_id: Option<i64>,
    pub service_type: String,
    pub issue_type: String,
    pub urgency: String,
    pub description: String,
    pub device_brand: Option<String>,
    pub device_model: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub preferred_date: String,
    pub time_slot: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub is_paid: i32,
    pub estimated_cost: i64,
    pub final_cost: Option<i64>,
    pub pricing_base_price: i64,
    pub pricing_multiplier: f64,
    pub pricing_rule_id: Option<i64>,
    pub reschedule_count: i32,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = booking_status_history)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StatusHistoryRow {
    pub history_id: i64,
    pub booking_id: i64,
    pub status: String,
    pub changed_at: String,
    pub changed_by: i64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = booking_reschedule_history)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RescheduleRow {
    pub reschedule_id: i64,
    pub booking_id: i64,
    pub from_date: String,
    pub from_slot: Option<String>,
    pub to_date: String,
    pub to_slot: Option<String>,
    pub reason: Option<String>,
    pub rescheduled_by: i64,
    pub rescheduled_at: String,
}

impl StatusHistoryRow {
    fn into_domain(self) -> Result<StatusHistoryEntry, PersistenceError> {
        Ok(StatusHistoryEntry {
            status: self.status,
            changed_at: parse_timestamp(&self.changed_at)?,
            changed_by: self.changed_by,
            note: self.note,
        })
    }
}

impl RescheduleRow {
    fn into_domain(self) -> Result<RescheduleEntry, PersistenceError> {
        Ok(RescheduleEntry {
            from: ScheduleSlot {
                date: parse_date(&self.from_date)?,
                time_slot: self.from_slot,
            },
            to: ScheduleSlot {
                date: parse_date(&self.to_date)?,
                time_slot: self.to_slot,
            },
            reason: self.reason,
            rescheduled_by: self.rescheduled_by,
            rescheduled_at: parse_timestamp(&self.rescheduled_at)?,
        })
    }
}

impl BookingRow {
    pub fn into_domain(
        self,
        history: Vec<StatusHistoryRow>,
        reschedules: Vec<RescheduleRow>,
    ) -> Result<Booking, PersistenceError> {
        let urgency: Urgency = self.urgency.parse()?;
        Ok(Booking {
            booking_id: self.booking_id,
            user_id: self.user_id,
            technician_id: self.technician_id,
            service_type: self.service_type,
            issue_type: self.issue_type,
            urgency,
            description: self.description,
            device: DeviceInfo {
                brand: self.device_brand,
                model: self.device_model,
            },
            location: location(self.latitude, self.longitude),
            preferred_date: parse_date(&self.preferred_date)?,
            time_slot: self.time_slot,
            status: self.status.parse::<BookingStatus>()?,
            payment_status: self.payment_status.parse::<PaymentStatus>()?,
            is_paid: from_flag(self.is_paid),
            estimated_cost: self.estimated_cost,
            final_cost: self.final_cost,
            pricing: PricingSnapshot {
                base_price: self.pricing_base_price,
                urgency,
                multiplier: self.pricing_multiplier,
                estimated_cost: self.estimated_cost,
                rule_id: self.pricing_rule_id,
            },
            status_history: history
                .into_iter()
                .map(StatusHistoryRow::into_domain)
                .collect::<Result<_, _>>()?,
            reschedule_history: reschedules
                .into_iter()
                .map(RescheduleRow::into_domain)
                .collect::<Result<_, _>>()?,
            reschedule_count: from_count(self.reschedule_count, "reschedule_count")?,
            notes: self.notes,
            cancellation_reason: self.cancellation_reason,
            started_at: parse_optional_timestamp(self.started_at.as_deref())?,
            completed_at: parse_optional_timestamp(self.completed_at.as_deref())?,
            cancelled_at: parse_optional_timestamp(self.cancelled_at.as_deref())?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bookings)]
pub struct NewBookingRow {
    pub user_id: i64,
    pub technician_id: Option<i64>,
    pub service_type: String,
    pub issue_type: String,
    pub urgency: String,
    pub description: String,
    pub device_brand: Option<String>,
    pub device_model: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub preferred_date: String,
    pub time_slot: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub is_paid: i32,
    pub estimated_cost: i64,
    pub pricing_base_price: i64,
    pub pricing_multiplier: f64,
    pub pricing_rule_id: Option<i64>,
    pub reschedule_count: i32,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = booking_status_history)]
pub struct NewStatusHistoryRow {
    pub booking_id: i64,
    pub status: String,
    pub changed_at: String,
    pub changed_by: i64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = booking_reschedule_history)]
pub struct NewRescheduleRow {
    pub booking_id: i64,
    pub from_date: String,
    pub from_slot: Option<String>,
    pub to_date: String,
    pub to_slot: Option<String>,
    pub reason: Option<String>,
    pub rescheduled_by: i64,
    pub rescheduled_at: String,
}

/// Column updates applied by a conditional booking update. `None` leaves a
/// column untouched.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = bookings)]
pub struct BookingChangeset {
    pub status: Option<String>,
    pub technician_id: Option<i64>,
    pub payment_status: Option<String>,
    pub is_paid: Option<i32>,
    pub final_cost: Option<i64>,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub preferred_date: Option<String>,
    pub time_slot: Option<Option<String>>,
    pub estimated_cost: Option<i64>,
    pub pricing_base_price: Option<i64>,
    pub pricing_multiplier: Option<f64>,
    pub pricing_rule_id: Option<Option<i64>>,
    pub updated_at: String,
}

// ============================================================================
// Technicians
// ============================================================================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = technicians)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TechnicianRow {
    pub technician_id: i64,
    pub user_id: i64,
    pub specializations: String,
    pub experience_years: i32,
    pub completed_repairs: i32,
    pub average_rating: f64,
    pub total_reviews: i32,
    pub is_available: i32,
    pub is_online: i32,
    pub verification_status: String,
    pub commission_rate: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl TechnicianRow {
    pub fn into_domain(self) -> Result<Technician, PersistenceError> {
        Ok(Technician {
            technician_id: self.technician_id,
            user_id: self.user_id,
            specializations: serde_json::from_str(&self.specializations)?,
            experience_years: from_count(self.experience_years, "experience_years")?,
            completed_repairs: from_count(self.completed_repairs, "completed_repairs")?,
            average_rating: self.average_rating,
            total_reviews: from_count(self.total_reviews, "total_reviews")?,
            is_available: from_flag(self.is_available),
            is_online: from_flag(self.is_online),
            verification_status: self.verification_status.parse::<VerificationStatus>()?,
            commission_rate: self.commission_rate,
            location: location(self.latitude, self.longitude),
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = technicians)]
pub struct NewTechnicianRow {
    pub user_id: i64,
    pub specializations: String,
    pub experience_years: i32,
    pub completed_repairs: i32,
    pub average_rating: f64,
    pub total_reviews: i32,
    pub is_available: i32,
    pub is_online: i32,
    pub verification_status: String,
    pub commission_rate: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Self-service profile fields. Verification fields are deliberately absent.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = technicians)]
pub struct TechnicianChangeset {
    pub specializations: Option<String>,
    pub experience_years: Option<i32>,
    pub is_online: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub updated_at: String,
}

// ============================================================================
// Payments
// ============================================================================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PaymentRow {
    pub payment_id: i64,
    pub booking_id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub currency: String,
    pub refunded_amount: i64,
    pub status: String,
    pub method: Option<String>,
    pub gateway: String,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = payment_refunds)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RefundRow {
    pub refund_id: i64,
    pub payment_id: i64,
    pub amount: i64,
    pub reason: String,
    pub status: String,
    pub gateway_refund_id: Option<String>,
    pub processed_by: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl RefundRow {
    fn into_domain(self) -> Result<RefundEntry, PersistenceError> {
        Ok(RefundEntry {
            refund_id: self.refund_id,
            amount: self.amount,
            reason: self.reason,
            status: self.status.parse::<RefundStatus>()?,
            gateway_refund_id: self.gateway_refund_id,
            processed_by: self.processed_by,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl PaymentRow {
    pub fn into_domain(self, refunds: Vec<RefundRow>) -> Result<Payment, PersistenceError> {
        Ok(Payment {
            payment_id: self.payment_id,
            booking_id: self.booking_id,
            user_id: self.user_id,
            amount: self.amount,
            currency: self.currency,
            refunded_amount: self.refunded_amount,
            status: self.status.parse::<PaymentRecordStatus>()?,
            method: self.method,
            gateway: self.gateway,
            gateway_order_id: self.gateway_order_id,
            gateway_payment_id: self.gateway_payment_id,
            failure_reason: self.failure_reason,
            refunds: refunds
                .into_iter()
                .map(RefundRow::into_domain)
                .collect::<Result<_, _>>()?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPaymentRow {
    pub booking_id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub currency: String,
    pub refunded_amount: i64,
    pub status: String,
    pub method: Option<String>,
    pub gateway: String,
    pub gateway_order_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_refunds)]
pub struct NewRefundRow {
    pub payment_id: i64,
    pub amount: i64,
    pub reason: String,
    pub status: String,
    pub processed_by: i64,
    pub created_at: String,
    pub updated_at: String,
}

// ============================================================================
// Earnings
// ============================================================================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = earnings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EarningRow {
    pub earning_id: i64,
    pub booking_id: i64,
    pub technician_id: i64,
    pub technician_user_id: i64,
    pub booking_amount: i64,
    pub commission_rate: f64,
    pub commission_amount: i64,
    pub net_earning: i64,
    pub bonus: i64,
    pub deductions: i64,
    pub status: String,
    pub note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl EarningRow {
    pub fn into_domain(self) -> Result<Earning, PersistenceError> {
        Ok(Earning {
            earning_id: self.earning_id,
            booking_id: self.booking_id,
            technician_id: self.technician_id,
            technician_user_id: self.technician_user_id,
            booking_amount: self.booking_amount,
            commission_rate: self.commission_rate,
            commission_amount: self.commission_amount,
            net_earning: self.net_earning,
            bonus: self.bonus,
            deductions: self.deductions,
            status: self.status.parse::<EarningStatus>()?,
            note: self.note,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = earnings)]
pub struct NewEarningRow {
    pub booking_id: i64,
    pub technician_id: i64,
    pub technician_user_id: i64,
    pub booking_amount: i64,
    pub commission_rate: f64,
    pub commission_amount: i64,
    pub net_earning: i64,
    pub bonus: i64,
    pub deductions: i64,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

// ============================================================================
// Pricing rules
// ============================================================================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = pricing_rules)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PricingRuleRow {
    pub rule_id: i64,
    pub service_type: String,
    pub issue_type: Option<String>,
    pub base_price: i64,
    pub normal_multiplier: Option<f64>,
    pub urgent_multiplier: Option<f64>,
    pub emergency_multiplier: Option<f64>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub is_active: i32,
    pub updated_at: String,
}

impl PricingRuleRow {
    pub fn into_domain(self) -> Result<PricingRule, PersistenceError> {
        Ok(PricingRule {
            rule_id: self.rule_id,
            service_type: self.service_type,
            issue_type: self.issue_type,
            base_price: self.base_price,
            multipliers: UrgencyMultipliers {
                normal: self.normal_multiplier,
                urgent: self.urgent_multiplier,
                emergency: self.emergency_multiplier,
            },
            min_price: self.min_price,
            max_price: self.max_price,
            is_active: from_flag(self.is_active),
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

/// Insert and update shape of a pricing rule. `treat_none_as_null` makes
/// an update clear optional fields that the new definition leaves out.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = pricing_rules)]
#[diesel(treat_none_as_null = true)]
pub struct PricingRuleValues {
    pub service_type: String,
    pub issue_type: Option<String>,
    pub base_price: i64,
    pub normal_multiplier: Option<f64>,
    pub urgent_multiplier: Option<f64>,
    pub emergency_multiplier: Option<f64>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub is_active: i32,
    pub updated_at: String,
}
