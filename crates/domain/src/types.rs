// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::booking_status::BookingStatus;
use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::{Date, OffsetDateTime};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// How quickly the customer needs the repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
    Emergency,
}

impl Urgency {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Urgent => "urgent",
            Self::Emergency => "emergency",
        }
    }
}

impl FromStr for Urgency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "urgent" => Ok(Self::Urgent),
            "emergency" => Ok(Self::Emergency),
            _ => Err(DomainError::InvalidEnumValue {
                kind: "urgency",
                value: s.to_string(),
            }),
        }
    }
}

/// Payment state as seen from the booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially_refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            "partially_refunded" => Ok(Self::PartiallyRefunded),
            _ => Err(DomainError::InvalidEnumValue {
                kind: "payment status",
                value: s.to_string(),
            }),
        }
    }
}

/// Admin verification state of a technician profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl VerificationStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Validates an admin verification decision.
    ///
    /// Pending profiles may be approved or rejected; rejected profiles may
    /// later be approved. Approval is final.
    ///
    /// # Errors
    ///
    /// Returns `InvalidVerificationTransition` for any other change.
    pub fn validate_transition(&self, target: Self) -> Result<(), DomainError> {
        let valid = matches!(
            (self, target),
            (Self::Pending, Self::Approved | Self::Rejected) | (Self::Rejected, Self::Approved)
        );
        if valid {
            Ok(())
        } else {
            Err(DomainError::InvalidVerificationTransition {
                from: self.as_str().to_string(),
                to: target.as_str().to_string(),
            })
        }
    }
}

impl FromStr for VerificationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(DomainError::InvalidEnumValue {
                kind: "verification status",
                value: s.to_string(),
            }),
        }
    }
}

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in meters (haversine).
    #[must_use]
    pub fn distance_meters(&self, other: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * Self::EARTH_RADIUS_METERS * a.sqrt().asin()
    }
}

/// Device metadata supplied by the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeviceInfo {
    pub brand: Option<String>,
    pub model: Option<String>,
}

/// Price breakdown frozen onto a booking at creation (or reschedule) time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    pub base_price: i64,
    pub urgency: Urgency,
    pub multiplier: f64,
    pub estimated_cost: i64,
    /// The pricing rule used, or `None` when fallback pricing applied.
    pub rule_id: Option<i64>,
}

/// One append-only entry of a booking's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub changed_at: OffsetDateTime,
    pub changed_by: i64,
    pub note: Option<String>,
}

/// A date and optional time slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub time_slot: Option<String>,
}

/// One append-only entry of a booking's reschedule history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleEntry {
    pub from: ScheduleSlot,
    pub to: ScheduleSlot,
    pub reason: Option<String>,
    pub rescheduled_by: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub rescheduled_at: OffsetDateTime,
}

/// The central booking aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: i64,
    pub user_id: i64,
    pub technician_id: Option<i64>,
    pub service_type: String,
    pub issue_type: String,
    pub urgency: Urgency,
    pub description: String,
    pub device: DeviceInfo,
    pub location: Option<GeoPoint>,
    #[serde(with = "iso_date")]
    pub preferred_date: Date,
    pub time_slot: Option<String>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub is_paid: bool,
    pub estimated_cost: i64,
    pub final_cost: Option<i64>,
    pub pricing: PricingSnapshot,
    pub status_history: Vec<StatusHistoryEntry>,
    pub reschedule_history: Vec<RescheduleEntry>,
    pub reschedule_count: u32,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub cancelled_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Booking {
    /// The amount the customer is charged: the final cost when set, else
    /// the estimate.
    #[must_use]
    pub fn billable_amount(&self) -> i64 {
        self.final_cost.unwrap_or(self.estimated_cost)
    }

    /// The status recorded just before the latest history entry, if any.
    #[must_use]
    pub fn previous_status(&self) -> Option<&str> {
        let len = self.status_history.len();
        if len < 2 {
            return None;
        }
        self.status_history
            .get(len - 2)
            .map(|entry| entry.status.as_str())
    }

    /// The current schedule as a slot.
    #[must_use]
    pub fn schedule(&self) -> ScheduleSlot {
        ScheduleSlot {
            date: self.preferred_date,
            time_slot: self.time_slot.clone(),
        }
    }
}

/// A technician profile, independent of the underlying user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technician {
    pub technician_id: i64,
    pub user_id: i64,
    pub specializations: Vec<String>,
    pub experience_years: u32,
    pub completed_repairs: u32,
    pub average_rating: f64,
    pub total_reviews: u32,
    pub is_available: bool,
    pub is_online: bool,
    pub verification_status: VerificationStatus,
    pub commission_rate: Option<f64>,
    pub location: Option<GeoPoint>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Technician {
    /// Case-insensitive exact match against the specialization set.
    #[must_use]
    pub fn specializes_in(&self, service_type: &str) -> bool {
        self.specializations
            .iter()
            .any(|s| s.eq_ignore_ascii_case(service_type))
    }

    #[must_use]
    pub fn summary(&self) -> TechnicianSummary {
        TechnicianSummary {
            technician_id: self.technician_id,
            user_id: self.user_id,
            specializations: self.specializations.clone(),
            experience_years: self.experience_years,
            average_rating: self.average_rating,
            total_reviews: self.total_reviews,
        }
    }
}

/// The technician fields shown alongside a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicianSummary {
    pub technician_id: i64,
    pub user_id: i64,
    pub specializations: Vec<String>,
    pub experience_years: u32,
    pub average_rating: f64,
    pub total_reviews: u32,
}
