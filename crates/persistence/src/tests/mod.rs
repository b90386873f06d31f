// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod initialization_tests;
mod payment_tests;

use repairhub_domain::{
    BookingStatus, CommissionBreakdown, DeviceInfo, GeoPoint, PricingSnapshot, Technician,
    Urgency, VerificationStatus,
};
use time::macros::{date, datetime};
use time::{Date, OffsetDateTime};

use crate::{HistoryNote, NewBooking, NewEarning, NewTechnician, Persistence};

pub fn create_test_persistence() -> Persistence {
    Persistence::new_in_memory().expect("Failed to create in-memory persistence")
}

pub const fn create_test_now() -> OffsetDateTime {
    datetime!(2026-03-01 09:00 UTC)
}

pub const fn create_test_date() -> Date {
    date!(2026-03-10)
}

pub fn create_test_pricing() -> PricingSnapshot {
    PricingSnapshot {
        base_price: 3000,
        urgency: Urgency::Urgent,
        multiplier: 1.5,
        estimated_cost: 4500,
        rule_id: None,
    }
}

/// A pending booking for `user_id` with one seed history entry.
pub fn create_test_booking(user_id: i64, time_slot: Option<&str>) -> NewBooking {
    NewBooking {
        user_id,
        technician_id: None,
        service_type: String::from("mobile"),
        issue_type: String::from("screen"),
        urgency: Urgency::Urgent,
        description: String::from("Cracked screen"),
        device: DeviceInfo {
            brand: Some(String::from("Acme")),
            model: Some(String::from("X1")),
        },
        location: Some(GeoPoint::new(12.97, 77.59)),
        preferred_date: create_test_date(),
        time_slot: time_slot.map(String::from),
        status: BookingStatus::Pending,
        pricing: create_test_pricing(),
        notes: None,
        history: vec![HistoryNote::new(BookingStatus::Pending.as_str(), user_id, None)],
        created_at: create_test_now(),
    }
}

/// Registers an approved, online technician for `user_id`.
pub fn create_test_technician(persistence: &mut Persistence, user_id: i64) -> Technician {
    let technician = persistence
        .insert_technician(
            &NewTechnician {
                user_id,
                specializations: vec![String::from("mobile")],
                experience_years: 4,
                location: Some(GeoPoint::new(12.97, 77.60)),
                commission_rate: None,
            },
            create_test_now(),
        )
        .expect("Failed to insert technician");
    persistence
        .update_verification_status(
            technician.technician_id,
            &[VerificationStatus::Pending],
            VerificationStatus::Approved,
            create_test_now(),
        )
        .expect("Failed to approve technician")
        .expect("Technician should be pending")
}

pub fn create_test_earning(booking_id: i64, technician: &Technician) -> NewEarning {
    NewEarning {
        booking_id,
        technician_id: technician.technician_id,
        technician_user_id: technician.user_id,
        breakdown: CommissionBreakdown {
            booking_amount: 1000,
            commission_rate: 0.15,
            commission_amount: 150,
            bonus: 0,
            deductions: 0,
            net_earning: 850,
        },
    }
}
