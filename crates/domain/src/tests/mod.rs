// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod pricing_tests;

use crate::{GeoPoint, Technician, VerificationStatus};
use time::OffsetDateTime;

pub fn create_test_technician(technician_id: i64, specializations: &[&str]) -> Technician {
    Technician {
        technician_id,
        user_id: technician_id + 1000,
        specializations: specializations.iter().map(|s| (*s).to_string()).collect(),
        experience_years: 5,
        completed_repairs: 10,
        average_rating: 4.0,
        total_reviews: 10,
        is_available: true,
        is_online: true,
        verification_status: VerificationStatus::Approved,
        commission_rate: None,
        location: Some(GeoPoint::new(12.9716, 77.5946)),
        created_at: OffsetDateTime::UNIX_EPOCH,
    }
}
