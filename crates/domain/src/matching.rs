// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Technician eligibility filtering and ranking.

use crate::types::{GeoPoint, Technician, VerificationStatus};
use num_traits::ToPrimitive;
use serde::Serialize;

const RATING_WEIGHT: f64 = 0.5;
const EXPERIENCE_WEIGHT: f64 = 0.2;
const COMPLETED_WEIGHT: f64 = 0.2;
const REVIEWS_WEIGHT: f64 = 0.1;

const RATING_CEILING: f64 = 5.0;
const EXPERIENCE_CEILING: f64 = 20.0;
const COMPLETED_CEILING: f64 = 200.0;
const REVIEWS_CEILING: f64 = 100.0;

/// What a job needs from a technician.
#[derive(Debug, Clone, Default)]
pub struct MatchCriteria {
    pub service_type: String,
    pub location: Option<GeoPoint>,
    pub radius_meters: f64,
    /// Technicians that must not be returned (e.g. the one being replaced).
    pub exclude: Vec<i64>,
}

impl MatchCriteria {
    #[must_use]
    pub fn for_service(service_type: &str, radius_meters: f64) -> Self {
        Self {
            service_type: service_type.to_string(),
            location: None,
            radius_meters,
            exclude: Vec::new(),
        }
    }

    #[must_use]
    pub const fn near(mut self, location: Option<GeoPoint>) -> Self {
        self.location = location;
        self
    }

    #[must_use]
    pub fn excluding(mut self, technician_id: i64) -> Self {
        self.exclude.push(technician_id);
        self
    }
}

/// A candidate with its ranking score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTechnician {
    pub technician: Technician,
    pub score: f64,
}

/// `min(value / ceiling, 1)`.
#[must_use]
pub fn normalize(value: f64, ceiling: f64) -> f64 {
    if ceiling <= 0.0 {
        return 0.0;
    }
    (value / ceiling).clamp(0.0, 1.0)
}

fn count(value: u32) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Weighted score in `[0, 1]`.
#[must_use]
pub fn score_technician(technician: &Technician) -> f64 {
    RATING_WEIGHT * normalize(technician.average_rating, RATING_CEILING)
        + EXPERIENCE_WEIGHT * normalize(count(technician.experience_years), EXPERIENCE_CEILING)
        + COMPLETED_WEIGHT * normalize(count(technician.completed_repairs), COMPLETED_CEILING)
        + REVIEWS_WEIGHT * normalize(count(technician.total_reviews), REVIEWS_CEILING)
}

/// Returns true if `technician` may take a job matching `criteria`.
///
/// When the criteria carry a location, technicians without one are not
/// eligible.
#[must_use]
pub fn is_eligible(technician: &Technician, criteria: &MatchCriteria) -> bool {
    if technician.verification_status != VerificationStatus::Approved
        || !technician.is_available
        || !technician.is_online
        || !technician.specializes_in(&criteria.service_type)
        || criteria.exclude.contains(&technician.technician_id)
    {
        return false;
    }

    match (criteria.location, technician.location) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(job), Some(tech)) => job.distance_meters(&tech) <= criteria.radius_meters,
    }
}

/// Filters and ranks candidates, best first. Equal scores keep input order.
#[must_use]
pub fn rank_technicians(
    candidates: Vec<Technician>,
    criteria: &MatchCriteria,
) -> Vec<ScoredTechnician> {
    let mut ranked: Vec<ScoredTechnician> = candidates
        .into_iter()
        .filter(|t| is_eligible(t, criteria))
        .map(|technician| ScoredTechnician {
            score: score_technician(&technician),
            technician,
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// The top-ranked candidate, if any.
#[must_use]
pub fn best_match(
    candidates: Vec<Technician>,
    criteria: &MatchCriteria,
) -> Option<ScoredTechnician> {
    rank_technicians(candidates, criteria).into_iter().next()
}
