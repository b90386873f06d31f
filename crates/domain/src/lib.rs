// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

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

mod booking_status;
mod earning;
mod eligibility;
mod error;
mod matching;
mod payment;
mod pricing;
mod types;

#[cfg(test)]
mod tests;

pub use booking_status::{
    ActorRole, BookingStatus, Transition, sources_reaching, transition_roles, transitions,
};
pub use earning::{
    CommissionBreakdown, CommissionPolicy, CommissionTier, Earning, EarningStatus,
    compute_commission, validate_rate,
};
pub use eligibility::{
    cancellable_statuses, ensure_reschedule_capacity, parse_schedule_date, reschedulable_statuses,
};
pub use matching::{
    MatchCriteria, ScoredTechnician, best_match, is_eligible, normalize, rank_technicians,
    score_technician,
};
pub use payment::{Payment, PaymentRecordStatus, RefundEntry, RefundStatus};
pub use pricing::{
    FallbackPricing, PriceQuote, PricingRule, UrgencyMultipliers, estimate, resolve_price,
    select_rule,
};

// Re-export public types
pub use error::DomainError;
pub use types::{
    Booking, DeviceInfo, GeoPoint, PaymentStatus, PricingSnapshot, RescheduleEntry, ScheduleSlot,
    StatusHistoryEntry, Technician, TechnicianSummary, Urgency, VerificationStatus,
};
