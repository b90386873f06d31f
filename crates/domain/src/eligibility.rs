// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Role eligibility for the cancellation and reschedule workflows, and
//! scheduling date validation.

use crate::booking_status::{ActorRole, BookingStatus, sources_reaching};
use crate::error::DomainError;
use time::Date;
use time::macros::format_description;

/// Statuses from which `role` may cancel a booking.
///
/// Users additionally have to own the booking; that check lives with the
/// storage filter.
#[must_use]
pub fn cancellable_statuses(role: ActorRole) -> Vec<BookingStatus> {
    sources_reaching(BookingStatus::Cancelled, role)
}

/// Statuses from which `role` may reschedule a booking.
///
/// Reschedule is not a lifecycle edge; it shares the cancellation matrix.
#[must_use]
pub fn reschedulable_statuses(role: ActorRole) -> Vec<BookingStatus> {
    cancellable_statuses(role)
}

/// Parses a `YYYY-MM-DD` date and requires it to be strictly after `today`.
///
/// # Errors
///
/// Returns `InvalidDate` on a parse failure and `DateNotInFuture` when the
/// date is today or earlier.
pub fn parse_schedule_date(raw: &str, today: Date) -> Result<Date, DomainError> {
    let format = format_description!("[year]-[month]-[day]");
    let date: Date = Date::parse(raw.trim(), &format).map_err(|e| DomainError::InvalidDate {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;

    if date <= today {
        return Err(DomainError::DateNotInFuture { date });
    }
    Ok(date)
}

/// Fails once a booking has used up its reschedules.
///
/// # Errors
///
/// Returns `RescheduleLimitReached` when `current >= max`.
pub const fn ensure_reschedule_capacity(current: u32, max: u32) -> Result<(), DomainError> {
    if current >= max {
        Err(DomainError::RescheduleLimitReached { max })
    } else {
        Ok(())
    }
}
