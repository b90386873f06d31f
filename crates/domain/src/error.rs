// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use thiserror::Error;

/// Errors that can occur during domain validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// A stored or submitted enum value could not be parsed.
    #[error("Invalid {kind}: '{value}'")]
    InvalidEnumValue {
        /// The kind of value (e.g. "booking status", "urgency").
        kind: &'static str,
        /// The rejected raw value.
        value: String,
    },
    /// The requested status change is not an edge of the booking lifecycle.
    #[error("Cannot transition booking from {from} to {to}")]
    InvalidStatusTransition {
        /// The current status.
        from: String,
        /// The requested status.
        to: String,
    },
    /// The edge exists but the acting role may not traverse it.
    #[error("Role '{role}' may not move a booking from {from} to {to}")]
    TransitionNotPermitted {
        /// The current status.
        from: String,
        /// The requested status.
        to: String,
        /// The acting role.
        role: String,
    },
    /// No source status allows the acting role to reach the target.
    #[error("Role '{role}' cannot set booking status to {target}")]
    UnreachableStatus {
        /// The requested status.
        target: String,
        /// The acting role.
        role: String,
    },
    /// A date string could not be parsed.
    #[error("Failed to parse date '{value}': {reason}")]
    InvalidDate {
        /// The raw input.
        value: String,
        /// The parser message.
        reason: String,
    },
    /// A scheduling date is not strictly in the future.
    #[error("Date {date} must be in the future")]
    DateNotInFuture {
        /// The rejected date.
        date: time::Date,
    },
    /// The booking has been rescheduled the maximum number of times.
    #[error(
        "Booking has already been rescheduled {max} times; cancel and create a new booking instead"
    )]
    RescheduleLimitReached {
        /// The configured maximum.
        max: u32,
    },
    /// An amount that must be positive was zero or negative.
    #[error("{field} must be positive, got {amount}")]
    NonPositiveAmount {
        /// The offending field.
        field: &'static str,
        /// The rejected amount.
        amount: i64,
    },
    /// A computed amount could not be represented.
    #[error("Amount overflow while computing {operation}")]
    AmountOverflow {
        /// What was being computed.
        operation: &'static str,
    },
    /// A rate lies outside `[0, 1]`.
    #[error("Invalid rate {rate}: must be between 0 and 1")]
    InvalidRate {
        /// The rejected rate.
        rate: f64,
    },
    /// A free-form field failed validation.
    #[error("Invalid {field}: {message}")]
    InvalidField {
        /// The field name.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },
    /// The requested earning status change is not permitted.
    #[error("Cannot transition earning from {from} to {to}")]
    InvalidEarningTransition {
        /// The current status.
        from: String,
        /// The requested status.
        to: String,
    },
    /// The requested verification change is not permitted.
    #[error("Cannot change technician verification from {from} to {to}")]
    InvalidVerificationTransition {
        /// The current status.
        from: String,
        /// The requested status.
        to: String,
    },
}
