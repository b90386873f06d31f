// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Error types for the orchestration layer.

use repairhub_domain::DomainError;
use repairhub_persistence::PersistenceError;
use thiserror::Error;
use tracing::error;

use crate::gateway::GatewayError;

/// API-level errors.
///
/// Every variant maps to exactly one HTTP status at the server boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The entity does not exist.
    #[error("{resource} not found: {message}")]
    NotFound {
        /// The kind of entity.
        resource: String,
        /// What was looked up.
        message: String,
    },
    /// The actor's role or ownership does not allow the action.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Why the action was refused.
        message: String,
    },
    /// A state precondition failed, concurrently or otherwise.
    #[error("Conflict: {message}")]
    Conflict {
        /// The precondition that did not hold.
        message: String,
    },
    /// The action is blocked on an unpaid booking.
    #[error("Payment required: {message}")]
    PaymentRequired {
        /// What is unpaid.
        message: String,
    },
    /// Well-formed input rejected by a domain rule.
    #[error("Domain rule violation ({rule}): {message}")]
    Unprocessable {
        /// The rule that was violated.
        rule: String,
        /// A human-readable description of the violation.
        message: String,
    },
    /// Malformed input.
    #[error("Invalid input for field '{field}': {message}")]
    Validation {
        /// The field that was invalid.
        field: String,
        /// A human-readable description of the error.
        message: String,
    },
    /// The payment provider failed or is not configured.
    #[error("Payment gateway error: {message}")]
    Gateway {
        /// The provider's failure.
        message: String,
    },
    /// Storage or another internal failure.
    #[error("Internal error: {message}")]
    Internal {
        /// A description of the internal error.
        message: String,
    },
}

impl ApiError {
    pub(crate) fn not_found(resource: &str, id: i64) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            message: format!("{resource} {id} does not exist"),
        }
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Translates a domain error into an API error.
///
/// Each domain error is mapped explicitly so that domain types never reach
/// the HTTP boundary.
#[must_use]
pub fn translate_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::InvalidEnumValue { kind, value } => ApiError::Validation {
            field: kind.replace(' ', "_"),
            message: format!("'{value}' is not a valid {kind}"),
        },
        DomainError::InvalidStatusTransition { from, to } => ApiError::Conflict {
            message: format!("Cannot transition booking from {from} to {to}"),
        },
        DomainError::TransitionNotPermitted { from, to, role } => ApiError::Forbidden {
            message: format!("Role '{role}' may not move a booking from {from} to {to}"),
        },
        DomainError::UnreachableStatus { target, role } => ApiError::Validation {
            field: String::from("status"),
            message: format!("Role '{role}' cannot set booking status to {target}"),
        },
        DomainError::InvalidDate { value, reason } => ApiError::Validation {
            field: String::from("date"),
            message: format!("Failed to parse date '{value}': {reason}"),
        },
        DomainError::DateNotInFuture { date } => ApiError::Validation {
            field: String::from("date"),
            message: format!("Date {date} must be in the future"),
        },
        err @ DomainError::RescheduleLimitReached { .. } => ApiError::Validation {
            field: String::from("reschedule_count"),
            message: err.to_string(),
        },
        DomainError::NonPositiveAmount { field, amount } => ApiError::Validation {
            field: field.replace(' ', "_"),
            message: format!("must be positive, got {amount}"),
        },
        DomainError::AmountOverflow { operation } => ApiError::Unprocessable {
            rule: String::from("amount_range"),
            message: format!("Amount overflow while computing {operation}"),
        },
        DomainError::InvalidRate { rate } => ApiError::Validation {
            field: String::from("commission_rate"),
            message: format!("Invalid rate {rate}: must be between 0 and 1"),
        },
        DomainError::InvalidField { field, message } => ApiError::Validation {
            field: field.to_string(),
            message,
        },
        DomainError::InvalidEarningTransition { from, to } => ApiError::Conflict {
            message: format!("Cannot transition earning from {from} to {to}"),
        },
        DomainError::InvalidVerificationTransition { from, to } => ApiError::Conflict {
            message: format!("Cannot change technician verification from {from} to {to}"),
        },
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        translate_domain_error(err)
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(what) => Self::NotFound {
                resource: String::from("Record"),
                message: what,
            },
            PersistenceError::UniqueViolation(what) => Self::Conflict {
                message: format!("Duplicate record: {what}"),
            },
            other => {
                error!(error = %other, "Persistence error");
                Self::Internal {
                    message: format!("Persistence error: {other}"),
                }
            }
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self::Gateway {
            message: err.to_string(),
        }
    }
}
