// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Booking lifecycle states and the role-gated transition table.
//!
//! The table below is the single source of truth for which status changes
//! exist and which actor roles may perform them. Every booking operation,
//! including the generic admin status update, queries it rather than
//! re-deriving the rules.
//!
//! ```text
//! pending     -> assigned     : admin | system
//! pending     -> cancelled    : user | admin
//! assigned    -> in_progress  : technician
//! assigned    -> cancelled    : user | admin
//! in_progress -> completed    : technician | admin
//! in_progress -> cancelled    : admin
//! ```

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Booking lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created, waiting for a technician.
    Pending,
    /// A technician has been assigned.
    Assigned,
    /// The assigned technician has started work.
    InProgress,
    /// Work finished. Terminal.
    Completed,
    /// Cancelled by the owner or an admin. Terminal.
    Cancelled,
}

/// Roles an actor can hold when acting on a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// A customer who owns bookings.
    User,
    /// A service provider with a technician profile.
    Technician,
    /// A platform administrator.
    Admin,
    /// The platform itself (e.g. auto-assignment at creation).
    System,
}

/// One edge of the lifecycle graph with the roles allowed to traverse it.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub roles: &'static [ActorRole],
}

const TRANSITIONS: &[Transition] = &[
    Transition {
        from: BookingStatus::Pending,
        to: BookingStatus::Assigned,
        roles: &[ActorRole::Admin, ActorRole::System],
    },
    Transition {
        from: BookingStatus::Pending,
        to: BookingStatus::Cancelled,
        roles: &[ActorRole::User, ActorRole::Admin],
    },
    Transition {
        from: BookingStatus::Assigned,
        to: BookingStatus::InProgress,
        roles: &[ActorRole::Technician],
    },
    Transition {
        from: BookingStatus::Assigned,
        to: BookingStatus::Cancelled,
        roles: &[ActorRole::User, ActorRole::Admin],
    },
    Transition {
        from: BookingStatus::InProgress,
        to: BookingStatus::Completed,
        roles: &[ActorRole::Technician, ActorRole::Admin],
    },
    Transition {
        from: BookingStatus::InProgress,
        to: BookingStatus::Cancelled,
        roles: &[ActorRole::Admin],
    },
];

impl BookingStatus {
    /// All lifecycle states, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Assigned,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Returns the string representation used for persistence and the API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true if no transition leaves this state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns true if the lifecycle graph has an edge from `self` to `target`,
    /// regardless of role.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        transition_roles(*self, target).is_some()
    }

    /// Validates that `role` may move a booking from `self` to `target`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatusTransition` when no such edge exists and
    /// `TransitionNotPermitted` when the edge exists but excludes `role`.
    pub fn validate_transition(&self, target: Self, role: ActorRole) -> Result<(), DomainError> {
        let Some(roles) = transition_roles(*self, target) else {
            return Err(DomainError::InvalidStatusTransition {
                from: self.as_str().to_string(),
                to: target.as_str().to_string(),
            });
        };

        if roles.contains(&role) {
            Ok(())
        } else {
            Err(DomainError::TransitionNotPermitted {
                from: self.as_str().to_string(),
                to: target.as_str().to_string(),
                role: role.as_str().to_string(),
            })
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "assigned" => Ok(Self::Assigned),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(DomainError::InvalidEnumValue {
                kind: "booking status",
                value: s.to_string(),
            }),
        }
    }
}

impl ActorRole {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Technician => "technician",
            Self::Admin => "admin",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "technician" => Ok(Self::Technician),
            "admin" => Ok(Self::Admin),
            "system" => Ok(Self::System),
            _ => Err(DomainError::InvalidEnumValue {
                kind: "actor role",
                value: s.to_string(),
            }),
        }
    }
}

/// Returns the roles allowed to traverse `from -> to`, or `None` when the
/// lifecycle graph has no such edge.
#[must_use]
pub fn transition_roles(from: BookingStatus, to: BookingStatus) -> Option<&'static [ActorRole]> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == from && t.to == to)
        .map(|t| t.roles)
}

/// Returns every edge of the lifecycle graph.
#[must_use]
pub const fn transitions() -> &'static [Transition] {
    TRANSITIONS
}

/// Returns the source states from which `role` may legally reach `target`.
///
/// The result follows lifecycle order and is empty when `role` can never
/// land a booking in `target`.
#[must_use]
pub fn sources_reaching(target: BookingStatus, role: ActorRole) -> Vec<BookingStatus> {
    TRANSITIONS
        .iter()
        .filter(|t| t.to == target && t.roles.contains(&role))
        .map(|t| t.from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_round_trip() {
        for status in BookingStatus::ALL {
            match status.as_str().parse::<BookingStatus>() {
                Ok(parsed) => assert_eq!(status, parsed),
                Err(e) => panic!("Failed to parse status string: {status}: {e}"),
            }
        }
    }

    #[test]
    fn test_invalid_status_string() {
        assert!("rescheduled".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_terminal_states_have_no_outgoing_edges() {
        for from in BookingStatus::ALL.iter().filter(|s| s.is_terminal()) {
            for to in BookingStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to} must not exist");
            }
        }
    }

    #[test]
    fn test_edge_count_matches_lifecycle() {
        let edges: usize = BookingStatus::ALL
            .iter()
            .flat_map(|from| BookingStatus::ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .count();
        assert_eq!(edges, 6);
    }

    #[test]
    fn test_technician_may_start_but_not_cancel() {
        let assigned = BookingStatus::Assigned;
        assert!(
            assigned
                .validate_transition(BookingStatus::InProgress, ActorRole::Technician)
                .is_ok()
        );
        assert!(matches!(
            assigned.validate_transition(BookingStatus::Cancelled, ActorRole::Technician),
            Err(DomainError::TransitionNotPermitted { .. })
        ));
    }

    #[test]
    fn test_user_cannot_cancel_in_progress() {
        assert!(matches!(
            BookingStatus::InProgress
                .validate_transition(BookingStatus::Cancelled, ActorRole::User),
            Err(DomainError::TransitionNotPermitted { .. })
        ));
        assert!(
            BookingStatus::InProgress
                .validate_transition(BookingStatus::Cancelled, ActorRole::Admin)
                .is_ok()
        );
    }

    #[test]
    fn test_non_edge_is_invalid_transition() {
        assert!(matches!(
            BookingStatus::Pending.validate_transition(BookingStatus::Completed, ActorRole::Admin),
            Err(DomainError::InvalidStatusTransition { .. })
        ));
        assert!(matches!(
            BookingStatus::Completed.validate_transition(BookingStatus::Pending, ActorRole::Admin),
            Err(DomainError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn test_admin_sources() {
        assert_eq!(
            sources_reaching(BookingStatus::Cancelled, ActorRole::Admin),
            vec![
                BookingStatus::Pending,
                BookingStatus::Assigned,
                BookingStatus::InProgress
            ]
        );
        assert_eq!(
            sources_reaching(BookingStatus::Completed, ActorRole::Admin),
            vec![BookingStatus::InProgress]
        );
        assert_eq!(
            sources_reaching(BookingStatus::Assigned, ActorRole::Admin),
            vec![BookingStatus::Pending]
        );
        assert!(sources_reaching(BookingStatus::Pending, ActorRole::Admin).is_empty());
        assert!(sources_reaching(BookingStatus::InProgress, ActorRole::Admin).is_empty());
    }

    #[test]
    fn test_role_parsing_is_case_insensitive() {
        assert_eq!("Admin".parse::<ActorRole>(), Ok(ActorRole::Admin));
        assert_eq!("TECHNICIAN".parse::<ActorRole>(), Ok(ActorRole::Technician));
        assert!("operator".parse::<ActorRole>().is_err());
    }
}
