// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Actor identity and role checks.
//!
//! Authentication itself happens upstream. By the time a request reaches
//! this crate the caller is an `AuthenticatedActor`: a user account id and
//! the role it acts in.

use repairhub_domain::ActorRole;

use crate::error::ApiError;

/// An authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedActor {
    /// The user account id.
    pub user_id: i64,
    /// The role the actor acts in.
    pub role: ActorRole,
}

impl AuthenticatedActor {
    #[must_use]
    pub const fn new(user_id: i64, role: ActorRole) -> Self {
        Self { user_id, role }
    }

    /// The platform actor used for automatic transitions.
    #[must_use]
    pub const fn system() -> Self {
        Self {
            user_id: 0,
            role: ActorRole::System,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }
}

/// Builds an actor from raw identity values supplied by the boundary.
///
/// # Errors
///
/// Returns `Validation` if the role is unknown or the id is not positive.
pub fn authenticate(user_id: i64, role: &str) -> Result<AuthenticatedActor, ApiError> {
    if user_id <= 0 {
        return Err(ApiError::validation(
            "actor_id",
            format!("Actor id must be positive, got {user_id}"),
        ));
    }
    let role: ActorRole = role.parse()?;
    if role == ActorRole::System {
        return Err(ApiError::forbidden(
            "The system role cannot be assumed by a caller",
        ));
    }
    Ok(AuthenticatedActor::new(user_id, role))
}

/// Role checks shared by the orchestration operations.
pub struct AuthorizationService;

impl AuthorizationService {
    /// Requires the admin role.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for any other role.
    pub fn require_admin(actor: &AuthenticatedActor, action: &str) -> Result<(), ApiError> {
        Self::require_role(actor, &[ActorRole::Admin], action)
    }

    /// Requires one of `roles`.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if the actor's role is not listed.
    pub fn require_role(
        actor: &AuthenticatedActor,
        roles: &[ActorRole],
        action: &str,
    ) -> Result<(), ApiError> {
        if roles.contains(&actor.role) {
            Ok(())
        } else {
            let required: Vec<&str> = roles.iter().map(ActorRole::as_str).collect();
            Err(ApiError::forbidden(format!(
                "'{action}' requires role {}",
                required.join(" or ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticate_parses_role() {
        assert_eq!(
            authenticate(7, "Technician"),
            Ok(AuthenticatedActor::new(7, ActorRole::Technician))
        );
    }

    #[test]
    fn test_authenticate_rejects_system_and_bad_ids() {
        assert!(matches!(
            authenticate(7, "system"),
            Err(ApiError::Forbidden { .. })
        ));
        assert!(matches!(
            authenticate(0, "user"),
            Err(ApiError::Validation { .. })
        ));
        assert!(matches!(
            authenticate(7, "operator"),
            Err(ApiError::Validation { .. })
        ));
    }

    #[test]
    fn test_require_role() {
        let user = AuthenticatedActor::new(1, ActorRole::User);
        assert!(AuthorizationService::require_admin(&user, "verify").is_err());
        assert!(
            AuthorizationService::require_role(
                &user,
                &[ActorRole::User, ActorRole::Admin],
                "cancel"
            )
            .is_ok()
        );
    }
}
