// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Actor extraction at the server boundary.
//!
//! Authentication happens upstream of this service. The gateway in front of
//! it forwards the caller as two headers, `x-actor-id` and `x-actor-role`,
//! which are turned into an `AuthenticatedActor` here.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use repairhub_api::{ApiError, AuthenticatedActor, authenticate};
use tracing::{debug, warn};

use crate::{AppState, HttpError};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Extractor for the calling actor.
///
/// # Usage
///
/// ```ignore
/// async fn my_handler(
///     RequestActor(actor): RequestActor,
/// ) -> Result<Json<Response>, HttpError> {
///     Ok(Json(Response { ... }))
/// }
/// ```
///
/// # Errors
///
/// Rejects with 401 if either header is missing or not valid text, 400 if
/// the id is not a positive integer or the role is unknown, and 403 if the
/// caller claims the system role.
pub struct RequestActor(pub AuthenticatedActor);

impl FromRequestParts<AppState> for RequestActor {
    type Rejection = ActorError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw_id: &str = header(parts, ACTOR_ID_HEADER)?;
        let raw_role: &str = header(parts, ACTOR_ROLE_HEADER)?;

        let user_id: i64 = raw_id.trim().parse().map_err(|_| {
            warn!(actor_id = raw_id, "Actor id is not an integer");
            ActorError::Rejected(ApiError::Validation {
                field: String::from("actor_id"),
                message: format!("'{raw_id}' is not a valid actor id"),
            })
        })?;

        let actor: AuthenticatedActor =
            authenticate(user_id, &raw_role.trim().to_lowercase()).map_err(|e| {
                warn!(actor_id = user_id, error = %e, "Actor rejected");
                ActorError::Rejected(e)
            })?;

        debug!(actor_id = actor.user_id, role = %actor.role, "Actor resolved");
        Ok(Self(actor))
    }
}

fn header<'a>(parts: &'a Parts, name: &'static str) -> Result<&'a str, ActorError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| {
            debug!(header = name, "Missing actor header");
            ActorError::MissingHeader(name)
        })?
        .to_str()
        .map_err(|_| {
            warn!(header = name, "Invalid actor header encoding");
            ActorError::InvalidHeader(name)
        })
}

/// Actor extraction errors.
#[derive(Debug)]
pub enum ActorError {
    /// A required header is missing.
    MissingHeader(&'static str),
    /// A header is not valid visible ASCII.
    InvalidHeader(&'static str),
    /// The identity was rejected.
    Rejected(ApiError),
}

impl IntoResponse for ActorError {
    fn into_response(self) -> Response {
        match self {
            Self::MissingHeader(name) => HttpError {
                status: StatusCode::UNAUTHORIZED,
                message: format!("Missing {name} header"),
            }
            .into_response(),
            Self::InvalidHeader(name) => HttpError {
                status: StatusCode::UNAUTHORIZED,
                message: format!("Invalid {name} header"),
            }
            .into_response(),
            Self::Rejected(err) => HttpError::from(err).into_response(),
        }
    }
}
