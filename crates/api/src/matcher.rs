// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Technician matching against the live candidate pool.

use repairhub_domain::{MatchCriteria, ScoredTechnician, Technician, rank_technicians};
use tracing::debug;

use crate::context::AppContext;
use crate::error::ApiError;

/// Ranks every eligible technician for `criteria`, best first.
///
/// # Errors
///
/// Returns `Internal` if candidates cannot be loaded.
pub async fn rank_candidates(
    ctx: &AppContext,
    criteria: &MatchCriteria,
) -> Result<Vec<ScoredTechnician>, ApiError> {
    let candidates: Vec<Technician> = ctx.store().await.list_match_candidates()?;
    let pool_size: usize = candidates.len();
    let ranked: Vec<ScoredTechnician> = rank_technicians(candidates, criteria);

    debug!(
        service_type = %criteria.service_type,
        pool_size,
        eligible = ranked.len(),
        "Ranked technicians"
    );
    Ok(ranked)
}

/// The top-ranked technician for `criteria`, if any.
///
/// # Errors
///
/// Returns `Internal` if candidates cannot be loaded.
pub async fn find_best_match(
    ctx: &AppContext,
    criteria: &MatchCriteria,
) -> Result<Option<ScoredTechnician>, ApiError> {
    Ok(rank_candidates(ctx, criteria).await?.into_iter().next())
}
