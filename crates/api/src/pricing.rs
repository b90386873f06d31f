// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Price quotes and pricing rule administration.

use repairhub_domain::{PriceQuote, PricingRule, Urgency, resolve_price};
use repairhub_persistence::PricingRuleInput;
use tracing::{debug, info};

use crate::auth::{AuthenticatedActor, AuthorizationService};
use crate::context::AppContext;
use crate::error::ApiError;
use crate::request_response::PricingRuleRequest;

/// Quotes a price for `(service_type, issue_type, urgency)`.
///
/// Falls back from the exact rule to the service-wide rule to the configured
/// fallback pricing.
///
/// # Errors
///
/// Returns `Validation` for empty service or issue types and `Internal` if
/// the rules cannot be loaded.
pub async fn quote_price(
    ctx: &AppContext,
    service_type: &str,
    issue_type: &str,
    urgency: Urgency,
) -> Result<PriceQuote, ApiError> {
    let rules: Vec<PricingRule> = ctx
        .store()
        .await
        .list_active_rules_for_service(service_type)?;

    let quote: PriceQuote = resolve_price(
        &rules,
        &ctx.config().fallback_pricing,
        service_type,
        issue_type,
        urgency,
    )?;

    debug!(
        service_type,
        issue_type,
        urgency = urgency.as_str(),
        estimated_cost = quote.snapshot.estimated_cost,
        rule_id = ?quote.snapshot.rule_id,
        "Quoted price"
    );
    Ok(quote)
}

/// Creates or replaces the rule for `(service_type, issue_type)`.
///
/// # Errors
///
/// Returns `Forbidden` for non-admins and `Validation` for invalid values.
pub async fn upsert_pricing_rule(
    ctx: &AppContext,
    actor: &AuthenticatedActor,
    request: PricingRuleRequest,
) -> Result<PricingRule, ApiError> {
    AuthorizationService::require_admin(actor, "upsert_pricing_rule")?;

    let now = AppContext::now();
    let candidate = PricingRule {
        rule_id: 0,
        service_type: request.service_type.trim().to_string(),
        issue_type: request
            .issue_type
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty()),
        base_price: request.base_price,
        multipliers: request.multipliers,
        min_price: request.min_price,
        max_price: request.max_price,
        is_active: request.is_active,
        updated_at: now,
    };
    candidate.validate()?;

    let input = PricingRuleInput {
        service_type: candidate.service_type,
        issue_type: candidate.issue_type,
        base_price: candidate.base_price,
        multipliers: candidate.multipliers,
        min_price: candidate.min_price,
        max_price: candidate.max_price,
        is_active: candidate.is_active,
    };
    let rule: PricingRule = ctx.store().await.upsert_pricing_rule(&input, now)?;

    info!(
        actor_id = actor.user_id,
        rule_id = rule.rule_id,
        service_type = %rule.service_type,
        "Pricing rule upserted"
    );
    Ok(rule)
}
