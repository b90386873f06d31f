// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use repairhub_domain::{Urgency, UrgencyMultipliers};

use super::helpers::{create_test_admin, create_test_context, create_test_user};
use crate::{ApiError, PricingRuleRequest, quote_price, upsert_pricing_rule};

fn rule(service_type: &str, issue_type: Option<&str>, base_price: i64) -> PricingRuleRequest {
    PricingRuleRequest {
        service_type: service_type.to_string(),
        issue_type: issue_type.map(ToString::to_string),
        base_price,
        multipliers: UrgencyMultipliers::default(),
        min_price: None,
        max_price: None,
        is_active: true,
    }
}

#[tokio::test]
async fn test_quote_without_rules_uses_fallback() {
    let test = create_test_context();

    let quote = quote_price(&test.ctx, "laptop", "screen_repair", Urgency::Urgent)
        .await
        .expect("Quote should succeed");
    assert_eq!(quote.snapshot.base_price, 500);
    assert_eq!(quote.snapshot.estimated_cost, 750);
    assert_eq!(quote.snapshot.rule_id, None);
}

#[tokio::test]
async fn test_exact_rule_beats_service_rule() {
    let test = create_test_context();
    let admin = create_test_admin();

    let service_wide = upsert_pricing_rule(&test.ctx, &admin, rule("laptop", None, 1000))
        .await
        .expect("Service rule should be stored");
    let exact = upsert_pricing_rule(
        &test.ctx,
        &admin,
        rule("laptop", Some("screen_repair"), 3000),
    )
    .await
    .expect("Exact rule should be stored");

    let quote = quote_price(&test.ctx, "laptop", "screen_repair", Urgency::Urgent)
        .await
        .expect("Quote should succeed");
    assert_eq!(quote.snapshot.estimated_cost, 4500);
    assert_eq!(quote.snapshot.rule_id, Some(exact.rule_id));

    let other_issue = quote_price(&test.ctx, "laptop", "battery", Urgency::Emergency)
        .await
        .expect("Quote should succeed");
    assert_eq!(other_issue.snapshot.estimated_cost, 2000);
    assert_eq!(other_issue.snapshot.rule_id, Some(service_wide.rule_id));
}

#[tokio::test]
async fn test_upsert_replaces_existing_rule() {
    let test = create_test_context();
    let admin = create_test_admin();

    let first = upsert_pricing_rule(&test.ctx, &admin, rule("mobile", Some("battery"), 800))
        .await
        .expect("Rule should be stored");
    let second = upsert_pricing_rule(&test.ctx, &admin, rule("mobile", Some("battery"), 900))
        .await
        .expect("Rule should be replaced");
    assert_eq!(second.rule_id, first.rule_id);
    assert_eq!(second.base_price, 900);

    let mut inactive = rule("mobile", Some("battery"), 900);
    inactive.is_active = false;
    upsert_pricing_rule(&test.ctx, &admin, inactive)
        .await
        .expect("Rule should be deactivated");

    let quote = quote_price(&test.ctx, "mobile", "battery", Urgency::Normal)
        .await
        .expect("Quote should succeed");
    assert_eq!(quote.snapshot.rule_id, None);
    assert_eq!(quote.snapshot.estimated_cost, 500);
}

#[tokio::test]
async fn test_rule_validation_and_authorization() {
    let test = create_test_context();

    let by_user =
        upsert_pricing_rule(&test.ctx, &create_test_user(10), rule("laptop", None, 1000)).await;
    assert!(matches!(by_user, Err(ApiError::Forbidden { .. })));

    let zero_price =
        upsert_pricing_rule(&test.ctx, &create_test_admin(), rule("laptop", None, 0)).await;
    assert!(matches!(zero_price, Err(ApiError::Validation { .. })));

    let mut inverted = rule("laptop", None, 1000);
    inverted.min_price = Some(2000);
    inverted.max_price = Some(1500);
    let result = upsert_pricing_rule(&test.ctx, &create_test_admin(), inverted).await;
    assert!(matches!(result, Err(ApiError::Validation { .. })));

    let empty_issue = quote_price(&test.ctx, "laptop", " ", Urgency::Normal).await;
    assert!(matches!(empty_issue, Err(ApiError::Validation { .. })));
}
