// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{
    DomainError, FallbackPricing, PriceQuote, PricingRule, Urgency, UrgencyMultipliers,
    resolve_price,
};
use time::OffsetDateTime;

fn rule(rule_id: i64, service: &str, issue: Option<&str>, base_price: i64) -> PricingRule {
    PricingRule {
        rule_id,
        service_type: service.to_string(),
        issue_type: issue.map(str::to_string),
        base_price,
        multipliers: UrgencyMultipliers {
            normal: Some(1.0),
            urgent: Some(1.5),
            emergency: None,
        },
        min_price: Some(base_price - 500),
        max_price: Some(base_price + 1000),
        is_active: true,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

#[test]
fn test_exact_rule_urgent_multiplier() {
    let rules: Vec<PricingRule> = vec![rule(1, "laptop", Some("screen_repair"), 3000)];
    let quote: PriceQuote = resolve_price(
        &rules,
        &FallbackPricing::default(),
        "laptop",
        "screen_repair",
        Urgency::Urgent,
    )
    .unwrap();
    assert_eq!(quote.snapshot.estimated_cost, 4500);
    assert_eq!(quote.snapshot.base_price, 3000);
    assert_eq!(quote.snapshot.rule_id, Some(1));
    assert_eq!(quote.min_price, Some(2500));
}

#[test]
fn test_missing_multiplier_counts_as_one() {
    let rules: Vec<PricingRule> = vec![rule(1, "laptop", Some("screen_repair"), 3000)];
    let quote: PriceQuote = resolve_price(
        &rules,
        &FallbackPricing::default(),
        "laptop",
        "screen_repair",
        Urgency::Emergency,
    )
    .unwrap();
    assert_eq!(quote.snapshot.estimated_cost, 3000);
}

#[test]
fn test_service_wide_rule_is_second_choice() {
    let rules: Vec<PricingRule> = vec![
        rule(1, "laptop", None, 1200),
        rule(2, "laptop", Some("battery"), 800),
    ];
    let quote: PriceQuote = resolve_price(
        &rules,
        &FallbackPricing::default(),
        "laptop",
        "keyboard",
        Urgency::Normal,
    )
    .unwrap();
    assert_eq!(quote.snapshot.rule_id, Some(1));
    assert_eq!(quote.snapshot.estimated_cost, 1200);

    let quote: PriceQuote = resolve_price(
        &rules,
        &FallbackPricing::default(),
        "laptop",
        "battery",
        Urgency::Normal,
    )
    .unwrap();
    assert_eq!(quote.snapshot.rule_id, Some(2));
}

#[test]
fn test_inactive_rules_fall_back() {
    let mut inactive: PricingRule = rule(1, "laptop", Some("battery"), 800);
    inactive.is_active = false;
    let quote: PriceQuote = resolve_price(
        &[inactive],
        &FallbackPricing::default(),
        "laptop",
        "battery",
        Urgency::Emergency,
    )
    .unwrap();
    assert_eq!(quote.snapshot.rule_id, None);
    assert_eq!(quote.snapshot.estimated_cost, 1000);
    assert_eq!(quote.min_price, None);
}

#[test]
fn test_empty_service_type_rejected() {
    let result = resolve_price(
        &[],
        &FallbackPricing::default(),
        " ",
        "battery",
        Urgency::Normal,
    );
    assert!(matches!(
        result,
        Err(DomainError::InvalidField {
            field: "service_type",
            ..
        })
    ));
}

#[test]
fn test_rule_validation() {
    let mut bad: PricingRule = rule(1, "laptop", None, 1000);
    bad.min_price = Some(2000);
    bad.max_price = Some(1500);
    assert!(bad.validate().is_err());

    let mut bad: PricingRule = rule(1, "laptop", None, 0);
    bad.min_price = None;
    assert!(matches!(
        bad.validate(),
        Err(DomainError::NonPositiveAmount { .. })
    ));

    assert!(rule(1, "laptop", None, 1000).validate().is_ok());
}
