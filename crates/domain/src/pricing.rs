// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Price resolution for a (service, issue, urgency) request.
//!
//! Rules are consulted in a fixed fallback order:
//!
//! 1. the active rule for the exact service and issue
//! 2. the active service-wide rule (no issue type)
//! 3. the configured fallback pricing
//!
//! The estimate is `round(base_price * multiplier)`. An urgency without a
//! configured multiplier prices at `1.0`.

use crate::error::DomainError;
use crate::types::{PricingSnapshot, Urgency};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Per-urgency price multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UrgencyMultipliers {
    pub normal: Option<f64>,
    pub urgent: Option<f64>,
    pub emergency: Option<f64>,
}

impl UrgencyMultipliers {
    /// Returns the multiplier for `urgency`, defaulting to `1.0`.
    #[must_use]
    pub fn for_urgency(&self, urgency: Urgency) -> f64 {
        match urgency {
            Urgency::Normal => self.normal,
            Urgency::Urgent => self.urgent,
            Urgency::Emergency => self.emergency,
        }
        .unwrap_or(1.0)
    }
}

impl Default for UrgencyMultipliers {
    fn default() -> Self {
        Self {
            normal: Some(1.0),
            urgent: Some(1.5),
            emergency: Some(2.0),
        }
    }
}

/// A configurable pricing rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    pub rule_id: i64,
    pub service_type: String,
    /// `None` marks a service-wide rule.
    pub issue_type: Option<String>,
    pub base_price: i64,
    pub multipliers: UrgencyMultipliers,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PricingRule {
    /// Validates the fields an admin may set.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty service type, a non-positive base price,
    /// a negative multiplier, or an inverted min/max range.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.service_type.trim().is_empty() {
            return Err(DomainError::InvalidField {
                field: "service_type",
                message: String::from("must not be empty"),
            });
        }
        if self.base_price <= 0 {
            return Err(DomainError::NonPositiveAmount {
                field: "base_price",
                amount: self.base_price,
            });
        }
        for urgency in [Urgency::Normal, Urgency::Urgent, Urgency::Emergency] {
            let multiplier: f64 = self.multipliers.for_urgency(urgency);
            if !multiplier.is_finite() || multiplier < 0.0 {
                return Err(DomainError::InvalidField {
                    field: "multipliers",
                    message: format!("{} multiplier {multiplier} is invalid", urgency.as_str()),
                });
            }
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            return Err(DomainError::InvalidField {
                field: "min_price",
                message: format!("min price {min} exceeds max price {max}"),
            });
        }
        Ok(())
    }

    fn matches(&self, service_type: &str, issue_type: Option<&str>) -> bool {
        self.is_active
            && self.service_type.eq_ignore_ascii_case(service_type)
            && match (self.issue_type.as_deref(), issue_type) {
                (None, None) => true,
                (Some(rule), Some(requested)) => rule.eq_ignore_ascii_case(requested),
                _ => false,
            }
    }
}

/// Pricing used when no rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackPricing {
    pub base_price: i64,
    pub multipliers: UrgencyMultipliers,
}

impl Default for FallbackPricing {
    fn default() -> Self {
        Self {
            base_price: 500,
            multipliers: UrgencyMultipliers::default(),
        }
    }
}

/// The result of pricing a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub service_type: String,
    pub issue_type: String,
    pub snapshot: PricingSnapshot,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}

/// Selects the rule that applies to `(service_type, issue_type)`.
#[must_use]
pub fn select_rule<'a>(
    rules: &'a [PricingRule],
    service_type: &str,
    issue_type: &str,
) -> Option<&'a PricingRule> {
    rules
        .iter()
        .find(|rule| rule.matches(service_type, Some(issue_type)))
        .or_else(|| rules.iter().find(|rule| rule.matches(service_type, None)))
}

/// Computes `round(base_price * multiplier)`.
///
/// # Errors
///
/// Returns `AmountOverflow` if the product cannot be represented.
pub fn estimate(base_price: i64, multiplier: f64) -> Result<i64, DomainError> {
    base_price
        .to_f64()
        .map(|base| (base * multiplier).round())
        .and_then(|v| v.to_i64())
        .ok_or(DomainError::AmountOverflow {
            operation: "price estimate",
        })
}

/// Resolves a price quote from the candidate rules and the fallback.
///
/// # Errors
///
/// Returns an error if the service or issue type is empty or the estimate
/// overflows.
pub fn resolve_price(
    rules: &[PricingRule],
    fallback: &FallbackPricing,
    service_type: &str,
    issue_type: &str,
    urgency: Urgency,
) -> Result<PriceQuote, DomainError> {
    if service_type.trim().is_empty() {
        return Err(DomainError::InvalidField {
            field: "service_type",
            message: String::from("must not be empty"),
        });
    }
    if issue_type.trim().is_empty() {
        return Err(DomainError::InvalidField {
            field: "issue_type",
            message: String::from("must not be empty"),
        });
    }

    let (base_price, multiplier, rule_id, min_price, max_price) =
        match select_rule(rules, service_type, issue_type) {
            Some(rule) => (
                rule.base_price,
                rule.multipliers.for_urgency(urgency),
                Some(rule.rule_id),
                rule.min_price,
                rule.max_price,
            ),
            None => (
                fallback.base_price,
                fallback.multipliers.for_urgency(urgency),
                None,
                None,
                None,
            ),
        };

    Ok(PriceQuote {
        service_type: service_type.to_string(),
        issue_type: issue_type.to_string(),
        snapshot: PricingSnapshot {
            base_price,
            urgency,
            multiplier,
            estimated_cost: estimate(base_price, multiplier)?,
            rule_id,
        },
        min_price,
        max_price,
    })
}
