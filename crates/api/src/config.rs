// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Service configuration read by the orchestration layer.

use repairhub_domain::{CommissionPolicy, CommissionTier, FallbackPricing, validate_rate};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Tunables for pricing, commission, scheduling and payments.
///
/// Every key is optional in a config file; missing keys take the default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Platform commission when no tier or override applies.
    pub default_commission_rate: f64,
    pub commission_tiers: Vec<CommissionTier>,
    /// Reschedules allowed per booking.
    pub max_reschedules: u32,
    pub default_currency: String,
    /// Gateway adapter used when a request names none.
    pub default_gateway: String,
    pub match_radius_meters: f64,
    /// Pricing used when no rule matches.
    pub fallback_pricing: FallbackPricing,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let policy: CommissionPolicy = CommissionPolicy::default();
        Self {
            default_commission_rate: policy.default_rate,
            commission_tiers: policy.tiers,
            max_reschedules: 3,
            default_currency: String::from("INR"),
            default_gateway: String::from("mock"),
            match_radius_meters: 50_000.0,
            fallback_pricing: FallbackPricing::default(),
        }
    }
}

impl ServiceConfig {
    /// Parses a JSON config document, filling missing keys with defaults.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the document is malformed or a value is out
    /// of range.
    pub fn from_json(raw: &str) -> Result<Self, ApiError> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| ApiError::validation("config", format!("Malformed config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value for range errors.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for the first invalid value.
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_rate(self.default_commission_rate)?;
        self.commission_policy().validate()?;
        if self.default_currency.trim().is_empty() {
            return Err(ApiError::validation(
                "default_currency",
                "must not be empty",
            ));
        }
        if !self.match_radius_meters.is_finite() || self.match_radius_meters <= 0.0 {
            return Err(ApiError::validation(
                "match_radius_meters",
                format!("must be positive, got {}", self.match_radius_meters),
            ));
        }
        if self.fallback_pricing.base_price <= 0 {
            return Err(ApiError::validation(
                "fallback_pricing",
                "base price must be positive",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn commission_policy(&self) -> CommissionPolicy {
        CommissionPolicy {
            default_rate: self.default_commission_rate,
            tiers: self.commission_tiers.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert!((config.default_commission_rate - 0.15).abs() < f64::EPSILON);
        assert_eq!(config.commission_tiers.len(), 3);
        assert_eq!(config.max_reschedules, 3);
        assert_eq!(config.default_currency, "INR");
        assert_eq!(config.fallback_pricing.base_price, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = ServiceConfig::from_json(r#"{"max_reschedules": 5}"#)
            .expect("Partial config should parse");
        assert_eq!(config.max_reschedules, 5);
        assert_eq!(config.default_gateway, "mock");
    }

    #[test]
    fn test_out_of_range_rate_is_rejected() {
        assert!(matches!(
            ServiceConfig::from_json(r#"{"default_commission_rate": 1.5}"#),
            Err(ApiError::Validation { .. })
        ));
        assert!(ServiceConfig::from_json("not json").is_err());
    }
}
