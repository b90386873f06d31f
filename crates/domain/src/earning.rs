// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Technician earnings and the platform commission model.
//!
//! Commission is resolved per technician: an explicit override wins;
//! otherwise the first tier (by descending `min_repairs`) the technician
//! qualifies for applies; otherwise the default rate.

use crate::error::DomainError;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;

/// Payout status of an earning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarningStatus {
    Pending,
    Approved,
    Paid,
    Held,
    Reversed,
}

impl EarningStatus {
    /// States from which an earning can still be reversed.
    pub const REVERSIBLE: [Self; 2] = [Self::Pending, Self::Approved];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Paid => "paid",
            Self::Held => "held",
            Self::Reversed => "reversed",
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Reversed)
    }

    /// Valid transitions:
    /// - pending → approved | held | reversed
    /// - approved → paid | held | reversed
    /// - held → approved
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Approved | Self::Held | Self::Reversed)
                | (Self::Approved, Self::Paid | Self::Held | Self::Reversed)
                | (Self::Held, Self::Approved)
        )
    }

    /// Returns the states from which `target` can be reached.
    #[must_use]
    pub fn sources_reaching(target: Self) -> Vec<Self> {
        [
            Self::Pending,
            Self::Approved,
            Self::Paid,
            Self::Held,
            Self::Reversed,
        ]
        .into_iter()
        .filter(|s| s.can_transition_to(target))
        .collect()
    }
}

impl FromStr for EarningStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "paid" => Ok(Self::Paid),
            "held" => Ok(Self::Held),
            "reversed" => Ok(Self::Reversed),
            _ => Err(DomainError::InvalidEnumValue {
                kind: "earning status",
                value: s.to_string(),
            }),
        }
    }
}

/// The payout record for one completed booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Earning {
    pub earning_id: i64,
    pub booking_id: i64,
    pub technician_id: i64,
    pub technician_user_id: i64,
    pub booking_amount: i64,
    pub commission_rate: f64,
    pub commission_amount: i64,
    pub net_earning: i64,
    pub bonus: i64,
    pub deductions: i64,
    pub status: EarningStatus,
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A repair-count threshold mapped to a discounted commission rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommissionTier {
    pub min_repairs: u32,
    pub rate: f64,
}

/// Platform commission configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionPolicy {
    pub default_rate: f64,
    pub tiers: Vec<CommissionTier>,
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        Self {
            default_rate: 0.15,
            tiers: vec![
                CommissionTier {
                    min_repairs: 100,
                    rate: 0.10,
                },
                CommissionTier {
                    min_repairs: 50,
                    rate: 0.12,
                },
                CommissionTier {
                    min_repairs: 20,
                    rate: 0.13,
                },
            ],
        }
    }
}

impl CommissionPolicy {
    /// Checks that every configured rate lies in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRate` for the first rate out of range.
    pub fn validate(&self) -> Result<(), DomainError> {
        std::iter::once(self.default_rate)
            .chain(self.tiers.iter().map(|t| t.rate))
            .try_for_each(validate_rate)
    }

    /// Resolves the commission rate for a technician.
    #[must_use]
    pub fn rate_for(&self, override_rate: Option<f64>, completed_repairs: u32) -> f64 {
        if let Some(rate) = override_rate {
            return rate;
        }

        let mut tiers: Vec<&CommissionTier> = self.tiers.iter().collect();
        tiers.sort_by(|a, b| b.min_repairs.cmp(&a.min_repairs));

        tiers
            .into_iter()
            .find(|tier| completed_repairs >= tier.min_repairs)
            .map_or(self.default_rate, |tier| tier.rate)
    }
}

/// Validates a single commission rate.
///
/// # Errors
///
/// Returns `InvalidRate` unless `0 <= rate <= 1`.
pub fn validate_rate(rate: f64) -> Result<(), DomainError> {
    if (0.0..=1.0).contains(&rate) {
        Ok(())
    } else {
        Err(DomainError::InvalidRate { rate })
    }
}

/// The money split for one booking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommissionBreakdown {
    pub booking_amount: i64,
    pub commission_rate: f64,
    pub commission_amount: i64,
    pub bonus: i64,
    pub deductions: i64,
    pub net_earning: i64,
}

/// Computes `commission = round(amount * rate)` and
/// `net = amount - commission + bonus - deductions`.
///
/// # Errors
///
/// Returns an error if the amount is not positive, the rate is out of
/// range, or the arithmetic overflows.
pub fn compute_commission(
    booking_amount: i64,
    rate: f64,
    bonus: i64,
    deductions: i64,
) -> Result<CommissionBreakdown, DomainError> {
    if booking_amount <= 0 {
        return Err(DomainError::NonPositiveAmount {
            field: "booking amount",
            amount: booking_amount,
        });
    }
    validate_rate(rate)?;

    let overflow = || DomainError::AmountOverflow {
        operation: "commission",
    };

    let commission_amount: i64 = booking_amount
        .to_f64()
        .map(|amount| (amount * rate).round())
        .and_then(|c| c.to_i64())
        .ok_or_else(overflow)?;

    let net_earning: i64 = booking_amount
        .checked_sub(commission_amount)
        .and_then(|n| n.checked_add(bonus))
        .and_then(|n| n.checked_sub(deductions))
        .ok_or_else(overflow)?;

    Ok(CommissionBreakdown {
        booking_amount,
        commission_rate: rate,
        commission_amount,
        bonus,
        deductions,
        net_earning,
    })
}
