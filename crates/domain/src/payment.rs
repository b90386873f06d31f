// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Payment records and refund bookkeeping.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;

/// Status of a single payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRecordStatus {
    /// Order created at the gateway, awaiting confirmation.
    Pending,
    /// Claimed by a confirmation attempt.
    Processing,
    Completed,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl PaymentRecordStatus {
    /// States in which a payment blocks a new one for the same booking.
    pub const IN_FLIGHT: [Self; 2] = [Self::Pending, Self::Processing];

    /// States from which refund capacity may still be reserved.
    pub const REFUNDABLE: [Self; 2] = [Self::Completed, Self::PartiallyRefunded];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially_refunded",
        }
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        Self::IN_FLIGHT.contains(self)
    }
}

impl FromStr for PaymentRecordStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            "partially_refunded" => Ok(Self::PartiallyRefunded),
            _ => Err(DomainError::InvalidEnumValue {
                kind: "payment record status",
                value: s.to_string(),
            }),
        }
    }
}

/// Status of a single refund attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    /// Capacity reserved, gateway call outstanding.
    Pending,
    Completed,
    Failed,
}

impl RefundStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for RefundStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(DomainError::InvalidEnumValue {
                kind: "refund status",
                value: s.to_string(),
            }),
        }
    }
}

/// One refund attempt against a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundEntry {
    pub refund_id: i64,
    pub amount: i64,
    pub reason: String,
    pub status: RefundStatus,
    pub gateway_refund_id: Option<String>,
    pub processed_by: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A payment collected (or attempted) for a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: i64,
    pub booking_id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub currency: String,
    pub refunded_amount: i64,
    pub status: PaymentRecordStatus,
    pub method: Option<String>,
    pub gateway: String,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub failure_reason: Option<String>,
    pub refunds: Vec<RefundEntry>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Payment {
    /// Amount that can still be refunded.
    #[must_use]
    pub const fn refundable_balance(&self) -> i64 {
        self.amount - self.refunded_amount
    }

    /// Status after `refunded_amount` has reached its current value.
    #[must_use]
    pub const fn status_after_refund(&self) -> PaymentRecordStatus {
        if self.refunded_amount >= self.amount {
            PaymentRecordStatus::Refunded
        } else {
            PaymentRecordStatus::PartiallyRefunded
        }
    }

    /// Sum of refund entries that the gateway confirmed.
    #[must_use]
    pub fn completed_refund_total(&self) -> i64 {
        self.refunds
            .iter()
            .filter(|r| r.status == RefundStatus::Completed)
            .map(|r| r.amount)
            .sum()
    }
}
