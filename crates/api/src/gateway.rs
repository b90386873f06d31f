// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Payment gateway adapters.
//!
//! Every provider implements `PaymentGateway`. Adapters are registered by
//! name in a `GatewayRegistry`; asking for a provider that was never
//! registered fails with `NotConfigured` instead of silently succeeding.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Payment gateway '{0}' is not configured")]
    NotConfigured(String),
    #[error("Gateway declined the request: {0}")]
    Declined(String),
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Amount in minor units.
    pub amount: i64,
    pub currency: String,
    /// Our booking reference, echoed back by the provider.
    pub booking_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub order_ref: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub payment_ref: String,
    pub order_ref: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub verified: bool,
    pub payment_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    pub payment_ref: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRefund {
    pub refund_ref: String,
    pub status: String,
}

/// A payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// The registry name of this adapter.
    fn name(&self) -> &str;

    /// Creates a provider-side order the customer pays against.
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, GatewayError>;

    /// Checks the provider's payment signature.
    async fn verify_payment(&self, request: &VerifyRequest) -> Result<Verification, GatewayError>;

    /// Refunds part or all of a captured payment.
    async fn process_refund(&self, request: &RefundRequest) -> Result<GatewayRefund, GatewayError>;
}

/// Deterministic in-process provider for development and tests.
///
/// References come from a counter and a valid signature is
/// `"<order_ref>|<payment_ref>"`.
#[derive(Debug, Default)]
pub struct MockGateway {
    counter: AtomicU64,
    fail_refunds: AtomicBool,
}

impl MockGateway {
    pub const NAME: &'static str = "mock";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The signature this gateway accepts for an order/payment pair.
    #[must_use]
    pub fn signature_for(order_ref: &str, payment_ref: &str) -> String {
        format!("{order_ref}|{payment_ref}")
    }

    /// Makes subsequent refunds fail as if the provider were down.
    pub fn set_refund_failure(&self, fail: bool) {
        self.fail_refunds.store(fail, Ordering::SeqCst);
    }

    fn next_ref(&self, prefix: &str) -> String {
        let n: u64 = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}_mock_{n}")
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, GatewayError> {
        if request.amount <= 0 {
            return Err(GatewayError::Declined(format!(
                "order amount must be positive, got {}",
                request.amount
            )));
        }
        let order_ref: String = self.next_ref("order");
        debug!(order_ref = %order_ref, booking_ref = %request.booking_ref, "Mock order created");
        Ok(GatewayOrder {
            order_ref,
            amount: request.amount,
            currency: request.currency.clone(),
        })
    }

    async fn verify_payment(&self, request: &VerifyRequest) -> Result<Verification, GatewayError> {
        let expected: String = Self::signature_for(&request.order_ref, &request.payment_ref);
        Ok(Verification {
            verified: request.signature == expected,
            payment_ref: request.payment_ref.clone(),
        })
    }

    async fn process_refund(&self, request: &RefundRequest) -> Result<GatewayRefund, GatewayError> {
        if self.fail_refunds.load(Ordering::SeqCst) {
            warn!(payment_ref = %request.payment_ref, "Mock refund failure injected");
            return Err(GatewayError::Unavailable(String::from(
                "mock refund failure",
            )));
        }
        Ok(GatewayRefund {
            refund_ref: self.next_ref("rfnd"),
            status: String::from("processed"),
        })
    }
}

/// Named gateway adapters with a configured default.
#[derive(Clone)]
pub struct GatewayRegistry {
    adapters: HashMap<String, Arc<dyn PaymentGateway>>,
    default_name: String,
}

impl GatewayRegistry {
    #[must_use]
    pub fn new(default_name: &str) -> Self {
        Self {
            adapters: HashMap::new(),
            default_name: default_name.to_string(),
        }
    }

    /// Registers `gateway` under its own name, replacing any previous one.
    pub fn register(&mut self, gateway: Arc<dyn PaymentGateway>) {
        self.adapters.insert(gateway.name().to_string(), gateway);
    }

    /// Resolves `name`, or the default when `None`.
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` if no adapter is registered under the name.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn PaymentGateway>, GatewayError> {
        let name: &str = name.unwrap_or(&self.default_name);
        self.adapters
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::NotConfigured(name.to_string()))
    }
}
