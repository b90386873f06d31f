// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Shared collaborators handed to every orchestration operation.

use repairhub_persistence::Persistence;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{Mutex, MutexGuard};

use crate::config::ServiceConfig;
use crate::events::{BookingEvent, BookingEventPublisher};
use crate::gateway::GatewayRegistry;

/// The store, configuration, gateways, and event sink.
///
/// The store lock is held for one storage call at a time and never across a
/// gateway call, so concurrent operations interleave exactly as they would
/// against a remote document store. Races are decided by the conditional
/// updates, not by this lock.
#[derive(Clone)]
pub struct AppContext {
    persistence: Arc<Mutex<Persistence>>,
    config: Arc<ServiceConfig>,
    gateways: Arc<GatewayRegistry>,
    events: Arc<dyn BookingEventPublisher>,
}

impl AppContext {
    #[must_use]
    pub fn new(
        persistence: Persistence,
        config: ServiceConfig,
        gateways: GatewayRegistry,
        events: Arc<dyn BookingEventPublisher>,
    ) -> Self {
        Self {
            persistence: Arc::new(Mutex::new(persistence)),
            config: Arc::new(config),
            gateways: Arc::new(gateways),
            events,
        }
    }

    /// Locks the store for a single storage call.
    pub async fn store(&self) -> MutexGuard<'_, Persistence> {
        self.persistence.lock().await
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    #[must_use]
    pub fn gateways(&self) -> &GatewayRegistry {
        &self.gateways
    }

    pub fn publish(&self, event: BookingEvent) {
        self.events.publish(event);
    }

    #[must_use]
    pub fn now() -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
