// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Booking lifecycle events.
//!
//! Events are facts about transitions that already committed. They are
//! informational only: consumers (notifications, live views) must tolerate
//! loss and duplication, and publishing never fails the operation that
//! produced the event.

use repairhub_domain::Booking;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Maximum number of events buffered per subscriber.
/// Slow subscribers lose the oldest events.
const EVENT_BUFFER_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEventKind {
    Created,
    Assigned,
    Started,
    Completed,
    Cancelled,
    StatusChanged,
}

impl BookingEventKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Assigned => "assigned",
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::StatusChanged => "status_changed",
        }
    }
}

/// A committed booking transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingEvent {
    pub kind: BookingEventKind,
    /// The booking as it was right after the transition.
    pub booking: Booking,
    /// The booking owner.
    pub user_id: i64,
    /// The user account behind the assigned technician, if any.
    pub technician_user_id: Option<i64>,
    pub changed_by: i64,
    pub previous_status: Option<String>,
    /// The new status, or a descriptive label such as
    /// `"rescheduled (assigned)"` for reschedules.
    pub new_status: String,
}

impl BookingEvent {
    #[must_use]
    pub fn new(
        kind: BookingEventKind,
        booking: &Booking,
        technician_user_id: Option<i64>,
        changed_by: i64,
        previous_status: Option<String>,
    ) -> Self {
        Self {
            kind,
            user_id: booking.user_id,
            technician_user_id,
            changed_by,
            previous_status,
            new_status: booking.status.as_str().to_string(),
            booking: booking.clone(),
        }
    }

    #[must_use]
    pub fn with_status_label(mut self, label: String) -> Self {
        self.new_status = label;
        self
    }
}

/// Sink for booking events, injected into the orchestration context.
pub trait BookingEventPublisher: Send + Sync {
    /// Publishes `event`. Must not block and must not fail the caller.
    fn publish(&self, event: BookingEvent);
}

/// In-process fan-out over `tokio::sync::broadcast`.
#[derive(Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<BookingEvent>,
}

impl BroadcastPublisher {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self { tx }
    }

    /// Subscribes to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingEventPublisher for BroadcastPublisher {
    fn publish(&self, event: BookingEvent) {
        let kind: &'static str = event.kind.as_str();
        let booking_id: i64 = event.booking.booking_id;
        match self.tx.send(event) {
            Ok(receivers) => {
                debug!(kind, booking_id, receivers, "Published booking event");
            }
            Err(_) => {
                debug!(kind, booking_id, "No subscribers for booking event");
            }
        }
    }
}
