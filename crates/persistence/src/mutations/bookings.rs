// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Booking mutations.
//!
//! `apply_booking_update` is the compare-and-swap primitive behind every
//! lifecycle operation: the `BookingGuard` becomes the `WHERE` clause, the
//! `BookingPatch` becomes the `SET` clause, and the history rows are
//! appended in the same transaction only if the update matched.

use diesel::SqliteConnection;
use diesel::prelude::*;
use diesel::sql_types::Bool;
use diesel::sqlite::Sqlite;
use repairhub_domain::{
    Booking, BookingStatus, DeviceInfo, GeoPoint, PaymentStatus, PricingSnapshot, ScheduleSlot,
    Urgency,
};
use time::{Date, OffsetDateTime};
use tracing::{debug, info};

use crate::data_models::{
    BookingChangeset, NewBookingRow, NewRescheduleRow, NewStatusHistoryRow, format_date,
    format_timestamp, to_count, to_flag,
};
use crate::diesel_schema::{booking_reschedule_history, booking_status_history, bookings};
use crate::error::PersistenceError;
use crate::queries;

/// One status history entry to append. The timestamp is the write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryNote {
    pub status: String,
    pub changed_by: i64,
    pub note: Option<String>,
}

impl HistoryNote {
    #[must_use]
    pub fn new(status: impl Into<String>, changed_by: i64, note: Option<String>) -> Self {
        Self {
            status: status.into(),
            changed_by,
            note,
        }
    }
}

/// One reschedule history entry to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RescheduleNote {
    pub from: ScheduleSlot,
    pub to: ScheduleSlot,
    pub reason: Option<String>,
    pub rescheduled_by: i64,
}

/// A booking to insert, with its seed history.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: i64,
    pub technician_id: Option<i64>,
    pub service_type: String,
    pub issue_type: String,
    pub urgency: Urgency,
    pub description: String,
    pub device: DeviceInfo,
    pub location: Option<GeoPoint>,
    pub preferred_date: Date,
    pub time_slot: Option<String>,
    pub status: BookingStatus,
    pub pricing: PricingSnapshot,
    pub notes: Option<String>,
    pub history: Vec<HistoryNote>,
    pub created_at: OffsetDateTime,
}

/// Preconditions a booking row must satisfy for an update to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingGuard {
    pub booking_id: i64,
    /// Current status must be one of these. An empty set matches nothing.
    pub statuses: Vec<BookingStatus>,
    /// Assigned technician must equal this.
    pub technician_id: Option<i64>,
    /// No technician may be assigned yet.
    pub unassigned: bool,
    /// Owning user must equal this.
    pub user_id: Option<i64>,
    pub payment_status: Option<PaymentStatus>,
    /// `reschedule_count` must be strictly below this.
    pub reschedule_below: Option<u32>,
}

impl BookingGuard {
    #[must_use]
    pub fn new(booking_id: i64, statuses: &[BookingStatus]) -> Self {
        Self {
            booking_id,
            statuses: statuses.to_vec(),
            technician_id: None,
            unassigned: false,
            user_id: None,
            payment_status: None,
            reschedule_below: None,
        }
    }

    #[must_use]
    pub const fn assigned_to(mut self, technician_id: i64) -> Self {
        self.technician_id = Some(technician_id);
        self
    }

    #[must_use]
    pub const fn unassigned(mut self) -> Self {
        self.unassigned = true;
        self
    }

    #[must_use]
    pub const fn owned_by(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub const fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    #[must_use]
    pub const fn reschedule_below(mut self, max: u32) -> Self {
        self.reschedule_below = Some(max);
        self
    }
}

/// Changes applied when a guard matches. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub status: Option<BookingStatus>,
    pub technician_id: Option<i64>,
    pub payment_status: Option<PaymentStatus>,
    pub is_paid: Option<bool>,
    pub final_cost: Option<i64>,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub started_at: Option<OffsetDateTime>,
    pub completed_at: Option<OffsetDateTime>,
    pub cancelled_at: Option<OffsetDateTime>,
    pub schedule: Option<ScheduleSlot>,
    pub pricing: Option<PricingSnapshot>,
    pub increment_reschedule: bool,
    pub history: Vec<HistoryNote>,
    pub reschedule: Option<RescheduleNote>,
}

type BookingPredicate = Box<dyn BoxableExpression<bookings::table, Sqlite, SqlType = Bool>>;

fn guard_predicate(guard: &BookingGuard) -> Result<BookingPredicate, PersistenceError> {
    let statuses: Vec<String> = guard
        .statuses
        .iter()
        .map(|s| s.as_str().to_string())
        .collect();

    let mut predicate: BookingPredicate = Box::new(
        bookings::booking_id
            .eq(guard.booking_id)
            .and(bookings::status.eq_any(statuses)),
    );

    if let Some(technician_id) = guard.technician_id {
        let assigned = bookings::technician_id.assume_not_null().eq(technician_id);
        predicate = Box::new(predicate.and(assigned));
    }
    if guard.unassigned {
        predicate = Box::new(predicate.and(bookings::technician_id.is_null()));
    }
    if let Some(user_id) = guard.user_id {
        predicate = Box::new(predicate.and(bookings::user_id.eq(user_id)));
    }
    if let Some(payment_status) = guard.payment_status {
        predicate = Box::new(predicate.and(bookings::payment_status.eq(payment_status.as_str())));
    }
    if let Some(max) = guard.reschedule_below {
        let max: i32 = to_count(max, "max_reschedules")?;
        predicate = Box::new(predicate.and(bookings::reschedule_count.lt(max)));
    }

    Ok(predicate)
}

fn changeset(
    patch: &BookingPatch,
    at: OffsetDateTime,
) -> Result<BookingChangeset, PersistenceError> {
    let format_opt = |ts: Option<OffsetDateTime>| ts.map(format_timestamp).transpose();

    Ok(BookingChangeset {
        status: patch.status.map(|s| s.as_str().to_string()),
        technician_id: patch.technician_id,
        payment_status: patch.payment_status.map(|s| s.as_str().to_string()),
        is_paid: patch.is_paid.map(to_flag),
        final_cost: patch.final_cost,
        notes: patch.notes.clone(),
        cancellation_reason: patch.cancellation_reason.clone(),
        started_at: format_opt(patch.started_at)?,
        completed_at: format_opt(patch.completed_at)?,
        cancelled_at: format_opt(patch.cancelled_at)?,
        preferred_date: patch
            .schedule
            .as_ref()
            .map(|s| format_date(s.date))
            .transpose()?,
        time_slot: patch.schedule.as_ref().map(|s| s.time_slot.clone()),
        estimated_cost: patch.pricing.as_ref().map(|p| p.estimated_cost),
        pricing_base_price: patch.pricing.as_ref().map(|p| p.base_price),
        pricing_multiplier: patch.pricing.as_ref().map(|p| p.multiplier),
        pricing_rule_id: patch.pricing.as_ref().map(|p| p.rule_id),
        updated_at: format_timestamp(at)?,
    })
}

fn append_history(
    conn: &mut SqliteConnection,
    booking_id: i64,
    notes: &[HistoryNote],
    at: OffsetDateTime,
) -> Result<(), PersistenceError> {
    let changed_at: String = format_timestamp(at)?;
    for note in notes {
        let row = NewStatusHistoryRow {
            booking_id,
            status: note.status.clone(),
            changed_at: changed_at.clone(),
            changed_by: note.changed_by,
            note: note.note.clone(),
        };
        diesel::insert_into(booking_status_history::table)
            .values(&row)
            .execute(conn)?;
    }
    Ok(())
}

fn append_reschedule(
    conn: &mut SqliteConnection,
    booking_id: i64,
    note: &RescheduleNote,
    at: OffsetDateTime,
) -> Result<(), PersistenceError> {
    let row = NewRescheduleRow {
        booking_id,
        from_date: format_date(note.from.date)?,
        from_slot: note.from.time_slot.clone(),
        to_date: format_date(note.to.date)?,
        to_slot: note.to.time_slot.clone(),
        reason: note.reason.clone(),
        rescheduled_by: note.rescheduled_by,
        rescheduled_at: format_timestamp(at)?,
    };
    diesel::insert_into(booking_reschedule_history::table)
        .values(&row)
        .execute(conn)?;
    Ok(())
}

/// Inserts a booking and its seed history.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_booking(
    conn: &mut SqliteConnection,
    booking: &NewBooking,
) -> Result<Booking, PersistenceError> {
    conn.transaction::<_, PersistenceError, _>(|conn| {
        let created_at: String = format_timestamp(booking.created_at)?;
        let row = NewBookingRow {
            user_id: booking.user_id,
            technician_id: booking.technician_id,
            service_type: booking.service_type.clone(),
            issue_type: booking.issue_type.clone(),
            urgency: booking.urgency.as_str().to_string(),
            description: booking.description.clone(),
            device_brand: booking.device.brand.clone(),
            device_model: booking.device.model.clone(),
            latitude: booking.location.map(|l| l.latitude),
            longitude: booking.location.map(|l| l.longitude),
            preferred_date: format_date(booking.preferred_date)?,
            time_slot: booking.time_slot.clone(),
            status: booking.status.as_str().to_string(),
            payment_status: PaymentStatus::Pending.as_str().to_string(),
            is_paid: 0,
            estimated_cost: booking.pricing.estimated_cost,
            pricing_base_price: booking.pricing.base_price,
            pricing_multiplier: booking.pricing.multiplier,
            pricing_rule_id: booking.pricing.rule_id,
            reschedule_count: 0,
            notes: booking.notes.clone(),
            created_at: created_at.clone(),
            updated_at: created_at,
        };

        let booking_id: i64 = diesel::insert_into(bookings::table)
            .values(&row)
            .returning(bookings::booking_id)
            .get_result(conn)?;

        append_history(conn, booking_id, &booking.history, booking.created_at)?;

        info!(
            booking_id,
            status = booking.status.as_str(),
            "Inserted booking"
        );

        queries::bookings::get_booking(conn, booking_id)?.ok_or_else(|| {
            PersistenceError::NotFound(format!("booking {booking_id} vanished after insert"))
        })
    })
}

/// Applies `patch` to the booking if and only if `guard` matches.
///
/// Returns the updated booking, or `None` when no row satisfied the guard.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn apply_booking_update(
    conn: &mut SqliteConnection,
    guard: &BookingGuard,
    patch: &BookingPatch,
    at: OffsetDateTime,
) -> Result<Option<Booking>, PersistenceError> {
    let changes: BookingChangeset = changeset(patch, at)?;

    conn.transaction::<_, PersistenceError, _>(|conn| {
        let target = bookings::table.filter(guard_predicate(guard)?);

        let affected: usize = if patch.increment_reschedule {
            diesel::update(target)
                .set((
                    &changes,
                    bookings::reschedule_count.eq(bookings::reschedule_count + 1),
                ))
                .execute(conn)?
        } else {
            diesel::update(target).set(&changes).execute(conn)?
        };

        if affected == 0 {
            debug!(
                booking_id = guard.booking_id,
                "Conditional booking update matched no row"
            );
            return Ok(None);
        }

        append_history(conn, guard.booking_id, &patch.history, at)?;
        if let Some(reschedule) = &patch.reschedule {
            append_reschedule(conn, guard.booking_id, reschedule, at)?;
        }

        queries::bookings::get_booking(conn, guard.booking_id)
    })
}

/// Sets the booking's payment status unconditionally.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn set_booking_payment_status(
    conn: &mut SqliteConnection,
    booking_id: i64,
    status: PaymentStatus,
    at: OffsetDateTime,
) -> Result<bool, PersistenceError> {
    let target = bookings::table.filter(bookings::booking_id.eq(booking_id));
    let affected: usize = diesel::update(target)
        .set((
            bookings::payment_status.eq(status.as_str()),
            bookings::updated_at.eq(format_timestamp(at)?),
        ))
        .execute(conn)?;
    Ok(affected == 1)
}
