// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Persistence layer for the RepairHub repair marketplace.
//!
//! Built on Diesel and `SQLite`. The store is treated as a document store
//! with atomic conditional updates: every precondition of a lifecycle
//! change is encoded in the `WHERE` clause of a single `UPDATE`, and a miss
//! is reported as `Ok(None)` so the caller can re-read and classify it.
//!
//! ## Testing
//!
//! `Persistence::new_in_memory()` gives each caller an isolated shared-cache
//! in-memory database. Migrations are embedded and run on open.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

use diesel::SqliteConnection;
use repairhub_domain::{
    Booking, BookingStatus, Earning, EarningStatus, Payment, PaymentRecordStatus, PaymentStatus,
    PricingRule, Technician, VerificationStatus,
};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use time::{Date, OffsetDateTime};

/// Counter for unique in-memory database names.
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

mod backend;
mod data_models;
mod diesel_schema;
mod error;
mod mutations;
mod queries;

#[cfg(test)]
mod tests;

pub use error::PersistenceError;
pub use mutations::{
    BOOKING_CANCELLED_REASON, BookingGuard, BookingPatch, HistoryNote, NewBooking, NewEarning,
    NewPayment, NewTechnician, PaymentCompletion, PricingRuleInput, RescheduleNote,
    TechnicianProfileUpdate,
};

/// Persistence adapter over a single `SQLite` connection.
pub struct Persistence {
    conn: SqliteConnection,
}

impl Persistence {
    /// Creates a new persistence adapter with an in-memory `SQLite` database.
    ///
    /// Each call receives a unique database instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new_in_memory() -> Result<Self, PersistenceError> {
        let db_id = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let shared_memory_url = format!("file:repairhub_mem_{db_id}?mode=memory&cache=shared");

        let mut conn: SqliteConnection = backend::sqlite::initialize_database(&shared_memory_url)?;
        backend::sqlite::verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self { conn })
    }

    /// Creates a new persistence adapter with a file-based `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new_with_file<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path_str = path.as_ref().to_str().ok_or_else(|| {
            PersistenceError::InitializationError("Invalid database path".to_string())
        })?;

        let mut conn: SqliteConnection = backend::sqlite::initialize_database(path_str)?;
        backend::sqlite::enable_wal_mode(&mut conn)?;
        backend::sqlite::verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self { conn })
    }

    // ========================================================================
    // Bookings
    // ========================================================================

    /// Inserts a booking with its seed history.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_booking(&mut self, booking: &NewBooking) -> Result<Booking, PersistenceError> {
        mutations::bookings::insert_booking(&mut self.conn, booking)
    }

    /// Applies `patch` if and only if `guard` matches; `Ok(None)` on a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn update_booking(
        &mut self,
        guard: &BookingGuard,
        patch: &BookingPatch,
        at: OffsetDateTime,
    ) -> Result<Option<Booking>, PersistenceError> {
        mutations::bookings::apply_booking_update(&mut self.conn, guard, patch, at)
    }

    /// Sets a booking's payment status unconditionally.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn set_booking_payment_status(
        &mut self,
        booking_id: i64,
        status: PaymentStatus,
        at: OffsetDateTime,
    ) -> Result<bool, PersistenceError> {
        mutations::bookings::set_booking_payment_status(&mut self.conn, booking_id, status, at)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_booking(&mut self, booking_id: i64) -> Result<Option<Booking>, PersistenceError> {
        queries::bookings::get_booking(&mut self.conn, booking_id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_bookings_for_user(
        &mut self,
        user_id: i64,
    ) -> Result<Vec<Booking>, PersistenceError> {
        queries::bookings::list_bookings_for_user(&mut self.conn, user_id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_bookings_for_technician(
        &mut self,
        technician_id: i64,
    ) -> Result<Vec<Booking>, PersistenceError> {
        queries::bookings::list_bookings_for_technician(&mut self.conn, technician_id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_all_bookings(
        &mut self,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, PersistenceError> {
        queries::bookings::list_all_bookings(&mut self.conn, status)
    }

    /// Technicians holding an active booking that overlaps `date`/`time_slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn busy_technicians(
        &mut self,
        date: Date,
        time_slot: Option<&str>,
        exclude_booking: i64,
    ) -> Result<Vec<i64>, PersistenceError> {
        queries::bookings::busy_technicians(&mut self.conn, date, time_slot, exclude_booking)
    }

    // ========================================================================
    // Technicians
    // ========================================================================

    /// # Errors
    ///
    /// Returns `UniqueViolation` if the user already has a profile.
    pub fn insert_technician(
        &mut self,
        technician: &NewTechnician,
        at: OffsetDateTime,
    ) -> Result<Technician, PersistenceError> {
        mutations::technicians::insert_technician(&mut self.conn, technician, at)
    }

    /// # Errors
    ///
    /// Returns `NotFound` if the technician does not exist.
    pub fn update_technician_profile(
        &mut self,
        technician_id: i64,
        update: &TechnicianProfileUpdate,
        at: OffsetDateTime,
    ) -> Result<Technician, PersistenceError> {
        mutations::technicians::update_technician_profile(&mut self.conn, technician_id, update, at)
    }

    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn set_technician_availability(
        &mut self,
        technician_id: i64,
        is_available: bool,
        at: OffsetDateTime,
    ) -> Result<bool, PersistenceError> {
        mutations::technicians::set_technician_availability(
            &mut self.conn,
            technician_id,
            is_available,
            at,
        )
    }

    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn update_verification_status(
        &mut self,
        technician_id: i64,
        from: &[VerificationStatus],
        to: VerificationStatus,
        at: OffsetDateTime,
    ) -> Result<Option<Technician>, PersistenceError> {
        mutations::technicians::update_verification_status(
            &mut self.conn,
            technician_id,
            from,
            to,
            at,
        )
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_technician(
        &mut self,
        technician_id: i64,
    ) -> Result<Option<Technician>, PersistenceError> {
        queries::technicians::get_technician(&mut self.conn, technician_id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_technician_by_user(
        &mut self,
        user_id: i64,
    ) -> Result<Option<Technician>, PersistenceError> {
        queries::technicians::get_technician_by_user(&mut self.conn, user_id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_match_candidates(&mut self) -> Result<Vec<Technician>, PersistenceError> {
        queries::technicians::list_match_candidates(&mut self.conn)
    }

    // ========================================================================
    // Payments
    // ========================================================================

    /// # Errors
    ///
    /// Returns `UniqueViolation` if the booking already has an in-flight payment.
    pub fn insert_payment(
        &mut self,
        payment: &NewPayment,
        at: OffsetDateTime,
    ) -> Result<Payment, PersistenceError> {
        mutations::payments::insert_payment(&mut self.conn, payment, at)
    }

    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn claim_payment(
        &mut self,
        payment_id: i64,
        at: OffsetDateTime,
    ) -> Result<Option<Payment>, PersistenceError> {
        mutations::payments::claim_payment(&mut self.conn, payment_id, at)
    }

    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn complete_payment(
        &mut self,
        payment_id: i64,
        gateway_payment_id: &str,
        at: OffsetDateTime,
    ) -> Result<PaymentCompletion, PersistenceError> {
        mutations::payments::complete_payment(&mut self.conn, payment_id, gateway_payment_id, at)
    }

    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn void_in_flight_payments(
        &mut self,
        booking_id: i64,
        reason: &str,
        at: OffsetDateTime,
    ) -> Result<Vec<i64>, PersistenceError> {
        mutations::payments::void_in_flight_payments(&mut self.conn, booking_id, reason, at)
    }

    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn fail_payment(
        &mut self,
        payment_id: i64,
        reason: &str,
        at: OffsetDateTime,
    ) -> Result<Option<Payment>, PersistenceError> {
        mutations::payments::fail_payment(&mut self.conn, payment_id, reason, at)
    }

    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn reserve_refund(
        &mut self,
        payment_id: i64,
        amount: i64,
        reason: &str,
        processed_by: i64,
        at: OffsetDateTime,
    ) -> Result<Option<(Payment, i64)>, PersistenceError> {
        mutations::payments::reserve_refund(
            &mut self.conn,
            payment_id,
            amount,
            reason,
            processed_by,
            at,
        )
    }

    /// # Errors
    ///
    /// Returns an error if the refund is not pending or the update fails.
    pub fn finalize_refund(
        &mut self,
        refund_id: i64,
        gateway_refund_id: &str,
        at: OffsetDateTime,
    ) -> Result<Payment, PersistenceError> {
        mutations::payments::finalize_refund(&mut self.conn, refund_id, gateway_refund_id, at)
    }

    /// # Errors
    ///
    /// Returns an error if the refund is not pending or the update fails.
    pub fn release_refund(
        &mut self,
        refund_id: i64,
        at: OffsetDateTime,
    ) -> Result<Payment, PersistenceError> {
        mutations::payments::release_refund(&mut self.conn, refund_id, at)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_payment(&mut self, payment_id: i64) -> Result<Option<Payment>, PersistenceError> {
        queries::payments::get_payment(&mut self.conn, payment_id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn latest_payment_for_booking(
        &mut self,
        booking_id: i64,
        statuses: &[PaymentRecordStatus],
    ) -> Result<Option<Payment>, PersistenceError> {
        queries::payments::latest_payment_for_booking(&mut self.conn, booking_id, statuses)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_payments_for_booking(
        &mut self,
        booking_id: i64,
    ) -> Result<Vec<Payment>, PersistenceError> {
        queries::payments::list_payments_for_booking(&mut self.conn, booking_id)
    }

    // ========================================================================
    // Earnings
    // ========================================================================

    /// Returns the stored earning and whether this call created it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_earning_if_absent(
        &mut self,
        earning: &NewEarning,
        at: OffsetDateTime,
    ) -> Result<(Earning, bool), PersistenceError> {
        mutations::earnings::insert_earning_if_absent(&mut self.conn, earning, at)
    }

    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn reverse_earning(
        &mut self,
        booking_id: i64,
        note: &str,
        at: OffsetDateTime,
    ) -> Result<Option<Earning>, PersistenceError> {
        mutations::earnings::reverse_earning(&mut self.conn, booking_id, note, at)
    }

    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn transition_earning(
        &mut self,
        earning_id: i64,
        from: &[EarningStatus],
        to: EarningStatus,
        note: Option<&str>,
        at: OffsetDateTime,
    ) -> Result<Option<Earning>, PersistenceError> {
        mutations::earnings::transition_earning(&mut self.conn, earning_id, from, to, note, at)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_earning(&mut self, earning_id: i64) -> Result<Option<Earning>, PersistenceError> {
        queries::earnings::get_earning(&mut self.conn, earning_id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_earning_for_booking(
        &mut self,
        booking_id: i64,
    ) -> Result<Option<Earning>, PersistenceError> {
        queries::earnings::get_earning_for_booking(&mut self.conn, booking_id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_earnings_for_booking(&mut self, booking_id: i64) -> Result<i64, PersistenceError> {
        queries::earnings::count_earnings_for_booking(&mut self.conn, booking_id)
    }

    // ========================================================================
    // Pricing rules
    // ========================================================================

    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn upsert_pricing_rule(
        &mut self,
        rule: &PricingRuleInput,
        at: OffsetDateTime,
    ) -> Result<PricingRule, PersistenceError> {
        mutations::pricing::upsert_pricing_rule(&mut self.conn, rule, at)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_active_rules_for_service(
        &mut self,
        service_type: &str,
    ) -> Result<Vec<PricingRule>, PersistenceError> {
        queries::pricing::list_active_rules_for_service(&mut self.conn, service_type)
    }
}
