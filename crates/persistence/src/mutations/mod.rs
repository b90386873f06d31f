// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! State-changing operations.
//!
//! Every mutation that depends on a precondition is a single conditional
//! `UPDATE` whose `WHERE` clause encodes the precondition. A mutation that
//! matched no row returns `Ok(None)` and changes nothing; classifying the
//! miss is left to the caller.
//!
//! ## Module Organization
//!
//! - `bookings`: Booking creation and guarded status updates
//! - `technicians`: Profile registration, edits, availability, verification
//! - `payments`: Payment records, confirmation, and refund reservation
//! - `earnings`: Idempotent creation, reversal, and status changes
//! - `pricing`: Pricing rule upsert

pub mod bookings;
pub mod earnings;
pub mod payments;
pub mod pricing;
pub mod technicians;

pub use bookings::{BookingGuard, BookingPatch, HistoryNote, NewBooking, RescheduleNote};
pub use earnings::NewEarning;
pub use payments::{BOOKING_CANCELLED_REASON, NewPayment, PaymentCompletion};
pub use pricing::PricingRuleInput;
pub use technicians::{NewTechnician, TechnicianProfileUpdate};
