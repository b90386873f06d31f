// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Read-only queries.
//!
//! ## Module Organization
//!
//! - `bookings`: Booking aggregates with their status and reschedule history
//! - `technicians`: Technician profiles and match candidates
//! - `payments`: Payments with embedded refund entries
//! - `earnings`: Earning lookups
//! - `pricing`: Pricing rules

pub mod bookings;
pub mod earnings;
pub mod payments;
pub mod pricing;
pub mod technicians;
