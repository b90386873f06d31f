// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use diesel::SqliteConnection;
use diesel::prelude::*;
use repairhub_domain::PricingRule;

use crate::data_models::PricingRuleRow;
use crate::diesel_schema::pricing_rules;
use crate::error::PersistenceError;

/// Lists the active pricing rules for a service type (case-insensitive),
/// in id order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_active_rules_for_service(
    conn: &mut SqliteConnection,
    service_type: &str,
) -> Result<Vec<PricingRule>, PersistenceError> {
    let rows: Vec<PricingRuleRow> = pricing_rules::table
        .filter(pricing_rules::service_type.eq(service_type.to_lowercase()))
        .filter(pricing_rules::is_active.eq(1))
        .order(pricing_rules::rule_id.asc())
        .select(PricingRuleRow::as_select())
        .load(conn)?;
    rows.into_iter().map(PricingRuleRow::into_domain).collect()
}

/// Finds the rule keyed by `(service_type, issue_type)`, active or not.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find_rule(
    conn: &mut SqliteConnection,
    service_type: &str,
    issue_type: Option<&str>,
) -> Result<Option<PricingRuleRow>, PersistenceError> {
    let mut query = pricing_rules::table
        .filter(pricing_rules::service_type.eq(service_type.to_lowercase()))
        .select(PricingRuleRow::as_select())
        .into_boxed();

    query = match issue_type {
        Some(issue) => query.filter(pricing_rules::issue_type.eq(issue.to_lowercase())),
        None => query.filter(pricing_rules::issue_type.is_null()),
    };

    Ok(query.first(conn).optional()?)
}
