// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use diesel::SqliteConnection;
use diesel::prelude::*;
use repairhub_domain::{PricingRule, UrgencyMultipliers};
use time::OffsetDateTime;
use tracing::info;

use crate::data_models::{PricingRuleRow, PricingRuleValues, format_timestamp, to_flag};
use crate::diesel_schema::pricing_rules;
use crate::error::PersistenceError;
use crate::queries;

/// A pricing rule definition. Service and issue types are stored
/// lowercased, and `(service_type, issue_type)` identifies the rule.
#[derive(Debug, Clone)]
pub struct PricingRuleInput {
    pub service_type: String,
    pub issue_type: Option<String>,
    pub base_price: i64,
    pub multipliers: UrgencyMultipliers,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub is_active: bool,
}

/// Inserts the rule, or replaces the existing rule with the same key.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn upsert_pricing_rule(
    conn: &mut SqliteConnection,
    rule: &PricingRuleInput,
    at: OffsetDateTime,
) -> Result<PricingRule, PersistenceError> {
    let values = PricingRuleValues {
        service_type: rule.service_type.to_lowercase(),
        issue_type: rule.issue_type.as_ref().map(|i| i.to_lowercase()),
        base_price: rule.base_price,
        normal_multiplier: rule.multipliers.normal,
        urgent_multiplier: rule.multipliers.urgent,
        emergency_multiplier: rule.multipliers.emergency,
        min_price: rule.min_price,
        max_price: rule.max_price,
        is_active: to_flag(rule.is_active),
        updated_at: format_timestamp(at)?,
    };

    conn.transaction::<_, PersistenceError, _>(|conn| {
        let existing: Option<PricingRuleRow> =
            queries::pricing::find_rule(conn, &rule.service_type, rule.issue_type.as_deref())?;

        let rule_id: i64 = match existing {
            Some(row) => {
                diesel::update(pricing_rules::table.filter(pricing_rules::rule_id.eq(row.rule_id)))
                    .set(&values)
                    .execute(conn)?;
                row.rule_id
            }
            None => diesel::insert_into(pricing_rules::table)
                .values(&values)
                .returning(pricing_rules::rule_id)
                .get_result(conn)?,
        };

        info!(
            rule_id,
            service_type = values.service_type.as_str(),
            "Pricing rule saved"
        );

        pricing_rules::table
            .filter(pricing_rules::rule_id.eq(rule_id))
            .select(PricingRuleRow::as_select())
            .first::<PricingRuleRow>(conn)?
            .into_domain()
    })
}
