//! Card query builders and summary statistics for the dashboard read path.
//!
//! Every card type maps to one parameterized SELECT against an aggregated
//! table. The handlers wrap each statement in `json_agg(row_to_json(..))`
//! so heterogeneous card shapes come back as a single JSON array, and the
//! summary block is computed here from those values.

use serde_json::{json, Value};

/// Dashboard card types. DA supports all six; CC and OC support the first
/// three plus history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardType {
    Daily,
    Weekly,
    Monthly,
    ThirteenMonth,
    YoyComparison,
    History,
}

impl CardType {
    pub fn parse(value: &str) -> Option<CardType> {
        match value {
            "daily" => Some(CardType::Daily),
            "weekly" => Some(CardType::Weekly),
            "monthly" => Some(CardType::Monthly),
            "13-month" => Some(CardType::ThirteenMonth),
            "yoy-comparison" => Some(CardType::YoyComparison),
            "history" => Some(CardType::History),
            _ => None,
        }
    }
}

/// Optional LGA scoping shared by every card query. Code matches exactly,
/// name matches case-insensitively with wildcards.
#[derive(Debug, Default)]
pub struct LgaFilter {
    clause: &'static str,
    pub param: Option<String>,
    pub label: String,
}

impl LgaFilter {
    pub fn new(lga_code: Option<&str>, lga_name: Option<&str>) -> LgaFilter {
        if let Some(code) = lga_code {
            LgaFilter {
                clause: "AND lga_code = $1",
                param: Some(code.to_string()),
                label: code.to_string(),
            }
        } else if let Some(name) = lga_name {
            LgaFilter {
                clause: "AND lga_name ILIKE $1",
                param: Some(format!("%{}%", name)),
                label: name.to_string(),
            }
        } else {
            LgaFilter {
                clause: "",
                param: None,
                label: "All LGAs".to_string(),
            }
        }
    }
}

pub fn da_query(card: CardType, filter: &LgaFilter) -> String {
    let where_clause = filter.clause;

    match card {
        CardType::Daily => format!(
            r#"
            SELECT
                lga_code, lga_name,
                period_start AS date,
                total_determined, determined_approved, determined_refused,
                determined_withdrawn, determined_deferred, determined_other,
                total_new_dwellings, avg_estimated_cost,
                avg_days_to_determination,
                total_modifications, modification_percentage,
                record_count
            FROM housing_dashboard.da_aggregated
            WHERE period_type = 'daily'
              AND period_start >= CURRENT_DATE - INTERVAL '30 days'
              {where_clause}
            ORDER BY period_start DESC, lga_name
            LIMIT 500
            "#
        ),
        CardType::Weekly => format!(
            r#"
            SELECT
                lga_code, lga_name, period_start, period_end,
                calendar_week, calendar_year,
                total_determined, determined_approved, determined_refused,
                determined_withdrawn,
                total_new_dwellings, avg_estimated_cost,
                avg_days_to_determination, modification_percentage,
                record_count
            FROM housing_dashboard.da_aggregated
            WHERE period_type = 'weekly'
              AND period_start >= CURRENT_DATE - INTERVAL '12 weeks'
              {where_clause}
            ORDER BY period_start DESC, lga_name
            LIMIT 200
            "#
        ),
        CardType::Monthly => format!(
            r#"
            SELECT
                lga_code, lga_name, period_start, period_end,
                calendar_month, calendar_year, fiscal_year,
                total_determined, determined_approved, determined_refused,
                determined_withdrawn, determined_deferred,
                total_new_dwellings, total_estimated_cost, avg_estimated_cost,
                avg_days_to_determination, median_days_to_determination,
                total_modifications, modification_percentage,
                record_count
            FROM housing_dashboard.da_aggregated
            WHERE period_type = 'monthly'
              AND period_start >= CURRENT_DATE - INTERVAL '12 months'
              {where_clause}
            ORDER BY period_start DESC, lga_name
            LIMIT 200
            "#
        ),
        CardType::ThirteenMonth => format!(
            r#"
            SELECT
                lga_code, lga_name, period_start, period_end,
                calendar_month, calendar_year,
                total_determined, determined_approved, determined_refused,
                determined_withdrawn,
                total_new_dwellings, avg_estimated_cost,
                avg_days_to_determination, modification_percentage,
                record_count
            FROM housing_dashboard.da_aggregated
            WHERE period_type = 'monthly'
              AND period_start >= CURRENT_DATE - INTERVAL '13 months'
              {where_clause}
            ORDER BY period_start DESC, lga_name
            LIMIT 200
            "#
        ),
        CardType::YoyComparison => format!(
            r#"
            WITH current_period AS (
                SELECT
                    lga_code, lga_name, period_start, calendar_month,
                    total_determined, determined_approved, determined_refused,
                    total_new_dwellings, avg_days_to_determination
                FROM housing_dashboard.da_aggregated
                WHERE period_type = 'monthly'
                  AND period_start >= CURRENT_DATE - INTERVAL '12 months'
                  AND period_start < CURRENT_DATE
                  {where_clause}
            ),
            previous_period AS (
                SELECT
                    lga_code, lga_name, period_start, calendar_month,
                    total_determined, determined_approved, determined_refused,
                    total_new_dwellings, avg_days_to_determination
                FROM housing_dashboard.da_aggregated
                WHERE period_type = 'monthly'
                  AND period_start >= CURRENT_DATE - INTERVAL '24 months'
                  AND period_start < CURRENT_DATE - INTERVAL '12 months'
                  {where_clause}
            )
            SELECT
                COALESCE(c.lga_code, p.lga_code) AS lga_code,
                COALESCE(c.lga_name, p.lga_name) AS lga_name,
                c.period_start AS current_period_start,
                c.calendar_month AS month,
                c.total_determined AS current_total_determined,
                c.determined_approved AS current_determined_approved,
                c.determined_refused AS current_determined_refused,
                c.total_new_dwellings AS current_total_new_dwellings,
                c.avg_days_to_determination AS current_avg_days,
                p.total_determined AS previous_total_determined,
                p.determined_approved AS previous_determined_approved,
                p.determined_refused AS previous_determined_refused,
                p.total_new_dwellings AS previous_total_new_dwellings,
                p.avg_days_to_determination AS previous_avg_days,
                CASE
                    WHEN p.total_determined > 0
                    THEN ((c.total_determined - p.total_determined)::DECIMAL
                        / p.total_determined * 100)
                    ELSE NULL
                END AS pct_change_determined,
                CASE
                    WHEN p.determined_approved > 0
                    THEN ((c.determined_approved - p.determined_approved)::DECIMAL
                        / p.determined_approved * 100)
                    ELSE NULL
                END AS pct_change_approved
            FROM current_period c
            FULL OUTER JOIN previous_period p
                ON c.lga_code = p.lga_code
                AND c.calendar_month = p.calendar_month
            ORDER BY current_period_start DESC, lga_name
            "#
        ),
        CardType::History => format!(
            r#"
            SELECT
                lga_code, lga_name, period_start, period_end,
                calendar_month, calendar_year, fiscal_year,
                total_determined, determined_approved, determined_refused,
                determined_withdrawn,
                total_new_dwellings, avg_estimated_cost,
                avg_days_to_determination, modification_percentage,
                record_count
            FROM housing_dashboard.da_aggregated
            WHERE period_type = 'monthly'
              {where_clause}
            ORDER BY period_start ASC, lga_name
            "#
        ),
    }
}

/// CC cards: no YoY or 13-month variants.
pub fn cc_query(card: CardType, filter: &LgaFilter) -> Option<String> {
    let where_clause = filter.clause;

    let sql = match card {
        CardType::Daily => format!(
            r#"
            SELECT
                lga_code, lga_name,
                period_start AS date,
                total_applications, total_approved, total_withdrawn,
                total_cancelled,
                total_units_proposed, avg_estimated_cost,
                record_count
            FROM housing_dashboard.cc_aggregated
            WHERE period_type = 'daily'
              AND period_start >= CURRENT_DATE - INTERVAL '30 days'
              {where_clause}
            ORDER BY period_start DESC, lga_name
            LIMIT 500
            "#
        ),
        CardType::Weekly => format!(
            r#"
            SELECT
                lga_code, lga_name, period_start, period_end,
                calendar_week, calendar_year,
                total_applications, total_approved, total_withdrawn,
                total_cancelled,
                total_units_proposed, avg_estimated_cost, avg_storeys,
                record_count
            FROM housing_dashboard.cc_aggregated
            WHERE period_type = 'weekly'
              AND period_start >= CURRENT_DATE - INTERVAL '12 weeks'
              {where_clause}
            ORDER BY period_start DESC, lga_name
            LIMIT 200
            "#
        ),
        CardType::Monthly => format!(
            r#"
            SELECT
                lga_code, lga_name, period_start, period_end,
                calendar_month, calendar_year, fiscal_year,
                total_applications, total_approved, total_withdrawn,
                total_cancelled,
                total_estimated_cost, avg_estimated_cost,
                total_proposed_floor_area, avg_proposed_floor_area,
                total_units_proposed, avg_storeys,
                record_count
            FROM housing_dashboard.cc_aggregated
            WHERE period_type = 'monthly'
              AND period_start >= CURRENT_DATE - INTERVAL '12 months'
              {where_clause}
            ORDER BY period_start DESC, lga_name
            LIMIT 200
            "#
        ),
        CardType::History => format!(
            r#"
            SELECT
                lga_code, lga_name, period_start, period_end,
                calendar_month, calendar_year, fiscal_year,
                total_applications, total_approved, total_withdrawn,
                total_cancelled,
                total_units_proposed, avg_estimated_cost,
                record_count
            FROM housing_dashboard.cc_aggregated
            WHERE period_type = 'monthly'
              {where_clause}
            ORDER BY period_start ASC, lga_name
            "#
        ),
        CardType::ThirteenMonth | CardType::YoyComparison => return None,
    };

    Some(sql)
}

/// OC cards: same shape restriction as CC.
pub fn oc_query(card: CardType, filter: &LgaFilter) -> Option<String> {
    let where_clause = filter.clause;

    let sql = match card {
        CardType::Daily => format!(
            r#"
            SELECT
                lga_code, lga_name,
                period_start AS date,
                total_determined, determined_approved, determined_withdrawn,
                record_count
            FROM housing_dashboard.oc_aggregated
            WHERE period_type = 'daily'
              AND period_start >= CURRENT_DATE - INTERVAL '30 days'
              {where_clause}
            ORDER BY period_start DESC, lga_name
            LIMIT 500
            "#
        ),
        CardType::Weekly => format!(
            r#"
            SELECT
                lga_code, lga_name, period_start, period_end,
                calendar_week, calendar_year,
                total_determined, determined_approved, determined_withdrawn,
                record_count
            FROM housing_dashboard.oc_aggregated
            WHERE period_type = 'weekly'
              AND period_start >= CURRENT_DATE - INTERVAL '12 weeks'
              {where_clause}
            ORDER BY period_start DESC, lga_name
            LIMIT 200
            "#
        ),
        CardType::Monthly => format!(
            r#"
            SELECT
                lga_code, lga_name, period_start, period_end,
                calendar_month, calendar_year, fiscal_year,
                total_determined, determined_approved, determined_withdrawn,
                record_count
            FROM housing_dashboard.oc_aggregated
            WHERE period_type = 'monthly'
              AND period_start >= CURRENT_DATE - INTERVAL '12 months'
              {where_clause}
            ORDER BY period_start DESC, lga_name
            LIMIT 200
            "#
        ),
        CardType::History => format!(
            r#"
            SELECT
                lga_code, lga_name, period_start, period_end,
                calendar_month, calendar_year, fiscal_year,
                total_determined, determined_approved, determined_withdrawn,
                record_count
            FROM housing_dashboard.oc_aggregated
            WHERE period_type = 'monthly'
              {where_clause}
            ORDER BY period_start ASC, lga_name
            "#
        ),
        CardType::ThirteenMonth | CardType::YoyComparison => return None,
    };

    Some(sql)
}

/// Distinct LGAs seen across all three aggregated tables.
pub const LGA_LIST_SQL: &str = r#"
    SELECT DISTINCT lga_code, lga_name FROM (
        SELECT lga_code, lga_name FROM housing_dashboard.da_aggregated
        UNION
        SELECT lga_code, lga_name FROM housing_dashboard.cc_aggregated
        UNION
        SELECT lga_code, lga_name FROM housing_dashboard.oc_aggregated
    ) lgas
    WHERE lga_name IS NOT NULL
    ORDER BY lga_name
"#;

fn sum_field(rows: &[Value], keys: &[&str]) -> f64 {
    rows.iter()
        .map(|row| {
            keys.iter()
                .find_map(|key| row.get(*key).and_then(Value::as_f64))
                .unwrap_or(0.0)
        })
        .sum()
}

fn avg_field(rows: &[Value], keys: &[&str]) -> Option<f64> {
    let values: Vec<f64> = rows
        .iter()
        .filter_map(|row| {
            keys.iter()
                .find_map(|key| row.get(*key).and_then(Value::as_f64))
        })
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Rate as a percentage rounded to one decimal; 0 when the denominator is
/// zero (an empty window must not divide by zero).
fn percentage(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        (numerator / denominator * 1000.0).round() / 10.0
    } else {
        0.0
    }
}

pub fn da_summary(rows: &[Value]) -> Value {
    if rows.is_empty() {
        return json!({
            "total_records": 0,
            "total_determined": 0,
            "total_approved": 0,
            "total_refused": 0,
            "approval_rate": 0,
        });
    }

    let total_determined = sum_field(rows, &["total_determined", "current_total_determined"]);
    let total_approved = sum_field(rows, &["determined_approved", "current_determined_approved"]);
    let total_refused = sum_field(rows, &["determined_refused", "current_determined_refused"]);
    let total_withdrawn = sum_field(rows, &["determined_withdrawn"]);
    let total_new_dwellings =
        sum_field(rows, &["total_new_dwellings", "current_total_new_dwellings"]);
    let avg_days = avg_field(rows, &["avg_days_to_determination", "current_avg_days"]);

    json!({
        "total_records": rows.len(),
        "total_determined": total_determined,
        "total_approved": total_approved,
        "total_refused": total_refused,
        "total_withdrawn": total_withdrawn,
        "total_new_dwellings": total_new_dwellings,
        "approval_rate": percentage(total_approved, total_determined),
        "avg_days_to_decision": avg_days.map(|d| d.round()),
    })
}

pub fn cc_summary(rows: &[Value]) -> Value {
    if rows.is_empty() {
        return json!({
            "total_records": 0,
            "total_applications": 0,
            "total_approved": 0,
            "approval_rate": 0,
        });
    }

    let total_applications = sum_field(rows, &["total_applications"]);
    let total_approved = sum_field(rows, &["total_approved"]);
    let total_withdrawn = sum_field(rows, &["total_withdrawn"]);
    let total_cancelled = sum_field(rows, &["total_cancelled"]);
    let total_units = sum_field(rows, &["total_units_proposed"]);

    json!({
        "total_records": rows.len(),
        "total_applications": total_applications,
        "total_approved": total_approved,
        "total_withdrawn": total_withdrawn,
        "total_cancelled": total_cancelled,
        "total_units_proposed": total_units,
        "approval_rate": percentage(total_approved, total_applications),
    })
}

pub fn oc_summary(rows: &[Value]) -> Value {
    if rows.is_empty() {
        return json!({
            "total_records": 0,
            "total_determined": 0,
            "total_approved": 0,
            "approval_rate": 0,
        });
    }

    let total_determined = sum_field(rows, &["total_determined"]);
    let total_approved = sum_field(rows, &["determined_approved"]);
    let total_withdrawn = sum_field(rows, &["determined_withdrawn"]);

    json!({
        "total_records": rows.len(),
        "total_determined": total_determined,
        "total_approved": total_approved,
        "total_withdrawn": total_withdrawn,
        "approval_rate": percentage(total_approved, total_determined),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_type_parse() {
        assert_eq!(CardType::parse("daily"), Some(CardType::Daily));
        assert_eq!(CardType::parse("13-month"), Some(CardType::ThirteenMonth));
        assert_eq!(
            CardType::parse("yoy-comparison"),
            Some(CardType::YoyComparison)
        );
        assert_eq!(CardType::parse("hourly"), None);
    }

    #[test]
    fn test_lga_filter_code_takes_precedence() {
        let filter = LgaFilter::new(Some("17200"), Some("Sydney"));
        assert_eq!(filter.clause, "AND lga_code = $1");
        assert_eq!(filter.param.as_deref(), Some("17200"));
        assert_eq!(filter.label, "17200");
    }

    #[test]
    fn test_lga_filter_name_wildcarded() {
        let filter = LgaFilter::new(None, Some("Parramatta"));
        assert_eq!(filter.clause, "AND lga_name ILIKE $1");
        assert_eq!(filter.param.as_deref(), Some("%Parramatta%"));
    }

    #[test]
    fn test_lga_filter_unscoped() {
        let filter = LgaFilter::new(None, None);
        assert_eq!(filter.clause, "");
        assert!(filter.param.is_none());
        assert_eq!(filter.label, "All LGAs");
    }

    #[test]
    fn test_da_daily_query_window() {
        let sql = da_query(CardType::Daily, &LgaFilter::new(None, None));
        assert!(sql.contains("period_type = 'daily'"));
        assert!(sql.contains("INTERVAL '30 days'"));
        assert!(sql.contains("LIMIT 500"));
        assert!(!sql.contains("$1"));
    }

    #[test]
    fn test_da_history_query_ascending_unbounded() {
        let sql = da_query(CardType::History, &LgaFilter::new(None, Some("Sydney")));
        assert!(sql.contains("period_start ASC"));
        assert!(sql.contains("lga_name ILIKE $1"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn test_cc_rejects_yoy() {
        let filter = LgaFilter::new(None, None);
        assert!(cc_query(CardType::YoyComparison, &filter).is_none());
        assert!(oc_query(CardType::ThirteenMonth, &filter).is_none());
        assert!(cc_query(CardType::History, &filter).is_some());
    }

    #[test]
    fn test_da_summary_totals_and_rate() {
        let rows = vec![
            json!({"total_determined": 10, "determined_approved": 8, "determined_refused": 1,
                   "avg_days_to_determination": 40.0}),
            json!({"total_determined": 10, "determined_approved": 7, "determined_refused": 2,
                   "avg_days_to_determination": 60.0}),
        ];
        let summary = da_summary(&rows);
        assert_eq!(summary["total_records"], 2);
        assert_eq!(summary["total_determined"], 20.0);
        assert_eq!(summary["approval_rate"], 75.0);
        assert_eq!(summary["avg_days_to_decision"], 50.0);
    }

    #[test]
    fn test_da_summary_yoy_column_fallbacks() {
        let rows = vec![json!({
            "current_total_determined": 5,
            "current_determined_approved": 4,
            "current_avg_days": 30.5,
        })];
        let summary = da_summary(&rows);
        assert_eq!(summary["total_determined"], 5.0);
        assert_eq!(summary["total_approved"], 4.0);
        assert_eq!(summary["approval_rate"], 80.0);
    }

    #[test]
    fn test_summary_zero_determined_rate_is_zero() {
        // Rows exist but nothing was determined; rate must be 0, not NaN
        let rows = vec![json!({"total_determined": 0, "determined_approved": 0})];
        let summary = da_summary(&rows);
        assert_eq!(summary["approval_rate"], 0.0);

        let summary = oc_summary(&rows);
        assert_eq!(summary["approval_rate"], 0.0);
    }

    #[test]
    fn test_empty_summaries() {
        assert_eq!(da_summary(&[])["total_records"], 0);
        assert_eq!(cc_summary(&[])["total_records"], 0);
        assert_eq!(oc_summary(&[])["total_records"], 0);
    }
}
