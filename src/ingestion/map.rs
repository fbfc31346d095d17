//! Map functions - project loosely-typed API JSON onto the raw table schema
//!
//! Pure functions: absent or mistyped optional fields degrade to None, and
//! no stage here returns an error.

use crate::ingestion::types::{CcRecord, DaRecord, OcRecord};
use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde_json::Value;

/// Non-empty trimmed string at `key`, else None.
fn str_field(record: &Value, key: &str) -> Option<String> {
    let s = record.get(key)?.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// First key in `keys` carrying a non-empty string.
fn str_chain(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| str_field(record, k))
}

fn int_field(record: &Value, key: &str) -> Option<i32> {
    match record.get(key)? {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Numeric field that may arrive as a JSON number or a formatted string
/// (currency symbols and thousands separators stripped).
fn decimal_field(record: &Value, key: &str) -> Option<Decimal> {
    match record.get(key)? {
        Value::Number(n) => n.as_f64().and_then(|f| Decimal::try_from(f).ok()),
        Value::String(s) => s.trim().replace(['$', ','], "").parse().ok(),
        _ => None,
    }
}

/// Date field: plain date, RFC 3339 timestamp, or bare ISO timestamp.
fn date_field(record: &Value, key: &str) -> Option<NaiveDate> {
    let s = record.get(key)?.as_str()?.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.date())
}

fn date_chain(record: &Value, keys: &[&str]) -> Option<NaiveDate> {
    keys.iter().find_map(|k| date_field(record, k))
}

/// Council name nested under `Council.CouncilName`.
fn council_name(record: &Value) -> Option<String> {
    str_field(record.get("Council")?, "CouncilName")
}

/// Join an array of objects on one string key, e.g. development types
/// `[{DevelopmentType: "Dwelling"}, ...]` -> `"Dwelling; Dual occupancy"`.
fn join_array(record: &Value, key: &str, subkey: &str, separator: &str) -> Option<String> {
    let items = record.get(key)?.as_array()?;
    let joined: Vec<String> = items
        .iter()
        .filter_map(|item| str_field(item, subkey))
        .collect();
    if joined.is_empty() {
        None
    } else {
        Some(joined.join(separator))
    }
}

/// Primary location = first element of the `Location` array.
fn primary_location(record: &Value) -> Option<&Value> {
    record.get("Location")?.as_array()?.first()
}

fn location_address(record: &Value) -> Option<String> {
    str_field(primary_location(record)?, "FullAddress")
}

/// Lot/plan identifiers from the primary location, joined `"lot/plan"` with
/// `", "` between pairs. Missing halves degrade to empty strings, as the
/// source system does.
fn location_lot_dp(record: &Value) -> Option<String> {
    let lots = primary_location(record)?.get("Lot")?.as_array()?;
    if lots.is_empty() {
        return None;
    }
    let joined: Vec<String> = lots
        .iter()
        .map(|lot| {
            let lot_num = lot.get("Lot").and_then(Value::as_str).unwrap_or("");
            let plan = lot.get("PlanLabel").and_then(Value::as_str).unwrap_or("");
            format!("{}/{}", lot_num, plan)
        })
        .collect();
    Some(joined.join(", "))
}

/// Whole-day delta lodged -> determined; only a strictly positive result is
/// meaningful, anything else is treated as absent.
pub fn days_to_determination(
    lodged: Option<NaiveDate>,
    determined: Option<NaiveDate>,
) -> Option<i32> {
    let days = (determined? - lodged?).num_days();
    if days > 0 {
        i32::try_from(days).ok()
    } else {
        None
    }
}

/// A modification application is flagged either by its application type or
/// by the presence of a modification number.
fn is_modification(record: &Value, modification_number: &Option<String>) -> bool {
    record.get("ApplicationType").and_then(Value::as_str) == Some("Modification Application")
        || modification_number.is_some()
}

/// Map one raw Development Application payload onto the `da_records_raw`
/// column set.
pub fn map_da_record(record: &Value) -> DaRecord {
    let council = council_name(record);
    let lodged_date = date_field(record, "LodgementDate");
    let determined_date = date_chain(record, &["DeterminationDate", "DeterminedDate"]);
    let modification_number =
        str_chain(record, &["ModificationApplicationNumber", "ModificationNumber"]);

    DaRecord {
        application_number: str_chain(
            record,
            &["PlanningPortalApplicationNumber", "ApplicationNumber"],
        ),
        planning_portal_app_number: str_field(record, "PlanningPortalApplicationNumber"),

        lga_code: str_field(record, "LGACode"),
        lga_name: council.clone().or_else(|| str_field(record, "LGAName")),
        consent_authority: council,
        address: location_address(record),
        lot_dp: location_lot_dp(record),

        lodged_date,
        determined_date,
        notification_start_date: date_field(record, "NotificationStartDate"),
        notification_end_date: date_field(record, "NotificationEndDate"),

        determination_type: str_chain(record, &["DeterminationType", "ApplicationType"]),
        status: str_chain(record, &["ApplicationStatus", "Status"]),
        development_type: join_array(record, "DevelopmentType", "DevelopmentType", "; "),
        development_description: str_chain(
            record,
            &["DevelopmentDescription", "Description"],
        ),
        number_of_new_dwellings: int_field(record, "NumberOfNewDwellings"),
        number_of_existing_dwellings: int_field(record, "NumberOfExistingDwellings"),
        estimated_cost: decimal_field(record, "CostOfDevelopment")
            .or_else(|| decimal_field(record, "EstimatedCost")),

        development_category: str_field(record, "DevelopmentCategory"),
        development_class: str_field(record, "DevelopmentClass"),
        is_modification: is_modification(record, &modification_number),
        modification_number,

        applicant_name: str_field(record, "ApplicantName"),
        applicant_type: str_field(record, "ApplicantType"),
        assessment_officer: str_field(record, "AssessmentOfficer"),

        days_to_determination: days_to_determination(lodged_date, determined_date),

        raw_json: record.clone(),
    }
}

/// Map one raw Construction Certificate payload onto the `cc_records_raw`
/// column set.
pub fn map_cc_record(record: &Value) -> CcRecord {
    let council = council_name(record);
    let lodged_date = date_field(record, "LodgementDate");
    let determined_date = date_chain(record, &["DeterminationDate", "DeterminedDate"]);

    CcRecord {
        application_number: str_chain(
            record,
            &["PlanningPortalApplicationNumber", "ApplicationNumber"],
        ),
        planning_portal_app_number: str_field(record, "PlanningPortalApplicationNumber"),

        lga_code: str_field(record, "LGACode"),
        lga_name: council.clone().or_else(|| str_field(record, "LGAName")),
        council_name: council,
        address: location_address(record),
        lot_dp: location_lot_dp(record),

        lodged_date,
        determined_date,
        date_last_updated: date_field(record, "DateLastUpdated"),

        application_status: str_chain(record, &["ApplicationStatus", "Status"]),

        builder_legal_name: str_field(record, "BuilderLegalName"),
        builder_trading_name: str_field(record, "BuilderTradingName"),

        development_purpose: str_field(record, "DevPurpose"),
        storeys_proposed: int_field(record, "StoreysProposed"),
        units_proposed: int_field(record, "UnitsProposed"),
        land_area: decimal_field(record, "LandArea"),
        existing_gross_floor_area: decimal_field(record, "ExistingGrossFloorArea"),
        proposed_gross_floor_area: decimal_field(record, "ProposedGrossFloorArea"),
        cost_of_development: decimal_field(record, "CostOfDevelopment"),

        current_building_use: str_field(record, "CurrentBuildingUse"),
        proposed_building_use: str_field(record, "ProposedBuildingUse"),
        building_code_class: join_array(record, "BuildingCodeClass", "BuildingCodeClass", "; "),
        building_code_description: join_array(
            record,
            "BuildingCodeClass",
            "BuildingCodeDescription",
            "; ",
        ),
        development_type: join_array(record, "DevelopmentType", "DevelopmentType", "; "),

        days_to_determination: days_to_determination(lodged_date, determined_date),

        raw_json: record.clone(),
    }
}

/// Map one raw Occupation Certificate payload onto the `oc_records_raw`
/// column set.
pub fn map_oc_record(record: &Value) -> OcRecord {
    let council = council_name(record);

    OcRecord {
        application_number: str_chain(
            record,
            &["PlanningPortalApplicationNumber", "ApplicationNumber"],
        ),
        planning_portal_app_number: str_field(record, "PlanningPortalApplicationNumber"),

        lga_code: str_field(record, "LGACode"),
        lga_name: council.clone().or_else(|| str_field(record, "LGAName")),
        council_name: council,
        address: location_address(record),

        lodged_date: date_field(record, "LodgementDate"),
        determined_date: date_chain(record, &["DeterminationDate", "DeterminedDate"]),
        date_last_updated: date_field(record, "DateLastUpdated"),

        application_status: str_chain(record, &["ApplicationStatus", "Status"]),
        development_type: join_array(record, "DevelopmentType", "DevelopmentType", "; "),
        units_proposed: int_field(record, "UnitsProposed"),
        storeys_proposed: int_field(record, "StoreysProposed"),

        raw_json: record.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_da() -> Value {
        json!({
            "PlanningPortalApplicationNumber": "PAN-12345",
            "ApplicationNumber": "DA-2023-001",
            "ApplicationType": "Development Application",
            "ApplicationStatus": "Determined",
            "Council": { "CouncilName": "Inner West Council" },
            "LodgementDate": "2023-03-01",
            "DeterminationDate": "2023-05-15",
            "CostOfDevelopment": 1250000.50,
            "NumberOfNewDwellings": 4,
            "DevelopmentType": [
                { "DevelopmentType": "Dwelling" },
                { "DevelopmentType": "Secondary dwelling" }
            ],
            "Location": [{
                "FullAddress": "10 Smith Street Marrickville NSW 2204",
                "Lot": [
                    { "Lot": "12", "PlanLabel": "DP12345" },
                    { "Lot": "13", "PlanLabel": "DP12345" }
                ]
            }]
        })
    }

    #[test]
    fn test_map_da_core_fields() {
        let record = map_da_record(&sample_da());

        assert_eq!(record.application_number.as_deref(), Some("PAN-12345"));
        assert_eq!(record.lga_name.as_deref(), Some("Inner West Council"));
        assert_eq!(record.consent_authority.as_deref(), Some("Inner West Council"));
        assert_eq!(
            record.address.as_deref(),
            Some("10 Smith Street Marrickville NSW 2204")
        );
        assert_eq!(record.status.as_deref(), Some("Determined"));
        assert_eq!(record.number_of_new_dwellings, Some(4));
        assert_eq!(
            record.estimated_cost,
            Some("1250000.50".parse::<Decimal>().unwrap())
        );
    }

    #[test]
    fn test_map_da_flattens_arrays() {
        let record = map_da_record(&sample_da());
        assert_eq!(
            record.development_type.as_deref(),
            Some("Dwelling; Secondary dwelling")
        );
        assert_eq!(record.lot_dp.as_deref(), Some("12/DP12345, 13/DP12345"));
    }

    #[test]
    fn test_map_da_days_to_determination() {
        let record = map_da_record(&sample_da());
        assert_eq!(record.days_to_determination, Some(75));
    }

    #[test]
    fn test_map_da_application_number_fallback() {
        let record = map_da_record(&json!({
            "ApplicationNumber": "DA-2023-002",
            "Council": { "CouncilName": "Blacktown" }
        }));
        assert_eq!(record.application_number.as_deref(), Some("DA-2023-002"));
    }

    #[test]
    fn test_map_da_missing_fields_degrade_to_none() {
        let record = map_da_record(&json!({}));
        assert!(record.application_number.is_none());
        assert!(record.lga_name.is_none());
        assert!(record.estimated_cost.is_none());
        assert!(record.days_to_determination.is_none());
        assert!(!record.is_modification);
    }

    #[test]
    fn test_is_modification_by_type() {
        let record = map_da_record(&json!({
            "ApplicationNumber": "DA-1",
            "ApplicationType": "Modification Application"
        }));
        assert!(record.is_modification);
    }

    #[test]
    fn test_is_modification_by_number() {
        let record = map_da_record(&json!({
            "ApplicationNumber": "DA-1",
            "ApplicationType": "Development Application",
            "ModificationApplicationNumber": "MOD-7"
        }));
        assert!(record.is_modification);
        assert_eq!(record.modification_number.as_deref(), Some("MOD-7"));
    }

    #[test]
    fn test_days_to_determination_rules() {
        let lodged = NaiveDate::from_ymd_opt(2023, 3, 1);
        let same_day = NaiveDate::from_ymd_opt(2023, 3, 1);
        let earlier = NaiveDate::from_ymd_opt(2023, 2, 1);
        let later = NaiveDate::from_ymd_opt(2023, 3, 10);

        assert_eq!(days_to_determination(lodged, later), Some(9));
        // Same-day and negative deltas are not meaningful
        assert_eq!(days_to_determination(lodged, same_day), None);
        assert_eq!(days_to_determination(lodged, earlier), None);
        assert_eq!(days_to_determination(None, later), None);
        assert_eq!(days_to_determination(lodged, None), None);
    }

    #[test]
    fn test_decimal_field_from_string() {
        let record = map_da_record(&json!({
            "ApplicationNumber": "DA-1",
            "CostOfDevelopment": "$1,500,000"
        }));
        assert_eq!(
            record.estimated_cost,
            Some("1500000".parse::<Decimal>().unwrap())
        );
    }

    #[test]
    fn test_date_field_timestamp_forms() {
        let record = map_da_record(&json!({
            "ApplicationNumber": "DA-1",
            "LodgementDate": "2023-03-01T10:30:00Z",
            "DeterminationDate": "2023-05-15T00:00:00"
        }));
        assert_eq!(record.lodged_date, NaiveDate::from_ymd_opt(2023, 3, 1));
        assert_eq!(record.determined_date, NaiveDate::from_ymd_opt(2023, 5, 15));
    }

    #[test]
    fn test_map_cc_building_code_join() {
        let record = map_cc_record(&json!({
            "PlanningPortalApplicationNumber": "CC-1",
            "Council": { "CouncilName": "Penrith" },
            "BuildingCodeClass": [
                { "BuildingCodeClass": "1a", "BuildingCodeDescription": "House" },
                { "BuildingCodeClass": "10a", "BuildingCodeDescription": "Garage" }
            ],
            "UnitsProposed": 2,
            "CostOfDevelopment": 450000
        }));

        assert_eq!(record.building_code_class.as_deref(), Some("1a; 10a"));
        assert_eq!(record.building_code_description.as_deref(), Some("House; Garage"));
        assert_eq!(record.units_proposed, Some(2));
    }

    #[test]
    fn test_map_oc_core_fields() {
        let record = map_oc_record(&json!({
            "ApplicationNumber": "OC-9",
            "Council": { "CouncilName": "Liverpool" },
            "ApplicationStatus": "OC Issued",
            "DateLastUpdated": "2024-01-10"
        }));

        assert_eq!(record.application_number.as_deref(), Some("OC-9"));
        assert_eq!(record.lga_name.as_deref(), Some("Liverpool"));
        assert_eq!(record.application_status.as_deref(), Some("OC Issued"));
        assert_eq!(record.date_last_updated, NaiveDate::from_ymd_opt(2024, 1, 10));
    }
}
