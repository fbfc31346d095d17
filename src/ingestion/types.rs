//! Core data types for the ingestion pipeline
//! Pure data structures with no behavior

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

/// The three planning-application data domains, ingested by near-identical
/// pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// Development Applications
    Da,
    /// Construction Certificates
    Cc,
    /// Occupation Certificates
    Oc,
}

impl Domain {
    pub fn parse(s: &str) -> Option<Domain> {
        match s.to_ascii_lowercase().as_str() {
            "da" => Some(Domain::Da),
            "cc" => Some(Domain::Cc),
            "oc" => Some(Domain::Oc),
            _ => None,
        }
    }

    /// API resource name under the ePlanning base URL
    pub fn api_resource(&self) -> &'static str {
        match self {
            Domain::Da => "OnlineDA",
            Domain::Cc => "OnlineCC",
            Domain::Oc => "OnlineOC",
        }
    }

}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Domain::Da => write!(f, "DA"),
            Domain::Cc => write!(f, "CC"),
            Domain::Oc => write!(f, "OC"),
        }
    }
}

/// Response envelope of the paging API. Records ride under `Application`
/// for all three resources.
#[derive(Debug, Deserialize)]
pub struct PageEnvelope {
    #[serde(rename = "PageSize")]
    pub page_size: Option<u32>,
    #[serde(rename = "PageNumber")]
    pub page_number: Option<u32>,
    #[serde(rename = "TotalPages")]
    pub total_pages: u32,
    #[serde(rename = "TotalCount")]
    pub total_count: u64,
    #[serde(rename = "Application", default)]
    pub records: Vec<Value>,
}

/// Normalized Development Application row. Fields are optional where the
/// API omits them; the writer enforces the required ones.
#[derive(Debug, Clone)]
pub struct DaRecord {
    pub application_number: Option<String>,
    pub planning_portal_app_number: Option<String>,

    pub lga_code: Option<String>,
    pub lga_name: Option<String>,
    pub consent_authority: Option<String>,
    pub address: Option<String>,
    pub lot_dp: Option<String>,

    pub lodged_date: Option<NaiveDate>,
    pub determined_date: Option<NaiveDate>,
    pub notification_start_date: Option<NaiveDate>,
    pub notification_end_date: Option<NaiveDate>,

    pub determination_type: Option<String>,
    pub status: Option<String>,
    pub development_type: Option<String>,
    pub development_description: Option<String>,
    pub number_of_new_dwellings: Option<i32>,
    pub number_of_existing_dwellings: Option<i32>,
    pub estimated_cost: Option<Decimal>,

    pub development_category: Option<String>,
    pub development_class: Option<String>,
    pub modification_number: Option<String>,
    pub is_modification: bool,

    pub applicant_name: Option<String>,
    pub applicant_type: Option<String>,
    pub assessment_officer: Option<String>,

    pub days_to_determination: Option<i32>,

    /// Full source payload, retained for forward compatibility
    pub raw_json: Value,
}

/// Normalized Construction Certificate row.
#[derive(Debug, Clone)]
pub struct CcRecord {
    pub application_number: Option<String>,
    pub planning_portal_app_number: Option<String>,

    pub lga_code: Option<String>,
    pub lga_name: Option<String>,
    pub council_name: Option<String>,
    pub address: Option<String>,
    pub lot_dp: Option<String>,

    pub lodged_date: Option<NaiveDate>,
    pub determined_date: Option<NaiveDate>,
    pub date_last_updated: Option<NaiveDate>,

    pub application_status: Option<String>,

    pub builder_legal_name: Option<String>,
    pub builder_trading_name: Option<String>,

    pub development_purpose: Option<String>,
    pub storeys_proposed: Option<i32>,
    pub units_proposed: Option<i32>,
    pub land_area: Option<Decimal>,
    pub existing_gross_floor_area: Option<Decimal>,
    pub proposed_gross_floor_area: Option<Decimal>,
    pub cost_of_development: Option<Decimal>,

    pub current_building_use: Option<String>,
    pub proposed_building_use: Option<String>,
    pub building_code_class: Option<String>,
    pub building_code_description: Option<String>,
    pub development_type: Option<String>,

    pub days_to_determination: Option<i32>,

    pub raw_json: Value,
}

/// Normalized Occupation Certificate row.
#[derive(Debug, Clone)]
pub struct OcRecord {
    pub application_number: Option<String>,
    pub planning_portal_app_number: Option<String>,

    pub lga_code: Option<String>,
    pub lga_name: Option<String>,
    pub council_name: Option<String>,
    pub address: Option<String>,

    pub lodged_date: Option<NaiveDate>,
    pub determined_date: Option<NaiveDate>,
    pub date_last_updated: Option<NaiveDate>,

    pub application_status: Option<String>,
    pub development_type: Option<String>,
    pub units_proposed: Option<i32>,
    pub storeys_proposed: Option<i32>,

    pub raw_json: Value,
}

/// Upsert operation statistics
#[derive(Debug, Default, Clone)]
pub struct WriteStats {
    pub success: usize,
    pub errors: usize,
    pub skipped: usize,
}

impl std::fmt::Display for WriteStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "success: {}, errors: {}, skipped: {}",
            self.success, self.errors, self.skipped
        )
    }
}

/// Insert-vs-update accounting for one aggregation pass
#[derive(Debug, Default, Clone, Copy)]
pub struct AggregateStats {
    pub inserted: usize,
    pub updated: usize,
}

impl std::fmt::Display for AggregateStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} inserted, {} updated", self.inserted, self.updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_parse() {
        assert_eq!(Domain::parse("da"), Some(Domain::Da));
        assert_eq!(Domain::parse("CC"), Some(Domain::Cc));
        assert_eq!(Domain::parse("Oc"), Some(Domain::Oc));
        assert_eq!(Domain::parse("ba"), None);
    }

    #[test]
    fn test_page_envelope_deserialize() {
        let json = r#"{
            "PageSize": 1000,
            "PageNumber": 1,
            "TotalPages": 42,
            "TotalCount": 41234,
            "Application": [{"ApplicationNumber": "DA-1"}]
        }"#;

        let envelope: PageEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.total_pages, 42);
        assert_eq!(envelope.total_count, 41234);
        assert_eq!(envelope.records.len(), 1);
    }

    #[test]
    fn test_page_envelope_missing_records_array() {
        // Some error-ish responses omit the records array entirely
        let json = r#"{"TotalPages": 0, "TotalCount": 0}"#;
        let envelope: PageEnvelope = serde_json::from_str(json).unwrap();
        assert!(envelope.records.is_empty());
    }
}
