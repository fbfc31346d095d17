// Library module for testable functions

pub mod api;
pub mod config;
pub mod db;
pub mod ingestion;

use chrono::{Datelike, NaiveDate};

/// Australian fiscal year for a date (1 July – 30 June, named after the
/// later calendar year): July 2023 is FY2024, June 2023 is FY2023.
pub fn fiscal_year(date: NaiveDate) -> i32 {
    if date.month() >= 7 {
        date.year() + 1
    } else {
        date.year()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiscal_year_june() {
        // June stays in the same calendar year
        let date = NaiveDate::from_ymd_opt(2023, 6, 30).unwrap();
        assert_eq!(fiscal_year(date), 2023);
    }

    #[test]
    fn test_fiscal_year_july() {
        // July rolls into the next fiscal year
        let date = NaiveDate::from_ymd_opt(2023, 7, 1).unwrap();
        assert_eq!(fiscal_year(date), 2024);
    }

    #[test]
    fn test_fiscal_year_december() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 25).unwrap();
        assert_eq!(fiscal_year(date), 2024);
    }

    #[test]
    fn test_fiscal_year_january() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(fiscal_year(date), 2024);
    }
}
