use chrono::NaiveDate;

use crate::address::{combine_address_with, DEFAULT_SEPARATOR};
use crate::columns::HeaderMapping;
use crate::dates::normalize_date;

/// Stored in place of an empty description.
pub const NO_DESCRIPTION: &str = "No description provided";

/// One development application, ready for storage.
#[derive(Debug, Clone, PartialEq)]
pub struct DevelopmentApplication {
    pub application_number: String,
    pub address: String,
    pub description: String,
    pub information_url: String,
    pub comment_url: String,
    pub scrape_date: NaiveDate,
    /// `YYYY-MM-DD`, or empty when the source date was missing or unparseable.
    pub received_date: String,
}

impl DevelopmentApplication {
    /// Build a record, refusing one without an application number or address.
    pub fn new(
        application_number: &str,
        address: &str,
        description: &str,
        information_url: &str,
        comment_url: &str,
        scrape_date: NaiveDate,
        received_date: String,
    ) -> Option<Self> {
        let application_number = application_number.trim();
        let address = address.trim();
        if application_number.is_empty() || address.is_empty() {
            return None;
        }

        let description = match description.trim() {
            "" => NO_DESCRIPTION,
            d => d,
        };

        Some(Self {
            application_number: application_number.to_string(),
            address: address.to_string(),
            description: description.to_string(),
            information_url: information_url.to_string(),
            comment_url: comment_url.to_string(),
            scrape_date,
            received_date,
        })
    }
}

/// Per-file values shared by every row of one CSV.
#[derive(Debug, Clone)]
pub struct RowContext {
    pub source_url: String,
    pub comment_url: String,
    pub scrape_date: NaiveDate,
    pub address_separator: String,
}

impl RowContext {
    pub fn new(source_url: &str, comment_url: &str, scrape_date: NaiveDate) -> Self {
        Self {
            source_url: source_url.to_string(),
            comment_url: comment_url.to_string(),
            scrape_date,
            address_separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    pub fn with_separator(mut self, separator: &str) -> Self {
        self.address_separator = separator.to_string();
        self
    }
}

/// Cell at a mapped position; `None` when unmapped or past the end of the row.
fn cell<S: AsRef<str>>(row: &[S], idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| row.get(i)).map(|c| c.as_ref())
}

/// Turn one data row into a record. Rows that end up without an application
/// number or an address are dropped by returning `None`.
pub fn extract_record<S: AsRef<str>>(
    mapping: &HeaderMapping,
    row: &[S],
    ctx: &RowContext,
) -> Option<DevelopmentApplication> {
    let application_number = cell(row, mapping.application_number).unwrap_or("").trim();
    let address_part_1 = cell(row, mapping.address_part_1).unwrap_or("").trim();
    let address_part_2 = cell(row, mapping.address_part_2).unwrap_or("").trim();
    let description = cell(row, mapping.description).unwrap_or("").trim();
    let received_raw = cell(row, mapping.received_date);

    let address = combine_address_with(address_part_1, address_part_2, &ctx.address_separator);
    let received_date = normalize_date(received_raw);

    DevelopmentApplication::new(
        application_number,
        &address,
        description,
        &ctx.source_url,
        &ctx.comment_url,
        ctx.scrape_date,
        received_date,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::locate_columns;

    const HEADER: [&str; 5] = [
        "ApplicationNumber",
        "PropertyAddress",
        "PropertySuburbPostCode",
        "ApplicationDesc",
        "LodgementDate",
    ];

    fn ctx() -> RowContext {
        RowContext::new(
            "https://data.example.gov.au/files/da-2020.csv",
            "https://www.example.gov.au/contact",
            NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
        )
    }

    #[test]
    fn test_full_row() {
        let mapping = locate_columns(&HEADER);
        let row = ["DA123", "1 Smith St", "Adelaide 5000", "New shed", "1/02/2020 9:00:00 AM"];

        let record = extract_record(&mapping, &row, &ctx()).unwrap();
        assert_eq!(record.application_number, "DA123");
        assert_eq!(record.address, "1 Smith St Adelaide 5000");
        assert_eq!(record.description, "New shed");
        assert_eq!(record.received_date, "2020-02-01");
        assert_eq!(record.information_url, "https://data.example.gov.au/files/da-2020.csv");
        assert_eq!(record.comment_url, "https://www.example.gov.au/contact");
        assert_eq!(record.scrape_date, NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
    }

    #[test]
    fn test_cells_are_trimmed() {
        let mapping = locate_columns(&HEADER);
        let row = ["  DA9 ", " 2 High St ", "", "  Carport  ", ""];

        let record = extract_record(&mapping, &row, &ctx()).unwrap();
        assert_eq!(record.application_number, "DA9");
        assert_eq!(record.address, "2 High St");
        assert_eq!(record.description, "Carport");
    }

    #[test]
    fn test_empty_application_number_drops_row() {
        let mapping = locate_columns(&HEADER);
        let row = ["   ", "1 Smith St", "Adelaide 5000", "New shed", ""];
        assert!(extract_record(&mapping, &row, &ctx()).is_none());
    }

    #[test]
    fn test_empty_address_drops_row() {
        let mapping = locate_columns(&HEADER);
        let row = ["DA123", " ", "", "New shed", ""];
        assert!(extract_record(&mapping, &row, &ctx()).is_none());
    }

    #[test]
    fn test_description_sentinel_only_when_empty() {
        let mapping = locate_columns(&HEADER);

        let row = ["DA1", "1 Smith St", "", "  ", ""];
        let record = extract_record(&mapping, &row, &ctx()).unwrap();
        assert_eq!(record.description, NO_DESCRIPTION);

        let row = ["DA1", "1 Smith St", "", "x", ""];
        let record = extract_record(&mapping, &row, &ctx()).unwrap();
        assert_eq!(record.description, "x");
    }

    #[test]
    fn test_unmapped_description_uses_sentinel() {
        let mapping = locate_columns(&["ApplicationNumber", "PropertyAddress"]);
        let record = extract_record(&mapping, &["DA1", "1 Smith St"], &ctx()).unwrap();
        assert_eq!(record.description, NO_DESCRIPTION);
        assert_eq!(record.received_date, "");
    }

    #[test]
    fn test_unparseable_date_keeps_row() {
        let mapping = locate_columns(&HEADER);
        let row = ["DA1", "1 Smith St", "Adelaide 5000", "Shed", "2020-02-01"];
        let record = extract_record(&mapping, &row, &ctx()).unwrap();
        assert_eq!(record.received_date, "");
    }

    #[test]
    fn test_suburb_only_address() {
        let mapping = locate_columns(&["ApplicationNumber", "PropertySuburbPostCode"]);
        let record = extract_record(&mapping, &["DA1", "Adelaide  5000"], &ctx()).unwrap();
        assert_eq!(record.address, "Adelaide 5000");
    }

    #[test]
    fn test_short_row_reads_missing_cells_as_empty() {
        let mapping = locate_columns(&HEADER);
        let record = extract_record(&mapping, &["DA1", "1 Smith St"], &ctx()).unwrap();
        assert_eq!(record.address, "1 Smith St");
        assert_eq!(record.description, NO_DESCRIPTION);
        assert_eq!(record.received_date, "");
    }

    #[test]
    fn test_custom_separator() {
        let mapping = locate_columns(&HEADER);
        let row = ["DA123", "1 Smith St", "Adelaide 5000", "New shed", ""];
        let record = extract_record(&mapping, &row, &ctx().with_separator(", ")).unwrap();
        assert_eq!(record.address, "1 Smith St, Adelaide 5000");
    }

    #[test]
    fn test_new_validates_mandatory_fields() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(DevelopmentApplication::new("", "1 Smith St", "", "", "", date, String::new()).is_none());
        assert!(DevelopmentApplication::new("DA1", "", "", "", "", date, String::new()).is_none());
        assert!(DevelopmentApplication::new("DA1", "1 Smith St", "", "", "", date, String::new()).is_some());
    }
}
