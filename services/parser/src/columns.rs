//! Header-name to column-position mapping.
//!
//! Publishers rename, reorder, and drop columns between cycles, so positions
//! are looked up by exact header name once per file and never assumed.

/// Header naming the application reference.
pub const APPLICATION_NUMBER: &str = "ApplicationNumber";
/// Header naming the lodgement (received) date.
pub const LODGEMENT_DATE: &str = "LodgementDate";
/// Header naming the free-text description of the works.
pub const APPLICATION_DESC: &str = "ApplicationDesc";
/// Header naming the street part of the address.
pub const PROPERTY_ADDRESS: &str = "PropertyAddress";
/// Header naming the suburb and post code part of the address.
pub const PROPERTY_SUBURB_POSTCODE: &str = "PropertySuburbPostCode";

/// Column positions of the fields the pipeline reads. `None` means the
/// header was not present in this file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderMapping {
    pub application_number: Option<usize>,
    pub received_date: Option<usize>,
    pub description: Option<usize>,
    pub address_part_1: Option<usize>,
    pub address_part_2: Option<usize>,
}

impl HeaderMapping {
    /// A file is usable only with an application number and some part of the address.
    pub fn has_mandatory(&self) -> bool {
        self.application_number.is_some()
            && (self.address_part_1.is_some() || self.address_part_2.is_some())
    }
}

/// Map a header row to column positions.
///
/// Matching is exact and case-sensitive; cells are not trimmed. When a name
/// occurs more than once the last occurrence wins. Never fails: unknown or
/// missing headers just leave their slot empty.
pub fn locate_columns<S: AsRef<str>>(header: &[S]) -> HeaderMapping {
    let mut mapping = HeaderMapping::default();

    for (idx, cell) in header.iter().enumerate() {
        match cell.as_ref() {
            APPLICATION_NUMBER => mapping.application_number = Some(idx),
            LODGEMENT_DATE => mapping.received_date = Some(idx),
            APPLICATION_DESC => mapping.description = Some(idx),
            PROPERTY_ADDRESS => mapping.address_part_1 = Some(idx),
            PROPERTY_SUBURB_POSTCODE => mapping.address_part_2 = Some(idx),
            _ => {}
        }
    }

    mapping
}
