/// Status of a stored product-URL record
///
/// This module defines the states a persisted record can be in.
use std::fmt;

/// Represents the outcome recorded for a URL in the product store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordStatus {
    /// Page was fetched and confirmed to be a product-detail page
    Product,

    /// Page failed permanently (4xx, DNS failure, exhausted retries)
    Failed,
}

impl RecordStatus {
    /// Returns true if this record is a confirmed product
    pub fn is_product(&self) -> bool {
        matches!(self, Self::Product)
    }

    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from a database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "product" => Some(Self::Product),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_string_conversion() {
        for status in [RecordStatus::Product, RecordStatus::Failed] {
            assert_eq!(
                RecordStatus::from_db_string(status.to_db_string()),
                Some(status)
            );
        }
        assert_eq!(RecordStatus::from_db_string("processed"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(RecordStatus::Product.to_string(), "product");
        assert!(RecordStatus::Product.is_product());
        assert!(!RecordStatus::Failed.is_product());
    }
}
