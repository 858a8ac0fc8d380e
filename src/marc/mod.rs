//! MARC21 records
//!
//! This module provides the MARC21 output accumulator used by every
//! converter that targets the bibliographic schema, plus MARCXML reading
//! and writing for the registry.

pub mod record;
pub mod xml;

pub use record::{DataField, FieldEntry, FieldPath, Marc21Metadata};

/// Subfield value marking a record whose files are locked
pub const RESTRICTION_MARKER: &str = "gesperrt";

/// True when the record carries a lock marker (`971 $a gesperrt`)
pub fn is_restricted(record: &Marc21Metadata) -> bool {
    record.contains("971", 'a', RESTRICTION_MARKER)
}
