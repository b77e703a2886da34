use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

use crate::edgar::filing::FilingMetadata;
use crate::edgar::report::FilingKind;

pub fn get_test_file_path(filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("src/edgar/parsing/tests/data")
        .join(filename)
}

pub fn read_test_file(filename: &str) -> String {
    fs::read_to_string(get_test_file_path(filename))
        .unwrap_or_else(|e| panic!("Failed to read test file {}: {}", filename, e))
}

/// Quarterly filing metadata for the fixture company.
pub fn metadata(document_name: &str) -> FilingMetadata {
    FilingMetadata::new(
        "0000000001",
        FilingKind::QuarterlyReport,
        NaiveDate::from_ymd_opt(2023, 6, 30).unwrap(),
        document_name,
    )
}
