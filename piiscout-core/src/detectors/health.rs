//! ICD-10 diagnosis code detector.
//!
//! Codes like `E11.9` are short and ambiguous, so the detector only runs on
//! columns whose name suggests health data.

use super::{Detection, Detector, DetectorError, compiled, is_textual};
use crate::models::{Category, ColumnDescriptor, DetectorKind};
use regex::Regex;
use std::sync::LazyLock;

static ICD10: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-TV-Z][0-9][0-9AB](?:\.[0-9A-KXZ]{1,4})?$"));

/// Detects ICD-10 codes in health-hinted columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct Icd10Detector;

impl Detector for Icd10Detector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Icd10
    }

    fn category(&self) -> Category {
        Category::Health
    }

    fn applies_to(&self, column: &ColumnDescriptor) -> bool {
        is_textual(column.kind) && column.hinted_category == Some(Category::Health)
    }

    fn detect(&self, value: &str) -> Result<Option<Detection>, DetectorError> {
        let trimmed = value.trim();
        if trimmed.len() > 8 {
            return Ok(None);
        }
        let upper = trimmed.to_ascii_uppercase();
        if !compiled(&ICD10, self.kind())?.is_match(&upper) {
            return Ok(None);
        }
        Ok(Some(Detection::new(
            self.kind(),
            self.category(),
            0.7,
            trimmed,
        )))
    }
}
