//! IBAN detector (ISO 13616 mod-97).

use super::{Detection, Detector, DetectorError, is_textual};
use crate::models::{Category, ColumnDescriptor, DetectorKind};

/// Registered lengths for common countries; others only need 15 to 34.
const COUNTRY_LENGTHS: &[(&str, usize)] = &[
    ("AT", 20),
    ("BE", 16),
    ("CH", 21),
    ("DE", 22),
    ("DK", 18),
    ("ES", 24),
    ("FI", 18),
    ("FR", 27),
    ("GB", 22),
    ("IE", 22),
    ("IT", 27),
    ("LU", 20),
    ("NL", 18),
    ("NO", 15),
    ("PL", 28),
    ("PT", 25),
    ("SE", 24),
];

fn mod97(rearranged: &str) -> Option<u32> {
    let mut remainder = 0u32;
    for c in rearranged.chars() {
        let value = c.to_digit(36)?;
        remainder = if value >= 10 {
            (remainder * 100 + value) % 97
        } else {
            (remainder * 10 + value) % 97
        };
    }
    Some(remainder)
}

/// Normalizes spacing and case, returning the compact IBAN.
fn normalize(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.len() > 42 {
        return None;
    }
    let compact: String = trimmed
        .chars()
        .filter(|c| *c != ' ')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if !(15..=34).contains(&compact.len()) || !compact.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let bytes = compact.as_bytes();
    let well_formed = bytes[0].is_ascii_uppercase()
        && bytes[1].is_ascii_uppercase()
        && bytes[2].is_ascii_digit()
        && bytes[3].is_ascii_digit();
    well_formed.then_some(compact)
}

/// Validates an IBAN.
///
/// # Example
/// ```rust
/// use piiscout_core::detectors::iban_valid;
///
/// assert!(iban_valid("NL91 ABNA 0417 1643 00"));
/// assert!(!iban_valid("NL91 ABNA 0417 1643 01"));
/// ```
pub fn iban_valid(value: &str) -> bool {
    let Some(compact) = normalize(value) else {
        return false;
    };

    let country = &compact[..2];
    if let Some((_, expected)) = COUNTRY_LENGTHS.iter().find(|(code, _)| *code == country)
        && compact.len() != *expected
    {
        return false;
    }

    let rearranged = format!("{}{}", &compact[4..], &compact[..4]);
    mod97(&rearranged) == Some(1)
}

/// Detects International Bank Account Numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IbanDetector;

impl Detector for IbanDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Iban
    }

    fn category(&self) -> Category {
        Category::Financial
    }

    fn applies_to(&self, column: &ColumnDescriptor) -> bool {
        is_textual(column.kind)
    }

    fn detect(&self, value: &str) -> Result<Option<Detection>, DetectorError> {
        if !iban_valid(value) {
            return Ok(None);
        }
        Ok(Some(Detection::new(
            self.kind(),
            self.category(),
            0.97,
            value.trim(),
        )))
    }
}
