//! National identifier detector using the 11-proof checksum.
//!
//! The 9-digit form weighs digits `9,8,7,6,5,4,3,2,-1`; the 10-digit form
//! weighs the first nine digits `9..1` and the last digit `-1`. A value is
//! accepted iff the weighted sum is non-zero and divisible by 11.

use super::{Detection, Detector, DetectorError, is_textual};
use crate::models::{Category, ColumnDescriptor, ColumnKind, DetectorKind};

const WEIGHTS_9: [i32; 9] = [9, 8, 7, 6, 5, 4, 3, 2, -1];
const WEIGHTS_10: [i32; 10] = [9, 8, 7, 6, 5, 4, 3, 2, 1, -1];

/// Longest formatted value worth inspecting (10 digits plus separators).
const MAX_FORMATTED_LEN: usize = 20;

/// Strips single `.`, `-` or space separators between digit groups.
///
/// Returns `None` if the value contains anything else, starts or ends with a
/// separator, or has two separators in a row.
fn strip_separators(value: &str) -> Option<Vec<u8>> {
    let mut digits = Vec::with_capacity(10);
    let mut previous_was_separator = true;
    for byte in value.bytes() {
        match byte {
            b'0'..=b'9' => {
                digits.push(byte - b'0');
                previous_was_separator = false;
            }
            b'.' | b'-' | b' ' if !previous_was_separator => previous_was_separator = true,
            _ => return None,
        }
    }
    if previous_was_separator {
        return None;
    }
    Some(digits)
}

fn weighted_sum(digits: &[u8], weights: &[i32]) -> i32 {
    digits
        .iter()
        .zip(weights)
        .map(|(&d, &w)| i32::from(d) * w)
        .sum()
}

/// Validates a national identifier with the 11-proof.
///
/// # Example
/// ```rust
/// use piiscout_core::detectors::national_id_valid;
///
/// assert!(national_id_valid("111222333"));
/// assert!(national_id_valid("1112.22.333"));
/// assert!(!national_id_valid("111222334"));
/// ```
pub fn national_id_valid(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_FORMATTED_LEN {
        return false;
    }
    let Some(digits) = strip_separators(trimmed) else {
        return false;
    };

    let sum = match digits.len() {
        9 => weighted_sum(&digits, &WEIGHTS_9),
        10 => weighted_sum(&digits, &WEIGHTS_10),
        _ => return false,
    };

    sum != 0 && sum.rem_euclid(11) == 0
}

/// Detects 11-proof national identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NationalIdDetector;

impl Detector for NationalIdDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::NationalId
    }

    fn category(&self) -> Category {
        Category::NationalId
    }

    fn applies_to(&self, column: &ColumnDescriptor) -> bool {
        is_textual(column.kind) || column.kind == ColumnKind::Numeric
    }

    fn detect(&self, value: &str) -> Result<Option<Detection>, DetectorError> {
        let trimmed = value.trim();
        if !national_id_valid(trimmed) {
            return Ok(None);
        }
        Ok(Some(Detection::new(
            self.kind(),
            self.category(),
            0.97,
            trimmed,
        )))
    }
}
