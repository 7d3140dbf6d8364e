//! Payment card detector: Luhn checksum plus issuer prefix and length.

use super::{Detection, Detector, DetectorError, is_textual};
use crate::models::{Category, ColumnDescriptor, ColumnKind, DetectorKind};

/// Validates a digit string with the Luhn mod-10 algorithm.
///
/// Non-digit characters are ignored.
#[inline]
pub fn luhn_valid(digits: &str) -> bool {
    let digits: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 2 {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// Card networks recognized by prefix and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Issuer {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Jcb,
    Diners,
}

fn prefix(digits: &str, len: usize) -> u32 {
    digits
        .get(..len)
        .and_then(|p| p.parse().ok())
        .unwrap_or(0)
}

fn issuer_for(digits: &str) -> Option<Issuer> {
    let len = digits.len();
    let p1 = prefix(digits, 1);
    let p2 = prefix(digits, 2);
    let p3 = prefix(digits, 3);
    let p4 = prefix(digits, 4);
    let p6 = prefix(digits, 6);

    if p1 == 4 && matches!(len, 13 | 16 | 19) {
        return Some(Issuer::Visa);
    }
    if ((51..=55).contains(&p2) || (2221..=2720).contains(&p4)) && len == 16 {
        return Some(Issuer::Mastercard);
    }
    if matches!(p2, 34 | 37) && len == 15 {
        return Some(Issuer::Amex);
    }
    if (p4 == 6011 || p2 == 65 || (644..=649).contains(&p3) || (622_126..=622_925).contains(&p6))
        && (16..=19).contains(&len)
    {
        return Some(Issuer::Discover);
    }
    if (3528..=3589).contains(&p4) && (16..=19).contains(&len) {
        return Some(Issuer::Jcb);
    }
    if ((300..=305).contains(&p3) || matches!(p2, 36 | 38 | 39)) && (14..=19).contains(&len) {
        return Some(Issuer::Diners);
    }
    None
}

/// Normalizes `4111 1111-1111 1111` style input to bare digits.
fn card_digits(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.len() > 23 {
        return None;
    }
    let mut digits = String::with_capacity(19);
    for ch in trimmed.chars() {
        match ch {
            '0'..='9' => digits.push(ch),
            ' ' | '-' => {}
            _ => return None,
        }
    }
    (12..=19).contains(&digits.len()).then_some(digits)
}

/// Detects payment card numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentCardDetector;

impl Detector for PaymentCardDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::PaymentCard
    }

    fn category(&self) -> Category {
        Category::Financial
    }

    fn applies_to(&self, column: &ColumnDescriptor) -> bool {
        is_textual(column.kind) || column.kind == ColumnKind::Numeric
    }

    fn detect(&self, value: &str) -> Result<Option<Detection>, DetectorError> {
        let Some(digits) = card_digits(value) else {
            return Ok(None);
        };
        // A single repeated digit passes Luhn for some lengths but is never issued
        if digits.bytes().all(|b| Some(b) == digits.bytes().next()) {
            return Ok(None);
        }
        if issuer_for(&digits).is_none() || !luhn_valid(&digits) {
            return Ok(None);
        }
        Ok(Some(Detection::new(
            self.kind(),
            self.category(),
            0.98,
            &digits,
        )))
    }
}
