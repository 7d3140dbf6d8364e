//! Contact detectors: email, phone number and postal code.
//!
//! All three are pattern-only, so confidences stay within 0.5 to 0.8.

use super::{Detection, Detector, DetectorError, compiled, is_textual};
use crate::models::{Category, ColumnDescriptor, ColumnKind, DetectorKind};
use regex::Regex;
use std::sync::LazyLock;

static EMAIL: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9._%+\-]{1,64}@[A-Za-z0-9](?:[A-Za-z0-9\-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]{0,61}[A-Za-z0-9])?)*\.[A-Za-z]{2,24}$",
    )
});

static PHONE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9(][0-9 ().\-]{7,24}[0-9]$"));

static POSTAL_US: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}(?:-[0-9]{4})?$"));

static POSTAL_UK: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^(?i)[A-Z]{1,2}[0-9][A-Z0-9]? ?[0-9][A-Z]{2}$")
});

static POSTAL_NL: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]{3} ?[A-Za-z]{2}$"));

static POSTAL_CA: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^(?i)[A-Z][0-9][A-Z] ?[0-9][A-Z][0-9]$"));

/// Detects email addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailDetector;

impl Detector for EmailDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Email
    }

    fn category(&self) -> Category {
        Category::Contact
    }

    fn applies_to(&self, column: &ColumnDescriptor) -> bool {
        is_textual(column.kind)
    }

    fn detect(&self, value: &str) -> Result<Option<Detection>, DetectorError> {
        let trimmed = value.trim();
        if trimmed.len() > 254 || !trimmed.contains('@') {
            return Ok(None);
        }
        if !compiled(&EMAIL, self.kind())?.is_match(trimmed) {
            return Ok(None);
        }
        Ok(Some(Detection::new(self.kind(), self.category(), 0.8, trimmed)))
    }
}

/// Detects E.164 and national-format phone numbers.
///
/// Bare digit runs are only accepted with a leading `0` (trunk prefix), since
/// unformatted integers are far more often identifiers than phone numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhoneDetector;

impl Detector for PhoneDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Phone
    }

    fn category(&self) -> Category {
        Category::Contact
    }

    fn applies_to(&self, column: &ColumnDescriptor) -> bool {
        is_textual(column.kind)
    }

    fn detect(&self, value: &str) -> Result<Option<Detection>, DetectorError> {
        let trimmed = value.trim();
        if trimmed.len() > 26 {
            return Ok(None);
        }
        if !compiled(&PHONE, self.kind())?.is_match(trimmed) {
            return Ok(None);
        }

        let digits: Vec<u8> = trimmed.bytes().filter(u8::is_ascii_digit).collect();
        if !(9..=15).contains(&digits.len()) {
            return Ok(None);
        }
        if digits.iter().all(|&d| d == digits[0]) {
            return Ok(None);
        }

        let international = trimmed.starts_with('+');
        let formatted = trimmed.bytes().any(|b| matches!(b, b' ' | b'-' | b'(' | b')' | b'.'));
        let trunk_prefixed = trimmed.starts_with('0');
        if !(international || formatted || trunk_prefixed) {
            return Ok(None);
        }

        let confidence = if international { 0.75 } else { 0.6 };
        Ok(Some(Detection::new(
            self.kind(),
            self.category(),
            confidence,
            trimmed,
        )))
    }
}

/// Detects US, UK, Dutch and Canadian postal codes.
///
/// Postal codes collide with many short codes, so the detector only looks at
/// columns whose name already suggests contact data.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostalCodeDetector;

impl Detector for PostalCodeDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::PostalCode
    }

    fn category(&self) -> Category {
        Category::Contact
    }

    fn applies_to(&self, column: &ColumnDescriptor) -> bool {
        matches!(column.kind, ColumnKind::Text | ColumnKind::Other | ColumnKind::Numeric)
            && column.hinted_category == Some(Category::Contact)
    }

    fn detect(&self, value: &str) -> Result<Option<Detection>, DetectorError> {
        let trimmed = value.trim();
        if trimmed.len() > 10 {
            return Ok(None);
        }

        let confidence = if compiled(&POSTAL_US, self.kind())?.is_match(trimmed) {
            if trimmed.len() == 5 { 0.5 } else { 0.7 }
        } else if compiled(&POSTAL_UK, self.kind())?.is_match(trimmed)
            || compiled(&POSTAL_NL, self.kind())?.is_match(trimmed)
            || compiled(&POSTAL_CA, self.kind())?.is_match(trimmed)
        {
            0.7
        } else {
            return Ok(None);
        };

        Ok(Some(Detection::new(
            self.kind(),
            self.category(),
            confidence,
            trimmed,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> ColumnDescriptor {
        ColumnDescriptor::new(name, "varchar", ColumnKind::Text, true, 1)
    }

    #[test]
    fn test_email() {
        let detector = EmailDetector;
        assert!(detector.detect("ada@example.com").unwrap().is_some());
        assert!(detector.detect(" j.doe+tag@mail.example.co.uk ").unwrap().is_some());
        assert!(detector.detect("not-an-email").unwrap().is_none());
        assert!(detector.detect("user@localhost").unwrap().is_none());
        assert!(detector.detect("user@example.c0m").unwrap().is_none());
        assert!(detector.detect("a@b@example.com").unwrap().is_none());
    }

    #[test]
    fn test_email_confidence_is_pattern_grade() {
        let detection = EmailDetector.detect("ada@example.com").unwrap().unwrap();
        assert!((0.5..=0.8).contains(&detection.confidence));
        assert_eq!(detection.redacted_excerpt, "ad***********om");
    }

    #[test]
    fn test_phone() {
        let detector = PhoneDetector;
        assert!(detector.detect("+31 6 12345678").unwrap().is_some());
        assert!(detector.detect("+14155552671").unwrap().is_some());
        assert!(detector.detect("(415) 555-2671").unwrap().is_some());
        assert!(detector.detect("0612345678").unwrap().is_some());
        assert!(detector.detect("06-12345678").unwrap().is_some());
    }

    #[test]
    fn test_phone_rejections() {
        let detector = PhoneDetector;
        // Too few digits
        assert!(detector.detect("555-1234").unwrap().is_none());
        // Single repeated digit
        assert!(detector.detect("+11111111111").unwrap().is_none());
        // Bare integers look like identifiers
        assert!(detector.detect("4155552671").unwrap().is_none());
        // Too many digits
        assert!(detector.detect("+1234567890123456").unwrap().is_none());
        assert!(detector.detect("call me").unwrap().is_none());
    }

    #[test]
    fn test_phone_confidence() {
        let international = PhoneDetector.detect("+14155552671").unwrap().unwrap();
        let national = PhoneDetector.detect("0612345678").unwrap().unwrap();
        assert!(international.confidence > national.confidence);
        assert!(national.confidence >= 0.5);
    }

    #[test]
    fn test_postal_codes() {
        let detector = PostalCodeDetector;
        assert!((detector.detect("94105").unwrap().unwrap().confidence - 0.5).abs() < 1e-9);
        assert!(detector.detect("94105-1234").unwrap().is_some());
        assert!(detector.detect("SW1A 1AA").unwrap().is_some());
        assert!(detector.detect("ec1a1bb").unwrap().is_some());
        assert!(detector.detect("1012 AB").unwrap().is_some());
        assert!(detector.detect("K1A 0B1").unwrap().is_some());
        assert!(detector.detect("ABCDE").unwrap().is_none());
        assert!(detector.detect("0123 AB").unwrap().is_none());
    }

    #[test]
    fn test_postal_code_requires_contact_hint() {
        assert!(PostalCodeDetector.applies_to(&column("zip")));
        assert!(PostalCodeDetector.applies_to(&column("postal_code")));
        assert!(!PostalCodeDetector.applies_to(&column("sku")));
    }
}
