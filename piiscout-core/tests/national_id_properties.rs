//! Property tests for the national identifier checksum.

use piiscout_core::detectors::{Detector, NationalIdDetector, national_id_valid};
use proptest::prelude::*;

/// Independent statement of the 11-proof for a bare digit string.
fn reference_rule(digits: &str) -> bool {
    let values: Vec<i64> = digits.bytes().map(|b| i64::from(b - b'0')).collect();
    let weights: &[i64] = match values.len() {
        9 => &[9, 8, 7, 6, 5, 4, 3, 2, -1],
        10 => &[9, 8, 7, 6, 5, 4, 3, 2, 1, -1],
        _ => return false,
    };
    let sum: i64 = values.iter().zip(weights).map(|(v, w)| v * w).sum();
    sum != 0 && sum.rem_euclid(11) == 0
}

/// Appends the check digit to eight leading digits, if one exists.
fn with_check_digit(prefix: &[u8]) -> Option<String> {
    let sum: u32 = prefix
        .iter()
        .zip((2..=9u32).rev())
        .map(|(&d, w)| u32::from(d) * w)
        .sum();
    let check = sum % 11;
    if check > 9 || sum == check {
        return None;
    }
    let mut id: String = prefix.iter().map(|d| char::from(b'0' + d)).collect();
    id.push(char::from(b'0' + u8::try_from(check).ok()?));
    Some(id)
}

proptest! {
    #[test]
    fn accepts_iff_checksum_holds_for_nine_digits(digits in "[0-9]{9}") {
        prop_assert_eq!(national_id_valid(&digits), reference_rule(&digits));
    }

    #[test]
    fn accepts_iff_checksum_holds_for_ten_digits(digits in "[0-9]{10}") {
        prop_assert_eq!(national_id_valid(&digits), reference_rule(&digits));
    }

    #[test]
    fn generated_valid_identifiers_are_accepted(
        prefix in proptest::collection::vec(0u8..10, 8)
    ) {
        if let Some(id) = with_check_digit(&prefix) {
            prop_assert!(national_id_valid(&id), "{} should be accepted", id);
            let detection = NationalIdDetector.detect(&id).unwrap();
            prop_assert!(detection.is_some());
        }
    }

    #[test]
    fn single_digit_errors_are_never_accepted(
        prefix in proptest::collection::vec(0u8..10, 8),
        position in 0usize..9,
        delta in 1u8..10,
    ) {
        if let Some(id) = with_check_digit(&prefix) {
            let mut bytes = id.into_bytes();
            let digit = bytes[position] - b'0';
            bytes[position] = b'0' + (digit + delta) % 10;
            let corrupted = String::from_utf8(bytes).unwrap();
            // Format-valid but checksum-invalid
            prop_assert!(!national_id_valid(&corrupted), "{} falsely accepted", corrupted);
            prop_assert!(NationalIdDetector.detect(&corrupted).unwrap().is_none());
        }
    }

    #[test]
    fn separators_do_not_change_the_verdict(digits in "[0-9]{9}") {
        let formatted = format!("{}.{}.{}", &digits[..4], &digits[4..6], &digits[6..]);
        prop_assert_eq!(national_id_valid(&formatted), national_id_valid(&digits));
    }

    #[test]
    fn other_lengths_are_rejected(digits in "[0-9]{1,8}|[0-9]{11,16}") {
        prop_assert!(!national_id_valid(&digits));
    }
}
