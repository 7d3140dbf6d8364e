//! Entropy-based secret detection for free-text columns.

use super::{Detection, Detector, DetectorError, is_textual};
use crate::models::{Category, ColumnDescriptor, DetectorKind};

/// Largest value the detector will scan.
pub const MAX_INPUT_BYTES: usize = 16 * 1024;

/// Shannon entropy of a byte slice, in bits per byte.
#[inline]
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut freq = [0u32; 256];
    for &byte in data {
        freq[usize::from(byte)] = freq[usize::from(byte)].saturating_add(1);
    }

    let len = data.len() as f64;
    freq.iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = f64::from(count) / len;
            -p * p.log2()
        })
        .sum()
}

#[inline]
fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'+' | b'/' | b'=')
}

/// Number of character classes (lower, upper, digit, symbol) present.
fn character_classes(token: &[u8]) -> usize {
    let lower = token.iter().any(u8::is_ascii_lowercase);
    let upper = token.iter().any(u8::is_ascii_uppercase);
    let digit = token.iter().any(u8::is_ascii_digit);
    let symbol = token.iter().any(|b| !b.is_ascii_alphanumeric());
    [lower, upper, digit, symbol].iter().filter(|&&p| p).count()
}

/// `8-4-4-4-12` hex identifiers are random but not secret.
fn is_canonical_uuid(token: &[u8]) -> bool {
    token.len() == 36
        && token.iter().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => *b == b'-',
            _ => b.is_ascii_hexdigit(),
        })
}

/// Flags long, high-entropy tokens such as API keys and access tokens.
#[derive(Debug, Clone, Copy)]
pub struct EntropySecretDetector {
    pub min_token_len: usize,
    /// Bits per character
    pub threshold: f64,
}

impl Default for EntropySecretDetector {
    fn default() -> Self {
        Self {
            min_token_len: 20,
            threshold: 3.5,
        }
    }
}

impl EntropySecretDetector {
    /// Highest-entropy qualifying token in `text`, if any.
    fn best_token<'a>(&self, text: &'a str) -> Option<(&'a str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for token in text.split(|c: char| !c.is_ascii() || !is_token_char(c as u8)) {
            let bytes = token.as_bytes();
            if bytes.len() < self.min_token_len
                || character_classes(bytes) < 2
                || is_canonical_uuid(bytes)
            {
                continue;
            }
            let entropy = shannon_entropy(bytes);
            if entropy >= self.threshold && best.is_none_or(|(_, e)| entropy > e) {
                best = Some((token, entropy));
            }
        }
        best
    }
}

impl Detector for EntropySecretDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::EntropySecret
    }

    fn category(&self) -> Category {
        Category::FreeTextSecret
    }

    fn applies_to(&self, column: &ColumnDescriptor) -> bool {
        is_textual(column.kind)
    }

    fn detect(&self, value: &str) -> Result<Option<Detection>, DetectorError> {
        if value.len() > MAX_INPUT_BYTES {
            return Err(DetectorError::InputTooLarge {
                len: value.len(),
                max: MAX_INPUT_BYTES,
            });
        }

        let Some((token, entropy)) = self.best_token(value) else {
            return Ok(None);
        };

        // 3.5 bits/char maps to 0.5, 4.5 and above to 0.8
        let confidence = 0.5 + 0.3 * (entropy - self.threshold).clamp(0.0, 1.0);
        Ok(Some(Detection::new(
            self.kind(),
            self.category(),
            confidence,
            token,
        )))
    }
}
