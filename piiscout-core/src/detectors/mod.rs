//! Personal-data detectors and the registry that fans values out to them.
//!
//! Detectors are stateless pure functions over a single cell value. They
//! return a confidence in `[0, 1]`: checksum-validated detectors report at
//! least 0.95, pattern-only detectors between 0.5 and 0.8. A detector never
//! keeps the value; a [`Detection`] carries only a masked excerpt.

use crate::models::{Category, ColumnDescriptor, ColumnKind, DetectorKind};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

mod contact;
mod entropy;
mod health;
mod iban;
mod national_id;
mod payment_card;

pub use contact::{EmailDetector, PhoneDetector, PostalCodeDetector};
pub use entropy::{EntropySecretDetector, shannon_entropy};
pub use health::Icd10Detector;
pub use iban::{IbanDetector, iban_valid};
pub use national_id::{NationalIdDetector, national_id_valid};
pub use payment_card::{PaymentCardDetector, luhn_valid};

/// Maximum characters kept in a redacted excerpt.
pub const MAX_EXCERPT_CHARS: usize = 16;

/// Per-value detector failure. Treated as "no match" by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectorError {
    /// Input is larger than the detector is willing to scan
    #[error("input of {len} bytes exceeds the {max} byte limit")]
    InputTooLarge { len: usize, max: usize },

    /// A built-in pattern failed to compile
    #[error("pattern for {detector} failed to compile")]
    InvalidPattern { detector: DetectorKind },
}

/// A positive match on one value.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub detector: DetectorKind,
    pub category: Category,
    pub confidence: f64,
    pub redacted_excerpt: String,
}

impl Detection {
    /// Builds a detection, masking `matched` into the excerpt.
    pub fn new(detector: DetectorKind, category: Category, confidence: f64, matched: &str) -> Self {
        Self {
            detector,
            category,
            confidence: confidence.clamp(0.0, 1.0),
            redacted_excerpt: redact(matched),
        }
    }
}

/// A stateless classifier for one kind of personal data.
pub trait Detector: Send + Sync {
    fn kind(&self) -> DetectorKind;

    fn category(&self) -> Category;

    /// Whether the detector should look at values of this column.
    fn applies_to(&self, column: &ColumnDescriptor) -> bool;

    /// Classifies one value.
    ///
    /// # Errors
    /// Returns [`DetectorError`] when the value cannot be evaluated.
    fn detect(&self, value: &str) -> Result<Option<Detection>, DetectorError>;
}

/// Masks a value for reporting.
///
/// At most [`MAX_EXCERPT_CHARS`] characters are produced. Values of at least
/// eight characters keep their first two and last two characters; everything
/// else is replaced with `*`.
///
/// # Example
/// ```rust
/// use piiscout_core::detectors::redact;
///
/// assert_eq!(redact("123456782"), "12*****82");
/// assert_eq!(redact("secret"), "******");
/// ```
pub fn redact(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();
    if len < 8 {
        return "*".repeat(len);
    }

    let masked = len.saturating_sub(4).min(MAX_EXCERPT_CHARS - 4);
    let mut excerpt = String::with_capacity(MAX_EXCERPT_CHARS);
    excerpt.extend(&chars[..2]);
    excerpt.extend(std::iter::repeat_n('*', masked));
    excerpt.extend(&chars[len - 2..]);
    excerpt
}

/// Column kinds whose rendered values can carry text-like identifiers.
pub(crate) fn is_textual(kind: ColumnKind) -> bool {
    matches!(kind, ColumnKind::Text | ColumnKind::Other)
}

/// Compiles a static pattern once; a compile failure surfaces per call.
pub(crate) fn compiled(
    pattern: &'static LazyLock<Result<Regex, regex::Error>>,
    detector: DetectorKind,
) -> Result<&'static Regex, DetectorError> {
    LazyLock::force(pattern)
        .as_ref()
        .map_err(|_| DetectorError::InvalidPattern { detector })
}

/// Outcome of classifying one cell.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Classification {
    pub detections: Vec<Detection>,
    /// Detector errors encountered (counted, treated as no match)
    pub errors: u32,
}

/// Ordered set of detectors applied to every sampled cell.
pub struct DetectorRegistry {
    detectors: Vec<Box<dyn Detector>>,
}

impl std::fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.detectors.iter().map(|d| d.kind()))
            .finish()
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl DetectorRegistry {
    /// Creates a registry from an explicit detector list.
    pub fn new(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { detectors }
    }

    /// The built-in detector set, in tie-break order.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(NationalIdDetector),
            Box::new(PaymentCardDetector),
            Box::new(IbanDetector),
            Box::new(EmailDetector),
            Box::new(PhoneDetector),
            Box::new(PostalCodeDetector),
            Box::new(Icd10Detector),
            Box::new(EntropySecretDetector::default()),
        ])
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Kinds of the registered detectors, in order.
    pub fn kinds(&self) -> Vec<DetectorKind> {
        self.detectors.iter().map(|d| d.kind()).collect()
    }

    /// Whether any detector would look at this column.
    pub fn covers(&self, column: &ColumnDescriptor) -> bool {
        self.detectors.iter().any(|d| d.applies_to(column))
    }

    /// Runs every applicable detector over one value.
    pub fn classify(&self, column: &ColumnDescriptor, value: &str) -> Classification {
        let mut outcome = Classification::default();
        if value.trim().is_empty() {
            return outcome;
        }

        for detector in self.detectors.iter().filter(|d| d.applies_to(column)) {
            match detector.detect(value) {
                Ok(Some(detection)) => outcome.detections.push(detection),
                Ok(None) => {}
                Err(error) => {
                    tracing::debug!(
                        "Detector {} failed on column {}: {}",
                        detector.kind(),
                        column.name,
                        error
                    );
                    outcome.errors = outcome.errors.saturating_add(1);
                }
            }
        }

        outcome
    }
}
