//! Lexical hints for column and table names.
//!
//! Column names are normalized (lowercase, camelCase split, separators
//! collapsed to `_`) and matched against a fixed lexicon. The lexicon is
//! static so hint scores are identical across runs.

use crate::models::Category;

/// Result of matching a column name against the lexicon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnHint {
    /// Likelihood in `[0, 1]` that the column holds personal data
    pub score: f64,
    pub category: Option<Category>,
}

impl ColumnHint {
    const NONE: ColumnHint = ColumnHint {
        score: 0.0,
        category: None,
    };
}

struct Term {
    text: &'static str,
    weight: f64,
    category: Option<Category>,
}

const fn term(text: &'static str, weight: f64, category: Option<Category>) -> Term {
    Term {
        text,
        weight,
        category,
    }
}

const NATIONAL_ID: Option<Category> = Some(Category::NationalId);
const FINANCIAL: Option<Category> = Some(Category::Financial);
const CONTACT: Option<Category> = Some(Category::Contact);
const HEALTH: Option<Category> = Some(Category::Health);
const SECRET: Option<Category> = Some(Category::FreeTextSecret);

/// Column lexicon. Terms containing `_` match as substrings of the normalized
/// name; other terms match whole tokens, or substrings when at least five
/// characters long.
static COLUMN_TERMS: &[Term] = &[
    // Identifiers
    term("ssn", 1.0, NATIONAL_ID),
    term("bsn", 1.0, NATIONAL_ID),
    term("national_id", 1.0, NATIONAL_ID),
    term("nationalid", 1.0, NATIONAL_ID),
    term("social_security", 1.0, NATIONAL_ID),
    term("sofinummer", 1.0, NATIONAL_ID),
    term("citizen_service", 1.0, NATIONAL_ID),
    term("passport", 0.95, NATIONAL_ID),
    term("tax_id", 0.95, NATIONAL_ID),
    term("taxid", 0.95, NATIONAL_ID),
    term("tin", 0.7, NATIONAL_ID),
    term("nin", 0.7, NATIONAL_ID),
    // Financial
    term("iban", 0.95, FINANCIAL),
    term("card_number", 0.95, FINANCIAL),
    term("cardnumber", 0.95, FINANCIAL),
    term("credit_card", 0.95, FINANCIAL),
    term("pan", 0.7, FINANCIAL),
    term("cc", 0.6, FINANCIAL),
    term("card", 0.75, FINANCIAL),
    term("account_number", 0.9, FINANCIAL),
    term("bank", 0.8, FINANCIAL),
    term("routing", 0.75, FINANCIAL),
    term("salary", 0.6, FINANCIAL),
    // Health
    term("diagnosis", 0.9, HEALTH),
    term("icd", 0.9, HEALTH),
    term("medical", 0.85, HEALTH),
    term("health", 0.8, HEALTH),
    term("condition", 0.6, HEALTH),
    term("treatment", 0.8, HEALTH),
    term("prescription", 0.85, HEALTH),
    term("allergy", 0.8, HEALTH),
    // Secrets and free text
    term("password", 0.9, SECRET),
    term("passwd", 0.9, SECRET),
    term("secret", 0.9, SECRET),
    term("token", 0.85, SECRET),
    term("api_key", 0.9, SECRET),
    term("apikey", 0.9, SECRET),
    term("private_key", 0.9, SECRET),
    term("credential", 0.85, SECRET),
    term("notes", 0.5, SECRET),
    term("comment", 0.4, SECRET),
    term("key", 0.4, SECRET),
    // Contact
    term("email", 0.85, CONTACT),
    term("mail", 0.7, CONTACT),
    term("phone", 0.85, CONTACT),
    term("mobile", 0.8, CONTACT),
    term("tel", 0.6, CONTACT),
    term("telephone", 0.85, CONTACT),
    term("address", 0.75, CONTACT),
    term("street", 0.7, CONTACT),
    term("zip", 0.65, CONTACT),
    term("postcode", 0.7, CONTACT),
    term("postal", 0.7, CONTACT),
    term("city", 0.4, CONTACT),
    // Generic personal attributes
    term("first_name", 0.7, None),
    term("last_name", 0.7, None),
    term("full_name", 0.7, None),
    term("firstname", 0.7, None),
    term("lastname", 0.7, None),
    term("surname", 0.7, None),
    term("name", 0.5, None),
    term("birth", 0.75, None),
    term("dob", 0.75, None),
    term("gender", 0.55, None),
    term("ip_address", 0.6, None),
];

/// Table-name tokens that indicate personal records.
static SENSITIVE_TABLE_TOKENS: &[&str] = &[
    "user",
    "customer",
    "client",
    "patient",
    "payment",
    "employee",
    "account",
    "member",
    "person",
    "people",
    "contact",
    "order",
    "invoice",
    "billing",
    "card",
    "staff",
    "profile",
    "applicant",
    "student",
    "subscriber",
    "address",
    "medical",
    "payroll",
];

/// Lowercases a name, splits camelCase and collapses separators to `_`.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len().saturating_add(4));
    let mut previous_lower = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if ch.is_ascii_uppercase() && previous_lower {
                normalized.push('_');
            }
            previous_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            normalized.push(ch.to_ascii_lowercase());
        } else {
            if !normalized.ends_with('_') && !normalized.is_empty() {
                normalized.push('_');
            }
            previous_lower = false;
        }
    }
    while normalized.ends_with('_') {
        normalized.pop();
    }
    normalized
}

fn term_matches(term: &Term, normalized: &str) -> bool {
    if term.text.contains('_') {
        return normalized.contains(term.text);
    }
    if normalized.split('_').any(|token| token == term.text) {
        return true;
    }
    term.text.len() >= 5 && normalized.contains(term.text)
}

/// Scores a column name against the lexicon.
///
/// The highest-weight matching term wins; earlier terms win ties.
pub fn column_hint(name: &str) -> ColumnHint {
    let normalized = normalize_name(name);
    if normalized.is_empty() {
        return ColumnHint::NONE;
    }

    let mut best = ColumnHint::NONE;
    for term in COLUMN_TERMS {
        if term.weight > best.score && term_matches(term, &normalized) {
            best = ColumnHint {
                score: term.weight,
                category: term.category,
            };
        }
    }
    best
}

/// Returns 1.0 when the table name contains a sensitive token, else 0.0.
pub fn table_name_score(name: &str) -> f64 {
    let normalized = normalize_name(name);
    let matched = SENSITIVE_TABLE_TOKENS
        .iter()
        .any(|token| normalized.contains(token));
    if matched { 1.0 } else { 0.0 }
}
