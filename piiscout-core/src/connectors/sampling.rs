//! Reproducible scatter sampling parameters.
//!
//! A scatter sample is a pure function of a seed derived from the qualified
//! table name and its estimated row count. The seed is expanded through a
//! seeded RNG into a start offset and a stride; engines then express the
//! sample natively (`TABLESAMPLE ... REPEATABLE`, or a modulo filter over
//! `ROW_NUMBER()`).

use crate::models::{RowLocator, TableDescriptor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Derives the scatter seed for a table (FNV-1a).
pub fn scatter_seed(table: &TableDescriptor) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    let estimated = table.estimated_rows.unwrap_or(0);
    for byte in table
        .qualified_name()
        .bytes()
        .chain(estimated.to_le_bytes())
    {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Concrete scatter parameters for one table and row limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterPlan {
    pub seed: u64,
    /// Distance between sampled row positions
    pub stride: u64,
    /// Position of the first sampled row, in `0..stride`
    pub start: u64,
    /// Percentage for engines that sample by `TABLESAMPLE`.
    ///
    /// Expected draw is exactly `limit` rows. Engines return a `TABLESAMPLE`
    /// draw in physical order, so any surplus cut by `LIMIT` would come from
    /// the end of the table.
    pub sample_percent: f64,
}

impl ScatterPlan {
    /// Builds a plan, or `None` when the table is small or of unknown size.
    ///
    /// A table no larger than the limit is read in full with `FirstN`.
    pub fn for_table(seed: u64, estimated_rows: Option<u64>, limit: u32) -> Option<Self> {
        let rows = estimated_rows?;
        let limit = u64::from(limit);
        if limit == 0 || rows <= limit {
            return None;
        }

        let stride = rows.div_ceil(limit).max(1);
        let start = StdRng::seed_from_u64(seed).random_range(0..stride);
        let percent = (limit as f64 / rows as f64 * 100.0).clamp(0.0001, 100.0);

        Some(Self {
            seed,
            stride,
            start,
            sample_percent: percent,
        })
    }

    /// Locator for the `index`-th sampled row.
    pub fn locator(&self, index: u64) -> RowLocator {
        RowLocator(
            self.start
                .saturating_add(index.saturating_mul(self.stride)),
        )
    }

    /// Seed folded into the 31-bit range accepted by `REPEATABLE`.
    pub fn repeatable_seed(&self) -> i64 {
        (self.seed % 2_147_483_647) as i64
    }

    /// Percentage formatted for inlining into SQL.
    pub fn percent_literal(&self) -> String {
        format!("{:.4}", self.sample_percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, rows: Option<u64>) -> TableDescriptor {
        let mut table = TableDescriptor::new("public", name, 0);
        table.estimated_rows = rows;
        table
    }

    #[test]
    fn test_seed_is_stable_and_table_specific() {
        let users = table("users", Some(10_000));
        assert_eq!(scatter_seed(&users), scatter_seed(&users.clone()));
        assert_ne!(scatter_seed(&users), scatter_seed(&table("orders", Some(10_000))));
        assert_ne!(scatter_seed(&users), scatter_seed(&table("users", Some(20_000))));
    }

    #[test]
    fn test_small_or_unknown_tables_fall_back() {
        assert!(ScatterPlan::for_table(1, None, 300).is_none());
        assert!(ScatterPlan::for_table(1, Some(300), 300).is_none());
        assert!(ScatterPlan::for_table(1, Some(10), 300).is_none());
    }

    #[test]
    fn test_plan_is_reproducible() {
        let a = ScatterPlan::for_table(42, Some(100_000), 300).unwrap();
        let b = ScatterPlan::for_table(42, Some(100_000), 300).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.stride, 334);
        assert!(a.start < a.stride);
    }

    #[test]
    fn test_locators_stay_within_table() {
        let plan = ScatterPlan::for_table(7, Some(1_000), 100).unwrap();
        let last = plan.locator(99);
        assert!(last.0 < 1_000);
        assert!(plan.locator(0) < plan.locator(1));
    }

    #[test]
    fn test_percent_draws_limit_rows_on_average() {
        let plan = ScatterPlan::for_table(42, Some(100_000), 300).unwrap();
        assert!((plan.sample_percent - 0.3).abs() < 1e-9);
        assert_eq!(plan.percent_literal(), "0.3000");

        let plan = ScatterPlan::for_table(42, Some(2_000), 1_000).unwrap();
        assert!((plan.sample_percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_percent_is_bounded() {
        let plan = ScatterPlan::for_table(7, Some(1_000), 900).unwrap();
        assert!(plan.sample_percent <= 100.0);

        let plan = ScatterPlan::for_table(7, Some(u64::MAX), 100).unwrap();
        assert!(plan.sample_percent > 0.0);
        assert!(plan.repeatable_seed() >= 0);
    }
}
