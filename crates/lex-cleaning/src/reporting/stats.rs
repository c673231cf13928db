use tracing::debug;

use crate::table::Table;
use crate::types::CleaningStats;

pub struct StatsComputer;

impl StatsComputer {
    /// Compare the table handed to the executor with the one it produced.
    ///
    /// `duplicate_rows_removed` is the drop in full-row duplicates, so it also
    /// counts duplicates that disappeared through filtering or column drops.
    pub fn compute(original: &Table, transformed: &Table) -> CleaningStats {
        let duplicate_rows = original.duplicate_count();
        let duplicates_after = transformed.duplicate_count();

        let stats = CleaningStats {
            rows_before: original.height(),
            rows_after: transformed.height(),
            rows_removed: original.height().saturating_sub(transformed.height()),
            columns_before: original.width(),
            columns: transformed.width(),
            duplicate_rows,
            duplicate_rows_removed: duplicate_rows.saturating_sub(duplicates_after),
            missing_counts_before: original.missing_counts(),
            missing_counts_after: transformed.missing_counts(),
        };

        debug!(
            "Stats: {} -> {} rows, {} -> {} missing cells",
            stats.rows_before,
            stats.rows_after,
            stats.total_missing_before(),
            stats.total_missing_after()
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RuleExecutor;
    use crate::rules::{FillStrategy, Rule, RuleSet};
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    fn original() -> Table {
        let df = df! {
            "id" => [Some(1i64), Some(1), Some(2)],
            "age" => [Some(30i64), Some(30), None],
        }
        .unwrap();
        Table::from_dataframe(df)
    }

    #[test]
    fn test_stats_after_dedupe_and_fill() {
        let before = original();
        let rules = RuleSet::new(vec![
            Rule::DropDuplicates { columns: None },
            Rule::FillMissing {
                column: "age".to_string(),
                strategy: FillStrategy::Median,
            },
        ]);
        let (after, _) = RuleExecutor::new().execute(&before, &rules);
        let stats = StatsComputer::compute(&before, &after);

        assert_eq!(stats.rows_before, 3);
        assert_eq!(stats.rows_after, 2);
        assert_eq!(stats.rows_removed, 1);
        assert_eq!(stats.columns, 2);
        assert_eq!(stats.duplicate_rows, 1);
        assert_eq!(stats.duplicate_rows_removed, 1);
        assert_eq!(stats.missing_counts_before["age"], 1);
        assert_eq!(stats.missing_counts_after["age"], 0);
    }

    #[test]
    fn test_identical_tables() {
        let table = original();
        let stats = StatsComputer::compute(&table, &table);
        assert_eq!(stats.rows_removed, 0);
        assert_eq!(stats.duplicate_rows_removed, 0);
        assert_eq!(stats.total_missing_before(), stats.total_missing_after());
    }
}
