//! Integration tests for the cleaning pipeline.
//!
//! These run whole instructions against small inline CSV files with the
//! AI strategy turned off, so every run is deterministic.

use lex_cleaning::{
    ActionStatus, CaseStyle, CleaningConfig, CleaningError, FillStrategy, Pipeline, Rule,
    RuleExecutor, RuleKind, RuleSet, StrategyKind, Table, TargetType, Value,
};
use pretty_assertions::assert_eq;

// ============================================================================
// Helper Functions
// ============================================================================

fn pipeline() -> Pipeline {
    Pipeline::builder()
        .config(CleaningConfig::builder().use_ai(false).build().unwrap())
        .build()
        .unwrap()
}

fn load(csv: &str) -> Table {
    pipeline().load(csv.as_bytes()).unwrap().0
}

fn numbers(values: &[Option<f64>]) -> Vec<Value> {
    values
        .iter()
        .map(|v| v.map_or(Value::Null, Value::Number))
        .collect()
}

const CUSTOMERS: &str = "\
id,name,age,email,signup
1, alice ,34,ALICE@EXAMPLE.COM,2024-01-05
2,bob,,bob@example.com,03/15/2024
2,bob,,bob@example.com,03/15/2024
3,carol,17,,2024-02-29
4,dave,52,dave@example.com,not a date
";

// ============================================================================
// Worked Examples
// ============================================================================

#[test]
fn test_drop_duplicates_all_columns() {
    let table = load("id,age\n1,30\n1,30\n2,\n");
    let rules = RuleSet::new(vec![Rule::DropDuplicates { columns: None }]);

    let (cleaned, log) = RuleExecutor::new().execute(&table, &rules);

    assert_eq!(cleaned.height(), 2);
    assert_eq!(log.len(), 1);
    assert!(log[0].message.contains("Removed 1 duplicate row"));
}

#[test]
fn test_fill_instruction_compiles_to_median() {
    let table = load("Age\n20\nNA\n40\n");
    let compiled = pipeline()
        .compile("fill missing Age with median", table.schema())
        .unwrap();

    assert_eq!(compiled.strategy, StrategyKind::Pattern);
    assert_eq!(
        compiled.rules.rules(),
        &[Rule::FillMissing {
            column: "Age".to_string(),
            strategy: FillStrategy::Median,
        }]
    );
}

#[test]
fn test_median_fill_values() {
    let result = pipeline()
        .run(b"Age\n20\nNA\n40\n", "fill missing Age with median")
        .unwrap();

    assert_eq!(
        result.table.cells("Age").unwrap(),
        numbers(&[Some(20.0), Some(30.0), Some(40.0)])
    );
    assert_eq!(result.stats.missing_counts_after["Age"], 0);
}

#[test]
fn test_vague_instruction_is_unparseable() {
    let err = pipeline()
        .run(b"id,age\n1,30\n", "do something vague")
        .unwrap_err();

    assert!(matches!(err, CleaningError::UnparseableInstruction { .. }));
    assert!(!err.suggestions().is_empty());
}

#[test]
fn test_rename_to_same_name_is_noop() {
    let table = load("Age\n1\n");
    let rules = RuleSet::new(vec![Rule::RenameColumn {
        from: "Age".to_string(),
        to: "Age".to_string(),
    }]);

    let (cleaned, log) = RuleExecutor::new().execute(&table, &rules);

    assert_eq!(log[0].status, ActionStatus::Applied);
    assert_eq!(cleaned.column_names(), vec!["Age"]);
}

// ============================================================================
// Execution Properties
// ============================================================================

#[test]
fn test_drop_duplicates_is_idempotent() {
    let table = load(CUSTOMERS);
    let rules = RuleSet::new(vec![Rule::DropDuplicates { columns: None }]);
    let executor = RuleExecutor::new();

    let (once, _) = executor.execute(&table, &rules);
    let (twice, log) = executor.execute(&once, &rules);

    assert_eq!(once.height(), 4);
    assert_eq!(twice.height(), once.height());
    assert_eq!(log[0].message, "Removed 0 duplicate rows");
}

#[test]
fn test_row_removal_preserves_order() {
    let result = pipeline()
        .run(CUSTOMERS.as_bytes(), "remove duplicates; remove rows with missing age")
        .unwrap();

    assert_eq!(
        result.table.cells("id").unwrap(),
        numbers(&[Some(1.0), Some(3.0), Some(4.0)])
    );
}

#[test]
fn test_value_rules_preserve_row_order() {
    let table = load("id,name,age,score\n3, bob ,NA,1.5\n1,alice,30,2\n2,Carol,NA,x\n");
    let rules = RuleSet::new(vec![
        Rule::FillMissing {
            column: "age".to_string(),
            strategy: FillStrategy::Median,
        },
        Rule::TrimWhitespace { column: None },
        Rule::TypeCast {
            column: "score".to_string(),
            target: TargetType::Integer,
        },
        Rule::StandardizeCase {
            column: "name".to_string(),
            case: CaseStyle::Upper,
        },
        Rule::RenameColumn {
            from: "id".to_string(),
            to: "row_id".to_string(),
        },
    ]);
    assert!(rules.iter().all(|rule| !rule.removes_rows()));

    let (cleaned, log) = RuleExecutor::new().execute(&table, &rules);

    assert!(log.iter().all(|entry| entry.status == ActionStatus::Applied));
    assert_eq!(
        cleaned.cells("row_id").unwrap(),
        numbers(&[Some(3.0), Some(1.0), Some(2.0)])
    );
    assert_eq!(
        cleaned.cells("name").unwrap(),
        vec![
            Value::Text("BOB".to_string()),
            Value::Text("ALICE".to_string()),
            Value::Text("CAROL".to_string()),
        ]
    );
    assert_eq!(
        cleaned.cells("score").unwrap(),
        numbers(&[Some(1.0), Some(2.0), None])
    );
}

#[test]
fn test_failed_rule_is_isolated() {
    let table = load(CUSTOMERS);
    let rules = RuleSet::new(vec![
        Rule::DropDuplicates { columns: None },
        Rule::FillMissing {
            column: "missing_column".to_string(),
            strategy: FillStrategy::Median,
        },
        Rule::TrimWhitespace { column: None },
    ]);

    let (cleaned, log) = RuleExecutor::new().execute(&table, &rules);

    assert_eq!(log.len(), 3);
    let statuses: Vec<ActionStatus> = log.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            ActionStatus::Applied,
            ActionStatus::Skipped,
            ActionStatus::Applied,
        ]
    );
    assert!(log[1].message.contains("missing_column"));
    assert_eq!(cleaned.height(), 4);
    assert_eq!(
        cleaned.cells("name").unwrap()[0],
        Value::Text("alice".to_string())
    );
}

#[test]
fn test_mean_on_text_column_is_skipped() {
    let result = pipeline()
        .run(CUSTOMERS.as_bytes(), "fill missing email with mean; remove duplicates")
        .unwrap();

    assert_eq!(result.skipped_count(), 1);
    assert!(result.action_log[0].is_skipped());
    assert_eq!(result.stats.rows_after, 4);
}

#[test]
fn test_pattern_compilation_is_deterministic() {
    let table = load(CUSTOMERS);
    let instruction = "remove duplicates, fill missing age with median, lowercase email";

    let first = pipeline().compile(instruction, table.schema()).unwrap();
    let second = pipeline().compile(instruction, table.schema()).unwrap();

    assert_eq!(first.rules, second.rules);
    assert_eq!(
        first.rules.kinds(),
        vec![
            RuleKind::DropDuplicates,
            RuleKind::FillMissing,
            RuleKind::StandardizeCase,
        ]
    );
}

#[test]
fn test_rules_replay_from_json() {
    let table = load(CUSTOMERS);
    let compiled = pipeline()
        .compile("remove duplicates, trim whitespace", table.schema())
        .unwrap();

    let stored = serde_json::to_string(&compiled.rules).unwrap();
    let replayed: RuleSet = serde_json::from_str(&stored).unwrap();
    assert_eq!(replayed, compiled.rules);

    let executor = RuleExecutor::new();
    let (a, _) = executor.execute(&table, &compiled.rules);
    let (b, _) = executor.execute(&table, &replayed);
    assert!(a.dataframe().equals_missing(b.dataframe()));
}

// ============================================================================
// End-to-End
// ============================================================================

#[test]
fn test_end_to_end_run() {
    let result = pipeline()
        .run(
            CUSTOMERS.as_bytes(),
            "remove duplicates, trim whitespace, fill missing age with median, \
             lowercase email, standardize signup dates",
        )
        .unwrap();

    assert_eq!(result.strategy, StrategyKind::Pattern);
    assert_eq!(result.skipped_count(), 0);

    let stats = &result.stats;
    assert_eq!(stats.rows_before, 5);
    assert_eq!(stats.rows_after, 4);
    assert_eq!(stats.rows_removed, 1);
    assert_eq!(stats.duplicate_rows, 1);
    assert_eq!(stats.duplicate_rows_removed, 1);
    assert_eq!(stats.missing_counts_before["age"], 2);
    assert_eq!(stats.missing_counts_after["age"], 0);

    let table = &result.table;
    assert_eq!(
        table.cells("name").unwrap()[0],
        Value::Text("alice".to_string())
    );
    assert_eq!(
        table.cells("email").unwrap()[0],
        Value::Text("alice@example.com".to_string())
    );
    assert_eq!(
        table.cells("age").unwrap(),
        numbers(&[Some(34.0), Some(34.0), Some(17.0), Some(52.0)])
    );
    assert_eq!(
        table.cells("signup").unwrap(),
        vec![
            Value::Text("2024-01-05".to_string()),
            Value::Text("2024-03-15".to_string()),
            Value::Text("2024-02-29".to_string()),
            Value::Text("not a date".to_string()),
        ]
    );
}

#[test]
fn test_malformed_input_is_fatal() {
    let err = pipeline().run(b"", "remove duplicates").unwrap_err();
    assert!(matches!(err, CleaningError::MalformedInput(_)));
}

#[test]
fn test_result_serializes_without_table() {
    let result = pipeline()
        .run(b"id\n1\n1\n", "remove duplicates")
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert!(json.get("table").is_none());
    assert_eq!(json["strategy"], "pattern");
    assert_eq!(json["action_log"][0]["status"], "applied");
    assert_eq!(json["stats"]["rows_after"], 1);
    assert_eq!(json["validation"]["is_valid"], true);
}
