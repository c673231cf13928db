//! Deterministic keyword matching.
//!
//! The instruction is split into segments, and each segment is offered to an
//! ordered list of matchers. The first matcher that produces rules wins, so
//! the more specific matchers come first. Column names are found by
//! case-insensitive search against the schema and the configured aliases,
//! whole words first. The same instruction and schema always give the same
//! rules.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::debug;

use super::{RuleStrategy, SchemaView, StrategyOutput, expand_fill};
use crate::config::CleaningConfig;
use crate::error::Result;
use crate::rules::{CaseStyle, Comparison, FillStrategy, Rule, TargetType};
use crate::types::{ColumnMeta, ColumnType, StrategyKind};
use crate::utils::is_valid_date_format;

// =============================================================================
// Segmentation
// =============================================================================

// Always a boundary: semicolons, newlines, sentence ends and "then".
static HARD_SPLIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:[;\n]|\.(?:\s+|$)|,?\s*\b(?:and\s+)?then\b)\s*")
        .expect("Invalid regex: hard split")
});

// A boundary only when a cleaning verb follows.
static SOFT_SPLIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:,\s*(?:and\s+)?|\band\s+)").expect("Invalid regex: soft split")
});

static VERB_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:also\s+)?(?:remove|drop|delete|fill|replace|rename|trim|strip|convert|cast|change|make|standardi[sz]e|normali[sz]e|format|keep|filter|lowercase|uppercase|capitali[sz]e|impute|dedupe|deduplicate|clean|eliminate|exclude)\b",
    )
    .expect("Invalid regex: verb start")
});

// =============================================================================
// Matcher Patterns
// =============================================================================

static RENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\brename\s+(?:the\s+)?(?:column\s+)?["'`]?(.+?)["'`]?\s+(?:column\s+)?(?:to|as|into)\s+["'`]?([^"'`]+?)["'`]?\s*$"#,
    )
    .expect("Invalid regex: rename")
});

static COLUMN_NAMES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:column\s+names?|col\s+names?|headers?|header\s+names?)\b")
        .expect("Invalid regex: column names")
});

static NAMES_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:standardi[sz]e|normali[sz]e|clean|fix|tidy|lower\s*case|snake)")
        .expect("Invalid regex: names verb")
});

static DATE_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bdates?\b").expect("Invalid regex: date word"));

static DATE_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:format|standardi[sz]e|normali[sz]e|reformat|unify)")
        .expect("Invalid regex: date verb")
});

static STRFTIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["'`]?([^\s"'`]*%[A-Za-z][^\s"'`]*)["'`]?"#).expect("Invalid regex: strftime")
});

static HUMAN_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(YYYY|YY|MM|DD)([-/.])(YYYY|YY|MM|DD)(?:([-/.])(YYYY|YY|MM|DD))?\b")
        .expect("Invalid regex: human date")
});

static NAMED_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(iso|us|american|eu|european|uk|british)\b")
        .expect("Invalid regex: named date")
});

static CAST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:convert|cast|change|make|turn)\b(.*?)\b(?:to|as|into)\s+(?:an?\s+)?(int|integer|float|decimal|number|numeric|double|str|string|text|bool|boolean|date|datetime|timestamp)s?\b",
    )
    .expect("Invalid regex: cast")
});

static SHOULD_BE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(.*?)\b(?:should|must)\s+be\s+(?:an?\s+)?(int|integer|float|decimal|number|numeric|double|str|string|text|bool|boolean|date|datetime|timestamp)s?\b",
    )
    .expect("Invalid regex: should be")
});

// Bare "lower" and "upper" only count as the leading verb or after "to"/"in".
static CASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(lower\s*case|upper\s*case|title\s*case|proper\s*case|capitali[sz]e[sd]?)\b|^(?:also\s+)?(lower|upper)\b|\b(?:to|into|in)\s+(lower|upper)\b",
    )
    .expect("Invalid regex: case")
});

static TRIM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:trim|strip|whitespace|white\s+space|extra\s+spaces?)\b")
        .expect("Invalid regex: trim")
});

static DUPLICATES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:duplicates?|duplicated|dedupe|de-?duplicate|dupes?)\b")
        .expect("Invalid regex: duplicates")
});

static REMOVE_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:remove|drop|delete|exclude|discard|eliminate|get\s+rid\s+of)\b")
        .expect("Invalid regex: remove verb")
});

static MISSING_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:missing|nulls?|empty|blanks?|na|nan|incomplete)\b")
        .expect("Invalid regex: missing word")
});

static FILL_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:fill|impute|replace|populate)\b").expect("Invalid regex: fill verb")
});

static FORWARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:forward[\s-]?fill|ffill|forward|previous|carry\s+forward|last\s+(?:known\s+)?value)\b")
        .expect("Invalid regex: forward")
});

static BACKWARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:backward?[\s-]?fill|bfill|backwards?|next\s+(?:known\s+)?value)\b")
        .expect("Invalid regex: backward")
});

static MEAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:mean|average|avg)\b").expect("Invalid regex: mean"));

static MEDIAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bmedian\b").expect("Invalid regex: median"));

static MODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:mode|most\s+(?:frequent|common))\b").expect("Invalid regex: mode")
});

static CONSTANT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:with|using|as|to)\s+(?:the\s+)?(?:value\s+)?["']?(.+?)["']?\s*$"#)
        .expect("Invalid regex: constant")
});

static FILTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(filter\s+out|only\s+keep|remove|delete|drop|exclude|keep|retain|filter|select)\b.*?\b(?:where|whose|if|when|with)\s+(.+)$",
    )
    .expect("Invalid regex: filter")
});

static CONDITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^["'`]?(.+?)["'`]?\s*(==|!=|<>|<=|>=|=|<|>|\b(?:(?:is\s+)?(?:not\s+equal\s+to|(?:greater|less)\s+than\s+or\s+equal\s+to|(?:greater|more|higher|less|fewer|lower)\s+than|equal\s+to|equals|at\s+least|at\s+most|above|below|over|under)|is\s+not|is)\b)\s*["']?(.+?)["']?\s*$"#,
    )
    .expect("Invalid regex: condition")
});

// A filter value that still opens with one of these lost its operator.
static OPERATOR_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:is|not|equals?|at\s+(?:least|most)|(?:greater|more|higher|less|fewer|lower)\s+than|above|below|over|under)\b",
    )
    .expect("Invalid regex: operator word")
});

static DROP_COLUMNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcolumns?\b").expect("Invalid regex: columns word"));

// =============================================================================
// Strategy
// =============================================================================

type Matcher = fn(&PatternStrategy, &str, &SchemaView) -> Option<Vec<Rule>>;

/// Matchers in priority order.
const MATCHERS: [(&str, Matcher); 11] = [
    ("rename_column", PatternStrategy::match_rename),
    ("standardize_column_names", PatternStrategy::match_column_names),
    ("standardize_date_format", PatternStrategy::match_date_format),
    ("type_cast", PatternStrategy::match_type_cast),
    ("standardize_case", PatternStrategy::match_case),
    ("trim_whitespace", PatternStrategy::match_trim),
    ("drop_duplicates", PatternStrategy::match_duplicates),
    ("drop_rows_with_missing", PatternStrategy::match_drop_missing),
    ("fill_missing", PatternStrategy::match_fill),
    ("filter_rows", PatternStrategy::match_filter),
    ("drop_columns", PatternStrategy::match_drop_columns),
];

/// Keyword-driven compilation with no external dependencies.
#[derive(Debug, Clone)]
pub struct PatternStrategy {
    aliases: BTreeMap<String, String>,
    default_date_format: String,
}

impl PatternStrategy {
    pub fn new(config: &CleaningConfig) -> Self {
        Self {
            aliases: config
                .column_aliases
                .iter()
                .map(|(alias, column)| (alias.to_lowercase(), column.clone()))
                .collect(),
            default_date_format: config.default_date_format.clone(),
        }
    }

    fn match_rename(&self, segment: &str, view: &SchemaView) -> Option<Vec<Rule>> {
        let caps = RENAME.captures(segment)?;
        let from = self.lookup(&caps[1], view)?;
        let to = caps[2].trim().trim_end_matches('.').to_string();
        if to.is_empty() {
            return None;
        }
        Some(vec![Rule::RenameColumn { from, to }])
    }

    fn match_column_names(&self, segment: &str, _view: &SchemaView) -> Option<Vec<Rule>> {
        (COLUMN_NAMES.is_match(segment) && NAMES_VERB.is_match(segment))
            .then(|| vec![Rule::StandardizeColumnNames])
    }

    fn match_date_format(&self, segment: &str, view: &SchemaView) -> Option<Vec<Rule>> {
        if !DATE_WORD.is_match(segment) || !DATE_VERB.is_match(segment) {
            return None;
        }
        let format = self.date_format(segment);

        let mut columns = self.find_columns(segment, view);
        if columns.is_empty() {
            columns = columns_of_type(view, ColumnType::Date);
        }
        non_empty(
            columns
                .into_iter()
                .map(|column| Rule::StandardizeDateFormat {
                    column,
                    format: format.clone(),
                })
                .collect(),
        )
    }

    fn match_type_cast(&self, segment: &str, view: &SchemaView) -> Option<Vec<Rule>> {
        let (scope, target) = if let Some(caps) = CAST.captures(segment) {
            (caps.get(1)?.as_str(), TargetType::parse(&caps[2])?)
        } else {
            let caps = SHOULD_BE.captures(segment)?;
            (caps.get(1)?.as_str(), TargetType::parse(&caps[2])?)
        };
        non_empty(
            self.find_columns(scope, view)
                .into_iter()
                .map(|column| Rule::TypeCast { column, target })
                .collect(),
        )
    }

    fn match_case(&self, segment: &str, view: &SchemaView) -> Option<Vec<Rule>> {
        let caps = CASE.captures(segment)?;
        let word = (1..=3).find_map(|i| caps.get(i))?;
        // Case words inside a "where" clause belong to the condition
        if let Some(filter) = FILTER.captures(segment)
            && let Some(condition) = filter.get(2)
            && word.start() >= condition.start()
        {
            return None;
        }
        let word = word.as_str().to_ascii_lowercase();
        let case = if word.starts_with("lower") {
            CaseStyle::Lower
        } else if word.starts_with("upper") {
            CaseStyle::Upper
        } else {
            CaseStyle::Title
        };

        let mut columns = self.find_columns(segment, view);
        if columns.is_empty() {
            columns = columns_of_type(view, ColumnType::Text);
        }
        non_empty(
            columns
                .into_iter()
                .map(|column| Rule::StandardizeCase { column, case })
                .collect(),
        )
    }

    fn match_trim(&self, segment: &str, view: &SchemaView) -> Option<Vec<Rule>> {
        if !TRIM.is_match(segment) {
            return None;
        }
        let columns = self.find_columns(segment, view);
        if columns.is_empty() {
            return Some(vec![Rule::TrimWhitespace { column: None }]);
        }
        Some(
            columns
                .into_iter()
                .map(|column| Rule::TrimWhitespace {
                    column: Some(column),
                })
                .collect(),
        )
    }

    fn match_duplicates(&self, segment: &str, view: &SchemaView) -> Option<Vec<Rule>> {
        if !DUPLICATES.is_match(segment) {
            return None;
        }
        let columns = self.find_columns(segment, view);
        Some(vec![Rule::DropDuplicates {
            columns: (!columns.is_empty()).then_some(columns),
        }])
    }

    fn match_drop_missing(&self, segment: &str, view: &SchemaView) -> Option<Vec<Rule>> {
        if !REMOVE_VERB.is_match(segment) || !MISSING_WORD.is_match(segment) {
            return None;
        }
        let columns = self.find_columns(segment, view);
        if columns.is_empty() {
            return Some(vec![Rule::DropRowsWithMissing { column: None }]);
        }
        Some(
            columns
                .into_iter()
                .map(|column| Rule::DropRowsWithMissing {
                    column: Some(column),
                })
                .collect(),
        )
    }

    fn match_fill(&self, segment: &str, view: &SchemaView) -> Option<Vec<Rule>> {
        if !FILL_VERB.is_match(segment) {
            return None;
        }

        let (strategy, scope) = if FORWARD.is_match(segment) {
            (FillStrategy::ForwardFill, segment)
        } else if BACKWARD.is_match(segment) {
            (FillStrategy::BackwardFill, segment)
        } else if MEAN.is_match(segment) {
            (FillStrategy::Mean, segment)
        } else if MEDIAN.is_match(segment) {
            (FillStrategy::Median, segment)
        } else if MODE.is_match(segment) {
            (FillStrategy::Mode, segment)
        } else {
            let caps = CONSTANT.captures(segment)?;
            let whole = caps.get(0)?;
            let value = constant_value(&caps[1]);
            (FillStrategy::Constant { value }, &segment[..whole.start()])
        };

        let columns = self.find_columns(scope, view);
        let rules = if columns.is_empty() {
            expand_fill(view, &strategy)
        } else {
            columns
                .into_iter()
                .map(|column| Rule::FillMissing {
                    column,
                    strategy: strategy.clone(),
                })
                .collect()
        };
        non_empty(rules)
    }

    fn match_filter(&self, segment: &str, view: &SchemaView) -> Option<Vec<Rule>> {
        let caps = FILTER.captures(segment)?;
        let verb = caps[1].to_ascii_lowercase();
        let removes = (verb.starts_with("filter") && verb.ends_with("out"))
            || ["remove", "delete", "drop", "exclude"].contains(&verb.as_str());

        let condition = CONDITION.captures(caps[2].trim().trim_end_matches('.'))?;
        let column = self.lookup(&condition[1], view)?;
        let op = Comparison::parse(&normalize_spaces(&condition[2]))?;
        let value = condition[3].trim().to_string();
        if OPERATOR_WORD.is_match(&value) {
            debug!("Filter value {:?} starts with an operator word", value);
            return None;
        }

        Some(vec![Rule::FilterRows {
            column,
            op: if removes { op.negate() } else { op },
            value,
        }])
    }

    fn match_drop_columns(&self, segment: &str, view: &SchemaView) -> Option<Vec<Rule>> {
        if !REMOVE_VERB.is_match(segment) || !DROP_COLUMNS.is_match(segment) {
            return None;
        }
        let columns = self.find_columns(segment, view);
        (!columns.is_empty()).then(|| vec![Rule::DropColumns { columns }])
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn date_format(&self, segment: &str) -> String {
        let candidate = if let Some(caps) = STRFTIME.captures(segment) {
            Some(caps[1].to_string())
        } else if let Some(caps) = HUMAN_DATE.captures(segment) {
            Some(human_date_format(&caps))
        } else {
            NAMED_DATE.captures(segment).map(|caps| {
                match caps[1].to_ascii_lowercase().as_str() {
                    "us" | "american" => "%m/%d/%Y",
                    "eu" | "european" | "uk" | "british" => "%d/%m/%Y",
                    _ => "%Y-%m-%d",
                }
                .to_string()
            })
        };
        candidate
            .filter(|f| is_valid_date_format(f))
            .unwrap_or_else(|| self.default_date_format.clone())
    }

    /// Resolve a phrase that should name exactly one column.
    fn lookup(&self, phrase: &str, view: &SchemaView) -> Option<String> {
        if let Some(meta) = view.resolve(phrase) {
            return Some(meta.name.clone());
        }
        if let Some(target) = self.aliases.get(&phrase.trim().to_lowercase())
            && let Some(meta) = view.resolve(target)
        {
            return Some(meta.name.clone());
        }
        self.find_columns(phrase, view).into_iter().next()
    }

    /// Columns mentioned in `text`, in order of appearance.
    ///
    /// Longer names win over names they contain ("first name" over "name"),
    /// and an underscore in a column name also matches a space. When no
    /// column is mentioned as a whole word, names that open a longer word
    /// count too, so "ages" finds `age`.
    fn find_columns(&self, text: &str, view: &SchemaView) -> Vec<String> {
        let haystack = text.to_lowercase();

        let mut terms: Vec<(String, String)> = Vec::new();
        for meta in view.columns() {
            let lower = meta.name.to_lowercase();
            if lower.contains('_') {
                terms.push((lower.replace('_', " "), meta.name.clone()));
            }
            terms.push((lower, meta.name.clone()));
        }
        for (alias, target) in &self.aliases {
            if let Some(meta) = view.resolve(target) {
                terms.push((alias.clone(), meta.name.clone()));
            }
        }

        let columns = mentions(&haystack, &terms, is_word_boundary);
        if columns.is_empty() {
            return mentions(&haystack, &terms, starts_word);
        }
        columns
    }
}

impl RuleStrategy for PatternStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Pattern
    }

    fn compile(&self, instruction: &str, schema: &[ColumnMeta]) -> Result<StrategyOutput> {
        let mut view = SchemaView::new(schema);
        let mut output = StrategyOutput::default();

        for segment in segment(instruction) {
            let matched = MATCHERS
                .iter()
                .find_map(|(name, matcher)| matcher(self, &segment, &view).map(|r| (*name, r)));

            match matched {
                Some((name, rules)) => {
                    debug!("Segment {:?} matched {} ({} rules)", segment, name, rules.len());
                    for rule in rules {
                        view.apply(&rule);
                        output.rules.push(rule);
                    }
                }
                None => {
                    debug!("No matcher for segment {:?}", segment);
                    output
                        .warnings
                        .push(format!("Did not understand \"{}\"", segment));
                }
            }
        }

        Ok(output)
    }
}

/// Split an instruction into clauses. Commas and "and" only separate clauses
/// when a cleaning verb follows, so "drop name and email columns" stays whole.
fn segment(instruction: &str) -> Vec<String> {
    let mut segments = Vec::new();

    for part in HARD_SPLIT.split(instruction) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let mut current = String::new();
        let mut last = 0;
        for m in SOFT_SPLIT.find_iter(part) {
            if VERB_START.is_match(&part[m.end()..]) {
                current.push_str(&part[last..m.start()]);
                push_segment(&mut segments, &current);
                current.clear();
                last = m.end();
            }
        }
        current.push_str(&part[last..]);
        push_segment(&mut segments, &current);
    }

    segments
}

fn push_segment(segments: &mut Vec<String>, text: &str) {
    let text = text.trim().trim_end_matches(['.', ',']).trim();
    if !text.is_empty() {
        segments.push(text.to_string());
    }
}

/// Non-overlapping mentions of `terms` accepted by `fits`, longest first,
/// returned in order of appearance.
fn mentions(
    haystack: &str,
    terms: &[(String, String)],
    fits: fn(&str, usize, usize) -> bool,
) -> Vec<String> {
    let mut spans: Vec<(usize, usize, &str)> = Vec::new();
    for (term, column) in terms {
        if term.trim().is_empty() {
            continue;
        }
        for (start, _) in haystack.match_indices(term.as_str()) {
            let end = start + term.len();
            if fits(haystack, start, end) {
                spans.push((start, end, column.as_str()));
            }
        }
    }

    spans.sort_by_key(|(start, end, _)| (Reverse(end - start), *start));
    let mut accepted: Vec<(usize, usize, &str)> = Vec::new();
    for span in spans {
        if accepted.iter().all(|(s, e, _)| span.1 <= *s || span.0 >= *e) {
            accepted.push(span);
        }
    }
    accepted.sort_by_key(|(start, _, _)| *start);

    let mut columns: Vec<String> = Vec::new();
    for (_, _, column) in accepted {
        if !columns.iter().any(|c| c == column) {
            columns.push(column.to_string());
        }
    }
    columns
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    starts_word(text, start, end) && text[end..].chars().next().is_none_or(|c| !is_word_char(c))
}

fn starts_word(text: &str, start: usize, _end: usize) -> bool {
    text[..start].chars().next_back().is_none_or(|c| !is_word_char(c))
}

fn columns_of_type(view: &SchemaView, column_type: ColumnType) -> Vec<String> {
    view.columns()
        .iter()
        .filter(|c| c.column_type == column_type)
        .map(|c| c.name.clone())
        .collect()
}

fn non_empty(rules: Vec<Rule>) -> Option<Vec<Rule>> {
    (!rules.is_empty()).then_some(rules)
}

fn normalize_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn constant_value(raw: &str) -> String {
    let value = raw.trim().trim_end_matches('.').trim();
    match value.to_ascii_lowercase().as_str() {
        "zero" | "zeros" | "zeroes" => "0".to_string(),
        "empty string" | "blank" => String::new(),
        _ => value.to_string(),
    }
}

fn human_date_format(caps: &Captures<'_>) -> String {
    let token = |t: &str| match t {
        "YYYY" => "%Y",
        "YY" => "%y",
        "MM" => "%m",
        _ => "%d",
    };
    let mut format = format!("{}{}{}", token(&caps[1]), &caps[2], token(&caps[3]));
    if let (Some(sep), Some(last)) = (caps.get(4), caps.get(5)) {
        format.push_str(sep.as_str());
        format.push_str(token(last.as_str()));
    }
    format
}
