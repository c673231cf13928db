//! Prompt construction and response parsing shared by all providers.

use anyhow::{Result, anyhow};
use serde::Deserialize;

use super::CandidateOperation;
use crate::rules::RuleKind;
use crate::types::ColumnMeta;

/// Describe the parameters each operation takes.
fn operation_help(kind: RuleKind) -> &'static str {
    match kind {
        RuleKind::DropDuplicates => {
            "remove repeated rows; optional parameters.columns = list of columns to compare"
        }
        RuleKind::DropRowsWithMissing => {
            "remove rows with a missing value in column (omit column for any column)"
        }
        RuleKind::FillMissing => {
            "parameters.method = mean | median | mode | constant | forward_fill | backward_fill; parameters.value for constant; omit column to fill every applicable column"
        }
        RuleKind::StandardizeCase => "parameters.case = lower | upper | title",
        RuleKind::StandardizeDateFormat => {
            "parameters.format = chrono/strftime format such as %Y-%m-%d"
        }
        RuleKind::RenameColumn => "column = current name, parameters.new_name = new name",
        RuleKind::TrimWhitespace => "strip surrounding spaces; omit column for every text column",
        RuleKind::TypeCast => "parameters.target = integer | float | text | boolean | date",
        RuleKind::DropColumns => "column or parameters.columns = columns to remove",
        RuleKind::StandardizeColumnNames => "lowercase snake_case every column name; no column",
        RuleKind::FilterRows => {
            "keep rows matching the condition; parameters.operator = == | != | < | <= | > | >=, parameters.value = literal. For 'remove rows where X' give the condition for rows to KEEP"
        }
    }
}

/// Build the interpretation prompt. Only column names and types are sent.
pub fn build_interpret_prompt(instruction: &str, schema: &[ColumnMeta]) -> String {
    let mut prompt = String::from(
        "You are a data cleaning assistant. Translate the user's instruction into an \
        ordered list of cleaning operations.\n\nCOLUMNS:\n",
    );

    for column in schema {
        prompt.push_str(&format!("- {} ({})\n", column.name, column.column_type));
    }

    prompt.push_str("\nOPERATIONS:\n");
    for kind in RuleKind::ALL {
        prompt.push_str(&format!("- {}: {}\n", kind.as_str(), operation_help(kind)));
    }

    prompt.push_str(&format!(
        "\nReturn ONLY a JSON array. Each element must have:\n\
        - \"operation\": one of the operations above\n\
        - \"column\": exact column name from COLUMNS, or null\n\
        - \"parameters\": object with the operation's parameters\n\
        - \"confidence\": number between 0 and 1\n\n\
        Example: \"fill missing age with the median\" -> \
        [{{\"operation\": \"fill_missing\", \"column\": \"age\", \"parameters\": {{\"method\": \"median\"}}, \"confidence\": 0.95}}]\n\n\
        Do NOT add explanations.\n\n\
        USER INSTRUCTION: {}\n",
        instruction
    ));

    prompt
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CandidatePayload {
    List(Vec<CandidateOperation>),
    Wrapped { operations: Vec<CandidateOperation> },
}

/// Parse a model answer into candidates.
///
/// Accepts a bare JSON array or `{"operations": [...]}`, optionally inside a
/// markdown code fence.
pub fn parse_candidates(response: &str) -> Result<Vec<CandidateOperation>> {
    let body = strip_code_fence(response.trim());
    if body.is_empty() {
        return Err(anyhow!("Empty response from AI provider"));
    }

    let payload: CandidatePayload = serde_json::from_str(body)
        .map_err(|e| anyhow!("AI response is not a list of operations: {}", e))?;

    Ok(match payload {
        CandidatePayload::List(ops) => ops,
        CandidatePayload::Wrapped { operations } => operations,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(start) = text.find("```") else {
        return text;
    };
    let after = &text[start + 3..];
    // Skip the language tag on the fence line
    let after = match after.find('\n') {
        Some(newline) => &after[newline + 1..],
        None => after,
    };
    match after.find("```") {
        Some(end) => after[..end].trim(),
        None => after.trim(),
    }
}
