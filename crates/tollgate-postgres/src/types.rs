use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tollgate_core::{Result, ServiceError, Validate, validate};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("must be valid regex"));

/// Statements accepted by `query`
const READ_KEYWORDS: [&str; 4] = ["select", "with", "values", "explain"];

/// Tables and views in a schema
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListTablesRequest {
    #[serde(default = "default_schema")]
    pub schema: String,
}

impl Validate for ListTablesRequest {
    fn validate(&self) -> Result<()> {
        validate::pattern("schema", &self.schema, &IDENTIFIER)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesResponse {
    pub schema: String,
    pub tables: Vec<String>,
}

/// Columns of one table
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DescribeTableRequest {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
}

impl Validate for DescribeTableRequest {
    fn validate(&self) -> Result<()> {
        validate::pattern("schema", &self.schema, &IDENTIFIER)?;
        validate::pattern("table", &self.table, &IDENTIFIER)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDescription {
    pub schema: String,
    pub table: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Run a single read-only statement
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct QueryRequest {
    /// One `SELECT`, `WITH`, `VALUES` or `EXPLAIN` statement
    pub sql: String,
    /// Maximum rows to return, bounded by the server's configured `max_rows`
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Validate for QueryRequest {
    fn validate(&self) -> Result<()> {
        validate::length("sql", &self.sql, 1, 10_000)?;
        if self.limit == 0 {
            return Err(ServiceError::validation("limit", "must be at least 1"));
        }
        read_only_statement(&self.sql).map(|_| ())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// One JSON object per row, keyed by column name
    pub rows: Vec<Value>,
    pub row_count: usize,
    /// More rows matched than `limit`
    pub truncated: bool,
}

fn default_schema() -> String {
    "public".to_string()
}

const fn default_limit() -> u32 {
    100
}

/// Statement kind after normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatementKind {
    /// Can be wrapped as a subquery
    Rows,
    /// `EXPLAIN` output, run as-is
    Explain,
}

/// Check that `sql` is exactly one read statement and return it without
/// trailing semicolons
pub(crate) fn read_only_statement(sql: &str) -> Result<(&str, StatementKind)> {
    let statement = sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());

    if has_separator(statement) {
        return Err(ServiceError::validation("sql", "only a single statement is allowed"));
    }

    let keyword = first_keyword(statement).to_ascii_lowercase();

    if !READ_KEYWORDS.contains(&keyword.as_str()) {
        return Err(ServiceError::validation(
            "sql",
            "only SELECT, WITH, VALUES and EXPLAIN statements are allowed",
        ));
    }

    let kind = if keyword == "explain" {
        StatementKind::Explain
    } else {
        StatementKind::Rows
    };

    Ok((statement, kind))
}

/// First word after leading comments, whitespace and opening parentheses
fn first_keyword(sql: &str) -> &str {
    let mut rest = sql;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '(');

        if let Some(line) = rest.strip_prefix("--") {
            rest = line.split_once('\n').map_or("", |(_, after)| after);
        } else if let Some(block) = rest.strip_prefix("/*") {
            rest = block.split_once("*/").map_or("", |(_, after)| after);
        } else {
            break;
        }
    }

    let end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());

    &rest[..end]
}

/// Whether a `;` appears outside literals, quoted identifiers and comments
fn has_separator(sql: &str) -> bool {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Code,
        Literal,
        Identifier,
        LineComment,
        BlockComment,
    }

    let mut state = State::Code;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        state = match (state, c) {
            (State::Code, ';') => return true,
            (State::Code, '\'') => State::Literal,
            (State::Code, '"') => State::Identifier,
            (State::Code, '-') if chars.peek() == Some(&'-') => {
                chars.next();
                State::LineComment
            }
            (State::Code, '/') if chars.peek() == Some(&'*') => {
                chars.next();
                State::BlockComment
            }
            (State::Literal, '\'') | (State::Identifier, '"') | (State::LineComment, '\n') => State::Code,
            (State::BlockComment, '*') if chars.peek() == Some(&'/') => {
                chars.next();
                State::Code
            }
            (state, _) => state,
        };
    }

    false
}
