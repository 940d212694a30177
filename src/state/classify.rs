//! Statement classification and result extraction.

use crate::error::{Error, Result};
use crate::protocol::response::ExecResponseData;
use crate::protocol::types::{MULTI_STATEMENT_COLUMN, statement_type};

/// Insert id reported for every statement; the service has none.
pub const NO_LAST_INSERT_ID: i64 = -1;

/// How a response is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Reports affected rows in its first row
    Dml,
    /// Parent of a multi-statement chain; the children hold the results
    Multi,
    /// Anything else; no affected rows
    Ddl,
}

impl StatementKind {
    /// Classify a statement type id.
    ///
    /// `first_column` is the name of the first result column. The multi
    /// statement id is shared with single statements, and only the literal
    /// column name tells them apart.
    pub fn from_type_id(type_id: i64, first_column: Option<&str>) -> Self {
        if type_id == statement_type::MULTI {
            if first_column == Some(MULTI_STATEMENT_COLUMN) {
                StatementKind::Multi
            } else {
                StatementKind::Dml
            }
        } else if (statement_type::DML..=statement_type::MULTI_TABLE_INSERT).contains(&type_id) {
            StatementKind::Dml
        } else {
            StatementKind::Ddl
        }
    }
}

/// Classify a response.
pub fn classify(data: &ExecResponseData) -> StatementKind {
    let first_column = data.row_type.first().map(|c| c.name.as_str());
    StatementKind::from_type_id(data.statement_type_id, first_column)
}

/// Affected rows of a DML response: the sum of the counts in the first row.
///
/// MERGE and multi-table INSERT report one count per column. An empty row
/// set counts as zero and NULL cells are skipped.
pub fn affected_rows(data: &ExecResponseData) -> Result<i64> {
    let Some(row) = data.row_set.first() else {
        return Ok(0);
    };
    let width = data.row_type.len().min(row.len());
    let mut total = 0_i64;
    for cell in row.iter().take(width).flatten() {
        let count: i64 = cell
            .trim()
            .parse()
            .map_err(|_| Error::decode(format!("invalid affected row count: {:?}", cell)))?;
        total = total.saturating_add(count);
    }
    Ok(total)
}

/// One child of a multi-statement chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildResult {
    /// Child query id
    pub query_id: String,
    /// Child statement type id
    pub statement_type_id: i64,
}

/// Child results of a multi-statement parent, in server order.
pub fn child_results(data: &ExecResponseData) -> Result<Vec<ChildResult>> {
    if data.result_ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<&str> = data.result_ids.split(',').collect();
    let types: Vec<&str> = data.result_types.split(',').collect();
    if ids.len() != types.len() {
        return Err(Error::decode(format!(
            "{} child result ids but {} result types",
            ids.len(),
            types.len()
        )));
    }
    ids.into_iter()
        .zip(types)
        .map(|(id, type_id)| {
            let statement_type_id = type_id.trim().parse().map_err(|_| {
                Error::decode(format!("invalid child statement type: {:?}", type_id))
            })?;
            Ok(ChildResult {
                query_id: id.trim().to_string(),
                statement_type_id,
            })
        })
        .collect()
}
