//! Prepared statement handle.

use super::Conn;
use super::conn::ExecResult;
use super::rows::Rows;
use crate::conversion::ToParams;
use crate::error::Result;
use crate::exec_options::ExecOptions;

/// SQL text bound to a connection.
///
/// The service compiles statements on every submission, so preparing is
/// free and executions are independent.
#[derive(Debug)]
pub struct Statement<'c> {
    conn: &'c Conn,
    sql: String,
}

impl<'c> Statement<'c> {
    pub(crate) fn new(conn: &'c Conn, sql: String) -> Self {
        Self { conn, sql }
    }

    /// SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of bind placeholders. Unknown before execution.
    pub fn num_input(&self) -> Option<usize> {
        None
    }

    /// Execute the statement.
    pub async fn exec<P: ToParams>(&self, params: P) -> Result<ExecResult> {
        self.conn.exec(&self.sql, params).await
    }

    /// Execute the statement with per-call options.
    pub async fn exec_with<P: ToParams>(&self, params: P, opts: &ExecOptions) -> Result<ExecResult> {
        self.conn.exec_with(&self.sql, params, opts).await
    }

    /// Run the statement and stream its rows.
    pub async fn query<P: ToParams>(&self, params: P) -> Result<Rows> {
        self.conn.query(&self.sql, params).await
    }

    /// Run the statement with per-call options and stream its rows.
    pub async fn query_with<P: ToParams>(&self, params: P, opts: &ExecOptions) -> Result<Rows> {
        self.conn.query_with(&self.sql, params, opts).await
    }
}
