//! Transaction support for asynchronous Snowflake connections.

use super::Conn;
use crate::error::{Error, Result};

/// A Snowflake transaction.
///
/// The connection is passed to `commit` and `rollback` to run the
/// transaction commands.
#[derive(Debug)]
pub struct Transaction {
    connection_id: u64,
}

impl Transaction {
    pub(crate) fn new(connection_id: u64) -> Self {
        Self { connection_id }
    }

    /// Id of the connection that began the transaction.
    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    /// Commit the transaction.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUsage` if the connection is not the same
    /// as the one that started the transaction.
    pub async fn commit(self, conn: &Conn) -> Result<()> {
        self.check(conn)?;
        conn.exec("COMMIT", ()).await?;
        Ok(())
    }

    /// Roll back the transaction.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUsage` if the connection is not the same
    /// as the one that started the transaction.
    pub async fn rollback(self, conn: &Conn) -> Result<()> {
        self.check(conn)?;
        conn.exec("ROLLBACK", ()).await?;
        Ok(())
    }

    fn check(&self, conn: &Conn) -> Result<()> {
        let actual = conn.connection_id();
        if self.connection_id != actual {
            return Err(Error::InvalidUsage(format!(
                "connection mismatch: expected {}, got {}",
                self.connection_id, actual
            )));
        }
        Ok(())
    }
}
