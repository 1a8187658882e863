use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder};

use super::{Database, DbConfig};
use crate::error::ImportError;

/// Synchronous MySQL connection held for the process lifetime.
pub struct MySqlDatabase {
    conn: Conn,
}

impl MySqlDatabase {
    /// Connect to the server. A failure here is fatal to the run.
    pub fn connect(config: &DbConfig) -> Result<Self, ImportError> {
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(config.host.clone()))
            .tcp_port(config.port)
            .user(Some(config.user.clone()))
            .pass(config.password.clone())
            .db_name(Some(config.dbname.clone()));

        let conn = Conn::new(opts).map_err(|e| ImportError::Database(e.to_string()))?;
        Ok(Self { conn })
    }
}

impl Database for MySqlDatabase {
    fn execute(&mut self, sql: &str) -> Result<(), ImportError> {
        self.conn
            .query_drop(sql)
            .map_err(|e| ImportError::Database(e.to_string()))
    }

    fn count_rows(&mut self, table: &str) -> Result<u64, ImportError> {
        let sql = format!("SELECT COUNT(*) FROM `{}`", table.replace('`', "``"));
        let count: Option<u64> = self
            .conn
            .query_first(sql)
            .map_err(|e| ImportError::Database(e.to_string()))?;
        count.ok_or_else(|| ImportError::Database("COUNT(*) returned no rows".to_string()))
    }
}
