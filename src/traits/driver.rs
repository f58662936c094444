use async_trait::async_trait;

use crate::config::ConnectOptions;
use crate::error::DriverError;
use crate::types::{RawQueryResult, Value};

/// Identifies a statement prepared by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatementId(pub u32);

/// Connection metadata captured when a session is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    pub client_info: String,
    pub host_info: String,
    pub proto_info: String,
    pub server_info: String,
}

/// Trait for native MySQL driver implementations.
/// Drivers are responsible for:
/// - Opening and closing the session
/// - Preparing statements and binding typed values to them
/// - Executing statements and converting rows to RawQueryResult
///
/// A driver owns at most one session. Calls made without an open session
/// fail with a "server has gone away" error.
#[async_trait]
pub trait MysqlDriver: Send {
    /// Open a session, replacing any existing one.
    async fn connect(&mut self, options: &ConnectOptions) -> Result<SessionInfo, DriverError>;

    async fn close(&mut self) -> Result<(), DriverError>;

    async fn ping(&mut self) -> Result<(), DriverError>;

    async fn autocommit(&mut self, mode: bool) -> Result<(), DriverError>;

    async fn begin_transaction(&mut self) -> Result<(), DriverError>;

    async fn commit(&mut self) -> Result<(), DriverError>;

    async fn rollback(&mut self) -> Result<(), DriverError>;

    /// Prepare a statement. Placeholders are `?`.
    async fn prepare(&mut self, sql: &str) -> Result<StatementId, DriverError>;

    /// Bind all values of a prepared statement in one call.
    /// `types` holds one type code (`i`, `s`, `d`, `b`) per value.
    fn bind(&mut self, statement: StatementId, types: &str, values: &[Value]) -> Result<(), DriverError>;

    /// Execute a prepared statement with its current bindings and buffer the result.
    async fn execute(&mut self, statement: StatementId) -> Result<RawQueryResult, DriverError>;

    /// Forget a statement that will not be executed again.
    fn release_statement(&mut self, statement: StatementId);
}
