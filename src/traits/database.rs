use async_trait::async_trait;

use crate::config::ConnectOptions;
use crate::error::Result;
use crate::types::{FetchMode, Parameter, ResultHandle, Row, Value};

/// The database capability interface.
///
/// Application code depends on this trait rather than on a concrete client,
/// so the live [`MysqlDatabase`](crate::MysqlDatabase) can be swapped for
/// [`StubDatabase`](crate::StubDatabase) in tests.
#[async_trait]
pub trait Database: Send {
    /// Open a session. On failure the driver's code and message are kept.
    async fn connect(&mut self, options: ConnectOptions) -> Result<bool>;

    /// Open a new session with the options of the last successful `connect`.
    async fn reconnect(&mut self) -> Result<bool>;

    async fn close(&mut self) -> Result<bool>;

    async fn autocommit(&mut self, mode: bool) -> Result<bool>;

    async fn begin_transaction(&mut self) -> Result<bool>;

    async fn commit(&mut self) -> Result<bool>;

    async fn rollback(&mut self) -> Result<bool>;

    /// Run a statement. `params` are bound positionally to `?` placeholders.
    ///
    /// Running the same SQL text again with parameters re-executes the
    /// already prepared statement instead of preparing it a second time.
    async fn query(&mut self, sql: &str, params: &[Parameter]) -> Result<ResultHandle>;

    /// Re-bind `params` to the most recently prepared statement and run it again.
    async fn execute(&mut self, params: &[Parameter]) -> Result<ResultHandle>;

    async fn ping(&mut self) -> Result<bool>;

    fn num_rows(&self, result: ResultHandle) -> Result<u64>;

    /// Value of `field` in row number `row`.
    fn result(&mut self, result: ResultHandle, row: u64, field: &str) -> Result<Value>;

    /// Release a result. The handle is invalid afterwards.
    fn free_result(&mut self, result: ResultHandle) -> Result<()>;

    fn fetch_array(&mut self, result: ResultHandle, mode: FetchMode) -> Result<Option<Row>>;

    fn fetch_assoc(&mut self, result: ResultHandle) -> Result<Option<Row>>;

    fn fetch_row(&mut self, result: ResultHandle) -> Result<Option<Row>>;

    /// All remaining rows.
    fn fetch_all(&mut self, result: ResultHandle, mode: FetchMode) -> Result<Vec<Row>>;

    fn insert_id(&self) -> Result<u64>;

    /// Move the cursor of `result` to `row`. Returns false if out of range.
    fn data_seek(&mut self, result: ResultHandle, row: u64) -> Result<bool>;

    fn affected_rows(&self) -> Result<u64>;

    /// Escape a string for use inside a quoted SQL literal.
    fn esc(&self, value: &str) -> Result<String>;

    fn client_info(&self) -> Result<String>;

    fn host_info(&self) -> Result<String>;

    fn proto_info(&self) -> Result<String>;

    fn server_info(&self) -> Result<String>;

    /// Data plus index size in bytes of `dbname`, or of the connected database.
    async fn size(&mut self, dbname: Option<&str>) -> Result<u64>;

    /// Code of the last driver error, 0 if the last driver call succeeded.
    fn errno(&self) -> u16;

    /// Message of the last driver error, empty if the last driver call succeeded.
    fn errstr(&self) -> String;
}
