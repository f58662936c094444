use async_trait::async_trait;

use crate::config::ConnectOptions;
use crate::error::Result;
use crate::traits::Database;
use crate::types::{FetchMode, Parameter, ResultHandle, Row, Value};

/// A [`Database`] that never talks to a server.
///
/// Every fetch returns the payload set with [`add_payload`](Self::add_payload),
/// whatever query ran before, and every other operation succeeds with a fixed
/// answer. Use it to unit test code written against `Database`.
///
/// Fetches are never exhausted: a `while let Some(row) = db.fetch_assoc(h)?`
/// loop only ends when the payload is empty, in which case every fetch
/// returns `None`.
///
/// # Example
/// ```
/// use myrs::{Database, Row, StubDatabase};
///
/// let mut db = StubDatabase::new();
/// db.add_payload([("user", "hamu")].into_iter().collect::<Row>());
///
/// let row = db.fetch_assoc(Default::default()).unwrap().unwrap();
/// assert_eq!(row.get("user").and_then(|v| v.as_str()), Some("hamu"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StubDatabase {
    options: Option<ConnectOptions>,
    payload: Row,
}

impl StubDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the row returned by every fetch.
    pub fn add_payload(&mut self, payload: Row) {
        self.payload = payload;
    }

    pub fn payload(&self) -> &Row {
        &self.payload
    }

    fn fetch_payload(&self) -> Option<Row> {
        (!self.payload.is_empty()).then(|| self.payload.clone())
    }

    /// Options passed to the last `connect`.
    pub fn connect_options(&self) -> Option<&ConnectOptions> {
        self.options.as_ref()
    }
}

#[async_trait]
impl Database for StubDatabase {
    async fn connect(&mut self, options: ConnectOptions) -> Result<bool> {
        self.options = Some(options);
        Ok(true)
    }

    async fn reconnect(&mut self) -> Result<bool> {
        match self.options.clone() {
            Some(options) => self.connect(options).await,
            None => Ok(true),
        }
    }

    async fn close(&mut self) -> Result<bool> {
        Ok(true)
    }

    async fn autocommit(&mut self, _mode: bool) -> Result<bool> {
        Ok(true)
    }

    async fn begin_transaction(&mut self) -> Result<bool> {
        Ok(true)
    }

    async fn commit(&mut self) -> Result<bool> {
        Ok(true)
    }

    async fn rollback(&mut self) -> Result<bool> {
        Ok(true)
    }

    async fn query(&mut self, _sql: &str, _params: &[Parameter]) -> Result<ResultHandle> {
        Ok(ResultHandle::default())
    }

    async fn execute(&mut self, _params: &[Parameter]) -> Result<ResultHandle> {
        Ok(ResultHandle::default())
    }

    async fn ping(&mut self) -> Result<bool> {
        Ok(true)
    }

    fn num_rows(&self, _result: ResultHandle) -> Result<u64> {
        Ok(self.payload.len() as u64)
    }

    fn result(&mut self, _result: ResultHandle, _row: u64, _field: &str) -> Result<Value> {
        Ok(Value::from("result"))
    }

    fn free_result(&mut self, _result: ResultHandle) -> Result<()> {
        Ok(())
    }

    fn fetch_array(&mut self, _result: ResultHandle, _mode: FetchMode) -> Result<Option<Row>> {
        Ok(self.fetch_payload())
    }

    fn fetch_assoc(&mut self, _result: ResultHandle) -> Result<Option<Row>> {
        Ok(self.fetch_payload())
    }

    fn fetch_row(&mut self, _result: ResultHandle) -> Result<Option<Row>> {
        Ok(self.fetch_payload())
    }

    fn fetch_all(&mut self, _result: ResultHandle, _mode: FetchMode) -> Result<Vec<Row>> {
        Ok(self.fetch_payload().into_iter().collect())
    }

    fn insert_id(&self) -> Result<u64> {
        Ok(1)
    }

    fn data_seek(&mut self, _result: ResultHandle, _row: u64) -> Result<bool> {
        Ok(true)
    }

    fn affected_rows(&self) -> Result<u64> {
        Ok(1)
    }

    fn esc(&self, value: &str) -> Result<String> {
        Ok(value.to_string())
    }

    fn client_info(&self) -> Result<String> {
        Ok("client info".to_string())
    }

    fn host_info(&self) -> Result<String> {
        Ok("host info".to_string())
    }

    fn proto_info(&self) -> Result<String> {
        Ok("proto info".to_string())
    }

    fn server_info(&self) -> Result<String> {
        Ok("server info".to_string())
    }

    async fn size(&mut self, _dbname: Option<&str>) -> Result<u64> {
        Ok(1)
    }

    fn errno(&self) -> u16 {
        1
    }

    fn errstr(&self) -> String {
        "error".to_string()
    }
}
