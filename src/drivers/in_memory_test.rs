use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;

use crate::config::ConnectOptions;
use crate::error::{
    DriverError, CR_INVALID_PARAMETER_NO, CR_PARAMS_NOT_BOUND, CR_UNKNOWN_ERROR,
};
use crate::traits::{MysqlDriver, SessionInfo, StatementId};
use crate::types::{RawQueryResult, Value};

/// A driver call recorded for verification.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Connect(ConnectOptions),
    Close,
    Ping,
    Autocommit(bool),
    BeginTransaction,
    Commit,
    Rollback,
    Prepare(String),
    Bind {
        statement: StatementId,
        types: String,
        values: Vec<Value>,
    },
    Execute(StatementId),
}

impl DriverCall {
    pub fn operation(&self) -> DriverOperation {
        match self {
            DriverCall::Connect(_) => DriverOperation::Connect,
            DriverCall::Close => DriverOperation::Close,
            DriverCall::Ping => DriverOperation::Ping,
            DriverCall::Autocommit(_) => DriverOperation::Autocommit,
            DriverCall::BeginTransaction => DriverOperation::BeginTransaction,
            DriverCall::Commit => DriverOperation::Commit,
            DriverCall::Rollback => DriverOperation::Rollback,
            DriverCall::Prepare(_) => DriverOperation::Prepare,
            DriverCall::Bind { .. } => DriverOperation::Bind,
            DriverCall::Execute(_) => DriverOperation::Execute,
        }
    }
}

/// The kind of a driver call, used to target injected failures and counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverOperation {
    Connect,
    Close,
    Ping,
    Autocommit,
    BeginTransaction,
    Commit,
    Rollback,
    Prepare,
    Bind,
    Execute,
}

struct TestStatement {
    placeholders: usize,
    bound: bool,
}

/// An in-memory MySQL driver for testing.
///
/// Allows configuring expected responses and failures and verifying the
/// calls the client made. Binding and execution are checked the way the
/// native library checks them.
///
/// # Example
/// ```
/// use myrs::drivers::{InMemoryTestDriver, InMemoryTestResponseBuilder};
/// use myrs::MysqlDatabase;
///
/// let driver = InMemoryTestDriver::new().with_response(
///     InMemoryTestResponseBuilder::new()
///         .columns(&["id", "name"])
///         .row(&["1", "Alice"])
///         .build(),
/// );
/// let db = MysqlDatabase::with_driver(driver);
/// ```
pub struct InMemoryTestDriver {
    responses: VecDeque<RawQueryResult>,
    default_response: RawQueryResult,
    failures: HashMap<DriverOperation, VecDeque<DriverError>>,
    session: SessionInfo,
    connected: bool,
    statements: HashMap<StatementId, TestStatement>,
    next_statement: u32,
    recorded_calls: Vec<DriverCall>,
}

impl InMemoryTestDriver {
    /// Create a new in-memory test driver with no pre-configured responses.
    pub fn new() -> Self {
        Self {
            responses: VecDeque::new(),
            default_response: RawQueryResult::empty(),
            failures: HashMap::new(),
            session: SessionInfo {
                client_info: "in-memory test driver".to_string(),
                host_info: "localhost via memory".to_string(),
                proto_info: "10".to_string(),
                server_info: "8.0.0-test".to_string(),
            },
            connected: false,
            statements: HashMap::new(),
            next_statement: 1,
            recorded_calls: Vec::new(),
        }
    }

    /// Add a response to be returned by the next execution.
    /// Responses are returned in FIFO order.
    pub fn with_response(mut self, response: RawQueryResult) -> Self {
        self.responses.push_back(response);
        self
    }

    /// Add multiple responses to be returned by subsequent executions.
    pub fn with_responses(mut self, responses: impl IntoIterator<Item = RawQueryResult>) -> Self {
        self.responses.extend(responses);
        self
    }

    /// Set a default response to use when no queued responses remain.
    pub fn with_default_response(mut self, response: RawQueryResult) -> Self {
        self.default_response = response;
        self
    }

    /// Make the next call of `operation` fail with `error`.
    /// Several failures for one operation are used in FIFO order.
    pub fn with_failure(mut self, operation: DriverOperation, error: DriverError) -> Self {
        self.fail_next(operation, error);
        self
    }

    /// Same as `with_failure`, for a driver already owned by a client.
    pub fn fail_next(&mut self, operation: DriverOperation, error: DriverError) {
        self.failures.entry(operation).or_default().push_back(error);
    }

    pub fn with_session_info(mut self, session: SessionInfo) -> Self {
        self.session = session;
        self
    }

    /// Queue a response on a driver already owned by a client.
    pub fn push_response(&mut self, response: RawQueryResult) {
        self.responses.push_back(response);
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Get all recorded calls.
    pub fn recorded_calls(&self) -> &[DriverCall] {
        &self.recorded_calls
    }

    /// Get the last recorded call, if any.
    pub fn last_call(&self) -> Option<&DriverCall> {
        self.recorded_calls.last()
    }

    /// Number of recorded calls of one kind.
    pub fn call_count(&self, operation: DriverOperation) -> usize {
        self.recorded_calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// SQL of every prepare call, in order.
    pub fn prepared_sql(&self) -> Vec<&str> {
        self.recorded_calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::Prepare(sql) => Some(sql.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Clear all recorded calls.
    pub fn clear_recorded_calls(&mut self) {
        self.recorded_calls.clear();
    }

    /// Assert that exactly n calls of one kind were made.
    pub fn assert_call_count(&self, operation: DriverOperation, expected: usize) {
        let actual = self.call_count(operation);
        assert_eq!(
            actual, expected,
            "{:?} call count mismatch. Expected: {}, Actual: {}",
            operation, expected, actual
        );
    }

    /// Assert that the last bind carried the expected types and values.
    pub fn assert_last_bind(&self, expected_types: &str, expected_values: &[Value]) {
        let last = self
            .recorded_calls
            .iter()
            .rev()
            .find_map(|call| match call {
                DriverCall::Bind { types, values, .. } => Some((types, values)),
                _ => None,
            })
            .expect("No bind calls were recorded");
        assert_eq!(
            last.0, expected_types,
            "Bind types mismatch.\nExpected: {}\nActual: {}",
            expected_types, last.0
        );
        assert_eq!(
            last.1.as_slice(),
            expected_values,
            "Bind values mismatch.\nExpected: {:?}\nActual: {:?}",
            expected_values,
            last.1
        );
    }

    /// Record the call, then fail it if a failure is queued or there is no session.
    fn record(&mut self, call: DriverCall) -> Result<(), DriverError> {
        let operation = call.operation();
        self.recorded_calls.push(call);

        if let Some(error) = self.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        if operation != DriverOperation::Connect && !self.connected {
            return Err(DriverError::gone_away());
        }
        Ok(())
    }

    fn statement(&mut self, statement: StatementId) -> Result<&mut TestStatement, DriverError> {
        self.statements.get_mut(&statement).ok_or_else(|| {
            DriverError::new(
                CR_UNKNOWN_ERROR,
                format!("Unknown prepared statement handler ({})", statement.0),
            )
        })
    }
}

impl Default for InMemoryTestDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MysqlDriver for InMemoryTestDriver {
    async fn connect(&mut self, options: &ConnectOptions) -> Result<SessionInfo, DriverError> {
        self.connected = false;
        self.statements.clear();
        self.record(DriverCall::Connect(options.clone()))?;
        self.connected = true;
        Ok(self.session.clone())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.record(DriverCall::Close)?;
        self.connected = false;
        self.statements.clear();
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), DriverError> {
        self.record(DriverCall::Ping)
    }

    async fn autocommit(&mut self, mode: bool) -> Result<(), DriverError> {
        self.record(DriverCall::Autocommit(mode))
    }

    async fn begin_transaction(&mut self) -> Result<(), DriverError> {
        self.record(DriverCall::BeginTransaction)
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        self.record(DriverCall::Commit)
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        self.record(DriverCall::Rollback)
    }

    async fn prepare(&mut self, sql: &str) -> Result<StatementId, DriverError> {
        self.record(DriverCall::Prepare(sql.to_string()))?;
        let id = StatementId(self.next_statement);
        self.next_statement += 1;
        self.statements.insert(
            id,
            TestStatement {
                placeholders: sql.matches('?').count(),
                bound: false,
            },
        );
        Ok(id)
    }

    fn bind(&mut self, statement: StatementId, types: &str, values: &[Value]) -> Result<(), DriverError> {
        self.record(DriverCall::Bind {
            statement,
            types: types.to_string(),
            values: values.to_vec(),
        })?;
        let prepared = self.statement(statement)?;
        if types.chars().count() != values.len() {
            return Err(DriverError::new(
                CR_INVALID_PARAMETER_NO,
                "Number of elements in type definition string doesn't match number of bind variables",
            ));
        }
        if values.len() != prepared.placeholders {
            return Err(DriverError::new(
                CR_INVALID_PARAMETER_NO,
                "Number of variables doesn't match number of parameters in prepared statement",
            ));
        }
        prepared.bound = true;
        Ok(())
    }

    async fn execute(&mut self, statement: StatementId) -> Result<RawQueryResult, DriverError> {
        self.record(DriverCall::Execute(statement))?;
        let prepared = self.statement(statement)?;
        if prepared.placeholders > 0 && !prepared.bound {
            return Err(DriverError::new(
                CR_PARAMS_NOT_BOUND,
                "No data supplied for parameters in prepared statement",
            ));
        }

        // Return next queued response or default
        let response = self
            .responses
            .pop_front()
            .unwrap_or_else(|| self.default_response.clone());
        Ok(response)
    }

    fn release_statement(&mut self, statement: StatementId) {
        self.statements.remove(&statement);
    }
}

/// Builder for creating test responses easily.
pub struct InMemoryTestResponseBuilder {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    affected_rows: u64,
    last_insert_id: u64,
}

impl InMemoryTestResponseBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: 0,
            last_insert_id: 0,
        }
    }

    /// Set the column names for the response.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a row of text values.
    pub fn row(mut self, values: &[&str]) -> Self {
        self.rows.push(values.iter().map(|s| Value::from(*s)).collect());
        self
    }

    /// Add a row of arbitrary values.
    pub fn values(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    pub fn affected_rows(mut self, affected_rows: u64) -> Self {
        self.affected_rows = affected_rows;
        self
    }

    pub fn last_insert_id(mut self, last_insert_id: u64) -> Self {
        self.last_insert_id = last_insert_id;
        self
    }

    /// Build the RawQueryResult.
    pub fn build(self) -> RawQueryResult {
        RawQueryResult {
            columns: self.columns,
            rows: self.rows,
            affected_rows: self.affected_rows,
            last_insert_id: self.last_insert_id,
        }
    }
}

impl Default for InMemoryTestResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_calls_before_connect_fail() {
        let mut driver = InMemoryTestDriver::new();
        assert!(driver.prepare("SELECT 1").await.is_err());
        driver.assert_call_count(DriverOperation::Prepare, 1);
    }

    #[tokio::test]
    async fn test_bind_checks_placeholder_count() {
        let mut driver = InMemoryTestDriver::new();
        driver.connect(&ConnectOptions::new("h", "u", "p", "d")).await.unwrap();
        let stmt = driver.prepare("SELECT ?, ?").await.unwrap();

        let err = driver.bind(stmt, "i", &[Value::Int(1)]).unwrap_err();
        assert_eq!(err.code, CR_INVALID_PARAMETER_NO);

        let err = driver.execute(stmt).await.unwrap_err();
        assert_eq!(err.code, CR_PARAMS_NOT_BOUND);

        driver.bind(stmt, "is", &[Value::Int(1), Value::from("a")]).unwrap();
        assert!(driver.execute(stmt).await.is_ok());
    }

    #[tokio::test]
    async fn test_injected_failure_is_used_once() {
        let mut driver = InMemoryTestDriver::new()
            .with_failure(DriverOperation::Connect, DriverError::new(1045, "Access denied"));
        let options = ConnectOptions::new("h", "u", "p", "d");

        let err = driver.connect(&options).await.unwrap_err();
        assert_eq!(err.code, 1045);
        assert!(!driver.is_connected());

        driver.connect(&options).await.unwrap();
        assert!(driver.is_connected());
    }

    #[tokio::test]
    async fn test_responses_in_fifo_order_then_default() {
        let mut driver = InMemoryTestDriver::new()
            .with_responses([
                InMemoryTestResponseBuilder::new().columns(&["a"]).row(&["1"]).build(),
                InMemoryTestResponseBuilder::new().columns(&["b"]).build(),
            ])
            .with_default_response(InMemoryTestResponseBuilder::new().columns(&["z"]).build());
        driver.connect(&ConnectOptions::new("h", "u", "p", "d")).await.unwrap();
        let stmt = driver.prepare("SELECT 1").await.unwrap();

        assert_eq!(driver.execute(stmt).await.unwrap().columns, vec!["a"]);
        assert_eq!(driver.execute(stmt).await.unwrap().columns, vec!["b"]);
        assert_eq!(driver.execute(stmt).await.unwrap().columns, vec!["z"]);
    }
}
