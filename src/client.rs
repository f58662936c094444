use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::config::ConnectOptions;
use crate::drivers::MysqlAsyncDriver;
use crate::error::{DriverError, MyRsError, Result};
use crate::escape::{escape_string, quote_identifier};
use crate::traits::{Database, MysqlDriver, SessionInfo, StatementId};
use crate::types::{FetchMode, Parameter, RawQueryResult, ResultHandle, ResultSet, Row, Value};

/// The statement most recently prepared on the driver.
#[derive(Debug, Clone)]
struct PreparedQuery {
    id: StatementId,
    sql: String,
}

/// MySQL client implementing [`Database`] on top of a native driver.
///
/// Besides forwarding to the driver it keeps:
/// - the time spent in driver calls and the number of queries run,
/// - the last prepared statement, so a parameterized query repeated with the
///   same SQL text is re-executed without being prepared again,
/// - the buffered results, until they are released with `free_result`.
///
/// # Example
/// ```ignore
/// use myrs::{ConnectOptions, Database, MysqlDatabase, Parameter};
///
/// let mut db = MysqlDatabase::new();
/// db.connect(ConnectOptions::new("localhost", "app", "secret", "shop")).await?;
///
/// let result = db
///     .query("SELECT id, name FROM users WHERE name = ?", &[Parameter::string("John")])
///     .await?;
/// while let Some(row) = db.fetch_assoc(result)? {
///     println!("{:?}", row.get("id"));
/// }
/// db.free_result(result)?;
/// ```
pub struct MysqlDatabase<D = MysqlAsyncDriver> {
    driver: D,
    connected: bool,
    options: Option<ConnectOptions>,
    session: Option<SessionInfo>,
    statement: Option<PreparedQuery>,
    last_query: Option<String>,
    last_result: Option<ResultHandle>,
    results: HashMap<ResultHandle, ResultSet>,
    no_rows: ResultSet,
    next_result: u64,
    affected_rows: u64,
    insert_id: u64,
    last_error: Option<DriverError>,
    db_time: Duration,
    total_queries: u64,
}

impl MysqlDatabase<MysqlAsyncDriver> {
    /// Create an unconnected client backed by mysql_async.
    pub fn new() -> Self {
        Self::with_driver(MysqlAsyncDriver::new())
    }
}

impl Default for MysqlDatabase<MysqlAsyncDriver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: MysqlDriver> MysqlDatabase<D> {
    /// Create an unconnected client with a custom driver.
    /// Useful for testing or using alternative native drivers.
    pub fn with_driver(driver: D) -> Self {
        Self {
            driver,
            connected: false,
            options: None,
            session: None,
            statement: None,
            last_query: None,
            last_result: None,
            results: HashMap::new(),
            no_rows: ResultSet::from_raw(RawQueryResult::empty()),
            next_result: 1,
            affected_rows: 0,
            insert_id: 0,
            last_error: None,
            db_time: Duration::ZERO,
            total_queries: 0,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Options of the last successful `connect`.
    pub fn connect_options(&self) -> Option<&ConnectOptions> {
        self.options.as_ref()
    }

    /// Cumulative wall-clock time spent in driver calls.
    pub fn db_time(&self) -> Duration {
        self.db_time
    }

    /// Number of queries run through `query`.
    pub fn total_queries(&self) -> u64 {
        self.total_queries
    }

    /// SQL text of the last successful query, the key of the statement cache.
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// Handle of the last result produced by `query` or `execute`, until it is freed.
    pub fn last_result(&self) -> Option<ResultHandle> {
        self.last_result
    }

    /// Number of buffered results not yet released with `free_result`.
    pub fn open_results(&self) -> usize {
        self.results.len()
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(MyRsError::NotConnected)
        }
    }

    fn record_error(&mut self, err: &DriverError) {
        tracing::warn!(code = err.code, "MySQL driver error: {}", err.message);
        self.last_error = Some(err.clone());
    }

    /// The single boundary where driver errors become `MyRsError`.
    fn translate<T>(&mut self, outcome: std::result::Result<T, DriverError>) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.last_error = None;
                Ok(value)
            }
            Err(err) => {
                self.record_error(&err);
                Err(err.into())
            }
        }
    }

    /// Translate a failed query, adding the SQL and the bound parameters to the message.
    fn query_failure(&mut self, err: DriverError, sql: &str, params: &[Parameter]) -> MyRsError {
        self.record_error(&err);

        let mut message = format!("error in mysql query: {}\n\tquery: {}", err.message, sql);
        if !params.is_empty() {
            message.push_str("\n\tparameters given:");
            for param in params {
                message.push_str(&format!(
                    "\n\t - {}: '{}'",
                    param.type_code(),
                    param.clipped_value()
                ));
            }
            message.push_str("\n\t");
        }

        MyRsError::Database {
            code: err.code,
            message,
            source: err,
        }
    }

    /// Forget the cached statement so the next query prepares again.
    fn invalidate_statement(&mut self) {
        if let Some(prepared) = self.statement.take() {
            self.driver.release_statement(prepared.id);
        }
        self.last_query = None;
    }

    /// Buffer the rows of a statement. Statements without a result set share
    /// `ResultHandle::EMPTY` and keep nothing in memory.
    fn store_result(&mut self, raw: RawQueryResult) -> ResultHandle {
        self.affected_rows = raw.affected_rows;
        self.insert_id = raw.last_insert_id;
        let handle = if raw.columns.is_empty() {
            ResultHandle::EMPTY
        } else {
            let handle = ResultHandle(self.next_result);
            self.next_result += 1;
            self.results.insert(handle, ResultSet::from_raw(raw));
            handle
        };
        self.last_result = Some(handle);
        handle
    }

    fn release_result(&mut self, handle: ResultHandle) -> bool {
        if self.last_result == Some(handle) {
            self.last_result = None;
        }
        handle == ResultHandle::EMPTY || self.results.remove(&handle).is_some()
    }

    /// Results belong to the session they were read in.
    fn drop_results(&mut self) {
        self.results.clear();
        self.last_result = None;
    }

    fn result_set(&mut self, handle: ResultHandle) -> Result<&mut ResultSet> {
        if handle == ResultHandle::EMPTY {
            return Ok(&mut self.no_rows);
        }
        self.results
            .get_mut(&handle)
            .ok_or(MyRsError::InvalidResultHandle(handle.0))
    }

    fn session(&self) -> Result<SessionInfo> {
        self.ensure_connected()?;
        Ok(self.session.clone().unwrap_or_default())
    }

    /// Account for a timed driver call without a result.
    fn finish(&mut self, started: Instant, outcome: std::result::Result<(), DriverError>) -> Result<bool> {
        self.db_time += started.elapsed();
        self.translate(outcome)?;
        Ok(true)
    }

    /// Bind (when there are parameters) and execute a prepared statement.
    async fn run_statement(
        &mut self,
        statement: StatementId,
        params: &[Parameter],
    ) -> std::result::Result<RawQueryResult, DriverError> {
        if !params.is_empty() {
            let types: String = params.iter().map(Parameter::type_code).collect();
            let values: Vec<Value> = params.iter().map(|p| p.value().clone()).collect();
            self.driver.bind(statement, &types, &values)?;
        }
        self.driver.execute(statement).await
    }

    async fn prepare_and_run(
        &mut self,
        sql: &str,
        params: &[Parameter],
    ) -> std::result::Result<RawQueryResult, DriverError> {
        self.invalidate_statement();
        let id = self.driver.prepare(sql).await?;
        self.statement = Some(PreparedQuery {
            id,
            sql: sql.to_string(),
        });
        self.run_statement(id, params).await
    }

    async fn run_query(&mut self, sql: &str, params: &[Parameter]) -> Result<ResultHandle> {
        self.ensure_connected()?;
        let started = Instant::now();

        let cached = match &self.statement {
            Some(prepared) if !params.is_empty() && self.last_query.as_deref() == Some(sql) => {
                Some(prepared.id)
            }
            _ => None,
        };

        let outcome = match cached {
            Some(id) => self.run_statement(id, params).await,
            None => self.prepare_and_run(sql, params).await,
        };
        let elapsed = started.elapsed();
        self.db_time += elapsed;

        let raw = match outcome {
            Ok(raw) => raw,
            Err(err) => {
                self.last_query = None;
                return Err(self.query_failure(err, sql, params));
            }
        };
        self.last_error = None;

        self.total_queries += 1;
        self.last_query = Some(sql.to_string());
        tracing::debug!(
            params = params.len(),
            cached = cached.is_some(),
            elapsed_us = elapsed.as_micros() as u64,
            "query: {}",
            sql
        );
        Ok(self.store_result(raw))
    }

    async fn run_execute(&mut self, params: &[Parameter]) -> Result<ResultHandle> {
        self.ensure_connected()?;
        let prepared = self.statement.clone().ok_or(MyRsError::NoPreparedStatement)?;

        let started = Instant::now();
        let outcome = self.run_statement(prepared.id, params).await;
        self.db_time += started.elapsed();

        match outcome {
            Ok(raw) => {
                self.last_error = None;
                Ok(self.store_result(raw))
            }
            Err(err) => Err(self.query_failure(err, &prepared.sql, params)),
        }
    }

    async fn open(&mut self, options: ConnectOptions) -> Result<bool> {
        self.invalidate_statement();
        self.drop_results();
        self.connected = false;
        self.session = None;

        let outcome = self.driver.connect(&options).await;
        let session = self.translate(outcome)?;
        self.connected = true;
        self.session = Some(session);

        let set_names = options.set_names_statement();
        tracing::info!(
            host = %options.host,
            port = options.port_or_default(),
            database = %options.dbname,
            "connected to MySQL"
        );
        self.options = Some(options);

        let handle = self.run_query(&set_names, &[]).await?;
        self.release_result(handle);
        Ok(true)
    }

    async fn table_status_size(&mut self, dbname: Option<&str>) -> Result<u64> {
        self.ensure_connected()?;
        let dbname = match dbname {
            Some(name) => name.to_string(),
            None => self
                .options
                .as_ref()
                .map(|o| o.dbname.clone())
                .filter(|name| !name.is_empty())
                .ok_or_else(|| MyRsError::Configuration("no database name is set".to_string()))?,
        };

        let sql = format!("SHOW TABLE STATUS FROM {}", quote_identifier(&dbname));
        let handle = self.run_query(&sql, &[]).await?;

        let mut size = 0u64;
        while let Some(row) = self.result_set(handle)?.fetch(FetchMode::Assoc) {
            for column in ["Data_length", "Index_length"] {
                let bytes = row.get(column).and_then(Value::to_i64).unwrap_or(0);
                size += u64::try_from(bytes).unwrap_or(0);
            }
        }
        self.release_result(handle);
        Ok(size)
    }
}

#[async_trait]
impl<D: MysqlDriver> Database for MysqlDatabase<D> {
    async fn connect(&mut self, options: ConnectOptions) -> Result<bool> {
        self.open(options).await
    }

    async fn reconnect(&mut self) -> Result<bool> {
        let options = self.options.clone().ok_or(MyRsError::NotConnected)?;
        self.open(options).await
    }

    async fn close(&mut self) -> Result<bool> {
        self.ensure_connected()?;
        self.invalidate_statement();
        self.drop_results();
        let outcome = self.driver.close().await;
        self.connected = false;
        self.session = None;
        self.translate(outcome)?;
        if let Some(options) = &self.options {
            tracing::info!(host = %options.host, database = %options.dbname, "closed MySQL connection");
        }
        Ok(true)
    }

    async fn autocommit(&mut self, mode: bool) -> Result<bool> {
        self.ensure_connected()?;
        let started = Instant::now();
        let outcome = self.driver.autocommit(mode).await;
        self.finish(started, outcome)
    }

    async fn begin_transaction(&mut self) -> Result<bool> {
        self.ensure_connected()?;
        let started = Instant::now();
        let outcome = self.driver.begin_transaction().await;
        self.finish(started, outcome)
    }

    async fn commit(&mut self) -> Result<bool> {
        self.ensure_connected()?;
        let started = Instant::now();
        let outcome = self.driver.commit().await;
        self.finish(started, outcome)
    }

    async fn rollback(&mut self) -> Result<bool> {
        self.ensure_connected()?;
        let started = Instant::now();
        let outcome = self.driver.rollback().await;
        self.finish(started, outcome)
    }

    async fn query(&mut self, sql: &str, params: &[Parameter]) -> Result<ResultHandle> {
        self.run_query(sql, params).await
    }

    async fn execute(&mut self, params: &[Parameter]) -> Result<ResultHandle> {
        self.run_execute(params).await
    }

    async fn ping(&mut self) -> Result<bool> {
        self.ensure_connected()?;
        let started = Instant::now();
        let outcome = self.driver.ping().await;
        self.finish(started, outcome)
    }

    fn num_rows(&self, result: ResultHandle) -> Result<u64> {
        self.ensure_connected()?;
        if result == ResultHandle::EMPTY {
            return Ok(0);
        }
        self.results
            .get(&result)
            .map(ResultSet::num_rows)
            .ok_or(MyRsError::InvalidResultHandle(result.0))
    }

    fn result(&mut self, result: ResultHandle, row: u64, field: &str) -> Result<Value> {
        self.ensure_connected()?;
        let set = self.result_set(result)?;
        if !set.seek(row) {
            return Err(MyRsError::RowNotFound(row));
        }
        let data = set.fetch(FetchMode::Assoc).ok_or(MyRsError::RowNotFound(row))?;
        data.get(field)
            .cloned()
            .ok_or_else(|| MyRsError::ColumnNotFound(field.to_string()))
    }

    fn free_result(&mut self, result: ResultHandle) -> Result<()> {
        self.ensure_connected()?;
        if self.release_result(result) {
            Ok(())
        } else {
            Err(MyRsError::InvalidResultHandle(result.0))
        }
    }

    fn fetch_array(&mut self, result: ResultHandle, mode: FetchMode) -> Result<Option<Row>> {
        self.ensure_connected()?;
        Ok(self.result_set(result)?.fetch(mode))
    }

    fn fetch_assoc(&mut self, result: ResultHandle) -> Result<Option<Row>> {
        self.fetch_array(result, FetchMode::Assoc)
    }

    fn fetch_row(&mut self, result: ResultHandle) -> Result<Option<Row>> {
        self.fetch_array(result, FetchMode::Num)
    }

    fn fetch_all(&mut self, result: ResultHandle, mode: FetchMode) -> Result<Vec<Row>> {
        self.ensure_connected()?;
        Ok(self.result_set(result)?.fetch_all(mode))
    }

    fn insert_id(&self) -> Result<u64> {
        self.ensure_connected()?;
        Ok(self.insert_id)
    }

    fn data_seek(&mut self, result: ResultHandle, row: u64) -> Result<bool> {
        self.ensure_connected()?;
        Ok(self.result_set(result)?.seek(row))
    }

    fn affected_rows(&self) -> Result<u64> {
        self.ensure_connected()?;
        Ok(self.affected_rows)
    }

    fn esc(&self, value: &str) -> Result<String> {
        self.ensure_connected()?;
        Ok(escape_string(value))
    }

    fn client_info(&self) -> Result<String> {
        Ok(self.session()?.client_info)
    }

    fn host_info(&self) -> Result<String> {
        Ok(self.session()?.host_info)
    }

    fn proto_info(&self) -> Result<String> {
        Ok(self.session()?.proto_info)
    }

    fn server_info(&self) -> Result<String> {
        Ok(self.session()?.server_info)
    }

    async fn size(&mut self, dbname: Option<&str>) -> Result<u64> {
        self.table_status_size(dbname).await
    }

    fn errno(&self) -> u16 {
        self.last_error.as_ref().map_or(0, |e| e.code)
    }

    fn errstr(&self) -> String {
        self.last_error
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_default()
    }
}
