use std::collections::HashMap;

use async_trait::async_trait;
use mysql_async::consts::ColumnType;
use mysql_async::prelude::Queryable;
use mysql_async::{Column, Conn, OptsBuilder, Params, Statement};

use crate::config::ConnectOptions;
use crate::error::{
    DriverError, CR_CONNECTION_ERROR, CR_INVALID_PARAMETER_NO, CR_PARAMS_NOT_BOUND,
    CR_SERVER_GONE_ERROR, CR_UNKNOWN_ERROR, CR_UNSUPPORTED_PARAM_TYPE,
};
use crate::traits::{MysqlDriver, SessionInfo, StatementId};
use crate::types::{ParamType, RawQueryResult, Value};

const CLIENT_INFO: &str = "mysql_async";
const PROTOCOL_VERSION: &str = "10";
/// Character set number of the `binary` charset.
const BINARY_CHARSET: u16 = 63;

struct PreparedStatement {
    statement: Statement,
    params: Params,
}

/// MySQL driver implementation using mysql_async.
#[derive(Default)]
pub struct MysqlAsyncDriver {
    conn: Option<Conn>,
    statements: HashMap<StatementId, PreparedStatement>,
}

impl MysqlAsyncDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn conn(&mut self) -> Result<&mut Conn, DriverError> {
        self.conn.as_mut().ok_or_else(DriverError::gone_away)
    }

    async fn run(&mut self, sql: &'static str) -> Result<(), DriverError> {
        self.conn()?.query_drop(sql).await.map_err(DriverError::from)
    }
}

#[async_trait]
impl MysqlDriver for MysqlAsyncDriver {
    async fn connect(&mut self, options: &ConnectOptions) -> Result<SessionInfo, DriverError> {
        if let Some(previous) = self.conn.take() {
            if let Err(e) = previous.disconnect().await {
                tracing::warn!("failed to close previous MySQL session: {}", e);
            }
        }
        self.statements.clear();

        let opts = OptsBuilder::default()
            .ip_or_hostname(options.host.clone())
            .tcp_port(options.port_or_default())
            .user(Some(options.user.clone()))
            .pass(Some(options.password.clone()))
            .db_name((!options.dbname.is_empty()).then(|| options.dbname.clone()));

        let conn = Conn::new(opts).await.map_err(connect_error)?;

        let (major, minor, patch) = conn.server_version();
        let session = SessionInfo {
            client_info: CLIENT_INFO.to_string(),
            host_info: format!("{} via TCP/IP", options.host),
            proto_info: PROTOCOL_VERSION.to_string(),
            server_info: format!("{}.{}.{}", major, minor, patch),
        };

        self.conn = Some(conn);
        Ok(session)
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.statements.clear();
        let conn = self.conn.take().ok_or_else(DriverError::gone_away)?;
        conn.disconnect().await.map_err(DriverError::from)
    }

    async fn ping(&mut self) -> Result<(), DriverError> {
        self.conn()?.ping().await.map_err(DriverError::from)
    }

    async fn autocommit(&mut self, mode: bool) -> Result<(), DriverError> {
        self.run(if mode { "SET autocommit = 1" } else { "SET autocommit = 0" }).await
    }

    async fn begin_transaction(&mut self) -> Result<(), DriverError> {
        self.run("START TRANSACTION").await
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        self.run("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        self.run("ROLLBACK").await
    }

    async fn prepare(&mut self, sql: &str) -> Result<StatementId, DriverError> {
        let statement = self.conn()?.prep(sql).await.map_err(DriverError::from)?;
        let id = StatementId(statement.id());
        self.statements.insert(
            id,
            PreparedStatement {
                statement,
                params: Params::Empty,
            },
        );
        Ok(id)
    }

    fn bind(&mut self, statement: StatementId, types: &str, values: &[Value]) -> Result<(), DriverError> {
        let prepared = self
            .statements
            .get_mut(&statement)
            .ok_or_else(|| unknown_statement(statement))?;

        if types.chars().count() != values.len() {
            return Err(DriverError::new(
                CR_INVALID_PARAMETER_NO,
                "Number of elements in type definition string doesn't match number of bind variables",
            ));
        }
        if values.len() != usize::from(prepared.statement.num_params()) {
            return Err(DriverError::new(
                CR_INVALID_PARAMETER_NO,
                "Number of variables doesn't match number of parameters in prepared statement",
            ));
        }

        let bound = types
            .chars()
            .zip(values)
            .map(|(code, value)| {
                let param_type = ParamType::from_code(code)
                    .map_err(|e| DriverError::new(CR_UNSUPPORTED_PARAM_TYPE, e.to_string()))?;
                Ok(to_mysql_value(param_type.coerce(value)))
            })
            .collect::<Result<Vec<_>, DriverError>>()?;

        prepared.params = Params::Positional(bound);
        Ok(())
    }

    async fn execute(&mut self, statement: StatementId) -> Result<RawQueryResult, DriverError> {
        let conn = self.conn.as_mut().ok_or_else(DriverError::gone_away)?;
        let prepared = self
            .statements
            .get(&statement)
            .ok_or_else(|| unknown_statement(statement))?;

        if prepared.statement.num_params() > 0 && matches!(prepared.params, Params::Empty) {
            return Err(DriverError::new(
                CR_PARAMS_NOT_BOUND,
                "No data supplied for parameters in prepared statement",
            ));
        }

        let (columns, rows) = {
            let mut result = conn
                .exec_iter(&prepared.statement, prepared.params.clone())
                .await
                .map_err(DriverError::from)?;
            let columns: Vec<Column> = result.columns().map(|c| c.to_vec()).unwrap_or_default();
            let rows: Vec<mysql_async::Row> = result.collect().await.map_err(DriverError::from)?;
            (columns, rows)
        };

        let rows = rows
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| {
                        let value = row.as_ref(i).cloned().unwrap_or(mysql_async::Value::NULL);
                        from_mysql_value(value, columns.get(i))
                    })
                    .collect()
            })
            .collect();

        Ok(RawQueryResult {
            columns: columns.iter().map(|c| c.name_str().into_owned()).collect(),
            rows,
            affected_rows: conn.affected_rows(),
            last_insert_id: conn.last_insert_id().unwrap_or(0),
        })
    }

    fn release_statement(&mut self, statement: StatementId) {
        self.statements.remove(&statement);
    }
}

impl From<mysql_async::Error> for DriverError {
    fn from(err: mysql_async::Error) -> Self {
        let translated = match &err {
            mysql_async::Error::Server(server) => {
                DriverError::new(server.code, server.message.clone()).with_sqlstate(server.state.clone())
            }
            mysql_async::Error::Io(io) => DriverError::new(CR_SERVER_GONE_ERROR, io.to_string()),
            other => DriverError::new(CR_UNKNOWN_ERROR, other.to_string()),
        };
        translated.with_source(err)
    }
}

/// Like the `From` conversion, but I/O failures while dialing are connection errors.
fn connect_error(err: mysql_async::Error) -> DriverError {
    if let mysql_async::Error::Io(io) = &err {
        let message = format!("Can't connect to MySQL server: {}", io);
        return DriverError::new(CR_CONNECTION_ERROR, message).with_source(err);
    }
    DriverError::from(err)
}

fn unknown_statement(statement: StatementId) -> DriverError {
    DriverError::new(
        CR_UNKNOWN_ERROR,
        format!("Unknown prepared statement handler ({})", statement.0),
    )
}

fn to_mysql_value(value: Value) -> mysql_async::Value {
    match value {
        Value::Null => mysql_async::Value::NULL,
        Value::Int(i) => mysql_async::Value::Int(i),
        Value::Double(d) => mysql_async::Value::Double(d),
        Value::Text(s) => mysql_async::Value::Bytes(s.into_bytes()),
        Value::Bytes(b) => mysql_async::Value::Bytes(b),
    }
}

/// Convert a binary-protocol cell, using the column definition to tell
/// text from binary data and dates from datetimes.
fn from_mysql_value(value: mysql_async::Value, column: Option<&Column>) -> Value {
    match value {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Int(i) => Value::Int(i),
        mysql_async::Value::UInt(u) => match i64::try_from(u) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Text(u.to_string()),
        },
        mysql_async::Value::Float(f) => Value::Double(f64::from(f)),
        mysql_async::Value::Double(d) => Value::Double(d),
        mysql_async::Value::Bytes(bytes) => {
            let binary = column.is_some_and(|c| c.character_set() == BINARY_CHARSET);
            if binary {
                return Value::Bytes(bytes);
            }
            match String::from_utf8(bytes) {
                Ok(text) => Value::Text(text),
                Err(e) => Value::Bytes(e.into_bytes()),
            }
        }
        mysql_async::Value::Date(year, month, day, hour, minute, second, micros) => {
            let date_only = column.is_some_and(|c| {
                matches!(c.column_type(), ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE)
            });
            Value::Text(format_date(year, month, day, hour, minute, second, micros, date_only))
        }
        mysql_async::Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            let hours = days * 24 + u32::from(hours);
            let mut text = format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds);
            if micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            Value::Text(text)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn format_date(
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    micros: u32,
    date_only: bool,
) -> String {
    let date = format!("{:04}-{:02}-{:02}", year, month, day);
    if date_only {
        return date;
    }
    let mut text = format!("{} {:02}:{:02}:{:02}", date, hour, minute, second);
    if micros > 0 {
        text.push_str(&format!(".{:06}", micros));
    }
    text
}
