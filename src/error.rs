use std::sync::Arc;

use thiserror::Error;

/// Client error code for failures the driver cannot classify.
pub const CR_UNKNOWN_ERROR: u16 = 2000;
/// Client error code for a connection that could not be established.
pub const CR_CONNECTION_ERROR: u16 = 2002;
/// Client error code for a call made on a lost or closed connection.
pub const CR_SERVER_GONE_ERROR: u16 = 2006;
/// Client error code for a statement executed without its parameters bound.
pub const CR_PARAMS_NOT_BOUND: u16 = 2031;
/// Client error code for a bind whose value count does not match.
pub const CR_INVALID_PARAMETER_NO: u16 = 2034;
/// Client error code for a bind type the driver does not know.
pub const CR_UNSUPPORTED_PARAM_TYPE: u16 = 2036;

/// Error reported by the native driver, before translation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DriverError {
    pub code: u16,
    pub message: String,
    pub sqlstate: Option<String>,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl DriverError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            sqlstate: None,
            source: None,
        }
    }

    pub fn with_sqlstate(mut self, sqlstate: impl Into<String>) -> Self {
        self.sqlstate = Some(sqlstate.into());
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub(crate) fn gone_away() -> Self {
        Self::new(CR_SERVER_GONE_ERROR, "MySQL server has gone away")
    }
}

/// Error type for myrs operations
#[derive(Debug, Error)]
pub enum MyRsError {
    #[error("this database object is not connected yet, use connect() first")]
    NotConnected,

    #[error("no prepared statement to execute, use query() first")]
    NoPreparedStatement,

    #[error("{message}")]
    Database {
        code: u16,
        message: String,
        #[source]
        source: DriverError,
    },

    #[error("type must be i, s, d or b. '{0}' given")]
    InvalidParameterType(String),

    #[error("unknown result handle: {0}")]
    InvalidResultHandle(u64),

    #[error("unable to fetch row {0}")]
    RowNotFound(u64),

    #[error("field '{0}' does not exist")]
    ColumnNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl MyRsError {
    /// True for programmer errors: using the client before `connect()` or
    /// calling `execute()` with nothing prepared.
    pub fn is_precondition(&self) -> bool {
        matches!(self, MyRsError::NotConnected | MyRsError::NoPreparedStatement)
    }

    /// The driver's error code, for database errors.
    pub fn code(&self) -> Option<u16> {
        match self {
            MyRsError::Database { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<DriverError> for MyRsError {
    fn from(err: DriverError) -> Self {
        MyRsError::Database {
            code: err.code,
            message: err.message.clone(),
            source: err,
        }
    }
}

/// Result type alias for myrs operations
pub type Result<T> = std::result::Result<T, MyRsError>;
