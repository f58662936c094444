//! myrs - a thin, typed facade over a native MySQL client
//!
//! Application code talks to the [`Database`] trait. [`MysqlDatabase`] is the
//! live implementation (mysql_async underneath); [`StubDatabase`] returns
//! canned data for unit tests.
//!
//! # Example
//! ```ignore
//! use myrs::{ConnectOptions, Database, MysqlDatabase, Parameter};
//!
//! let mut db = MysqlDatabase::new();
//! db.connect(ConnectOptions::new("localhost", "app", "secret", "shop")).await?;
//!
//! // Repeating the same SQL text with new parameters re-uses the prepared statement
//! for name in ["Alice", "Bob"] {
//!     let result = db
//!         .query("INSERT INTO users (name) VALUES (?)", &[Parameter::string(name)])
//!         .await?;
//!     db.free_result(result)?;
//! }
//!
//! let result = db.query("SELECT id, name FROM users", &[]).await?;
//! while let Some(row) = db.fetch_assoc(result)? {
//!     println!("{:?} {:?}", row.get("id"), row.get("name"));
//! }
//! db.free_result(result)?;
//! ```

pub mod config;
pub mod drivers;
pub mod error;
pub mod escape;
pub mod traits;
pub mod types;

mod client;
mod stub;

// Re-export main types for convenient access
pub use client::MysqlDatabase;
pub use config::ConnectOptions;
pub use error::{DriverError, MyRsError, Result};
pub use stub::StubDatabase;
pub use traits::{Database, MysqlDriver, SessionInfo, StatementId};
pub use types::{FetchMode, ParamType, Parameter, RawQueryResult, ResultHandle, Row, RowKey, Value};
