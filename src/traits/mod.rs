mod database;
mod driver;

pub use database::Database;
pub use driver::{MysqlDriver, SessionInfo, StatementId};
