mod parameter;
mod result;
mod row;
mod value;

pub use parameter::{ParamType, Parameter};
pub use result::{FetchMode, ResultHandle, ResultSet};
pub use row::{RawQueryResult, Row, RowKey};
pub use value::Value;
