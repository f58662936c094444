mod in_memory_test;
mod mysql_async;

pub use self::in_memory_test::{
    DriverCall, DriverOperation, InMemoryTestDriver, InMemoryTestResponseBuilder,
};
pub use self::mysql_async::MysqlAsyncDriver;
