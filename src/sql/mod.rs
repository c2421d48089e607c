//! Statement safety and execution.

pub mod gateway;
pub mod sqlite;
pub mod validator;

pub use gateway::{ExecutionGateway, ExecutionResult, QueryRows, SqlConnection};
pub use sqlite::SqliteDatabase;
pub use validator::{is_safe_select, StatementValidator, StatementVerdict};
