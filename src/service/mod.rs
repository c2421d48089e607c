//! Entry points a transport layer calls into.

pub mod sql;
pub mod text;

pub use sql::{GeneratedSql, SqlService};
pub use text::TextService;
