pub mod error;
pub mod expression;
pub mod geometry;
pub mod query;
pub mod schema;
pub mod sql;
pub mod store;
pub mod types;

pub use error::{ExpressionError, ExpressionResult};
pub use expression::{FilterBuilder, QueryValue, QueryValueRef};
pub use query::{LockMode, Query};
pub use schema::{FieldDefinition, Record, RecordDefinition};
pub use sql::parse_where;
pub use store::{MemoryRecordStore, RecordStore, SqlStatement};
pub use types::{DataType, Value};
