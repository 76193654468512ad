//! Schema model the query engine is checked against.
//!
//! - **FieldDefinition**: per-column type, bounds and code table
//! - **RecordDefinition**: ordered fields with derived geometry and id indexes
//! - **CodeTable**: identifier to display value lookup
//! - **Record**: values bound to a definition, for in-memory evaluation
//! - **SchemaConfig**: JSON description that builds a definition

pub mod code_table;
pub mod config;
pub mod field;
pub mod record;
pub mod record_definition;

pub use code_table::{CodeTable, MemoryCodeTable};
pub use config::{value_from_json, CodeConfig, CodeTableConfig, FieldConfig, SchemaConfig};
pub use field::FieldDefinition;
pub use record::Record;
pub use record_definition::RecordDefinition;
