//! Scalar values and type tags.
//!
//! - **Value**: a literal or field value, `Null` meaning absent
//! - **DataType**: the declared type of a field, with coercion rules
//! - **compare**: the value-class-aware comparator shared by evaluation,
//!   sorting and validation

pub mod compare;
pub mod data_type;
pub mod value;

pub use compare::{compare_values, like_matches, values_equal};
pub use data_type::DataType;
pub use value::Value;
