//! Query expressions and conditions.
//!
//! This module provides:
//! - The shared, immutable query value tree
//! - Parameterized and inline SQL rendering
//! - Evaluation against in-memory records
//! - Bounding box extraction for spatial filters

pub mod bbox;
pub mod builder;
pub mod eval;
pub mod node;
pub mod operator;
pub mod render;

pub use builder::FilterBuilder;
pub use eval::{expression_to_predicate, ExpressionEvaluator, Predicate};
pub use node::{and, or, Column, Literal, QueryValue, QueryValueRef};
pub use operator::{ArithmeticOperator, ComparisonOperator, Function};
pub use render::{quote_name, ParameterSink};
