//! Ranking-expression trees: rendering, parsing and scalar evaluation.

mod error;
mod function;
mod node;
mod parse;
mod query;

pub use error::{Error, Result};
pub use function::{Function, FunctionBody, inline_functions};
pub use node::{ExpressionNode, MathFunction, Operator, Reference};
pub use parse::parse;
pub use query::query_feature_argument;
