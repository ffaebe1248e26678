pub mod binding;
pub mod error;
pub mod types;

pub use binding::{BoundSql, ParameterMapping, ParameterMode, RowBounds, StatementKind, StatementType};
pub use error::{QueryError, Result};
pub use types::*;
