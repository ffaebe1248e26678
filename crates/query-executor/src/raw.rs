use crate::statement::MappedStatement;
use query_core::{BoundSql, Record, Result, RowBounds, Value};

/// Performs one physical query or update against the data source.
///
/// For callable statements the implementation writes OUT parameter values
/// back into the parameter object.
pub trait RawExecutor: Send {
    fn query(
        &mut self,
        ms: &MappedStatement,
        bound_sql: &BoundSql,
        parameter: &Value,
        row_bounds: RowBounds,
    ) -> Result<Vec<Record>>;

    /// Returns the affected row count
    fn update(&mut self, ms: &MappedStatement, bound_sql: &BoundSql, parameter: &Value)
        -> Result<u64>;

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) {}
}
