use crate::Value;

use super::StorageError;

/// Executes a procedure call on behalf of a [`crate::CallableStatement`].
pub trait CallExecutor {
    /// Execute `sql` with one value per declared parameter. On success the engine returns the
    /// complete parameter data of the call response, i.e. the values of `OUT` and `INOUT`
    /// parameters are populated. The returned vector must have the same length as `parameters`.
    fn execute_call(&self, sql: &str, parameters: &[Value]) -> Result<Vec<Value>, StorageError>;
}
