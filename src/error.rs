use thiserror::Error;

/// The error taxonomy from SPEC_FULL.md §7. Each variant maps to a single
/// propagation rule; see the `From<CoreError> for async_graphql::Error`
/// impl below for how resolvers surface it.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Invalid pagination combination, invalid cursor, invalid where shape,
    /// ordering violates policy, ID fails to decode, scalar fails to parse.
    #[error("bad input: {0}")]
    BadInput(String),

    /// A related table lacks a primary key, so cursoring/batching is
    /// impossible. Internal signal — never reaches the client; callers must
    /// catch this and fall back to an unbatched fetch.
    #[error("plan infeasible: {0}")]
    PlanInfeasible(String),

    /// The database reported MySQL error 1044/1142/1143.
    #[error("access denied")]
    AccessDenied,

    /// Any other SQL error, preserved as-is.
    #[error("executor failure: {0}")]
    ExecutorFailure(String),

    /// Selection references unknown column, planned table mismatch, missing
    /// field AST. These are bugs, surfaced with table/column context.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Translate a MySQL-compatible driver error number per SPEC_FULL.md §6.
    pub fn from_driver_error_code(code: u16, message: impl Into<String>) -> Self {
        match code {
            1044 | 1142 | 1143 => CoreError::AccessDenied,
            _ => CoreError::ExecutorFailure(message.into()),
        }
    }

    /// True for errors the batcher must treat as "not batchable, fall back
    /// to a per-parent query" rather than surfacing to the caller.
    pub fn is_plan_infeasible(&self) -> bool {
        matches!(self, CoreError::PlanInfeasible(_))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<CoreError> for async_graphql::Error {
    fn from(e: CoreError) -> Self {
        use async_graphql::ErrorExtensions;
        let code = match &e {
            CoreError::BadInput(_) => "BAD_INPUT",
            CoreError::PlanInfeasible(_) => "INTERNAL",
            CoreError::AccessDenied => "ACCESS_DENIED",
            CoreError::ExecutorFailure(_) => "EXECUTOR_FAILURE",
            CoreError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            CoreError::Serialization(_) => "SERIALIZATION",
        };
        async_graphql::Error::new(e.to_string()).extend_with(|_, ext| {
            ext.set("code", code);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_denied_codes_map_to_single_sentinel() {
        for code in [1044u16, 1142, 1143] {
            assert!(matches!(
                CoreError::from_driver_error_code(code, "x"),
                CoreError::AccessDenied
            ));
        }
    }

    #[test]
    fn other_codes_pass_through() {
        match CoreError::from_driver_error_code(1064, "syntax error") {
            CoreError::ExecutorFailure(msg) => assert_eq!(msg, "syntax error"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
