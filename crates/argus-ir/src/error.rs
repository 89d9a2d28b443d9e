use thiserror::Error;

use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("cannot assign a value of type {found} to `{var}` of type {expected}")]
    AssignTypeMismatch {
        var: String,
        expected: Type,
        found: Type,
    },
    #[error("assumption `{expr}` has type {found}, expected Bool")]
    NonBoolAssume { expr: String, found: Type },
    #[error("unknown location {0}")]
    UnknownLocation(usize),
}
