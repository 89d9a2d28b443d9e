use argus_ir::{IrError, LocationId};
use argus_smt::{EncodeError, SessionError};
use thiserror::Error;

use crate::arg::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrecError {
    #[error("no precision for location {loc} and no default")]
    NotFound { loc: LocationId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    #[error("a trace needs at least one state")]
    Empty,
    #[error("a trace with {states} states needs {expected} actions, found {actions}")]
    Shape {
        states: usize,
        expected: usize,
        actions: usize,
    },
}

/// Failure of an abstract reachability run.
#[derive(Debug, Error)]
pub enum CheckError<E: std::error::Error + 'static> {
    #[error("solver error: {0}")]
    Solver(#[source] E),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Prec(#[from] PrecError),
    #[error(transparent)]
    Ir(#[from] IrError),
    #[error(transparent)]
    Trace(#[from] TraceError),
    /// The graph is unsound; the run cannot continue.
    #[error("internal invariant violated at {node}: {context}")]
    InternalInvariantViolation { node: NodeId, context: String },
}

impl<E: std::error::Error + 'static> From<SessionError<E>> for CheckError<E> {
    fn from(err: SessionError<E>) -> Self {
        match err {
            SessionError::Solver(e) => CheckError::Solver(e),
            SessionError::Encode(e) => CheckError::Encode(e),
        }
    }
}

/// Failure of a k-induction run.
#[derive(Debug, Error)]
pub enum KindError<E: std::error::Error + 'static> {
    /// Every window up to the bound left both checks open.
    #[error("bound {bound} exhausted without a verdict")]
    BoundExhausted { bound: usize },
    #[error("solver error: {0}")]
    Solver(#[source] E),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Trace(#[from] TraceError),
}

impl<E: std::error::Error + 'static> From<SessionError<E>> for KindError<E> {
    fn from(err: SessionError<E>) -> Self {
        match err {
            SessionError::Solver(e) => KindError::Solver(e),
            SessionError::Encode(e) => KindError::Encode(e),
        }
    }
}
