//! SMT encoding and solver integration for the argus model checker.
//!
//! This crate provides a portable term catalog, the solver capability trait
//! with scoped push/pop, a native Z3 backend for the integer fragment and an
//! SMT-LIB2 process backend for the full catalog, and the bridge that encodes
//! IR expressions into solver terms and decodes models back into valuations.

pub mod backends;
pub mod encoder;
pub mod session;
pub mod solver;
pub mod sorts;
pub mod terms;

pub use encoder::{EncodeError, ExprEncoder, CACHE_SIZE};
pub use session::{SessionError, SolverSession};
pub use solver::{Model, ModelValue, SatResult, SmtSolver};
