//! Intermediate representation for the argus model checker.
//!
//! This crate defines the typed expression catalog shared by every analysis,
//! concrete valuations, the variable indexing used to unroll transition
//! relations, primitive statements and the two views of a transition system:
//! a graph of locations with statement-labelled edges, and the monolithic
//! `init/trans/prop` triple consumed by bounded checking.

pub mod decl;
pub mod error;
pub mod eval;
pub mod expr;
pub mod indexing;
pub mod literal;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;
pub mod stmt;
pub mod system;
pub mod types;
pub mod unfold;
pub mod valuation;

pub use decl::{Decl, FuncDecl, VarDecl};
pub use error::IrError;
pub use expr::{BinaryOp, Expr, ExprKind, FpRoundedOp, NaryOp, Quantifier, UnaryOp};
pub use indexing::VarIndexing;
pub use literal::LitValue;
pub use stmt::{Stmt, StmtUnfoldResult};
pub use system::{Edge, EdgeId, Location, LocationId, MonolithicExpr, TransitionSystem};
pub use types::{RoundingMode, Type};
pub use valuation::Valuation;
