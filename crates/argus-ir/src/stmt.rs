use std::fmt;

use crate::decl::VarDecl;
use crate::error::IrError;
use crate::expr::Expr;
use crate::indexing::VarIndexing;
use crate::types::Type;
use crate::unfold::{prime_by, unfold};

/// A primitive statement labelling a transition-system edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stmt {
    Assign { var: VarDecl, expr: Expr },
    Assume(Expr),
    Havoc(VarDecl),
}

impl Stmt {
    pub fn assign(var: &VarDecl, expr: Expr) -> Self {
        Stmt::Assign {
            var: var.clone(),
            expr,
        }
    }

    pub fn assume(cond: Expr) -> Self {
        Stmt::Assume(cond)
    }

    pub fn havoc(var: &VarDecl) -> Self {
        Stmt::Havoc(var.clone())
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Assign { var, expr } => write!(f, "{var} := {expr}"),
            Stmt::Assume(cond) => write!(f, "assume {cond}"),
            Stmt::Havoc(var) => write!(f, "havoc {var}"),
        }
    }
}

/// Formulas produced by a statement sequence together with the indexing
/// reached after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StmtUnfoldResult {
    pub exprs: Vec<Expr>,
    pub indexing: VarIndexing,
}

/// Primed form of a statement sequence.
///
/// Each assignment or havoc adds one prime to its variable; the returned
/// indexing counts how many primes every variable received, so the
/// sequence's post-state of `x` is `x` under `counts(x)` primes.
pub fn to_primed(stmts: &[Stmt]) -> Result<StmtUnfoldResult, IrError> {
    let mut counts = VarIndexing::all(0);
    let mut exprs = Vec::new();
    for stmt in stmts {
        match stmt {
            Stmt::Assign { var, expr } => {
                if expr.ty() != &var.ty {
                    return Err(IrError::AssignTypeMismatch {
                        var: var.name.to_string(),
                        expected: var.ty.clone(),
                        found: expr.ty().clone(),
                    });
                }
                let rhs = prime_by(expr, &counts);
                counts = counts.inc(var);
                let lhs = Expr::primed(Expr::var(var), counts.get(var));
                exprs.push(Expr::eq(lhs, rhs));
            }
            Stmt::Assume(cond) => {
                if cond.ty() != &Type::Bool {
                    return Err(IrError::NonBoolAssume {
                        expr: cond.to_string(),
                        found: cond.ty().clone(),
                    });
                }
                exprs.push(prime_by(cond, &counts));
            }
            Stmt::Havoc(var) => counts = counts.inc(var),
        }
    }
    Ok(StmtUnfoldResult {
        exprs,
        indexing: counts,
    })
}

/// Step-indexed formulas of a statement sequence executed from `indexing`.
pub fn to_expr(stmts: &[Stmt], indexing: &VarIndexing) -> Result<StmtUnfoldResult, IrError> {
    let primed = to_primed(stmts)?;
    Ok(StmtUnfoldResult {
        exprs: primed.exprs.iter().map(|e| unfold(e, indexing)).collect(),
        indexing: indexing.add(&primed.indexing),
    })
}
