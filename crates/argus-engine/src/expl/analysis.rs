use argus_ir::unfold::unfold;
use argus_ir::{
    BinaryOp, Decl, Edge, Expr, ExprKind, LitValue, NaryOp, Stmt, Valuation, VarIndexing,
};
use argus_smt::{SatResult, SessionError, SmtSolver, SolverSession};
use tracing::debug;

use super::{ExplLattice, ExplPrec, ExplState};
use crate::analysis::Analysis;
use crate::config::ExplConfig;

/// Explicit-value analysis: values of tracked variables are propagated
/// concretely, everything else is forgotten.
#[derive(Debug, Clone, Default)]
pub struct ExplAnalysis {
    config: ExplConfig,
}

impl ExplAnalysis {
    pub fn new(config: ExplConfig) -> Self {
        Self { config }
    }

    fn post(&self, val: &Valuation, edge: &Edge, prec: &ExplPrec) -> ExplState {
        let mut val = val.clone();
        for stmt in &edge.stmts {
            match stmt {
                Stmt::Assign { var, expr } => {
                    val = match expr.eval(&val) {
                        Some(value) if prec.tracks(var) => val.with(var.clone(), value),
                        _ => val.without(var),
                    };
                }
                Stmt::Havoc(var) => val = val.without(var),
                Stmt::Assume(cond) => match cond.eval(&val) {
                    Some(LitValue::Bool(false)) => return ExplState::Bottom,
                    Some(_) => {}
                    None => match strengthen(val, cond, prec) {
                        Some(next) => val = next,
                        None => return ExplState::Bottom,
                    },
                },
            }
        }
        ExplState::Val(val)
    }
}

/// Binds tracked variables fixed by `var = literal` conjuncts of `cond`.
/// Returns `None` when a conjunct contradicts a binding.
fn strengthen(val: Valuation, cond: &Expr, prec: &ExplPrec) -> Option<Valuation> {
    match cond.kind() {
        ExprKind::Nary(NaryOp::And, ops) => ops
            .iter()
            .try_fold(val, |acc, op| strengthen(acc, op, prec)),
        ExprKind::Binary(BinaryOp::Eq, lhs, rhs) => {
            let binding = match (lhs.kind(), rhs.kind()) {
                (ExprKind::Ref(Decl::Var(v)), ExprKind::Lit(lit))
                | (ExprKind::Lit(lit), ExprKind::Ref(Decl::Var(v))) => Some((v, lit)),
                _ => None,
            };
            match binding {
                Some((v, lit)) if prec.tracks(v) => match val.get(v) {
                    Some(bound) if bound != lit => None,
                    _ => Some(val.with(v.clone(), lit.clone())),
                },
                _ => Some(val),
            }
        }
        _ => Some(val),
    }
}

impl Analysis for ExplAnalysis {
    type State = ExplState;
    type Prec = ExplPrec;
    type Ord = ExplLattice;

    fn ord(&self) -> &ExplLattice {
        &ExplLattice::INSTANCE
    }

    /// Enumerates the assignments to tracked variables allowed by `init`.
    /// More than `max_init_enum` of them, or an inconclusive solver, yields
    /// the single top state.
    fn init_states<S>(
        &self,
        session: &mut SolverSession<S>,
        init: &Expr,
        prec: &ExplPrec,
    ) -> Result<Vec<ExplState>, SessionError<S::Error>>
    where
        S: SmtSolver,
        S::Error: 'static,
    {
        let step = VarIndexing::all(0);
        let tracked: Vec<_> = prec.vars().cloned().collect();
        let limit = self.config.max_init_enum;
        session.scoped(|s| {
            s.add(&unfold(init, &step))?;
            let mut states = Vec::new();
            loop {
                let (result, frames) = s.check_with_model(std::slice::from_ref(&step), &tracked)?;
                match result {
                    SatResult::Unsat => break,
                    SatResult::Unknown(_) => return Ok(vec![ExplState::top()]),
                    SatResult::Sat => {}
                }
                let val = frames.and_then(|mut f| f.pop()).unwrap_or_default();
                if states.len() >= limit {
                    debug!(limit, "too many initial states, falling back to top");
                    return Ok(vec![ExplState::top()]);
                }
                if val.is_empty() {
                    states.push(ExplState::top());
                    break;
                }
                s.add(&unfold(&Expr::not(val.to_expr()), &step))?;
                states.push(ExplState::Val(val));
            }
            Ok(states)
        })
    }

    fn successors(&self, state: &ExplState, edge: &Edge, prec: &ExplPrec) -> Vec<ExplState> {
        match state {
            ExplState::Bottom => Vec::new(),
            ExplState::Val(val) => match self.post(val, edge, prec) {
                ExplState::Bottom => Vec::new(),
                succ => vec![succ],
            },
        }
    }

    fn may_violate(&self, state: &ExplState, prop: &Expr) -> bool {
        match state {
            ExplState::Bottom => false,
            ExplState::Val(val) => prop.eval(val) != Some(LitValue::Bool(true)),
        }
    }

    fn valuation_to_state(&self, val: &Valuation) -> ExplState {
        ExplState::Val(val.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_ir::VarDecl;

    fn edge(stmts: Vec<Stmt>) -> Edge {
        Edge {
            id: 0,
            source: 0,
            target: 1,
            stmts,
        }
    }

    fn x() -> VarDecl {
        VarDecl::int("x")
    }

    fn y() -> VarDecl {
        VarDecl::int("y")
    }

    fn state(pairs: &[(VarDecl, i64)]) -> ExplState {
        ExplState::Val(
            pairs
                .iter()
                .map(|(d, v)| (d.clone(), LitValue::Int(*v)))
                .collect(),
        )
    }

    #[test]
    fn assignment_binds_only_tracked_vars() {
        let a = ExplAnalysis::default();
        let e = edge(vec![
            Stmt::assign(&x(), Expr::int(1)),
            Stmt::assign(&y(), Expr::int(2)),
        ]);
        let succ = a.successors(&ExplState::top(), &e, &ExplPrec::new([x()]));
        assert_eq!(succ, vec![state(&[(x(), 1)])]);
    }

    #[test]
    fn unknown_rhs_and_havoc_forget_the_value() {
        let a = ExplAnalysis::default();
        let prec = ExplPrec::new([x(), y()]);
        let start = state(&[(x(), 1)]);
        let assign = edge(vec![Stmt::assign(&x(), Expr::var(&y()))]);
        assert_eq!(a.successors(&start, &assign, &prec), vec![ExplState::top()]);
        let havoc = edge(vec![Stmt::havoc(&x())]);
        assert_eq!(a.successors(&start, &havoc, &prec), vec![ExplState::top()]);
    }

    #[test]
    fn false_assumption_has_no_successor() {
        let a = ExplAnalysis::default();
        let prec = ExplPrec::new([x()]);
        let e = edge(vec![Stmt::assume(Expr::gt(Expr::var(&x()), Expr::int(5)))]);
        assert!(a.successors(&state(&[(x(), 1)]), &e, &prec).is_empty());
    }

    #[test]
    fn equality_assumption_strengthens() {
        let a = ExplAnalysis::default();
        let prec = ExplPrec::new([x()]);
        let e = edge(vec![Stmt::assume(Expr::and(vec![
            Expr::eq(Expr::var(&x()), Expr::int(4)),
            Expr::gt(Expr::var(&y()), Expr::int(0)),
        ]))]);
        assert_eq!(
            a.successors(&ExplState::top(), &e, &prec),
            vec![state(&[(x(), 4)])]
        );
    }

    #[test]
    fn violation_is_possible_unless_the_property_evaluates_true() {
        let a = ExplAnalysis::default();
        let prop = Expr::lt(Expr::var(&x()), Expr::int(3));
        assert!(!a.may_violate(&state(&[(x(), 1)]), &prop));
        assert!(a.may_violate(&state(&[(x(), 3)]), &prop));
        assert!(a.may_violate(&ExplState::top(), &prop));
        assert!(!a.may_violate(&ExplState::Bottom, &prop));
    }
}
