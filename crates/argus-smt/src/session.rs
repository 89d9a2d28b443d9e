use std::collections::HashMap;

use argus_ir::{Expr, Valuation, VarDecl, VarIndexing};
use thiserror::Error;
use tracing::{debug, warn};

use crate::encoder::{decode, model_symbols, EncodeError, ExprEncoder, Symbol};
use crate::solver::{SatResult, SmtSolver};
use crate::sorts::SmtSort;

#[derive(Debug, Error)]
pub enum SessionError<E: std::error::Error + 'static> {
    #[error("solver error: {0}")]
    Solver(#[source] E),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// A solver paired with an expression encoder.
///
/// Symbols are declared lazily the first time an asserted expression needs
/// them. Declarations made inside a scope are forgotten when it is popped,
/// matching SMT-LIB `push`/`pop` semantics.
pub struct SolverSession<S: SmtSolver> {
    solver: S,
    encoder: ExprEncoder,
    declared: Vec<HashMap<String, Symbol>>,
    checks: usize,
}

impl<S> SolverSession<S>
where
    S: SmtSolver,
    S::Error: 'static,
{
    pub fn new(solver: S) -> Self {
        Self::with_encoder(solver, ExprEncoder::new())
    }

    pub fn with_encoder(solver: S, encoder: ExprEncoder) -> Self {
        Self {
            solver,
            encoder,
            declared: vec![HashMap::new()],
            checks: 0,
        }
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn encoder(&self) -> &ExprEncoder {
        &self.encoder
    }

    /// Number of satisfiability checks issued so far.
    pub fn checks(&self) -> usize {
        self.checks
    }

    /// Current push depth.
    pub fn depth(&self) -> usize {
        self.declared.len() - 1
    }

    fn is_declared(&self, name: &str) -> bool {
        self.declared.iter().any(|level| level.contains_key(name))
    }

    pub fn add(&mut self, expr: &Expr) -> Result<(), SessionError<S::Error>> {
        let term = self.encoder.encode(expr)?;
        for (name, symbol) in self.encoder.symbols_in(&term) {
            if self.is_declared(&name) {
                continue;
            }
            let declared = match &symbol {
                Symbol::Const(sort) => self.solver.declare_var(&name, sort),
                Symbol::Fun(params, ret) => self.solver.declare_fun(&name, params, ret),
            };
            declared.map_err(SessionError::Solver)?;
            if let Some(level) = self.declared.last_mut() {
                level.insert(name, symbol);
            }
        }
        self.solver.assert(&term).map_err(SessionError::Solver)
    }

    pub fn add_all<'a>(
        &mut self,
        exprs: impl IntoIterator<Item = &'a Expr>,
    ) -> Result<(), SessionError<S::Error>> {
        for expr in exprs {
            self.add(expr)?;
        }
        Ok(())
    }

    pub fn check(&mut self) -> Result<SatResult, SessionError<S::Error>> {
        self.checks += 1;
        let result = self.solver.check_sat().map_err(SessionError::Solver)?;
        if let SatResult::Unknown(reason) = &result {
            warn!(%reason, "solver returned unknown");
        }
        Ok(result)
    }

    /// Checks satisfiability and, if satisfiable, decodes one valuation of
    /// `vars` per entry of `frames`.
    ///
    /// Variables never mentioned by an assertion are unconstrained and left
    /// unbound in the decoded valuations.
    pub fn check_with_model(
        &mut self,
        frames: &[VarIndexing],
        vars: &[VarDecl],
    ) -> Result<(SatResult, Option<Vec<Valuation>>), SessionError<S::Error>> {
        self.checks += 1;
        let mut wanted: Vec<(String, SmtSort)> = Vec::new();
        for frame in frames {
            for (name, sort) in model_symbols(vars, frame) {
                if self.is_declared(&name) && !wanted.iter().any(|(n, _)| *n == name) {
                    wanted.push((name, sort));
                }
            }
        }
        let query: Vec<(&str, &SmtSort)> = wanted.iter().map(|(n, s)| (n.as_str(), s)).collect();
        let (result, model) = self
            .solver
            .check_sat_with_model(&query)
            .map_err(SessionError::Solver)?;
        if let SatResult::Unknown(reason) = &result {
            warn!(%reason, "solver returned unknown");
        }
        let states = model.map(|m| {
            frames
                .iter()
                .map(|frame| decode(&m, frame, vars))
                .collect()
        });
        Ok((result, states))
    }

    pub fn push(&mut self) -> Result<(), SessionError<S::Error>> {
        self.solver.push().map_err(SessionError::Solver)?;
        self.declared.push(HashMap::new());
        Ok(())
    }

    pub fn pop(&mut self) -> Result<(), SessionError<S::Error>> {
        if self.declared.len() <= 1 {
            return Err(EncodeError::InternalInvariantViolation {
                context: "pop without matching push".into(),
            }
            .into());
        }
        self.declared.pop();
        self.solver.pop().map_err(SessionError::Solver)
    }

    /// Runs `f` inside a fresh assertion scope that is popped on every exit path.
    pub fn scoped<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<SessionError<S::Error>>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        self.push()?;
        let result = f(self);
        let pop_result = self.pop();
        match (result, pop_result) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(err), Ok(())) => Err(err),
            (Ok(_), Err(pop_err)) => Err(pop_err.into()),
            (Err(err), Err(pop_err)) => {
                warn!(error = %pop_err, "failed to pop solver scope after an earlier error");
                Err(err)
            }
        }
    }

    /// Clears every assertion, declaration and cached translation.
    pub fn reset(&mut self) -> Result<(), SessionError<S::Error>> {
        debug!(checks = self.checks, "resetting solver session");
        self.solver.reset().map_err(SessionError::Solver)?;
        self.encoder.reset();
        self.declared = vec![HashMap::new()];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::tests::MockSolver;
    use crate::terms::SmtTerm;

    fn x() -> VarDecl {
        VarDecl::int("x")
    }

    #[test]
    fn declares_each_symbol_once_per_scope() {
        let mut session = SolverSession::new(MockSolver::new(SatResult::Sat));
        let e = Expr::gt(Expr::indexed(&x(), 0), Expr::int(0));
        session.add(&e).expect("mock accepts");
        session.add(&e).expect("mock accepts");
        assert_eq!(session.solver().declared.len(), 1);
        assert_eq!(session.solver().asserted.len(), 2);
        assert_eq!(
            session.solver().asserted[0],
            SmtTerm::var("x#0").gt(SmtTerm::int(0))
        );
    }

    #[test]
    fn declarations_inside_a_scope_are_repeated_after_pop() {
        let mut session = SolverSession::new(MockSolver::new(SatResult::Sat));
        let e = Expr::gt(Expr::var(&x()), Expr::int(0));
        let scoped: Result<(), SessionError<std::io::Error>> = session.scoped(|s| s.add(&e));
        scoped.expect("mock accepts");
        session.add(&e).expect("mock accepts");
        assert_eq!(session.solver().declared.len(), 2);
        assert_eq!(session.depth(), 0);
    }

    #[test]
    fn scoped_pops_after_failure() {
        let mut mock = MockSolver::new(SatResult::Sat);
        mock.fail_on_check = true;
        let mut session = SolverSession::new(mock);
        let res: Result<SatResult, SessionError<std::io::Error>> = session.scoped(|s| s.check());
        assert!(matches!(res, Err(SessionError::Solver(_))));
        assert_eq!(session.depth(), 0);
        assert_eq!(session.solver().depth, 0);
        assert_eq!(session.solver().max_depth, 1);
        assert_eq!(session.checks(), 1);
    }

    #[test]
    fn encode_errors_abort_before_asserting() {
        let mut session = SolverSession::new(MockSolver::new(SatResult::Sat));
        let err = session.add(&Expr::prime(Expr::var(&x())));
        assert!(matches!(err, Err(SessionError::Encode(_))));
        assert!(session.solver().asserted.is_empty());
    }

    #[test]
    fn unmatched_pop_is_rejected() {
        let mut session = SolverSession::new(MockSolver::new(SatResult::Sat));
        assert!(session.pop().is_err());
    }
}
