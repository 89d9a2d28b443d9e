//! K-induction over a monolithic transition relation.
//!
//! Window `k` asks two questions of the solver. The base case
//! `Init(0) ∧ T(0..k) ∧ ¬P(k)` finds counterexamples of length `k`; the
//! inductive step `P(0..k) ∧ T(0..k+1) ∧ ¬P(k+1)` proves the property once it
//! becomes unsatisfiable. The unrolled transitions live at the base level of
//! the solver and grow by one step per window; everything else is asserted
//! inside a scope that is popped after the query.

use std::time::Instant;

use argus_ir::unfold::unfold;
use argus_ir::{Expr, MonolithicExpr, Valuation, VarDecl, VarIndexing};
use argus_smt::{SatResult, SmtSolver, SolverSession};
use tracing::{info, warn};

use crate::cancel::{deadline_exceeded, deadline_from_secs, CancelToken};
use crate::config::KindConfig;
use crate::error::KindError;
use crate::result::{SafetyResult, Statistics, Trace};

/// Verdict of a k-induction run. A safe verdict carries the window at
/// which the property became inductive.
pub type KindResult = SafetyResult<usize, Valuation, Expr>;

pub struct KindChecker<S: SmtSolver> {
    model: MonolithicExpr,
    session: SolverSession<S>,
    config: KindConfig,
    cancel: CancelToken,
    stats: Statistics,
}

impl<S> KindChecker<S>
where
    S: SmtSolver,
    S::Error: 'static,
{
    pub fn new(model: MonolithicExpr, solver: S, config: KindConfig) -> Self {
        Self {
            model,
            session: SolverSession::new(solver),
            config,
            cancel: CancelToken::new(),
            stats: Statistics::default(),
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// Runs windows `0..bound`; the solver is reset first, so a checker can
    /// be run more than once.
    pub fn check(&mut self) -> Result<KindResult, KindError<S::Error>> {
        let start = Instant::now();
        let deadline = deadline_from_secs(self.config.timeout_secs);
        let bound = self.config.bound;
        self.session.reset()?;
        let vars = self.model.vars();
        for k in 0..bound {
            if self.cancel.is_cancelled() || deadline_exceeded(deadline) {
                info!(k, "k-induction: interrupted");
                return Ok(self.finish(start, KindResult::Unknown));
            }
            self.stats.kind_windows += 1;
            let frames: Vec<VarIndexing> = (0..=k).map(|i| self.model.step_indexing(i)).collect();

            info!(k, "k-induction: base check");
            let (result, states) = self.base_check(&frames, &vars)?;
            match result {
                SatResult::Unsat => {}
                SatResult::Sat => {
                    let Some(states) = states else {
                        warn!(k, "k-induction: satisfiable base case without a model");
                        return Ok(self.finish(start, KindResult::Unknown));
                    };
                    info!(k, "k-induction: counterexample");
                    let trace = Trace::new(states, vec![self.model.trans.clone(); k])?;
                    let stats = Some(self.finish_stats(start));
                    return Ok(SafetyResult::Unsafe {
                        trace,
                        witness: None,
                        stats,
                    });
                }
                SatResult::Unknown(reason) => {
                    warn!(k, %reason, "k-induction: base check inconclusive");
                    return Ok(self.finish(start, KindResult::Unknown));
                }
            }

            if self.config.induction {
                info!(k, "k-induction: step check");
                match self.step_check(&frames, &vars)? {
                    SatResult::Unsat => {
                        info!(k, "k-induction: property is inductive");
                        let stats = Some(self.finish_stats(start));
                        return Ok(SafetyResult::Safe {
                            witness: Some(k),
                            stats,
                        });
                    }
                    SatResult::Sat => {}
                    SatResult::Unknown(reason) => {
                        warn!(k, %reason, "k-induction: step check inconclusive");
                        return Ok(self.finish(start, KindResult::Unknown));
                    }
                }
            }

            let trans = unfold(&self.model.trans, &frames[k]);
            self.session.add(&trans)?;
        }
        warn!(bound, "k-induction: bound exhausted");
        self.finish_stats(start);
        Err(KindError::BoundExhausted { bound })
    }

    fn base_check(
        &mut self,
        frames: &[VarIndexing],
        vars: &[VarDecl],
    ) -> Result<(SatResult, Option<Vec<Valuation>>), KindError<S::Error>> {
        let init = unfold(&self.model.init, &frames[0]);
        let bad = unfold(&Expr::not(self.model.prop.clone()), &frames[frames.len() - 1]);
        self.session.scoped(|s| {
            s.add(&init)?;
            s.add(&bad)?;
            Ok(s.check_with_model(frames, vars)?)
        })
    }

    fn step_check(
        &mut self,
        frames: &[VarIndexing],
        vars: &[VarDecl],
    ) -> Result<SatResult, KindError<S::Error>> {
        let last = &frames[frames.len() - 1];
        let next = last.add(&self.model.offset);
        let mut assumptions: Vec<Expr> = frames.iter().map(|f| unfold(&self.model.prop, f)).collect();
        assumptions.push(unfold(&self.model.trans, last));
        assumptions.push(unfold(&Expr::not(self.model.prop.clone()), &next));
        if self.config.simple_path {
            let window: Vec<&VarIndexing> = frames.iter().chain(std::iter::once(&next)).collect();
            for (i, a) in window.iter().enumerate() {
                for b in &window[i + 1..] {
                    assumptions.push(distinct(vars, a, b));
                }
            }
        }
        self.session.scoped(|s| {
            s.add_all(&assumptions)?;
            Ok(s.check()?)
        })
    }

    fn finish_stats(&mut self, start: Instant) -> Statistics {
        let elapsed = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.stats.elapsed_ms = self.stats.elapsed_ms.saturating_add(elapsed);
        self.stats.solver_checks = self.session.checks();
        self.stats.clone()
    }

    fn finish(&mut self, start: Instant, result: KindResult) -> KindResult {
        self.finish_stats(start);
        result
    }
}

/// The two states differ in at least one variable.
fn distinct(vars: &[VarDecl], a: &VarIndexing, b: &VarIndexing) -> Expr {
    let diffs: Vec<Expr> = vars
        .iter()
        .filter(|v| a.get(v) != b.get(v))
        .map(|v| Expr::neq(Expr::indexed(v, a.get(v)), Expr::indexed(v, b.get(v))))
        .collect();
    if diffs.is_empty() {
        Expr::false_()
    } else {
        Expr::or(diffs)
    }
}
