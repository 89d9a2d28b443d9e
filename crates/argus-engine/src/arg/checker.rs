use std::time::Instant;

use argus_ir::stmt;
use argus_ir::unfold::unfold;
use argus_ir::{Edge, Expr, LocationId, TransitionSystem, VarIndexing};
use argus_smt::{SatResult, SmtSolver, SolverSession};
use tracing::{debug, info, warn};

use super::{Arg, ArgNode, NodeId, Waitlist};
use crate::analysis::{AbstractState, Analysis};
use crate::cancel::{deadline_exceeded, deadline_from_secs, CancelToken};
use crate::config::ArgConfig;
use crate::error::CheckError;
use crate::lattice::PartialOrder;
use crate::prec::LocalPrec;
use crate::result::{LocState, SafetyResult, Statistics, Trace};

/// Verdict of an abstract reachability run; a safe run carries the final graph.
pub type ArgResult<St> = SafetyResult<Arg<St>, LocState<St>, Edge>;

type ArgTrace<St> = Trace<LocState<St>, Edge>;

enum Stop<St> {
    Counterexample(ArgTrace<St>),
    Inconclusive,
}

enum TargetVerdict<St> {
    Feasible(ArgTrace<St>),
    Spurious,
    Inconclusive,
}

/// Builds an abstract reachability graph over a transition system.
///
/// A run can be resumed: after [`ArgChecker::refine`] the next call to
/// [`ArgChecker::check`] continues from the current frontier.
pub struct ArgChecker<'a, A: Analysis, S: SmtSolver> {
    system: &'a TransitionSystem,
    analysis: A,
    prec: LocalPrec<A::Prec>,
    session: SolverSession<S>,
    config: ArgConfig,
    arg: Arg<A::State>,
    waitlist: Waitlist,
    cancel: CancelToken,
    stats: Statistics,
    seeded: bool,
}

impl<'a, A, S> ArgChecker<'a, A, S>
where
    A: Analysis,
    S: SmtSolver,
    S::Error: 'static,
{
    pub fn new(
        system: &'a TransitionSystem,
        analysis: A,
        prec: LocalPrec<A::Prec>,
        solver: S,
        config: ArgConfig,
    ) -> Self {
        let waitlist = Waitlist::new(config.search, system.error_distances());
        Self {
            system,
            analysis,
            prec,
            session: SolverSession::new(solver),
            config,
            arg: Arg::new(),
            waitlist,
            cancel: CancelToken::new(),
            stats: Statistics::default(),
            seeded: false,
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn arg(&self) -> &Arg<A::State> {
        &self.arg
    }

    pub fn prec(&self) -> &LocalPrec<A::Prec> {
        &self.prec
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn in_frontier(&self, node: NodeId) -> bool {
        self.waitlist.contains(node)
    }

    pub fn frontier_len(&self) -> usize {
        self.waitlist.len()
    }

    /// Explores until the frontier is empty, a feasible target is found, or
    /// the run is interrupted.
    pub fn check(&mut self) -> Result<ArgResult<A::State>, CheckError<S::Error>> {
        let start = Instant::now();
        let deadline = deadline_from_secs(self.config.timeout_secs);
        info!(
            locations = self.system.locations.len(),
            edges = self.system.edges.len(),
            "abstract reachability: start"
        );
        if !self.seeded {
            self.system.validate()?;
            self.seeded = true;
            if let Some(stop) = self.seed()? {
                return Ok(self.finish(Some(stop), start));
            }
        }
        loop {
            if self.cancel.is_cancelled() || deadline_exceeded(deadline) {
                info!(nodes = self.arg.len(), "abstract reachability: interrupted");
                return Ok(self.finish(Some(Stop::Inconclusive), start));
            }
            let Some(id) = self.waitlist.pop() else {
                break;
            };
            let node = self
                .arg
                .node(id)
                .ok_or_else(|| Self::violation(id, "frontier node is not in the graph"))?;
            if !node.is_frontier() {
                continue;
            }
            if self.config.max_nodes.is_some_and(|max| self.arg.len() >= max) {
                warn!(nodes = self.arg.len(), "abstract reachability: node limit reached");
                self.waitlist.push(id, node.loc());
                return Ok(self.finish(Some(Stop::Inconclusive), start));
            }
            if self.try_cover(id)? {
                continue;
            }
            if let Some(stop) = self.expand(id)? {
                return Ok(self.finish(Some(stop), start));
            }
        }
        info!(
            nodes = self.arg.len(),
            covered = self.arg.covered().count(),
            "abstract reachability: safe"
        );
        Ok(self.finish(None, start))
    }

    /// Installs a new precision and drops every covering, since a coverer
    /// explored under the old precision no longer justifies skipping a node.
    /// Returns the nodes put back on the frontier.
    ///
    /// Existing nodes keep the states computed under the old precision; only
    /// successors expanded from now on see the new one. A released node whose
    /// state is still covered by an older node is simply covered again.
    pub fn refine(&mut self, prec: LocalPrec<A::Prec>) -> Vec<NodeId> {
        self.prec = prec;
        let released = self.arg.invalidate_coverings();
        for &id in &released {
            if let Some(node) = self.arg.node(id) {
                self.waitlist.push(id, node.loc());
            }
        }
        self.stats.coverings_invalidated += released.len();
        info!(released = released.len(), "precision refined");
        released
    }

    fn violation(node: NodeId, context: &str) -> CheckError<S::Error> {
        CheckError::InternalInvariantViolation {
            node,
            context: context.to_string(),
        }
    }

    fn finish(&mut self, stop: Option<Stop<A::State>>, start: Instant) -> ArgResult<A::State> {
        let elapsed = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.stats.elapsed_ms = self.stats.elapsed_ms.saturating_add(elapsed);
        self.stats.solver_checks = self.session.checks();
        match stop {
            None => SafetyResult::Safe {
                witness: Some(self.arg.clone()),
                stats: Some(self.stats.clone()),
            },
            Some(Stop::Counterexample(trace)) => SafetyResult::Unsafe {
                trace,
                witness: Some(self.arg.clone()),
                stats: Some(self.stats.clone()),
            },
            Some(Stop::Inconclusive) => SafetyResult::Unknown,
        }
    }

    fn is_target(&self, loc: LocationId, state: &A::State) -> bool {
        self.system.error_loc == Some(loc) || self.analysis.may_violate(state, &self.system.prop)
    }

    fn seed(&mut self) -> Result<Option<Stop<A::State>>, CheckError<S::Error>> {
        let loc = self.system.init_loc;
        let prec = self.prec.get(loc)?.clone();
        let states = self
            .analysis
            .init_states(&mut self.session, &self.system.init, &prec)?;
        debug!(count = states.len(), "initial abstract states");
        for state in states {
            if state.is_bottom() {
                continue;
            }
            let target = self.is_target(loc, &state);
            let id = self.arg.add_root(loc, state, target);
            if let Some(stop) = self.admit(id)? {
                return Ok(Some(stop));
            }
        }
        Ok(None)
    }

    /// Registers a fresh node: targets are checked for feasibility first,
    /// then the node joins the frontier.
    fn admit(&mut self, id: NodeId) -> Result<Option<Stop<A::State>>, CheckError<S::Error>> {
        self.stats.nodes_created += 1;
        let node = self
            .arg
            .node(id)
            .ok_or_else(|| Self::violation(id, "new node is not in the graph"))?;
        let (loc, target) = (node.loc(), node.is_target());
        if target {
            self.stats.target_candidates += 1;
            match self.check_target(id)? {
                TargetVerdict::Feasible(trace) => {
                    info!(node = %id, states = trace.len(), "abstract reachability: counterexample");
                    return Ok(Some(Stop::Counterexample(trace)));
                }
                TargetVerdict::Spurious => {
                    self.stats.spurious_targets += 1;
                    debug!(node = %id, "target is spurious");
                }
                TargetVerdict::Inconclusive => return Ok(Some(Stop::Inconclusive)),
            }
        }
        self.waitlist.push(id, loc);
        Ok(None)
    }

    fn try_cover(&mut self, id: NodeId) -> Result<bool, CheckError<S::Error>> {
        let Some(node) = self.arg.node(id) else {
            return Ok(false);
        };
        let candidates: Vec<NodeId> = self
            .arg
            .nodes_at(node.loc())
            .filter(|m| m.id() < id && !m.is_covered())
            .map(ArgNode::id)
            .collect();
        let ord = self.analysis.ord();
        for by in candidates {
            let subsumed = match (self.arg.node(id), self.arg.node(by)) {
                (Some(n), Some(m)) => ord.is_leq(n.state(), m.state()),
                _ => false,
            };
            if subsumed {
                self.arg.cover::<S::Error, _>(id, by, ord)?;
                self.stats.coverings_made += 1;
                debug!(node = %id, by = %by, "covered");
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn expand(&mut self, id: NodeId) -> Result<Option<Stop<A::State>>, CheckError<S::Error>> {
        let system = self.system;
        let (loc, state) = {
            let node = self
                .arg
                .node(id)
                .ok_or_else(|| Self::violation(id, "expanded node is not in the graph"))?;
            (node.loc(), node.state().clone())
        };
        self.arg.mark_expanded(id);
        self.stats.nodes_expanded += 1;
        for edge in system.outgoing(loc) {
            let prec = self.prec.get(edge.target)?.clone();
            for succ in self.analysis.successors(&state, edge, &prec) {
                let target = self.is_target(edge.target, &succ);
                let child = self
                    .arg
                    .add_child(id, edge.id, edge.target, succ, target)
                    .ok_or_else(|| Self::violation(id, "parent vanished during expansion"))?;
                if let Some(stop) = self.admit(child)? {
                    return Ok(Some(stop));
                }
            }
        }
        debug!(node = %id, loc, "expanded");
        Ok(None)
    }

    /// Decides whether the concrete path to a target node is executable.
    fn check_target(&mut self, id: NodeId) -> Result<TargetVerdict<A::State>, CheckError<S::Error>> {
        let system = self.system;
        let mut idx = VarIndexing::all(0);
        let mut formulas = vec![unfold(&system.init, &idx)];
        let mut frames = vec![idx.clone()];
        let mut locs = Vec::new();
        let mut edges = Vec::new();
        for nid in self.arg.path_to(id) {
            let node = self
                .arg
                .node(nid)
                .ok_or_else(|| Self::violation(nid, "path node is not in the graph"))?;
            locs.push(node.loc());
            if let Some((_, eid)) = node.parent() {
                let edge = system
                    .edge(eid)
                    .ok_or_else(|| Self::violation(nid, "incoming edge is not in the system"))?;
                let step = stmt::to_expr(&edge.stmts, &idx)?;
                formulas.extend(step.exprs);
                idx = step.indexing;
                frames.push(idx.clone());
                edges.push(edge.clone());
            }
        }
        if locs.last().copied() != system.error_loc {
            formulas.push(unfold(&Expr::not(system.prop.clone()), &idx));
        }
        let (result, valuations) = self.session.scoped(|s| {
            s.add_all(&formulas)?;
            s.check_with_model(&frames, &system.vars)
        })?;
        match result {
            SatResult::Unsat => Ok(TargetVerdict::Spurious),
            SatResult::Unknown(reason) => {
                warn!(node = %id, %reason, "target feasibility undecided");
                Ok(TargetVerdict::Inconclusive)
            }
            SatResult::Sat => {
                let valuations = valuations
                    .ok_or_else(|| Self::violation(id, "satisfiable path without a model"))?;
                let states = locs
                    .into_iter()
                    .zip(&valuations)
                    .map(|(loc, val)| LocState {
                        loc,
                        state: self.analysis.valuation_to_state(val),
                    })
                    .collect();
                Ok(TargetVerdict::Feasible(Trace::new(states, edges)?))
            }
        }
    }
}
