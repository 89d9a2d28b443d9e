//! Abstract reachability over small control-flow systems with the
//! explicit-value domain and native Z3.

use argus_engine::expl::{ExplAnalysis, ExplPrec, ExplState};
use argus_engine::{
    ArgChecker, ArgConfig, CancelToken, CheckError, ExplConfig, LocalPrec, PrecError, SearchStrategy,
};
use argus_ir::{Expr, IrError, LitValue, Stmt, TransitionSystem, VarDecl};
use argus_smt::backends::z3_backend::Z3Solver;
use tracing_subscriber::EnvFilter;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Set `RUST_LOG=argus_engine=debug` to follow a run.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn x() -> VarDecl {
    VarDecl::int("x")
}

fn y() -> VarDecl {
    VarDecl::int("y")
}

fn tracking(vars: &[VarDecl]) -> LocalPrec<ExplPrec> {
    LocalPrec::with_default(ExplPrec::new(vars.iter().cloned()))
}

fn checker<'a>(
    ts: &'a TransitionSystem,
    prec: LocalPrec<ExplPrec>,
    config: ArgConfig,
) -> ArgChecker<'a, ExplAnalysis, Z3Solver> {
    ArgChecker::new(ts, ExplAnalysis::new(ExplConfig::default()), prec, Z3Solver::new(), config)
}

/// Two edges into the same location: one forgets `x`, one sets it to 1.
fn fork() -> Result<TransitionSystem, argus_ir::IrError> {
    let mut ts = TransitionSystem::new(vec![x()]);
    let l1 = ts.add_location("l1");
    ts.add_edge(0, l1, vec![Stmt::havoc(&x())])?;
    ts.add_edge(0, l1, vec![Stmt::assign(&x(), Expr::int(1))])?;
    Ok(ts)
}

/// `x := 0` then `x := x + 1` forever.
fn counter(prop: Expr) -> Result<TransitionSystem, argus_ir::IrError> {
    let mut ts = TransitionSystem::new(vec![x()]);
    ts.init = Expr::eq(Expr::var(&x()), Expr::int(0));
    ts.prop = prop;
    ts.add_edge(0, 0, vec![Stmt::assign(&x(), Expr::add(vec![Expr::var(&x()), Expr::int(1)]))])?;
    Ok(ts)
}

fn int_state(pairs: &[(VarDecl, i64)]) -> ExplState {
    ExplState::Val(pairs.iter().map(|(d, v)| (d.clone(), LitValue::Int(*v))).collect())
}

#[test]
fn later_subsumed_node_is_covered_and_not_expanded() -> TestResult {
    init_tracing();
    let ts = fork()?;
    let mut checker = checker(&ts, tracking(&[x()]), ArgConfig::default());
    let result = checker.check()?;
    assert!(result.is_safe());

    let arg = checker.arg();
    let at_l1: Vec<_> = arg.nodes_at(1).collect();
    assert_eq!(at_l1.len(), 2);
    let (havocked, assigned) = (at_l1[0], at_l1[1]);
    assert_eq!(havocked.state(), &ExplState::top());
    assert_eq!(assigned.state(), &int_state(&[(x(), 1)]));
    assert_eq!(assigned.covered_by(), Some(havocked.id()));
    assert!(!assigned.is_expanded());
    assert!(havocked.is_expanded());
    assert_eq!(arg.check_soundness(&argus_engine::expl::ExplLattice::INSTANCE), Ok(()));
    assert_eq!(checker.stats().coverings_made, 1);
    Ok(())
}

#[test]
fn refinement_returns_covered_nodes_to_the_frontier() -> TestResult {
    let ts = fork()?;
    let mut checker = checker(&ts, tracking(&[x()]), ArgConfig::default());
    checker.check()?;
    let covered: Vec<_> = checker.arg().covered().map(|n| n.id()).collect();
    assert_eq!(covered.len(), 1);

    let refined = checker.prec().refine(1, ExplPrec::new([x(), y()]));
    let released = checker.refine(refined);
    assert_eq!(released, covered);
    assert!(checker.in_frontier(covered[0]));
    assert!(checker.arg().covered().next().is_none());
    assert_eq!(checker.stats().coverings_invalidated, 1);

    let result = checker.check()?;
    assert!(result.is_safe());
    assert_eq!(checker.frontier_len(), 0);
    Ok(())
}

#[test]
fn reachable_error_location_yields_a_concrete_trace() -> TestResult {
    init_tracing();
    let mut ts = TransitionSystem::new(vec![x()]);
    ts.init = Expr::eq(Expr::var(&x()), Expr::int(0));
    let l1 = ts.add_location("l1");
    let err = ts.add_location("err");
    ts.error_loc = Some(err);
    ts.add_edge(0, l1, vec![Stmt::assign(&x(), Expr::int(1))])?;
    ts.add_edge(l1, err, vec![Stmt::assume(Expr::gt(Expr::var(&x()), Expr::int(0)))])?;

    let mut checker = checker(&ts, tracking(&[x()]), ArgConfig::default());
    let result = checker.check()?;
    let trace = result.trace().ok_or("expected a counterexample")?;
    let locs: Vec<_> = trace.states().iter().map(|s| s.loc).collect();
    assert_eq!(locs, vec![0, l1, err]);
    assert_eq!(trace.states()[0].state, int_state(&[(x(), 0)]));
    assert_eq!(trace.states()[2].state, int_state(&[(x(), 1)]));
    assert_eq!(trace.actions().len(), 2);
    assert!(result.to_string().starts_with("RESULT: UNSAFE"));
    Ok(())
}

#[test]
fn infeasible_target_is_spurious_and_the_run_stays_safe() -> TestResult {
    let mut ts = TransitionSystem::new(vec![x()]);
    let l1 = ts.add_location("l1");
    let err = ts.add_location("err");
    ts.error_loc = Some(err);
    ts.add_edge(0, l1, vec![Stmt::assign(&x(), Expr::int(0))])?;
    ts.add_edge(l1, err, vec![Stmt::assume(Expr::gt(Expr::var(&x()), Expr::int(0)))])?;

    // Nothing tracked, so the abstraction cannot rule out the error edge.
    let mut checker = checker(&ts, tracking(&[]), ArgConfig::default());
    let result = checker.check()?;
    assert!(result.is_safe());
    let stats = result.stats().ok_or("safe runs carry statistics")?;
    assert_eq!(stats.target_candidates, 1);
    assert_eq!(stats.spurious_targets, 1);
    assert!(stats.solver_checks >= 1);
    Ok(())
}

#[test]
fn property_violation_is_found_under_every_strategy() -> TestResult {
    let ts = counter(Expr::lt(Expr::var(&x()), Expr::int(3)))?;
    for search in [SearchStrategy::Bfs, SearchStrategy::Dfs, SearchStrategy::ErrorDistance] {
        let config = ArgConfig {
            search,
            ..ArgConfig::default()
        };
        let mut checker = checker(&ts, tracking(&[x()]), config);
        let result = checker.check()?;
        let trace = result.trace().ok_or("expected a counterexample")?;
        let last = trace.states().last().ok_or("traces are never empty")?;
        assert_eq!(trace.len(), 4, "{search:?}");
        assert_eq!(last.state, int_state(&[(x(), 3)]));
    }
    Ok(())
}

#[test]
fn node_limit_and_cancellation_are_inconclusive() -> TestResult {
    let ts = counter(Expr::true_())?;
    let config = ArgConfig {
        max_nodes: Some(5),
        ..ArgConfig::default()
    };
    let mut limited = checker(&ts, tracking(&[x()]), config);
    assert!(limited.check()?.is_unknown());
    assert_eq!(limited.arg().len(), 5);

    let token = CancelToken::new();
    token.cancel();
    let mut cancelled = checker(&ts, tracking(&[x()]), ArgConfig::default()).with_cancel_token(token);
    assert!(cancelled.check()?.is_unknown());
    Ok(())
}

#[test]
fn exploration_is_deterministic() -> TestResult {
    let ts = fork()?;
    let render = |search: SearchStrategy| -> Result<String, Box<dyn std::error::Error>> {
        let config = ArgConfig {
            search,
            ..ArgConfig::default()
        };
        let mut checker = checker(&ts, tracking(&[x()]), config);
        checker.check()?;
        Ok(checker.arg().to_dot())
    };
    assert_eq!(render(SearchStrategy::Dfs)?, render(SearchStrategy::Dfs)?);
    assert_eq!(render(SearchStrategy::Bfs)?, render(SearchStrategy::Bfs)?);
    Ok(())
}

#[test]
fn missing_precision_is_reported() -> TestResult {
    let ts = fork()?;
    let mut checker = checker(&ts, LocalPrec::new(None), ArgConfig::default());
    assert!(matches!(
        checker.check(),
        Err(CheckError::Prec(PrecError::NotFound { loc: 0 }))
    ));
    Ok(())
}

#[test]
fn refining_to_the_same_precision_covers_the_released_node_again() -> TestResult {
    let ts = fork()?;
    let mut checker = checker(&ts, tracking(&[x()]), ArgConfig::default());
    checker.check()?;
    let before = checker.arg().len();

    let same = checker.prec().clone();
    let released = checker.refine(same);
    assert_eq!(released.len(), 1);
    assert!(checker.check()?.is_safe());

    // The released node keeps its old state and is covered rather than expanded.
    let node = checker.arg().node(released[0]).ok_or("released nodes stay in the graph")?;
    assert!(node.is_covered());
    assert!(!node.is_expanded());
    assert_eq!(checker.arg().len(), before);
    assert_eq!(checker.stats().coverings_made, 2);
    Ok(())
}

#[test]
fn dangling_error_location_is_rejected_up_front() -> TestResult {
    let mut ts = fork()?;
    ts.error_loc = Some(42);
    assert_eq!(ts.error_distances(), vec![None, None]);
    let config = ArgConfig {
        search: SearchStrategy::ErrorDistance,
        ..ArgConfig::default()
    };
    let mut checker = checker(&ts, tracking(&[x()]), config);
    assert!(matches!(
        checker.check(),
        Err(CheckError::Ir(IrError::UnknownLocation(42)))
    ));
    assert_eq!(checker.arg().len(), 0);
    Ok(())
}
