//! SMT-LIB2 process backend tests.
//!
//! These need a `cvc5` (or `z3`) binary on the PATH and are ignored by
//! default. Run with `cargo test -- --ignored` to include them.

use argus_ir::{BinaryOp, Expr, FpRoundedOp, LitValue, RoundingMode, Type, VarDecl, VarIndexing};
use argus_smt::backends::smtlib_backend::SmtlibSolver;
use argus_smt::{SatResult, SolverSession};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
#[ignore = "requires cvc5 on PATH"]
fn bitvector_rotation_round_trips() -> TestResult {
    let b = VarDecl::new("b", Type::bv(8));
    let mut s = SolverSession::new(SmtlibSolver::cvc5()?);
    let rotated = Expr::binary(BinaryOp::BvRotateLeft, Expr::indexed(&b, 0), Expr::lit(LitValue::bv(8, 1)));
    s.add(&Expr::eq(rotated, Expr::lit(LitValue::bv(8, 0b0000_0011))))?;
    let (result, states) = s.check_with_model(&[VarIndexing::all(0)], std::slice::from_ref(&b))?;
    assert_eq!(result, SatResult::Sat);
    let states = states.ok_or("expected a model")?;
    assert_eq!(states[0].get(&b), Some(&LitValue::bv(8, 0b1000_0001)));
    Ok(())
}

#[test]
#[ignore = "requires cvc5 on PATH"]
fn float_addition_respects_rounding() -> TestResult {
    let f = VarDecl::new("f", Type::float(8, 24));
    let mut s = SolverSession::new(SmtlibSolver::cvc5()?);
    let sum = Expr::fp_rounded(
        FpRoundedOp::Add,
        RoundingMode::NearestTiesToEven,
        vec![Expr::indexed(&f, 0), Expr::indexed(&f, 0)],
    );
    s.add(&Expr::lt(sum, Expr::indexed(&f, 0)))?;
    let (result, states) = s.check_with_model(&[VarIndexing::all(0)], std::slice::from_ref(&f))?;
    assert_eq!(result, SatResult::Sat);
    assert!(states.ok_or("expected a model")?[0].get(&f).is_some());
    Ok(())
}

#[test]
#[ignore = "requires z3 on PATH"]
fn quantified_formula_over_process_pipe() -> TestResult {
    let x = VarDecl::int("x");
    let y = VarDecl::int("y");
    let mut s = SolverSession::new(SmtlibSolver::z3()?);
    // Every y has a larger x: unsat for a fixed x.
    let body = Expr::gt(Expr::param(&y), Expr::indexed(&x, 0));
    s.add(&Expr::forall(vec![y], Expr::not(body)))?;
    assert_eq!(s.check()?, SatResult::Unsat);
    s.reset()?;
    s.add(&Expr::gt(Expr::indexed(&x, 0), Expr::int(3)))?;
    assert_eq!(s.check()?, SatResult::Sat);
    Ok(())
}
