use std::collections::HashMap;

use num::rational::Rational64;
use num::{BigUint, ToPrimitive};
use thiserror::Error;
use z3::ast::{self, Ast, Bool, Dynamic, Float, Int, Real, BV};
use z3::{FuncDecl, Sort};

use crate::backends::sexp::{parse_sexp, parse_value};
use crate::backends::smtlib_printer::op_to_smtlib;
use crate::solver::{Model, ModelValue, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::{SmtOp, SmtRoundingMode, SmtTerm};

#[derive(Debug, Error)]
pub enum Z3Error {
    #[error("z3: {0}")]
    Internal(String),
    #[error("undeclared symbol {0}")]
    UnknownVariable(String),
    #[error("symbol {0} already declared with another sort")]
    SortMismatch(String),
    #[error("ill-sorted term: expected {expected}, found {found}")]
    IllSorted { expected: String, found: String },
    #[error("not supported by the native Z3 backend: {0}")]
    Unsupported(String),
}

/// Quantifier-bound constants in scope, innermost last.
type Bindings = Vec<(String, Dynamic)>;

struct Function {
    params: Vec<SmtSort>,
    ret: SmtSort,
    decl: FuncDecl,
}

/// In-process Z3.
///
/// Covers integers, reals, bitvectors, arrays, uninterpreted functions and
/// quantifiers. Float literals are limited to the single and double
/// precision formats, and conversions from bitvectors to floats are rejected
/// with [`Z3Error::Unsupported`]; the SMT-LIB2 process backend takes those.
pub struct Z3Solver {
    solver: z3::Solver,
    consts: HashMap<String, (SmtSort, Dynamic)>,
    funs: HashMap<String, Function>,
    /// Kept so the timeout can be restored after `reset`.
    params: Option<z3::Params>,
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new()
    }
}

fn native_sort(sort: &SmtSort) -> Result<Sort, Z3Error> {
    Ok(match sort {
        SmtSort::Bool => Sort::bool(),
        SmtSort::Int => Sort::int(),
        SmtSort::Real => Sort::real(),
        SmtSort::BitVec(width) => Sort::bitvector(*width),
        SmtSort::Float(exp, sig) => Sort::float(*exp, *sig),
        SmtSort::Array(index, elem) => Sort::array(&native_sort(index)?, &native_sort(elem)?),
        SmtSort::RoundingMode => {
            return Err(Z3Error::Unsupported("symbols of sort RoundingMode".into()))
        }
    })
}

fn ill_sorted(expected: impl Into<String>, found: &Dynamic) -> Z3Error {
    Z3Error::IllSorted {
        expected: expected.into(),
        found: found.get_sort().to_string(),
    }
}

fn expect<T>(
    value: Dynamic,
    expected: &'static str,
    cast: impl Fn(&Dynamic) -> Option<T>,
) -> Result<T, Z3Error> {
    cast(&value).ok_or_else(|| ill_sorted(expected, &value))
}

fn same_sort(lhs: &Dynamic, rhs: &Dynamic) -> Result<(), Z3Error> {
    if lhs.get_sort() == rhs.get_sort() {
        Ok(())
    } else {
        Err(ill_sorted(lhs.get_sort().to_string(), rhs))
    }
}

fn same_width(lhs: &BV, rhs: &BV) -> Result<(), Z3Error> {
    if lhs.get_size() == rhs.get_size() {
        Ok(())
    } else {
        Err(Z3Error::IllSorted {
            expected: format!("(_ BitVec {})", lhs.get_size()),
            found: format!("(_ BitVec {})", rhs.get_size()),
        })
    }
}

fn rounding_mode(rm: SmtRoundingMode) -> ast::RoundingMode {
    match rm {
        SmtRoundingMode::Rne => ast::RoundingMode::round_nearest_ties_to_even(),
        SmtRoundingMode::Rna => ast::RoundingMode::round_nearest_ties_to_away(),
        SmtRoundingMode::Rtp => ast::RoundingMode::round_towards_positive(),
        SmtRoundingMode::Rtn => ast::RoundingMode::round_towards_negative(),
        SmtRoundingMode::Rtz => ast::RoundingMode::round_towards_zero(),
    }
}

/// Rounding modes only ever appear as literals in encoded terms.
fn rounding(term: &SmtTerm) -> Result<ast::RoundingMode, Z3Error> {
    match term {
        SmtTerm::RoundingMode(rm) => Ok(rounding_mode(*rm)),
        other => Err(Z3Error::Unsupported(format!("rounding mode operand {other:?}"))),
    }
}

fn float_lit(exp: u32, sig: u32, bits: &BigUint) -> Result<Float, Z3Error> {
    let unsupported =
        || Z3Error::Unsupported(format!("float literal of sort (_ FloatingPoint {exp} {sig})"));
    match (exp, sig) {
        (8, 24) => bits
            .to_u32()
            .map(|b| Float::from_f32(f32::from_bits(b)))
            .ok_or_else(unsupported),
        (11, 53) => bits
            .to_u64()
            .map(|b| Float::from_f64(f64::from_bits(b)))
            .ok_or_else(unsupported),
        _ => Err(unsupported()),
    }
}

fn read_value(model: &z3::Model, constant: &Dynamic, sort: &SmtSort) -> Option<ModelValue> {
    let value = model.eval(constant, true)?;
    let printed = || parse_value(&parse_sexp(&value.to_string()).ok()?, sort);
    match sort {
        SmtSort::Int => value.as_int()?.as_i64().map(ModelValue::Int),
        SmtSort::Bool => value.as_bool()?.as_bool().map(ModelValue::Bool),
        SmtSort::Real => match value.as_real()?.as_rational() {
            Some((n, d)) if d != 0 => Some(ModelValue::Real(Rational64::new(n, d))),
            _ => printed(),
        },
        SmtSort::BitVec(width) if *width <= 64 => match value.as_bv()?.as_u64() {
            Some(v) => Some(ModelValue::BitVec {
                width: *width,
                value: BigUint::from(v),
            }),
            None => printed(),
        },
        SmtSort::BitVec(_) | SmtSort::Float(..) => printed(),
        SmtSort::Array(..) | SmtSort::RoundingMode => None,
    }
}

impl Z3Solver {
    pub fn new() -> Self {
        Self {
            solver: z3::Solver::new(),
            consts: HashMap::new(),
            funs: HashMap::new(),
            params: None,
        }
    }

    /// A zero timeout means none.
    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        let mut this = Self::new();
        if timeout_secs > 0 {
            let mut params = z3::Params::new();
            let timeout_ms = u32::try_from(timeout_secs.saturating_mul(1000)).unwrap_or(u32::MAX);
            params.set_u32("timeout", timeout_ms);
            this.solver.set_params(&params);
            this.params = Some(params);
        }
        this
    }

    fn lookup(&self, name: &str, bound: &Bindings) -> Result<Dynamic, Z3Error> {
        bound
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.clone())
            .or_else(|| self.consts.get(name).map(|(_, c)| c.clone()))
            .ok_or_else(|| Z3Error::UnknownVariable(name.to_string()))
    }

    fn bool(&self, term: &SmtTerm, bound: &mut Bindings) -> Result<Bool, Z3Error> {
        expect(self.native(term, bound)?, "Bool", Dynamic::as_bool)
    }

    fn bools(&self, terms: &[SmtTerm], bound: &mut Bindings) -> Result<Vec<Bool>, Z3Error> {
        terms.iter().map(|t| self.bool(t, bound)).collect()
    }

    fn int(&self, term: &SmtTerm, bound: &mut Bindings) -> Result<Int, Z3Error> {
        expect(self.native(term, bound)?, "Int", Dynamic::as_int)
    }

    fn real(&self, term: &SmtTerm, bound: &mut Bindings) -> Result<Real, Z3Error> {
        expect(self.native(term, bound)?, "Real", Dynamic::as_real)
    }

    fn bv(&self, term: &SmtTerm, bound: &mut Bindings) -> Result<BV, Z3Error> {
        expect(self.native(term, bound)?, "a bitvector", Dynamic::as_bv)
    }

    fn float(&self, term: &SmtTerm, bound: &mut Bindings) -> Result<Float, Z3Error> {
        expect(self.native(term, bound)?, "a float", Dynamic::as_float)
    }

    fn floats(
        &self,
        lhs: &SmtTerm,
        rhs: &SmtTerm,
        bound: &mut Bindings,
    ) -> Result<(Float, Float), Z3Error> {
        let (l, r) = (self.float(lhs, bound)?, self.float(rhs, bound)?);
        same_sort(&Dynamic::from(&l), &Dynamic::from(&r))?;
        Ok((l, r))
    }

    fn native(&self, term: &SmtTerm, bound: &mut Bindings) -> Result<Dynamic, Z3Error> {
        Ok(match term {
            SmtTerm::Var(name) => self.lookup(name, bound)?,
            SmtTerm::IntLit(n) => Int::from_i64(*n).into(),
            SmtTerm::BoolLit(b) => Bool::from_bool(*b).into(),
            SmtTerm::RealLit(r) => Real::from_rational(*r.numer(), *r.denom()).into(),
            SmtTerm::BvLit { width, value } => BV::from_str(*width, &value.to_str_radix(10))
                .ok_or_else(|| Z3Error::Internal(format!("bitvector literal {value} of width {width}")))?
                .into(),
            SmtTerm::FpLit { exp, sig, bits } => float_lit(*exp, *sig, bits)?.into(),
            SmtTerm::RoundingMode(rm) => Dynamic::from_ast(&rounding_mode(*rm)),
            SmtTerm::Add(l, r) => {
                self.arith(l, r, bound, |a, b| Int::add(&[a, b]), |a, b| Real::add(&[a, b]))?
            }
            SmtTerm::Sub(l, r) => {
                self.arith(l, r, bound, |a, b| Int::sub(&[a, b]), |a, b| Real::sub(&[a, b]))?
            }
            SmtTerm::Mul(l, r) => {
                self.arith(l, r, bound, |a, b| Int::mul(&[a, b]), |a, b| Real::mul(&[a, b]))?
            }
            SmtTerm::Lt(l, r) => self.arith(l, r, bound, |a, b| a.lt(b), |a, b| a.lt(b))?,
            SmtTerm::Le(l, r) => self.arith(l, r, bound, |a, b| a.le(b), |a, b| a.le(b))?,
            SmtTerm::Gt(l, r) => self.arith(l, r, bound, |a, b| a.gt(b), |a, b| a.gt(b))?,
            SmtTerm::Ge(l, r) => self.arith(l, r, bound, |a, b| a.ge(b), |a, b| a.ge(b))?,
            SmtTerm::Eq(l, r) => {
                let (l, r) = (self.native(l, bound)?, self.native(r, bound)?);
                l.safe_eq(&r)
                    .map_err(|_| ill_sorted(l.get_sort().to_string(), &r))?
                    .into()
            }
            SmtTerm::And(ts) => Bool::and(&self.bools(ts, bound)?).into(),
            SmtTerm::Or(ts) => Bool::or(&self.bools(ts, bound)?).into(),
            SmtTerm::Not(t) => self.bool(t, bound)?.not().into(),
            SmtTerm::Implies(l, r) => {
                let (l, r) = (self.bool(l, bound)?, self.bool(r, bound)?);
                l.implies(&r).into()
            }
            SmtTerm::Ite(c, t, e) => {
                let c = self.bool(c, bound)?;
                let (t, e) = (self.native(t, bound)?, self.native(e, bound)?);
                same_sort(&t, &e)?;
                c.ite(&t, &e)
            }
            SmtTerm::ForAll(vars, body) => self.quantified(true, vars, body, bound)?.into(),
            SmtTerm::Exists(vars, body) => self.quantified(false, vars, body, bound)?.into(),
            SmtTerm::App(op, args) => self.app(op, args, bound)?,
        })
    }

    /// Dispatches on the operand sort: integers when both sides are, reals
    /// otherwise.
    fn arith<I: Into<Dynamic>, R: Into<Dynamic>>(
        &self,
        lhs: &SmtTerm,
        rhs: &SmtTerm,
        bound: &mut Bindings,
        on_int: impl Fn(&Int, &Int) -> I,
        on_real: impl Fn(&Real, &Real) -> R,
    ) -> Result<Dynamic, Z3Error> {
        let (l, r) = (self.native(lhs, bound)?, self.native(rhs, bound)?);
        if let (Some(a), Some(b)) = (l.as_int(), r.as_int()) {
            return Ok(on_int(&a, &b).into());
        }
        let a = expect(l, "Int or Real", Dynamic::as_real)?;
        let b = expect(r, "Int or Real", Dynamic::as_real)?;
        Ok(on_real(&a, &b).into())
    }

    fn quantified(
        &self,
        forall: bool,
        vars: &[(String, SmtSort)],
        body: &SmtTerm,
        bound: &mut Bindings,
    ) -> Result<Bool, Z3Error> {
        let sorts = vars
            .iter()
            .map(|(_, sort)| native_sort(sort))
            .collect::<Result<Vec<_>, _>>()?;
        let depth = bound.len();
        for ((name, _), sort) in vars.iter().zip(&sorts) {
            bound.push((name.clone(), Dynamic::new_const(name.as_str(), sort)));
        }
        let body = self.bool(body, bound);
        let consts: Vec<Dynamic> = bound.drain(depth..).map(|(_, c)| c).collect();
        let body = body?;
        let bounds: Vec<&dyn Ast> = consts.iter().map(|c| c as &dyn Ast).collect();
        Ok(if forall {
            ast::forall_const(&bounds, &[], &body)
        } else {
            ast::exists_const(&bounds, &[], &body)
        })
    }

    fn bv_binary<R: Into<Dynamic>>(
        &self,
        lhs: &SmtTerm,
        rhs: &SmtTerm,
        bound: &mut Bindings,
        op: impl Fn(&BV, &BV) -> R,
    ) -> Result<Dynamic, Z3Error> {
        let (a, b) = (self.bv(lhs, bound)?, self.bv(rhs, bound)?);
        same_width(&a, &b)?;
        Ok(op(&a, &b).into())
    }

    /// Left fold of an n-ary bitvector operator. `concat` is the one fold
    /// whose operands may differ in width.
    fn bv_fold(
        &self,
        args: &[SmtTerm],
        bound: &mut Bindings,
        widths_agree: bool,
        op: impl Fn(&BV, &BV) -> BV,
    ) -> Result<Dynamic, Z3Error> {
        let mut acc: Option<BV> = None;
        for arg in args {
            let next = self.bv(arg, bound)?;
            acc = Some(match acc {
                None => next,
                Some(prev) => {
                    if widths_agree {
                        same_width(&prev, &next)?;
                    }
                    op(&prev, &next)
                }
            });
        }
        acc.map(Dynamic::from)
            .ok_or_else(|| Z3Error::Internal("bitvector operator without operands".into()))
    }

    fn fp_rounded(
        &self,
        args: &[SmtTerm],
        bound: &mut Bindings,
        op: impl Fn(&Float, &Float, &ast::RoundingMode) -> Float,
    ) -> Result<Dynamic, Z3Error> {
        match args {
            [rm, l, r] => {
                let rm = rounding(rm)?;
                let (a, b) = self.floats(l, r, bound)?;
                Ok(op(&a, &b, &rm).into())
            }
            _ => Err(Z3Error::Internal(format!("rounded float operator with {} operands", args.len()))),
        }
    }

    fn fp_compare(
        &self,
        lhs: &SmtTerm,
        rhs: &SmtTerm,
        bound: &mut Bindings,
        op: impl Fn(&Float, &Float) -> Bool,
    ) -> Result<Dynamic, Z3Error> {
        let (a, b) = self.floats(lhs, rhs, bound)?;
        Ok(op(&a, &b).into())
    }

    fn app(&self, op: &SmtOp, args: &[SmtTerm], bound: &mut Bindings) -> Result<Dynamic, Z3Error> {
        Ok(match (op, args) {
            (SmtOp::Neg, [x]) => {
                let x = self.native(x, bound)?;
                match x.as_int() {
                    Some(i) => i.unary_minus().into(),
                    None => expect(x, "Int or Real", Dynamic::as_real)?.unary_minus().into(),
                }
            }
            (SmtOp::IntDiv, [l, r]) => {
                let (l, r) = (self.int(l, bound)?, self.int(r, bound)?);
                l.div(&r).into()
            }
            (SmtOp::Mod, [l, r]) => {
                let (l, r) = (self.int(l, bound)?, self.int(r, bound)?);
                l.modulo(&r).into()
            }
            (SmtOp::RealDiv, [l, r]) => {
                let (l, r) = (self.real(l, bound)?, self.real(r, bound)?);
                l.div(&r).into()
            }
            (SmtOp::ToReal, [x]) => self.int(x, bound)?.to_real().into(),
            (SmtOp::ToInt, [x]) => self.real(x, bound)?.to_int().into(),
            (SmtOp::Xor, [l, r]) => {
                let (l, r) = (self.bool(l, bound)?, self.bool(r, bound)?);
                l.xor(&r).into()
            }
            (SmtOp::Distinct, _) => {
                let values = args
                    .iter()
                    .map(|a| self.native(a, bound))
                    .collect::<Result<Vec<_>, _>>()?;
                for pair in values.windows(2) {
                    same_sort(&pair[0], &pair[1])?;
                }
                Dynamic::distinct(&values).into()
            }

            (SmtOp::Concat, _) => self.bv_fold(args, bound, false, |a, b| a.concat(b))?,
            (SmtOp::Extract(hi, lo), [x]) => {
                let x = self.bv(x, bound)?;
                if lo > hi || *hi >= x.get_size() {
                    return Err(Z3Error::IllSorted {
                        expected: format!("a bitvector wider than {hi}"),
                        found: format!("(_ BitVec {})", x.get_size()),
                    });
                }
                x.extract(*hi, *lo).into()
            }
            (SmtOp::ZeroExtend(n), [x]) => self.bv(x, bound)?.zero_ext(*n).into(),
            (SmtOp::SignExtend(n), [x]) => self.bv(x, bound)?.sign_ext(*n).into(),
            (SmtOp::RotateLeft(n), [x]) => {
                let x = self.bv(x, bound)?;
                x.bvrotl(&BV::from_u64(u64::from(*n), x.get_size())).into()
            }
            (SmtOp::RotateRight(n), [x]) => {
                let x = self.bv(x, bound)?;
                x.bvrotr(&BV::from_u64(u64::from(*n), x.get_size())).into()
            }
            (SmtOp::BvNot, [x]) => self.bv(x, bound)?.bvnot().into(),
            (SmtOp::BvNeg, [x]) => self.bv(x, bound)?.bvneg().into(),
            (SmtOp::BvAnd, _) => self.bv_fold(args, bound, true, |a, b| a.bvand(b))?,
            (SmtOp::BvOr, _) => self.bv_fold(args, bound, true, |a, b| a.bvor(b))?,
            (SmtOp::BvXor, _) => self.bv_fold(args, bound, true, |a, b| a.bvxor(b))?,
            (SmtOp::BvAdd, _) => self.bv_fold(args, bound, true, |a, b| a.bvadd(b))?,
            (SmtOp::BvMul, _) => self.bv_fold(args, bound, true, |a, b| a.bvmul(b))?,
            (SmtOp::BvSub, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvsub(b))?,
            (SmtOp::BvUDiv, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvudiv(b))?,
            (SmtOp::BvSDiv, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvsdiv(b))?,
            (SmtOp::BvURem, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvurem(b))?,
            (SmtOp::BvSRem, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvsrem(b))?,
            (SmtOp::BvSMod, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvsmod(b))?,
            (SmtOp::BvShl, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvshl(b))?,
            (SmtOp::BvLShr, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvlshr(b))?,
            (SmtOp::BvAShr, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvashr(b))?,
            (SmtOp::BvULt, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvult(b))?,
            (SmtOp::BvULe, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvule(b))?,
            (SmtOp::BvUGt, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvugt(b))?,
            (SmtOp::BvUGe, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvuge(b))?,
            (SmtOp::BvSLt, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvslt(b))?,
            (SmtOp::BvSLe, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvsle(b))?,
            (SmtOp::BvSGt, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvsgt(b))?,
            (SmtOp::BvSGe, [l, r]) => self.bv_binary(l, r, bound, |a, b| a.bvsge(b))?,

            (SmtOp::FpAdd, _) => self.fp_rounded(args, bound, |a, b, rm| a.add_with_rounding_mode(b, rm))?,
            (SmtOp::FpSub, _) => self.fp_rounded(args, bound, |a, b, rm| a.sub_with_rounding_mode(b, rm))?,
            (SmtOp::FpMul, _) => self.fp_rounded(args, bound, |a, b, rm| a.mul_with_rounding_mode(b, rm))?,
            (SmtOp::FpDiv, _) => self.fp_rounded(args, bound, |a, b, rm| a.div_with_rounding_mode(b, rm))?,
            (SmtOp::FpSqrt, [rm, x]) => {
                let rm = rounding(rm)?;
                self.float(x, bound)?.sqrt_with_rounding_mode(&rm).into()
            }
            (SmtOp::FpRoundToIntegral, [rm, x]) => {
                let rm = rounding(rm)?;
                self.float(x, bound)?.round_to_integral_with_rounding_mode(&rm).into()
            }
            (SmtOp::FpAbs, [x]) => self.float(x, bound)?.unary_abs().into(),
            (SmtOp::FpNeg, [x]) => self.float(x, bound)?.unary_neg().into(),
            (SmtOp::FpMin, [l, r]) => {
                let (a, b) = self.floats(l, r, bound)?;
                a.min(&b).into()
            }
            (SmtOp::FpMax, [l, r]) => {
                let (a, b) = self.floats(l, r, bound)?;
                a.max(&b).into()
            }
            (SmtOp::FpEq, [l, r]) => self.fp_compare(l, r, bound, |a, b| a.eq_fpa(b))?,
            (SmtOp::FpLt, [l, r]) => self.fp_compare(l, r, bound, |a, b| a.lt(b))?,
            (SmtOp::FpLeq, [l, r]) => self.fp_compare(l, r, bound, |a, b| a.le(b))?,
            (SmtOp::FpGt, [l, r]) => self.fp_compare(l, r, bound, |a, b| a.gt(b))?,
            (SmtOp::FpGeq, [l, r]) => self.fp_compare(l, r, bound, |a, b| a.ge(b))?,
            (SmtOp::FpIsNan, [x]) => self.float(x, bound)?.is_nan().into(),
            (SmtOp::FpIsInfinite, [x]) => self.float(x, bound)?.is_infinite().into(),
            (SmtOp::ToFp(exp, sig), [rm, x]) => {
                let rm = rounding(rm)?;
                let x = self.native(x, bound)?;
                match x.as_float() {
                    Some(f) => f.to_fp_with_rounding_mode(&rm, &Sort::float(*exp, *sig)).into(),
                    None => return Err(Z3Error::Unsupported(format!("{} from {}", op_to_smtlib(op), x.get_sort()))),
                }
            }
            (SmtOp::FpToUbv(width), [rm, x]) => {
                let rm = rounding(rm)?;
                self.float(x, bound)?.to_ubv_with_rounding_mode(&rm, *width).into()
            }
            (SmtOp::FpToSbv(width), [rm, x]) => {
                let rm = rounding(rm)?;
                self.float(x, bound)?.to_sbv_with_rounding_mode(&rm, *width).into()
            }

            (SmtOp::Select, [a, i]) => {
                let a = expect(self.native(a, bound)?, "an array", Dynamic::as_array)?;
                let i = self.native(i, bound)?;
                let sort = a.get_sort();
                if sort.array_domain().as_ref() != Some(&i.get_sort()) {
                    return Err(ill_sorted(format!("index of {sort}"), &i));
                }
                a.select(&i)
            }
            (SmtOp::Store, [a, i, v]) => {
                let a = expect(self.native(a, bound)?, "an array", Dynamic::as_array)?;
                let (i, v) = (self.native(i, bound)?, self.native(v, bound)?);
                let sort = a.get_sort();
                if sort.array_domain().as_ref() != Some(&i.get_sort()) {
                    return Err(ill_sorted(format!("index of {sort}"), &i));
                }
                if sort.array_range().as_ref() != Some(&v.get_sort()) {
                    return Err(ill_sorted(format!("element of {sort}"), &v));
                }
                a.store(&i, &v).into()
            }

            (SmtOp::Uf(name), _) => {
                let fun = self
                    .funs
                    .get(name)
                    .ok_or_else(|| Z3Error::UnknownVariable(name.clone()))?;
                if fun.params.len() != args.len() {
                    return Err(Z3Error::Internal(format!(
                        "{name} takes {} arguments, got {}",
                        fun.params.len(),
                        args.len()
                    )));
                }
                let values = args
                    .iter()
                    .map(|a| self.native(a, bound))
                    .collect::<Result<Vec<_>, _>>()?;
                for (value, param) in values.iter().zip(&fun.params) {
                    if value.get_sort() != native_sort(param)? {
                        return Err(ill_sorted(param.to_string(), value));
                    }
                }
                let refs: Vec<&dyn Ast> = values.iter().map(|v| v as &dyn Ast).collect();
                fun.decl.apply(&refs)
            }
            _ => return Err(Z3Error::Unsupported(op_to_smtlib(op))),
        })
    }

    fn check(&self) -> SatResult {
        match self.solver.check() {
            z3::SatResult::Sat => SatResult::Sat,
            z3::SatResult::Unsat => SatResult::Unsat,
            z3::SatResult::Unknown => SatResult::Unknown(
                self.solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "unknown".into()),
            ),
        }
    }
}

impl SmtSolver for Z3Solver {
    type Error = Z3Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Z3Error> {
        if let Some((existing, _)) = self.consts.get(name) {
            return if existing == sort {
                Ok(())
            } else {
                Err(Z3Error::SortMismatch(name.to_string()))
            };
        }
        let constant = Dynamic::new_const(name, &native_sort(sort)?);
        self.consts.insert(name.to_string(), (sort.clone(), constant));
        Ok(())
    }

    fn declare_fun(&mut self, name: &str, params: &[SmtSort], ret: &SmtSort) -> Result<(), Z3Error> {
        if let Some(existing) = self.funs.get(name) {
            return if existing.params == params && existing.ret == *ret {
                Ok(())
            } else {
                Err(Z3Error::SortMismatch(name.to_string()))
            };
        }
        let domain = params.iter().map(native_sort).collect::<Result<Vec<_>, _>>()?;
        let domain_refs: Vec<&Sort> = domain.iter().collect();
        let decl = FuncDecl::new(name, &domain_refs, &native_sort(ret)?);
        self.funs.insert(
            name.to_string(),
            Function {
                params: params.to_vec(),
                ret: ret.clone(),
                decl,
            },
        );
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Z3Error> {
        let formula = self.bool(term, &mut Vec::new())?;
        self.solver.assert(&formula);
        Ok(())
    }

    fn push(&mut self) -> Result<(), Z3Error> {
        self.solver.push();
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Z3Error> {
        self.solver.pop(1);
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, Z3Error> {
        Ok(self.check())
    }

    /// Symbols without a [`ModelValue`] representation (arrays) are skipped.
    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Z3Error> {
        let result = self.check();
        if result != SatResult::Sat {
            return Ok((result, None));
        }
        let model = self
            .solver
            .get_model()
            .ok_or_else(|| Z3Error::Internal("satisfiable but no model".into()))?;
        let values = var_names
            .iter()
            .filter_map(|(name, sort)| {
                let (_, constant) = self.consts.get(*name)?;
                let value = read_value(&model, constant, sort)?;
                Some((name.to_string(), value))
            })
            .collect();
        Ok((SatResult::Sat, Some(Model { values })))
    }

    fn reset(&mut self) -> Result<(), Z3Error> {
        self.solver.reset();
        if let Some(params) = &self.params {
            self.solver.set_params(params);
        }
        self.consts.clear();
        self.funs.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn bv(width: u32, value: u64) -> SmtTerm {
        SmtTerm::BvLit {
            width,
            value: BigUint::from(value),
        }
    }

    #[test]
    fn solves_linear_constraint_and_reports_model() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("x", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("x").gt(SmtTerm::int(3)))?;
        solver.assert(&SmtTerm::var("x").lt(SmtTerm::int(5)))?;
        let (result, model) = solver.check_sat_with_model(&[("x", &SmtSort::Int)])?;
        assert_eq!(result, SatResult::Sat);
        assert_eq!(model.ok_or("expected a model")?.get("x"), Some(&ModelValue::Int(4)));
        Ok(())
    }

    #[test]
    fn integer_division_and_modulo_follow_smtlib() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("q", &SmtSort::Int)?;
        solver.declare_var("r", &SmtSort::Int)?;
        let q = SmtTerm::app(SmtOp::IntDiv, vec![SmtTerm::int(-7), SmtTerm::int(2)]);
        let r = SmtTerm::app(SmtOp::Mod, vec![SmtTerm::int(-7), SmtTerm::int(2)]);
        solver.assert(&SmtTerm::var("q").eq(q))?;
        solver.assert(&SmtTerm::var("r").eq(r))?;
        let (_, model) =
            solver.check_sat_with_model(&[("q", &SmtSort::Int), ("r", &SmtSort::Int)])?;
        let model = model.ok_or("expected a model")?;
        assert_eq!(model.get("q"), Some(&ModelValue::Int(-4)));
        assert_eq!(model.get("r"), Some(&ModelValue::Int(1)));
        Ok(())
    }

    #[test]
    fn real_division_reads_back_as_a_fraction() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("h", &SmtSort::Real)?;
        let half = SmtTerm::app(SmtOp::RealDiv, vec![SmtTerm::var("h"), SmtTerm::RealLit(Rational64::from_integer(2))]);
        solver.assert(&half.eq(SmtTerm::RealLit(Rational64::new(3, 4))))?;
        let (_, model) = solver.check_sat_with_model(&[("h", &SmtSort::Real)])?;
        assert_eq!(
            model.ok_or("expected a model")?.get("h"),
            Some(&ModelValue::Real(Rational64::new(3, 2)))
        );
        Ok(())
    }

    #[test]
    fn bitvector_arithmetic_wraps() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("b", &SmtSort::BitVec(8))?;
        let sum = SmtTerm::app(SmtOp::BvAdd, vec![SmtTerm::var("b"), bv(8, 1)]);
        solver.assert(&sum.eq(bv(8, 0)))?;
        let (_, model) = solver.check_sat_with_model(&[("b", &SmtSort::BitVec(8))])?;
        assert_eq!(
            model.ok_or("expected a model")?.get("b"),
            Some(&ModelValue::BitVec {
                width: 8,
                value: BigUint::from(255u32)
            })
        );
        Ok(())
    }

    #[test]
    fn wide_bitvectors_are_read_from_the_printed_value() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("w", &SmtSort::BitVec(96))?;
        let high = SmtTerm::app(SmtOp::Extract(95, 64), vec![SmtTerm::var("w")]);
        let low = SmtTerm::app(SmtOp::Extract(63, 0), vec![SmtTerm::var("w")]);
        solver.assert(&high.eq(bv(32, 1)))?;
        solver.assert(&low.eq(bv(64, 2)))?;
        let (_, model) = solver.check_sat_with_model(&[("w", &SmtSort::BitVec(96))])?;
        let expected = (BigUint::from(1u32) << 64u32) + BigUint::from(2u32);
        assert_eq!(
            model.ok_or("expected a model")?.get("w"),
            Some(&ModelValue::BitVec {
                width: 96,
                value: expected
            })
        );
        Ok(())
    }

    #[test]
    fn mismatched_bitvector_widths_are_ill_sorted() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("b", &SmtSort::BitVec(8))?;
        let sum = SmtTerm::app(SmtOp::BvAdd, vec![SmtTerm::var("b"), bv(16, 1)]);
        assert!(matches!(
            solver.assert(&sum.eq(bv(8, 0))),
            Err(Z3Error::IllSorted { .. })
        ));
        Ok(())
    }

    #[test]
    fn single_precision_addition_rounds() -> TestResult {
        let mut solver = Z3Solver::new();
        let sort = SmtSort::Float(8, 24);
        solver.declare_var("f", &sort)?;
        let one = SmtTerm::FpLit {
            exp: 8,
            sig: 24,
            bits: BigUint::from(1.0f32.to_bits()),
        };
        let two = SmtTerm::FpLit {
            exp: 8,
            sig: 24,
            bits: BigUint::from(2.0f32.to_bits()),
        };
        let sum = SmtTerm::app(
            SmtOp::FpAdd,
            vec![SmtTerm::RoundingMode(SmtRoundingMode::Rne), SmtTerm::var("f"), one],
        );
        solver.assert(&SmtTerm::app(SmtOp::FpEq, vec![sum, two]))?;
        solver.assert(&SmtTerm::app(SmtOp::FpIsNan, vec![SmtTerm::var("f")]).not())?;
        let (_, model) = solver.check_sat_with_model(&[("f", &sort)])?;
        assert_eq!(
            model.ok_or("expected a model")?.get("f"),
            Some(&ModelValue::Float {
                exp: 8,
                sig: 24,
                bits: BigUint::from(1.0f32.to_bits())
            })
        );
        Ok(())
    }

    #[test]
    fn array_stores_are_visible_to_selects() -> TestResult {
        let mut solver = Z3Solver::new();
        let sort = SmtSort::Array(Box::new(SmtSort::Int), Box::new(SmtSort::Int));
        solver.declare_var("a", &sort)?;
        solver.declare_var("v", &SmtSort::Int)?;
        let stored = SmtTerm::app(SmtOp::Store, vec![SmtTerm::var("a"), SmtTerm::int(3), SmtTerm::int(9)]);
        let read = SmtTerm::app(SmtOp::Select, vec![stored, SmtTerm::int(3)]);
        solver.assert(&SmtTerm::var("v").eq(read))?;
        let (_, model) = solver.check_sat_with_model(&[("a", &sort), ("v", &SmtSort::Int)])?;
        let model = model.ok_or("expected a model")?;
        assert_eq!(model.get("v"), Some(&ModelValue::Int(9)));
        assert_eq!(model.get("a"), None);
        Ok(())
    }

    #[test]
    fn uninterpreted_functions_are_congruent() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_fun("f", &[SmtSort::Int], &SmtSort::Int)?;
        solver.declare_var("x", &SmtSort::Int)?;
        solver.declare_var("y", &SmtSort::Int)?;
        let f = |arg| SmtTerm::app(SmtOp::Uf("f".into()), vec![arg]);
        solver.assert(&SmtTerm::var("x").eq(SmtTerm::var("y")))?;
        solver.assert(&f(SmtTerm::var("x")).eq(f(SmtTerm::var("y"))).not())?;
        assert_eq!(solver.check_sat()?, SatResult::Unsat);
        assert!(matches!(
            solver.assert(&SmtTerm::app(SmtOp::Uf("f".into()), vec![SmtTerm::BoolLit(true)]).eq(SmtTerm::int(0))),
            Err(Z3Error::IllSorted { .. })
        ));
        Ok(())
    }

    #[test]
    fn quantified_variables_shadow_declarations() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("x", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("x").eq(SmtTerm::int(0)))?;
        // x is bound here, so the outer x = 0 does not make this false
        let body = SmtTerm::var("x").gt(SmtTerm::int(5));
        solver.assert(&SmtTerm::Exists(vec![("x".into(), SmtSort::Int)], Box::new(body)))?;
        assert_eq!(solver.check_sat()?, SatResult::Sat);
        let body = SmtTerm::var("k").mul(SmtTerm::int(2)).eq(SmtTerm::int(1));
        solver.assert(&SmtTerm::Exists(vec![("k".into(), SmtSort::Int)], Box::new(body)))?;
        assert_eq!(solver.check_sat()?, SatResult::Unsat);
        Ok(())
    }

    #[test]
    fn push_pop_discards_scoped_assertions() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("b", &SmtSort::Bool)?;
        solver.assert(&SmtTerm::var("b"))?;
        solver.push()?;
        solver.assert(&SmtTerm::var("b").not())?;
        assert_eq!(solver.check_sat()?, SatResult::Unsat);
        solver.pop()?;
        assert_eq!(solver.check_sat()?, SatResult::Sat);
        Ok(())
    }

    #[test]
    fn redeclaring_with_another_sort_fails() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("v", &SmtSort::Int)?;
        solver.declare_var("v", &SmtSort::Int)?;
        assert!(matches!(
            solver.declare_var("v", &SmtSort::Bool),
            Err(Z3Error::SortMismatch(_))
        ));
        Ok(())
    }

    #[test]
    fn bitvector_to_float_conversion_is_rejected() -> TestResult {
        let mut solver = Z3Solver::new();
        assert!(matches!(
            solver.declare_var("rm", &SmtSort::RoundingMode),
            Err(Z3Error::Unsupported(_))
        ));
        solver.declare_var("f", &SmtSort::Float(8, 24))?;
        let converted = SmtTerm::app(
            SmtOp::ToFp(8, 24),
            vec![SmtTerm::RoundingMode(SmtRoundingMode::Rne), bv(32, 7)],
        );
        assert!(matches!(
            solver.assert(&SmtTerm::app(SmtOp::FpEq, vec![SmtTerm::var("f"), converted])),
            Err(Z3Error::Unsupported(_))
        ));
        Ok(())
    }
}
