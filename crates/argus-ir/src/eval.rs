//! Partial evaluation of expressions under a valuation.
//!
//! Evaluation returns `None` whenever the result is not determined by the
//! valuation (an unbound variable, a step-indexed reference, division by zero,
//! overflow) or the operator lies outside the evaluated fragment. Boolean
//! connectives short-circuit, so `false && <unknown>` is still `false`.

use num::rational::Rational64;
use num::traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub};
use num::{BigUint, One, Zero};

use crate::decl::Decl;
use crate::expr::{BinaryOp, Expr, ExprKind, NaryOp, UnaryOp};
use crate::literal::LitValue;
use crate::valuation::Valuation;

impl Expr {
    pub fn eval(&self, val: &Valuation) -> Option<LitValue> {
        match self.kind() {
            ExprKind::Lit(v) => Some(v.clone()),
            ExprKind::Ref(Decl::Var(d)) => val.get(d).cloned(),
            ExprKind::Ref(_) | ExprKind::Prime(_) => None,
            ExprKind::Ite(c, t, e) => {
                if c.eval(val)?.as_bool()? {
                    t.eval(val)
                } else {
                    e.eval(val)
                }
            }
            ExprKind::Unary(op, operand) => eval_unary(*op, operand, val),
            ExprKind::Binary(op, lhs, rhs) => eval_binary(*op, lhs, rhs, val),
            ExprKind::Nary(op, ops) => eval_nary(*op, ops, val),
            ExprKind::Extract { op, hi, lo } => {
                let (width, value) = bv_of(op.eval(val)?)?;
                if hi < lo || *hi >= width {
                    return None;
                }
                let out_width = hi - lo + 1;
                Some(LitValue::BitVec {
                    width: out_width,
                    value: (value >> *lo as usize) & mask(out_width),
                })
            }
            ExprKind::Extend {
                op,
                signed: false,
                width,
            } => {
                let (from, value) = bv_of(op.eval(val)?)?;
                (*width >= from).then_some(LitValue::BitVec {
                    width: *width,
                    value,
                })
            }
            _ => None,
        }
    }
}

fn eval_unary(op: UnaryOp, operand: &Expr, val: &Valuation) -> Option<LitValue> {
    let v = operand.eval(val)?;
    match (op, v) {
        (UnaryOp::Not, LitValue::Bool(b)) => Some(LitValue::Bool(!b)),
        (UnaryOp::Pos, v @ (LitValue::Int(_) | LitValue::Rat(_) | LitValue::BitVec { .. })) => Some(v),
        (UnaryOp::Neg, LitValue::Int(n)) => n.checked_neg().map(LitValue::Int),
        (UnaryOp::Neg, LitValue::Rat(r)) => Rational64::zero().checked_sub(&r).map(LitValue::Rat),
        (UnaryOp::Neg, LitValue::BitVec { width, value }) => {
            let modulus = BigUint::one() << width as usize;
            let value = (&modulus - (value % &modulus)) % &modulus;
            Some(LitValue::BitVec { width, value })
        }
        (UnaryOp::BvNot, LitValue::BitVec { width, value }) => Some(LitValue::BitVec {
            width,
            value: value ^ mask(width),
        }),
        (UnaryOp::IntToRat, LitValue::Int(n)) => Some(LitValue::Rat(Rational64::from_integer(n))),
        (UnaryOp::RatToInt, LitValue::Rat(r)) => Some(LitValue::Int(r.floor().to_integer())),
        _ => None,
    }
}

fn eval_binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, val: &Valuation) -> Option<LitValue> {
    match op {
        BinaryOp::Imply => {
            let l = lhs.eval(val).and_then(|v| v.as_bool());
            let r = rhs.eval(val).and_then(|v| v.as_bool());
            return match (l, r) {
                (Some(false), _) | (_, Some(true)) => Some(LitValue::Bool(true)),
                (Some(true), Some(false)) => Some(LitValue::Bool(false)),
                _ => None,
            };
        }
        BinaryOp::Eq => return Some(LitValue::Bool(lhs.eval(val)? == rhs.eval(val)?)),
        BinaryOp::Neq => return Some(LitValue::Bool(lhs.eval(val)? != rhs.eval(val)?)),
        _ => {}
    }
    let l = lhs.eval(val)?;
    let r = rhs.eval(val)?;
    match (op, l, r) {
        (BinaryOp::Iff, LitValue::Bool(a), LitValue::Bool(b)) => Some(LitValue::Bool(a == b)),
        (BinaryOp::FpAssign, a @ LitValue::Float { .. }, b @ LitValue::Float { .. }) => {
            Some(LitValue::Bool(a == b))
        }
        (BinaryOp::Xor, LitValue::Bool(a), LitValue::Bool(b)) => Some(LitValue::Bool(a != b)),
        (BinaryOp::Sub, LitValue::Int(a), LitValue::Int(b)) => a.checked_sub(b).map(LitValue::Int),
        (BinaryOp::Sub, LitValue::Rat(a), LitValue::Rat(b)) => a.checked_sub(&b).map(LitValue::Rat),
        (BinaryOp::Div, LitValue::Int(a), LitValue::Int(b)) => a.checked_div_euclid(b).map(LitValue::Int),
        (BinaryOp::Div, LitValue::Rat(a), LitValue::Rat(b)) => a.checked_div(&b).map(LitValue::Rat),
        (BinaryOp::Mod, LitValue::Int(a), LitValue::Int(b)) => a.checked_rem_euclid(b).map(LitValue::Int),
        (BinaryOp::Rem, LitValue::Int(a), LitValue::Int(b)) => a.checked_rem(b).map(LitValue::Int),
        (BinaryOp::Lt, LitValue::Int(a), LitValue::Int(b)) => Some(LitValue::Bool(a < b)),
        (BinaryOp::Leq, LitValue::Int(a), LitValue::Int(b)) => Some(LitValue::Bool(a <= b)),
        (BinaryOp::Gt, LitValue::Int(a), LitValue::Int(b)) => Some(LitValue::Bool(a > b)),
        (BinaryOp::Geq, LitValue::Int(a), LitValue::Int(b)) => Some(LitValue::Bool(a >= b)),
        (BinaryOp::Lt, LitValue::Rat(a), LitValue::Rat(b)) => Some(LitValue::Bool(a < b)),
        (BinaryOp::Leq, LitValue::Rat(a), LitValue::Rat(b)) => Some(LitValue::Bool(a <= b)),
        (BinaryOp::Gt, LitValue::Rat(a), LitValue::Rat(b)) => Some(LitValue::Bool(a > b)),
        (BinaryOp::Geq, LitValue::Rat(a), LitValue::Rat(b)) => Some(LitValue::Bool(a >= b)),
        (
            BinaryOp::Sub,
            LitValue::BitVec { width, value: a },
            LitValue::BitVec { value: b, .. },
        ) => {
            let modulus = BigUint::one() << width as usize;
            Some(LitValue::BitVec {
                width,
                value: (a + &modulus - (b % &modulus)) % &modulus,
            })
        }
        (
            BinaryOp::BvULt | BinaryOp::BvULeq | BinaryOp::BvUGt | BinaryOp::BvUGeq,
            LitValue::BitVec { value: a, .. },
            LitValue::BitVec { value: b, .. },
        ) => Some(LitValue::Bool(match op {
            BinaryOp::BvULt => a < b,
            BinaryOp::BvULeq => a <= b,
            BinaryOp::BvUGt => a > b,
            _ => a >= b,
        })),
        _ => None,
    }
}

fn eval_nary(op: NaryOp, ops: &[Expr], val: &Valuation) -> Option<LitValue> {
    match op {
        NaryOp::And | NaryOp::Or => {
            let absorbing = op == NaryOp::Or;
            let mut unknown = false;
            for e in ops {
                match e.eval(val).and_then(|v| v.as_bool()) {
                    Some(b) if b == absorbing => return Some(LitValue::Bool(absorbing)),
                    Some(_) => {}
                    None => unknown = true,
                }
            }
            (!unknown).then_some(LitValue::Bool(!absorbing))
        }
        NaryOp::Add | NaryOp::Mul => {
            let values = ops.iter().map(|e| e.eval(val)).collect::<Option<Vec<_>>>()?;
            fold_arith(op, values)
        }
        NaryOp::BvAnd | NaryOp::BvOr | NaryOp::BvXor => {
            let mut iter = ops.iter();
            let (width, mut acc) = bv_of(iter.next()?.eval(val)?)?;
            for e in iter {
                let (_, v) = bv_of(e.eval(val)?)?;
                acc = match op {
                    NaryOp::BvAnd => acc & v,
                    NaryOp::BvOr => acc | v,
                    _ => acc ^ v,
                };
            }
            Some(LitValue::BitVec { width, value: acc })
        }
        NaryOp::Concat => {
            let mut width = 0u32;
            let mut acc = BigUint::zero();
            for e in ops {
                let (w, v) = bv_of(e.eval(val)?)?;
                acc = (acc << w as usize) | v;
                width += w;
            }
            Some(LitValue::BitVec { width, value: acc })
        }
    }
}

fn fold_arith(op: NaryOp, values: Vec<LitValue>) -> Option<LitValue> {
    let mut iter = values.into_iter();
    let first = iter.next().unwrap_or(match op {
        NaryOp::Mul => LitValue::Int(1),
        _ => LitValue::Int(0),
    });
    iter.try_fold(first, |acc, v| match (acc, v) {
        (LitValue::Int(a), LitValue::Int(b)) => match op {
            NaryOp::Add => a.checked_add(b),
            _ => a.checked_mul(b),
        }
        .map(LitValue::Int),
        (LitValue::Rat(a), LitValue::Rat(b)) => match op {
            NaryOp::Add => a.checked_add(&b),
            _ => a.checked_mul(&b),
        }
        .map(LitValue::Rat),
        (LitValue::BitVec { width, value: a }, LitValue::BitVec { value: b, .. }) => {
            let value = match op {
                NaryOp::Add => a + b,
                _ => a * b,
            };
            Some(LitValue::BitVec {
                width,
                value: value & mask(width),
            })
        }
        _ => None,
    })
}

fn bv_of(v: LitValue) -> Option<(u32, BigUint)> {
    match v {
        LitValue::BitVec { width, value } => Some((width, value)),
        _ => None,
    }
}

fn mask(width: u32) -> BigUint {
    (BigUint::one() << width as usize) - BigUint::one()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::VarDecl;
    use crate::types::Type;

    #[test]
    fn integer_arithmetic_follows_euclidean_division() {
        let e = Expr::div(Expr::int(-7), Expr::int(2));
        assert_eq!(e.eval(&Valuation::new()), Some(LitValue::Int(-4)));
        let m = Expr::modulo(Expr::int(-7), Expr::int(2));
        assert_eq!(m.eval(&Valuation::new()), Some(LitValue::Int(1)));
        let r = Expr::rem(Expr::int(-7), Expr::int(2));
        assert_eq!(r.eval(&Valuation::new()), Some(LitValue::Int(-1)));
        assert_eq!(Expr::div(Expr::int(1), Expr::int(0)).eval(&Valuation::new()), None);
    }

    #[test]
    fn unbound_variables_make_results_unknown() {
        let x = VarDecl::int("x");
        let e = Expr::lt(Expr::var(&x), Expr::int(3));
        assert_eq!(e.eval(&Valuation::new()), None);
        let val = Valuation::new().with(x, LitValue::Int(2));
        assert_eq!(e.eval(&val), Some(LitValue::Bool(true)));
    }

    #[test]
    fn connectives_short_circuit_on_unknowns() {
        let x = VarDecl::int("x");
        let unknown = Expr::lt(Expr::var(&x), Expr::int(3));
        let and = Expr::and(vec![unknown.clone(), Expr::false_()]);
        assert_eq!(and.eval(&Valuation::new()), Some(LitValue::Bool(false)));
        let or = Expr::or(vec![unknown.clone(), Expr::true_()]);
        assert_eq!(or.eval(&Valuation::new()), Some(LitValue::Bool(true)));
        assert_eq!(Expr::and(vec![unknown, Expr::true_()]).eval(&Valuation::new()), None);
    }

    #[test]
    fn bitvectors_wrap_around() {
        let b = VarDecl::new("b", Type::bv(4));
        let val = Valuation::new().with(b.clone(), LitValue::bv(4, 15));
        let sum = Expr::add(vec![Expr::var(&b), Expr::lit(LitValue::bv(4, 1))]);
        assert_eq!(sum.eval(&val), Some(LitValue::bv(4, 0)));
        let hi = Expr::extract(Expr::var(&b), 3, 2);
        assert_eq!(hi.eval(&val), Some(LitValue::bv(2, 3)));
        let cat = Expr::nary(NaryOp::Concat, vec![hi, Expr::lit(LitValue::bv(2, 1))]);
        assert_eq!(cat.eval(&val), Some(LitValue::bv(4, 13)));
    }

    #[test]
    fn rat_to_int_floors() {
        let r = |n, d| Expr::lit(LitValue::Rat(Rational64::new(n, d)));
        assert_eq!(Expr::rat_to_int(r(7, 2)).eval(&Valuation::new()), Some(LitValue::Int(3)));
        assert_eq!(Expr::rat_to_int(r(-7, 2)).eval(&Valuation::new()), Some(LitValue::Int(-4)));
    }

    #[test]
    fn fp_assign_compares_bit_patterns() {
        let f = |bits: u32| {
            Expr::lit(LitValue::Float {
                exp: 8,
                sig: 24,
                bits: BigUint::from(bits),
            })
        };
        let nan = 0x7fc0_0000;
        assert_eq!(Expr::fp_assign(f(nan), f(nan)).eval(&Valuation::new()), Some(LitValue::Bool(true)));
        let (pos_zero, neg_zero) = (0, 0x8000_0000);
        assert_eq!(
            Expr::fp_assign(f(pos_zero), f(neg_zero)).eval(&Valuation::new()),
            Some(LitValue::Bool(false))
        );
    }
}
