use num::{BigUint, One, Zero};

use crate::sorts::SmtSort;
use crate::terms::{SmtOp, SmtTerm};

/// Print an SmtTerm as SMT-LIB2 format.
pub fn to_smtlib(term: &SmtTerm) -> String {
    match term {
        SmtTerm::Var(name) => symbol(name),
        SmtTerm::IntLit(n) => {
            if *n < 0 {
                format!("(- {})", n.unsigned_abs())
            } else {
                n.to_string()
            }
        }
        SmtTerm::BoolLit(b) => {
            if *b {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        SmtTerm::RealLit(r) => {
            let num = r.numer().unsigned_abs();
            let den = r.denom().unsigned_abs();
            let magnitude = if den == 1 {
                format!("{num}.0")
            } else {
                format!("(/ {num}.0 {den}.0)")
            };
            if *r.numer() < 0 {
                format!("(- {magnitude})")
            } else {
                magnitude
            }
        }
        SmtTerm::BvLit { width, value } => format!("#b{}", bits(value, *width)),
        SmtTerm::FpLit { exp, sig, bits: packed } => {
            let frac_width = sig.saturating_sub(1);
            let frac = packed & mask(frac_width);
            let exponent = (packed >> frac_width as usize) & mask(*exp);
            let sign = (packed >> (frac_width + exp) as usize) & BigUint::one();
            format!(
                "(fp #b{} #b{} #b{})",
                bits(&sign, 1),
                bits(&exponent, *exp),
                bits(&frac, frac_width)
            )
        }
        SmtTerm::RoundingMode(rm) => rm.smtlib_name().to_string(),
        SmtTerm::Add(lhs, rhs) => format!("(+ {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::Sub(lhs, rhs) => format!("(- {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::Mul(lhs, rhs) => format!("(* {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::Eq(lhs, rhs) => format!("(= {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::Lt(lhs, rhs) => format!("(< {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::Le(lhs, rhs) => format!("(<= {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::Gt(lhs, rhs) => format!("(> {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::Ge(lhs, rhs) => format!("(>= {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::And(terms) => {
            if terms.is_empty() {
                "true".to_string()
            } else if terms.len() == 1 {
                to_smtlib(&terms[0])
            } else {
                let inner: Vec<String> = terms.iter().map(to_smtlib).collect();
                format!("(and {})", inner.join(" "))
            }
        }
        SmtTerm::Or(terms) => {
            if terms.is_empty() {
                "false".to_string()
            } else if terms.len() == 1 {
                to_smtlib(&terms[0])
            } else {
                let inner: Vec<String> = terms.iter().map(to_smtlib).collect();
                format!("(or {})", inner.join(" "))
            }
        }
        SmtTerm::Not(inner) => format!("(not {})", to_smtlib(inner)),
        SmtTerm::Implies(lhs, rhs) => {
            format!("(=> {} {})", to_smtlib(lhs), to_smtlib(rhs))
        }
        SmtTerm::ForAll(bindings, body) => {
            format!("(forall ({}) {})", print_bindings(bindings), to_smtlib(body))
        }
        SmtTerm::Exists(bindings, body) => {
            format!("(exists ({}) {})", print_bindings(bindings), to_smtlib(body))
        }
        SmtTerm::Ite(cond, then, els) => {
            format!(
                "(ite {} {} {})",
                to_smtlib(cond),
                to_smtlib(then),
                to_smtlib(els)
            )
        }
        SmtTerm::App(op, args) => {
            let inner: Vec<String> = args.iter().map(to_smtlib).collect();
            if inner.is_empty() {
                op_to_smtlib(op)
            } else {
                format!("({} {})", op_to_smtlib(op), inner.join(" "))
            }
        }
    }
}

fn print_bindings(bindings: &[(String, SmtSort)]) -> String {
    let vars: Vec<String> = bindings
        .iter()
        .map(|(n, s)| format!("({} {s})", symbol(n)))
        .collect();
    vars.join(" ")
}

/// Operator head, including the `(_ ...)` wrapper of indexed operators.
pub fn op_to_smtlib(op: &SmtOp) -> String {
    let simple = match op {
        SmtOp::Neg => "-",
        SmtOp::IntDiv => "div",
        SmtOp::Mod => "mod",
        SmtOp::RealDiv => "/",
        SmtOp::ToReal => "to_real",
        SmtOp::ToInt => "to_int",
        SmtOp::Xor => "xor",
        SmtOp::Distinct => "distinct",
        SmtOp::Concat => "concat",
        SmtOp::BvNot => "bvnot",
        SmtOp::BvNeg => "bvneg",
        SmtOp::BvAnd => "bvand",
        SmtOp::BvOr => "bvor",
        SmtOp::BvXor => "bvxor",
        SmtOp::BvAdd => "bvadd",
        SmtOp::BvSub => "bvsub",
        SmtOp::BvMul => "bvmul",
        SmtOp::BvUDiv => "bvudiv",
        SmtOp::BvSDiv => "bvsdiv",
        SmtOp::BvURem => "bvurem",
        SmtOp::BvSRem => "bvsrem",
        SmtOp::BvSMod => "bvsmod",
        SmtOp::BvShl => "bvshl",
        SmtOp::BvLShr => "bvlshr",
        SmtOp::BvAShr => "bvashr",
        SmtOp::BvULt => "bvult",
        SmtOp::BvULe => "bvule",
        SmtOp::BvUGt => "bvugt",
        SmtOp::BvUGe => "bvuge",
        SmtOp::BvSLt => "bvslt",
        SmtOp::BvSLe => "bvsle",
        SmtOp::BvSGt => "bvsgt",
        SmtOp::BvSGe => "bvsge",
        SmtOp::FpAdd => "fp.add",
        SmtOp::FpSub => "fp.sub",
        SmtOp::FpMul => "fp.mul",
        SmtOp::FpDiv => "fp.div",
        SmtOp::FpSqrt => "fp.sqrt",
        SmtOp::FpRoundToIntegral => "fp.roundToIntegral",
        SmtOp::FpAbs => "fp.abs",
        SmtOp::FpNeg => "fp.neg",
        SmtOp::FpMin => "fp.min",
        SmtOp::FpMax => "fp.max",
        SmtOp::FpEq => "fp.eq",
        SmtOp::FpLt => "fp.lt",
        SmtOp::FpLeq => "fp.leq",
        SmtOp::FpGt => "fp.gt",
        SmtOp::FpGeq => "fp.geq",
        SmtOp::FpIsNan => "fp.isNaN",
        SmtOp::FpIsInfinite => "fp.isInfinite",
        SmtOp::Select => "select",
        SmtOp::Store => "store",
        SmtOp::Extract(hi, lo) => return format!("(_ extract {hi} {lo})"),
        SmtOp::ZeroExtend(n) => return format!("(_ zero_extend {n})"),
        SmtOp::SignExtend(n) => return format!("(_ sign_extend {n})"),
        SmtOp::RotateLeft(n) => return format!("(_ rotate_left {n})"),
        SmtOp::RotateRight(n) => return format!("(_ rotate_right {n})"),
        SmtOp::ToFp(e, s) => return format!("(_ to_fp {e} {s})"),
        SmtOp::ToFpUnsigned(e, s) => return format!("(_ to_fp_unsigned {e} {s})"),
        SmtOp::FpToUbv(w) => return format!("(_ fp.to_ubv {w})"),
        SmtOp::FpToSbv(w) => return format!("(_ fp.to_sbv {w})"),
        SmtOp::Uf(name) => return symbol(name),
    };
    simple.to_string()
}

/// Print a sort as SMT-LIB2 format.
pub fn sort_to_smtlib(sort: &SmtSort) -> String {
    sort.to_string()
}

/// A symbol, `|quoted|` unless it is a plain SMT-LIB simple symbol.
pub fn symbol(name: &str) -> String {
    const EXTRA: &str = "~!@$%^&*_-+=<>.?/";
    let mut chars = name.chars();
    let simple = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || EXTRA.contains(c) => {
            chars.all(|c| c.is_ascii_alphanumeric() || EXTRA.contains(c))
        }
        _ => false,
    };
    if simple {
        name.to_string()
    } else {
        format!("|{}|", name.replace(|c: char| c == '|' || c == '\\', "_"))
    }
}

fn mask(width: u32) -> BigUint {
    (BigUint::one() << width as usize) - BigUint::one()
}

fn bits(value: &BigUint, width: u32) -> String {
    let raw = if value.is_zero() {
        String::new()
    } else {
        value.to_str_radix(2)
    };
    format!("{raw:0>width$}", width = width as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::rational::Rational64;

    #[test]
    fn print_simple_term() {
        let term = SmtTerm::var("x").add(SmtTerm::int(1)).ge(SmtTerm::int(0));
        assert_eq!(to_smtlib(&term), "(>= (+ x 1) 0)");
    }

    #[test]
    fn print_and_term() {
        let term = SmtTerm::and(vec![
            SmtTerm::var("a").gt(SmtTerm::int(0)),
            SmtTerm::var("b").lt(SmtTerm::int(10)),
        ]);
        assert_eq!(to_smtlib(&term), "(and (> a 0) (< b 10))");
    }

    #[test]
    fn indexed_symbols_are_quoted() {
        assert_eq!(symbol("x#3"), "|x#3|");
        assert_eq!(symbol("x_3"), "x_3");
        assert_eq!(symbol("3x"), "|3x|");
    }

    #[test]
    fn print_literals_of_every_theory() {
        assert_eq!(to_smtlib(&SmtTerm::int(-7)), "(- 7)");
        assert_eq!(
            to_smtlib(&SmtTerm::RealLit(Rational64::new(-3, 2))),
            "(- (/ 3.0 2.0))"
        );
        assert_eq!(
            to_smtlib(&SmtTerm::BvLit {
                width: 4,
                value: BigUint::from(5u32)
            }),
            "#b0101"
        );
        // -1.5 in binary16: sign 1, exponent 01111, fraction 1000000000
        assert_eq!(
            to_smtlib(&SmtTerm::FpLit {
                exp: 5,
                sig: 11,
                bits: BigUint::from(0xbe00u32)
            }),
            "(fp #b1 #b01111 #b1000000000)"
        );
    }

    #[test]
    fn print_indexed_operator() {
        let term = SmtTerm::app(SmtOp::Extract(7, 4), vec![SmtTerm::var("b")]);
        assert_eq!(to_smtlib(&term), "((_ extract 7 4) b)");
        let sort = SmtSort::Array(Box::new(SmtSort::Int), Box::new(SmtSort::BitVec(8)));
        assert_eq!(sort_to_smtlib(&sort), "(Array Int (_ BitVec 8))");
    }
}
