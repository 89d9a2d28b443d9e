use num::rational::Rational64;
use num::BigUint;

use crate::sorts::SmtSort;

/// Abstract SMT term representation, solver-agnostic.
///
/// The core arithmetic and boolean shapes have dedicated variants; the rest of
/// the theory catalog (bitvectors, floats, arrays, uninterpreted functions) is
/// carried by [`SmtTerm::App`].
#[derive(Debug, Clone, PartialEq)]
pub enum SmtTerm {
    /// Variable reference by name.
    Var(String),
    /// Integer literal.
    IntLit(i64),
    /// Boolean literal.
    BoolLit(bool),
    RealLit(Rational64),
    BvLit {
        width: u32,
        value: BigUint,
    },
    /// Packed IEEE-754 bits.
    FpLit {
        exp: u32,
        sig: u32,
        bits: BigUint,
    },
    RoundingMode(SmtRoundingMode),

    // Arithmetic (Int or Real)
    Add(Box<SmtTerm>, Box<SmtTerm>),
    Sub(Box<SmtTerm>, Box<SmtTerm>),
    Mul(Box<SmtTerm>, Box<SmtTerm>),

    // Comparison
    Eq(Box<SmtTerm>, Box<SmtTerm>),
    Lt(Box<SmtTerm>, Box<SmtTerm>),
    Le(Box<SmtTerm>, Box<SmtTerm>),
    Gt(Box<SmtTerm>, Box<SmtTerm>),
    Ge(Box<SmtTerm>, Box<SmtTerm>),

    // Boolean logic
    And(Vec<SmtTerm>),
    Or(Vec<SmtTerm>),
    Not(Box<SmtTerm>),
    Implies(Box<SmtTerm>, Box<SmtTerm>),

    // Quantifiers
    ForAll(Vec<(String, SmtSort)>, Box<SmtTerm>),
    Exists(Vec<(String, SmtSort)>, Box<SmtTerm>),

    // If-then-else
    Ite(Box<SmtTerm>, Box<SmtTerm>, Box<SmtTerm>),

    /// Application of any other theory operator.
    App(SmtOp, Vec<SmtTerm>),
}

/// SMT-LIB rounding modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmtRoundingMode {
    Rne,
    Rna,
    Rtp,
    Rtn,
    Rtz,
}

impl SmtRoundingMode {
    pub fn smtlib_name(self) -> &'static str {
        match self {
            SmtRoundingMode::Rne => "RNE",
            SmtRoundingMode::Rna => "RNA",
            SmtRoundingMode::Rtp => "RTP",
            SmtRoundingMode::Rtn => "RTN",
            SmtRoundingMode::Rtz => "RTZ",
        }
    }
}

/// Theory operators beyond the dedicated [`SmtTerm`] variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SmtOp {
    Neg,
    IntDiv,
    Mod,
    RealDiv,
    ToReal,
    ToInt,
    Xor,
    Distinct,

    Concat,
    Extract(u32, u32),
    ZeroExtend(u32),
    SignExtend(u32),
    RotateLeft(u32),
    RotateRight(u32),
    BvNot,
    BvNeg,
    BvAnd,
    BvOr,
    BvXor,
    BvAdd,
    BvSub,
    BvMul,
    BvUDiv,
    BvSDiv,
    BvURem,
    BvSRem,
    BvSMod,
    BvShl,
    BvLShr,
    BvAShr,
    BvULt,
    BvULe,
    BvUGt,
    BvUGe,
    BvSLt,
    BvSLe,
    BvSGt,
    BvSGe,

    FpAdd,
    FpSub,
    FpMul,
    FpDiv,
    FpSqrt,
    FpRoundToIntegral,
    FpAbs,
    FpNeg,
    FpMin,
    FpMax,
    FpEq,
    FpLt,
    FpLeq,
    FpGt,
    FpGeq,
    FpIsNan,
    FpIsInfinite,
    /// From a signed bitvector (with rounding mode) or another float.
    ToFp(u32, u32),
    ToFpUnsigned(u32, u32),
    FpToUbv(u32),
    FpToSbv(u32),

    Select,
    Store,

    /// Uninterpreted function by name.
    Uf(String),
}

#[allow(clippy::should_implement_trait)]
impl SmtTerm {
    pub fn var(name: impl Into<String>) -> Self {
        SmtTerm::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        SmtTerm::IntLit(n)
    }

    pub fn bool(b: bool) -> Self {
        SmtTerm::BoolLit(b)
    }

    pub fn app(op: SmtOp, args: Vec<SmtTerm>) -> Self {
        SmtTerm::App(op, args)
    }

    pub fn add(self, other: SmtTerm) -> Self {
        SmtTerm::Add(Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: SmtTerm) -> Self {
        SmtTerm::Sub(Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: SmtTerm) -> Self {
        SmtTerm::Mul(Box::new(self), Box::new(other))
    }

    pub fn eq(self, other: SmtTerm) -> Self {
        SmtTerm::Eq(Box::new(self), Box::new(other))
    }

    pub fn lt(self, other: SmtTerm) -> Self {
        SmtTerm::Lt(Box::new(self), Box::new(other))
    }

    pub fn le(self, other: SmtTerm) -> Self {
        SmtTerm::Le(Box::new(self), Box::new(other))
    }

    pub fn gt(self, other: SmtTerm) -> Self {
        SmtTerm::Gt(Box::new(self), Box::new(other))
    }

    pub fn ge(self, other: SmtTerm) -> Self {
        SmtTerm::Ge(Box::new(self), Box::new(other))
    }

    pub fn and(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::And(terms)
    }

    pub fn or(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::Or(terms)
    }

    pub fn not(self) -> Self {
        SmtTerm::Not(Box::new(self))
    }

    pub fn implies(self, other: SmtTerm) -> Self {
        SmtTerm::Implies(Box::new(self), Box::new(other))
    }

    pub fn ite(self, then: SmtTerm, els: SmtTerm) -> Self {
        SmtTerm::Ite(Box::new(self), Box::new(then), Box::new(els))
    }
}
