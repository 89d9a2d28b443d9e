use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::decl::{Decl, FuncDecl, VarDecl};
use crate::literal::LitValue;
use crate::types::{RoundingMode, Type};

/// An immutable, shareable expression tree.
///
/// The node type and a structural hash are computed once at construction, so
/// hashing and cloning are O(1) and equality short-circuits on pointer identity
/// or hash mismatch before falling back to a structural comparison.
#[derive(Clone)]
pub struct Expr(Arc<ExprNode>);

struct ExprNode {
    kind: ExprKind,
    ty: Type,
    hash: u64,
}

/// The closed catalog of expression kinds.
///
/// Generic arithmetic and comparison operators (`Add`, `Lt`, `Div`, ...) are
/// interpreted according to the type of their operands: integers and rationals
/// use their arithmetic meaning, bitvectors use two's complement with the signed
/// reading for `Div`, `Mod`, `Rem` and the orderings, floats support only the
/// comparisons and `Neg` (rounded arithmetic goes through [`ExprKind::FpRounded`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Lit(LitValue),
    Ref(Decl),
    /// Value of the wrapped expression in the next step.
    Prime(Expr),
    Ite(Expr, Expr, Expr),
    Unary(UnaryOp, Expr),
    Binary(BinaryOp, Expr, Expr),
    Nary(NaryOp, Vec<Expr>),
    Quantified(Quantifier, Vec<VarDecl>, Expr),
    Extract {
        op: Expr,
        hi: u32,
        lo: u32,
    },
    /// Zero or sign extension up to `width` bits.
    Extend {
        op: Expr,
        signed: bool,
        width: u32,
    },
    FpRounded {
        op: FpRoundedOp,
        rm: RoundingMode,
        args: Vec<Expr>,
    },
    FpFromBv {
        op: Expr,
        signed: bool,
        rm: RoundingMode,
        exp: u32,
        sig: u32,
    },
    FpToBv {
        op: Expr,
        signed: bool,
        rm: RoundingMode,
        width: u32,
    },
    FpToFp {
        op: Expr,
        rm: RoundingMode,
        exp: u32,
        sig: u32,
    },
    ArrayRead {
        array: Expr,
        index: Expr,
    },
    ArrayWrite {
        array: Expr,
        index: Expr,
        value: Expr,
    },
    ArrayLit {
        elems: Vec<(LitValue, LitValue)>,
        default: LitValue,
        ty: Type,
    },
    ArrayInit {
        elems: Vec<(Expr, Expr)>,
        default: Expr,
        ty: Type,
    },
    App(FuncDecl, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Quantifier {
    Exists,
    Forall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnaryOp {
    Not,
    Pos,
    Neg,
    BvNot,
    FpAbs,
    FpIsNan,
    FpIsInfinite,
    IntToRat,
    /// Floor of a rational.
    RatToInt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinaryOp {
    Imply,
    Iff,
    Xor,
    Eq,
    Neq,
    Sub,
    Div,
    Mod,
    Rem,
    Lt,
    Leq,
    Gt,
    Geq,
    BvShl,
    BvAShr,
    BvLShr,
    BvRotateLeft,
    BvRotateRight,
    BvULt,
    BvULeq,
    BvUGt,
    BvUGeq,
    BvSLt,
    BvSLeq,
    BvSGt,
    BvSGeq,
    BvUDiv,
    BvURem,
    FpRem,
    FpMin,
    FpMax,
    /// Bit-level equality of floats; unlike `Eq`, NaN equals itself and `+0` differs from `-0`.
    FpAssign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NaryOp {
    And,
    Or,
    Add,
    Mul,
    BvAnd,
    BvOr,
    BvXor,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FpRoundedOp {
    Add,
    Sub,
    Mul,
    Div,
    Sqrt,
    RoundToIntegral,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Pos => "+",
            UnaryOp::Neg => "-",
            UnaryOp::BvNot => "bvnot",
            UnaryOp::FpAbs => "fpabs",
            UnaryOp::FpIsNan => "fpisnan",
            UnaryOp::FpIsInfinite => "fpisinfinite",
            UnaryOp::IntToRat => "to_rat",
            UnaryOp::RatToInt => "to_int",
        }
    }
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Imply => "=>",
            BinaryOp::Iff => "iff",
            BinaryOp::Xor => "xor",
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "/=",
            BinaryOp::Sub => "-",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Rem => "rem",
            BinaryOp::Lt => "<",
            BinaryOp::Leq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Geq => ">=",
            BinaryOp::BvShl => "bvshl",
            BinaryOp::BvAShr => "bvashr",
            BinaryOp::BvLShr => "bvlshr",
            BinaryOp::BvRotateLeft => "bvrol",
            BinaryOp::BvRotateRight => "bvror",
            BinaryOp::BvULt => "bvult",
            BinaryOp::BvULeq => "bvule",
            BinaryOp::BvUGt => "bvugt",
            BinaryOp::BvUGeq => "bvuge",
            BinaryOp::BvSLt => "bvslt",
            BinaryOp::BvSLeq => "bvsle",
            BinaryOp::BvSGt => "bvsgt",
            BinaryOp::BvSGeq => "bvsge",
            BinaryOp::BvUDiv => "bvudiv",
            BinaryOp::BvURem => "bvurem",
            BinaryOp::FpRem => "fprem",
            BinaryOp::FpMin => "fpmin",
            BinaryOp::FpMax => "fpmax",
            BinaryOp::FpAssign => "fpassign",
        }
    }

    pub fn is_predicate(self) -> bool {
        matches!(
            self,
            BinaryOp::Imply
                | BinaryOp::Iff
                | BinaryOp::Xor
                | BinaryOp::Eq
                | BinaryOp::Neq
                | BinaryOp::Lt
                | BinaryOp::Leq
                | BinaryOp::Gt
                | BinaryOp::Geq
                | BinaryOp::BvULt
                | BinaryOp::BvULeq
                | BinaryOp::BvUGt
                | BinaryOp::BvUGeq
                | BinaryOp::BvSLt
                | BinaryOp::BvSLeq
                | BinaryOp::BvSGt
                | BinaryOp::BvSGeq
                | BinaryOp::FpAssign
        )
    }
}

impl NaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            NaryOp::And => "and",
            NaryOp::Or => "or",
            NaryOp::Add => "+",
            NaryOp::Mul => "*",
            NaryOp::BvAnd => "bvand",
            NaryOp::BvOr => "bvor",
            NaryOp::BvXor => "bvxor",
            NaryOp::Concat => "concat",
        }
    }
}

impl FpRoundedOp {
    pub fn symbol(self) -> &'static str {
        match self {
            FpRoundedOp::Add => "fpadd",
            FpRoundedOp::Sub => "fpsub",
            FpRoundedOp::Mul => "fpmul",
            FpRoundedOp::Div => "fpdiv",
            FpRoundedOp::Sqrt => "fpsqrt",
            FpRoundedOp::RoundToIntegral => "fproundtoint",
        }
    }
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        let ty = infer_type(&kind);
        let mut hasher = DefaultHasher::new();
        kind.hash(&mut hasher);
        let hash = hasher.finish();
        Expr(Arc::new(ExprNode { kind, ty, hash }))
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    pub fn ty(&self) -> &Type {
        &self.0.ty
    }

    pub fn structural_hash(&self) -> u64 {
        self.0.hash
    }

    // Leaves

    pub fn lit(value: LitValue) -> Self {
        Expr::new(ExprKind::Lit(value))
    }

    pub fn int(n: i64) -> Self {
        Expr::lit(LitValue::Int(n))
    }

    pub fn bool(b: bool) -> Self {
        Expr::lit(LitValue::Bool(b))
    }

    pub fn true_() -> Self {
        Expr::bool(true)
    }

    pub fn false_() -> Self {
        Expr::bool(false)
    }

    pub fn var(decl: &VarDecl) -> Self {
        Expr::new(ExprKind::Ref(Decl::Var(decl.clone())))
    }

    pub fn param(decl: &VarDecl) -> Self {
        Expr::new(ExprKind::Ref(Decl::Param(decl.clone())))
    }

    pub fn indexed(decl: &VarDecl, index: u32) -> Self {
        Expr::new(ExprKind::Ref(Decl::Indexed(decl.clone(), index)))
    }

    pub fn prime(op: Expr) -> Self {
        Expr::new(ExprKind::Prime(op))
    }

    /// Wraps `op` in `n` primes.
    pub fn primed(op: Expr, n: u32) -> Self {
        (0..n).fold(op, |e, _| Expr::prime(e))
    }

    pub fn ite(cond: Expr, then: Expr, els: Expr) -> Self {
        Expr::new(ExprKind::Ite(cond, then, els))
    }

    // Operators

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::new(ExprKind::Unary(op, operand))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::new(ExprKind::Binary(op, lhs, rhs))
    }

    pub fn nary(op: NaryOp, ops: Vec<Expr>) -> Self {
        Expr::new(ExprKind::Nary(op, ops))
    }

    pub fn not(op: Expr) -> Self {
        Expr::unary(UnaryOp::Not, op)
    }

    pub fn neg(op: Expr) -> Self {
        Expr::unary(UnaryOp::Neg, op)
    }

    pub fn and(ops: Vec<Expr>) -> Self {
        Expr::nary(NaryOp::And, ops)
    }

    pub fn or(ops: Vec<Expr>) -> Self {
        Expr::nary(NaryOp::Or, ops)
    }

    pub fn imply(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Imply, lhs, rhs)
    }

    pub fn iff(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Iff, lhs, rhs)
    }

    pub fn eq(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Eq, lhs, rhs)
    }

    pub fn neq(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Neq, lhs, rhs)
    }

    pub fn add(ops: Vec<Expr>) -> Self {
        Expr::nary(NaryOp::Add, ops)
    }

    pub fn mul(ops: Vec<Expr>) -> Self {
        Expr::nary(NaryOp::Mul, ops)
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Sub, lhs, rhs)
    }

    pub fn div(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Div, lhs, rhs)
    }

    pub fn modulo(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Mod, lhs, rhs)
    }

    pub fn rem(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Rem, lhs, rhs)
    }

    pub fn lt(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Lt, lhs, rhs)
    }

    pub fn leq(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Leq, lhs, rhs)
    }

    pub fn gt(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Gt, lhs, rhs)
    }

    pub fn geq(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Geq, lhs, rhs)
    }

    pub fn rat_to_int(op: Expr) -> Self {
        Expr::unary(UnaryOp::RatToInt, op)
    }

    /// Bit-pattern equality of two floats.
    pub fn fp_assign(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::FpAssign, lhs, rhs)
    }

    pub fn exists(params: Vec<VarDecl>, body: Expr) -> Self {
        Expr::new(ExprKind::Quantified(Quantifier::Exists, params, body))
    }

    pub fn forall(params: Vec<VarDecl>, body: Expr) -> Self {
        Expr::new(ExprKind::Quantified(Quantifier::Forall, params, body))
    }

    pub fn extract(op: Expr, hi: u32, lo: u32) -> Self {
        Expr::new(ExprKind::Extract { op, hi, lo })
    }

    pub fn zero_extend(op: Expr, width: u32) -> Self {
        Expr::new(ExprKind::Extend {
            op,
            signed: false,
            width,
        })
    }

    pub fn sign_extend(op: Expr, width: u32) -> Self {
        Expr::new(ExprKind::Extend {
            op,
            signed: true,
            width,
        })
    }

    pub fn fp_rounded(op: FpRoundedOp, rm: RoundingMode, args: Vec<Expr>) -> Self {
        Expr::new(ExprKind::FpRounded { op, rm, args })
    }

    pub fn read(array: Expr, index: Expr) -> Self {
        Expr::new(ExprKind::ArrayRead { array, index })
    }

    pub fn write(array: Expr, index: Expr, value: Expr) -> Self {
        Expr::new(ExprKind::ArrayWrite {
            array,
            index,
            value,
        })
    }

    pub fn app(func: FuncDecl, args: Vec<Expr>) -> Self {
        Expr::new(ExprKind::App(func, args))
    }

    /// Conjunction that collapses the trivial cases.
    pub fn and_all(ops: impl IntoIterator<Item = Expr>) -> Self {
        let mut ops: Vec<Expr> = ops
            .into_iter()
            .filter(|e| e.as_bool_lit() != Some(true))
            .collect();
        match ops.len() {
            0 => Expr::true_(),
            1 => ops.pop().unwrap_or_else(Expr::true_),
            _ => Expr::and(ops),
        }
    }

    pub fn as_lit(&self) -> Option<&LitValue> {
        match self.kind() {
            ExprKind::Lit(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool_lit(&self) -> Option<bool> {
        self.as_lit().and_then(LitValue::as_bool)
    }

    /// Direct sub-expressions in evaluation order.
    pub fn children(&self) -> Vec<&Expr> {
        match self.kind() {
            ExprKind::Lit(_) | ExprKind::Ref(_) | ExprKind::ArrayLit { .. } => Vec::new(),
            ExprKind::Prime(op)
            | ExprKind::Unary(_, op)
            | ExprKind::Quantified(_, _, op)
            | ExprKind::Extract { op, .. }
            | ExprKind::Extend { op, .. }
            | ExprKind::FpFromBv { op, .. }
            | ExprKind::FpToBv { op, .. }
            | ExprKind::FpToFp { op, .. } => vec![op],
            ExprKind::Ite(c, t, e) => vec![c, t, e],
            ExprKind::Binary(_, l, r) => vec![l, r],
            ExprKind::ArrayRead { array, index } => vec![array, index],
            ExprKind::ArrayWrite {
                array,
                index,
                value,
            } => vec![array, index, value],
            ExprKind::Nary(_, ops) | ExprKind::FpRounded { args: ops, .. } | ExprKind::App(_, ops) => {
                ops.iter().collect()
            }
            ExprKind::ArrayInit { elems, default, .. } => {
                let mut out: Vec<&Expr> = elems.iter().flat_map(|(i, v)| [i, v]).collect();
                out.push(default);
                out
            }
        }
    }

    /// Rebuilds this node with every direct child replaced by `f(child)`.
    pub fn map_children(&self, mut f: impl FnMut(&Expr) -> Expr) -> Expr {
        let kind = match self.kind() {
            ExprKind::Lit(_) | ExprKind::Ref(_) | ExprKind::ArrayLit { .. } => return self.clone(),
            ExprKind::Prime(op) => ExprKind::Prime(f(op)),
            ExprKind::Ite(c, t, e) => ExprKind::Ite(f(c), f(t), f(e)),
            ExprKind::Unary(o, op) => ExprKind::Unary(*o, f(op)),
            ExprKind::Binary(o, l, r) => ExprKind::Binary(*o, f(l), f(r)),
            ExprKind::Nary(o, ops) => ExprKind::Nary(*o, ops.iter().map(&mut f).collect()),
            ExprKind::Quantified(q, params, body) => ExprKind::Quantified(*q, params.clone(), f(body)),
            ExprKind::Extract { op, hi, lo } => ExprKind::Extract {
                op: f(op),
                hi: *hi,
                lo: *lo,
            },
            ExprKind::Extend { op, signed, width } => ExprKind::Extend {
                op: f(op),
                signed: *signed,
                width: *width,
            },
            ExprKind::FpRounded { op, rm, args } => ExprKind::FpRounded {
                op: *op,
                rm: *rm,
                args: args.iter().map(&mut f).collect(),
            },
            ExprKind::FpFromBv {
                op,
                signed,
                rm,
                exp,
                sig,
            } => ExprKind::FpFromBv {
                op: f(op),
                signed: *signed,
                rm: *rm,
                exp: *exp,
                sig: *sig,
            },
            ExprKind::FpToBv {
                op,
                signed,
                rm,
                width,
            } => ExprKind::FpToBv {
                op: f(op),
                signed: *signed,
                rm: *rm,
                width: *width,
            },
            ExprKind::FpToFp { op, rm, exp, sig } => ExprKind::FpToFp {
                op: f(op),
                rm: *rm,
                exp: *exp,
                sig: *sig,
            },
            ExprKind::ArrayRead { array, index } => ExprKind::ArrayRead {
                array: f(array),
                index: f(index),
            },
            ExprKind::ArrayWrite {
                array,
                index,
                value,
            } => ExprKind::ArrayWrite {
                array: f(array),
                index: f(index),
                value: f(value),
            },
            ExprKind::ArrayInit { elems, default, ty } => ExprKind::ArrayInit {
                elems: elems.iter().map(|(i, v)| (f(i), f(v))).collect(),
                default: f(default),
                ty: ty.clone(),
            },
            ExprKind::App(func, args) => ExprKind::App(func.clone(), args.iter().map(&mut f).collect()),
        };
        Expr::new(kind)
    }

    /// State variables referenced anywhere below this node, ignoring step indices.
    pub fn vars(&self) -> BTreeSet<VarDecl> {
        let mut out = BTreeSet::new();
        collect_vars(self, &mut out);
        out
    }
}

fn collect_vars(expr: &Expr, out: &mut BTreeSet<VarDecl>) {
    match expr.kind() {
        ExprKind::Ref(Decl::Var(v)) | ExprKind::Ref(Decl::Indexed(v, _)) => {
            out.insert(v.clone());
        }
        _ => {
            for child in expr.children() {
                collect_vars(child, out);
            }
        }
    }
}

fn infer_type(kind: &ExprKind) -> Type {
    match kind {
        ExprKind::Lit(v) => v.ty(),
        ExprKind::Ref(d) => d.ty().clone(),
        ExprKind::Prime(op) => op.ty().clone(),
        ExprKind::Ite(_, then, _) => then.ty().clone(),
        ExprKind::Unary(op, operand) => match op {
            UnaryOp::Not | UnaryOp::FpIsNan | UnaryOp::FpIsInfinite => Type::Bool,
            UnaryOp::IntToRat => Type::Rat,
            UnaryOp::RatToInt => Type::Int,
            UnaryOp::Pos | UnaryOp::Neg | UnaryOp::BvNot | UnaryOp::FpAbs => operand.ty().clone(),
        },
        ExprKind::Binary(op, lhs, _) => {
            if op.is_predicate() {
                Type::Bool
            } else {
                lhs.ty().clone()
            }
        }
        ExprKind::Nary(op, ops) => match op {
            NaryOp::And | NaryOp::Or => Type::Bool,
            NaryOp::Concat => Type::BitVec {
                width: ops.iter().filter_map(|e| e.ty().bv_width()).sum(),
            },
            NaryOp::Add | NaryOp::Mul | NaryOp::BvAnd | NaryOp::BvOr | NaryOp::BvXor => {
                ops.first().map_or(Type::Int, |e| e.ty().clone())
            }
        },
        ExprKind::Quantified(..) => Type::Bool,
        ExprKind::Extract { hi, lo, .. } => Type::BitVec {
            width: hi.saturating_sub(*lo) + 1,
        },
        ExprKind::Extend { width, .. } => Type::BitVec { width: *width },
        ExprKind::FpRounded { args, .. } => args
            .first()
            .map_or(Type::Float { exp: 8, sig: 24 }, |e| e.ty().clone()),
        ExprKind::FpFromBv { exp, sig, .. } | ExprKind::FpToFp { exp, sig, .. } => Type::Float {
            exp: *exp,
            sig: *sig,
        },
        ExprKind::FpToBv { width, .. } => Type::BitVec { width: *width },
        ExprKind::ArrayRead { array, .. } => match array.ty() {
            Type::Array { elem, .. } => (**elem).clone(),
            other => other.clone(),
        },
        ExprKind::ArrayWrite { array, .. } => array.ty().clone(),
        ExprKind::ArrayLit { ty, .. } | ExprKind::ArrayInit { ty, .. } => ty.clone(),
        ExprKind::App(func, _) => func.ret.clone(),
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || (self.0.hash == other.0.hash && self.0.kind == other.0.kind)
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, head: &str, ops: &[&Expr]) -> fmt::Result {
    write!(f, "({head}")?;
    for op in ops {
        write!(f, " {op}")?;
    }
    write!(f, ")")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::Lit(v) => write!(f, "{v}"),
            ExprKind::Ref(d) => write!(f, "{d}"),
            ExprKind::Prime(op) => write!(f, "(prime {op})"),
            ExprKind::Ite(c, t, e) => write!(f, "(ite {c} {t} {e})"),
            ExprKind::Unary(op, operand) => write!(f, "({} {operand})", op.symbol()),
            ExprKind::Binary(op, l, r) => write!(f, "({} {l} {r})", op.symbol()),
            ExprKind::Nary(op, ops) => write_list(f, op.symbol(), &ops.iter().collect::<Vec<_>>()),
            ExprKind::Quantified(q, params, body) => {
                let head = match q {
                    Quantifier::Exists => "exists",
                    Quantifier::Forall => "forall",
                };
                write!(f, "({head} (")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "({} {})", p.name, p.ty)?;
                }
                write!(f, ") {body})")
            }
            ExprKind::Extract { op, hi, lo } => write!(f, "(extract {op} {hi} {lo})"),
            ExprKind::Extend { op, signed, width } => {
                let head = if *signed { "sext" } else { "zext" };
                write!(f, "({head} {op} {width})")
            }
            ExprKind::FpRounded { op, rm, args } => {
                write_list(f, &format!("{} {rm}", op.symbol()), &args.iter().collect::<Vec<_>>())
            }
            ExprKind::FpFromBv {
                op,
                signed,
                rm,
                exp,
                sig,
            } => write!(f, "(fpfrombv[{exp},{sig},{}] {rm} {op})", if *signed { "s" } else { "u" }),
            ExprKind::FpToBv {
                op,
                signed,
                rm,
                width,
            } => write!(f, "(fptobv[{width},{}] {rm} {op})", if *signed { "s" } else { "u" }),
            ExprKind::FpToFp { op, rm, exp, sig } => write!(f, "(fptofp[{exp},{sig}] {rm} {op})"),
            ExprKind::ArrayRead { array, index } => write!(f, "(read {array} {index})"),
            ExprKind::ArrayWrite {
                array,
                index,
                value,
            } => write!(f, "(write {array} {index} {value})"),
            ExprKind::ArrayLit { elems, default, .. } => {
                write!(f, "(array")?;
                for (i, v) in elems {
                    write!(f, " ({i} {v})")?;
                }
                write!(f, " (default {default}))")
            }
            ExprKind::ArrayInit { elems, default, .. } => {
                write!(f, "(arrayinit")?;
                for (i, v) in elems {
                    write!(f, " ({i} {v})")?;
                }
                write!(f, " (default {default}))")
            }
            ExprKind::App(func, args) => write_list(f, &func.name, &args.iter().collect::<Vec<_>>()),
        }
    }
}
