//! Translation of IR expressions into portable SMT terms, and of solver
//! models back into valuations.
//!
//! [`ExprEncoder::encode`] is a single exhaustive match over [`ExprKind`].
//! Kinds the portable catalog cannot express fail with
//! [`EncodeError::UnsupportedOperation`]; nothing is approximated. Results are
//! memoized in a bounded least-recently-used cache keyed by expression.

use std::collections::HashMap;

use argus_ir::{
    BinaryOp, Decl, Expr, ExprKind, FpRoundedOp, LitValue, NaryOp, Quantifier, RoundingMode,
    Type, UnaryOp, Valuation, VarDecl, VarIndexing,
};
use indexmap::IndexMap;
use num::rational::Rational64;
use num::{BigUint, ToPrimitive};
use thiserror::Error;
use tracing::debug;

use crate::solver::{Model, ModelValue};
use crate::sorts::SmtSort;
use crate::terms::{SmtOp, SmtRoundingMode, SmtTerm};

/// Default number of memoized translations.
pub const CACHE_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("unsupported operation: {expr}")]
    UnsupportedOperation { expr: String },
    #[error("internal invariant violated: {context}")]
    InternalInvariantViolation { context: String },
}

impl EncodeError {
    fn unsupported(expr: &Expr) -> Self {
        EncodeError::UnsupportedOperation {
            expr: expr.to_string(),
        }
    }

    fn invariant(context: impl Into<String>) -> Self {
        EncodeError::InternalInvariantViolation {
            context: context.into(),
        }
    }
}

/// A free solver-level symbol an encoded term depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Const(SmtSort),
    Fun(Vec<SmtSort>, SmtSort),
}

/// Solver symbol of a state variable at unrolling step `index`.
pub fn indexed_symbol(var: &VarDecl, index: u32) -> String {
    format!("{}#{index}", var.name)
}

/// Sort of an IR type, or `None` for function types.
pub fn sort_of(ty: &Type) -> Option<SmtSort> {
    SmtSort::of_type(ty)
}

pub fn rounding_mode(rm: RoundingMode) -> SmtRoundingMode {
    match rm {
        RoundingMode::NearestTiesToEven => SmtRoundingMode::Rne,
        RoundingMode::NearestTiesToAway => SmtRoundingMode::Rna,
        RoundingMode::TowardPositive => SmtRoundingMode::Rtp,
        RoundingMode::TowardNegative => SmtRoundingMode::Rtn,
        RoundingMode::TowardZero => SmtRoundingMode::Rtz,
    }
}

pub struct ExprEncoder {
    cache: IndexMap<Expr, SmtTerm>,
    capacity: usize,
    scopes: Vec<HashMap<VarDecl, String>>,
    fresh: usize,
    symbols: HashMap<String, Symbol>,
    hits: u64,
    misses: u64,
}

impl Default for ExprEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExprEncoder {
    pub fn new() -> Self {
        Self::with_capacity(CACHE_SIZE)
    }

    /// An encoder memoizing at most `capacity` translations; `0` disables the cache.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: IndexMap::with_capacity(capacity.min(CACHE_SIZE)),
            capacity,
            scopes: Vec::new(),
            fresh: 0,
            symbols: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// `(hits, misses)` of the translation cache since the last reset.
    pub fn cache_stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    /// Drops every memoized translation and recorded symbol.
    pub fn reset(&mut self) {
        debug!(entries = self.cache.len(), "resetting expression encoder");
        self.cache.clear();
        self.symbols.clear();
        self.scopes.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// Translates `expr` into a solver term.
    ///
    /// State variables become constants named after the variable; indexed
    /// variables are named `name#i` (see [`indexed_symbol`]). Primed
    /// expressions must have been unfolded first.
    pub fn encode(&mut self, expr: &Expr) -> Result<SmtTerm, EncodeError> {
        // Terms built under a binder mention scope-local symbols.
        let cacheable = self.scopes.is_empty() && self.capacity > 0;
        if cacheable {
            if let Some(term) = self.cache.shift_remove(expr) {
                self.cache.insert(expr.clone(), term.clone());
                self.hits += 1;
                return Ok(term);
            }
            self.misses += 1;
        }
        let term = self.translate(expr)?;
        if cacheable {
            self.cache.insert(expr.clone(), term.clone());
            if self.cache.len() > self.capacity {
                self.cache.shift_remove_index(0);
            }
        }
        Ok(term)
    }

    /// Free constants and functions `term` refers to, in first-occurrence order.
    ///
    /// Only symbols this encoder produced are reported.
    pub fn symbols_in(&self, term: &SmtTerm) -> IndexMap<String, Symbol> {
        let mut found = IndexMap::new();
        let mut bound = Vec::new();
        self.collect_symbols(term, &mut bound, &mut found);
        found
    }

    fn collect_symbols(
        &self,
        term: &SmtTerm,
        bound: &mut Vec<String>,
        found: &mut IndexMap<String, Symbol>,
    ) {
        match term {
            SmtTerm::Var(name) => {
                if !bound.contains(name) && !found.contains_key(name) {
                    if let Some(sym) = self.symbols.get(name) {
                        found.insert(name.clone(), sym.clone());
                    }
                }
            }
            SmtTerm::IntLit(_)
            | SmtTerm::BoolLit(_)
            | SmtTerm::RealLit(_)
            | SmtTerm::BvLit { .. }
            | SmtTerm::FpLit { .. }
            | SmtTerm::RoundingMode(_) => {}
            SmtTerm::Add(a, b)
            | SmtTerm::Sub(a, b)
            | SmtTerm::Mul(a, b)
            | SmtTerm::Eq(a, b)
            | SmtTerm::Lt(a, b)
            | SmtTerm::Le(a, b)
            | SmtTerm::Gt(a, b)
            | SmtTerm::Ge(a, b)
            | SmtTerm::Implies(a, b) => {
                self.collect_symbols(a, bound, found);
                self.collect_symbols(b, bound, found);
            }
            SmtTerm::And(ts) | SmtTerm::Or(ts) => {
                for t in ts {
                    self.collect_symbols(t, bound, found);
                }
            }
            SmtTerm::Not(a) => self.collect_symbols(a, bound, found),
            SmtTerm::ForAll(bindings, body) | SmtTerm::Exists(bindings, body) => {
                let depth = bound.len();
                bound.extend(bindings.iter().map(|(n, _)| n.clone()));
                self.collect_symbols(body, bound, found);
                bound.truncate(depth);
            }
            SmtTerm::Ite(c, t, e) => {
                self.collect_symbols(c, bound, found);
                self.collect_symbols(t, bound, found);
                self.collect_symbols(e, bound, found);
            }
            SmtTerm::App(op, args) => {
                if let SmtOp::Uf(name) = op {
                    if !found.contains_key(name) {
                        if let Some(sym) = self.symbols.get(name) {
                            found.insert(name.clone(), sym.clone());
                        }
                    }
                }
                for a in args {
                    self.collect_symbols(a, bound, found);
                }
            }
        }
    }

    fn record(&mut self, name: &str, symbol: Symbol) -> Result<(), EncodeError> {
        match self.symbols.get(name) {
            Some(existing) if *existing != symbol => Err(EncodeError::invariant(format!(
                "symbol {name} used as both {existing:?} and {symbol:?}"
            ))),
            Some(_) => Ok(()),
            None => {
                self.symbols.insert(name.to_string(), symbol);
                Ok(())
            }
        }
    }

    fn free_constant(&mut self, name: String, ty: &Type, expr: &Expr) -> Result<SmtTerm, EncodeError> {
        let sort = sort_of(ty).ok_or_else(|| EncodeError::unsupported(expr))?;
        self.record(&name, Symbol::Const(sort))?;
        Ok(SmtTerm::Var(name))
    }

    fn lookup_param(&self, var: &VarDecl) -> Option<&String> {
        self.scopes.iter().rev().find_map(|scope| scope.get(var))
    }

    fn encode_all(&mut self, exprs: &[Expr]) -> Result<Vec<SmtTerm>, EncodeError> {
        exprs.iter().map(|e| self.encode(e)).collect()
    }

    fn translate(&mut self, expr: &Expr) -> Result<SmtTerm, EncodeError> {
        match expr.kind() {
            ExprKind::Lit(value) => Ok(lit_term(value)),
            ExprKind::Ref(Decl::Var(v)) => self.free_constant(v.name.to_string(), &v.ty, expr),
            ExprKind::Ref(Decl::Indexed(v, i)) => self.free_constant(indexed_symbol(v, *i), &v.ty, expr),
            ExprKind::Ref(Decl::Param(v)) => self
                .lookup_param(v)
                .cloned()
                .map(SmtTerm::Var)
                .ok_or_else(|| {
                    EncodeError::invariant(format!("parameter {} is not bound by any quantifier", v.name))
                }),
            ExprKind::Prime(_) => Err(EncodeError::invariant(format!(
                "primed expression {expr} reached the encoder without unfolding"
            ))),
            ExprKind::Ite(c, t, e) => {
                let c = self.encode(c)?;
                let t = self.encode(t)?;
                let e = self.encode(e)?;
                Ok(c.ite(t, e))
            }
            ExprKind::Unary(op, a) => self.translate_unary(expr, *op, a),
            ExprKind::Binary(op, a, b) => self.translate_binary(expr, *op, a, b),
            ExprKind::Nary(op, ops) => self.translate_nary(expr, *op, ops),
            ExprKind::Quantified(q, params, body) => self.translate_quantifier(expr, *q, params, body),
            ExprKind::Extract { op, hi, lo } => {
                let t = self.encode(op)?;
                Ok(SmtTerm::app(SmtOp::Extract(*hi, *lo), vec![t]))
            }
            ExprKind::Extend { op, signed, width } => {
                let from = op.ty().bv_width().ok_or_else(|| EncodeError::unsupported(expr))?;
                let extra = width.checked_sub(from).ok_or_else(|| {
                    EncodeError::invariant(format!("extension of {from}-bit operand to {width} bits"))
                })?;
                let t = self.encode(op)?;
                let op = if *signed {
                    SmtOp::SignExtend(extra)
                } else {
                    SmtOp::ZeroExtend(extra)
                };
                Ok(SmtTerm::app(op, vec![t]))
            }
            ExprKind::FpRounded { op, rm, args } => {
                let smt_op = match op {
                    FpRoundedOp::Add => SmtOp::FpAdd,
                    FpRoundedOp::Sub => SmtOp::FpSub,
                    FpRoundedOp::Mul => SmtOp::FpMul,
                    FpRoundedOp::Div => SmtOp::FpDiv,
                    FpRoundedOp::Sqrt => SmtOp::FpSqrt,
                    FpRoundedOp::RoundToIntegral => SmtOp::FpRoundToIntegral,
                };
                let mut terms = vec![SmtTerm::RoundingMode(rounding_mode(*rm))];
                terms.extend(self.encode_all(args)?);
                Ok(SmtTerm::app(smt_op, terms))
            }
            ExprKind::FpFromBv {
                op,
                signed,
                rm,
                exp,
                sig,
            } => {
                let t = self.encode(op)?;
                let smt_op = if *signed {
                    SmtOp::ToFp(*exp, *sig)
                } else {
                    SmtOp::ToFpUnsigned(*exp, *sig)
                };
                Ok(SmtTerm::app(smt_op, vec![SmtTerm::RoundingMode(rounding_mode(*rm)), t]))
            }
            ExprKind::FpToBv {
                op,
                signed,
                rm,
                width,
            } => {
                let t = self.encode(op)?;
                let smt_op = if *signed {
                    SmtOp::FpToSbv(*width)
                } else {
                    SmtOp::FpToUbv(*width)
                };
                Ok(SmtTerm::app(smt_op, vec![SmtTerm::RoundingMode(rounding_mode(*rm)), t]))
            }
            ExprKind::FpToFp { op, rm, exp, sig } => {
                let t = self.encode(op)?;
                Ok(SmtTerm::app(
                    SmtOp::ToFp(*exp, *sig),
                    vec![SmtTerm::RoundingMode(rounding_mode(*rm)), t],
                ))
            }
            ExprKind::ArrayRead { array, index } => {
                let a = self.encode(array)?;
                let i = self.encode(index)?;
                Ok(SmtTerm::app(SmtOp::Select, vec![a, i]))
            }
            ExprKind::ArrayWrite {
                array,
                index,
                value,
            } => {
                let a = self.encode(array)?;
                let i = self.encode(index)?;
                let v = self.encode(value)?;
                Ok(SmtTerm::app(SmtOp::Store, vec![a, i, v]))
            }
            ExprKind::ArrayLit { .. } | ExprKind::ArrayInit { .. } => Err(EncodeError::unsupported(expr)),
            ExprKind::App(func, args) => {
                let params = func
                    .params
                    .iter()
                    .map(sort_of)
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| EncodeError::unsupported(expr))?;
                let ret = sort_of(&func.ret).ok_or_else(|| EncodeError::unsupported(expr))?;
                self.record(&func.name, Symbol::Fun(params, ret))?;
                let terms = self.encode_all(args)?;
                Ok(SmtTerm::app(SmtOp::Uf(func.name.to_string()), terms))
            }
        }
    }

    fn translate_unary(&mut self, expr: &Expr, op: UnaryOp, a: &Expr) -> Result<SmtTerm, EncodeError> {
        let ty = a.ty().clone();
        let t = self.encode(a)?;
        let smt_op = match (op, &ty) {
            (UnaryOp::Not, _) => return Ok(t.not()),
            (UnaryOp::Pos, Type::Int | Type::Rat | Type::BitVec { .. } | Type::Float { .. }) => return Ok(t),
            (UnaryOp::Neg, Type::Int | Type::Rat) => SmtOp::Neg,
            (UnaryOp::Neg, Type::BitVec { .. }) => SmtOp::BvNeg,
            (UnaryOp::Neg, Type::Float { .. }) => SmtOp::FpNeg,
            (UnaryOp::BvNot, _) => SmtOp::BvNot,
            (UnaryOp::FpAbs, _) => SmtOp::FpAbs,
            (UnaryOp::FpIsNan, _) => SmtOp::FpIsNan,
            (UnaryOp::FpIsInfinite, _) => SmtOp::FpIsInfinite,
            (UnaryOp::IntToRat, _) => SmtOp::ToReal,
            (UnaryOp::RatToInt, _) => SmtOp::ToInt,
            _ => return Err(EncodeError::unsupported(expr)),
        };
        Ok(SmtTerm::app(smt_op, vec![t]))
    }

    fn translate_binary(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        a: &Expr,
        b: &Expr,
    ) -> Result<SmtTerm, EncodeError> {
        let ty = a.ty().clone();
        let rotate_amount = match op {
            BinaryOp::BvRotateLeft | BinaryOp::BvRotateRight => b.as_lit().and_then(literal_amount),
            _ => None,
        };
        if matches!(op, BinaryOp::FpRem) {
            return Err(EncodeError::unsupported(expr));
        }
        let l = self.encode(a)?;
        let r = self.encode(b)?;
        let app = |op: SmtOp, l: SmtTerm, r: SmtTerm| SmtTerm::app(op, vec![l, r]);
        let term = match (op, &ty) {
            (BinaryOp::Imply, _) => l.implies(r),
            (BinaryOp::Iff, _) => l.eq(r),
            (BinaryOp::Xor, _) => app(SmtOp::Xor, l, r),
            (BinaryOp::FpAssign, Type::Float { .. }) => l.eq(r),
            (BinaryOp::Eq, Type::Float { .. }) => app(SmtOp::FpEq, l, r),
            (BinaryOp::Eq, _) => l.eq(r),
            (BinaryOp::Neq, Type::Float { .. }) => app(SmtOp::FpEq, l, r).not(),
            (BinaryOp::Neq, _) => app(SmtOp::Distinct, l, r),

            (BinaryOp::Sub, Type::Int | Type::Rat) => l.sub(r),
            (BinaryOp::Sub, Type::BitVec { .. }) => app(SmtOp::BvSub, l, r),
            (BinaryOp::Div, Type::Int) => app(SmtOp::IntDiv, l, r),
            (BinaryOp::Div, Type::Rat) => app(SmtOp::RealDiv, l, r),
            (BinaryOp::Div, Type::BitVec { .. }) => app(SmtOp::BvSDiv, l, r),
            (BinaryOp::Mod, Type::Int) => app(SmtOp::Mod, l, r),
            (BinaryOp::Mod, Type::BitVec { .. }) => app(SmtOp::BvSMod, l, r),
            // Remainder takes the sign of the dividend.
            (BinaryOp::Rem, Type::Int) => {
                let neg_l = SmtTerm::app(SmtOp::Neg, vec![l.clone()]);
                let pos = app(SmtOp::Mod, l.clone(), r.clone());
                let neg = SmtTerm::app(SmtOp::Neg, vec![app(SmtOp::Mod, neg_l, r)]);
                l.ge(SmtTerm::int(0)).ite(pos, neg)
            }
            (BinaryOp::Rem, Type::BitVec { .. }) => app(SmtOp::BvSRem, l, r),

            (BinaryOp::Lt, Type::Int | Type::Rat) => l.lt(r),
            (BinaryOp::Leq, Type::Int | Type::Rat) => l.le(r),
            (BinaryOp::Gt, Type::Int | Type::Rat) => l.gt(r),
            (BinaryOp::Geq, Type::Int | Type::Rat) => l.ge(r),
            (BinaryOp::Lt, Type::BitVec { .. }) => app(SmtOp::BvSLt, l, r),
            (BinaryOp::Leq, Type::BitVec { .. }) => app(SmtOp::BvSLe, l, r),
            (BinaryOp::Gt, Type::BitVec { .. }) => app(SmtOp::BvSGt, l, r),
            (BinaryOp::Geq, Type::BitVec { .. }) => app(SmtOp::BvSGe, l, r),
            (BinaryOp::Lt, Type::Float { .. }) => app(SmtOp::FpLt, l, r),
            (BinaryOp::Leq, Type::Float { .. }) => app(SmtOp::FpLeq, l, r),
            (BinaryOp::Gt, Type::Float { .. }) => app(SmtOp::FpGt, l, r),
            (BinaryOp::Geq, Type::Float { .. }) => app(SmtOp::FpGeq, l, r),

            (BinaryOp::BvShl, _) => app(SmtOp::BvShl, l, r),
            (BinaryOp::BvAShr, _) => app(SmtOp::BvAShr, l, r),
            (BinaryOp::BvLShr, _) => app(SmtOp::BvLShr, l, r),
            (BinaryOp::BvRotateLeft | BinaryOp::BvRotateRight, Type::BitVec { width }) => {
                let left = op == BinaryOp::BvRotateLeft;
                match rotate_amount {
                    Some(n) => {
                        let n = if *width == 0 { 0 } else { n % width };
                        let smt_op = if left {
                            SmtOp::RotateLeft(n)
                        } else {
                            SmtOp::RotateRight(n)
                        };
                        SmtTerm::app(smt_op, vec![l])
                    }
                    None => rotate_by_term(l, r, *width, left),
                }
            }
            (BinaryOp::BvULt, _) => app(SmtOp::BvULt, l, r),
            (BinaryOp::BvULeq, _) => app(SmtOp::BvULe, l, r),
            (BinaryOp::BvUGt, _) => app(SmtOp::BvUGt, l, r),
            (BinaryOp::BvUGeq, _) => app(SmtOp::BvUGe, l, r),
            (BinaryOp::BvSLt, _) => app(SmtOp::BvSLt, l, r),
            (BinaryOp::BvSLeq, _) => app(SmtOp::BvSLe, l, r),
            (BinaryOp::BvSGt, _) => app(SmtOp::BvSGt, l, r),
            (BinaryOp::BvSGeq, _) => app(SmtOp::BvSGe, l, r),
            (BinaryOp::BvUDiv, _) => app(SmtOp::BvUDiv, l, r),
            (BinaryOp::BvURem, _) => app(SmtOp::BvURem, l, r),
            (BinaryOp::FpMin, _) => app(SmtOp::FpMin, l, r),
            (BinaryOp::FpMax, _) => app(SmtOp::FpMax, l, r),
            _ => return Err(EncodeError::unsupported(expr)),
        };
        Ok(term)
    }

    fn translate_nary(&mut self, expr: &Expr, op: NaryOp, ops: &[Expr]) -> Result<SmtTerm, EncodeError> {
        let ty = expr.ty().clone();
        let terms = self.encode_all(ops)?;
        match (op, &ty) {
            (NaryOp::And, _) => Ok(SmtTerm::and(terms)),
            (NaryOp::Or, _) => Ok(SmtTerm::or(terms)),
            (NaryOp::Add, Type::Int | Type::Rat) => Ok(fold(terms, zero(&ty), SmtTerm::add)),
            (NaryOp::Mul, Type::Int | Type::Rat) => Ok(fold(terms, one(&ty), SmtTerm::mul)),
            (NaryOp::Add | NaryOp::Mul, Type::BitVec { .. })
            | (NaryOp::BvAnd | NaryOp::BvOr | NaryOp::BvXor | NaryOp::Concat, _)
                if !terms.is_empty() =>
            {
                let smt_op = match op {
                    NaryOp::Add => SmtOp::BvAdd,
                    NaryOp::Mul => SmtOp::BvMul,
                    NaryOp::BvAnd => SmtOp::BvAnd,
                    NaryOp::BvOr => SmtOp::BvOr,
                    NaryOp::BvXor => SmtOp::BvXor,
                    _ => SmtOp::Concat,
                };
                if terms.len() == 1 {
                    Ok(terms.into_iter().next().unwrap_or(SmtTerm::bool(true)))
                } else {
                    Ok(SmtTerm::app(smt_op, terms))
                }
            }
            _ => Err(EncodeError::unsupported(expr)),
        }
    }

    fn translate_quantifier(
        &mut self,
        expr: &Expr,
        q: Quantifier,
        params: &[VarDecl],
        body: &Expr,
    ) -> Result<SmtTerm, EncodeError> {
        let mut scope = HashMap::new();
        let mut bindings = Vec::with_capacity(params.len());
        for param in params {
            let sort = sort_of(&param.ty).ok_or_else(|| EncodeError::unsupported(expr))?;
            self.fresh += 1;
            let name = format!("{}!{}", param.name, self.fresh);
            scope.insert(param.clone(), name.clone());
            bindings.push((name, sort));
        }
        self.scopes.push(scope);
        let body = self.encode(body);
        self.scopes.pop();
        let body = Box::new(body?);
        Ok(match q {
            Quantifier::Exists => SmtTerm::Exists(bindings, body),
            Quantifier::Forall => SmtTerm::ForAll(bindings, body),
        })
    }
}

fn lit_term(value: &LitValue) -> SmtTerm {
    match value {
        LitValue::Bool(b) => SmtTerm::BoolLit(*b),
        LitValue::Int(n) => SmtTerm::IntLit(*n),
        LitValue::Rat(r) => SmtTerm::RealLit(*r),
        LitValue::BitVec { width, value } => SmtTerm::BvLit {
            width: *width,
            value: value.clone(),
        },
        LitValue::Float { exp, sig, bits } => SmtTerm::FpLit {
            exp: *exp,
            sig: *sig,
            bits: bits.clone(),
        },
    }
}

fn literal_amount(value: &LitValue) -> Option<u32> {
    match value {
        LitValue::BitVec { width, value } => {
            let width = BigUint::from(*width);
            if width == BigUint::from(0u32) {
                Some(0)
            } else {
                (value % width).to_u32()
            }
        }
        _ => None,
    }
}

/// Rotation by a symbolic amount, as two shifts by `amount urem width`.
fn rotate_by_term(value: SmtTerm, amount: SmtTerm, width: u32, left: bool) -> SmtTerm {
    let w = SmtTerm::BvLit {
        width,
        value: BigUint::from(width),
    };
    let shift = SmtTerm::app(SmtOp::BvURem, vec![amount, w.clone()]);
    let back = SmtTerm::app(SmtOp::BvSub, vec![w, shift.clone()]);
    let (first, second) = if left {
        (SmtOp::BvShl, SmtOp::BvLShr)
    } else {
        (SmtOp::BvLShr, SmtOp::BvShl)
    };
    SmtTerm::app(
        SmtOp::BvOr,
        vec![
            SmtTerm::app(first, vec![value.clone(), shift]),
            SmtTerm::app(second, vec![value, back]),
        ],
    )
}

fn zero(ty: &Type) -> SmtTerm {
    match ty {
        Type::Rat => SmtTerm::RealLit(Rational64::from_integer(0)),
        _ => SmtTerm::int(0),
    }
}

fn one(ty: &Type) -> SmtTerm {
    match ty {
        Type::Rat => SmtTerm::RealLit(Rational64::from_integer(1)),
        _ => SmtTerm::int(1),
    }
}

fn fold(terms: Vec<SmtTerm>, unit: SmtTerm, f: impl Fn(SmtTerm, SmtTerm) -> SmtTerm) -> SmtTerm {
    let mut iter = terms.into_iter();
    match iter.next() {
        Some(first) => iter.fold(first, f),
        None => unit,
    }
}

/// Symbols and sorts under which the values of `vars` at `indexing` appear in a model.
pub fn model_symbols(vars: &[VarDecl], indexing: &VarIndexing) -> Vec<(String, SmtSort)> {
    vars.iter()
        .filter_map(|v| Some((indexed_symbol(v, indexing.get(v)), sort_of(&v.ty)?)))
        .collect()
}

/// Reads the values of `vars` at `indexing` out of `model`.
///
/// Variables the model does not mention, or mentions with a value of the
/// wrong sort, are left unbound.
pub fn decode(model: &Model, indexing: &VarIndexing, vars: &[VarDecl]) -> Valuation {
    vars.iter()
        .filter_map(|v| {
            let value = model.get(&indexed_symbol(v, indexing.get(v)))?;
            Some((v.clone(), lit_value(value, &v.ty)?))
        })
        .collect()
}

fn lit_value(value: &ModelValue, ty: &Type) -> Option<LitValue> {
    match (value, ty) {
        (ModelValue::Bool(b), Type::Bool) => Some(LitValue::Bool(*b)),
        (ModelValue::Int(n), Type::Int) => Some(LitValue::Int(*n)),
        (ModelValue::Int(n), Type::Rat) => Some(LitValue::Rat(Rational64::from_integer(*n))),
        (ModelValue::Real(r), Type::Rat) => Some(LitValue::Rat(*r)),
        (ModelValue::BitVec { width, value }, Type::BitVec { width: w }) if width == w => {
            Some(LitValue::BitVec {
                width: *width,
                value: value.clone(),
            })
        }
        (ModelValue::Float { exp, sig, bits }, Type::Float { exp: e, sig: s }) if exp == e && sig == s => {
            Some(LitValue::Float {
                exp: *exp,
                sig: *sig,
                bits: bits.clone(),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::smtlib_printer::to_smtlib;
    use argus_ir::FuncDecl;

    fn x() -> VarDecl {
        VarDecl::int("x")
    }

    fn print(encoder: &mut ExprEncoder, expr: &Expr) -> String {
        to_smtlib(&encoder.encode(expr).expect("encodable"))
    }

    #[test]
    fn indexed_variables_get_step_suffixes() {
        let mut enc = ExprEncoder::new();
        let e = Expr::eq(Expr::indexed(&x(), 1), Expr::add(vec![Expr::indexed(&x(), 0), Expr::int(1)]));
        assert_eq!(print(&mut enc, &e), "(= |x#1| (+ |x#0| 1))");
        let term = enc.encode(&e).expect("encodable");
        let names: Vec<_> = enc.symbols_in(&term).keys().cloned().collect();
        assert_eq!(names, vec!["x#1".to_string(), "x#0".to_string()]);
    }

    #[test]
    fn remainder_follows_dividend_sign() {
        let mut enc = ExprEncoder::new();
        let e = Expr::rem(Expr::var(&x()), Expr::int(3));
        assert_eq!(
            print(&mut enc, &e),
            "(ite (>= x 0) (mod x 3) (- (mod (- x) 3)))"
        );
    }

    #[test]
    fn generic_operators_dispatch_on_operand_type() {
        let mut enc = ExprEncoder::new();
        let b = VarDecl::new("b", Type::bv(8));
        let lt = Expr::lt(Expr::var(&b), Expr::lit(LitValue::bv(8, 3)));
        assert_eq!(print(&mut enc, &lt), "(bvslt b #b00000011)");
        let neg = Expr::neg(Expr::var(&b));
        assert_eq!(print(&mut enc, &neg), "(bvneg b)");
        let ext = Expr::zero_extend(Expr::var(&b), 16);
        assert_eq!(print(&mut enc, &ext), "((_ zero_extend 8) b)");
    }

    #[test]
    fn float_assignment_is_structural_equality() {
        let mut enc = ExprEncoder::new();
        let f = VarDecl::new("f", Type::float(8, 24));
        let g = VarDecl::new("g", Type::float(8, 24));
        let assign = Expr::fp_assign(Expr::var(&f), Expr::var(&g));
        assert_eq!(print(&mut enc, &assign), "(= f g)");
        let eq = Expr::eq(Expr::var(&f), Expr::var(&g));
        assert_eq!(print(&mut enc, &eq), "(fp.eq f g)");
    }

    #[test]
    fn rational_floor_maps_to_to_int() {
        let mut enc = ExprEncoder::new();
        let r = VarDecl::new("r", Type::Rat);
        let floor = Expr::eq(Expr::rat_to_int(Expr::var(&r)), Expr::int(2));
        assert_eq!(print(&mut enc, &floor), "(= (to_int r) 2)");
    }

    #[test]
    fn rotation_by_literal_uses_indexed_operator() {
        let mut enc = ExprEncoder::new();
        let b = VarDecl::new("b", Type::bv(8));
        let rol = Expr::binary(BinaryOp::BvRotateLeft, Expr::var(&b), Expr::lit(LitValue::bv(8, 10)));
        assert_eq!(print(&mut enc, &rol), "((_ rotate_left 2) b)");
        let c = VarDecl::new("c", Type::bv(8));
        let ror = Expr::binary(BinaryOp::BvRotateRight, Expr::var(&b), Expr::var(&c));
        assert!(print(&mut enc, &ror).starts_with("(bvor (bvlshr b (bvurem c #b00001000))"));
    }

    #[test]
    fn every_rounding_mode_maps_to_a_distinct_smt_mode() {
        let modes = [
            RoundingMode::NearestTiesToEven,
            RoundingMode::NearestTiesToAway,
            RoundingMode::TowardPositive,
            RoundingMode::TowardNegative,
            RoundingMode::TowardZero,
        ];
        let names: std::collections::BTreeSet<_> =
            modes.iter().map(|m| rounding_mode(*m).smtlib_name()).collect();
        assert_eq!(names.len(), 5);

        let mut enc = ExprEncoder::new();
        let f = VarDecl::new("f", Type::float(8, 24));
        let sum = Expr::fp_rounded(
            FpRoundedOp::Add,
            RoundingMode::TowardZero,
            vec![Expr::var(&f), Expr::var(&f)],
        );
        assert_eq!(print(&mut enc, &sum), "(fp.add RTZ f f)");
    }

    #[test]
    fn unsupported_kinds_are_rejected_with_the_offending_expression() {
        let mut enc = ExprEncoder::new();
        let f = VarDecl::new("f", Type::float(8, 24));
        let rem = Expr::binary(BinaryOp::FpRem, Expr::var(&f), Expr::var(&f));
        match enc.encode(&rem) {
            Err(EncodeError::UnsupportedOperation { expr }) => assert!(expr.contains("fprem")),
            other => panic!("expected UnsupportedOperation, got {other:?}"),
        }
        // Unrounded float addition has no portable meaning.
        let add = Expr::add(vec![Expr::var(&f), Expr::var(&f)]);
        assert!(matches!(enc.encode(&add), Err(EncodeError::UnsupportedOperation { .. })));
        let lit = Expr::new(ExprKind::ArrayLit {
            elems: vec![],
            default: LitValue::Int(0),
            ty: Type::array(Type::Int, Type::Int),
        });
        assert!(matches!(enc.encode(&lit), Err(EncodeError::UnsupportedOperation { .. })));
    }

    #[test]
    fn primes_and_free_parameters_are_invariant_violations() {
        let mut enc = ExprEncoder::new();
        let primed = Expr::prime(Expr::var(&x()));
        assert!(matches!(
            enc.encode(&primed),
            Err(EncodeError::InternalInvariantViolation { .. })
        ));
        let param = Expr::param(&x());
        assert!(matches!(
            enc.encode(&param),
            Err(EncodeError::InternalInvariantViolation { .. })
        ));
    }

    #[test]
    fn nested_quantifiers_do_not_leak_bindings() {
        let mut enc = ExprEncoder::new();
        let y = VarDecl::int("y");
        let inner = Expr::exists(vec![y.clone()], Expr::gt(Expr::param(&y), Expr::param(&x())));
        let outer = Expr::forall(vec![x()], inner);
        let printed = print(&mut enc, &outer);
        assert_eq!(printed, "(forall ((x!1 Int)) (exists ((y!2 Int)) (> y!2 x!1)))");

        // After leaving the binders, neither parameter resolves.
        assert!(enc.encode(&Expr::param(&y)).is_err());
        let term = enc.encode(&outer).expect("cached");
        assert!(enc.symbols_in(&term).is_empty());

        // Siblings get their own fresh symbols.
        let sibling = Expr::and(vec![
            Expr::exists(vec![y.clone()], Expr::gt(Expr::param(&y), Expr::int(0))),
            Expr::exists(vec![y.clone()], Expr::lt(Expr::param(&y), Expr::int(0))),
        ]);
        assert_eq!(
            print(&mut enc, &sibling),
            "(and (exists ((y!3 Int)) (> y!3 0)) (exists ((y!4 Int)) (< y!4 0)))"
        );
    }

    #[test]
    fn eviction_keeps_results_identical() {
        let exprs: Vec<Expr> = (0..8)
            .map(|i| Expr::leq(Expr::var(&x()), Expr::int(i)))
            .collect();
        let mut unbounded = ExprEncoder::new();
        let mut tiny = ExprEncoder::with_capacity(2);
        for round in 0..3 {
            for e in &exprs {
                let a = unbounded.encode(e).expect("encodable");
                let b = tiny.encode(e).expect("encodable");
                assert_eq!(a, b, "round {round}");
            }
        }
        assert!(tiny.cache_len() <= 2);
        let (hits, _) = unbounded.cache_stats();
        assert!(hits > 0);
    }

    #[test]
    fn reset_clears_cache() {
        let mut enc = ExprEncoder::new();
        enc.encode(&Expr::gt(Expr::var(&x()), Expr::int(0))).expect("encodable");
        assert!(enc.cache_len() > 0);
        enc.reset();
        assert_eq!(enc.cache_len(), 0);
    }

    #[test]
    fn uninterpreted_functions_are_recorded() {
        let mut enc = ExprEncoder::new();
        let f = FuncDecl::new("f", vec![Type::Int], Type::Int);
        let e = Expr::eq(Expr::app(f, vec![Expr::int(1)]), Expr::var(&x()));
        let term = enc.encode(&e).expect("encodable");
        let syms = enc.symbols_in(&term);
        assert_eq!(syms.get("f"), Some(&Symbol::Fun(vec![SmtSort::Int], SmtSort::Int)));
        assert_eq!(syms.get("x"), Some(&Symbol::Const(SmtSort::Int)));
    }

    #[test]
    fn decode_reads_values_at_the_requested_step() {
        let mut model = Model::default();
        model.values.insert("x#2".into(), ModelValue::Int(7));
        model.values.insert("x#0".into(), ModelValue::Int(1));
        let val = decode(&model, &VarIndexing::all(2), &[x(), VarDecl::bool("b")]);
        assert_eq!(val.get(&x()), Some(&LitValue::Int(7)));
        assert_eq!(val.len(), 1);
    }
}
