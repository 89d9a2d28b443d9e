use std::collections::BTreeMap;
use std::fmt;

use crate::decl::VarDecl;
use crate::expr::Expr;
use crate::literal::LitValue;

/// An immutable assignment of literal values to (some) variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Valuation {
    values: BTreeMap<VarDecl, LitValue>,
}

impl Valuation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, decl: &VarDecl) -> Option<&LitValue> {
        self.values.get(decl)
    }

    pub fn contains(&self, decl: &VarDecl) -> bool {
        self.values.contains_key(decl)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VarDecl, &LitValue)> {
        self.values.iter()
    }

    pub fn decls(&self) -> impl Iterator<Item = &VarDecl> {
        self.values.keys()
    }

    /// A copy with `decl` bound to `value`.
    pub fn with(&self, decl: VarDecl, value: LitValue) -> Self {
        let mut values = self.values.clone();
        values.insert(decl, value);
        Self { values }
    }

    /// A copy with `decl` unbound.
    pub fn without(&self, decl: &VarDecl) -> Self {
        let mut values = self.values.clone();
        values.remove(decl);
        Self { values }
    }

    /// Union of two valuations, or `None` when they disagree on a shared key.
    pub fn disjoint_union(&self, other: &Valuation) -> Option<Valuation> {
        let mut values = self.values.clone();
        for (decl, value) in &other.values {
            match values.get(decl) {
                Some(existing) if existing != value => return None,
                Some(_) => {}
                None => {
                    values.insert(decl.clone(), value.clone());
                }
            }
        }
        Some(Self { values })
    }

    /// Keys bound to the same value on both sides.
    pub fn agreement(&self, other: &Valuation) -> Valuation {
        let values = self
            .values
            .iter()
            .filter(|(d, v)| other.values.get(*d) == Some(*v))
            .map(|(d, v)| (d.clone(), v.clone()))
            .collect();
        Self { values }
    }

    /// True when every binding of `other` also appears in `self`.
    pub fn is_leq(&self, other: &Valuation) -> bool {
        other
            .values
            .iter()
            .all(|(d, v)| self.values.get(d) == Some(v))
    }

    /// Conjunction of `x = value` equalities over current-state references.
    pub fn to_expr(&self) -> Expr {
        Expr::and_all(
            self.values
                .iter()
                .map(|(d, v)| Expr::eq(Expr::var(d), Expr::lit(v.clone()))),
        )
    }
}

impl FromIterator<(VarDecl, LitValue)> for Valuation {
    fn from_iter<T: IntoIterator<Item = (VarDecl, LitValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Valuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (d, v)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} = {v}", d.name)?;
        }
        write!(f, "}}")
    }
}
