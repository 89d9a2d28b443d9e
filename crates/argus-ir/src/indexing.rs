use std::collections::BTreeMap;
use std::fmt;

use crate::decl::VarDecl;

/// Per-variable version counters used to rename variables across unrolled steps.
///
/// Variables without an explicit entry read the shared default. Every
/// operation returns a new indexing; values are never modified in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VarIndexing {
    default: u32,
    overrides: BTreeMap<VarDecl, u32>,
}

impl VarIndexing {
    /// Every variable at index `i`.
    pub fn all(i: u32) -> Self {
        Self {
            default: i,
            overrides: BTreeMap::new(),
        }
    }

    pub fn get(&self, decl: &VarDecl) -> u32 {
        self.overrides.get(decl).copied().unwrap_or(self.default)
    }

    pub fn default_index(&self) -> u32 {
        self.default
    }

    pub fn with(&self, decl: &VarDecl, index: u32) -> Self {
        let mut next = self.clone();
        if index == self.default {
            next.overrides.remove(decl);
        } else {
            next.overrides.insert(decl.clone(), index);
        }
        next
    }

    pub fn inc(&self, decl: &VarDecl) -> Self {
        self.with(decl, self.get(decl) + 1)
    }

    /// Pointwise sum.
    pub fn add(&self, other: &VarIndexing) -> Self {
        self.combine(other, |a, b| a + b)
    }

    /// Pointwise maximum.
    pub fn join(&self, other: &VarIndexing) -> Self {
        self.combine(other, u32::max)
    }

    /// Variables whose index differs from the default.
    pub fn explicit_vars(&self) -> impl Iterator<Item = &VarDecl> {
        self.overrides.keys()
    }

    fn combine(&self, other: &VarIndexing, op: impl Fn(u32, u32) -> u32) -> Self {
        let default = op(self.default, other.default);
        let mut overrides = BTreeMap::new();
        for decl in self.overrides.keys().chain(other.overrides.keys()) {
            let index = op(self.get(decl), other.get(decl));
            if index != default {
                overrides.insert(decl.clone(), index);
            }
        }
        Self { default, overrides }
    }
}

impl fmt::Display for VarIndexing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[default={}", self.default)?;
        for (d, i) in &self.overrides {
            write!(f, ", {}={i}", d.name)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inc_only_touches_one_variable() {
        let x = VarDecl::int("x");
        let y = VarDecl::int("y");
        let idx = VarIndexing::all(0).inc(&x).inc(&x);
        assert_eq!(idx.get(&x), 2);
        assert_eq!(idx.get(&y), 0);
    }

    #[test]
    fn add_is_pointwise() {
        let x = VarDecl::int("x");
        let y = VarDecl::int("y");
        let offset = VarIndexing::all(0).inc(&x);
        let two_steps = offset.add(&offset);
        assert_eq!(two_steps.get(&x), 2);
        assert_eq!(two_steps.get(&y), 0);
        assert_eq!(two_steps.add(&VarIndexing::all(0)), two_steps);
    }

    #[test]
    fn join_takes_maximum_and_stays_minimal() {
        let x = VarDecl::int("x");
        let y = VarDecl::int("y");
        let a = VarIndexing::all(1).with(&x, 3);
        let b = VarIndexing::all(2).with(&y, 5);
        let j = a.join(&b);
        assert_eq!(j.get(&x), 3);
        assert_eq!(j.get(&y), 5);
        assert_eq!(j.default_index(), 2);
        assert_eq!(VarIndexing::all(1).with(&x, 1), VarIndexing::all(1));
    }
}
