use std::collections::BTreeSet;
use std::fmt;

use argus_ir::VarDecl;

/// The variables an explicit analysis keeps values for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExplPrec {
    vars: BTreeSet<VarDecl>,
}

impl ExplPrec {
    pub fn new(vars: impl IntoIterator<Item = VarDecl>) -> Self {
        Self {
            vars: vars.into_iter().collect(),
        }
    }

    /// Tracks nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn tracks(&self, var: &VarDecl) -> bool {
        self.vars.contains(var)
    }

    pub fn vars(&self) -> impl Iterator<Item = &VarDecl> {
        self.vars.iter()
    }

    /// A precision tracking the variables of both.
    pub fn join(&self, other: &ExplPrec) -> Self {
        Self {
            vars: self.vars.union(&other.vars).cloned().collect(),
        }
    }
}

impl fmt::Display for ExplPrec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.vars.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}
