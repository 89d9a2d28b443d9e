use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::Type;

/// A typed variable. Two declarations are the same variable iff name and type agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: Arc<str>,
    pub ty: Type,
}

impl VarDecl {
    pub fn new(name: impl Into<Arc<str>>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    pub fn int(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, Type::Int)
    }

    pub fn bool(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, Type::Bool)
    }
}

impl fmt::Display for VarDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An uninterpreted function symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncDecl {
    pub name: Arc<str>,
    pub params: Vec<Type>,
    pub ret: Type,
}

impl FuncDecl {
    pub fn new(name: impl Into<Arc<str>>, params: Vec<Type>, ret: Type) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
        }
    }
}

/// What a reference expression points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Decl {
    /// A state variable, not yet assigned a time step.
    Var(VarDecl),
    /// A quantifier-bound parameter.
    Param(VarDecl),
    /// A state variable pinned to an unrolling step.
    Indexed(VarDecl, u32),
}

impl Decl {
    pub fn var(&self) -> &VarDecl {
        match self {
            Decl::Var(v) | Decl::Param(v) | Decl::Indexed(v, _) => v,
        }
    }

    pub fn ty(&self) -> &Type {
        &self.var().ty
    }
}

impl fmt::Display for Decl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decl::Var(v) | Decl::Param(v) => write!(f, "{}", v.name),
            Decl::Indexed(v, i) => write!(f, "{}#{i}", v.name),
        }
    }
}
