use argus_ir::Type;

/// SMT sorts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SmtSort {
    Bool,
    Int,
    Real,
    BitVec(u32),
    /// Exponent and significand widths; the significand counts the hidden bit.
    Float(u32, u32),
    Array(Box<SmtSort>, Box<SmtSort>),
    RoundingMode,
}

impl SmtSort {
    /// Sort of a value-carrying IR type. Function types have no sort of their own.
    pub fn of_type(ty: &Type) -> Option<SmtSort> {
        Some(match ty {
            Type::Bool => SmtSort::Bool,
            Type::Int => SmtSort::Int,
            Type::Rat => SmtSort::Real,
            Type::BitVec { width } => SmtSort::BitVec(*width),
            Type::Float { exp, sig } => SmtSort::Float(*exp, *sig),
            Type::Array { index, elem } => SmtSort::Array(
                Box::new(SmtSort::of_type(index)?),
                Box::new(SmtSort::of_type(elem)?),
            ),
            Type::Func { .. } => return None,
        })
    }
}

impl std::fmt::Display for SmtSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmtSort::Bool => write!(f, "Bool"),
            SmtSort::Int => write!(f, "Int"),
            SmtSort::Real => write!(f, "Real"),
            SmtSort::BitVec(w) => write!(f, "(_ BitVec {w})"),
            SmtSort::Float(e, s) => write!(f, "(_ FloatingPoint {e} {s})"),
            SmtSort::Array(i, e) => write!(f, "(Array {i} {e})"),
            SmtSort::RoundingMode => write!(f, "RoundingMode"),
        }
    }
}
