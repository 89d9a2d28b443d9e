use std::fmt;

use serde::{Deserialize, Serialize};

/// Sort of an expression or declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Type {
    Bool,
    Int,
    Rat,
    BitVec { width: u32 },
    /// IEEE-754 float; `sig` counts the hidden bit, as in SMT-LIB.
    Float { exp: u32, sig: u32 },
    Array { index: Box<Type>, elem: Box<Type> },
    Func { params: Vec<Type>, ret: Box<Type> },
}

impl Type {
    pub fn bv(width: u32) -> Self {
        Type::BitVec { width }
    }

    pub fn float(exp: u32, sig: u32) -> Self {
        Type::Float { exp, sig }
    }

    pub fn array(index: Type, elem: Type) -> Self {
        Type::Array {
            index: Box::new(index),
            elem: Box::new(elem),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Rat)
    }

    pub fn bv_width(&self) -> Option<u32> {
        match self {
            Type::BitVec { width } => Some(*width),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "Bool"),
            Type::Int => write!(f, "Int"),
            Type::Rat => write!(f, "Rat"),
            Type::BitVec { width } => write!(f, "BitVec[{width}]"),
            Type::Float { exp, sig } => write!(f, "Fp[{exp},{sig}]"),
            Type::Array { index, elem } => write!(f, "[{index}] -> {elem}"),
            Type::Func { params, ret } => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {ret}")
            }
        }
    }
}

/// The five IEEE-754 rounding modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoundingMode {
    NearestTiesToEven,
    NearestTiesToAway,
    TowardPositive,
    TowardNegative,
    TowardZero,
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundingMode::NearestTiesToEven => "RNE",
            RoundingMode::NearestTiesToAway => "RNA",
            RoundingMode::TowardPositive => "RTP",
            RoundingMode::TowardNegative => "RTN",
            RoundingMode::TowardZero => "RTZ",
        };
        write!(f, "{s}")
    }
}
