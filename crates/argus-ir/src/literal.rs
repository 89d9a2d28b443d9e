use std::fmt;

use num::rational::Rational64;
use num::BigUint;

use crate::types::Type;

/// A concrete value of some [`Type`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LitValue {
    Bool(bool),
    Int(i64),
    Rat(Rational64),
    /// Unsigned bit pattern, `value < 2^width`.
    BitVec { width: u32, value: BigUint },
    /// Packed IEEE-754 bits: sign, `exp` exponent bits, `sig - 1` fraction bits.
    Float { exp: u32, sig: u32, bits: BigUint },
}

impl LitValue {
    pub fn bv(width: u32, value: u64) -> Self {
        let mask = if width >= 64 {
            BigUint::from(u64::MAX)
        } else {
            BigUint::from((1u64 << width) - 1)
        };
        LitValue::BitVec {
            width,
            value: BigUint::from(value) & mask,
        }
    }

    pub fn ty(&self) -> Type {
        match self {
            LitValue::Bool(_) => Type::Bool,
            LitValue::Int(_) => Type::Int,
            LitValue::Rat(_) => Type::Rat,
            LitValue::BitVec { width, .. } => Type::BitVec { width: *width },
            LitValue::Float { exp, sig, .. } => Type::Float {
                exp: *exp,
                sig: *sig,
            },
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LitValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            LitValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_rat(&self) -> Option<Rational64> {
        match self {
            LitValue::Rat(r) => Some(*r),
            LitValue::Int(n) => Some(Rational64::from_integer(*n)),
            _ => None,
        }
    }
}

impl From<bool> for LitValue {
    fn from(b: bool) -> Self {
        LitValue::Bool(b)
    }
}

impl From<i64> for LitValue {
    fn from(n: i64) -> Self {
        LitValue::Int(n)
    }
}

impl From<Rational64> for LitValue {
    fn from(r: Rational64) -> Self {
        LitValue::Rat(r)
    }
}

impl fmt::Display for LitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LitValue::Bool(b) => write!(f, "{b}"),
            LitValue::Int(n) => write!(f, "{n}"),
            LitValue::Rat(r) => write!(f, "{r}"),
            LitValue::BitVec { width, value } => write!(f, "{value}bv{width}"),
            LitValue::Float { exp, sig, bits } => write!(f, "fp{exp}.{sig}#x{bits:x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bv_constructor_masks_to_width() {
        assert_eq!(
            LitValue::bv(4, 0x1f),
            LitValue::BitVec {
                width: 4,
                value: BigUint::from(0xfu32)
            }
        );
        assert_eq!(LitValue::bv(4, 3).ty(), Type::bv(4));
    }

    #[test]
    fn int_widens_to_rational() {
        assert_eq!(LitValue::Int(3).as_rat(), Some(Rational64::from_integer(3)));
        assert_eq!(LitValue::Bool(true).as_rat(), None);
    }
}
