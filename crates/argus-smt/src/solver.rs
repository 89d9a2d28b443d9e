use std::collections::HashMap;

use num::rational::Rational64;
use num::BigUint;

use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Answer to a satisfiability query. `Unknown` carries the solver's reason.
#[derive(Debug, Clone, PartialEq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown(String),
}

/// Symbol assignments read back after a satisfiable check.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub values: HashMap<String, ModelValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelValue {
    Int(i64),
    Bool(bool),
    Real(Rational64),
    BitVec { width: u32, value: BigUint },
    Float { exp: u32, sig: u32, bits: BigUint },
}

impl Model {
    pub fn get(&self, name: &str) -> Option<&ModelValue> {
        self.values.get(name)
    }
}

/// Capabilities the checkers need from a backend: symbol declaration,
/// assertion under a stack of scopes, satisfiability with optional model
/// extraction, and a full reset.
///
/// Declarations are global; assertions made after a `push` are retracted by
/// the matching `pop`.
pub trait SmtSolver {
    type Error: std::error::Error;

    /// Declaring a name twice with the same sort is a no-op.
    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Self::Error>;

    fn declare_fun(&mut self, name: &str, params: &[SmtSort], ret: &SmtSort) -> Result<(), Self::Error>;

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Self::Error>;

    fn push(&mut self) -> Result<(), Self::Error>;

    /// Retracts everything asserted since the innermost open `push`.
    fn pop(&mut self) -> Result<(), Self::Error>;

    fn check_sat(&mut self) -> Result<SatResult, Self::Error>;

    /// Like [`check_sat`](Self::check_sat), but on `Sat` also returns values
    /// for the listed symbols.
    fn check_sat_with_model(
        &mut self,
        symbols: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Self::Error>;

    /// Drops all assertions, scopes and declarations.
    fn reset(&mut self) -> Result<(), Self::Error>;
}
