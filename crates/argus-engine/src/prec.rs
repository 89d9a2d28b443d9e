use std::collections::BTreeMap;

use argus_ir::LocationId;

use crate::error::PrecError;

/// Per-location precision with an optional default.
///
/// Refinement never creates an entry equal to the default, so refining a
/// location with the value it already has leaves the representation as is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalPrec<P> {
    map: BTreeMap<LocationId, P>,
    default: Option<P>,
}

impl<P: Clone + Eq> LocalPrec<P> {
    pub fn new(default: Option<P>) -> Self {
        Self {
            map: BTreeMap::new(),
            default,
        }
    }

    pub fn with_default(default: P) -> Self {
        Self::new(Some(default))
    }

    pub fn default_prec(&self) -> Option<&P> {
        self.default.as_ref()
    }

    /// Precision at `loc`: its own entry, else the default.
    pub fn get(&self, loc: LocationId) -> Result<&P, PrecError> {
        self.map
            .get(&loc)
            .or(self.default.as_ref())
            .ok_or(PrecError::NotFound { loc })
    }

    /// Locations carrying their own entry.
    pub fn locations(&self) -> impl Iterator<Item = LocationId> + '_ {
        self.map.keys().copied()
    }

    /// A copy with `prec` assigned to `loc`.
    ///
    /// Assigning the default to a location without an entry changes nothing.
    /// Monotonicity is the caller's concern.
    pub fn refine(&self, loc: LocationId, prec: P) -> Self {
        self.refine_all([(loc, prec)])
    }

    pub fn refine_all(&self, updates: impl IntoIterator<Item = (LocationId, P)>) -> Self {
        let mut map = self.map.clone();
        for (loc, prec) in updates {
            if !map.contains_key(&loc) && self.default.as_ref() == Some(&prec) {
                continue;
            }
            map.insert(loc, prec);
        }
        Self {
            map,
            default: self.default.clone(),
        }
    }
}
