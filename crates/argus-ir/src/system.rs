//! Location/edge transition systems and their monolithic encoding.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::decl::VarDecl;
use crate::error::IrError;
use crate::expr::Expr;
use crate::indexing::VarIndexing;
use crate::stmt::{to_primed, Stmt};
use crate::types::Type;
use crate::unfold::prime_depths;

pub type LocationId = usize;
pub type EdgeId = usize;

/// Name of the integer variable that carries the control location in the
/// monolithic encoding.
pub const LOC_VAR_NAME: &str = "__loc";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: LocationId,
    pub target: LocationId,
    pub stmts: Vec<Stmt>,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{} {} -> {} [", self.id, self.source, self.target)?;
        for (i, s) in self.stmts.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{s}")?;
        }
        write!(f, "]")
    }
}

/// A symbolic transition system given as a graph of control locations whose
/// edges carry statement sequences.
///
/// A state is unsafe when it violates `prop` or sits at `error_loc`.
#[derive(Debug, Clone)]
pub struct TransitionSystem {
    pub vars: Vec<VarDecl>,
    pub locations: Vec<Location>,
    pub edges: Vec<Edge>,
    pub init_loc: LocationId,
    pub init: Expr,
    pub prop: Expr,
    pub error_loc: Option<LocationId>,
}

impl TransitionSystem {
    /// A system with a single initial location and trivially true init/prop.
    pub fn new(vars: Vec<VarDecl>) -> Self {
        Self {
            vars,
            locations: vec![Location {
                id: 0,
                name: "init".into(),
            }],
            edges: Vec::new(),
            init_loc: 0,
            init: Expr::true_(),
            prop: Expr::true_(),
            error_loc: None,
        }
    }

    pub fn add_location(&mut self, name: impl Into<String>) -> LocationId {
        let id = self.locations.len();
        self.locations.push(Location {
            id,
            name: name.into(),
        });
        id
    }

    pub fn add_edge(
        &mut self,
        source: LocationId,
        target: LocationId,
        stmts: Vec<Stmt>,
    ) -> Result<EdgeId, IrError> {
        for loc in [source, target] {
            if loc >= self.locations.len() {
                return Err(IrError::UnknownLocation(loc));
            }
        }
        let id = self.edges.len();
        self.edges.push(Edge {
            id,
            source,
            target,
            stmts,
        });
        Ok(id)
    }

    pub fn outgoing(&self, loc: LocationId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.source == loc)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Checks that the initial location, the error location and every edge
    /// endpoint name an existing location.
    pub fn validate(&self) -> Result<(), IrError> {
        let known = |loc: LocationId| {
            if loc < self.locations.len() {
                Ok(())
            } else {
                Err(IrError::UnknownLocation(loc))
            }
        };
        known(self.init_loc)?;
        if let Some(err) = self.error_loc {
            known(err)?;
        }
        for edge in &self.edges {
            known(edge.source)?;
            known(edge.target)?;
        }
        Ok(())
    }

    /// Shortest edge count from each location to the error location, if any.
    ///
    /// An error location outside the graph reaches nothing.
    pub fn error_distances(&self) -> Vec<Option<usize>> {
        let mut dist = vec![None; self.locations.len()];
        let Some(err) = self.error_loc else {
            return dist;
        };
        match dist.get_mut(err) {
            Some(d) => *d = Some(0),
            None => return dist,
        }
        let mut queue = VecDeque::from([err]);
        while let Some(loc) = queue.pop_front() {
            let d = dist[loc].unwrap_or(0);
            for e in self.edges.iter().filter(|e| e.target == loc) {
                match dist.get_mut(e.source) {
                    Some(slot) if slot.is_none() => {
                        *slot = Some(d + 1);
                        queue.push_back(e.source);
                    }
                    _ => {}
                }
            }
        }
        dist
    }

    pub fn loc_var() -> VarDecl {
        VarDecl::new(LOC_VAR_NAME, Type::Int)
    }

    /// Folds the location graph into a single `init/trans/prop` triple.
    ///
    /// The control location becomes the integer variable `__loc`. Each edge
    /// contributes one disjunct; variables an edge leaves unchanged are padded
    /// with frame equalities so that every disjunct ends on the same indexing,
    /// and that common indexing is the step offset. A havoc therefore
    /// advances its variable even though no primed occurrence is left in
    /// `trans`.
    pub fn to_monolithic(&self) -> Result<MonolithicExpr, IrError> {
        self.validate()?;
        let loc = Self::loc_var();
        let loc_lit = |l: LocationId| Expr::int(l as i64);

        let mut branches = Vec::with_capacity(self.edges.len());
        let mut joined = VarIndexing::all(0);
        for edge in &self.edges {
            let primed = to_primed(&edge.stmts)?;
            joined = joined.join(&primed.indexing);
            branches.push((edge, primed));
        }

        let mut padded: Vec<VarDecl> = self.vars.clone();
        for var in joined.explicit_vars() {
            if !padded.contains(var) {
                padded.push(var.clone());
            }
        }

        let mut disjuncts = Vec::with_capacity(branches.len());
        for (edge, primed) in branches {
            let mut conj = vec![Expr::eq(Expr::var(&loc), loc_lit(edge.source))];
            conj.extend(primed.exprs);
            for var in &padded {
                let reached = primed.indexing.get(var);
                for i in reached..joined.get(var) {
                    conj.push(Expr::eq(
                        Expr::primed(Expr::var(var), i + 1),
                        Expr::primed(Expr::var(var), i),
                    ));
                }
            }
            conj.push(Expr::eq(Expr::prime(Expr::var(&loc)), loc_lit(edge.target)));
            disjuncts.push(Expr::and_all(conj));
        }
        let trans = match disjuncts.len() {
            0 => Expr::false_(),
            _ => Expr::or(disjuncts),
        };

        let init = Expr::and_all([Expr::eq(Expr::var(&loc), loc_lit(self.init_loc)), self.init.clone()]);
        let prop = match self.error_loc {
            Some(err) => Expr::and_all([
                self.prop.clone(),
                Expr::neq(Expr::var(&loc), loc_lit(err)),
            ]),
            None => self.prop.clone(),
        };
        let offset = joined.with(&loc, 1);
        Ok(MonolithicExpr::with_offset(init, trans, prop, offset))
    }
}

/// A transition system as three formulas: `init` and `prop` over the current
/// state, `trans` over current and primed state.
///
/// `offset` is the indexing advance of one `trans` step: variables never primed
/// in `trans` keep their index, which makes them constant along an unrolling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonolithicExpr {
    pub init: Expr,
    pub trans: Expr,
    pub prop: Expr,
    pub offset: VarIndexing,
}

impl MonolithicExpr {
    /// Derives the offset from the primes in `trans`. Suited to hand-written
    /// formulas, where a variable that may change is always mentioned primed.
    pub fn new(init: Expr, trans: Expr, prop: Expr) -> Self {
        let offset = prime_depths(&trans);
        Self::with_offset(init, trans, prop, offset)
    }

    pub fn with_offset(init: Expr, trans: Expr, prop: Expr, offset: VarIndexing) -> Self {
        Self {
            init,
            trans,
            prop,
            offset,
        }
    }

    /// Indexing of step `k` of an unrolling that starts at all-zero.
    pub fn step_indexing(&self, k: usize) -> VarIndexing {
        (0..k).fold(VarIndexing::all(0), |idx, _| idx.add(&self.offset))
    }

    /// Every state variable mentioned by the three formulas.
    pub fn vars(&self) -> Vec<VarDecl> {
        let mut vars = self.init.vars();
        vars.extend(self.trans.vars());
        vars.extend(self.prop.vars());
        vars.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unfold::unfold;

    fn counter() -> (TransitionSystem, VarDecl) {
        let x = VarDecl::int("x");
        let mut ts = TransitionSystem::new(vec![x.clone()]);
        let body = ts.add_location("body");
        ts.add_edge(0, body, vec![Stmt::assign(&x, Expr::int(0))])
            .expect("known locations");
        ts.add_edge(
            body,
            body,
            vec![Stmt::assign(&x, Expr::add(vec![Expr::var(&x), Expr::int(1)]))],
        )
        .expect("known locations");
        (ts, x)
    }

    #[test]
    fn edges_require_known_locations() {
        let mut ts = TransitionSystem::new(Vec::new());
        assert_eq!(ts.add_edge(0, 7, Vec::new()), Err(IrError::UnknownLocation(7)));
    }

    #[test]
    fn monolithic_offset_advances_assigned_vars_and_location() {
        let (ts, x) = counter();
        let mono = ts.to_monolithic().expect("well typed");
        assert_eq!(mono.offset.get(&x), 1);
        assert_eq!(mono.offset.get(&TransitionSystem::loc_var()), 1);
        assert_eq!(mono.step_indexing(3).get(&x), 3);
    }

    #[test]
    fn untouched_vars_are_padded_with_frame_equalities() {
        let x = VarDecl::int("x");
        let y = VarDecl::int("y");
        let mut ts = TransitionSystem::new(vec![x.clone(), y.clone()]);
        ts.add_edge(0, 0, vec![Stmt::assign(&x, Expr::int(1))])
            .expect("known locations");
        ts.add_edge(0, 0, vec![Stmt::assign(&y, Expr::int(2))])
            .expect("known locations");
        let mono = ts.to_monolithic().expect("well typed");
        let unfolded = unfold(&mono.trans, &VarIndexing::all(0)).to_string();
        assert!(unfolded.contains("(= y#1 y#0)"), "{unfolded}");
        assert!(unfolded.contains("(= x#1 x#0)"), "{unfolded}");
    }

    #[test]
    fn havoc_advances_the_offset_without_a_primed_occurrence() {
        let x = VarDecl::int("x");
        let y = VarDecl::int("y");
        let mut ts = TransitionSystem::new(vec![x.clone(), y.clone()]);
        ts.add_edge(0, 0, vec![Stmt::havoc(&x)]).expect("known locations");
        ts.add_edge(0, 0, vec![Stmt::assign(&y, Expr::int(1)), Stmt::havoc(&y)])
            .expect("known locations");
        let mono = ts.to_monolithic().expect("well typed");
        assert_eq!(mono.offset.get(&x), 1);
        assert_eq!(mono.offset.get(&y), 2);
        let unfolded = unfold(&mono.trans, &VarIndexing::all(0)).to_string();
        assert!(unfolded.contains("(= y#2 y#1)"), "{unfolded}");
    }

    #[test]
    fn assigned_vars_outside_the_declared_list_are_still_padded() {
        let x = VarDecl::int("x");
        let z = VarDecl::int("z");
        let mut ts = TransitionSystem::new(vec![x.clone()]);
        ts.add_edge(0, 0, vec![Stmt::assign(&z, Expr::int(3))])
            .expect("known locations");
        ts.add_edge(0, 0, vec![Stmt::assign(&x, Expr::int(1))])
            .expect("known locations");
        let mono = ts.to_monolithic().expect("well typed");
        assert_eq!(mono.offset.get(&z), 1);
        let unfolded = unfold(&mono.trans, &VarIndexing::all(0)).to_string();
        assert!(unfolded.contains("(= z#1 z#0)"), "{unfolded}");
    }

    #[test]
    fn dangling_initial_or_error_locations_are_rejected() {
        let (mut ts, _) = counter();
        ts.error_loc = Some(9);
        assert_eq!(ts.validate(), Err(IrError::UnknownLocation(9)));
        assert_eq!(ts.to_monolithic(), Err(IrError::UnknownLocation(9)));
        assert_eq!(ts.error_distances(), vec![None, None]);

        ts.error_loc = None;
        ts.init_loc = 4;
        assert_eq!(ts.validate(), Err(IrError::UnknownLocation(4)));
    }

    #[test]
    fn error_distance_follows_reverse_edges() {
        let (mut ts, _) = counter();
        let err = ts.add_location("error");
        ts.error_loc = Some(err);
        ts.add_edge(1, err, Vec::new()).expect("known locations");
        assert_eq!(ts.error_distances(), vec![Some(2), Some(1), Some(0)]);
    }
}
