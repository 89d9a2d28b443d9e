//! Safety checking for argus transition systems.
//!
//! Two engines share this crate. [`arg::ArgChecker`] explores an abstract
//! reachability graph over a location/edge system with a pluggable
//! [`analysis::Analysis`], covering subsumed nodes and confirming targets
//! with the solver. [`kind::KindChecker`] runs k-induction over the
//! monolithic `init/trans/prop` view.

pub mod analysis;
pub mod arg;
pub mod cancel;
pub mod config;
pub mod error;
pub mod expl;
pub mod kind;
pub mod lattice;
pub mod prec;
pub mod result;

pub use analysis::{AbstractState, Analysis};
pub use arg::{Arg, ArgChecker, ArgNode, ArgResult, NodeId};
pub use cancel::CancelToken;
pub use config::{ArgConfig, ExplConfig, KindConfig, SearchStrategy};
pub use error::{CheckError, KindError, PrecError, TraceError};
pub use kind::{KindChecker, KindResult};
pub use lattice::{Lattice, PartialOrder};
pub use prec::LocalPrec;
pub use result::{LocState, SafetyResult, Statistics, Trace};
