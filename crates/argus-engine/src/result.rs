use std::fmt;

use argus_ir::LocationId;
use serde::Serialize;

use crate::error::TraceError;

/// Counters collected during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub nodes_created: usize,
    pub nodes_expanded: usize,
    pub coverings_made: usize,
    pub coverings_invalidated: usize,
    pub target_candidates: usize,
    pub spurious_targets: usize,
    pub solver_checks: usize,
    pub kind_windows: usize,
    pub elapsed_ms: u64,
}

/// Alternating states and actions, `states.len() == actions.len() + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trace<S, A> {
    states: Vec<S>,
    actions: Vec<A>,
}

impl<S, A> Trace<S, A> {
    pub fn new(states: Vec<S>, actions: Vec<A>) -> Result<Self, TraceError> {
        if states.is_empty() {
            return Err(TraceError::Empty);
        }
        if states.len() != actions.len() + 1 {
            return Err(TraceError::Shape {
                states: states.len(),
                expected: states.len() - 1,
                actions: actions.len(),
            });
        }
        Ok(Self { states, actions })
    }

    pub fn states(&self) -> &[S] {
        &self.states
    }

    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    /// Number of states; never zero.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl<S: fmt::Display, A: fmt::Display> fmt::Display for Trace<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, state) in self.states.iter().enumerate() {
            writeln!(f, "  state {i}: {state}")?;
            if let Some(action) = self.actions.get(i) {
                writeln!(f, "    --[{action}]-->")?;
            }
        }
        Ok(())
    }
}

/// An abstract state tagged with its control location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LocState<S> {
    pub loc: LocationId,
    pub state: S,
}

impl<S: fmt::Display> fmt::Display for LocState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{} {}", self.loc, self.state)
    }
}

/// Verdict of a safety check. `W` is the proof artifact, `S`/`A` the state
/// and action types of counterexample traces.
#[derive(Debug, Clone, Serialize)]
pub enum SafetyResult<W, S, A> {
    Safe {
        witness: Option<W>,
        stats: Option<Statistics>,
    },
    Unsafe {
        trace: Trace<S, A>,
        witness: Option<W>,
        stats: Option<Statistics>,
    },
    /// Inconclusive: cancelled, out of time or nodes, or the solver gave up.
    Unknown,
}

impl<W, S, A> SafetyResult<W, S, A> {
    pub fn is_safe(&self) -> bool {
        matches!(self, SafetyResult::Safe { .. })
    }

    pub fn is_unsafe(&self) -> bool {
        matches!(self, SafetyResult::Unsafe { .. })
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, SafetyResult::Unknown)
    }

    pub fn trace(&self) -> Option<&Trace<S, A>> {
        match self {
            SafetyResult::Unsafe { trace, .. } => Some(trace),
            _ => None,
        }
    }

    pub fn witness(&self) -> Option<&W> {
        match self {
            SafetyResult::Safe { witness, .. } | SafetyResult::Unsafe { witness, .. } => {
                witness.as_ref()
            }
            SafetyResult::Unknown => None,
        }
    }

    pub fn stats(&self) -> Option<&Statistics> {
        match self {
            SafetyResult::Safe { stats, .. } | SafetyResult::Unsafe { stats, .. } => {
                stats.as_ref()
            }
            SafetyResult::Unknown => None,
        }
    }

    /// Stable lowercase name of the verdict.
    pub fn verdict(&self) -> &'static str {
        match self {
            SafetyResult::Safe { .. } => "safe",
            SafetyResult::Unsafe { .. } => "unsafe",
            SafetyResult::Unknown => "unknown",
        }
    }
}

impl<W, S: fmt::Display, A: fmt::Display> fmt::Display for SafetyResult<W, S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafetyResult::Safe { .. } => writeln!(f, "RESULT: SAFE"),
            SafetyResult::Unsafe { trace, .. } => {
                writeln!(f, "RESULT: UNSAFE")?;
                writeln!(f, "Counterexample ({} states):", trace.len())?;
                write!(f, "{trace}")
            }
            SafetyResult::Unknown => writeln!(f, "RESULT: UNKNOWN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_shape_is_validated() {
        assert_eq!(Trace::<u8, u8>::new(vec![], vec![]), Err(TraceError::Empty));
        assert_eq!(
            Trace::new(vec![1u8, 2], vec![]),
            Err::<Trace<u8, u8>, _>(TraceError::Shape {
                states: 2,
                expected: 1,
                actions: 0
            })
        );
        let trace = Trace::new(vec![1u8, 2], vec!['a']).expect("well formed");
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.actions(), &['a']);
    }

    #[test]
    fn display_names_the_verdict() {
        let safe: SafetyResult<(), u8, u8> = SafetyResult::Safe {
            witness: None,
            stats: None,
        };
        assert_eq!(safe.to_string(), "RESULT: SAFE\n");
        let trace = Trace::new(vec![0u8, 1], vec!["inc"]).expect("well formed");
        let unsafe_: SafetyResult<(), u8, &str> = SafetyResult::Unsafe {
            trace,
            witness: None,
            stats: None,
        };
        let text = unsafe_.to_string();
        assert!(text.starts_with("RESULT: UNSAFE\nCounterexample (2 states):"));
        assert!(text.contains("--[inc]-->"));
        assert_eq!(unsafe_.verdict(), "unsafe");
    }

    #[test]
    fn statistics_serialize() {
        let stats = Statistics {
            nodes_created: 3,
            ..Statistics::default()
        };
        let json = serde_json::to_value(&stats).expect("serializable");
        assert_eq!(json["nodes_created"], 3);
    }
}
