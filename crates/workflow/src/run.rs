use serde::Serialize;
use uuid::Uuid;

/// Final state of one workflow invocation plus the steps it visited.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRun<S, T> {
    pub run_id: Uuid,
    pub state: S,
    /// Visited steps in order, ending with the terminal step
    pub trace: Vec<T>,
}

impl<S, T: PartialEq> WorkflowRun<S, T> {
    pub fn new(run_id: Uuid, state: S, trace: Vec<T>) -> Self {
        Self {
            run_id,
            state,
            trace,
        }
    }

    /// How many times `step` was entered.
    pub fn visits(&self, step: &T) -> usize {
        self.trace.iter().filter(|s| *s == step).count()
    }
}
