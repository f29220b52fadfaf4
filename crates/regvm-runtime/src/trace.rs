//! Execution traces.

use crate::state::MachineState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One recorded snapshot and the pc it was taken at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    pub pc: i32,
    pub state: MachineState,
}

/// Snapshots in temporal order, indexed by the pc active when each was taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    steps: Vec<TraceStep>,
    by_pc: BTreeMap<i32, Vec<usize>>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
        self.by_pc.clear();
    }

    pub fn push(&mut self, state: &MachineState) {
        let pc = state.pc();
        self.by_pc.entry(pc).or_default().push(self.steps.len());
        self.steps.push(TraceStep {
            pc,
            state: state.clone(),
        });
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&MachineState> {
        self.steps.get(index).map(|s| &s.state)
    }

    /// State before the first instruction ran
    pub fn first(&self) -> Option<&MachineState> {
        self.steps.first().map(|s| &s.state)
    }

    pub fn last(&self) -> Option<&MachineState> {
        self.steps.last().map(|s| &s.state)
    }

    /// Trace positions at which `pc` was active
    pub fn visits(&self, pc: i32) -> &[usize] {
        self.by_pc.get(&pc).map(Vec::as_slice).unwrap_or(&[])
    }

    /// States observed on each visit of instruction `pc`
    pub fn states_at(&self, pc: i32) -> impl Iterator<Item = &MachineState> + '_ {
        self.visits(pc).iter().map(move |&i| &self.steps[i].state)
    }

    pub fn pc_index(&self) -> &BTreeMap<i32, Vec<usize>> {
        &self.by_pc
    }

    pub fn feature(&self, index: usize) -> Option<Vec<i32>> {
        self.get(index).map(MachineState::feature)
    }
}
