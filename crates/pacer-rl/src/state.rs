//! Action, value table, and controller state types

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use pacer_core::{defaults, PacingProfile, ACTIONS_N, ACTION_PROFILES};

/// Reward value from the network
pub type Reward = f64;

/// Discrete action: an index into the compiled-in pacing profile table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Action(usize);

impl Action {
    /// Create action from index, `None` when out of range
    pub fn from_index(index: usize) -> Option<Self> {
        (index < ACTIONS_N).then_some(Self(index))
    }

    /// Convert action to its table index
    pub fn to_index(self) -> usize {
        self.0
    }

    /// Pacing profile this action publishes
    pub fn profile(self) -> &'static PacingProfile {
        &ACTION_PROFILES[self.0]
    }

    /// All actions in enumeration order
    pub fn all() -> impl Iterator<Item = Action> {
        (0..ACTIONS_N).map(Self)
    }

    /// Number of discrete actions
    pub fn action_space_size() -> usize {
        ACTIONS_N
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<usize> for Action {
    type Error = String;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::from_index(index).ok_or_else(|| format!("action id {index} out of range"))
    }
}

impl From<Action> for usize {
    fn from(action: Action) -> Self {
        action.0
    }
}

/// One Q-value per action; entries are never added or removed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct ValueTable {
    values: Vec<f64>,
}

impl ValueTable {
    /// Fresh table with every action valued at zero
    pub fn new() -> Self {
        Self {
            values: vec![0.0; ACTIONS_N],
        }
    }

    pub fn get(&self, action: Action) -> f64 {
        self.values[action.to_index()]
    }

    pub fn set(&mut self, action: Action, value: f64) {
        self.values[action.to_index()] = value;
    }

    /// `(action, value)` pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (Action, f64)> + '_ {
        Action::all().zip(self.values.iter().copied())
    }

    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Every action whose value equals the maximum
    pub fn argmax_set(&self) -> Vec<Action> {
        let best = self.max_value();
        self.iter()
            .filter(|(_, v)| *v == best)
            .map(|(a, _)| a)
            .collect()
    }

    /// Highest-valued action; ties go to the lowest id.
    pub fn best_action(&self) -> Action {
        let mut best = Action(0);
        for (action, value) in self.iter() {
            if value > self.get(best) {
                best = action;
            }
        }
        best
    }
}

impl Default for ValueTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<f64>> for ValueTable {
    type Error = String;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        if values.len() != ACTIONS_N {
            return Err(format!(
                "value table has {} entries, expected {}",
                values.len(),
                ACTIONS_N
            ));
        }
        Ok(Self { values })
    }
}

impl From<ValueTable> for Vec<f64> {
    fn from(table: ValueTable) -> Self {
        table.values
    }
}

/// Renders as `{0: 0.0, 1: 0.5, ...}`
impl fmt::Display for ValueTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (action, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{action}: {value:?}")?;
        }
        write!(f, "}}")
    }
}

/// Everything the controller learns over its lifetime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    pub values: ValueTable,
    pub epsilon: f64,
    /// Completed decision cycles
    pub step: u64,
    pub cumulative_reward: Reward,
    /// Actions still owed a first trial, in order
    pub cold_start: VecDeque<Action>,
}

impl ControllerState {
    /// Fresh state at the given exploration rate
    pub fn new(epsilon: f64) -> Self {
        Self {
            values: ValueTable::new(),
            epsilon,
            step: 0,
            cumulative_reward: 0.0,
            cold_start: Action::all().collect(),
        }
    }

    pub fn in_cold_start(&self) -> bool {
        !self.cold_start.is_empty()
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::new(defaults::EPSILON_INIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_index() {
        assert_eq!(Action::from_index(0).map(Action::to_index), Some(0));
        assert_eq!(Action::from_index(4).map(Action::to_index), Some(4));
        assert!(Action::from_index(5).is_none());
        assert!(Action::from_index(100).is_none());
    }

    #[test]
    fn test_action_space_size() {
        assert_eq!(Action::action_space_size(), 5);
        assert_eq!(Action::all().count(), 5);
    }

    #[test]
    fn test_action_profile() {
        let action = Action::from_index(0).unwrap();
        assert_eq!(action.profile()[0], 1.25);
        assert_eq!(action.profile()[1], 0.75);
    }

    #[test]
    fn test_action_serialization() {
        let action = Action::from_index(3).unwrap();
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, "3");

        let parsed: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, action);

        assert!(serde_json::from_str::<Action>("9").is_err());
    }

    #[test]
    fn test_value_table_starts_at_zero() {
        let table = ValueTable::new();
        assert_eq!(table.iter().count(), 5);
        assert!(table.iter().all(|(_, v)| v == 0.0));
        assert_eq!(table.argmax_set().len(), 5);
    }

    #[test]
    fn test_best_action_fresh_table_is_lowest_id() {
        let table = ValueTable::new();
        assert_eq!(table.best_action().to_index(), 0);
    }

    #[test]
    fn test_best_action_ties_prefer_lowest_id() {
        let mut table = ValueTable::new();
        table.set(Action::from_index(2).unwrap(), 0.8);
        table.set(Action::from_index(4).unwrap(), 0.8);

        assert_eq!(table.best_action().to_index(), 2);
        let ties: Vec<usize> = table.argmax_set().into_iter().map(Action::to_index).collect();
        assert_eq!(ties, vec![2, 4]);
    }

    #[test]
    fn test_best_action_with_negative_values() {
        let mut table = ValueTable::new();
        for action in Action::all() {
            table.set(action, -1.0 - action.to_index() as f64);
        }
        assert_eq!(table.best_action().to_index(), 0);

        table.set(Action::from_index(3).unwrap(), -0.5);
        assert_eq!(table.best_action().to_index(), 3);
    }

    #[test]
    fn test_value_table_display() {
        let mut table = ValueTable::new();
        table.set(Action::from_index(1).unwrap(), 0.7);
        assert_eq!(table.to_string(), "{0: 0.0, 1: 0.7, 2: 0.0, 3: 0.0, 4: 0.0}");
    }

    #[test]
    fn test_value_table_rejects_wrong_length() {
        assert!(ValueTable::try_from(vec![0.0; 3]).is_err());
        assert!(serde_json::from_str::<ValueTable>("[0.0, 1.0]").is_err());
    }

    #[test]
    fn test_controller_state_serialization() {
        let mut state = ControllerState::new(0.5);
        state.values.set(Action::from_index(2).unwrap(), 1.5);
        state.step = 7;
        state.cold_start.clear();

        let json = serde_json::to_string(&state).unwrap();
        let parsed: ControllerState = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, state);
    }

    #[test]
    fn test_fresh_state_has_full_cold_start_queue() {
        let state = ControllerState::default();
        let queued: Vec<usize> = state.cold_start.iter().map(|a| a.to_index()).collect();
        assert_eq!(queued, vec![0, 1, 2, 3, 4]);
        assert!(state.in_cold_start());
        assert_eq!(state.epsilon, 1.0);
    }
}
