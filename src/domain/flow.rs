//! Dashboard flow states and transition rules.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowState {
    AwaitingDateInput,
    AwaitingQueryTrigger,
    DataLoaded,
    FilterApplied,
}

impl FlowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingDateInput => "AWAITING_DATE_INPUT",
            Self::AwaitingQueryTrigger => "AWAITING_QUERY_TRIGGER",
            Self::DataLoaded => "DATA_LOADED",
            Self::FilterApplied => "FILTER_APPLIED",
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::AwaitingDateInput,
            Self::AwaitingQueryTrigger,
            Self::DataLoaded,
            Self::FilterApplied,
        ]
    }
}

/// Loading only happens on an explicit trigger; date edits never query.
pub struct FlowMachine;

impl FlowMachine {
    pub fn can_transition(from: FlowState, to: FlowState) -> bool {
        use FlowState::*;
        match (from, to) {
            // dates picked or changed
            (_, AwaitingQueryTrigger) => true,
            // button press, also a re-run of the same range
            (AwaitingQueryTrigger, DataLoaded) | (DataLoaded, DataLoaded) | (FilterApplied, DataLoaded) => true,
            (DataLoaded, FilterApplied) | (FilterApplied, FilterApplied) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_then_trigger_then_filter() {
        use FlowState::*;
        assert!(FlowMachine::can_transition(AwaitingDateInput, AwaitingQueryTrigger));
        assert!(FlowMachine::can_transition(AwaitingQueryTrigger, DataLoaded));
        assert!(FlowMachine::can_transition(DataLoaded, FilterApplied));
        assert!(FlowMachine::can_transition(FilterApplied, FilterApplied));
    }

    #[test]
    fn cannot_load_without_dates() {
        assert!(!FlowMachine::can_transition(
            FlowState::AwaitingDateInput,
            FlowState::DataLoaded
        ));
    }

    #[test]
    fn cannot_filter_before_load() {
        assert!(!FlowMachine::can_transition(
            FlowState::AwaitingQueryTrigger,
            FlowState::FilterApplied
        ));
    }
}
