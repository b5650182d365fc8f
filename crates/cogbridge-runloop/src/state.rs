//! Scheduler state.

/// Lifecycle of the run scheduler.
///
/// `Idle -> Scheduling -> Executing -> Idle`; a request rejected while
/// scheduling goes straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    /// No run in progress.
    Idle = 0,
    /// Validating the request and resolving agents.
    Scheduling = 1,
    /// Stepping agents.
    Executing = 2,
}

impl From<u8> for SchedulerState {
    fn from(v: u8) -> Self {
        match v {
            1 => SchedulerState::Scheduling,
            2 => SchedulerState::Executing,
            _ => SchedulerState::Idle,
        }
    }
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "idle"),
            SchedulerState::Scheduling => write!(f, "scheduling"),
            SchedulerState::Executing => write!(f, "executing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_through_u8() {
        for state in [
            SchedulerState::Idle,
            SchedulerState::Scheduling,
            SchedulerState::Executing,
        ] {
            assert_eq!(SchedulerState::from(state as u8), state);
        }
        assert_eq!(SchedulerState::from(42), SchedulerState::Idle);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SchedulerState::Executing.to_string(), "executing");
    }
}
