use alloy::primitives::B256;
use std::fmt;
use tokio::sync::watch;

/// Progress of one rescue, as observed by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    NotStarted,
    FetchingWrappedCurrency,
    ApprovingAllowance,
    SigningPermit,
    Broadcasting { attempts: u64, last_block: u64 },
    Success { tx_hash: B256 },
    Failed { reason: String, detail: String },
}

impl SubmissionState {
    /// Position in the forward-only preparation order. Terminal states rank last.
    pub fn rank(&self) -> u8 {
        match self {
            SubmissionState::NotStarted => 0,
            SubmissionState::FetchingWrappedCurrency => 1,
            SubmissionState::ApprovingAllowance => 2,
            SubmissionState::SigningPermit => 3,
            SubmissionState::Broadcasting { .. } => 4,
            SubmissionState::Success { .. } | SubmissionState::Failed { .. } => 5,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::Success { .. } | SubmissionState::Failed { .. }
        )
    }

    pub fn can_transition_to(&self, next: &SubmissionState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            SubmissionState::Success { .. } => {
                matches!(self, SubmissionState::Broadcasting { .. })
            }
            SubmissionState::Failed { .. } => true,
            SubmissionState::Broadcasting { .. } => self.rank() <= next.rank(),
            _ => self.rank() < next.rank(),
        }
    }

    /// Gauge value exported to metrics.
    pub fn metric_value(&self) -> u8 {
        match self {
            SubmissionState::Failed { .. } => 6,
            other => other.rank(),
        }
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionState::NotStarted => write!(f, "Not started"),
            SubmissionState::FetchingWrappedCurrency => write!(f, "Fetching wrapped currency"),
            SubmissionState::ApprovingAllowance => write!(f, "Approving allowance"),
            SubmissionState::SigningPermit => write!(f, "Signing permit"),
            SubmissionState::Broadcasting {
                attempts,
                last_block,
            } => write!(f, "Broadcasting (attempt {attempts}, block {last_block})"),
            SubmissionState::Success { tx_hash } => write!(f, "Success: {tx_hash}"),
            SubmissionState::Failed { reason, detail } => write!(f, "Failed: {reason}: {detail}"),
        }
    }
}

/// Holds the current state and rejects writes that would move it backwards
/// or out of a terminal state.
pub struct ProgressRegister {
    sender: watch::Sender<SubmissionState>,
}

impl ProgressRegister {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(SubmissionState::NotStarted);
        Self { sender }
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> SubmissionState {
        self.sender.borrow().clone()
    }

    /// Returns `false` when the transition was rejected and nothing changed.
    pub fn transition(&self, next: SubmissionState) -> bool {
        self.sender.send_if_modified(|state| {
            if state.can_transition_to(&next) {
                *state = next;
                true
            } else {
                false
            }
        })
    }
}

impl Default for ProgressRegister {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broadcasting(attempts: u64) -> SubmissionState {
        SubmissionState::Broadcasting {
            attempts,
            last_block: 100 + attempts,
        }
    }

    fn failed() -> SubmissionState {
        SubmissionState::Failed {
            reason: "r".to_string(),
            detail: "d".to_string(),
        }
    }

    #[test]
    fn test_preparation_only_moves_forward() {
        let register = ProgressRegister::new();
        assert!(register.transition(SubmissionState::ApprovingAllowance));
        assert!(!register.transition(SubmissionState::FetchingWrappedCurrency));
        assert!(register.transition(SubmissionState::SigningPermit));
        assert!(!register.transition(SubmissionState::SigningPermit));
        assert!(register.transition(broadcasting(1)));
        assert!(register.transition(broadcasting(2)));
        assert_eq!(register.current(), broadcasting(2));
        assert!(!register.transition(SubmissionState::SigningPermit));
    }

    #[test]
    fn test_success_only_from_broadcasting() {
        let register = ProgressRegister::new();
        let success = SubmissionState::Success {
            tx_hash: B256::repeat_byte(1),
        };
        assert!(!register.transition(success.clone()));
        assert!(register.transition(broadcasting(1)));
        assert!(register.transition(success.clone()));
        assert_eq!(register.current(), success);
    }

    #[test]
    fn test_terminal_states_never_change() {
        let register = ProgressRegister::new();
        assert!(register.transition(failed()));
        assert!(!register.transition(broadcasting(1)));
        assert!(!register.transition(SubmissionState::Success {
            tx_hash: B256::ZERO
        }));
        assert!(!register.transition(SubmissionState::Failed {
            reason: "late".to_string(),
            detail: "late".to_string(),
        }));
        assert_eq!(register.current(), failed());
    }

    #[tokio::test]
    async fn test_observers_see_transitions() {
        let register = ProgressRegister::new();
        let mut receiver = register.subscribe();
        register.transition(SubmissionState::SigningPermit);
        receiver.changed().await.unwrap();
        assert_eq!(*receiver.borrow(), SubmissionState::SigningPermit);

        register.transition(SubmissionState::NotStarted);
        assert!(!receiver.has_changed().unwrap());
    }
}
