use tracing::{info, warn};

use crate::storage::BlobRef;

use super::state::IntakeState;

/// State carried through one `add_order` run.
pub struct IntakeContext {
    pub submission_id: String,
    pub file_name: String,
    state: IntakeState,
    // Set once the blob is stored; needed to clean up after a failed insert.
    pub blob: Option<BlobRef>,
}

impl IntakeContext {
    pub fn new(submission_id: String, file_name: &str) -> Self {
        info!(submission = %submission_id, state = %IntakeState::Received, "intake started");
        Self {
            submission_id,
            file_name: file_name.to_string(),
            state: IntakeState::Received,
            blob: None,
        }
    }

    pub fn state(&self) -> IntakeState {
        self.state
    }

    /// Moves to `next` and logs the transition.
    pub fn advance(&mut self, next: IntakeState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal intake transition {} -> {}",
            self.state,
            next
        );
        if next.is_rejected() {
            warn!(submission = %self.submission_id, from = %self.state, to = %next, "intake rejected");
        } else {
            info!(submission = %self.submission_id, from = %self.state, to = %next, "intake advanced");
        }
        self.state = next;
    }
}
