//! Per-submission states of the intake flow.

/// Where a submission stands.
///
/// Success path: `Received → Validated → BlobStored → Persisted`. Each edge
/// has one rejected exit. Only `RejectedPersistFailed` can leave a blob
/// behind without a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeState {
    Received,
    Validated,
    BlobStored,
    Persisted,
    RejectedInvalid,
    RejectedUploadFailed,
    RejectedPersistFailed,
}

impl IntakeState {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            IntakeState::Received | IntakeState::Validated | IntakeState::BlobStored
        )
    }

    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            IntakeState::RejectedInvalid
                | IntakeState::RejectedUploadFailed
                | IntakeState::RejectedPersistFailed
        )
    }

    pub fn can_transition_to(&self, next: IntakeState) -> bool {
        use IntakeState::*;
        matches!(
            (self, next),
            (Received, Validated)
                | (Received, RejectedInvalid)
                | (Validated, BlobStored)
                | (Validated, RejectedUploadFailed)
                | (BlobStored, Persisted)
                | (BlobStored, RejectedPersistFailed)
        )
    }
}

impl std::fmt::Display for IntakeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntakeState::Received => write!(f, "received"),
            IntakeState::Validated => write!(f, "validated"),
            IntakeState::BlobStored => write!(f, "blob_stored"),
            IntakeState::Persisted => write!(f, "persisted"),
            IntakeState::RejectedInvalid => write!(f, "rejected_invalid"),
            IntakeState::RejectedUploadFailed => write!(f, "rejected_upload_failed"),
            IntakeState::RejectedPersistFailed => write!(f, "rejected_persist_failed"),
        }
    }
}
