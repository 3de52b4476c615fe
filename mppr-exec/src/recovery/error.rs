use mppr_core::TopologyError;

/// Why a recovery attempt did not succeed. Every variant is terminal for that call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecoveryError {
    #[error("mpp err recovery is not enabled")]
    NotEnabled,
    #[error("recovery request is missing or carries no failure")]
    InvalidInput,
    #[error("exceeds max recovery count: cur: {current}, max: {max}")]
    BudgetExceeded { current: u32, max: u32 },
    #[error("no handler to recover this type of failure")]
    Unclassified,
    #[error(transparent)]
    Handler(#[from] TopologyError),
}

impl RecoveryError {
    pub fn kind(&self) -> &'static str {
        match self {
            RecoveryError::NotEnabled => "not_enabled",
            RecoveryError::InvalidInput => "invalid_input",
            RecoveryError::BudgetExceeded { .. } => "budget_exceeded",
            RecoveryError::Unclassified => "unclassified",
            RecoveryError::Handler(_) => "handler",
        }
    }

    /// Whether the failed call consumed one unit of the retry budget.
    pub fn charged(&self) -> bool {
        matches!(self, RecoveryError::Unclassified | RecoveryError::Handler(_))
    }
}
