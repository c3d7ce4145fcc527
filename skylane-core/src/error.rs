use crate::repository::RepoError;

/// Error taxonomy for every core operation. Storage-level constraint
/// violations are re-classified at the operation boundary and never leak
/// through this interface raw.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("seat {seat_number} on flight {flight_id} is unavailable")]
    SeatUnavailable { flight_id: String, seat_number: String },

    /// Domain-rule violation that neither retries nor client fixes can
    /// resolve by themselves (e.g. malformed webhook metadata).
    #[error("business rule violation: {0}")]
    Business(String),

    /// Booking-reference collision at persist time. Rare; retriable.
    #[error("booking reference collision, retry the operation")]
    PnrCollision,

    #[error("storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound { kind, id: id.to_string() }
    }
}

impl From<RepoError> for DomainError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound { kind, id } => DomainError::NotFound { kind, id },
            // Call sites with a more specific meaning (seat occupancy,
            // PNR uniqueness) match on UniqueViolation before using `?`.
            RepoError::UniqueViolation { constraint } => {
                DomainError::Business(format!("unique constraint violated: {}", constraint))
            }
            RepoError::Storage(msg) => DomainError::Storage(msg),
        }
    }
}
