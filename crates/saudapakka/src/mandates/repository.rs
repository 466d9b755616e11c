use chrono::{DateTime, NaiveDate, Utc};

use crate::accounts::UserId;
use crate::listings::PropertyId;

use super::domain::{Mandate, MandateId};

/// Storage abstraction for mandate rows.
///
/// The sweep queries return only rows still matching their filter, which is
/// what makes the periodic expiry batch idempotent: a second pass finds
/// nothing left to transition.
pub trait MandateRepository: Send + Sync {
    fn insert(&self, mandate: Mandate) -> Result<Mandate, RepositoryError>;
    fn update(&self, mandate: Mandate) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &MandateId) -> Result<Option<Mandate>, RepositoryError>;
    /// The `PENDING` or `ACTIVE` mandate currently holding the property, if
    /// any. At most one may exist at a time.
    fn open_for_property(&self, property_id: &PropertyId)
        -> Result<Option<Mandate>, RepositoryError>;
    /// `PENDING` mandates whose acceptance deadline passed before `cutoff`.
    fn pending_expiring_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Mandate>, RepositoryError>;
    /// `ACTIVE` mandates whose validity window ends on or before `date`.
    fn active_ending_on_or_before(&self, date: NaiveDate)
        -> Result<Vec<Mandate>, RepositoryError>;
    fn involving(&self, user: &UserId) -> Result<Vec<Mandate>, RepositoryError>;
    fn all(&self) -> Result<Vec<Mandate>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("mandate already exists")]
    Conflict,
    #[error("mandate not found")]
    NotFound,
    #[error("mandate store unavailable: {0}")]
    Unavailable(String),
}
