use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{DirectoryError, User, UserDirectory, UserId};

/// Progress of a user's identity verification with the document provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
    NotStarted,
    Initiated,
    Verified,
    Failed,
}

impl KycStatus {
    pub const fn label(self) -> &'static str {
        match self {
            KycStatus::NotStarted => "not_started",
            KycStatus::Initiated => "initiated",
            KycStatus::Verified => "verified",
            KycStatus::Failed => "failed",
        }
    }
}

/// Per-user verification record holding the provider-issued identity fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycRecord {
    pub user_id: UserId,
    pub provider_request_id: Option<String>,
    pub legal_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub status: KycStatus,
    pub updated_at: DateTime<Utc>,
}

impl KycRecord {
    fn fresh(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            provider_request_id: None,
            legal_name: None,
            date_of_birth: None,
            status: KycStatus::NotStarted,
            updated_at: now,
        }
    }
}

/// Session handed back by the document-verification provider for the user to
/// complete in their browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSession {
    pub request_id: String,
    pub redirect_url: String,
}

/// Result delivered on the provider's callback.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderOutcome {
    pub request_id: String,
    pub verified: bool,
    pub legal_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

/// Outbound integration with the third-party document-verification provider.
pub trait KycProvider: Send + Sync {
    fn begin(&self, user: &User) -> Result<ProviderSession, KycProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum KycProviderError {
    #[error("verification provider unavailable: {0}")]
    Unavailable(String),
    #[error("verification provider rejected the request: {0}")]
    Rejected(String),
}

/// Storage abstraction for verification records.
pub trait KycRepository: Send + Sync {
    fn upsert(&self, record: KycRecord) -> Result<(), KycError>;
    fn fetch(&self, user_id: &UserId) -> Result<Option<KycRecord>, KycError>;
    fn by_request_id(&self, request_id: &str) -> Result<Option<KycRecord>, KycError>;
}

#[derive(Debug, thiserror::Error)]
pub enum KycError {
    #[error("user not found")]
    UnknownUser,
    #[error("no verification session matches this callback")]
    UnknownSession,
    #[error("only administrators may override verification")]
    AdminOnly,
    #[error(transparent)]
    Provider(#[from] KycProviderError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error("verification store unavailable: {0}")]
    Store(String),
}

/// Orchestrates provider sessions and keeps the per-user cached flag in sync.
pub struct KycService<P, K, D> {
    provider: Arc<P>,
    records: Arc<K>,
    directory: Arc<D>,
}

impl<P, K, D> KycService<P, K, D>
where
    P: KycProvider,
    K: KycRepository,
    D: UserDirectory,
{
    pub fn new(provider: Arc<P>, records: Arc<K>, directory: Arc<D>) -> Self {
        Self {
            provider,
            records,
            directory,
        }
    }

    /// Open a provider session for the user and mark their record `Initiated`.
    pub fn start(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<ProviderSession, KycError> {
        let user = self
            .directory
            .fetch(user_id)?
            .ok_or(KycError::UnknownUser)?;
        let session = self.provider.begin(&user)?;

        let mut record = self
            .records
            .fetch(user_id)?
            .unwrap_or_else(|| KycRecord::fresh(*user_id, now));
        record.provider_request_id = Some(session.request_id.clone());
        record.status = KycStatus::Initiated;
        record.updated_at = now;
        self.records.upsert(record)?;

        Ok(session)
    }

    /// Resolve a provider callback; a verified outcome flips the user's cached
    /// flag so mandate gating stays a plain field check.
    pub fn complete(
        &self,
        outcome: ProviderOutcome,
        now: DateTime<Utc>,
    ) -> Result<KycRecord, KycError> {
        let mut record = self
            .records
            .by_request_id(&outcome.request_id)?
            .ok_or(KycError::UnknownSession)?;

        record.status = if outcome.verified {
            KycStatus::Verified
        } else {
            KycStatus::Failed
        };
        record.legal_name = outcome.legal_name;
        record.date_of_birth = outcome.date_of_birth;
        record.updated_at = now;
        self.records.upsert(record.clone())?;

        self.directory
            .mark_kyc_verified(&record.user_id, outcome.verified)?;

        Ok(record)
    }

    /// Administrative override: mark a user verified without a provider
    /// round-trip. Used when documents were checked manually.
    pub fn admin_override(
        &self,
        actor: &User,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<KycRecord, KycError> {
        if !actor.role.is_admin() {
            return Err(KycError::AdminOnly);
        }

        let user = self
            .directory
            .fetch(user_id)?
            .ok_or(KycError::UnknownUser)?;

        let mut record = self
            .records
            .fetch(user_id)?
            .unwrap_or_else(|| KycRecord::fresh(*user_id, now));
        record.status = KycStatus::Verified;
        if record.legal_name.is_none() {
            record.legal_name = Some(user.full_name.clone());
        }
        record.updated_at = now;
        self.records.upsert(record.clone())?;

        self.directory.mark_kyc_verified(user_id, true)?;

        Ok(record)
    }

    pub fn record_for(&self, user_id: &UserId) -> Result<Option<KycRecord>, KycError> {
        self.records.fetch(user_id)
    }
}
