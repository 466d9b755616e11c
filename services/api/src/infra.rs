use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate};
use metrics_exporter_prometheus::PrometheusHandle;
use saudapakka::accounts::{
    DirectoryError, KycError, KycProvider, KycProviderError, KycRecord, KycRepository,
    OtpChallenge, OtpError, OtpStore, ProviderSession, User, UserDirectory, UserId,
};
use saudapakka::listings::{
    ListingError, ListingRepository, ModerationStatus, PropertyId, PropertyListing,
};
use saudapakka::mandates::{Mandate, MandateId, MandateRepository, MandateStatus, RepositoryError};
use saudapakka::notifications::{Notification, NotificationError, NotificationSink};
use uuid::Uuid;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryUserDirectory {
    users: Arc<Mutex<HashMap<UserId, User>>>,
}

impl InMemoryUserDirectory {
    pub(crate) fn seed(&self, user: User) {
        let mut guard = self.users.lock().expect("directory mutex poisoned");
        guard.insert(user.id, user);
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn fetch(&self, id: &UserId) -> Result<Option<User>, DirectoryError> {
        let guard = self.users.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        let guard = self.users.lock().expect("directory mutex poisoned");
        Ok(guard
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn admins(&self) -> Result<Vec<User>, DirectoryError> {
        let guard = self.users.lock().expect("directory mutex poisoned");
        Ok(guard
            .values()
            .filter(|user| user.role.is_admin())
            .cloned()
            .collect())
    }

    fn users(&self) -> Result<Vec<User>, DirectoryError> {
        let guard = self.users.lock().expect("directory mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn mark_kyc_verified(&self, id: &UserId, verified: bool) -> Result<(), DirectoryError> {
        let mut guard = self.users.lock().expect("directory mutex poisoned");
        let user = guard.get_mut(id).ok_or(DirectoryError::NotFound)?;
        user.kyc_verified = verified;
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryMandateRepository {
    rows: Arc<Mutex<HashMap<MandateId, Mandate>>>,
}

impl MandateRepository for InMemoryMandateRepository {
    fn insert(&self, mandate: Mandate) -> Result<Mandate, RepositoryError> {
        let mut guard = self.rows.lock().expect("mandate mutex poisoned");
        if guard.contains_key(&mandate.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(mandate.id, mandate.clone());
        Ok(mandate)
    }

    fn update(&self, mandate: Mandate) -> Result<(), RepositoryError> {
        let mut guard = self.rows.lock().expect("mandate mutex poisoned");
        if guard.contains_key(&mandate.id) {
            guard.insert(mandate.id, mandate);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &MandateId) -> Result<Option<Mandate>, RepositoryError> {
        let guard = self.rows.lock().expect("mandate mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn open_for_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Option<Mandate>, RepositoryError> {
        let guard = self.rows.lock().expect("mandate mutex poisoned");
        Ok(guard
            .values()
            .find(|mandate| {
                mandate.property_id == *property_id
                    && matches!(
                        mandate.status,
                        MandateStatus::Pending | MandateStatus::Active
                    )
            })
            .cloned())
    }

    fn pending_expiring_before(
        &self,
        cutoff: DateTime<chrono::Utc>,
    ) -> Result<Vec<Mandate>, RepositoryError> {
        let guard = self.rows.lock().expect("mandate mutex poisoned");
        Ok(guard
            .values()
            .filter(|mandate| {
                mandate.status == MandateStatus::Pending && mandate.acceptance_expires_at <= cutoff
            })
            .cloned()
            .collect())
    }

    fn active_ending_on_or_before(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<Mandate>, RepositoryError> {
        let guard = self.rows.lock().expect("mandate mutex poisoned");
        Ok(guard
            .values()
            .filter(|mandate| {
                mandate.status == MandateStatus::Active
                    && mandate.end_date.is_some_and(|end| end <= date)
            })
            .cloned()
            .collect())
    }

    fn involving(&self, user: &UserId) -> Result<Vec<Mandate>, RepositoryError> {
        let guard = self.rows.lock().expect("mandate mutex poisoned");
        Ok(guard
            .values()
            .filter(|mandate| mandate.is_party(user))
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<Mandate>, RepositoryError> {
        let guard = self.rows.lock().expect("mandate mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryListingRepository {
    rows: Arc<Mutex<HashMap<PropertyId, PropertyListing>>>,
}

impl ListingRepository for InMemoryListingRepository {
    fn insert(&self, listing: PropertyListing) -> Result<PropertyListing, ListingError> {
        let mut guard = self.rows.lock().expect("listing mutex poisoned");
        guard.insert(listing.id, listing.clone());
        Ok(listing)
    }

    fn update(&self, listing: PropertyListing) -> Result<(), ListingError> {
        let mut guard = self.rows.lock().expect("listing mutex poisoned");
        if guard.contains_key(&listing.id) {
            guard.insert(listing.id, listing);
            Ok(())
        } else {
            Err(ListingError::NotFound)
        }
    }

    fn fetch(&self, id: &PropertyId) -> Result<Option<PropertyListing>, ListingError> {
        let guard = self.rows.lock().expect("listing mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn with_status(&self, status: ModerationStatus) -> Result<Vec<PropertyListing>, ListingError> {
        let guard = self.rows.lock().expect("listing mutex poisoned");
        Ok(guard
            .values()
            .filter(|listing| listing.status == status)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryKycRepository {
    rows: Arc<Mutex<HashMap<UserId, KycRecord>>>,
}

impl KycRepository for InMemoryKycRepository {
    fn upsert(&self, record: KycRecord) -> Result<(), KycError> {
        let mut guard = self.rows.lock().expect("kyc mutex poisoned");
        guard.insert(record.user_id, record);
        Ok(())
    }

    fn fetch(&self, user_id: &UserId) -> Result<Option<KycRecord>, KycError> {
        let guard = self.rows.lock().expect("kyc mutex poisoned");
        Ok(guard.get(user_id).cloned())
    }

    fn by_request_id(&self, request_id: &str) -> Result<Option<KycRecord>, KycError> {
        let guard = self.rows.lock().expect("kyc mutex poisoned");
        Ok(guard
            .values()
            .find(|record| record.provider_request_id.as_deref() == Some(request_id))
            .cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryOtpStore {
    codes: Arc<Mutex<HashMap<String, OtpChallenge>>>,
}

impl OtpStore for InMemoryOtpStore {
    fn put(&self, challenge: OtpChallenge) -> Result<(), OtpError> {
        let mut guard = self.codes.lock().expect("otp mutex poisoned");
        guard.insert(challenge.email.clone(), challenge);
        Ok(())
    }

    fn get(&self, email: &str) -> Result<Option<OtpChallenge>, OtpError> {
        let guard = self.codes.lock().expect("otp mutex poisoned");
        Ok(guard.get(email).cloned())
    }

    fn remove(&self, email: &str) -> Result<(), OtpError> {
        let mut guard = self.codes.lock().expect("otp mutex poisoned");
        guard.remove(email);
        Ok(())
    }
}

/// Records deliveries for the demo and logs them; real transports (email,
/// push) hang off the same trait.
#[derive(Default, Clone)]
pub(crate) struct RecordingNotificationSink {
    deliveries: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotificationSink {
    pub(crate) fn deliveries(&self) -> Vec<Notification> {
        self.deliveries
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn deliver(&self, notification: Notification) -> Result<(), NotificationError> {
        tracing::info!(recipient = %notification.recipient.0, "notification queued");
        let mut guard = self
            .deliveries
            .lock()
            .expect("notification mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

/// Stand-in for the document-verification provider: hands out a session
/// immediately. The real provider sits behind the same trait.
#[derive(Default, Clone)]
pub(crate) struct StaticKycProvider;

impl KycProvider for StaticKycProvider {
    fn begin(&self, _user: &User) -> Result<ProviderSession, KycProviderError> {
        let request_id = Uuid::new_v4().to_string();
        Ok(ProviderSession {
            redirect_url: format!("https://verify.saudapakka.in/session/{request_id}"),
            request_id,
        })
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
