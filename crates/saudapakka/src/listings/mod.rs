//! Moderated property inventory. Listings enter a review queue and only go
//! live once an administrator approves them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::{User, UserId};

/// Identifier wrapper for property listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub Uuid);

impl PropertyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PropertyId {
    fn default() -> Self {
        Self::new()
    }
}

/// Moderation verdict for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationStatus {
    Pending,
    Verified,
    Rejected,
}

impl ModerationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Verified => "verified",
            ModerationStatus::Rejected => "rejected",
        }
    }
}

/// A marketed property. Commercial details are deliberately thin; the mandate
/// module only needs identity and ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyListing {
    pub id: PropertyId,
    pub owner_id: UserId,
    pub title: String,
    pub locality: String,
    pub asking_price: u64,
    pub status: ModerationStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Seller-submitted listing details.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    pub locality: String,
    pub asking_price: u64,
}

/// Storage abstraction so moderation can be exercised in isolation.
pub trait ListingRepository: Send + Sync {
    fn insert(&self, listing: PropertyListing) -> Result<PropertyListing, ListingError>;
    fn update(&self, listing: PropertyListing) -> Result<(), ListingError>;
    fn fetch(&self, id: &PropertyId) -> Result<Option<PropertyListing>, ListingError>;
    fn with_status(&self, status: ModerationStatus) -> Result<Vec<PropertyListing>, ListingError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("listing not found")]
    NotFound,
    #[error("only sellers may submit listings")]
    NotASeller,
    #[error("only administrators may moderate listings")]
    AdminOnly,
    #[error("listing title must not be empty")]
    EmptyTitle,
    #[error("listing store unavailable: {0}")]
    Unavailable(String),
}

/// Submission and moderation operations over the listing inventory.
pub struct ListingService<R> {
    repository: Arc<R>,
}

impl<R> ListingService<R>
where
    R: ListingRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Submit a new listing into the moderation queue.
    pub fn submit(
        &self,
        actor: &User,
        draft: ListingDraft,
        now: DateTime<Utc>,
    ) -> Result<PropertyListing, ListingError> {
        if !actor.role.acts_as_seller() {
            return Err(ListingError::NotASeller);
        }
        if draft.title.trim().is_empty() {
            return Err(ListingError::EmptyTitle);
        }

        let listing = PropertyListing {
            id: PropertyId::new(),
            owner_id: actor.id,
            title: draft.title.trim().to_string(),
            locality: draft.locality,
            asking_price: draft.asking_price,
            status: ModerationStatus::Pending,
            rejection_reason: None,
            created_at: now,
        };
        self.repository.insert(listing)
    }

    /// Approve a listing; clears any previous rejection reason.
    pub fn approve(&self, actor: &User, id: &PropertyId) -> Result<PropertyListing, ListingError> {
        self.moderate(actor, id, ModerationStatus::Verified, None)
    }

    /// Reject a listing, recording the reason shown to the owner.
    pub fn reject(
        &self,
        actor: &User,
        id: &PropertyId,
        reason: String,
    ) -> Result<PropertyListing, ListingError> {
        self.moderate(actor, id, ModerationStatus::Rejected, Some(reason))
    }

    fn moderate(
        &self,
        actor: &User,
        id: &PropertyId,
        verdict: ModerationStatus,
        reason: Option<String>,
    ) -> Result<PropertyListing, ListingError> {
        if !actor.role.is_admin() {
            return Err(ListingError::AdminOnly);
        }

        let mut listing = self.repository.fetch(id)?.ok_or(ListingError::NotFound)?;
        listing.status = verdict;
        listing.rejection_reason = reason;
        self.repository.update(listing.clone())?;
        Ok(listing)
    }

    pub fn moderation_queue(&self) -> Result<Vec<PropertyListing>, ListingError> {
        self.repository.with_status(ModerationStatus::Pending)
    }

    /// Listings live on the marketplace.
    pub fn verified(&self) -> Result<Vec<PropertyListing>, ListingError> {
        self.repository.with_status(ModerationStatus::Verified)
    }

    pub fn fetch(&self, id: &PropertyId) -> Result<Option<PropertyListing>, ListingError> {
        self.repository.fetch(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::UserRole;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryListings {
        rows: Mutex<HashMap<PropertyId, PropertyListing>>,
    }

    impl ListingRepository for MemoryListings {
        fn insert(&self, listing: PropertyListing) -> Result<PropertyListing, ListingError> {
            self.rows
                .lock()
                .expect("listing mutex poisoned")
                .insert(listing.id, listing.clone());
            Ok(listing)
        }

        fn update(&self, listing: PropertyListing) -> Result<(), ListingError> {
            let mut rows = self.rows.lock().expect("listing mutex poisoned");
            if !rows.contains_key(&listing.id) {
                return Err(ListingError::NotFound);
            }
            rows.insert(listing.id, listing);
            Ok(())
        }

        fn fetch(&self, id: &PropertyId) -> Result<Option<PropertyListing>, ListingError> {
            Ok(self
                .rows
                .lock()
                .expect("listing mutex poisoned")
                .get(id)
                .cloned())
        }

        fn with_status(
            &self,
            status: ModerationStatus,
        ) -> Result<Vec<PropertyListing>, ListingError> {
            Ok(self
                .rows
                .lock()
                .expect("listing mutex poisoned")
                .values()
                .filter(|listing| listing.status == status)
                .cloned()
                .collect())
        }
    }

    fn user(role: UserRole) -> User {
        User {
            id: UserId::new(),
            email: format!("{}@example.in", role.label()),
            phone_number: None,
            full_name: "Test User".to_string(),
            role,
            kyc_verified: true,
        }
    }

    fn draft() -> ListingDraft {
        ListingDraft {
            title: "2BHK near Baner Road".to_string(),
            locality: "Baner".to_string(),
            asking_price: 8_500_000,
        }
    }

    #[test]
    fn submitted_listing_enters_moderation_queue() {
        let service = ListingService::new(Arc::new(MemoryListings::default()));
        let seller = user(UserRole::Seller);

        let listing = service
            .submit(&seller, draft(), Utc::now())
            .expect("listing stored");
        assert_eq!(listing.status, ModerationStatus::Pending);

        let queue = service.moderation_queue().expect("queue loads");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn broker_cannot_submit_listing() {
        let service = ListingService::new(Arc::new(MemoryListings::default()));
        let broker = user(UserRole::Broker);

        let result = service.submit(&broker, draft(), Utc::now());
        assert!(matches!(result, Err(ListingError::NotASeller)));
    }

    #[test]
    fn approval_clears_rejection_reason() {
        let service = ListingService::new(Arc::new(MemoryListings::default()));
        let seller = user(UserRole::Builder);
        let admin = user(UserRole::Admin);

        let listing = service
            .submit(&seller, draft(), Utc::now())
            .expect("listing stored");

        let rejected = service
            .reject(&admin, &listing.id, "photos missing".to_string())
            .expect("rejection recorded");
        assert_eq!(rejected.status, ModerationStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("photos missing"));

        let approved = service
            .approve(&admin, &listing.id)
            .expect("approval recorded");
        assert_eq!(approved.status, ModerationStatus::Verified);
        assert!(approved.rejection_reason.is_none());
    }

    #[test]
    fn moderation_requires_admin() {
        let service = ListingService::new(Arc::new(MemoryListings::default()));
        let seller = user(UserRole::Seller);
        let listing = service
            .submit(&seller, draft(), Utc::now())
            .expect("listing stored");

        let result = service.approve(&seller, &listing.id);
        assert!(matches!(result, Err(ListingError::AdminOnly)));
    }
}
