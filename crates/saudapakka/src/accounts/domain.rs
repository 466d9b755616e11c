use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for platform users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

/// Role category assigned at signup. Admins are platform staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Seller,
    Broker,
    Builder,
    PlottingAgency,
    Admin,
}

impl UserRole {
    pub const fn label(self) -> &'static str {
        match self {
            UserRole::Seller => "seller",
            UserRole::Broker => "broker",
            UserRole::Builder => "builder",
            UserRole::PlottingAgency => "plotting_agency",
            UserRole::Admin => "admin",
        }
    }

    pub const fn is_admin(self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Builders and plotting agencies list inventory and sign mandates as sellers.
    pub const fn acts_as_seller(self) -> bool {
        matches!(
            self,
            UserRole::Seller | UserRole::Builder | UserRole::PlottingAgency
        )
    }
}

/// Platform account. `kyc_verified` is a cached flag kept in sync by the KYC
/// service so mandate gating never needs a provider round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub phone_number: Option<String>,
    pub full_name: String,
    pub role: UserRole,
    pub kyc_verified: bool,
}

impl User {
    /// First name when known, otherwise the local part of the email address.
    /// Mandate numbers derive their party codes from this.
    pub fn display_handle(&self) -> &str {
        match self.full_name.split_whitespace().next() {
            Some(first) => first,
            None => self.email.split('@').next().unwrap_or(self.email.as_str()),
        }
    }
}

/// Read access to platform accounts plus the single cache-maintenance hook the
/// KYC service needs.
pub trait UserDirectory: Send + Sync {
    fn fetch(&self, id: &UserId) -> Result<Option<User>, DirectoryError>;
    fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError>;
    /// Every platform administrator; recipients for `WITH_PLATFORM` deal alerts.
    fn admins(&self) -> Result<Vec<User>, DirectoryError>;
    fn users(&self) -> Result<Vec<User>, DirectoryError>;
    fn mark_kyc_verified(&self, id: &UserId, verified: bool) -> Result<(), DirectoryError>;
}

/// Error enumeration for directory failures.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("user not found")]
    NotFound,
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}
