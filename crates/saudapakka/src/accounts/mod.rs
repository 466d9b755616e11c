//! User accounts, one-time-passcode login, and KYC verification state.

pub mod domain;
pub mod kyc;
pub mod otp;

pub use domain::{DirectoryError, User, UserDirectory, UserId, UserRole};
pub use kyc::{
    KycError, KycProvider, KycProviderError, KycRecord, KycRepository, KycService, KycStatus,
    ProviderOutcome, ProviderSession,
};
pub use otp::{OtpAuthenticator, OtpChallenge, OtpError, OtpStore};
