//! Domain library for the SaudaPakka real-estate mandate platform.
//!
//! The library owns the business rules: user accounts with one-time-passcode login
//! and KYC verification state, moderated property listings, and the mandate
//! lifecycle (signature collection, acceptance and validity windows, renewal
//! chaining). Persistence, notification transport, and the KYC provider are
//! expressed as traits so the services crate can wire real or in-memory adapters.

pub mod accounts;
pub mod config;
pub mod error;
pub mod listings;
pub mod mandates;
pub mod notifications;
pub mod telemetry;
