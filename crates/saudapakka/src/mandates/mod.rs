//! Mandate contracts: marketing/sale authorizations between a property owner
//! and either a broker or the platform itself.
//!
//! The lifecycle is one-directional: `PENDING` mandates collect the
//! counterparty signature within a seven-day window and become `ACTIVE` for
//! ninety days, or fall out through rejection, expiry, or administrative
//! termination. Renewal never mutates history; it spawns a fresh `PENDING`
//! mandate linked to its predecessor.

pub mod domain;
pub mod letter;
pub mod lifecycle;
pub mod number;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    Attachment, CommercialTerms, DealType, Mandate, MandateDraft, MandateId, MandateParty,
    MandateStatus, MandateView, SignaturePacket,
};
pub use letter::MandateLetter;
pub use lifecycle::{acceptance_deadline, validity_end, SweepReport};
pub use number::mandate_number;
pub use repository::{MandateRepository, RepositoryError};
pub use router::mandate_router;
pub use service::{MandateError, MandateService};
