//! Fire-and-forget notification delivery.
//!
//! Mandate transitions emit typed events instead of template strings so sinks
//! (email, in-app, test recorders) consume structured payloads. Delivery is
//! best-effort: the emitting transaction never fails because a sink did.

use chrono::NaiveDate;
use serde::Serialize;

use crate::accounts::UserId;
use crate::listings::PropertyId;
use crate::mandates::{DealType, MandateId, MandateParty};

/// Tagged mandate lifecycle event carried to a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MandateEvent {
    Created {
        mandate_id: MandateId,
        number: String,
        property_id: PropertyId,
        deal_type: DealType,
        initiated_by: MandateParty,
    },
    Accepted {
        mandate_id: MandateId,
        number: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    Rejected {
        mandate_id: MandateId,
        number: String,
        reason: String,
    },
    Cancelled {
        mandate_id: MandateId,
        number: String,
        effective: NaiveDate,
    },
    Renewed {
        mandate_id: MandateId,
        renewed_from: MandateId,
        number: String,
        property_id: PropertyId,
        deal_type: DealType,
        initiated_by: MandateParty,
    },
}

/// A single message addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub recipient: UserId,
    pub event: MandateEvent,
}

/// Outbound delivery hook (e-mail adapter, in-app feed, test recorder).
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
