use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::UserId;
use crate::listings::PropertyId;

use super::lifecycle;

/// Identifier wrapper for mandates. Distinct from the human-facing mandate
/// number printed on the letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MandateId(pub Uuid);

impl MandateId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MandateId {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the seller contracts a broker or the platform directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealType {
    WithBroker,
    WithPlatform,
}

impl DealType {
    pub const fn label(self) -> &'static str {
        match self {
            DealType::WithBroker => "with_broker",
            DealType::WithPlatform => "with_platform",
        }
    }
}

/// The two sides of a mandate. Used both for "who initiated" and for locating
/// signature slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MandateParty {
    Seller,
    Broker,
}

impl MandateParty {
    pub const fn label(self) -> &'static str {
        match self {
            MandateParty::Seller => "seller",
            MandateParty::Broker => "broker",
        }
    }

    pub const fn other(self) -> Self {
        match self {
            MandateParty::Seller => MandateParty::Broker,
            MandateParty::Broker => MandateParty::Seller,
        }
    }
}

/// Lifecycle status. Transitions are one-directional; renewal creates a new
/// mandate rather than reviving a closed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MandateStatus {
    Pending,
    Active,
    Rejected,
    Expired,
    Terminated,
    TerminatedByUser,
}

impl MandateStatus {
    pub const fn label(self) -> &'static str {
        match self {
            MandateStatus::Pending => "pending",
            MandateStatus::Active => "active",
            MandateStatus::Rejected => "rejected",
            MandateStatus::Expired => "expired",
            MandateStatus::Terminated => "terminated",
            MandateStatus::TerminatedByUser => "terminated_by_user",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            MandateStatus::Rejected
                | MandateStatus::Expired
                | MandateStatus::Terminated
                | MandateStatus::TerminatedByUser
        )
    }
}

/// Reference to an externally stored binary object (signature image, selfie).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub storage_key: String,
}

impl Attachment {
    pub fn new(storage_key: impl Into<String>) -> Self {
        Self {
            storage_key: storage_key.into(),
        }
    }
}

/// Signature plus liveness selfie collected from one party. Both halves are
/// optional at the wire level so the service can report which is missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignaturePacket {
    pub signature: Option<Attachment>,
    pub selfie: Option<Attachment>,
}

/// Commission terms. Rate and fixed fee are mutually optional; the letter
/// renders whichever is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommercialTerms {
    pub is_exclusive: bool,
    pub commission_rate: Option<f64>,
    pub fixed_amount: Option<u64>,
}

impl Default for CommercialTerms {
    fn default() -> Self {
        Self {
            is_exclusive: true,
            commission_rate: None,
            fixed_amount: None,
        }
    }
}

/// Inbound request to open a mandate. The initiator's own slot is filled from
/// the acting user; administrators must name both parties explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct MandateDraft {
    pub property_id: PropertyId,
    pub deal_type: DealType,
    pub initiated_by: MandateParty,
    pub seller: Option<UserId>,
    pub broker: Option<UserId>,
    #[serde(default)]
    pub terms: CommercialTerms,
    #[serde(flatten)]
    pub packet: SignaturePacket,
}

/// A mandate row. Timers and the display number are computed by explicit
/// lifecycle functions before commit, never by save-time hooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mandate {
    pub id: MandateId,
    pub number: String,
    pub property_id: PropertyId,
    pub seller_id: UserId,
    pub broker_id: Option<UserId>,
    pub deal_type: DealType,
    pub initiated_by: MandateParty,
    pub terms: CommercialTerms,
    pub status: MandateStatus,
    pub created_at: DateTime<Utc>,
    pub acceptance_expires_at: DateTime<Utc>,
    pub signed_at: Option<DateTime<Utc>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub seller_signature: Option<Attachment>,
    pub seller_selfie: Option<Attachment>,
    pub broker_signature: Option<Attachment>,
    pub broker_selfie: Option<Attachment>,
    pub rejection_reason: Option<String>,
    pub renewed_from: Option<MandateId>,
}

impl Mandate {
    /// The user slot holding a given side, if assigned.
    pub fn party_user(&self, side: MandateParty) -> Option<UserId> {
        match side {
            MandateParty::Seller => Some(self.seller_id),
            MandateParty::Broker => self.broker_id,
        }
    }

    pub fn signature_for(&self, side: MandateParty) -> Option<&Attachment> {
        match side {
            MandateParty::Seller => self.seller_signature.as_ref(),
            MandateParty::Broker => self.broker_signature.as_ref(),
        }
    }

    pub(crate) fn attach(&mut self, side: MandateParty, signature: Attachment, selfie: Attachment) {
        match side {
            MandateParty::Seller => {
                self.seller_signature = Some(signature);
                self.seller_selfie = Some(selfie);
            }
            MandateParty::Broker => {
                self.broker_signature = Some(signature);
                self.broker_selfie = Some(selfie);
            }
        }
    }

    pub fn is_party(&self, user: &UserId) -> bool {
        self.seller_id == *user || self.broker_id.as_ref() == Some(user)
    }

    /// Days left on an active mandate, clamped at zero, for dashboards.
    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        match (self.status, self.end_date) {
            (MandateStatus::Active, Some(end)) => lifecycle::days_remaining(end, today),
            _ => 0,
        }
    }

    pub fn view(&self, today: NaiveDate) -> MandateView {
        MandateView {
            id: self.id,
            number: self.number.clone(),
            property_id: self.property_id,
            seller: self.seller_id,
            broker: self.broker_id,
            deal_type: self.deal_type,
            initiated_by: self.initiated_by,
            is_exclusive: self.terms.is_exclusive,
            commission_rate: self.terms.commission_rate,
            fixed_amount: self.terms.fixed_amount,
            status: self.status.label(),
            created_at: self.created_at,
            acceptance_expires_at: self.acceptance_expires_at,
            signed_at: self.signed_at,
            start_date: self.start_date,
            end_date: self.end_date,
            days_remaining: self.days_remaining(today),
            seller_signed: self.seller_signature.is_some(),
            broker_signed: self.broker_signature.is_some(),
            rejection_reason: self.rejection_reason.clone(),
            renewed_from: self.renewed_from,
        }
    }
}

/// Sanitized representation of a mandate for API responses. Attachment storage
/// keys stay server-side; only signed/unsigned flags are exposed.
#[derive(Debug, Clone, Serialize)]
pub struct MandateView {
    pub id: MandateId,
    pub number: String,
    pub property_id: PropertyId,
    pub seller: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker: Option<UserId>,
    pub deal_type: DealType,
    pub initiated_by: MandateParty,
    pub is_exclusive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_amount: Option<u64>,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    pub acceptance_expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub days_remaining: i64,
    pub seller_signed: bool,
    pub broker_signed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renewed_from: Option<MandateId>,
}
