use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::accounts::{DirectoryError, User, UserDirectory, UserId, UserRole};
use crate::notifications::{MandateEvent, Notification, NotificationSink};

use super::domain::{
    DealType, Mandate, MandateDraft, MandateId, MandateParty, MandateStatus, SignaturePacket,
};
use super::letter::MandateLetter;
use super::lifecycle::{self, SweepReport};
use super::number::mandate_number;
use super::repository::{MandateRepository, RepositoryError};

/// Error raised by mandate operations. Every variant is surfaced
/// synchronously to the caller; a transition commits fully or not at all.
#[derive(Debug, thiserror::Error)]
pub enum MandateError {
    #[error("digital {kind} attachment is required")]
    MissingAttachment { kind: &'static str },
    #[error("you must specify which {0} the mandate is with")]
    MissingCounterparty(&'static str),
    #[error("platform deals cannot name a broker")]
    PlatformDealNamesBroker,
    #[error("platform deals are opened by the seller")]
    PlatformDealNeedsSeller,
    #[error("a {role} account cannot initiate a mandate as {side}")]
    RoleCannotInitiate {
        role: &'static str,
        side: &'static str,
    },
    #[error("identity verification is required before signing mandates")]
    KycRequired,
    #[error("you are not a party to this mandate")]
    NotAParty,
    #[error("only administrators may terminate mandates")]
    AdminOnly,
    #[error("mandate is not awaiting signature (status: {})", .status.label())]
    NotPending { status: MandateStatus },
    #[error("the {} side has already signed", .side.label())]
    AlreadySigned { side: MandateParty },
    #[error("the acceptance window closed on {deadline}")]
    AcceptanceWindowClosed { deadline: DateTime<Utc> },
    #[error("mandate is already closed (status: {})", .status.label())]
    AlreadyClosed { status: MandateStatus },
    #[error("only expired mandates can be renewed (status: {})", .status.label())]
    NotRenewable { status: MandateStatus },
    #[error("property already holds a pending or active mandate")]
    PropertyConflict,
    #[error("mandate not found")]
    NotFound,
    #[error("referenced user does not exist")]
    UnknownUser,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Service composing the mandate store, user directory, and notification sink.
///
/// Every operation takes the acting user explicitly; there is no ambient
/// request context. Clocks are passed in as well so tests and the expiry sweep
/// can replay timelines deterministically.
pub struct MandateService<R, D, N> {
    repository: Arc<R>,
    directory: Arc<D>,
    notifications: Arc<N>,
}

impl<R, D, N> MandateService<R, D, N>
where
    R: MandateRepository + 'static,
    D: UserDirectory + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(repository: Arc<R>, directory: Arc<D>, notifications: Arc<N>) -> Self {
        Self {
            repository,
            directory,
            notifications,
        }
    }

    /// Open a new `PENDING` mandate.
    ///
    /// Sellers (including builders and plotting agencies) and brokers
    /// initiate for themselves; administrators may open on behalf of named
    /// parties and skip the KYC gate.
    pub fn create(
        &self,
        actor_id: &UserId,
        draft: MandateDraft,
        now: DateTime<Utc>,
    ) -> Result<Mandate, MandateError> {
        self.open(actor_id, draft, None, now)
    }

    fn open(
        &self,
        actor_id: &UserId,
        draft: MandateDraft,
        renewed_from: Option<MandateId>,
        now: DateTime<Utc>,
    ) -> Result<Mandate, MandateError> {
        let actor = self.user(actor_id)?;
        let MandateDraft {
            property_id,
            deal_type,
            initiated_by,
            seller,
            broker,
            terms,
            packet,
        } = draft;

        let signature = packet.signature.ok_or(MandateError::MissingAttachment {
            kind: "signature",
        })?;
        let selfie = packet
            .selfie
            .ok_or(MandateError::MissingAttachment { kind: "selfie" })?;

        if !actor.role.is_admin() && !actor.kyc_verified {
            return Err(MandateError::KycRequired);
        }

        if deal_type == DealType::WithPlatform {
            if initiated_by == MandateParty::Broker {
                return Err(MandateError::PlatformDealNeedsSeller);
            }
            if broker.is_some() {
                return Err(MandateError::PlatformDealNamesBroker);
            }
        }

        let (seller_id, broker_id) = match initiated_by {
            MandateParty::Seller => {
                let seller_id = if actor.role.is_admin() {
                    seller.ok_or(MandateError::MissingCounterparty("seller"))?
                } else {
                    if !actor.role.acts_as_seller() {
                        return Err(MandateError::RoleCannotInitiate {
                            role: actor.role.label(),
                            side: "seller",
                        });
                    }
                    actor.id
                };
                let broker_id = match deal_type {
                    DealType::WithBroker => {
                        Some(broker.ok_or(MandateError::MissingCounterparty("broker"))?)
                    }
                    DealType::WithPlatform => None,
                };
                (seller_id, broker_id)
            }
            MandateParty::Broker => {
                let broker_id = if actor.role.is_admin() {
                    broker.ok_or(MandateError::MissingCounterparty("broker"))?
                } else {
                    if actor.role != UserRole::Broker {
                        return Err(MandateError::RoleCannotInitiate {
                            role: actor.role.label(),
                            side: "broker",
                        });
                    }
                    actor.id
                };
                let seller_id = seller.ok_or(MandateError::MissingCounterparty("seller"))?;
                (seller_id, Some(broker_id))
            }
        };

        let seller_user = self.user(&seller_id)?;
        let broker_user = match broker_id {
            Some(id) => Some(self.user(&id)?),
            None => None,
        };
        let initiator = match initiated_by {
            MandateParty::Seller => seller_user,
            MandateParty::Broker => broker_user.ok_or(MandateError::UnknownUser)?,
        };

        // Application-level uniqueness check; see DESIGN.md for the race note.
        if self.repository.open_for_property(&property_id)?.is_some() {
            return Err(MandateError::PropertyConflict);
        }

        let mut mandate = Mandate {
            id: MandateId::new(),
            number: mandate_number(now.date_naive(), &initiator, None),
            property_id,
            seller_id,
            broker_id,
            deal_type,
            initiated_by,
            terms,
            status: MandateStatus::Pending,
            created_at: now,
            acceptance_expires_at: lifecycle::acceptance_deadline(now),
            signed_at: None,
            start_date: None,
            end_date: None,
            seller_signature: None,
            seller_selfie: None,
            broker_signature: None,
            broker_selfie: None,
            rejection_reason: None,
            renewed_from,
        };
        mandate.attach(initiated_by, signature, selfie);

        let stored = self.repository.insert(mandate)?;
        info!(mandate = %stored.number, status = stored.status.label(), "mandate opened");

        let event = match renewed_from {
            Some(source) => MandateEvent::Renewed {
                mandate_id: stored.id,
                renewed_from: source,
                number: stored.number.clone(),
                property_id: stored.property_id,
                deal_type,
                initiated_by,
            },
            None => MandateEvent::Created {
                mandate_id: stored.id,
                number: stored.number.clone(),
                property_id: stored.property_id,
                deal_type,
                initiated_by,
            },
        };

        match (initiated_by, deal_type) {
            // A broker approaching a seller: the seller must come sign.
            (MandateParty::Broker, _) => self.notify(stored.seller_id, event),
            // A seller hiring the platform: every administrator is alerted.
            (MandateParty::Seller, DealType::WithPlatform) => {
                for admin in self.directory.admins()? {
                    self.notify(admin.id, event.clone());
                }
            }
            // A seller hiring a broker.
            (MandateParty::Seller, DealType::WithBroker) => {
                if let Some(broker_id) = stored.broker_id {
                    self.notify(broker_id, event);
                }
            }
        }

        Ok(stored)
    }

    /// Counter-signature: completes the contract and starts the 90-day clock.
    pub fn accept_and_sign(
        &self,
        actor_id: &UserId,
        id: &MandateId,
        packet: SignaturePacket,
        now: DateTime<Utc>,
    ) -> Result<Mandate, MandateError> {
        let actor = self.user(actor_id)?;
        let mut mandate = self.repository.fetch(id)?.ok_or(MandateError::NotFound)?;

        if mandate.status != MandateStatus::Pending {
            return Err(MandateError::NotPending {
                status: mandate.status,
            });
        }
        if now >= mandate.acceptance_expires_at {
            return Err(MandateError::AcceptanceWindowClosed {
                deadline: mandate.acceptance_expires_at,
            });
        }

        let signature = packet.signature.ok_or(MandateError::MissingAttachment {
            kind: "signature",
        })?;
        let selfie = packet
            .selfie
            .ok_or(MandateError::MissingAttachment { kind: "selfie" })?;

        let side = signing_side(&actor, &mandate)?;
        if mandate.signature_for(side).is_some() {
            return Err(MandateError::AlreadySigned { side });
        }

        mandate.attach(side, signature, selfie);
        mandate.signed_at = Some(now);
        let start = now.date_naive();
        let end = lifecycle::validity_end(start);
        mandate.start_date = Some(start);
        mandate.end_date = Some(end);
        mandate.status = MandateStatus::Active;

        // Freeze the display number with the real acceptor code.
        let initiator = self.initiator_user(&mandate)?;
        mandate.number = mandate_number(mandate.created_at.date_naive(), &initiator, Some(&actor));

        self.repository.update(mandate.clone())?;
        info!(mandate = %mandate.number, "mandate signed by both parties, now active");

        let recipient = if actor.role.is_admin() {
            mandate.seller_id
        } else {
            match mandate.initiated_by {
                MandateParty::Seller => mandate.seller_id,
                MandateParty::Broker => mandate.broker_id.unwrap_or(mandate.seller_id),
            }
        };
        self.notify(
            recipient,
            MandateEvent::Accepted {
                mandate_id: mandate.id,
                number: mandate.number.clone(),
                start_date: start,
                end_date: end,
            },
        );

        Ok(mandate)
    }

    /// Decline a pending mandate, recording the reason shown to the initiator.
    pub fn reject(
        &self,
        actor_id: &UserId,
        id: &MandateId,
        reason: String,
        _now: DateTime<Utc>,
    ) -> Result<Mandate, MandateError> {
        let actor = self.user(actor_id)?;
        let mut mandate = self.repository.fetch(id)?.ok_or(MandateError::NotFound)?;

        if mandate.status != MandateStatus::Pending {
            return Err(MandateError::NotPending {
                status: mandate.status,
            });
        }
        signing_side(&actor, &mandate)?;

        mandate.status = MandateStatus::Rejected;
        mandate.rejection_reason = Some(reason.clone());
        self.repository.update(mandate.clone())?;
        info!(mandate = %mandate.number, "mandate rejected");

        if let Some(initiator) = mandate.party_user(mandate.initiated_by) {
            self.notify(
                initiator,
                MandateEvent::Rejected {
                    mandate_id: mandate.id,
                    number: mandate.number.clone(),
                    reason,
                },
            );
        }

        Ok(mandate)
    }

    /// Administrative override terminating a mandate early.
    pub fn cancel(
        &self,
        actor_id: &UserId,
        id: &MandateId,
        now: DateTime<Utc>,
    ) -> Result<Mandate, MandateError> {
        let actor = self.user(actor_id)?;
        if !actor.role.is_admin() {
            return Err(MandateError::AdminOnly);
        }

        let mut mandate = self.repository.fetch(id)?.ok_or(MandateError::NotFound)?;
        if mandate.status.is_terminal() {
            return Err(MandateError::AlreadyClosed {
                status: mandate.status,
            });
        }

        let effective = now.date_naive();
        mandate.status = MandateStatus::TerminatedByUser;
        mandate.end_date = Some(effective);
        self.repository.update(mandate.clone())?;
        info!(mandate = %mandate.number, "mandate terminated by administrator");

        let event = MandateEvent::Cancelled {
            mandate_id: mandate.id,
            number: mandate.number.clone(),
            effective,
        };
        self.notify(mandate.seller_id, event.clone());
        if let Some(broker_id) = mandate.broker_id {
            self.notify(broker_id, event);
        }

        Ok(mandate)
    }

    /// Spawn a fresh `PENDING` mandate from an expired one, copying the
    /// commercial terms and linking back to the predecessor. The new mandate
    /// goes through the full creation validation, including the per-property
    /// uniqueness check.
    pub fn renew(
        &self,
        actor_id: &UserId,
        id: &MandateId,
        packet: SignaturePacket,
        now: DateTime<Utc>,
    ) -> Result<Mandate, MandateError> {
        let actor = self.user(actor_id)?;
        let source = self.repository.fetch(id)?.ok_or(MandateError::NotFound)?;

        if source.status != MandateStatus::Expired {
            return Err(MandateError::NotRenewable {
                status: source.status,
            });
        }

        let side = if actor.id == source.seller_id {
            MandateParty::Seller
        } else if source.broker_id == Some(actor.id) {
            MandateParty::Broker
        } else {
            return Err(MandateError::NotAParty);
        };

        let draft = MandateDraft {
            property_id: source.property_id,
            deal_type: source.deal_type,
            initiated_by: side,
            seller: Some(source.seller_id),
            broker: source.broker_id,
            terms: source.terms.clone(),
            packet,
        };

        self.open(actor_id, draft, Some(source.id), now)
    }

    /// Fetch a mandate visible to the actor. Non-parties get `NotFound`, the
    /// same shape the filtered listing gives them.
    pub fn get(&self, actor_id: &UserId, id: &MandateId) -> Result<Mandate, MandateError> {
        let actor = self.user(actor_id)?;
        let mandate = self.repository.fetch(id)?.ok_or(MandateError::NotFound)?;

        if actor.role.is_admin() || mandate.is_party(&actor.id) {
            Ok(mandate)
        } else {
            Err(MandateError::NotFound)
        }
    }

    /// Admins see every mandate; everyone else sees only their own deals.
    pub fn list_for(&self, actor_id: &UserId) -> Result<Vec<Mandate>, MandateError> {
        let actor = self.user(actor_id)?;
        let mandates = if actor.role.is_admin() {
            self.repository.all()?
        } else {
            self.repository.involving(&actor.id)?
        };
        Ok(mandates)
    }

    /// Periodic expiry batch: pending mandates past their acceptance deadline
    /// and active mandates past their validity window become `EXPIRED`.
    /// Idempotent; rerunning finds nothing left to transition.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, MandateError> {
        let mut report = SweepReport::default();

        for mut mandate in self.repository.pending_expiring_before(now)? {
            mandate.status = MandateStatus::Expired;
            self.repository.update(mandate)?;
            report.pending_expired += 1;
        }

        let today = now.date_naive();
        for mut mandate in self.repository.active_ending_on_or_before(today)? {
            mandate.status = MandateStatus::Expired;
            self.repository.update(mandate)?;
            report.active_expired += 1;
        }

        info!(
            pending = report.pending_expired,
            active = report.active_expired,
            "expiry sweep processed"
        );
        Ok(report)
    }

    /// Typed letter document handed to the PDF renderer.
    pub fn letter(
        &self,
        actor_id: &UserId,
        id: &MandateId,
        now: DateTime<Utc>,
    ) -> Result<MandateLetter, MandateError> {
        let mandate = self.get(actor_id, id)?;
        let seller = self.user(&mandate.seller_id)?;
        let broker = match mandate.broker_id {
            Some(id) => Some(self.user(&id)?),
            None => None,
        };
        Ok(MandateLetter::compose(
            &mandate,
            &seller,
            broker.as_ref(),
            now.date_naive(),
        ))
    }

    fn user(&self, id: &UserId) -> Result<User, MandateError> {
        self.directory.fetch(id)?.ok_or(MandateError::UnknownUser)
    }

    fn initiator_user(&self, mandate: &Mandate) -> Result<User, MandateError> {
        let id = mandate
            .party_user(mandate.initiated_by)
            .ok_or(MandateError::UnknownUser)?;
        self.user(&id)
    }

    /// Best-effort delivery; failures are logged and never abort a transition.
    fn notify(&self, recipient: UserId, event: MandateEvent) {
        let notification = Notification { recipient, event };
        if let Err(err) = self.notifications.deliver(notification) {
            warn!(error = %err, "notification delivery failed");
        }
    }
}

/// Which slot the actor signs into. Admins sign in the broker slot on
/// platform deals (the platform acts as the broker there).
fn signing_side(actor: &User, mandate: &Mandate) -> Result<MandateParty, MandateError> {
    if actor.id == mandate.seller_id {
        return Ok(MandateParty::Seller);
    }
    if mandate.broker_id == Some(actor.id) {
        return Ok(MandateParty::Broker);
    }
    if actor.role.is_admin() && mandate.deal_type == DealType::WithPlatform {
        return Ok(MandateParty::Broker);
    }
    Err(MandateError::NotAParty)
}
