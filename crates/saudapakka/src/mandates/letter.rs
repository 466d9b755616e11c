use chrono::NaiveDate;
use serde::Serialize;

use crate::accounts::User;

use super::domain::{DealType, Mandate};

/// Typed content for the printable mandate letter. PDF rasterization is an
/// external collaborator; this struct is the contract handed to it.
#[derive(Debug, Clone, Serialize)]
pub struct MandateLetter {
    pub number: String,
    pub generated_on: NaiveDate,
    pub status: &'static str,
    pub seller_name: String,
    pub counterparty_name: String,
    pub exclusivity_clause: &'static str,
    pub commission_clause: String,
    pub validity_clause: String,
    pub seller_signed: bool,
    pub counterparty_signed: bool,
}

impl MandateLetter {
    pub fn compose(
        mandate: &Mandate,
        seller: &User,
        broker: Option<&User>,
        today: NaiveDate,
    ) -> Self {
        let counterparty_name = match (mandate.deal_type, broker) {
            (DealType::WithPlatform, _) => "SaudaPakka (the platform)".to_string(),
            (DealType::WithBroker, Some(user)) => user.full_name.clone(),
            (DealType::WithBroker, None) => "Broker (unnamed)".to_string(),
        };

        let exclusivity_clause = if mandate.terms.is_exclusive {
            "This is an exclusive marketing authorization."
        } else {
            "This is a non-exclusive marketing authorization."
        };

        let commission_clause = match (mandate.terms.commission_rate, mandate.terms.fixed_amount) {
            (Some(rate), _) => format!("Commission of {rate:.2}% of the final sale value."),
            (None, Some(amount)) => format!("Fixed marketing fee of INR {amount}."),
            (None, None) => "No commission terms recorded.".to_string(),
        };

        let validity_clause = match (mandate.start_date, mandate.end_date) {
            (Some(start), Some(end)) => format!("In force from {start} until {end}."),
            _ => format!(
                "Awaiting counter-signature until {}.",
                mandate.acceptance_expires_at.date_naive()
            ),
        };

        Self {
            number: mandate.number.clone(),
            generated_on: today,
            status: mandate.status.label(),
            seller_name: seller.full_name.clone(),
            counterparty_name,
            exclusivity_clause,
            commission_clause,
            validity_clause,
            seller_signed: mandate.seller_signature.is_some(),
            counterparty_signed: mandate.broker_signature.is_some(),
        }
    }

    /// Plain-text rendering used by the CLI demo and as a renderer fallback.
    pub fn to_text(&self) -> String {
        let signature_line = |name: &str, signed: bool| {
            if signed {
                format!("{name}: signed")
            } else {
                format!("{name}: ________________")
            }
        };

        [
            format!("MANDATE {}", self.number),
            format!("Generated on {}", self.generated_on),
            String::new(),
            format!(
                "Between {} (seller) and {}.",
                self.seller_name, self.counterparty_name
            ),
            self.exclusivity_clause.to_string(),
            self.commission_clause.clone(),
            self.validity_clause.clone(),
            String::new(),
            signature_line(&self.seller_name, self.seller_signed),
            signature_line(&self.counterparty_name, self.counterparty_signed),
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{UserId, UserRole};
    use crate::listings::PropertyId;
    use crate::mandates::domain::{
        Attachment, CommercialTerms, MandateId, MandateParty, MandateStatus,
    };
    use chrono::{TimeZone, Utc};

    fn seller() -> User {
        User {
            id: UserId::new(),
            email: "ramesh@example.in".to_string(),
            phone_number: None,
            full_name: "Ramesh Kumar".to_string(),
            role: UserRole::Seller,
            kyc_verified: true,
        }
    }

    fn platform_mandate(seller_id: UserId) -> Mandate {
        let created = Utc.with_ymd_and_hms(2025, 11, 14, 10, 0, 0).unwrap();
        Mandate {
            id: MandateId::new(),
            number: "20251114RAxPE".to_string(),
            property_id: PropertyId::new(),
            seller_id,
            broker_id: None,
            deal_type: DealType::WithPlatform,
            initiated_by: MandateParty::Seller,
            terms: CommercialTerms {
                is_exclusive: true,
                commission_rate: Some(2.0),
                fixed_amount: None,
            },
            status: MandateStatus::Pending,
            created_at: created,
            acceptance_expires_at: created + chrono::Duration::days(7),
            signed_at: None,
            start_date: None,
            end_date: None,
            seller_signature: Some(Attachment::new("signatures/sellers/ramesh.png")),
            seller_selfie: Some(Attachment::new("selfies/sellers/ramesh.png")),
            broker_signature: None,
            broker_selfie: None,
            rejection_reason: None,
            renewed_from: None,
        }
    }

    #[test]
    fn pending_letter_names_platform_and_deadline() {
        let seller = seller();
        let mandate = platform_mandate(seller.id);
        let today = NaiveDate::from_ymd_opt(2025, 11, 15).expect("valid date");

        let letter = MandateLetter::compose(&mandate, &seller, None, today);
        assert!(letter.counterparty_name.contains("SaudaPakka"));
        assert!(letter.validity_clause.contains("2025-11-21"));
        assert!(letter.seller_signed);
        assert!(!letter.counterparty_signed);

        let text = letter.to_text();
        assert!(text.contains("MANDATE 20251114RAxPE"));
        assert!(text.contains("Ramesh Kumar: signed"));
    }
}
