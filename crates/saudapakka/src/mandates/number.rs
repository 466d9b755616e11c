//! Human-facing mandate numbers.
//!
//! Format: `YYYYMMDDXXxYY` where `XX`/`YY` are two-letter party codes
//! derived from each party's first name (or email local part). The acceptor
//! code is `PE` until the counterparty signs; the number is regenerated on
//! pre-acceptance saves and frozen at acceptance.

use chrono::NaiveDate;

use crate::accounts::User;

const PENDING_CODE: &str = "PE";

/// Two uppercase letters identifying a party on the printed letter.
pub fn party_code(user: &User) -> String {
    let code: String = user
        .display_handle()
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(2)
        .collect::<String>()
        .to_ascii_uppercase();

    match code.len() {
        2 => code,
        1 => format!("{code}X"),
        _ => "XX".to_string(),
    }
}

/// Compose the display number for a mandate created on `created_on`.
pub fn mandate_number(created_on: NaiveDate, initiator: &User, acceptor: Option<&User>) -> String {
    let acceptor_code = match acceptor {
        Some(user) => party_code(user),
        None => PENDING_CODE.to_string(),
    };

    format!(
        "{}{}x{}",
        created_on.format("%Y%m%d"),
        party_code(initiator),
        acceptor_code
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{UserId, UserRole};

    fn user(full_name: &str, email: &str) -> User {
        User {
            id: UserId::new(),
            email: email.to_string(),
            phone_number: None,
            full_name: full_name.to_string(),
            role: UserRole::Seller,
            kyc_verified: true,
        }
    }

    fn created_on() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 14).expect("valid date")
    }

    #[test]
    fn pending_number_uses_pe_placeholder() {
        let ramesh = user("Ramesh Kumar", "ramesh@example.in");
        let number = mandate_number(created_on(), &ramesh, None);
        assert_eq!(number, "20251114RAxPE");
    }

    #[test]
    fn accepted_number_pairs_both_codes() {
        let ramesh = user("Ramesh Kumar", "ramesh@example.in");
        let priya = user("Priya Shah", "priya@example.in");
        let number = mandate_number(created_on(), &ramesh, Some(&priya));
        assert_eq!(number, "20251114RAxPR");
    }

    #[test]
    fn code_falls_back_to_email_local_part() {
        let nameless = user("", "om@example.in");
        assert_eq!(party_code(&nameless), "OM");
    }

    #[test]
    fn single_letter_handles_are_padded() {
        let terse = user("Q", "q@example.in");
        assert_eq!(party_code(&terse), "QX");
    }
}
