use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// A pending login code for an email address. Delivery (email/SMS) is an
/// external collaborator; the challenge only tracks issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    pub email: String,
    pub code: String,
    pub issued_at: DateTime<Utc>,
}

/// Storage for outstanding challenges, keyed by email. One live code per
/// address; issuing again replaces the previous code.
pub trait OtpStore: Send + Sync {
    fn put(&self, challenge: OtpChallenge) -> Result<(), OtpError>;
    fn get(&self, email: &str) -> Result<Option<OtpChallenge>, OtpError>;
    fn remove(&self, email: &str) -> Result<(), OtpError>;
}

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("no passcode was requested for this address")]
    Unknown,
    #[error("passcode has expired, request a new one")]
    Expired,
    #[error("passcode does not match")]
    Mismatch,
    #[error("passcode store unavailable: {0}")]
    Store(String),
}

/// Issues and checks six-digit login codes.
pub struct OtpAuthenticator<S> {
    store: Arc<S>,
    ttl: Duration,
}

impl<S> OtpAuthenticator<S>
where
    S: OtpStore,
{
    pub fn new(store: Arc<S>, ttl_minutes: i64) -> Self {
        Self {
            store,
            ttl: Duration::minutes(ttl_minutes.max(1)),
        }
    }

    pub fn issue(&self, email: &str, now: DateTime<Utc>) -> Result<OtpChallenge, OtpError> {
        let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
        let challenge = OtpChallenge {
            email: email.trim().to_ascii_lowercase(),
            code: format!("{code:06}"),
            issued_at: now,
        };
        self.store.put(challenge.clone())?;
        Ok(challenge)
    }

    /// Consume the outstanding code for `email`. A successful or expired check
    /// removes the challenge; a mismatch leaves it in place so the caller can
    /// retry until expiry.
    pub fn verify(&self, email: &str, code: &str, now: DateTime<Utc>) -> Result<(), OtpError> {
        let email = email.trim().to_ascii_lowercase();
        let challenge = self.store.get(&email)?.ok_or(OtpError::Unknown)?;

        if now - challenge.issued_at > self.ttl {
            self.store.remove(&email)?;
            return Err(OtpError::Expired);
        }

        if challenge.code != code.trim() {
            return Err(OtpError::Mismatch);
        }

        self.store.remove(&email)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        codes: Mutex<HashMap<String, OtpChallenge>>,
    }

    impl OtpStore for MemoryStore {
        fn put(&self, challenge: OtpChallenge) -> Result<(), OtpError> {
            self.codes
                .lock()
                .expect("otp mutex poisoned")
                .insert(challenge.email.clone(), challenge);
            Ok(())
        }

        fn get(&self, email: &str) -> Result<Option<OtpChallenge>, OtpError> {
            Ok(self
                .codes
                .lock()
                .expect("otp mutex poisoned")
                .get(email)
                .cloned())
        }

        fn remove(&self, email: &str) -> Result<(), OtpError> {
            self.codes.lock().expect("otp mutex poisoned").remove(email);
            Ok(())
        }
    }

    fn authenticator() -> OtpAuthenticator<MemoryStore> {
        OtpAuthenticator::new(Arc::new(MemoryStore::default()), 10)
    }

    #[test]
    fn issued_code_verifies_exactly_once() {
        let auth = authenticator();
        let now = Utc::now();
        let challenge = auth.issue("Ramesh@Example.in", now).expect("code issued");

        assert_eq!(challenge.code.len(), 6);
        auth.verify("ramesh@example.in", &challenge.code, now)
            .expect("first verification succeeds");
        let second = auth.verify("ramesh@example.in", &challenge.code, now);
        assert!(matches!(second, Err(OtpError::Unknown)));
    }

    #[test]
    fn expired_code_is_rejected_and_consumed() {
        let auth = authenticator();
        let issued = Utc::now();
        let challenge = auth.issue("priya@example.in", issued).expect("code issued");

        let late = issued + Duration::minutes(11);
        let result = auth.verify("priya@example.in", &challenge.code, late);
        assert!(matches!(result, Err(OtpError::Expired)));

        let retry = auth.verify("priya@example.in", &challenge.code, late);
        assert!(matches!(retry, Err(OtpError::Unknown)));
    }

    #[test]
    fn mismatched_code_leaves_challenge_in_place() {
        let auth = authenticator();
        let now = Utc::now();
        let challenge = auth.issue("dev@example.in", now).expect("code issued");

        let wrong = auth.verify("dev@example.in", "000000x", now);
        assert!(matches!(wrong, Err(OtpError::Mismatch)));

        auth.verify("dev@example.in", &challenge.code, now)
            .expect("correct code still works after a mismatch");
    }
}
