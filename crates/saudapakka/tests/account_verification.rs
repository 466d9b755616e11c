//! Identity-verification flow: provider sessions, callback resolution, and the
//! cached `kyc_verified` flag that gates mandate signing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};

use saudapakka::accounts::{
    DirectoryError, KycError, KycProvider, KycProviderError, KycRecord, KycRepository, KycService,
    KycStatus, ProviderOutcome, ProviderSession, User, UserDirectory, UserId, UserRole,
};

#[derive(Default)]
struct MemoryDirectory {
    users: Mutex<HashMap<UserId, User>>,
}

impl MemoryDirectory {
    fn add(&self, user: User) {
        self.users
            .lock()
            .expect("directory mutex poisoned")
            .insert(user.id, user);
    }

    fn verified(&self, id: &UserId) -> bool {
        self.users
            .lock()
            .expect("directory mutex poisoned")
            .get(id)
            .map(|user| user.kyc_verified)
            .unwrap_or(false)
    }
}

impl UserDirectory for MemoryDirectory {
    fn fetch(&self, id: &UserId) -> Result<Option<User>, DirectoryError> {
        Ok(self
            .users
            .lock()
            .expect("directory mutex poisoned")
            .get(id)
            .cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        Ok(self
            .users
            .lock()
            .expect("directory mutex poisoned")
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn admins(&self) -> Result<Vec<User>, DirectoryError> {
        Ok(self
            .users
            .lock()
            .expect("directory mutex poisoned")
            .values()
            .filter(|user| user.role.is_admin())
            .cloned()
            .collect())
    }

    fn users(&self) -> Result<Vec<User>, DirectoryError> {
        Ok(self
            .users
            .lock()
            .expect("directory mutex poisoned")
            .values()
            .cloned()
            .collect())
    }

    fn mark_kyc_verified(&self, id: &UserId, verified: bool) -> Result<(), DirectoryError> {
        let mut users = self.users.lock().expect("directory mutex poisoned");
        let user = users.get_mut(id).ok_or(DirectoryError::NotFound)?;
        user.kyc_verified = verified;
        Ok(())
    }
}

#[derive(Default)]
struct MemoryRecords {
    rows: Mutex<HashMap<UserId, KycRecord>>,
}

impl KycRepository for MemoryRecords {
    fn upsert(&self, record: KycRecord) -> Result<(), KycError> {
        self.rows
            .lock()
            .expect("record mutex poisoned")
            .insert(record.user_id, record);
        Ok(())
    }

    fn fetch(&self, user_id: &UserId) -> Result<Option<KycRecord>, KycError> {
        Ok(self
            .rows
            .lock()
            .expect("record mutex poisoned")
            .get(user_id)
            .cloned())
    }

    fn by_request_id(&self, request_id: &str) -> Result<Option<KycRecord>, KycError> {
        Ok(self
            .rows
            .lock()
            .expect("record mutex poisoned")
            .values()
            .find(|record| record.provider_request_id.as_deref() == Some(request_id))
            .cloned())
    }
}

/// Deterministic provider stub issuing one session per user.
struct StubProvider;

impl KycProvider for StubProvider {
    fn begin(&self, user: &User) -> Result<ProviderSession, KycProviderError> {
        Ok(ProviderSession {
            request_id: format!("req-{}", user.id.0),
            redirect_url: format!("https://verify.example/session/req-{}", user.id.0),
        })
    }
}

fn user(full_name: &str, email: &str, role: UserRole) -> User {
    User {
        id: UserId::new(),
        email: email.to_string(),
        phone_number: None,
        full_name: full_name.to_string(),
        role,
        kyc_verified: false,
    }
}

struct Fixture {
    service: KycService<StubProvider, MemoryRecords, MemoryDirectory>,
    directory: Arc<MemoryDirectory>,
    admin: User,
    seller: User,
}

fn fixture() -> Fixture {
    let directory = Arc::new(MemoryDirectory::default());
    let admin = user("Asha Verma", "asha@saudapakka.in", UserRole::Admin);
    let seller = user("Ramesh Kumar", "ramesh@example.in", UserRole::Seller);
    directory.add(admin.clone());
    directory.add(seller.clone());

    let service = KycService::new(
        Arc::new(StubProvider),
        Arc::new(MemoryRecords::default()),
        directory.clone(),
    );

    Fixture {
        service,
        directory,
        admin,
        seller,
    }
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 14, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

#[test]
fn start_opens_a_session_and_marks_the_record_initiated() {
    let f = fixture();

    let session = f.service.start(&f.seller.id, now()).expect("session opens");
    assert!(session.redirect_url.contains(&session.request_id));

    let record = f
        .service
        .record_for(&f.seller.id)
        .expect("record fetch")
        .expect("record present");
    assert_eq!(record.status, KycStatus::Initiated);
    assert_eq!(record.provider_request_id, Some(session.request_id));
    assert!(!f.directory.verified(&f.seller.id));
}

#[test]
fn verified_callback_flips_the_cached_flag() {
    let f = fixture();
    let session = f.service.start(&f.seller.id, now()).expect("session opens");

    let record = f
        .service
        .complete(
            ProviderOutcome {
                request_id: session.request_id,
                verified: true,
                legal_name: Some("Ramesh Kumar Sharma".to_string()),
                date_of_birth: None,
            },
            now(),
        )
        .expect("callback resolves");

    assert_eq!(record.status, KycStatus::Verified);
    assert_eq!(record.legal_name.as_deref(), Some("Ramesh Kumar Sharma"));
    assert!(f.directory.verified(&f.seller.id));
}

#[test]
fn failed_callback_leaves_the_user_unverified() {
    let f = fixture();
    let session = f.service.start(&f.seller.id, now()).expect("session opens");

    let record = f
        .service
        .complete(
            ProviderOutcome {
                request_id: session.request_id,
                verified: false,
                legal_name: None,
                date_of_birth: None,
            },
            now(),
        )
        .expect("callback resolves");

    assert_eq!(record.status, KycStatus::Failed);
    assert!(!f.directory.verified(&f.seller.id));
}

#[test]
fn unknown_callback_session_is_rejected() {
    let f = fixture();
    let result = f.service.complete(
        ProviderOutcome {
            request_id: "req-unknown".to_string(),
            verified: true,
            legal_name: None,
            date_of_birth: None,
        },
        now(),
    );
    assert!(matches!(result, Err(KycError::UnknownSession)));
}

#[test]
fn override_is_admin_only() {
    let f = fixture();

    let denied = f.service.admin_override(&f.seller, &f.seller.id, now());
    assert!(matches!(denied, Err(KycError::AdminOnly)));
    assert!(!f.directory.verified(&f.seller.id));

    let record = f
        .service
        .admin_override(&f.admin, &f.seller.id, now())
        .expect("override applies");
    assert_eq!(record.status, KycStatus::Verified);
    assert_eq!(record.legal_name.as_deref(), Some("Ramesh Kumar"));
    assert!(f.directory.verified(&f.seller.id));
}
