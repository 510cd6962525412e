use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use chrono::{Duration, Utc};
use more_asserts::assert_gt;
use parking_lot::Mutex;
use gatehouse::auth::{password, Authenticator, LockoutPolicy};
use gatehouse::db::{AccountStore, JurisdictionStore};
use gatehouse::model::account::{Account, AccountPatch};
use gatehouse::model::jurisdiction::{Jurisdiction, LoginMethod};
use gatehouse::model::login::{Credential, LoginAttempt};
use gatehouse::utils::errors::{ErrorCode, GateError};

const THRESHOLD: u32 = 5;
const CODE_WINDOW_SECS: i64 = 300;

///
/// An in-memory account store that applies the same patch semantics as the Mongo
/// adapter and counts its calls, so tests can assert which stores a given failure
/// touched.
///
struct MemoryAccounts {
    accounts: Mutex<Vec<Account>>,
    finds: AtomicUsize,
    updates: AtomicUsize,
}

impl MemoryAccounts {
    fn with(accounts: Vec<Account>) -> Arc<Self> {
        Arc::new(MemoryAccounts {
            accounts: Mutex::new(accounts),
            finds: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        })
    }

    fn get(&self, email: &str) -> Account {
        self.accounts.lock().iter()
            .find(|account| account.email == email)
            .cloned()
            .expect("no such account in the fixture")
    }

    fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[tonic::async_trait]
impl AccountStore for MemoryAccounts {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, GateError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.lock().iter().find(|account| account.email == email).cloned())
    }

    async fn update(&self, account_id: &str, patch: AccountPatch) -> Result<(), GateError> {
        self.updates.fetch_add(1, Ordering::SeqCst);

        let mut accounts = self.accounts.lock();
        let account = accounts.iter_mut()
            .find(|account| account.account_id == account_id)
            .expect("update for an account that doesn't exist");

        match patch {
            AccountPatch::LoginSucceeded { at, clear_single_use_code } => {
                account.failed_login_attempts = 0;
                account.last_login_at = Some(bson::DateTime::from_chrono(at));
                if clear_single_use_code {
                    account.single_use_code = None;
                    account.single_use_code_issued_at = None;
                }
            },
            AccountPatch::LoginFailed { at, attempted_code } => {
                account.failed_login_attempts += 1;
                account.last_login_at = Some(bson::DateTime::from_chrono(at));
                if let Some(attempted) = attempted_code {
                    account.single_use_code = Some(attempted.code);
                    account.single_use_code_issued_at = Some(bson::DateTime::from_chrono(attempted.issued_at));
                }
            },
            AccountPatch::CodeIssued { code, at } => {
                account.single_use_code = Some(code);
                account.single_use_code_issued_at = Some(bson::DateTime::from_chrono(at));
            },
        }

        Ok(())
    }
}

struct MemoryJurisdictions {
    jurisdictions: Vec<Jurisdiction>,
    finds: AtomicUsize,
}

impl MemoryJurisdictions {
    fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }
}

#[tonic::async_trait]
impl JurisdictionStore for MemoryJurisdictions {
    async fn find_enabling(&self, names: &[String], method: LoginMethod) -> Result<Option<Jurisdiction>, GateError> {
        self.finds.fetch_add(1, Ordering::SeqCst);

        Ok(self.jurisdictions.iter()
            .find(|jurisdiction| names.contains(&jurisdiction.name)
                && (method == LoginMethod::Password || jurisdiction.allow_single_use_code_login))
            .cloned())
    }
}

fn account(email: &str) -> Account {
    Account {
        account_id: format!("id-{}", email),
        email: email.to_string(),
        password_hash: None,
        password_updated_at: None,
        password_valid_for_days: Some(180),
        single_use_code: None,
        single_use_code_issued_at: None,
        mfa_enabled: false,
        mfa_code: None,
        mfa_code_issued_at: None,
        phone_number_verified: false,
        confirmed_at: Some(bson::DateTime::from_chrono(Utc::now())),
        failed_login_attempts: 0,
        last_login_at: None,
    }
}

fn harness(accounts: Vec<Account>)
    -> (Arc<MemoryAccounts>, Arc<MemoryJurisdictions>, Authenticator<Arc<MemoryAccounts>, Arc<MemoryJurisdictions>>) {

    let accounts = MemoryAccounts::with(accounts);
    let jurisdictions = Arc::new(MemoryJurisdictions {
        jurisdictions: vec![
            Jurisdiction { jurisdiction_id: "j-1".to_string(), name: "juris 1".to_string(), allow_single_use_code_login: true },
            Jurisdiction { jurisdiction_id: "j-2".to_string(), name: "passwords only".to_string(), allow_single_use_code_login: false },
        ],
        finds: AtomicUsize::new(0),
    });

    let authenticator = Authenticator::new(
        accounts.clone(),
        jurisdictions.clone(),
        LockoutPolicy::new(THRESHOLD),
        Duration::seconds(CODE_WINDOW_SECS));

    (accounts, jurisdictions, authenticator)
}

fn code_attempt(email: &str, jurisdiction: Option<&str>, code: &str) -> LoginAttempt {
    LoginAttempt {
        email: email.to_string(),
        jurisdiction: jurisdiction.map(|name| name.to_string()),
        credential: Credential::SingleUseCode(code.to_string()),
    }
}

fn password_attempt(email: &str, jurisdiction: Option<&str>, password: &str) -> LoginAttempt {
    LoginAttempt {
        email: email.to_string(),
        jurisdiction: jurisdiction.map(|name| name.to_string()),
        credential: Credential::Password(password.to_string()),
    }
}

#[tokio::test]
async fn a_correct_code_within_the_window_logs_in_and_clears_the_code() {
    let now = Utc::now();
    let mut fixture = account("a@b.com");
    fixture.single_use_code = Some("zyxwv".to_string());
    fixture.single_use_code_issued_at = Some(bson::DateTime::from_chrono(now));
    fixture.failed_login_attempts = 3;
    let (accounts, _jurisdictions, authenticator) = harness(vec![fixture]);

    let logged_in = authenticator.validate(&code_attempt("a@b.com", Some("juris 1"), "zyxwv"), now).await.unwrap();
    assert_eq!(logged_in.email, "a@b.com");

    let stored = accounts.get("a@b.com");
    assert_eq!(stored.failed_login_attempts, 0);
    assert_eq!(stored.single_use_code, None);
    assert_eq!(stored.single_use_code_issued_at, None);
    assert_eq!(stored.last_login_at, Some(bson::DateTime::from_chrono(now)));
}

#[tokio::test]
async fn a_wrong_code_increments_and_overwrites_the_stored_code() {
    let now = Utc::now();
    let issued = now - Duration::seconds(10);
    let mut fixture = account("a@b.com");
    fixture.single_use_code = Some("zyxwv".to_string());
    fixture.single_use_code_issued_at = Some(bson::DateTime::from_chrono(issued));
    let (accounts, _jurisdictions, authenticator) = harness(vec![fixture]);

    let err = authenticator.validate(&code_attempt("a@b.com", Some("juris 1"), "zyxwv1"), now).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::InvalidCredential);

    // The failed attempt's code and time replace what was on file - one wrong
    // guess invalidates the original code.
    let stored = accounts.get("a@b.com");
    assert_eq!(stored.failed_login_attempts, 1);
    assert_eq!(stored.single_use_code, Some("zyxwv1".to_string()));
    assert_eq!(stored.single_use_code_issued_at, Some(bson::DateTime::from_chrono(now)));
}

#[tokio::test]
async fn an_expired_code_is_rejected_even_when_correct() {
    let now = Utc::now();
    let mut fixture = account("a@b.com");
    fixture.single_use_code = Some("zyxwv".to_string());
    fixture.single_use_code_issued_at = Some(bson::DateTime::from_millis(0));
    let (accounts, _jurisdictions, authenticator) = harness(vec![fixture]);

    let err = authenticator.validate(&code_attempt("a@b.com", Some("juris 1"), "zyxwv"), now).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::InvalidCredential);
    assert_eq!(accounts.get("a@b.com").failed_login_attempts, 1);
}

#[tokio::test]
async fn a_locked_account_is_rejected_before_any_credential_work() {
    let now = Utc::now();
    let mut fixture = account("a@b.com");
    fixture.single_use_code = Some("zyxwv".to_string());
    fixture.single_use_code_issued_at = Some(bson::DateTime::from_chrono(now));
    fixture.failed_login_attempts = 10;
    let (accounts, _jurisdictions, authenticator) = harness(vec![fixture]);

    // Even the correct code is refused and nothing on the account changes.
    let err = authenticator.validate(&code_attempt("a@b.com", Some("juris 1"), "zyxwv"), now).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::AccountLocked);
    assert_eq!(accounts.updates(), 0);

    let stored = accounts.get("a@b.com");
    assert_eq!(stored.failed_login_attempts, 10);
    assert_eq!(stored.single_use_code, Some("zyxwv".to_string()));
}

#[tokio::test]
async fn the_lockout_threshold_is_inclusive() {
    let now = Utc::now();

    let mut below = account("below@b.com");
    below.single_use_code = Some("zyxwv".to_string());
    below.single_use_code_issued_at = Some(bson::DateTime::from_chrono(now));
    below.failed_login_attempts = THRESHOLD - 1;

    let mut at = account("at@b.com");
    at.single_use_code = Some("zyxwv".to_string());
    at.single_use_code_issued_at = Some(bson::DateTime::from_chrono(now));
    at.failed_login_attempts = THRESHOLD;

    let (_accounts, _jurisdictions, authenticator) = harness(vec![below, at]);

    assert!(authenticator.validate(&code_attempt("below@b.com", Some("juris 1"), "zyxwv"), now).await.is_ok());

    let err = authenticator.validate(&code_attempt("at@b.com", Some("juris 1"), "zyxwv"), now).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::AccountLocked);
}

#[tokio::test]
async fn a_missing_jurisdiction_header_touches_no_store() {
    let now = Utc::now();
    let (accounts, jurisdictions, authenticator) = harness(vec![account("a@b.com")]);

    let err = authenticator.validate(&code_attempt("a@b.com", None, "zyxwv"), now).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::MissingJurisdictionHeader);

    assert_eq!(jurisdictions.finds(), 0);
    assert_eq!(accounts.finds(), 0);
    assert_eq!(accounts.updates(), 0);
}

#[tokio::test]
async fn a_jurisdiction_without_code_login_blocks_before_the_account_lookup() {
    let now = Utc::now();
    let (accounts, jurisdictions, authenticator) = harness(vec![account("a@b.com")]);

    let err = authenticator.validate(&code_attempt("a@b.com", Some("passwords only"), "zyxwv"), now).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::JurisdictionNotConfigured);

    assert_eq!(jurisdictions.finds(), 1);
    assert_eq!(accounts.finds(), 0);
    assert_eq!(accounts.updates(), 0);
}

#[tokio::test]
async fn an_unknown_email_fails_without_mutating_anything() {
    let now = Utc::now();
    let (accounts, _jurisdictions, authenticator) = harness(vec![account("a@b.com")]);

    let err = authenticator.validate(&code_attempt("nobody@b.com", Some("juris 1"), "zyxwv"), now).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::AccountNotFound);
    assert_eq!(accounts.updates(), 0);
}

#[tokio::test]
async fn a_used_code_cannot_be_replayed() {
    let now = Utc::now();
    let mut fixture = account("a@b.com");
    fixture.single_use_code = Some("zyxwv".to_string());
    fixture.single_use_code_issued_at = Some(bson::DateTime::from_chrono(now));
    let (accounts, _jurisdictions, authenticator) = harness(vec![fixture]);

    let attempt = code_attempt("a@b.com", Some("juris 1"), "zyxwv");
    assert!(authenticator.validate(&attempt, now).await.is_ok());

    // Second submission of the same code - it was cleared on success.
    let err = authenticator.validate(&attempt, now).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::InvalidCredential);
    assert_eq!(accounts.get("a@b.com").failed_login_attempts, 1);
}

#[tokio::test]
async fn a_correct_password_logs_in_and_resets_the_counter() {
    let now = Utc::now();
    let mut fixture = account("a@b.com");
    fixture.password_hash = Some(password::hash_into_phc("Hello123!").unwrap());
    fixture.single_use_code = Some("zyxwv".to_string());
    fixture.single_use_code_issued_at = Some(bson::DateTime::from_chrono(now));
    fixture.failed_login_attempts = 2;
    let (accounts, _jurisdictions, authenticator) = harness(vec![fixture]);

    let earlier = bson::DateTime::from_millis(0);
    assert!(authenticator.validate(&password_attempt("a@b.com", Some("juris 1"), "Hello123!"), now).await.is_ok());

    // Password logins don't touch any outstanding single-use code.
    let stored = accounts.get("a@b.com");
    assert_eq!(stored.failed_login_attempts, 0);
    assert_eq!(stored.single_use_code, Some("zyxwv".to_string()));
    assert_gt!(stored.last_login_at.unwrap(), earlier);
}

#[tokio::test]
async fn a_wrong_password_increments_without_touching_the_code() {
    let now = Utc::now();
    let mut fixture = account("a@b.com");
    fixture.password_hash = Some(password::hash_into_phc("Hello123!").unwrap());
    fixture.single_use_code = Some("zyxwv".to_string());
    fixture.single_use_code_issued_at = Some(bson::DateTime::from_chrono(now));
    let (accounts, _jurisdictions, authenticator) = harness(vec![fixture]);

    let err = authenticator.validate(&password_attempt("a@b.com", Some("juris 1"), "Hello456!"), now).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::InvalidCredential);

    let stored = accounts.get("a@b.com");
    assert_eq!(stored.failed_login_attempts, 1);
    assert_eq!(stored.single_use_code, Some("zyxwv".to_string()));
}

#[tokio::test]
async fn password_login_works_where_code_login_is_disabled() {
    let now = Utc::now();
    let mut fixture = account("a@b.com");
    fixture.password_hash = Some(password::hash_into_phc("Hello123!").unwrap());
    let (_accounts, _jurisdictions, authenticator) = harness(vec![fixture]);

    assert!(authenticator.validate(&password_attempt("a@b.com", Some("passwords only"), "Hello123!"), now).await.is_ok());
}

#[tokio::test]
async fn issuing_a_code_stores_it_with_its_issue_time() {
    let now = Utc::now();
    let (accounts, _jurisdictions, authenticator) = harness(vec![account("a@b.com")]);

    let code = authenticator.issue_code("a@b.com", Some("juris 1"), now).await.unwrap();
    assert_eq!(code.len(), 8);

    let stored = accounts.get("a@b.com");
    assert_eq!(stored.single_use_code, Some(code.clone()));
    assert_eq!(stored.single_use_code_issued_at, Some(bson::DateTime::from_chrono(now)));

    // And the freshly-issued code can be redeemed.
    assert!(authenticator.validate(&code_attempt("a@b.com", Some("juris 1"), &code), now).await.is_ok());
}

#[tokio::test]
async fn issuing_a_code_respects_the_jurisdiction_gate() {
    let now = Utc::now();
    let (accounts, _jurisdictions, authenticator) = harness(vec![account("a@b.com")]);

    let err = authenticator.issue_code("a@b.com", None, now).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::MissingJurisdictionHeader);

    let err = authenticator.issue_code("a@b.com", Some("passwords only"), now).await.unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::JurisdictionNotConfigured);

    assert_eq!(accounts.updates(), 0);
}
