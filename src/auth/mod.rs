pub mod code;
pub mod lockout;
pub mod password;

pub use lockout::LockoutPolicy;

use chrono::{DateTime, Duration, Utc};
use crate::db::{AccountStore, JurisdictionStore};
use crate::model::account::{Account, AccountPatch, AttemptedCode};
use crate::model::jurisdiction::LoginMethod;
use crate::model::login::{Credential, LoginAttempt};
use crate::utils::errors::{ErrorCode, GateError};

///
/// Why a credential check failed - kept for logging only. Callers are always
/// handed the same InvalidCredential so a failure can't be used to probe what's
/// on file for an account.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FailureReason {
    MissingStoredCode,
    MissingIssueTime,
    CodeExpired,
    CodeMismatch,
    MissingStoredHash,
    InvalidStoredHash,
    PasswordMismatch,
}

///
/// Sequences a login attempt: jurisdiction gate, account lookup, lockout check,
/// credential check, then the single side-effecting account update.
///
/// Collaborators are passed in explicitly so the whole flow can be driven in
/// tests with in-memory stores and a pinned clock.
///
pub struct Authenticator<A, J> {
    accounts: A,
    jurisdictions: J,
    lockout: LockoutPolicy,
    code_validity: Duration,
}

impl<A: AccountStore, J: JurisdictionStore> Authenticator<A, J> {

    pub fn new(accounts: A, jurisdictions: J, lockout: LockoutPolicy, code_validity: Duration) -> Self {
        Authenticator { accounts, jurisdictions, lockout, code_validity }
    }

    ///
    /// Resolve a login attempt to an authenticated account or a typed failure.
    ///
    /// The jurisdiction gate runs before the account lookup so a jurisdiction that
    /// hasn't opted into a login method can't be used to probe which emails exist.
    /// A locked account is rejected before any credential work and without touching
    /// its counters.
    ///
    pub async fn validate(&self, attempt: &LoginAttempt, now: DateTime<Utc>) -> Result<Account, GateError> {

        let jurisdiction = self.gate_jurisdiction(attempt.jurisdiction.as_deref(), attempt.credential.method()).await?;

        let account = match self.accounts.find_by_email(&attempt.email).await? {
            Some(account) => account,
            None => {
                tracing::info!("Login attempt for unknown email in jurisdiction {}", jurisdiction.name);
                // The message must not reveal whether the email was malformed or absent.
                return Err(ErrorCode::AccountNotFound.with_msg("Invalid email or credentials"))
            },
        };

        if self.lockout.is_locked(account.failed_login_attempts) {
            tracing::warn!("Account {} is locked out after {} failed attempts", account.account_id, account.failed_login_attempts);
            return Err(ErrorCode::AccountLocked.with_msg("Failed login attempts exceeded"))
        }

        match self.check_credential(&account, &attempt.credential, now).await? {
            Ok(()) => {
                let clear_single_use_code = attempt.credential.method() == LoginMethod::SingleUseCode;
                self.accounts.update(&account.account_id, AccountPatch::LoginSucceeded { at: now, clear_single_use_code }).await?;
                Ok(account)
            },
            Err(reason) => {
                tracing::info!("Credential check failed for account {}: {:?}", account.account_id, reason);

                // The attempted code and its time are persisted even on failure.
                let attempted_code = match &attempt.credential {
                    Credential::SingleUseCode(code) => Some(AttemptedCode { code: code.clone(), issued_at: now }),
                    Credential::Password(_) => None,
                };

                self.accounts.update(&account.account_id, AccountPatch::LoginFailed { at: now, attempted_code }).await?;
                Err(ErrorCode::InvalidCredential.with_msg("Invalid email or credentials"))
            },
        }
    }

    ///
    /// Issue a fresh single-use code for the account and persist it with its issue
    /// time. The same jurisdiction gate applies as for redeeming one.
    ///
    pub async fn issue_code(&self, email: &str, jurisdiction: Option<&str>, now: DateTime<Utc>) -> Result<String, GateError> {

        self.gate_jurisdiction(jurisdiction, LoginMethod::SingleUseCode).await?;

        let account = self.accounts.find_by_email(email).await?
            .ok_or_else(|| ErrorCode::AccountNotFound.with_msg("Invalid email or credentials"))?;

        let code = code::generate();
        self.accounts.update(&account.account_id, AccountPatch::CodeIssued { code: code.clone(), at: now }).await?;

        Ok(code)
    }

    async fn gate_jurisdiction(&self, name: Option<&str>, method: LoginMethod)
        -> Result<crate::model::jurisdiction::Jurisdiction, GateError> {

        let name = name.ok_or_else(||
            ErrorCode::MissingJurisdictionHeader.with_msg("jurisdictionname is missing from the request metadata"))?;

        self.jurisdictions.find_enabling(&[name.to_string()], method).await?
            .ok_or_else(|| match method {
                LoginMethod::SingleUseCode => ErrorCode::JurisdictionNotConfigured
                    .with_msg("Single use code login is not setup for this jurisdiction"),
                LoginMethod::Password => ErrorCode::JurisdictionNotConfigured
                    .with_msg("Password login is not setup for this jurisdiction"),
            })
    }

    ///
    /// Run the credential check appropriate to the attempt. The outer Result is an
    /// infrastructure failure, the inner one the credential verdict.
    ///
    async fn check_credential(&self, account: &Account, credential: &Credential, now: DateTime<Utc>)
        -> Result<Result<(), FailureReason>, GateError> {

        match credential {
            Credential::SingleUseCode(supplied) => {
                let issued_at = account.single_use_code_issued_at.map(|at| at.into());
                Ok(code::verify(account.single_use_code.as_deref(), issued_at, supplied, now, self.code_validity))
            },
            Credential::Password(supplied) => {
                // Argon verification is CPU-bound, keep it off the event loop.
                let stored_hash = account.password_hash.clone();
                let supplied = supplied.clone();
                tokio::task::spawn_blocking(move || password::verify(stored_hash.as_deref(), &supplied))
                    .await
                    .map_err(GateError::from)
            },
        }
    }
}
