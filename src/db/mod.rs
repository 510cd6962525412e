pub mod account;
pub mod jurisdiction;
pub mod mongo;

use std::sync::Arc;
use crate::model::account::{Account, AccountPatch};
use crate::model::jurisdiction::{Jurisdiction, LoginMethod};
use crate::utils::errors::GateError;

///
/// Collection and field names - keeps the filter/update documents and the index
/// bootstrap in agreement.
///
pub mod prelude {
    pub const ACCOUNTS: &str      = "Accounts";
    pub const JURISDICTIONS: &str = "Jurisdictions";

    pub const ACCOUNT_ID: &str                 = "account_id";
    pub const EMAIL: &str                      = "email";
    pub const FAILED_LOGIN_ATTEMPTS: &str      = "failed_login_attempts";
    pub const LAST_LOGIN_AT: &str              = "last_login_at";
    pub const SINGLE_USE_CODE: &str            = "single_use_code";
    pub const SINGLE_USE_CODE_ISSUED_AT: &str  = "single_use_code_issued_at";

    pub const JURISDICTION_ID: &str              = "jurisdiction_id";
    pub const NAME: &str                         = "name";
    pub const ALLOW_SINGLE_USE_CODE_LOGIN: &str  = "allow_single_use_code_login";
}

///
/// The narrow persistence seam the login path runs against. The Mongo adapters
/// implement these; tests drive the same flow with in-memory fakes.
///
#[tonic::async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, GateError>;

    /// Apply a login-attempt mutation. Counter changes must be atomic - see
    /// AccountPatch.
    async fn update(&self, account_id: &str, patch: AccountPatch) -> Result<(), GateError>;
}

#[tonic::async_trait]
pub trait JurisdictionStore: Send + Sync {
    /// Find a jurisdiction by any of the given names whose policy enables the
    /// login method. Password login is not flag-gated, single-use-code login is.
    async fn find_enabling(&self, names: &[String], method: LoginMethod) -> Result<Option<Jurisdiction>, GateError>;
}

#[tonic::async_trait]
impl<T: AccountStore + ?Sized> AccountStore for Arc<T> {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, GateError> {
        (**self).find_by_email(email).await
    }

    async fn update(&self, account_id: &str, patch: AccountPatch) -> Result<(), GateError> {
        (**self).update(account_id, patch).await
    }
}

#[tonic::async_trait]
impl<T: JurisdictionStore + ?Sized> JurisdictionStore for Arc<T> {
    async fn find_enabling(&self, names: &[String], method: LoginMethod) -> Result<Option<Jurisdiction>, GateError> {
        (**self).find_enabling(names, method).await
    }
}
