use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

///
/// An account record as held in the Accounts collection.
///
/// The MFA and lifecycle fields are carried for the account as a whole but are not
/// evaluated by the login path - only the credential material, the failed-attempt
/// counter and the timestamps are.
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Account {
    pub account_id: String,
    pub email: String,
    pub password_hash: Option<String>,       // A PHC-format string, eg. $argon2id$v=19$...
    pub password_updated_at: Option<bson::DateTime>,
    pub password_valid_for_days: Option<u32>,
    pub single_use_code: Option<String>,
    pub single_use_code_issued_at: Option<bson::DateTime>,
    #[serde(default)]
    pub mfa_enabled: bool,
    pub mfa_code: Option<String>,
    pub mfa_code_issued_at: Option<bson::DateTime>,
    #[serde(default)]
    pub phone_number_verified: bool,
    pub confirmed_at: Option<bson::DateTime>,
    #[serde(default)]
    pub failed_login_attempts: u32,
    pub last_login_at: Option<bson::DateTime>,
}

///
/// The narrow set of mutations a login attempt may apply to an account.
///
/// The store is responsible for applying the counter change atomically - two
/// concurrent failed attempts must never collapse into a single increment, or the
/// lockout threshold could be bypassed.
///
#[derive(Clone, Debug, PartialEq)]
pub enum AccountPatch {
    /// A credential check passed - zero the counter, stamp the login and
    /// (for code logins) invalidate the used code.
    LoginSucceeded {
        at: DateTime<Utc>,
        clear_single_use_code: bool,
    },

    /// A credential check failed - bump the counter by one and stamp the login.
    /// For code attempts the attempted code and its time are persisted for the
    /// audit/replay window.
    LoginFailed {
        at: DateTime<Utc>,
        attempted_code: Option<AttemptedCode>,
    },

    /// A fresh single-use code has been issued for the account.
    CodeIssued {
        code: String,
        at: DateTime<Utc>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttemptedCode {
    pub code: String,
    pub issued_at: DateTime<Utc>,
}
