use rand::Rng;
use super::FailureReason;
use chrono::{DateTime, Duration, Utc};

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const CODE_LEN: usize = 8;

///
/// Check a supplied single-use code against what's on file for the account.
///
/// The checks run in a fixed order: code on file, issue time on file, unexpired,
/// exact match. The first two should not fail under normal writes - they are
/// distinguished to aid diagnostics but the caller surfaces them all the same way.
///
pub fn verify(
    stored_code: Option<&str>,
    issued_at: Option<DateTime<Utc>>,
    supplied_code: &str,
    now: DateTime<Utc>,
    validity: Duration) -> Result<(), FailureReason> {

    let stored_code = stored_code.ok_or(FailureReason::MissingStoredCode)?;
    let issued_at = issued_at.ok_or(FailureReason::MissingIssueTime)?;

    if now - issued_at > validity {
        return Err(FailureReason::CodeExpired)
    }

    // Exact string comparison - no trimming or case-folding.
    if supplied_code != stored_code {
        return Err(FailureReason::CodeMismatch)
    }

    Ok(())
}

///
/// Generate a random code for a login. Short-lived, delivered out-of-band.
///
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}
