use mongodb::Database;
use bson::{Document, doc};
use super::{AccountStore, prelude::*};
use crate::model::account::{Account, AccountPatch};
use crate::utils::errors::GateError;

///
/// The MongoDB adapter for account records. The counter changes use $inc so
/// concurrent attempts against the same account can never lose an increment and
/// slip under the lockout threshold.
///
#[derive(Clone)]
pub struct MongoAccountStore {
    db: Database,
}

impl MongoAccountStore {
    pub fn new(db: Database) -> Self {
        MongoAccountStore { db }
    }
}

#[tonic::async_trait]
impl AccountStore for MongoAccountStore {

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, GateError> {
        let filter = doc!{ EMAIL: email };

        Ok(self.db.collection::<Account>(ACCOUNTS).find_one(filter, None).await?)
    }

    async fn update(&self, account_id: &str, patch: AccountPatch) -> Result<(), GateError> {
        let filter = doc!{ ACCOUNT_ID: account_id };
        let update = update_for(patch);

        self.db.collection::<Document>(ACCOUNTS).update_one(filter, update, None).await?;
        Ok(())
    }
}

fn update_for(patch: AccountPatch) -> Document {
    match patch {
        AccountPatch::LoginSucceeded { at, clear_single_use_code } => {
            let stamped = bson::DateTime::from_chrono(at);
            match clear_single_use_code {
                true => doc!{
                    "$set":   { FAILED_LOGIN_ATTEMPTS: 0, LAST_LOGIN_AT: stamped },
                    "$unset": { SINGLE_USE_CODE: "", SINGLE_USE_CODE_ISSUED_AT: "" },
                },
                false => doc!{
                    "$set": { FAILED_LOGIN_ATTEMPTS: 0, LAST_LOGIN_AT: stamped },
                },
            }
        },

        AccountPatch::LoginFailed { at, attempted_code } => {
            let stamped = bson::DateTime::from_chrono(at);
            match attempted_code {
                Some(attempted) => doc!{
                    "$inc": { FAILED_LOGIN_ATTEMPTS: 1 },
                    "$set": {
                        LAST_LOGIN_AT: stamped,
                        SINGLE_USE_CODE: attempted.code,
                        SINGLE_USE_CODE_ISSUED_AT: bson::DateTime::from_chrono(attempted.issued_at),
                    },
                },
                None => doc!{
                    "$inc": { FAILED_LOGIN_ATTEMPTS: 1 },
                    "$set": { LAST_LOGIN_AT: stamped },
                },
            }
        },

        AccountPatch::CodeIssued { code, at } => doc!{
            "$set": {
                SINGLE_USE_CODE: code,
                SINGLE_USE_CODE_ISSUED_AT: bson::DateTime::from_chrono(at),
            },
        },
    }
}
