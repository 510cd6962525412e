use mongodb::Database;
use bson::doc;
use super::{JurisdictionStore, prelude::*};
use crate::model::jurisdiction::{Jurisdiction, LoginMethod};
use crate::utils::errors::GateError;

///
/// Read-only MongoDB adapter for the jurisdiction gate.
///
#[derive(Clone)]
pub struct MongoJurisdictionStore {
    db: Database,
}

impl MongoJurisdictionStore {
    pub fn new(db: Database) -> Self {
        MongoJurisdictionStore { db }
    }
}

#[tonic::async_trait]
impl JurisdictionStore for MongoJurisdictionStore {

    async fn find_enabling(&self, names: &[String], method: LoginMethod) -> Result<Option<Jurisdiction>, GateError> {
        let mut filter = doc!{ NAME: { "$in": names.to_vec() } };

        // Password login is available to every jurisdiction, code login is opt-in.
        if let LoginMethod::SingleUseCode = method {
            filter.insert(ALLOW_SINGLE_USE_CODE_LOGIN, true);
        }

        Ok(self.db.collection::<Jurisdiction>(JURISDICTIONS).find_one(filter, None).await?)
    }
}
