use mongodb::Database;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use crate::auth::{Authenticator, LockoutPolicy};
use crate::db::account::MongoAccountStore;
use crate::db::jurisdiction::MongoJurisdictionStore;
use crate::utils::config::Configuration;
use crate::utils::time_provider::TimeProvider;

///
/// The context is available to all gRPC service endpoints and gives them access to
/// the authenticator, the DB, config and the (fixable) clock.
///
pub struct ServiceContext {
    db: Database,
    config: Configuration,
    authenticator: Authenticator<MongoAccountStore, MongoJurisdictionStore>,
    time_provider: RwLock<TimeProvider>,
}

impl ServiceContext {
    pub fn new(config: Configuration, db: Database) -> Self {
        let authenticator = Authenticator::new(
            MongoAccountStore::new(db.clone()),
            MongoJurisdictionStore::new(db.clone()),
            LockoutPolicy::new(config.failed_login_limit),
            Duration::seconds(config.code_validity_seconds));

        ServiceContext {
            db,
            config,
            authenticator,
            time_provider: RwLock::new(TimeProvider::default()),
        }
    }

    pub fn authenticator(&self) -> &Authenticator<MongoAccountStore, MongoJurisdictionStore> {
        &self.authenticator
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.time_provider.read().now()
    }

    ///
    /// Set or clear the fixed time.
    ///
    pub fn set_now(&self, now: Option<DateTime<Utc>>) {
        self.time_provider.write().fix(now);
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }
}
