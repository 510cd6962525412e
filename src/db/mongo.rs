use std::fs;
use uuid::Uuid;
use tracing::{debug, info};
use super::prelude::*;
use mongodb::error::ErrorKind;
use crate::model::jurisdiction::Jurisdiction;
use crate::utils::errors::{ErrorCode, GateError};
use crate::utils::config::Configuration;
use mongodb::{Client, Database, bson::{Document, doc}, options::ClientOptions};

///
/// Run any schema-like updates against MongoDB that haven't been run yet.
///
pub async fn update_mongo(db: &Database) -> Result<(), GateError> {
    create_init_indexes(db).await?;
    create_default_jurisdiction(db).await?;
    Ok(())
}

async fn create_init_indexes(db: &Database) -> Result<(), GateError> {
    // Note: the current driver doesn't yet support creating indexes on collections, so the dbcommand must be used instead.
    // https://docs.mongodb.com/manual/reference/command/createIndexes/#createindexes

    db.run_command(doc! { "createIndexes": ACCOUNTS, "indexes": [
        { "key": { ACCOUNT_ID: 1 }, "name": "idx_account_id", "unique": true },
        { "key": { EMAIL: 1 },      "name": "idx_email",      "unique": true }] }, None).await?;

    db.run_command(doc! { "createIndexes": JURISDICTIONS, "indexes": [
        { "key": { JURISDICTION_ID: 1 }, "name": "idx_jurisdiction_id", "unique": true },
        { "key": { NAME: 1 },            "name": "idx_name",            "unique": true }] }, None).await?;

    Ok(())
}

///
/// Create a jurisdiction named 'default' IF IT DOESN'T EXIST - handy for local dev,
/// real deployments provision their own.
///
async fn create_default_jurisdiction(db: &Database) -> Result<(), GateError> {
    let default = Jurisdiction {
        jurisdiction_id: generate_id(),
        name: "default".to_string(),
        allow_single_use_code_login: true,
    };

    match db.collection::<Jurisdiction>(JURISDICTIONS).insert_one(default, None).await {
        Ok(_) => Ok(()),
        Err(err) => {
            match is_duplicate_err(&err) {
                true  => Ok(()),
                false => Err(GateError::from(err)),
            }
        },
    }
}

///
/// Indicates if the MongoDB error is from a duplicate key violation.
///
pub fn is_duplicate_err(err: &mongodb::error::Error) -> bool {
    let ec = err.clone();
    match *ec.kind {
        ErrorKind::Write(sub_err) => match sub_err {
            mongodb::error::WriteFailure::WriteError(we) => {
                if we.code == 11000 /* Duplicate insert */ {
                    return true
                }

                false
            },
            _ => false,
        },
        _ => return false
    }
}

pub async fn get_mongo_db(app_name: &str, config: &Configuration) -> Result<Database, GateError> {

    let uri = match &config.mongo_credentials {
        Some(filename) => {
            debug!("Loading MongoDB credentials from secrets file {}", filename);

            // Read username and password from a secrets file.
            let credentials = fs::read_to_string(filename)
                .map_err(|err| ErrorCode::UnableToReadCredentials
                    .with_msg(&format!("Unable to read credentials from {}: {}", filename, err)))?;
            let mut credentials = credentials.lines();
            let uri = config.mongo_uri.replace("$USERNAME", credentials.next().unwrap_or_default());
            uri.replace("$PASSWORD", credentials.next().unwrap_or_default())
        },
        None => config.mongo_uri.clone(),
    };

    // Parse the uri now.
    let mut client_options = ClientOptions::parse(&uri).await?;

    // Manually set an option.
    client_options.app_name = Some(app_name.to_string());

    // Get a handle to the deployment.
    let client = Client::with_options(client_options)?;

    info!("Connecting to MongoDB...");

    let db = client.database(&config.db_name);
    ping(&db).await?;

    info!("Connected to MongoDB");
    Ok(db)
}

pub async fn ping(db: &Database) -> Result<Document, GateError> {
    Ok(db.run_command(doc! { "ping": 1 }, None).await?)
}

pub fn generate_id() -> String {
    Uuid::new_v4().to_hyphenated().to_string()
}
