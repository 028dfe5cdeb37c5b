use std::fs;
use bson::DateTime;
use tracing::{debug, info};
use async_trait::async_trait;
use crate::db::{Store, prelude::*};
use crate::utils::config::Configuration;
use crate::utils::errors::{ErrorCode, WardenError};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::{Client, Database, bson::{Document, doc}, options::ClientOptions};
use crate::model::{account::{Account, AccountStatus, ProfileUpdate}, attempt::LoginAttempt, credential::CredentialRecord, reset::ResetToken, revocation::RevokedToken};
use super::{accounts, attempts, credentials, resets, revoked};

///
/// Run any schema-like updates against MongoDB that haven't been run yet.
///
pub async fn update_mongo(db: &Database) -> Result<(), WardenError> {
    create_init_indexes(db).await?;
    Ok(())
}

async fn create_init_indexes(db: &Database) -> Result<(), WardenError> {
    // Note: the current driver doesn't yet support creating indexes on collections, so the dbcommand must be used instead.
    // https://docs.mongodb.com/manual/reference/command/createIndexes/#createindexes

    db.run_command(doc! { "createIndexes": ACCOUNTS, "indexes": [
        { "key": { ACCOUNT_ID: 1 }, "name": "idx_account_id", "unique": true },
        { "key": { EMAIL: 1 }, "name": "idx_email", "unique": true },
        { "key": { VERIFICATION_HASH: 1 }, "name": "idx_verification_hash", "sparse": true }] }, None).await?;

    db.run_command(doc! { "createIndexes": CREDENTIALS, "indexes": [
        { "key": { ACCOUNT_ID: 1, CREATED_AT: -1 }, "name": "idx_account_created" }] }, None).await?;

    db.run_command(doc! { "createIndexes": LOGIN_ATTEMPTS, "indexes": [
        { "key": { IDENTIFIER: 1, CREATED_AT: 1 }, "name": "idx_identifier_created" },
        { "key": { ACCOUNT_ID: 1 }, "name": "idx_account_id" }] }, None).await?;

    // The TTL index lets MongoDB drop dead entries on its own - the sweeper still runs for other stores.
    db.run_command(doc! { "createIndexes": REVOKED_TOKENS, "indexes": [
        { "key": { FINGERPRINT: 1 }, "name": "idx_fingerprint", "unique": true },
        { "key": { ACCOUNT_ID: 1 }, "name": "idx_account_id" },
        { "key": { EXPIRES_AT: 1 }, "name": "idx_expires_at", "expireAfterSeconds": 0 }] }, None).await?;

    db.run_command(doc! { "createIndexes": RESET_TOKENS, "indexes": [
        { "key": { SECRET_HASH: 1 }, "name": "idx_secret_hash", "unique": true },
        { "key": { ACCOUNT_ID: 1 }, "name": "idx_account_id" }] }, None).await?;

    Ok(())
}

///
/// Indicates if the MongoDB error is from a duplicate key violation.
///
pub fn is_duplicate_err(err: &mongodb::error::Error) -> bool {
    matches!(&*err.kind, ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == 11000 /* Duplicate insert */)
}

pub async fn get_mongo_db(app_name: &str, config: &Configuration) -> Result<Database, WardenError> {

    let uri = match &config.mongo_credentials {
        Some(filename) => {
            debug!("Loading MongoDB credentials from secrets file {}", filename);

            // Read username and password from a secrets file.
            let credentials = fs::read_to_string(filename)
                .map_err(|err| ErrorCode::UnableToReadCredentials.with_msg(&format!("Unable to read credentials from {}: {}", filename, err)))?;
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

pub async fn ping(db: &Database) -> Result<Document, WardenError> {
    Ok(db.run_command(doc! { "ping": 1 }, None).await?)
}

///
/// The production store. Each operation is delegated to the collection module that owns it.
///
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        MongoStore { db }
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn ping(&self) -> Result<(), WardenError> {
        ping(&self.db).await.map(|_| ())
    }

    async fn insert_account(&self, account: &Account) -> Result<(), WardenError> {
        accounts::insert(&self.db, account).await
    }

    async fn load_account(&self, account_id: &str) -> Result<Option<Account>, WardenError> {
        accounts::load(&self.db, account_id).await
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, WardenError> {
        accounts::find_by_email(&self.db, email).await
    }

    async fn record_login_failure(&self, account_id: &str, max_failures: u32, lock_until: DateTime, now: DateTime)
        -> Result<Option<Account>, WardenError> {
        accounts::record_failure(&self.db, account_id, max_failures, lock_until, now).await
    }

    async fn record_login_success(&self, account_id: &str, origin: &str, now: DateTime) -> Result<(), WardenError> {
        accounts::record_success(&self.db, account_id, origin, now).await
    }

    async fn bump_generation(&self, account_id: &str, now: DateTime) -> Result<Option<u64>, WardenError> {
        accounts::bump_generation(&self.db, account_id, now).await
    }

    async fn update_profile(&self, account_id: &str, update: &ProfileUpdate, now: DateTime) -> Result<Option<Account>, WardenError> {
        accounts::update_profile(&self.db, account_id, update, now).await
    }

    async fn transition_status(&self, account_id: &str, from: &[AccountStatus], to: AccountStatus, now: DateTime)
        -> Result<bool, WardenError> {
        accounts::transition_status(&self.db, account_id, from, to, now).await
    }

    async fn verify_email(&self, verification_hash: &str, now: DateTime) -> Result<Option<Account>, WardenError> {
        accounts::verify_email(&self.db, verification_hash, now).await
    }

    async fn delete_account(&self, account_id: &str) -> Result<u64, WardenError> {
        accounts::delete(&self.db, account_id).await
    }

    async fn append_credential(&self, credential: &CredentialRecord) -> Result<(), WardenError> {
        credentials::insert(&self.db, credential).await
    }

    async fn current_credential(&self, account_id: &str) -> Result<Option<CredentialRecord>, WardenError> {
        credentials::current(&self.db, account_id).await
    }

    async fn delete_credentials(&self, account_id: &str) -> Result<u64, WardenError> {
        credentials::delete_all(&self.db, account_id).await
    }

    async fn append_attempt(&self, attempt: &LoginAttempt) -> Result<(), WardenError> {
        attempts::insert(&self.db, attempt).await
    }

    async fn attempts_since(&self, identifier: &str, since: DateTime) -> Result<Vec<LoginAttempt>, WardenError> {
        attempts::since(&self.db, identifier, since).await
    }

    async fn delete_attempts(&self, account_id: &str, identifier: &str) -> Result<u64, WardenError> {
        attempts::delete_all(&self.db, account_id, identifier).await
    }

    async fn insert_revoked(&self, token: &RevokedToken) -> Result<(), WardenError> {
        revoked::insert(&self.db, token).await
    }

    async fn is_revoked(&self, fingerprint: &str) -> Result<bool, WardenError> {
        revoked::exists(&self.db, fingerprint).await
    }

    async fn purge_revoked(&self, now: DateTime) -> Result<u64, WardenError> {
        revoked::purge(&self.db, now).await
    }

    async fn delete_revoked_for_account(&self, account_id: &str) -> Result<u64, WardenError> {
        revoked::delete_all(&self.db, account_id).await
    }

    async fn replace_reset_token(&self, token: &ResetToken) -> Result<(), WardenError> {
        resets::replace(&self.db, token).await
    }

    async fn redeem_reset_token(&self, secret_hash: &str, now: DateTime) -> Result<Option<ResetToken>, WardenError> {
        resets::redeem(&self.db, secret_hash, now).await
    }

    async fn delete_reset_tokens(&self, account_id: &str) -> Result<u64, WardenError> {
        resets::delete_all(&self.db, account_id).await
    }
}
