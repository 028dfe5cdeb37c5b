use bson::{Bson, DateTime, Document, doc};
use mongodb::Database;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use crate::db::{mongo, prelude::*};
use crate::utils::errors::{ErrorCode, WardenError};
use crate::model::account::{Account, AccountStatus, ProfileUpdate};

fn return_after() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder().return_document(ReturnDocument::After).build()
}

pub async fn insert(db: &Database, account: &Account) -> Result<(), WardenError> {
    match db.collection::<Account>(ACCOUNTS).insert_one(account, None).await {
        Ok(_) => Ok(()),
        Err(err) if mongo::is_duplicate_err(&err) => Err(ErrorCode::EmailAlreadyRegistered
            .with_msg("An account with that email address already exists")),
        Err(err) => Err(WardenError::from(err)),
    }
}

pub async fn load(db: &Database, account_id: &str) -> Result<Option<Account>, WardenError> {
    Ok(db.collection::<Account>(ACCOUNTS).find_one(doc!{ ACCOUNT_ID: account_id }, None).await?)
}

pub async fn find_by_email(db: &Database, email: &str) -> Result<Option<Account>, WardenError> {
    Ok(db.collection::<Account>(ACCOUNTS).find_one(doc!{ EMAIL: email }, None).await?)
}

///
/// A single update pipeline so concurrent failures can't lose increments or skip the lock.
///
pub async fn record_failure(db: &Database, account_id: &str, max_failures: u32, lock_until: DateTime, now: DateTime)
    -> Result<Option<Account>, WardenError> {

    let update = vec!(
        doc!{ "$set": {
            FAILED_LOGIN_COUNT: { "$add": [ { "$ifNull": [ "$failed_login_count", 0 ] }, 1 ] },
            UPDATED_AT: now,
        }},
        doc!{ "$set": {
            LOCKED_UNTIL: { "$cond": [ { "$gte": [ "$failed_login_count", max_failures as i64 ] }, lock_until, "$locked_until" ] },
        }},
    );

    Ok(db.collection::<Account>(ACCOUNTS)
        .find_one_and_update(doc!{ ACCOUNT_ID: account_id }, update, return_after())
        .await?)
}

pub async fn record_success(db: &Database, account_id: &str, origin: &str, now: DateTime) -> Result<(), WardenError> {
    let update = doc!{
        "$set": {
            FAILED_LOGIN_COUNT: 0_i64,
            LOCKED_UNTIL: Bson::Null,
            LAST_LOGIN_AT: now,
            LAST_LOGIN_ORIGIN: origin,
            UPDATED_AT: now,
        }
    };

    db.collection::<Document>(ACCOUNTS).update_one(doc!{ ACCOUNT_ID: account_id }, update, None).await?;
    Ok(())
}

pub async fn bump_generation(db: &Database, account_id: &str, now: DateTime) -> Result<Option<u64>, WardenError> {
    let update = doc!{
        "$inc": { TOKEN_GENERATION: 1_i64 },
        "$set": { UPDATED_AT: now },
    };

    let account = db.collection::<Account>(ACCOUNTS)
        .find_one_and_update(doc!{ ACCOUNT_ID: account_id }, update, return_after())
        .await?;

    Ok(account.map(|account| account.token_generation))
}

pub async fn update_profile(db: &Database, account_id: &str, update: &ProfileUpdate, now: DateTime) -> Result<Option<Account>, WardenError> {
    let mut set = doc!{ UPDATED_AT: now };

    if let Some(first_name) = &update.first_name {
        set.insert(FIRST_NAME, first_name.as_str());
    }
    if let Some(last_name) = &update.last_name {
        set.insert(LAST_NAME, last_name.as_str());
    }
    if let Some(organization) = &update.organization {
        set.insert(ORGANIZATION, organization.as_str());
    }
    if let Some(job_role) = &update.job_role {
        set.insert(JOB_ROLE, job_role.as_str());
    }
    if let Some(profile_url) = &update.profile_url {
        set.insert(PROFILE_URL, profile_url.as_str());
    }

    Ok(db.collection::<Account>(ACCOUNTS)
        .find_one_and_update(doc!{ ACCOUNT_ID: account_id }, doc!{ "$set": set }, return_after())
        .await?)
}

pub async fn transition_status(db: &Database, account_id: &str, from: &[AccountStatus], to: AccountStatus, now: DateTime)
    -> Result<bool, WardenError> {

    let from: Vec<String> = from.iter().map(AccountStatus::to_string).collect();
    let filter = doc!{ ACCOUNT_ID: account_id, STATUS: { "$in": from } };
    let update = doc!{ "$set": { STATUS: to.to_string(), UPDATED_AT: now } };

    let result = db.collection::<Document>(ACCOUNTS).update_one(filter, update, None).await?;
    Ok(result.modified_count == 1)
}

pub async fn verify_email(db: &Database, verification_hash: &str, now: DateTime) -> Result<Option<Account>, WardenError> {
    let filter = doc!{
        VERIFICATION_HASH: verification_hash,
        VERIFICATION_EXPIRES_AT: { "$gt": now },
        STATUS: AccountStatus::PendingVerification.to_string(),
    };

    let update = doc!{
        "$set": {
            STATUS: AccountStatus::Active.to_string(),
            EMAIL_VERIFIED_AT: now,
            UPDATED_AT: now,
        },
        "$unset": { VERIFICATION_HASH: "", VERIFICATION_EXPIRES_AT: "" },
    };

    Ok(db.collection::<Account>(ACCOUNTS)
        .find_one_and_update(filter, update, return_after())
        .await?)
}

pub async fn delete(db: &Database, account_id: &str) -> Result<u64, WardenError> {
    let result = db.collection::<Document>(ACCOUNTS).delete_one(doc!{ ACCOUNT_ID: account_id }, None).await?;
    Ok(result.deleted_count)
}
