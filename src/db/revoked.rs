use bson::{DateTime, Document, doc};
use mongodb::Database;
use crate::db::{mongo, prelude::*};
use crate::utils::errors::WardenError;
use crate::model::revocation::RevokedToken;

///
/// The unique fingerprint index makes a repeat revoke a no-op.
///
pub async fn insert(db: &Database, token: &RevokedToken) -> Result<(), WardenError> {
    match db.collection::<RevokedToken>(REVOKED_TOKENS).insert_one(token, None).await {
        Ok(_) => Ok(()),
        Err(err) if mongo::is_duplicate_err(&err) => Ok(()),
        Err(err) => Err(WardenError::from(err)),
    }
}

pub async fn exists(db: &Database, fingerprint: &str) -> Result<bool, WardenError> {
    let found = db.collection::<Document>(REVOKED_TOKENS)
        .find_one(doc!{ FINGERPRINT: fingerprint }, None)
        .await?;

    Ok(found.is_some())
}

pub async fn purge(db: &Database, now: DateTime) -> Result<u64, WardenError> {
    let result = db.collection::<Document>(REVOKED_TOKENS)
        .delete_many(doc!{ EXPIRES_AT: { "$lte": now } }, None)
        .await?;

    Ok(result.deleted_count)
}

pub async fn delete_all(db: &Database, account_id: &str) -> Result<u64, WardenError> {
    let result = db.collection::<Document>(REVOKED_TOKENS).delete_many(doc!{ ACCOUNT_ID: account_id }, None).await?;
    Ok(result.deleted_count)
}
