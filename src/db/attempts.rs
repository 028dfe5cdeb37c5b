use bson::{DateTime, Document, doc};
use futures::stream::TryStreamExt;
use mongodb::Database;
use mongodb::options::FindOptions;
use crate::db::prelude::*;
use crate::utils::errors::WardenError;
use crate::model::attempt::LoginAttempt;

pub async fn insert(db: &Database, attempt: &LoginAttempt) -> Result<(), WardenError> {
    db.collection::<LoginAttempt>(LOGIN_ATTEMPTS).insert_one(attempt, None).await?;
    Ok(())
}

///
/// Attempts made with the identifier at or after since, oldest first.
///
pub async fn since(db: &Database, identifier: &str, since: DateTime) -> Result<Vec<LoginAttempt>, WardenError> {
    let filter = doc!{ IDENTIFIER: identifier, CREATED_AT: { "$gte": since } };
    let options = FindOptions::builder().sort(doc!{ CREATED_AT: 1 }).build();

    let cursor = db.collection::<LoginAttempt>(LOGIN_ATTEMPTS).find(filter, options).await?;
    let attempts: Vec<LoginAttempt> = cursor.try_collect().await?;
    Ok(attempts)
}

pub async fn delete_all(db: &Database, account_id: &str, identifier: &str) -> Result<u64, WardenError> {
    let filter = doc!{ "$or": [ { ACCOUNT_ID: account_id }, { IDENTIFIER: identifier } ] };
    let result = db.collection::<Document>(LOGIN_ATTEMPTS).delete_many(filter, None).await?;
    Ok(result.deleted_count)
}
