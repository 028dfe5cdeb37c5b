use bson::{Document, doc};
use mongodb::Database;
use mongodb::options::FindOneOptions;
use crate::db::prelude::*;
use crate::utils::errors::WardenError;
use crate::model::credential::CredentialRecord;

pub async fn insert(db: &Database, credential: &CredentialRecord) -> Result<(), WardenError> {
    db.collection::<CredentialRecord>(CREDENTIALS).insert_one(credential, None).await?;
    Ok(())
}

///
/// The most recently created credential. _id breaks ties between credentials created in the same millisecond.
///
pub async fn current(db: &Database, account_id: &str) -> Result<Option<CredentialRecord>, WardenError> {
    let options = FindOneOptions::builder()
        .sort(doc!{ CREATED_AT: -1, "_id": -1 })
        .build();

    Ok(db.collection::<CredentialRecord>(CREDENTIALS).find_one(doc!{ ACCOUNT_ID: account_id }, options).await?)
}

pub async fn delete_all(db: &Database, account_id: &str) -> Result<u64, WardenError> {
    let result = db.collection::<Document>(CREDENTIALS).delete_many(doc!{ ACCOUNT_ID: account_id }, None).await?;
    Ok(result.deleted_count)
}
