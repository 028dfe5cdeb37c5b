use bson::{Bson, DateTime, Document, doc};
use mongodb::Database;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use crate::db::prelude::*;
use crate::utils::errors::WardenError;
use crate::model::reset::ResetToken;

///
/// Only one unused reset token may exist per account, so older unused ones go first.
///
pub async fn replace(db: &Database, token: &ResetToken) -> Result<(), WardenError> {
    db.collection::<Document>(RESET_TOKENS)
        .delete_many(doc!{ ACCOUNT_ID: token.account_id.as_str(), USED_AT: Bson::Null }, None)
        .await?;

    db.collection::<ResetToken>(RESET_TOKENS).insert_one(token, None).await?;
    Ok(())
}

///
/// Atomically claim the token. Only the caller whose update matched gets it back.
///
pub async fn redeem(db: &Database, secret_hash: &str, now: DateTime) -> Result<Option<ResetToken>, WardenError> {
    let filter = doc!{
        SECRET_HASH: secret_hash,
        USED_AT: Bson::Null,
        EXPIRES_AT: { "$gt": now },
    };

    let options = FindOneAndUpdateOptions::builder().return_document(ReturnDocument::After).build();

    Ok(db.collection::<ResetToken>(RESET_TOKENS)
        .find_one_and_update(filter, doc!{ "$set": { USED_AT: now } }, options)
        .await?)
}

pub async fn delete_all(db: &Database, account_id: &str) -> Result<u64, WardenError> {
    let result = db.collection::<Document>(RESET_TOKENS).delete_many(doc!{ ACCOUNT_ID: account_id }, None).await?;
    Ok(result.deleted_count)
}
