use std::sync::Arc;
use bson::DateTime;
use crate::db::Store;
use crate::model::{algorithm::{self, argon::ArgonPolicy}, credential::CredentialRecord};
use crate::utils::{errors::WardenError, time_provider::TimeProvider};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Verification {
    Match,
    Mismatch,
    NoCredential,
}

///
/// Hashes and verifies passwords against an account's credential history. Hashing is CPU-bound
/// so it always runs on the blocking worker pool.
///
pub struct CredentialStore {
    store: Arc<dyn Store>,
    clock: Arc<TimeProvider>,
    policy: ArgonPolicy,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn Store>, clock: Arc<TimeProvider>, policy: ArgonPolicy) -> Self {
        CredentialStore { store, clock, policy }
    }

    ///
    /// Hash the password and append it as the account's current credential.
    ///
    pub async fn set_password(&self, account_id: &str, plain_text_password: &str) -> Result<(), WardenError> {
        let phc = self.hash(plain_text_password).await?;
        self.store_hash(account_id, phc).await
    }

    ///
    /// Produce a PHC string under the current policy without storing it. Callers that spend a
    /// single-use secret or create a record hash first, so a hashing failure changes nothing.
    ///
    pub async fn hash(&self, plain_text_password: &str) -> Result<String, WardenError> {
        let policy = self.policy.clone();
        let plain_text_password = plain_text_password.to_string();

        tokio::task::spawn_blocking(move || policy.hash_into_phc(&plain_text_password))
            .await
            .map_err(WardenError::from)?
    }

    ///
    /// Append an already hashed password as the account's current credential.
    ///
    pub async fn store_hash(&self, account_id: &str, phc: String) -> Result<(), WardenError> {
        self.store.append_credential(&CredentialRecord {
            account_id: account_id.to_string(),
            phc,
            created_at: DateTime::from_chrono(self.clock.now()),
        }).await
    }

    ///
    /// Check the password against the account's most recent credential.
    ///
    pub async fn verify(&self, account_id: &str, plain_text_password: &str) -> Result<Verification, WardenError> {
        let credential = match self.store.current_credential(account_id).await? {
            Some(credential) => credential,
            None => return Ok(Verification::NoCredential),
        };

        let plain_text_password = plain_text_password.to_string();
        let valid = tokio::task::spawn_blocking(move || algorithm::validate(&plain_text_password, &credential.phc))
            .await
            .map_err(WardenError::from)??;

        Ok(match valid {
            true  => Verification::Match,
            false => Verification::Mismatch,
        })
    }
}
