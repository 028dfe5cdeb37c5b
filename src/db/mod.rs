pub mod accounts;
pub mod attempts;
pub mod credentials;
pub mod memory;
pub mod mongo;
pub mod resets;
pub mod revoked;

use std::sync::Arc;
use bson::DateTime;
use async_trait::async_trait;
use crate::utils::config::{Configuration, StoreKind};
use crate::utils::errors::WardenError;
use crate::model::{account::{Account, AccountStatus, ProfileUpdate}, attempt::LoginAttempt, credential::CredentialRecord, reset::ResetToken, revocation::RevokedToken};

pub mod prelude {
    // Collection names.
    pub const ACCOUNTS:       &str = "Accounts";
    pub const CREDENTIALS:    &str = "Credentials";
    pub const LOGIN_ATTEMPTS: &str = "LoginAttempts";
    pub const RESET_TOKENS:   &str = "ResetTokens";
    pub const REVOKED_TOKENS: &str = "RevokedTokens";

    // Field names.
    pub const ACCOUNT_ID:              &str = "account_id";
    pub const CREATED_AT:              &str = "created_at";
    pub const EMAIL:                   &str = "email";
    pub const EMAIL_VERIFIED_AT:       &str = "email_verified_at";
    pub const EXPIRES_AT:              &str = "expires_at";
    pub const FAILED_LOGIN_COUNT:      &str = "failed_login_count";
    pub const FINGERPRINT:             &str = "fingerprint";
    pub const FIRST_NAME:              &str = "first_name";
    pub const IDENTIFIER:              &str = "identifier";
    pub const JOB_ROLE:                &str = "job_role";
    pub const LAST_LOGIN_AT:           &str = "last_login_at";
    pub const LAST_LOGIN_ORIGIN:       &str = "last_login_origin";
    pub const LAST_NAME:               &str = "last_name";
    pub const LOCKED_UNTIL:            &str = "locked_until";
    pub const ORGANIZATION:            &str = "organization";
    pub const PROFILE_URL:             &str = "profile_url";
    pub const SECRET_HASH:             &str = "secret_hash";
    pub const STATUS:                  &str = "status";
    pub const TOKEN_GENERATION:        &str = "token_generation";
    pub const UPDATED_AT:              &str = "updated_at";
    pub const USED_AT:                 &str = "used_at";
    pub const VERIFICATION_EXPIRES_AT: &str = "verification_expires_at";
    pub const VERIFICATION_HASH:       &str = "verification_hash";
}

///
/// Everything the service persists. Each method is a single atomic operation against the
/// backing store - callers never read-modify-write across two calls.
///
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), WardenError>;

    ///
    /// Insert a new account. Fails with EmailAlreadyRegistered if the email is taken.
    ///
    async fn insert_account(&self, account: &Account) -> Result<(), WardenError>;
    async fn load_account(&self, account_id: &str) -> Result<Option<Account>, WardenError>;
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, WardenError>;

    ///
    /// Increment the failure counter and, if the new count reaches max_failures, set the lock.
    /// Returns the account as it is after the update.
    ///
    async fn record_login_failure(&self, account_id: &str, max_failures: u32, lock_until: DateTime, now: DateTime)
        -> Result<Option<Account>, WardenError>;

    ///
    /// Zero the failure counter, clear any lock and stamp the login.
    ///
    async fn record_login_success(&self, account_id: &str, origin: &str, now: DateTime) -> Result<(), WardenError>;

    ///
    /// Increment the token generation, returning the new value (None if no such account).
    ///
    async fn bump_generation(&self, account_id: &str, now: DateTime) -> Result<Option<u64>, WardenError>;

    async fn update_profile(&self, account_id: &str, update: &ProfileUpdate, now: DateTime) -> Result<Option<Account>, WardenError>;

    ///
    /// Move the account to the new status only if it is currently in one of the from statuses.
    /// Returns true if the transition happened.
    ///
    async fn transition_status(&self, account_id: &str, from: &[AccountStatus], to: AccountStatus, now: DateTime)
        -> Result<bool, WardenError>;

    ///
    /// Claim an unexpired verification secret for a pending account, activating it.
    ///
    async fn verify_email(&self, verification_hash: &str, now: DateTime) -> Result<Option<Account>, WardenError>;

    async fn delete_account(&self, account_id: &str) -> Result<u64, WardenError>;

    async fn append_credential(&self, credential: &CredentialRecord) -> Result<(), WardenError>;
    async fn current_credential(&self, account_id: &str) -> Result<Option<CredentialRecord>, WardenError>;
    async fn delete_credentials(&self, account_id: &str) -> Result<u64, WardenError>;

    async fn append_attempt(&self, attempt: &LoginAttempt) -> Result<(), WardenError>;
    async fn attempts_since(&self, identifier: &str, since: DateTime) -> Result<Vec<LoginAttempt>, WardenError>;

    ///
    /// Remove attempts recorded against the account or made with its email.
    ///
    async fn delete_attempts(&self, account_id: &str, identifier: &str) -> Result<u64, WardenError>;

    ///
    /// Blacklist a token fingerprint. Revoking the same fingerprint twice is not an error.
    ///
    async fn insert_revoked(&self, revoked: &RevokedToken) -> Result<(), WardenError>;
    async fn is_revoked(&self, fingerprint: &str) -> Result<bool, WardenError>;
    async fn purge_revoked(&self, now: DateTime) -> Result<u64, WardenError>;
    async fn delete_revoked_for_account(&self, account_id: &str) -> Result<u64, WardenError>;

    ///
    /// Remove any unused reset tokens for the account then store the new one.
    ///
    async fn replace_reset_token(&self, token: &ResetToken) -> Result<(), WardenError>;

    ///
    /// Mark an unused, unexpired reset token as used and return it. A token can only ever be
    /// claimed once, whatever the concurrency.
    ///
    async fn redeem_reset_token(&self, secret_hash: &str, now: DateTime) -> Result<Option<ResetToken>, WardenError>;
    async fn delete_reset_tokens(&self, account_id: &str) -> Result<u64, WardenError>;
}

///
/// Connect to the configured backend.
///
pub async fn connect(app_name: &str, config: &Configuration) -> Result<Arc<dyn Store>, WardenError> {
    match config.store {
        StoreKind::Mongo => {
            let db = mongo::get_mongo_db(app_name, config).await?;

            // Ensure the schema is in sync with the code.
            mongo::update_mongo(&db).await?;
            Ok(Arc::new(mongo::MongoStore::new(db)))
        },
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory store - nothing will survive a restart");
            Ok(Arc::new(memory::MemoryStore::default()))
        },
    }
}
