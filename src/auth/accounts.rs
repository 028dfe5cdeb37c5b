use std::sync::Arc;
use bson::DateTime;
use chrono::Duration;
use crate::db::Store;
use crate::model::account::{Account, AccountStatus, NewAccount, ProfileUpdate};
use crate::utils::{errors::{ErrorCode, WardenError}, generate_id, mailer::{self, Mail, Mailer}, secrets, time_provider::TimeProvider};
use super::{credentials::CredentialStore, revocation::RevocationRegistry, session::AuthContext};

const VERIFY_PATH: &str = "verify-email";

///
/// Exact counts of everything removed by a hard delete.
///
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeletionSummary {
    pub accounts: u64,
    pub credentials: u64,
    pub login_attempts: u64,
    pub reset_tokens: u64,
    pub revoked_tokens: u64,
}

///
/// Account lifecycle: sign-up, email verification, profile changes and deletion.
///
pub struct AccountService {
    store: Arc<dyn Store>,
    credentials: Arc<CredentialStore>,
    registry: Arc<RevocationRegistry>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<TimeProvider>,
    verification_lifetime: Duration,
    frontend_url: String,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn Store>,
        credentials: Arc<CredentialStore>,
        registry: Arc<RevocationRegistry>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<TimeProvider>,
        verification_lifetime: Duration,
        frontend_url: &str) -> Self {

        AccountService {
            store,
            credentials,
            registry,
            mailer,
            clock,
            verification_lifetime,
            frontend_url: frontend_url.to_string(),
        }
    }

    ///
    /// Register a pending account and email a verification link. Returns the new account id.
    ///
    pub async fn signup(&self, details: NewAccount, password: &str) -> Result<String, WardenError> {
        let email = secrets::normalize_email(&details.email);
        if email.is_empty() || !email.contains('@') {
            return Err(ErrorCode::InvalidRequest.with_msg("A valid email address is required"))
        }
        if password.is_empty() {
            return Err(ErrorCode::InvalidRequest.with_msg("A password is required"))
        }

        // Hash before inserting so a hashing failure never leaves the email taken.
        let phc = self.credentials.hash(password).await?;

        let now = self.clock.now();
        let secret = secrets::generate_secret();

        let mut account = Account::new(&generate_id(), NewAccount { email, ..details }, DateTime::from_chrono(now));
        account.verification_hash = Some(secrets::digest(&secret));
        account.verification_expires_at = Some(DateTime::from_chrono(now + self.verification_lifetime));

        self.store.insert_account(&account).await?;

        if let Err(err) = self.credentials.store_hash(&account.account_id, phc).await {
            if let Err(cleanup) = self.store.delete_account(&account.account_id).await {
                tracing::error!("Unable to remove account {} after its credential failed: {}", account.account_id, cleanup);
            }
            return Err(err)
        }

        let link = secrets::build_link(&self.frontend_url, VERIFY_PATH, &secret);
        mailer::dispatch(self.mailer.clone(), Mail {
            to: account.email.clone(),
            subject: "Verify your email address".to_string(),
            body: format!("Hello {},\n\nPlease confirm your email address within {} hours.\n\n{}\n",
                account.display_name(), self.verification_lifetime.num_hours(), link),
        });

        tracing::info!("Account {} registered and pending verification", account.account_id);
        Ok(account.account_id)
    }

    ///
    /// Redeem a verification secret, activating the account.
    ///
    pub async fn verify_email(&self, secret: &str) -> Result<Account, WardenError> {
        let account = self.store.verify_email(&secrets::digest(secret.trim()), DateTime::from_chrono(self.clock.now()))
            .await?
            .ok_or_else(|| ErrorCode::VerificationTokenInvalid.with_msg("The verification link is invalid or has expired"))?;

        tracing::info!("Account {} verified its email", account.account_id);
        Ok(account)
    }

    pub async fn profile(&self, auth: &AuthContext) -> Result<Account, WardenError> {
        self.store.load_account(auth.account_id())
            .await?
            .ok_or_else(|| ErrorCode::AccountNotFound.with_msg("The account does not exist"))
    }

    pub async fn update_profile(&self, auth: &AuthContext, update: &ProfileUpdate) -> Result<Account, WardenError> {
        if update.is_empty() {
            return self.profile(auth).await
        }

        self.store.update_profile(auth.account_id(), update, DateTime::from_chrono(self.clock.now()))
            .await?
            .ok_or_else(|| ErrorCode::AccountNotFound.with_msg("The account does not exist"))
    }

    ///
    /// Soft delete. The account is kept but can no longer log in and every session ends.
    ///
    pub async fn deactivate(&self, auth: &AuthContext) -> Result<(), WardenError> {
        let from = [AccountStatus::Active, AccountStatus::PendingVerification, AccountStatus::Suspended];

        if !self.store.transition_status(auth.account_id(), &from, AccountStatus::Inactive, DateTime::from_chrono(self.clock.now())).await? {
            return Err(ErrorCode::AccountAlreadyInactive.with_msg("The account is already inactive"))
        }

        self.registry.bump_generation(auth.account_id()).await?;
        tracing::info!("Account {} deactivated", auth.account_id());
        Ok(())
    }

    ///
    /// Undo a soft delete. Only available through the admin API.
    ///
    pub async fn restore(&self, account_id: &str) -> Result<(), WardenError> {
        let now = DateTime::from_chrono(self.clock.now());

        if !self.store.transition_status(account_id, &[AccountStatus::Inactive], AccountStatus::Active, now).await? {
            return match self.store.load_account(account_id).await? {
                Some(_) => Err(ErrorCode::AccountNotInactive.with_msg("Only inactive accounts can be restored")),
                None => Err(ErrorCode::AccountNotFound.with_msg("The account does not exist")),
            }
        }

        tracing::info!("Account {} restored", account_id);
        Ok(())
    }

    ///
    /// Permanently remove the account and everything that references it, dependents first.
    ///
    pub async fn hard_delete(&self, auth: &AuthContext) -> Result<DeletionSummary, WardenError> {
        let account = self.profile(auth).await?;
        let account_id = account.account_id.as_str();

        let summary = DeletionSummary {
            login_attempts: self.store.delete_attempts(account_id, &account.email).await?,
            reset_tokens: self.store.delete_reset_tokens(account_id).await?,
            revoked_tokens: self.store.delete_revoked_for_account(account_id).await?,
            credentials: self.store.delete_credentials(account_id).await?,
            accounts: self.store.delete_account(account_id).await?,
        };

        tracing::info!("Account {} permanently deleted: {:?}", account_id, summary);
        Ok(summary)
    }
}
