use bson::DateTime;
use parking_lot::Mutex;
use async_trait::async_trait;
use std::collections::HashMap;
use crate::db::Store;
use crate::utils::errors::{ErrorCode, WardenError};
use crate::model::{account::{Account, AccountStatus, ProfileUpdate}, attempt::LoginAttempt, credential::CredentialRecord, reset::ResetToken, revocation::RevokedToken};

#[derive(Default)]
struct MemoryData {
    accounts: HashMap<String, Account>,  // Keyed by account_id.
    credentials: Vec<CredentialRecord>,  // In insertion order.
    attempts: Vec<LoginAttempt>,
    revoked: HashMap<String, RevokedToken>, // Keyed by fingerprint.
    resets: Vec<ResetToken>,
}

///
/// An in-process store for tests and local development. Every operation holds the one lock for
/// its whole duration, which gives the same atomicity as the MongoDB store.
///
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), WardenError> {
        Ok(())
    }

    async fn insert_account(&self, account: &Account) -> Result<(), WardenError> {
        let mut data = self.data.lock();

        if data.accounts.values().any(|existing| existing.email == account.email) {
            return Err(ErrorCode::EmailAlreadyRegistered.with_msg("An account with that email address already exists"))
        }

        data.accounts.insert(account.account_id.clone(), account.clone());
        Ok(())
    }

    async fn load_account(&self, account_id: &str) -> Result<Option<Account>, WardenError> {
        Ok(self.data.lock().accounts.get(account_id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, WardenError> {
        Ok(self.data.lock().accounts.values().find(|account| account.email == email).cloned())
    }

    async fn record_login_failure(&self, account_id: &str, max_failures: u32, lock_until: DateTime, now: DateTime)
        -> Result<Option<Account>, WardenError> {

        let mut data = self.data.lock();
        Ok(data.accounts.get_mut(account_id).map(|account| {
            account.failed_login_count += 1;
            if account.failed_login_count >= max_failures {
                account.locked_until = Some(lock_until);
            }
            account.updated_at = now;
            account.clone()
        }))
    }

    async fn record_login_success(&self, account_id: &str, origin: &str, now: DateTime) -> Result<(), WardenError> {
        if let Some(account) = self.data.lock().accounts.get_mut(account_id) {
            account.failed_login_count = 0;
            account.locked_until = None;
            account.last_login_at = Some(now);
            account.last_login_origin = Some(origin.to_string());
            account.updated_at = now;
        }
        Ok(())
    }

    async fn bump_generation(&self, account_id: &str, now: DateTime) -> Result<Option<u64>, WardenError> {
        Ok(self.data.lock().accounts.get_mut(account_id).map(|account| {
            account.token_generation += 1;
            account.updated_at = now;
            account.token_generation
        }))
    }

    async fn update_profile(&self, account_id: &str, update: &ProfileUpdate, now: DateTime) -> Result<Option<Account>, WardenError> {
        Ok(self.data.lock().accounts.get_mut(account_id).map(|account| {
            update.apply(account);
            account.updated_at = now;
            account.clone()
        }))
    }

    async fn transition_status(&self, account_id: &str, from: &[AccountStatus], to: AccountStatus, now: DateTime)
        -> Result<bool, WardenError> {

        match self.data.lock().accounts.get_mut(account_id) {
            Some(account) if from.contains(&account.status) => {
                account.status = to;
                account.updated_at = now;
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn verify_email(&self, verification_hash: &str, now: DateTime) -> Result<Option<Account>, WardenError> {
        let mut data = self.data.lock();

        let account = data.accounts.values_mut().find(|account| {
            account.status == AccountStatus::PendingVerification
                && account.verification_hash.as_deref() == Some(verification_hash)
                && matches!(account.verification_expires_at, Some(expires_at) if expires_at > now)
        });

        Ok(account.map(|account| {
            account.status = AccountStatus::Active;
            account.email_verified_at = Some(now);
            account.verification_hash = None;
            account.verification_expires_at = None;
            account.updated_at = now;
            account.clone()
        }))
    }

    async fn delete_account(&self, account_id: &str) -> Result<u64, WardenError> {
        Ok(self.data.lock().accounts.remove(account_id).map_or(0, |_| 1))
    }

    async fn append_credential(&self, credential: &CredentialRecord) -> Result<(), WardenError> {
        self.data.lock().credentials.push(credential.clone());
        Ok(())
    }

    async fn current_credential(&self, account_id: &str) -> Result<Option<CredentialRecord>, WardenError> {
        // max_by_key returns the last of equal maxima, so the latest append wins a same-instant tie.
        Ok(self.data.lock().credentials
            .iter()
            .filter(|credential| credential.account_id == account_id)
            .max_by_key(|credential| credential.created_at)
            .cloned())
    }

    async fn delete_credentials(&self, account_id: &str) -> Result<u64, WardenError> {
        let mut data = self.data.lock();
        let before = data.credentials.len();
        data.credentials.retain(|credential| credential.account_id != account_id);
        Ok((before - data.credentials.len()) as u64)
    }

    async fn append_attempt(&self, attempt: &LoginAttempt) -> Result<(), WardenError> {
        self.data.lock().attempts.push(attempt.clone());
        Ok(())
    }

    async fn attempts_since(&self, identifier: &str, since: DateTime) -> Result<Vec<LoginAttempt>, WardenError> {
        Ok(self.data.lock().attempts
            .iter()
            .filter(|attempt| attempt.identifier == identifier && attempt.created_at >= since)
            .cloned()
            .collect())
    }

    async fn delete_attempts(&self, account_id: &str, identifier: &str) -> Result<u64, WardenError> {
        let mut data = self.data.lock();
        let before = data.attempts.len();
        data.attempts.retain(|attempt| attempt.account_id.as_deref() != Some(account_id) && attempt.identifier != identifier);
        Ok((before - data.attempts.len()) as u64)
    }

    async fn insert_revoked(&self, token: &RevokedToken) -> Result<(), WardenError> {
        self.data.lock().revoked
            .entry(token.fingerprint.clone())
            .or_insert_with(|| token.clone());
        Ok(())
    }

    async fn is_revoked(&self, fingerprint: &str) -> Result<bool, WardenError> {
        Ok(self.data.lock().revoked.contains_key(fingerprint))
    }

    async fn purge_revoked(&self, now: DateTime) -> Result<u64, WardenError> {
        let mut data = self.data.lock();
        let before = data.revoked.len();
        data.revoked.retain(|_, token| token.expires_at > now);
        Ok((before - data.revoked.len()) as u64)
    }

    async fn delete_revoked_for_account(&self, account_id: &str) -> Result<u64, WardenError> {
        let mut data = self.data.lock();
        let before = data.revoked.len();
        data.revoked.retain(|_, token| token.account_id != account_id);
        Ok((before - data.revoked.len()) as u64)
    }

    async fn replace_reset_token(&self, token: &ResetToken) -> Result<(), WardenError> {
        let mut data = self.data.lock();
        data.resets.retain(|existing| existing.account_id != token.account_id || existing.used_at.is_some());
        data.resets.push(token.clone());
        Ok(())
    }

    async fn redeem_reset_token(&self, secret_hash: &str, now: DateTime) -> Result<Option<ResetToken>, WardenError> {
        let mut data = self.data.lock();

        Ok(data.resets
            .iter_mut()
            .find(|token| token.secret_hash == secret_hash && token.is_redeemable(now))
            .map(|token| {
                token.used_at = Some(now);
                token.clone()
            }))
    }

    async fn delete_reset_tokens(&self, account_id: &str) -> Result<u64, WardenError> {
        let mut data = self.data.lock();
        let before = data.resets.len();
        data.resets.retain(|token| token.account_id != account_id);
        Ok((before - data.resets.len()) as u64)
    }
}
