use std::sync::Arc;
use bson::DateTime;
use chrono::{TimeZone, Utc};
use crate::db::Store;
use crate::auth::token;
use crate::model::revocation::{RevocationReason, RevokedToken};
use crate::utils::{errors::{ErrorCode, WardenError}, time_provider::TimeProvider};

///
/// Two independent ways of killing tokens:
///
/// - the blacklist, which kills one token by fingerprint until that token would have expired anyway.
/// - the per-account generation counter, which kills every token issued before the bump.
///
pub struct RevocationRegistry {
    store: Arc<dyn Store>,
    clock: Arc<TimeProvider>,
}

impl RevocationRegistry {
    pub fn new(store: Arc<dyn Store>, clock: Arc<TimeProvider>) -> Self {
        RevocationRegistry { store, clock }
    }

    ///
    /// Blacklist a single token. Revoking an already revoked token is a no-op.
    ///
    pub async fn revoke(&self, token: &str, account_id: &str, expires_at: i64, reason: RevocationReason) -> Result<(), WardenError> {
        let entry = RevokedToken {
            fingerprint: token::fingerprint(token),
            account_id: account_id.to_string(),
            expires_at: DateTime::from_chrono(Utc.timestamp(expires_at, 0)),
            reason,
            revoked_at: DateTime::from_chrono(self.clock.now()),
        };

        self.store.insert_revoked(&entry).await?;
        tracing::debug!("Token {} revoked for account {} ({})", entry.fingerprint, account_id, reason);
        Ok(())
    }

    pub async fn is_revoked(&self, fingerprint: &str) -> Result<bool, WardenError> {
        self.store.is_revoked(fingerprint).await
    }

    ///
    /// Invalidate every token issued to the account so far. Returns the new generation.
    ///
    pub async fn bump_generation(&self, account_id: &str) -> Result<u64, WardenError> {
        match self.store.bump_generation(account_id, DateTime::from_chrono(self.clock.now())).await? {
            Some(generation) => {
                tracing::info!("Account {} moved to token generation {}", account_id, generation);
                Ok(generation)
            },
            None => Err(ErrorCode::AccountNotFound.with_msg("The account does not exist")),
        }
    }

    ///
    /// None if the account no longer exists.
    ///
    pub async fn current_generation(&self, account_id: &str) -> Result<Option<u64>, WardenError> {
        Ok(self.store.load_account(account_id).await?.map(|account| account.token_generation))
    }

    ///
    /// Drop blacklist entries for tokens that have expired on their own.
    ///
    pub async fn sweep(&self) -> Result<u64, WardenError> {
        let purged = self.store.purge_revoked(DateTime::from_chrono(self.clock.now())).await?;
        if purged > 0 {
            tracing::info!("Purged {} expired revoked tokens", purged);
        }
        Ok(purged)
    }
}

///
/// Run the sweep forever on the given interval.
///
pub async fn sweep_periodically(registry: Arc<RevocationRegistry>, every: std::time::Duration) {
    let mut interval = tokio::time::interval(every);
    interval.tick().await; // The first tick is immediate.

    loop {
        interval.tick().await;
        if let Err(err) = registry.sweep().await {
            tracing::error!("Unable to sweep revoked tokens: {}", err);
        }
    }
}
