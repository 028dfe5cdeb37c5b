use std::sync::Arc;
use bson::DateTime;
use chrono::Duration;
use crate::db::Store;
use crate::model::{account::Account, attempt::{FailureReason, LoginAttempt}};
use crate::utils::{config::Configuration, errors::WardenError, time_provider::TimeProvider};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gate {
    Permit,
    Locked { until: chrono::DateTime<chrono::Utc> },
}

///
/// Brute-force protection. Consecutive failures are counted on the account and once
/// max_failures is reached the account is locked for the lockout period.
///
/// The counter is only ever reset by a successful login, so once a lock expires the very next
/// failure locks the account again.
///
pub struct LoginThrottle {
    store: Arc<dyn Store>,
    clock: Arc<TimeProvider>,
    max_failures: u32,
    lockout: Duration,
}

impl LoginThrottle {
    pub fn new(store: Arc<dyn Store>, clock: Arc<TimeProvider>, max_failures: u32, lockout: Duration) -> Self {
        LoginThrottle { store, clock, max_failures, lockout }
    }

    pub fn from_config(store: Arc<dyn Store>, clock: Arc<TimeProvider>, config: &Configuration) -> Self {
        Self::new(store, clock, config.max_failed_logins, Duration::seconds(config.lockout_seconds as i64))
    }

    ///
    /// A locked account must be rejected before its credential is even looked at.
    ///
    pub fn check(&self, account: &Account) -> Gate {
        let now = DateTime::from_chrono(self.clock.now());

        match account.locked_until {
            Some(until) if account.is_locked(now) => Gate::Locked { until: until.to_chrono() },
            _ => Gate::Permit,
        }
    }

    ///
    /// Count a failed password and lock the account if that was one too many.
    ///
    pub async fn record_failure(&self, account_id: &str) -> Result<Option<Account>, WardenError> {
        let now = self.clock.now();
        let lock_until = DateTime::from_chrono(now + self.lockout);

        let account = self.store.record_login_failure(account_id, self.max_failures, lock_until, DateTime::from_chrono(now)).await?;

        if let Some(account) = &account {
            if account.locked_until == Some(lock_until) {
                tracing::warn!("Account {} locked until {} after {} failed logins", account_id, lock_until.to_chrono(), account.failed_login_count);
            }
        }

        Ok(account)
    }

    pub async fn record_success(&self, account_id: &str, origin: &str) -> Result<(), WardenError> {
        self.store.record_login_success(account_id, origin, DateTime::from_chrono(self.clock.now())).await
    }

    ///
    /// Append to the login audit trail. This is best-effort: a failure here is logged and must
    /// never change the outcome of the login.
    ///
    pub async fn log_attempt(&self, identifier: &str, account_id: Option<&str>, origin: &str, outcome: Result<(), FailureReason>) {
        let attempt = LoginAttempt::new(identifier, account_id, origin, outcome, DateTime::from_chrono(self.clock.now()));

        if let Err(err) = self.store.append_attempt(&attempt).await {
            tracing::warn!("Unable to record login attempt for {}: {}", identifier, err);
        }
    }
}
