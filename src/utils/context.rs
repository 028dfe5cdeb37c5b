use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use crate::auth::{accounts::AccountService, credentials::CredentialStore, reset::{PasswordResetFlow, ResetSettings}, revocation::RevocationRegistry, session::SessionService, throttle::LoginThrottle, token::{SigningKey, TokenIssuer}, validator::TokenValidator};
use crate::db::Store;
use crate::model::algorithm::argon::ArgonPolicy;
use crate::utils::{config::{Configuration, MailerKind}, mailer::{LogMailer, Mailer, OutboxMailer}, time_provider::TimeProvider};

///
/// The context is available to all gRPC service endpoints and gives them access to the store, the
/// auth services, the clock, etc.
///
pub struct ServiceContext {
    store: Arc<dyn Store>,
    time_provider: Arc<TimeProvider>,
    sessions: SessionService,
    resets: PasswordResetFlow,
    accounts: AccountService,
    registry: Arc<RevocationRegistry>,
    outbox: Option<Arc<OutboxMailer>>,
}

impl ServiceContext {
    pub fn new(config: &Configuration, store: Arc<dyn Store>) -> Self {
        let clock = Arc::new(TimeProvider::default());
        let key = Arc::new(SigningKey::from_config(config));
        let registry = Arc::new(RevocationRegistry::new(store.clone(), clock.clone()));
        let credentials = Arc::new(CredentialStore::new(store.clone(), clock.clone(), ArgonPolicy::from(config)));

        let outbox = match config.mailer {
            MailerKind::Outbox => Some(Arc::new(OutboxMailer::default())),
            MailerKind::Log => None,
        };

        let mailer: Arc<dyn Mailer> = match &outbox {
            Some(outbox) => outbox.clone(),
            None => Arc::new(LogMailer),
        };

        let sessions = SessionService::new(
            store.clone(),
            LoginThrottle::from_config(store.clone(), clock.clone(), config),
            credentials.clone(),
            TokenIssuer::new(key.clone(), clock.clone(), Duration::seconds(config.token_lifetime_seconds as i64)),
            TokenValidator::new(key, registry.clone(), clock.clone()),
            registry.clone());

        let resets = PasswordResetFlow::new(
            store.clone(),
            credentials.clone(),
            registry.clone(),
            mailer.clone(),
            clock.clone(),
            ResetSettings {
                lifetime: Duration::seconds(config.reset_token_lifetime_seconds as i64),
                revoke_sessions: config.revoke_sessions_on_reset,
                frontend_url: config.frontend_url.clone(),
            });

        let accounts = AccountService::new(
            store.clone(),
            credentials,
            registry.clone(),
            mailer,
            clock.clone(),
            Duration::seconds(config.verification_token_lifetime_seconds as i64),
            &config.frontend_url);

        ServiceContext {
            store,
            time_provider: clock,
            sessions,
            resets,
            accounts,
            registry,
            outbox,
        }
    }

    ///
    /// Set or clear the fixed time. Every auth service shares this clock.
    ///
    pub fn set_now(&self, now: Option<DateTime<Utc>>) {
        self.time_provider.fix(now);
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    pub fn resets(&self) -> &PasswordResetFlow {
        &self.resets
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    pub fn registry(&self) -> &Arc<RevocationRegistry> {
        &self.registry
    }

    ///
    /// Only present when the outbox mailer is configured.
    ///
    pub fn outbox(&self) -> Option<&Arc<OutboxMailer>> {
        self.outbox.as_ref()
    }
}
