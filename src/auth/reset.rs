use std::sync::Arc;
use bson::DateTime;
use chrono::Duration;
use crate::db::Store;
use crate::model::reset::ResetToken;
use crate::utils::{errors::{ErrorCode, WardenError}, mailer::{self, Mail, Mailer}, secrets, time_provider::TimeProvider};
use super::{credentials::CredentialStore, revocation::RevocationRegistry};

const RESET_PATH: &str = "reset-password";

///
/// Issues and redeems single-use, time-boxed password reset links.
///
pub struct PasswordResetFlow {
    store: Arc<dyn Store>,
    credentials: Arc<CredentialStore>,
    registry: Arc<RevocationRegistry>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<TimeProvider>,
    lifetime: Duration,
    revoke_sessions: bool,
    frontend_url: String,
}

pub struct ResetSettings {
    pub lifetime: Duration,
    pub revoke_sessions: bool,
    pub frontend_url: String,
}

impl PasswordResetFlow {
    pub fn new(
        store: Arc<dyn Store>,
        credentials: Arc<CredentialStore>,
        registry: Arc<RevocationRegistry>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<TimeProvider>,
        settings: ResetSettings) -> Self {

        PasswordResetFlow {
            store,
            credentials,
            registry,
            mailer,
            clock,
            lifetime: settings.lifetime,
            revoke_sessions: settings.revoke_sessions,
            frontend_url: settings.frontend_url,
        }
    }

    ///
    /// Start a reset. The outcome is identical whether or not the email belongs to an account,
    /// so nothing can be learned about which addresses are registered.
    ///
    pub async fn request(&self, identifier: &str, origin: &str) -> Result<(), WardenError> {
        let email = secrets::normalize_email(identifier);

        let account = match self.store.find_account_by_email(&email).await? {
            Some(account) => account,
            None => {
                tracing::info!("Password reset requested for unknown email {}", email);
                return Ok(())
            },
        };

        let secret = secrets::generate_secret();
        let now = self.clock.now();

        self.store.replace_reset_token(&ResetToken {
            account_id: account.account_id.clone(),
            secret_hash: secrets::digest(&secret),
            expires_at: DateTime::from_chrono(now + self.lifetime),
            used_at: None,
            origin: origin.to_string(),
            created_at: DateTime::from_chrono(now),
        }).await?;

        let link = secrets::build_link(&self.frontend_url, RESET_PATH, &secret);
        mailer::dispatch(self.mailer.clone(), Mail {
            to: account.email.clone(),
            subject: "Reset your password".to_string(),
            body: format!("Hello {},\n\nUse the link below to choose a new password. It expires in {} minutes.\n\n{}\n",
                account.display_name(), self.lifetime.num_minutes(), link),
        });

        tracing::info!("Password reset issued for account {}", account.account_id);
        Ok(())
    }

    ///
    /// Redeem a reset secret. Unknown, expired and already used secrets are all ResetTokenInvalid.
    ///
    /// The new password is hashed before the secret is claimed, so a hashing failure leaves the
    /// link usable.
    ///
    pub async fn redeem(&self, secret: &str, new_password: &str) -> Result<(), WardenError> {
        let phc = self.credentials.hash(new_password).await?;
        let now = DateTime::from_chrono(self.clock.now());

        let token = self.store.redeem_reset_token(&secrets::digest(secret.trim()), now)
            .await?
            .ok_or_else(|| ErrorCode::ResetTokenInvalid.with_msg("The reset link is invalid or has expired"))?;

        self.credentials.store_hash(&token.account_id, phc).await?;

        if self.revoke_sessions {
            match self.registry.bump_generation(&token.account_id).await {
                Ok(_) => {},
                Err(err) if err.error_code() == ErrorCode::AccountNotFound => {},
                Err(err) => return Err(err),
            }
        }

        tracing::info!("Password reset completed for account {}", token.account_id);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{credentials::Verification, fixtures};
    use crate::model::account::AccountStatus;
    use crate::utils::mailer::OutboxMailer;

    struct Harness {
        store: Arc<dyn Store>,
        clock: Arc<TimeProvider>,
        outbox: Arc<OutboxMailer>,
        credentials: Arc<CredentialStore>,
        flow: PasswordResetFlow,
    }

    fn harness(revoke_sessions: bool) -> Harness {
        harness_with(fixtures::store(), revoke_sessions)
    }

    fn harness_with(store: Arc<dyn Store>, revoke_sessions: bool) -> Harness {
        let clock = fixtures::clock();
        let outbox = Arc::new(OutboxMailer::default());
        let credentials = fixtures::credentials(&store, &clock);

        let flow = PasswordResetFlow::new(
            store.clone(),
            credentials.clone(),
            Arc::new(RevocationRegistry::new(store.clone(), clock.clone())),
            outbox.clone(),
            clock.clone(),
            ResetSettings { lifetime: Duration::hours(1), revoke_sessions, frontend_url: "http://app.test".into() });

        Harness { store, clock, outbox, credentials, flow }
    }

    ///
    /// Delivery is spawned, so give it a chance to run.
    ///
    async fn secret_sent_to(outbox: &OutboxMailer, email: &str) -> String {
        for _ in 0..100 {
            if let Some(mail) = outbox.messages_for(email).last() {
                let link = mail.body.lines().find(|line| line.contains("token=")).unwrap_or_default();
                return link.split("token=").nth(1).unwrap_or_default().trim().to_string()
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("No mail sent to {}", email);
    }

    #[tokio::test]
    async fn test_unknown_email_succeeds_without_a_record() -> Result<(), WardenError> {
        let h = harness(true);

        h.flow.request("ghost@nowhere.test", "10.0.0.1").await?;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert!(h.outbox.messages_for("ghost@nowhere.test").is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_replaces_the_password_once() -> Result<(), WardenError> {
        let h = harness(true);
        let account = fixtures::account(&h.store, &h.clock, "ada@test", AccountStatus::Active).await?;

        h.flow.request("Ada@Test", "10.0.0.1").await?;
        let secret = secret_sent_to(&h.outbox, "ada@test").await;

        h.flow.redeem(&secret, "Brand-New-Pass-1").await?;
        assert_eq!(h.credentials.verify(&account.account_id, "Brand-New-Pass-1").await?, Verification::Match);
        assert_eq!(h.credentials.verify(&account.account_id, fixtures::PASSWORD).await?, Verification::Mismatch);

        let err = h.flow.redeem(&secret, "Another-Pass-2").await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::ResetTokenInvalid);
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_link_expires_after_an_hour() -> Result<(), WardenError> {
        let h = harness(true);
        fixtures::account(&h.store, &h.clock, "ada@test", AccountStatus::Active).await?;

        h.flow.request("ada@test", "10.0.0.1").await?;
        let secret = secret_sent_to(&h.outbox, "ada@test").await;

        h.clock.advance(Duration::hours(1));
        assert_eq!(h.flow.redeem(&secret, "Brand-New-Pass-1").await.unwrap_err().error_code(), ErrorCode::ResetTokenInvalid);
        Ok(())
    }

    #[tokio::test]
    async fn test_new_request_invalidates_the_previous_link() -> Result<(), WardenError> {
        let h = harness(true);
        fixtures::account(&h.store, &h.clock, "ada@test", AccountStatus::Active).await?;

        h.flow.request("ada@test", "10.0.0.1").await?;
        let first = secret_sent_to(&h.outbox, "ada@test").await;

        h.flow.request("ada@test", "10.0.0.1").await?;
        for _ in 0..100 {
            if h.outbox.messages_for("ada@test").len() == 2 {
                break
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let second = secret_sent_to(&h.outbox, "ada@test").await;

        assert_ne!(first, second);
        assert_eq!(h.flow.redeem(&first, "Brand-New-Pass-1").await.unwrap_err().error_code(), ErrorCode::ResetTokenInvalid);
        h.flow.redeem(&second, "Brand-New-Pass-1").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_bumps_the_generation_when_enabled() -> Result<(), WardenError> {
        for (revoke_sessions, expected) in &[(true, 2), (false, 1)] {
            let h = harness(*revoke_sessions);
            let account = fixtures::account(&h.store, &h.clock, "ada@test", AccountStatus::Active).await?;

            h.flow.request("ada@test", "10.0.0.1").await?;
            let secret = secret_sent_to(&h.outbox, "ada@test").await;
            h.flow.redeem(&secret, "Brand-New-Pass-1").await?;

            let account = h.store.load_account(&account.account_id).await?.unwrap();
            assert_eq!(account.token_generation, *expected);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_hash_leaves_the_link_usable() -> Result<(), WardenError> {
        let h = harness(true);
        let account = fixtures::account(&h.store, &h.clock, "ada@test", AccountStatus::Active).await?;

        h.flow.request("ada@test", "10.0.0.1").await?;
        let secret = secret_sent_to(&h.outbox, "ada@test").await;

        let broken = PasswordResetFlow::new(
            h.store.clone(),
            Arc::new(CredentialStore::new(h.store.clone(), h.clock.clone(), fixtures::broken_argon())),
            Arc::new(RevocationRegistry::new(h.store.clone(), h.clock.clone())),
            h.outbox.clone(),
            h.clock.clone(),
            ResetSettings { lifetime: Duration::hours(1), revoke_sessions: true, frontend_url: "http://app.test".into() });

        let err = broken.redeem(&secret, "Brand-New-Pass-1").await.unwrap_err();
        assert!(err.is_internal());
        assert_eq!(h.credentials.verify(&account.account_id, fixtures::PASSWORD).await?, Verification::Match);

        h.flow.redeem(&secret, "Brand-New-Pass-1").await?;
        assert_eq!(h.credentials.verify(&account.account_id, "Brand-New-Pass-1").await?, Verification::Match);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_redemptions_have_one_winner() -> Result<(), WardenError> {
        let h = harness(true);
        let account = fixtures::account(&h.store, &h.clock, "ada@test", AccountStatus::Active).await?;

        h.flow.request("ada@test", "10.0.0.1").await?;
        let secret = secret_sent_to(&h.outbox, "ada@test").await;

        let results = futures::future::join_all(vec!(
            h.flow.redeem(&secret, "First-New-Pass-1"),
            h.flow.redeem(&secret, "Second-New-Pass-2"),
        )).await;

        assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
        let loser = results.into_iter().find_map(Result::err).unwrap();
        assert_eq!(loser.error_code(), ErrorCode::ResetTokenInvalid);

        let first = h.credentials.verify(&account.account_id, "First-New-Pass-1").await?;
        let second = h.credentials.verify(&account.account_id, "Second-New-Pass-2").await?;
        assert_ne!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn test_storage_failure_on_redeem_is_internal() -> Result<(), WardenError> {
        let h = harness_with(fixtures::FaultyStore::failing(&["redeem_reset_token"]), true);

        let err = h.flow.redeem("any-secret", "Brand-New-Pass-1").await.unwrap_err();
        assert!(err.is_internal());
        Ok(())
    }
}
