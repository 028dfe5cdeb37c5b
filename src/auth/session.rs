use std::sync::Arc;
use chrono::{DateTime, TimeZone, Utc};
use crate::db::Store;
use crate::model::{account::{Account, AccountStatus}, attempt::FailureReason, claims::TokenClaims, revocation::RevocationReason};
use crate::utils::{errors::{ErrorCode, WardenError}, secrets};
use super::{credentials::{CredentialStore, Verification}, revocation::RevocationRegistry, throttle::{Gate, LoginThrottle}, token::{IssuedToken, TokenIssuer}, validator::TokenValidator};

///
/// The caller's identity for the duration of one request. It is produced by authenticate and
/// handed explicitly to the operations that need it.
///
#[derive(Clone, Debug)]
pub struct AuthContext {
    claims: TokenClaims,
    token: String,
}

impl AuthContext {
    pub fn account_id(&self) -> &str {
        &self.claims.sub
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    ///
    /// For operations that can only run on behalf of a signed-in caller.
    ///
    pub fn require(auth: Option<AuthContext>) -> Result<AuthContext, WardenError> {
        auth.ok_or_else(|| ErrorCode::NotAuthenticated.with_msg("A valid session token is required"))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub account_id: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

///
/// Login, logout and session introspection.
///
pub struct SessionService {
    store: Arc<dyn Store>,
    throttle: LoginThrottle,
    credentials: Arc<CredentialStore>,
    issuer: TokenIssuer,
    validator: TokenValidator,
    registry: Arc<RevocationRegistry>,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn Store>,
        throttle: LoginThrottle,
        credentials: Arc<CredentialStore>,
        issuer: TokenIssuer,
        validator: TokenValidator,
        registry: Arc<RevocationRegistry>) -> Self {

        SessionService { store, throttle, credentials, issuer, validator, registry }
    }

    ///
    /// Verify the credentials and return the account. Every failure except a lock is reported as
    /// InvalidCredentials - the real reason only goes to the attempt log.
    ///
    pub async fn login(&self, identifier: &str, secret: &str, origin: &str) -> Result<Account, WardenError> {
        let email = secrets::normalize_email(identifier);

        let account = match self.store.find_account_by_email(&email).await {
            Ok(Some(account)) => account,
            Ok(None) => return Err(self.deny(&email, None, origin, FailureReason::UserNotFound).await),
            Err(err) => {
                self.throttle.log_attempt(&email, None, origin, Err(FailureReason::SystemError)).await;
                return Err(err)
            },
        };

        let account_id = account.account_id.as_str();

        if let Gate::Locked { until } = self.throttle.check(&account) {
            self.throttle.log_attempt(&email, Some(account_id), origin, Err(FailureReason::AccountLocked)).await;
            tracing::info!("Login refused for locked account {} (locked until {})", account_id, until);
            return Err(ErrorCode::AccountLocked.with_msg("The account is temporarily locked"))
        }

        if account.status != AccountStatus::Active {
            return Err(self.deny(&email, Some(account_id), origin, FailureReason::AccountNotActive).await)
        }

        match self.credentials.verify(account_id, secret).await {
            Ok(Verification::Match) => {},
            Ok(Verification::Mismatch) => {
                self.throttle.record_failure(account_id).await?;
                return Err(self.deny(&email, Some(account_id), origin, FailureReason::InvalidPassword).await)
            },
            Ok(Verification::NoCredential) => {
                return Err(self.deny(&email, Some(account_id), origin, FailureReason::NoCredential).await)
            },
            Err(err) => {
                self.throttle.log_attempt(&email, Some(account_id), origin, Err(FailureReason::SystemError)).await;
                return Err(err)
            },
        }

        self.throttle.record_success(account_id, origin).await?;
        self.throttle.log_attempt(&email, Some(account_id), origin, Ok(())).await;
        tracing::info!("Account {} logged in from {}", account_id, origin);

        // Reflect the reset throttle state without a second round-trip.
        let mut account = account;
        account.failed_login_count = 0;
        account.locked_until = None;
        Ok(account)
    }

    async fn deny(&self, email: &str, account_id: Option<&str>, origin: &str, reason: FailureReason) -> WardenError {
        self.throttle.log_attempt(email, account_id, origin, Err(reason)).await;
        tracing::info!("Login failed for {}: {}", email, reason);
        ErrorCode::InvalidCredentials.with_msg("Invalid email or password")
    }

    pub fn issue(&self, account: &Account) -> Result<IssuedToken, WardenError> {
        self.issuer.issue(account)
    }

    ///
    /// Run the full validation chain and wrap the claims for downstream operations.
    ///
    pub async fn authenticate(&self, token: &str) -> Result<AuthContext, WardenError> {
        let claims = self.validator.validate(token).await?;
        Ok(AuthContext { claims, token: token.to_string() })
    }

    ///
    /// End this session only. Other sessions for the account are unaffected.
    ///
    pub async fn logout(&self, auth: &AuthContext) -> Result<(), WardenError> {
        self.registry.revoke(auth.token(), auth.account_id(), auth.claims.exp, RevocationReason::Logout).await?;
        tracing::info!("Account {} logged out", auth.account_id());
        Ok(())
    }

    ///
    /// End every session issued to the account so far, including this one.
    ///
    pub async fn logout_all(&self, auth: &AuthContext) -> Result<u64, WardenError> {
        let generation = self.registry.bump_generation(auth.account_id()).await?;
        tracing::info!("Account {} logged out of all sessions", auth.account_id());
        Ok(generation)
    }

    ///
    /// Coarse session introspection. Why a token is rejected is never revealed; only a broken
    /// store is reported as an error.
    ///
    pub async fn session_status(&self, token: Option<&str>) -> Result<SessionStatus, WardenError> {
        let token = match token {
            Some(token) => token,
            None => return Ok(SessionStatus::default()),
        };

        match self.validator.validate(token).await {
            Ok(claims) => Ok(SessionStatus {
                authenticated: true,
                account_id: Some(claims.sub),
                issued_at: Some(Utc.timestamp(claims.iat, 0)),
                expires_at: Some(Utc.timestamp(claims.exp, 0)),
            }),
            Err(err) if err.is_internal() => Err(err),
            Err(_) => Ok(SessionStatus::default()),
        }
    }
}
