use std::sync::Arc;
use crate::auth::{revocation::RevocationRegistry, token::{self, SigningKey}};
use crate::model::claims::TokenClaims;
use crate::utils::{errors::{ErrorCode, WardenError}, time_provider::TimeProvider};

///
/// Decides whether a presented token is still good. The checks short-circuit in this order:
///
/// 1. structure and signature (no I/O)
/// 2. expiry (no I/O)
/// 3. the blacklist
/// 4. the account's token generation
///
/// A store failure in 3 or 4 is returned as an internal error, never as a rejection.
///
pub struct TokenValidator {
    key: Arc<SigningKey>,
    registry: Arc<RevocationRegistry>,
    clock: Arc<TimeProvider>,
}

impl TokenValidator {
    pub fn new(key: Arc<SigningKey>, registry: Arc<RevocationRegistry>, clock: Arc<TimeProvider>) -> Self {
        TokenValidator { key, registry, clock }
    }

    pub async fn validate(&self, token: &str) -> Result<TokenClaims, WardenError> {
        let claims = token::decode(&self.key, token)
            .map_err(log_rejection)?;

        if claims.exp <= self.clock.now().timestamp() {
            return Err(log_rejection(ErrorCode::TokenExpired.with_msg("The token has expired")))
        }

        if self.registry.is_revoked(&token::fingerprint(token)).await? {
            return Err(log_rejection(ErrorCode::TokenRevoked.with_msg("The token has been revoked")))
        }

        match self.registry.current_generation(&claims.sub).await? {
            Some(generation) if generation == claims.token_generation => Ok(claims),
            Some(_) => Err(log_rejection(ErrorCode::TokenSuperseded.with_msg("The token belongs to an earlier generation"))),
            None => Err(log_rejection(ErrorCode::TokenSuperseded.with_msg("The token's account no longer exists"))),
        }
    }
}

fn log_rejection(err: WardenError) -> WardenError {
    tracing::debug!("Token rejected: {}", err);
    err
}

///
/// Pull the token out of an 'authorization' header value. Anything other than a non-empty
/// bearer token is treated as no token at all.
///
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let header = header?.trim();
    let (scheme, token) = header.split_at(header.find(' ')?);

    match scheme.eq_ignore_ascii_case("bearer") {
        true => Some(token.trim()).filter(|token| !token.is_empty()),
        false => None,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::auth::{fixtures, token::TokenIssuer};
    use crate::db::Store;
    use crate::model::{account::{Account, AccountStatus}, revocation::RevocationReason};

    struct Harness {
        store: Arc<dyn Store>,
        clock: Arc<TimeProvider>,
        issuer: TokenIssuer,
        registry: Arc<RevocationRegistry>,
        validator: TokenValidator,
        account: Account,
    }

    async fn harness() -> Result<Harness, WardenError> {
        let (store, clock) = (fixtures::store(), fixtures::clock());
        let key = Arc::new(SigningKey::new(b"validator-tests"));
        let registry = Arc::new(RevocationRegistry::new(store.clone(), clock.clone()));
        let account = fixtures::account(&store, &clock, "a@test", AccountStatus::Active).await?;

        Ok(Harness {
            issuer: TokenIssuer::new(key.clone(), clock.clone(), Duration::hours(1)),
            validator: TokenValidator::new(key, registry.clone(), clock.clone()),
            store,
            clock,
            registry,
            account,
        })
    }

    #[tokio::test]
    async fn test_fresh_token_is_valid() -> Result<(), WardenError> {
        let h = harness().await?;
        let issued = h.issuer.issue(&h.account)?;

        assert_eq!(h.validator.validate(&issued.token).await?, issued.claims);
        Ok(())
    }

    #[tokio::test]
    async fn test_token_expires_at_exp() -> Result<(), WardenError> {
        let h = harness().await?;
        let issued = h.issuer.issue(&h.account)?;

        h.clock.advance(Duration::minutes(59));
        assert!(h.validator.validate(&issued.token).await.is_ok());

        h.clock.advance(Duration::minutes(1));
        assert_eq!(h.validator.validate(&issued.token).await.unwrap_err().error_code(), ErrorCode::TokenExpired);
        Ok(())
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected() -> Result<(), WardenError> {
        let h = harness().await?;
        let revoked = h.issuer.issue(&h.account)?;
        let other = h.issuer.issue(&h.account)?;

        h.registry.revoke(&revoked.token, &h.account.account_id, revoked.claims.exp, RevocationReason::Logout).await?;

        assert_eq!(h.validator.validate(&revoked.token).await.unwrap_err().error_code(), ErrorCode::TokenRevoked);
        assert!(h.validator.validate(&other.token).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_generation_bump_supersedes_older_tokens() -> Result<(), WardenError> {
        let h = harness().await?;
        let old = h.issuer.issue(&h.account)?;

        h.registry.bump_generation(&h.account.account_id).await?;
        assert_eq!(h.validator.validate(&old.token).await.unwrap_err().error_code(), ErrorCode::TokenSuperseded);

        let account = h.store.load_account(&h.account.account_id).await?.unwrap();
        let new = h.issuer.issue(&account)?;
        assert!(h.validator.validate(&new.token).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_account_supersedes_tokens() -> Result<(), WardenError> {
        let h = harness().await?;
        let issued = h.issuer.issue(&h.account)?;

        h.store.delete_account(&h.account.account_id).await?;
        assert_eq!(h.validator.validate(&issued.token).await.unwrap_err().error_code(), ErrorCode::TokenSuperseded);
        Ok(())
    }

    #[tokio::test]
    async fn test_expiry_is_checked_before_the_blacklist() -> Result<(), WardenError> {
        let h = harness().await?;
        let issued = h.issuer.issue(&h.account)?;

        h.registry.revoke(&issued.token, &h.account.account_id, issued.claims.exp, RevocationReason::Logout).await?;
        h.clock.advance(Duration::hours(2));

        assert_eq!(h.validator.validate(&issued.token).await.unwrap_err().error_code(), ErrorCode::TokenExpired);
        Ok(())
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(Some("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("BEARER   abc  ")), Some("abc"));
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Bearer")), None);
        assert_eq!(bearer_token(Some("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(Some("")), None);
        assert_eq!(bearer_token(None), None);
    }
}
