use std::sync::Arc;
use sha2::Sha256;
use hmac::{Hmac, Mac};
use chrono::Duration;
use rand_core::{OsRng, RngCore};
use serde::{Serialize, de::DeserializeOwned};
use crate::model::{account::Account, claims::{TokenClaims, TokenHeader}};
use crate::utils::{config::Configuration, errors::{ErrorCode, WardenError}, secrets, time_provider::TimeProvider};

type HmacSha256 = Hmac<Sha256>;

const KEY_BYTES: usize = 32;

///
/// The process-wide HMAC key that every session token is signed with.
///
pub struct SigningKey {
    key: Vec<u8>,
}

impl SigningKey {
    pub fn new(key: &[u8]) -> Self {
        SigningKey { key: key.to_vec() }
    }

    ///
    /// Use the configured secret, or a random per-process key. A random key means tokens do not
    /// survive a restart and cannot be shared between instances.
    ///
    pub fn from_config(config: &Configuration) -> Self {
        match &config.token_secret {
            Some(secret) if !secret.is_empty() => Self::new(secret.as_bytes()),
            _ => {
                tracing::warn!("No TOKEN_SECRET configured - using a random signing key");
                let mut key = [0u8; KEY_BYTES];
                OsRng.fill_bytes(&mut key);
                Self::new(&key)
            },
        }
    }

    fn mac(&self) -> Result<HmacSha256, WardenError> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|err| ErrorCode::TokenSigningError.with_msg(&format!("Invalid signing key: {}", err)))
    }

    fn sign(&self, input: &str) -> Result<Vec<u8>, WardenError> {
        let mut mac = self.mac()?;
        mac.update(input.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn verify(&self, input: &str, signature: &[u8]) -> Result<bool, WardenError> {
        let mut mac = self.mac()?;
        mac.update(input.as_bytes());
        Ok(mac.verify_slice(signature).is_ok())
    }
}

///
/// A freshly minted token and the claims inside it.
///
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

///
/// Mints session tokens. Issuing has no side effects - revocation state is never touched here.
///
pub struct TokenIssuer {
    key: Arc<SigningKey>,
    clock: Arc<TimeProvider>,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(key: Arc<SigningKey>, clock: Arc<TimeProvider>, lifetime: Duration) -> Self {
        TokenIssuer { key, clock, lifetime }
    }

    ///
    /// The account's current generation is embedded so a later logout-all can supersede the token.
    ///
    pub fn issue(&self, account: &Account) -> Result<IssuedToken, WardenError> {
        let iat = self.clock.now().timestamp();

        let claims = TokenClaims {
            sub: account.account_id.clone(),
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            status: account.status,
            token_generation: account.token_generation,
            iat,
            exp: iat + self.lifetime.num_seconds(),
            jti: crate::utils::generate_id(),
        };

        let token = encode(&self.key, &claims)?;
        Ok(IssuedToken { token, claims })
    }
}

///
/// The blacklist key for a token. The raw token is never persisted.
///
pub fn fingerprint(token: &str) -> String {
    secrets::digest(token)
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, WardenError> {
    let json = serde_json::to_vec(value)?;
    Ok(base64::encode_config(json, base64::URL_SAFE_NO_PAD))
}

fn b64d_json<T: DeserializeOwned>(part: &str) -> Result<T, WardenError> {
    let bytes = base64::decode_config(part, base64::URL_SAFE_NO_PAD)
        .map_err(|_| ErrorCode::TokenMalformed.with_msg("Token is not base64url encoded"))?;

    serde_json::from_slice(&bytes)
        .map_err(|err| ErrorCode::TokenMalformed.with_msg(&format!("Token json is invalid: {}", err)))
}

///
/// Assemble a compact HS256 JWT: header.claims.signature
///
pub fn encode(key: &SigningKey, claims: &TokenClaims) -> Result<String, WardenError> {
    let signing_input = format!("{}.{}", b64e_json(&TokenHeader::hs256())?, b64e_json(claims)?);
    let signature = base64::encode_config(key.sign(&signing_input)?, base64::URL_SAFE_NO_PAD);
    Ok(format!("{}.{}", signing_input, signature))
}

///
/// Check the structure and signature of a token and return its claims. Expiry is not checked here.
///
pub fn decode(key: &SigningKey, token: &str) -> Result<TokenClaims, WardenError> {
    let mut parts = token.split('.');
    let (header_b64, claims_b64, signature_b64) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(claims), Some(signature), None) => (header, claims, signature),
        _ => return Err(ErrorCode::TokenMalformed.with_msg("Token does not have three parts")),
    };

    let header: TokenHeader = b64d_json(header_b64)?;
    if header.alg != "HS256" {
        return Err(ErrorCode::TokenMalformed.with_msg(&format!("Unsupported token algorithm {}", header.alg)))
    }

    let signature = base64::decode_config(signature_b64, base64::URL_SAFE_NO_PAD)
        .map_err(|_| ErrorCode::TokenMalformed.with_msg("Token signature is not base64url encoded"))?;

    if !key.verify(&format!("{}.{}", header_b64, claims_b64), &signature)? {
        return Err(ErrorCode::TokenBadSignature.with_msg("Token signature does not match"))
    }

    b64d_json(claims_b64)
}
