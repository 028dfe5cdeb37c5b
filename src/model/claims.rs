use serde::{Deserialize, Serialize};
use super::account::{AccountStatus, FIRST_GENERATION};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl TokenHeader {
    pub fn hs256() -> Self {
        TokenHeader { alg: "HS256".to_string(), typ: "JWT".to_string() }
    }
}

///
/// The identity carried inside a session token. iat and exp are epoch seconds.
///
/// Tokens minted before generations existed carry no tokenGeneration and are treated as the
/// first generation.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub sub: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub status: AccountStatus,
    #[serde(default = "first_generation")]
    pub token_generation: u64,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub jti: String,
}

fn first_generation() -> u64 {
    FIRST_GENERATION
}
