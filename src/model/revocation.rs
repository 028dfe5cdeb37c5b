use bson::DateTime;
use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Display, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevocationReason {
    #[display(fmt = "LOGOUT")]
    Logout,
}

///
/// A blacklist entry. Only the token's fingerprint is kept, never the token. The entry is
/// useless once the token itself has expired, so it can be swept after expires_at.
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RevokedToken {
    pub fingerprint: String,
    pub account_id: String,
    pub expires_at: DateTime,
    pub reason: RevocationReason,
    pub revoked_at: DateTime,
}
